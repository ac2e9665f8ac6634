//! # Erros do Núcleo de Segmentação
//!
//! Todas as falhas são locais e síncronas: nada aqui é transitório, então
//! nenhum erro é re-tentado nem silenciosamente engolido.

use thiserror::Error;

/// Tabela de parâmetros do modelo (usada para reportar linhas degeneradas).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Initial,
    Transition,
    Emission,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Table::Initial => "initial",
            Table::Transition => "transition",
            Table::Emission => "emission",
        };
        f.write_str(name)
    }
}

/// Tipo de erro unificado do segmentador HMM.
#[derive(Debug, Error, PartialEq)]
pub enum SegError {
    /// Código de símbolo `>= alphabet_size`, no treino ou na decodificação.
    #[error("símbolo {symbol} fora do alfabeto (limite {alphabet_size}) na posição {position}")]
    OutOfRangeSymbol {
        position: usize,
        symbol: u32,
        alphabet_size: usize,
    },

    /// Par (observações, rótulos) com tamanhos diferentes ou vazio.
    #[error("par de sequências #{index} malformado: {observations} observações para {labels} rótulos")]
    MalformedSequencePair {
        index: usize,
        observations: usize,
        labels: usize,
    },

    /// Linha sem nenhuma contagem no momento da normalização (modo estrito).
    #[error("linha degenerada na tabela {table}: estado {state} sem contagens")]
    DegenerateRow { table: Table, state: usize },

    /// `decode` chamado com uma sequência vazia.
    #[error("sequência de observações vazia")]
    EmptyObservationSequence,

    /// Rótulos e texto com quantidades diferentes de caracteres.
    #[error("{labels} rótulos para {chars} caracteres")]
    LengthMismatch { labels: usize, chars: usize },

    /// Rótulo BMES inválido (texto ou índice).
    #[error("rótulo inválido: {0}")]
    InvalidLabel(String),

    /// Corpus sem sequências (ou com contagem de sequências zero).
    #[error("corpus vazio")]
    EmptyCorpus,

    /// Linha malformada no corpus tabulado.
    #[error("linha {line} do corpus: {reason}")]
    CorpusFormat { line: usize, reason: String },

    /// Tabelas de parâmetros com dimensões ou valores inválidos.
    #[error("parâmetros inválidos: {0}")]
    InvalidParameters(String),
}

/// Alias de conveniência usado em todo o crate.
pub type Result<T> = std::result::Result<T, SegError>;
