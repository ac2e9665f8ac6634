//! # Esquema de Etiquetas BMES
//!
//! Cada caractere de uma frase recebe uma das quatro etiquetas abaixo, que
//! juntas descrevem onde as palavras começam e terminam:
//!
//! | Etiqueta | Índice | Significado                          | Exemplo (我们/是/学生) |
//! |----------|--------|--------------------------------------|------------------------|
//! | B        | 0      | Begin — primeiro caractere da palavra | **我**们               |
//! | M        | 1      | Middle — caractere interno            | 中**华**人民           |
//! | E        | 2      | End — último caractere da palavra     | 我**们**               |
//! | S        | 3      | Single — palavra de um só caractere   | **是**                 |
//!
//! O espaço de estados é fixo: o HMM nunca descobre estados novos a partir dos dados.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegError};

/// Número de estados ocultos do modelo.
pub const STATE_COUNT: usize = 4;

/// Estado oculto (etiqueta BMES) associado a um caractere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum State {
    /// **Begin**: abre uma palavra de dois ou mais caracteres.
    B,
    /// **Middle**: continua uma palavra já aberta.
    M,
    /// **End**: fecha a palavra aberta.
    E,
    /// **Single**: palavra de um caractere só.
    S,
}

impl State {
    /// Todos os estados em ordem de índice (a ordem do desempate do Viterbi).
    pub const ALL: [State; STATE_COUNT] = [State::B, State::M, State::E, State::S];

    /// Índice numérico usado nas tabelas do modelo.
    pub fn index(self) -> usize {
        match self {
            State::B => 0,
            State::M => 1,
            State::E => 2,
            State::S => 3,
        }
    }

    /// Converte um índice 0..=3 de volta para o estado.
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| SegError::InvalidLabel(index.to_string()))
    }

    /// Representação textual ("B", "M", "E", "S").
    pub fn label(self) -> &'static str {
        match self {
            State::B => "B",
            State::M => "M",
            State::E => "E",
            State::S => "S",
        }
    }

    /// Parseia uma etiqueta textual (ex: "E" → `State::E`).
    pub fn from_label(s: &str) -> Result<Self> {
        match s {
            "B" => Ok(State::B),
            "M" => Ok(State::M),
            "E" => Ok(State::E),
            "S" => Ok(State::S),
            other => Err(SegError::InvalidLabel(other.to_string())),
        }
    }

    /// Verdadeiro para estados que abrem ou continuam uma palavra multi-caractere.
    pub fn opens_word(self) -> bool {
        matches!(self, State::B | State::M)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
