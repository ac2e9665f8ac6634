//! # Modelo HMM Finalizado
//!
//! Guarda as três tabelas de parâmetros já em **log-space**:
//!
//! - **Inicial** `initial[s]`: $\log P(y = s)$ normalizado pela contagem de sequências.
//! - **Transição** `transition[s][s']`: $\log P(y_t = s' | y_{t-1} = s)$.
//! - **Emissão** `emission[s][o]`: $\log P(x_t = o | y_t = s)$.
//!
//! O modelo só nasce de duas formas: pelo estimador (a partir de contagens, ver
//! [`crate::estimator`]) ou por [`HmmModel::from_log_parameters`] com tabelas
//! escritas à mão. Depois de construído ele não oferece nenhuma operação de
//! escrita, então pode ser compartilhado (`&HmmModel` ou `Arc<HmmModel>`) entre
//! quantas decodificações simultâneas forem necessárias.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegError, Table};
use crate::state::{State, STATE_COUNT};
use crate::symbol::{check_symbol, Symbol};

/// Substituto finito para `log(0)`.
///
/// Preserva a ordenação nas comparações de máximo do Viterbi sem produzir
/// `-inf`/NaN. Não serve para aritmética além de comparação: somar muitos
/// `LOG_ZERO` continua finito mas não tem significado probabilístico.
pub const LOG_ZERO: f64 = -2_147_483_648.0;

/// Modelo HMM de primeira ordem com 4 estados BMES, somente leitura.
///
/// A desserialização passa pelas mesmas validações de [`HmmModel::from_log_parameters`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawModel")]
pub struct HmmModel {
    alphabet_size: usize,
    /// Denominador usado na normalização da distribuição inicial.
    sequence_count: usize,
    initial: [f64; STATE_COUNT],
    transition: [[f64; STATE_COUNT]; STATE_COUNT],
    /// Uma linha por estado, `alphabet_size` colunas.
    emission: [Vec<f64>; STATE_COUNT],
    /// Linhas que não tinham nenhuma contagem na normalização.
    degenerate_rows: Vec<DegenerateRow>,
}

/// Linha de tabela preenchida inteiramente com [`LOG_ZERO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegenerateRow {
    pub table: Table,
    pub state: State,
}

/// Forma serializada de [`HmmModel`], ainda não validada.
#[derive(Deserialize)]
struct RawModel {
    alphabet_size: usize,
    sequence_count: usize,
    initial: [f64; STATE_COUNT],
    transition: [[f64; STATE_COUNT]; STATE_COUNT],
    emission: [Vec<f64>; STATE_COUNT],
    #[serde(default)]
    degenerate_rows: Vec<DegenerateRow>,
}

impl TryFrom<RawModel> for HmmModel {
    type Error = SegError;

    fn try_from(raw: RawModel) -> Result<Self> {
        validate_tables(raw.alphabet_size, &raw.initial, &raw.transition, &raw.emission)?;
        Ok(Self::from_parts(
            raw.alphabet_size,
            raw.sequence_count,
            raw.initial,
            raw.transition,
            raw.emission,
            raw.degenerate_rows,
        ))
    }
}

fn validate_tables(
    alphabet_size: usize,
    initial: &[f64; STATE_COUNT],
    transition: &[[f64; STATE_COUNT]; STATE_COUNT],
    emission: &[Vec<f64>; STATE_COUNT],
) -> Result<()> {
    if alphabet_size == 0 {
        return Err(SegError::InvalidParameters("alphabet_size deve ser > 0".into()));
    }
    for (s, row) in emission.iter().enumerate() {
        if row.len() != alphabet_size {
            return Err(SegError::InvalidParameters(format!(
                "linha de emissão {} tem {} colunas, esperado {}",
                s,
                row.len(),
                alphabet_size
            )));
        }
    }
    let all_finite = initial.iter().all(|v| v.is_finite())
        && transition.iter().flatten().all(|v| v.is_finite())
        && emission.iter().flatten().all(|v| v.is_finite());
    if !all_finite {
        return Err(SegError::InvalidParameters(
            "valores devem ser finitos (use LOG_ZERO para log(0))".into(),
        ));
    }
    Ok(())
}

/// Resumo serializável do modelo (para logs e para a API web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub alphabet_size: usize,
    pub sequence_count: usize,
    pub initial: [f64; STATE_COUNT],
    pub transition: [[f64; STATE_COUNT]; STATE_COUNT],
    /// Quantos símbolos têm emissão não-nula em pelo menos um estado.
    pub observed_symbols: usize,
    pub degenerate_rows: Vec<DegenerateRow>,
}

impl HmmModel {
    pub(crate) fn from_parts(
        alphabet_size: usize,
        sequence_count: usize,
        initial: [f64; STATE_COUNT],
        transition: [[f64; STATE_COUNT]; STATE_COUNT],
        emission: [Vec<f64>; STATE_COUNT],
        degenerate_rows: Vec<DegenerateRow>,
    ) -> Self {
        Self {
            alphabet_size,
            sequence_count,
            initial,
            transition,
            emission,
            degenerate_rows,
        }
    }

    /// Constrói um modelo a partir de tabelas já em log-space.
    ///
    /// Útil para modelos de brinquedo e testes. Células "impossíveis" devem usar
    /// [`LOG_ZERO`]; `-inf` e NaN são rejeitados.
    ///
    /// # Erros
    /// [`SegError::InvalidParameters`] se `alphabet_size == 0`, se alguma linha de
    /// emissão não tiver `alphabet_size` colunas ou se algum valor não for finito.
    pub fn from_log_parameters(
        alphabet_size: usize,
        initial: [f64; STATE_COUNT],
        transition: [[f64; STATE_COUNT]; STATE_COUNT],
        emission: [Vec<f64>; STATE_COUNT],
    ) -> Result<Self> {
        validate_tables(alphabet_size, &initial, &transition, &emission)?;
        Ok(Self::from_parts(alphabet_size, 0, initial, transition, emission, Vec::new()))
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    pub fn sequence_count(&self) -> usize {
        self.sequence_count
    }

    pub fn initial(&self, state: State) -> f64 {
        self.initial[state.index()]
    }

    pub fn transition(&self, from: State, to: State) -> f64 {
        self.transition[from.index()][to.index()]
    }

    pub fn transition_row(&self, from: State) -> &[f64; STATE_COUNT] {
        &self.transition[from.index()]
    }

    pub fn emission_row(&self, state: State) -> &[f64] {
        &self.emission[state.index()]
    }

    /// $\log P(x = symbol | y = state)$, validando o limite do alfabeto.
    ///
    /// `position` é só para o erro.
    pub fn emission(&self, state: State, symbol: Symbol, position: usize) -> Result<f64> {
        let col = check_symbol(symbol, self.alphabet_size, position)?;
        Ok(self.emission[state.index()][col])
    }

    pub fn degenerate_rows(&self) -> &[DegenerateRow] {
        &self.degenerate_rows
    }

    /// Pontua um caminho de estados com a mesma aritmética do decodificador:
    /// $\pi_{y_0} + b_{y_0}(x_0) + \sum_t a_{y_{t-1} y_t} + b_{y_t}(x_t)$.
    pub fn path_score(&self, observations: &[Symbol], labels: &[State]) -> Result<f64> {
        if observations.is_empty() {
            return Err(SegError::EmptyObservationSequence);
        }
        if observations.len() != labels.len() {
            return Err(SegError::LengthMismatch {
                labels: labels.len(),
                chars: observations.len(),
            });
        }

        let mut score = self.initial(labels[0]) + self.emission(labels[0], observations[0], 0)?;
        for t in 1..observations.len() {
            score += self.transition(labels[t - 1], labels[t]);
            score += self.emission(labels[t], observations[t], t)?;
        }
        Ok(score)
    }

    pub fn summary(&self) -> ModelSummary {
        let observed_symbols = (0..self.alphabet_size)
            .filter(|&o| self.emission.iter().any(|row| row[o] > LOG_ZERO))
            .count();

        ModelSummary {
            alphabet_size: self.alphabet_size,
            sequence_count: self.sequence_count,
            initial: self.initial,
            transition: self.transition,
            observed_symbols,
            degenerate_rows: self.degenerate_rows.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(alphabet_size: usize) -> HmmModel {
        let p = (0.25f64).ln();
        let e = (1.0 / alphabet_size as f64).ln();
        HmmModel::from_log_parameters(
            alphabet_size,
            [p; STATE_COUNT],
            [[p; STATE_COUNT]; STATE_COUNT],
            std::array::from_fn(|_| vec![e; alphabet_size]),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_wrong_emission_width() {
        let err = HmmModel::from_log_parameters(
            3,
            [0.0; STATE_COUNT],
            [[0.0; STATE_COUNT]; STATE_COUNT],
            [vec![0.0; 3], vec![0.0; 3], vec![0.0; 2], vec![0.0; 3]],
        )
        .unwrap_err();
        assert!(matches!(err, SegError::InvalidParameters(_)));
    }

    #[test]
    fn test_rejects_negative_infinity() {
        let mut initial = [0.0; STATE_COUNT];
        initial[1] = f64::NEG_INFINITY;
        let err = HmmModel::from_log_parameters(
            1,
            initial,
            [[0.0; STATE_COUNT]; STATE_COUNT],
            std::array::from_fn(|_| vec![0.0]),
        )
        .unwrap_err();
        assert!(matches!(err, SegError::InvalidParameters(_)));
    }

    #[test]
    fn test_emission_out_of_range() {
        let model = uniform(4);
        assert!(model.emission(State::B, 3, 0).is_ok());
        assert_eq!(
            model.emission(State::B, 4, 7).unwrap_err(),
            SegError::OutOfRangeSymbol {
                position: 7,
                symbol: 4,
                alphabet_size: 4
            }
        );
    }

    #[test]
    fn test_path_score_of_uniform_model() {
        let model = uniform(2);
        let score = model
            .path_score(&[0, 1, 1], &[State::B, State::E, State::S])
            .unwrap();
        // 3 escolhas de estado (1/4 cada) e 3 emissões (1/2 cada)
        let expected = 3.0 * (0.25f64).ln() + 3.0 * (0.5f64).ln();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_summary_counts_observed_symbols() {
        let mut emission: [Vec<f64>; STATE_COUNT] = std::array::from_fn(|_| vec![LOG_ZERO; 5]);
        emission[0][1] = 0.0;
        emission[3][4] = 0.0;
        let model = HmmModel::from_log_parameters(
            5,
            [0.0; STATE_COUNT],
            [[0.0; STATE_COUNT]; STATE_COUNT],
            emission,
        )
        .unwrap();
        let summary = model.summary();
        assert_eq!(summary.observed_symbols, 2);
        assert_eq!(summary.alphabet_size, 5);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"observed_symbols\":2"));
    }

    #[test]
    fn test_deserialize_rejects_short_emission_rows() {
        let json = r#"{
            "alphabet_size": 65536,
            "sequence_count": 1,
            "initial": [0.0, 0.0, 0.0, 0.0],
            "transition": [[0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0],
                           [0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0]],
            "emission": [[0.0], [0.0], [0.0], [0.0]],
            "degenerate_rows": []
        }"#;
        let err = serde_json::from_str::<HmmModel>(json).unwrap_err();
        assert!(err.to_string().contains("linha de emissão"));
    }

    #[test]
    fn test_deserialize_round_trip_keeps_tables() {
        let model = uniform(3);
        let json = serde_json::to_string(&model).unwrap();
        let back: HmmModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.alphabet_size(), 3);
        assert_eq!(back.emission_row(State::S), model.emission_row(State::S));
        assert!(back.emission(State::S, 2, 0).is_ok());
    }
}
