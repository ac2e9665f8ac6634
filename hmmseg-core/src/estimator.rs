//! # Estimação Supervisionada dos Parâmetros do HMM
//!
//! O treino tem duas fases bem separadas:
//!
//! 1. **Contagem** ([`CountTables::observe`]): uma única passada pelo corpus,
//!    somando frequências brutas em tabelas inteiras.
//! 2. **Normalização** ([`CountTables::finalize`]): converte as contagens em
//!    log-probabilidades e devolve um [`HmmModel`] imutável. `finalize` consome
//!    as contagens, então a transformação logarítmica nunca roda duas vezes.
//!
//! ## Contagem
//!
//! Para cada posição `j` de cada sequência:
//! - `initial[y_j] += 1` (em **todas** as posições, não só na primeira);
//! - `emission[y_j][x_j] += 1`;
//! - `transition[y_j][y_{j+1}] += 1`, exceto na última posição.
//!
//! ## Normalização
//!
//! $$ \pi_s = \log c_s - \log N_{seq} \qquad a_{ss'} = \log c_{ss'} - \log \sum_{s''} c_{ss''} $$
//!
//! A distribuição inicial é dividida pelo número de sequências do corpus e não
//! pela soma das suas contagens, logo $\sum_s e^{\pi_s}$ só vale 1 quando as duas
//! quantidades coincidem. Células com contagem zero viram [`LOG_ZERO`].

use tracing::debug;

use crate::corpus::{Corpus, LabeledSequence};
use crate::error::{Result, SegError, Table};
use crate::model::{DegenerateRow, HmmModel, LOG_ZERO};
use crate::state::{State, STATE_COUNT};
use crate::symbol::{check_symbol, Symbol, DEFAULT_ALPHABET_SIZE};

/// Configuração do estimador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorConfig {
    /// Limite superior (exclusivo) dos códigos de símbolo.
    pub alphabet_size: usize,
    /// Se verdadeiro, uma linha de transição/emissão sem contagens vira
    /// [`SegError::DegenerateRow`] em vez de uma linha toda [`LOG_ZERO`].
    pub reject_degenerate_rows: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            alphabet_size: DEFAULT_ALPHABET_SIZE,
            reject_degenerate_rows: false,
        }
    }
}

/// Tabelas de frequência da fase de acumulação.
#[derive(Debug, Clone)]
pub struct CountTables {
    alphabet_size: usize,
    initial: [u64; STATE_COUNT],
    transition: [[u64; STATE_COUNT]; STATE_COUNT],
    emission: [Vec<u64>; STATE_COUNT],
}

impl CountTables {
    pub fn new(alphabet_size: usize) -> Self {
        Self {
            alphabet_size,
            initial: [0; STATE_COUNT],
            transition: [[0; STATE_COUNT]; STATE_COUNT],
            emission: std::array::from_fn(|_| vec![0; alphabet_size]),
        }
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    pub fn initial_count(&self, state: State) -> u64 {
        self.initial[state.index()]
    }

    pub fn transition_count(&self, from: State, to: State) -> u64 {
        self.transition[from.index()][to.index()]
    }

    /// Contagem de emissão; símbolos fora do alfabeto contam zero.
    pub fn emission_count(&self, state: State, symbol: Symbol) -> u64 {
        self.emission[state.index()]
            .get(symbol as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Acumula um par do corpus. `index` identifica o par nos erros.
    ///
    /// O par é validado inteiro antes de qualquer incremento: um par rejeitado
    /// não deixa contagens parciais.
    pub fn observe(&mut self, index: usize, pair: &LabeledSequence) -> Result<()> {
        let (xs, ys) = (&pair.observations, &pair.labels);
        if xs.is_empty() || xs.len() != ys.len() {
            return Err(SegError::MalformedSequencePair {
                index,
                observations: xs.len(),
                labels: ys.len(),
            });
        }
        for (position, &symbol) in xs.iter().enumerate() {
            check_symbol(symbol, self.alphabet_size, position)?;
        }

        let last = xs.len() - 1;
        for j in 0..last {
            let (s, next) = (ys[j].index(), ys[j + 1].index());
            self.initial[s] += 1;
            self.transition[s][next] += 1;
            self.emission[s][xs[j] as usize] += 1;
        }
        // Última posição: sem transição de saída
        let s = ys[last].index();
        self.initial[s] += 1;
        self.emission[s][xs[last] as usize] += 1;

        Ok(())
    }

    /// Converte as contagens em log-probabilidades.
    ///
    /// # Erros
    /// - [`SegError::EmptyCorpus`] se `total_sequence_count == 0`.
    /// - [`SegError::DegenerateRow`] se `reject_degenerate_rows` e alguma linha
    ///   de transição/emissão não tiver contagens.
    pub fn finalize(
        self,
        total_sequence_count: usize,
        reject_degenerate_rows: bool,
    ) -> Result<HmmModel> {
        if total_sequence_count == 0 {
            return Err(SegError::EmptyCorpus);
        }

        let mut degenerate_rows = Vec::new();
        let mut initial = [LOG_ZERO; STATE_COUNT];
        let log_sequences = (total_sequence_count as f64).ln();
        for (s, &count) in self.initial.iter().enumerate() {
            initial[s] = log_ratio(count, log_sequences);
        }

        let mut transition = [[LOG_ZERO; STATE_COUNT]; STATE_COUNT];
        for (s, row) in self.transition.iter().enumerate() {
            match log_normalize(row) {
                Some(normalized) => transition[s].copy_from_slice(&normalized),
                None => {
                    degenerate(&mut degenerate_rows, Table::Transition, s, reject_degenerate_rows)?
                }
            }
        }

        let mut emission: [Vec<f64>; STATE_COUNT] = std::array::from_fn(|_| Vec::new());
        for (s, row) in self.emission.iter().enumerate() {
            emission[s] = match log_normalize(row) {
                Some(normalized) => normalized,
                None => {
                    degenerate(&mut degenerate_rows, Table::Emission, s, reject_degenerate_rows)?;
                    vec![LOG_ZERO; self.alphabet_size]
                }
            };
        }

        Ok(HmmModel::from_parts(
            self.alphabet_size,
            total_sequence_count,
            initial,
            transition,
            emission,
            degenerate_rows,
        ))
    }
}

fn log_ratio(count: u64, log_denominator: f64) -> f64 {
    if count == 0 {
        LOG_ZERO
    } else {
        (count as f64).ln() - log_denominator
    }
}

/// Normaliza uma linha de contagens; `None` se a linha somar zero.
fn log_normalize(row: &[u64]) -> Option<Vec<f64>> {
    let sum: u64 = row.iter().sum();
    if sum == 0 {
        return None;
    }
    let log_sum = (sum as f64).ln();
    Some(row.iter().map(|&c| log_ratio(c, log_sum)).collect())
}

fn degenerate(rows: &mut Vec<DegenerateRow>, table: Table, s: usize, reject: bool) -> Result<()> {
    if reject {
        return Err(SegError::DegenerateRow { table, state: s });
    }
    let state = State::ALL[s];
    debug!(%table, %state, "linha sem contagens, preenchida com LOG_ZERO");
    rows.push(DegenerateRow { table, state });
    Ok(())
}

/// Estimador supervisionado: corpus rotulado → [`HmmModel`].
#[derive(Debug, Clone, Default)]
pub struct Estimator {
    config: EstimatorConfig,
}

impl Estimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Treina o modelo numa passada única pelo corpus.
    ///
    /// O corpus não é modificado. Se algum par falhar a validação o erro é
    /// devolvido e nenhum modelo é produzido.
    pub fn estimate(&self, corpus: &Corpus) -> Result<HmmModel> {
        if corpus.is_empty() {
            return Err(SegError::EmptyCorpus);
        }

        let mut counts = CountTables::new(self.config.alphabet_size);
        for (index, pair) in corpus.sequences().iter().enumerate() {
            counts.observe(index, pair)?;
        }

        debug!(
            sequences = corpus.len(),
            total_sequence_count = corpus.total_sequence_count(),
            chars = corpus.total_chars(),
            "contagens acumuladas"
        );

        counts.finalize(corpus.total_sequence_count(), self.config.reject_degenerate_rows)
    }
}

/// Atalho para [`Estimator::estimate`] com a configuração padrão.
pub fn estimate(corpus: &Corpus) -> Result<HmmModel> {
    Estimator::default().estimate(corpus)
}
