//! # Algoritmo de Viterbi — Decodificação BMES
//!
//! Programação dinâmica que encontra a sequência de estados mais provável para
//! uma sequência de caracteres, em log-space.
//!
//! ```text
//! Inicialização: delta[0][s] = pi[s] + b[s][x_0]
//!
//! Recursão:      delta[t][s] = b[s][x_t] + max_p (delta[t-1][p] + a[p][s])
//!                track[t][s] = argmax_p (...)
//!
//! Terminação:    s* = argmax_s delta[T][s]
//!
//! Backtracking:  y_{t-1} = track[t][y_t]
//! ```
//!
//! ## Desempate
//!
//! Os candidatos são varridos em ordem crescente de índice (B, M, E, S) e só uma
//! melhora **estrita** troca o escolhido: em empate vence sempre o estado de
//! menor índice. Vale tanto para o predecessor quanto para o estado final.
//!
//! ## Complexidade
//! $O(N \cdot 4^2)$ em tempo e $O(N \cdot 4)$ em memória, onde $N$ é o tamanho da frase.
//! As tabelas `delta`/`track` são locais a cada chamada; o modelo nunca é alterado.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, SegError};
use crate::model::HmmModel;
use crate::state::{State, STATE_COUNT};
use crate::symbol::Symbol;

/// Score de um estado num passo do Viterbi (para visualização).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateScore {
    pub state: State,
    /// `delta[t][state]`
    pub score: f64,
    /// Emissão do caractere atual neste estado.
    pub emission: f64,
    /// Predecessor escolhido (`None` na posição 0).
    pub best_prev: Option<State>,
}

/// Coluna `t` da tabela do Viterbi.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViterbiStep {
    pub position: usize,
    pub scores: Vec<StateScore>,
    /// Melhor estado nesta coluna (não necessariamente o do caminho final).
    pub best_state: State,
    pub best_score: f64,
}

/// Resultado completo do Viterbi.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViterbiResult {
    pub best_sequence: Vec<State>,
    /// Log-probabilidade conjunta do melhor caminho.
    pub best_score: f64,
    pub steps: Vec<ViterbiStep>,
}

/// Tabelas da programação dinâmica de uma chamada.
struct Lattice {
    emission: Vec<[f64; STATE_COUNT]>,
    delta: Vec<[f64; STATE_COUNT]>,
    track: Vec<[usize; STATE_COUNT]>,
}

fn fill_lattice(model: &HmmModel, observations: &[Symbol]) -> Result<Lattice> {
    if observations.is_empty() {
        return Err(SegError::EmptyObservationSequence);
    }

    let n = observations.len();
    let mut emission = Vec::with_capacity(n);
    for (t, &x) in observations.iter().enumerate() {
        let mut column = [0.0; STATE_COUNT];
        for s in State::ALL {
            column[s.index()] = model.emission(s, x, t)?;
        }
        emission.push(column);
    }

    let mut delta = vec![[0.0; STATE_COUNT]; n];
    let mut track = vec![[0usize; STATE_COUNT]; n];

    for s in State::ALL {
        delta[0][s.index()] = model.initial(s) + emission[0][s.index()];
    }

    for t in 1..n {
        for s in State::ALL {
            let mut best = f64::NEG_INFINITY;
            let mut best_prev = 0;
            for p in State::ALL {
                let candidate = delta[t - 1][p.index()] + model.transition(p, s);
                if candidate > best {
                    best = candidate;
                    best_prev = p.index();
                }
            }
            delta[t][s.index()] = emission[t][s.index()] + best;
            track[t][s.index()] = best_prev;
        }
    }

    Ok(Lattice { emission, delta, track })
}

/// Retorna (índice, valor) do máximo; empates ficam com o menor índice.
fn best_in_column(column: &[f64; STATE_COUNT]) -> (usize, f64) {
    let mut best = 0;
    for s in 1..STATE_COUNT {
        if column[s] > column[best] {
            best = s;
        }
    }
    (best, column[best])
}

fn backtrack(track: &[[usize; STATE_COUNT]], last: usize) -> Vec<State> {
    let n = track.len();
    let mut path = vec![State::B; n];
    let mut current = last;
    path[n - 1] = State::ALL[current];
    for t in (1..n).rev() {
        current = track[t][current];
        path[t - 1] = State::ALL[current];
    }
    path
}

/// Decodifica a sequência de estados mais provável.
///
/// O resultado tem sempre o mesmo tamanho da entrada.
///
/// # Erros
/// - [`SegError::EmptyObservationSequence`] para entrada vazia.
/// - [`SegError::OutOfRangeSymbol`] se algum código não couber no alfabeto do modelo.
pub fn decode(model: &HmmModel, observations: &[Symbol]) -> Result<Vec<State>> {
    decode_with_score(model, observations).map(|(path, _)| path)
}

/// Melhor caminho e a sua log-probabilidade conjunta.
pub fn decode_with_score(model: &HmmModel, observations: &[Symbol]) -> Result<(Vec<State>, f64)> {
    let lattice = fill_lattice(model, observations)?;
    let (last, score) = best_in_column(&lattice.delta[observations.len() - 1]);
    trace!(len = observations.len(), score, "viterbi concluído");
    Ok((backtrack(&lattice.track, last), score))
}

/// Como [`decode`], mas devolve também o score e a tabela passo a passo.
pub fn viterbi_decode(model: &HmmModel, observations: &[Symbol]) -> Result<ViterbiResult> {
    let lattice = fill_lattice(model, observations)?;
    let n = observations.len();

    let steps = (0..n)
        .map(|t| {
            let scores = State::ALL
                .iter()
                .map(|&s| StateScore {
                    state: s,
                    score: lattice.delta[t][s.index()],
                    emission: lattice.emission[t][s.index()],
                    best_prev: (t > 0).then(|| State::ALL[lattice.track[t][s.index()]]),
                })
                .collect();
            let (best, best_score) = best_in_column(&lattice.delta[t]);
            ViterbiStep {
                position: t,
                scores,
                best_state: State::ALL[best],
                best_score,
            }
        })
        .collect();

    let (last, best_score) = best_in_column(&lattice.delta[n - 1]);
    Ok(ViterbiResult {
        best_sequence: backtrack(&lattice.track, last),
        best_score,
        steps,
    })
}

/// Decodifica frases independentes em paralelo (Rayon).
///
/// Cada posição do resultado corresponde à frase de mesmo índice e carrega o
/// seu próprio `Result`.
pub fn decode_batch(model: &HmmModel, sequences: &[Vec<Symbol>]) -> Vec<Result<Vec<State>>> {
    sequences
        .par_iter()
        .map(|observations| decode(model, observations))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::demo_corpus;
    use crate::estimator::estimate;
    use crate::model::LOG_ZERO;
    use crate::symbol::{encode_text, DEFAULT_ALPHABET_SIZE};

    const Z: f64 = LOG_ZERO;

    /// Modelo de 2 estados (B, M) e 2 símbolos; E e S ficam desligados com LOG_ZERO.
    fn toy_model() -> HmmModel {
        let ln = f64::ln;
        HmmModel::from_log_parameters(
            2,
            [ln(0.6), ln(0.4), Z, Z],
            [
                [ln(0.7), ln(0.3), Z, Z],
                [ln(0.45), ln(0.55), Z, Z],
                [Z; STATE_COUNT],
                [Z; STATE_COUNT],
            ],
            [vec![ln(0.9), ln(0.1)], vec![ln(0.2), ln(0.8)], vec![Z, Z], vec![Z, Z]],
        )
        .unwrap()
    }

    fn all_paths(len: usize) -> Vec<Vec<State>> {
        let mut paths = vec![Vec::new()];
        for _ in 0..len {
            paths = paths
                .into_iter()
                .flat_map(|p| {
                    State::ALL.into_iter().map(move |s| {
                        let mut next = p.clone();
                        next.push(s);
                        next
                    })
                })
                .collect();
        }
        paths
    }

    #[test]
    fn test_matches_brute_force_on_toy_model() {
        let model = toy_model();
        for len in 1..=4usize {
            for code in 0..(1usize << len) {
                let obs: Vec<u32> = (0..len).map(|k| ((code >> k) & 1) as u32).collect();

                let mut best_path = Vec::new();
                let mut best_score = f64::NEG_INFINITY;
                for path in all_paths(len) {
                    let score = model.path_score(&obs, &path).unwrap();
                    if score > best_score {
                        best_score = score;
                        best_path = path;
                    }
                }

                let result = viterbi_decode(&model, &obs).unwrap();
                assert_eq!(result.best_sequence, best_path, "obs {:?}", obs);
                assert!((result.best_score - best_score).abs() < 1e-9);
                assert_eq!(decode(&model, &obs).unwrap(), best_path);
            }
        }
    }

    #[test]
    fn test_ties_prefer_lower_index_predecessor() {
        // M e E chegam em S com o mesmo score; M tem índice menor
        let half = (0.5f64).ln();
        let mut transition = [[Z; STATE_COUNT]; STATE_COUNT];
        transition[State::M.index()][State::S.index()] = 0.0;
        transition[State::E.index()][State::S.index()] = 0.0;
        let model = HmmModel::from_log_parameters(
            1,
            [Z, half, half, Z],
            transition,
            std::array::from_fn(|_| vec![0.0]),
        )
        .unwrap();

        for _ in 0..10 {
            assert_eq!(decode(&model, &[0, 0]).unwrap(), vec![State::M, State::S]);
        }
    }

    #[test]
    fn test_final_state_tie_prefers_lowest_index() {
        let p = (0.25f64).ln();
        let model = HmmModel::from_log_parameters(
            1,
            [p; STATE_COUNT],
            [[p; STATE_COUNT]; STATE_COUNT],
            std::array::from_fn(|_| vec![0.0]),
        )
        .unwrap();
        assert_eq!(decode(&model, &[0, 0, 0]).unwrap(), vec![State::B; 3]);
    }

    #[test]
    fn test_empty_sequence_is_rejected() {
        let model = toy_model();
        assert_eq!(decode(&model, &[]).unwrap_err(), SegError::EmptyObservationSequence);
        assert!(viterbi_decode(&model, &[]).is_err());
    }

    #[test]
    fn test_symbol_at_alphabet_bound_is_rejected() {
        let model = toy_model();
        let err = decode(&model, &[0, 1, 2]).unwrap_err();
        assert_eq!(
            err,
            SegError::OutOfRangeSymbol {
                position: 2,
                symbol: 2,
                alphabet_size: 2
            }
        );
    }

    #[test]
    fn test_length_invariant_on_trained_model() {
        let model = estimate(&demo_corpus(DEFAULT_ALPHABET_SIZE).unwrap()).unwrap();
        let texts = ["我", "我们是学生", "中华人民共和国成立了", "今天天气很好我喜欢看书"];
        for text in texts {
            let obs = encode_text(text, DEFAULT_ALPHABET_SIZE).unwrap();
            assert_eq!(decode(&model, &obs).unwrap().len(), obs.len());
        }
    }

    #[test]
    fn test_trace_is_consistent_with_path_score() {
        let model = estimate(&demo_corpus(DEFAULT_ALPHABET_SIZE).unwrap()).unwrap();
        let obs = encode_text("我们在北京学习", DEFAULT_ALPHABET_SIZE).unwrap();
        let result = viterbi_decode(&model, &obs).unwrap();

        assert_eq!(result.steps.len(), obs.len());
        assert!(result.steps[0].scores.iter().all(|s| s.best_prev.is_none()));
        let expected = model.path_score(&obs, &result.best_sequence).unwrap();
        assert!((result.best_score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_batch_matches_sequential() {
        let model = estimate(&demo_corpus(DEFAULT_ALPHABET_SIZE).unwrap()).unwrap();
        let sequences: Vec<Vec<u32>> = ["我们是学生", "北京", "好"]
            .iter()
            .map(|t| encode_text(t, DEFAULT_ALPHABET_SIZE).unwrap())
            .chain(std::iter::once(Vec::new()))
            .collect();

        let batch = decode_batch(&model, &sequences);
        assert_eq!(batch.len(), 4);
        for (seq, result) in sequences.iter().zip(&batch).take(3) {
            assert_eq!(result.as_ref().unwrap(), &decode(&model, seq).unwrap());
        }
        assert!(batch[3].is_err());
    }
}
