//! # Pipeline de Segmentação — Orquestrador com Eventos Observáveis
//!
//! Liga as peças do núcleo para quem só tem texto na mão:
//!
//! 1. **Codificação** ([`crate::symbol`]): caractere → código, com checagem de alfabeto.
//! 2. **Decodificação** ([`crate::viterbi`]): códigos → etiquetas BMES.
//! 3. **Segmentação** ([`crate::segment`]): etiquetas → palavras.
//!
//! Espaços em branco nunca são entregues ao modelo: o texto é quebrado em trechos
//! sem espaço e cada trecho é decodificado de forma independente.
//!
//! O modo streaming ([`SegPipeline::analyze_streaming`]) emite eventos num canal
//! `mpsc` para que o servidor WebSocket mostre o Viterbi passo a passo.

use std::sync::{mpsc, Arc, OnceLock};
use std::time::Instant;

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::{demo_corpus, Corpus};
use crate::error::{Result, SegError};
use crate::estimator::{Estimator, EstimatorConfig};
use crate::model::HmmModel;
use crate::segment::{segment, segment_chars};
use crate::state::State;
use crate::symbol::{encode_text, Symbol, DEFAULT_ALPHABET_SIZE};
use crate::viterbi::{decode, decode_with_score, viterbi_decode, ViterbiStep};

/// Resultado da segmentação de um texto.
///
/// `tags` cobre apenas os caracteres que não são espaço, na ordem do texto;
/// a concatenação de `words` é o texto sem espaços.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub words: Vec<String>,
    pub tags: Vec<State>,
    /// Soma das log-probabilidades dos melhores caminhos de cada trecho.
    pub score: f64,
}

/// Eventos emitidos durante o processamento em modo streaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: texto quebrado em trechos e codificado.
    EncodingDone { runs: usize, total_chars: usize },
    /// **Passo 2**: uma coluna da tabela do Viterbi.
    ViterbiStep {
        /// Posição do caractere entre os caracteres não-espaço do texto.
        position: usize,
        ch: char,
        step: ViterbiStep,
    },
    /// **Passo 3**: etiqueta final de um caractere (após o backtracking).
    TagAssigned { position: usize, ch: char, tag: State },
    /// **Conclusão**.
    Done {
        segmentation: Segmentation,
        total_chars: usize,
        processing_ms: u64,
    },
    /// **Falha**: o texto não pôde ser segmentado.
    Error { message: String },
}

fn runs_regex() -> &'static Regex {
    static RUNS: OnceLock<Regex> = OnceLock::new();
    RUNS.get_or_init(|| Regex::new(r"\S+").expect("regex de trechos é válida"))
}

/// Trechos de texto sem espaço, na ordem em que aparecem.
pub fn non_space_runs(text: &str) -> Vec<&str> {
    runs_regex().find_iter(text).map(|m| m.as_str()).collect()
}

/// O pipeline de segmentação: um modelo treinado compartilhado.
#[derive(Debug, Clone)]
pub struct SegPipeline {
    model: Arc<HmmModel>,
}

impl SegPipeline {
    pub fn new(model: HmmModel) -> Self {
        Self::from_shared(Arc::new(model))
    }

    pub fn from_shared(model: Arc<HmmModel>) -> Self {
        Self { model }
    }

    /// Treina um modelo sobre `corpus` e monta o pipeline.
    pub fn train(corpus: &Corpus, config: EstimatorConfig) -> Result<Self> {
        let model = Estimator::new(config).estimate(corpus)?;
        Ok(Self::new(model))
    }

    /// Pipeline treinado sobre o corpus de demonstração embutido.
    pub fn demo() -> Result<Self> {
        let corpus = demo_corpus(DEFAULT_ALPHABET_SIZE)?;
        Self::train(&corpus, EstimatorConfig::default())
    }

    pub fn model(&self) -> &HmmModel {
        &self.model
    }

    pub fn shared_model(&self) -> Arc<HmmModel> {
        Arc::clone(&self.model)
    }

    /// Etiquetas BMES para cada caractere de `text` (sem tratamento de espaços).
    pub fn predict(&self, text: &str) -> Result<Vec<State>> {
        let observations = encode_text(text, self.model.alphabet_size())?;
        decode(&self.model, &observations)
    }

    /// Codifica, decodifica e segmenta `text` inteiro.
    ///
    /// # Exemplo
    /// ```rust
    /// use hmmseg_core::SegPipeline;
    ///
    /// let pipeline = SegPipeline::demo().unwrap();
    /// let words = pipeline.predict_and_segment("中华人民共和国成立了").unwrap();
    /// assert_eq!(words.concat(), "中华人民共和国成立了");
    /// ```
    pub fn predict_and_segment(&self, text: &str) -> Result<Vec<String>> {
        let labels = self.predict(text)?;
        segment(&labels, text)
    }

    /// Segmenta um texto que pode conter espaços e quebras de linha.
    pub fn analyze(&self, text: &str) -> Result<Segmentation> {
        let runs = non_space_runs(text);
        if runs.is_empty() {
            return Err(SegError::EmptyObservationSequence);
        }

        let mut result = Segmentation::default();
        for run in runs {
            let chars: Vec<char> = run.chars().collect();
            let observations = self.encode_run(run, result.tags.len())?;
            let (labels, score) = decode_with_score(&self.model, &observations)?;
            result.words.extend(segment_chars(&labels, &chars)?);
            result.tags.extend(labels);
            result.score += score;
        }

        debug!(chars = result.tags.len(), words = result.words.len(), "texto segmentado");
        Ok(result)
    }

    /// Segmenta linhas independentes em paralelo.
    pub fn segment_lines<S: AsRef<str> + Sync>(&self, lines: &[S]) -> Vec<Result<Segmentation>> {
        lines.par_iter().map(|line| self.analyze(line.as_ref())).collect()
    }

    /// Executa o pipeline enviando eventos de progresso pelo canal `tx`.
    ///
    /// # Fluxo de Eventos
    /// 1. `EncodingDone`
    /// 2. `ViterbiStep` (uma por caractere)
    /// 3. `TagAssigned` (uma por caractere)
    /// 4. `Done`, ou `Error` se algo falhar no caminho
    pub fn analyze_streaming(&self, text: &str, tx: mpsc::Sender<PipelineEvent>) {
        let start = Instant::now();

        match self.stream_runs(text, &tx) {
            Ok(segmentation) => {
                let total_chars = segmentation.tags.len();
                let _ = tx.send(PipelineEvent::Done {
                    segmentation,
                    total_chars,
                    processing_ms: start.elapsed().as_millis() as u64,
                });
            }
            Err(e) => {
                let _ = tx.send(PipelineEvent::Error { message: e.to_string() });
            }
        }
    }

    /// Codifica um trecho sem espaços; `offset` é o índice do seu primeiro
    /// caractere entre os caracteres não-espaço do texto inteiro, para que o
    /// erro aponte a mesma posição dos eventos e de `Segmentation::tags`.
    fn encode_run(&self, run: &str, offset: usize) -> Result<Vec<Symbol>> {
        encode_text(run, self.model.alphabet_size()).map_err(|e| match e {
            SegError::OutOfRangeSymbol {
                position,
                symbol,
                alphabet_size,
            } => SegError::OutOfRangeSymbol {
                position: offset + position,
                symbol,
                alphabet_size,
            },
            other => other,
        })
    }

    fn stream_runs(&self, text: &str, tx: &mpsc::Sender<PipelineEvent>) -> Result<Segmentation> {
        let runs = non_space_runs(text);
        if runs.is_empty() {
            return Err(SegError::EmptyObservationSequence);
        }

        // Codifica tudo antes de decodificar: um caractere inválido aborta sem eventos parciais
        let mut encoded = Vec::with_capacity(runs.len());
        let mut encoded_chars = 0;
        for run in &runs {
            let observations = self.encode_run(run, encoded_chars)?;
            encoded_chars += observations.len();
            encoded.push(observations);
        }
        let _ = tx.send(PipelineEvent::EncodingDone {
            runs: runs.len(),
            total_chars: encoded_chars,
        });

        let mut result = Segmentation::default();
        let mut offset = 0;
        for (run, observations) in runs.iter().zip(&encoded) {
            let chars: Vec<char> = run.chars().collect();
            let viterbi = viterbi_decode(&self.model, observations)?;

            for step in viterbi.steps {
                let _ = tx.send(PipelineEvent::ViterbiStep {
                    position: offset + step.position,
                    ch: chars[step.position],
                    step,
                });
            }
            for (i, (&ch, &tag)) in chars.iter().zip(&viterbi.best_sequence).enumerate() {
                let _ = tx.send(PipelineEvent::TagAssigned {
                    position: offset + i,
                    ch,
                    tag,
                });
            }

            result.words.extend(segment_chars(&viterbi.best_sequence, &chars)?);
            result.tags.extend(viterbi.best_sequence);
            result.score += viterbi.best_score;
            offset += chars.len();
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::demo_texts;

    #[test]
    fn test_training_sentence_is_recovered() {
        let pipeline = SegPipeline::demo().unwrap();
        let words = pipeline.predict_and_segment("中华人民共和国成立了").unwrap();
        assert_eq!(words, vec!["中华人民共和国", "成立", "了"]);
    }

    #[test]
    fn test_words_concatenate_to_input() {
        let pipeline = SegPipeline::demo().unwrap();
        for (_, text) in demo_texts() {
            let labels = pipeline.predict(text).unwrap();
            assert_eq!(labels.len(), text.chars().count());
            let words = segment(&labels, text).unwrap();
            assert_eq!(words.concat(), text);
        }
    }

    #[test]
    fn test_analyze_skips_whitespace() {
        let pipeline = SegPipeline::demo().unwrap();
        let seg = pipeline.analyze("  我们是学生\n北京 ").unwrap();
        assert_eq!(seg.words.concat(), "我们是学生北京");
        assert_eq!(seg.tags.len(), 7);
        assert!(seg.score < 0.0);
    }

    #[test]
    fn test_analyze_rejects_blank_and_astral_text() {
        let pipeline = SegPipeline::demo().unwrap();
        assert_eq!(pipeline.analyze(" \t ").unwrap_err(), SegError::EmptyObservationSequence);
        assert!(matches!(
            pipeline.analyze("我\u{20000}").unwrap_err(),
            SegError::OutOfRangeSymbol { position: 1, .. }
        ));
        // Posição contada entre os caracteres não-espaço do texto inteiro
        assert!(matches!(
            pipeline.analyze("中国 我\u{20000}").unwrap_err(),
            SegError::OutOfRangeSymbol { position: 3, .. }
        ));
    }

    #[test]
    fn test_segment_lines_in_parallel() {
        let pipeline = SegPipeline::demo().unwrap();
        let lines = vec!["我们是学生", "", "北京是中国的首都"];
        let results = pipeline.segment_lines(&lines);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &pipeline.analyze("我们是学生").unwrap());
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().words.concat(), "北京是中国的首都");
    }

    #[test]
    fn test_streaming_events_order() {
        let pipeline = SegPipeline::demo().unwrap();
        let (tx, rx) = mpsc::channel();
        pipeline.analyze_streaming("我们 是学生", tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();

        assert!(matches!(events[0], PipelineEvent::EncodingDone { runs: 2, total_chars: 5 }));
        let steps = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::ViterbiStep { .. }))
            .count();
        let tags = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::TagAssigned { .. }))
            .count();
        assert_eq!((steps, tags), (5, 5));

        match events.last().unwrap() {
            PipelineEvent::Done { segmentation, total_chars, .. } => {
                assert_eq!(*total_chars, 5);
                assert_eq!(segmentation, &pipeline.analyze("我们 是学生").unwrap());
            }
            other => panic!("evento final inesperado: {:?}", other),
        }

        let json = serde_json::to_string(&events[0]).unwrap();
        assert!(json.contains("\"type\":\"EncodingDone\""));
    }

    #[test]
    fn test_streaming_reports_errors() {
        let pipeline = SegPipeline::demo().unwrap();
        let (tx, rx) = mpsc::channel();
        pipeline.analyze_streaming("", tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], PipelineEvent::Error { .. }));
    }

    #[test]
    fn test_streaming_error_position_spans_runs() {
        let pipeline = SegPipeline::demo().unwrap();
        let (tx, rx) = mpsc::channel();
        pipeline.analyze_streaming("中国 我\u{20000}", tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            PipelineEvent::Error { message } => assert!(message.ends_with("na posição 3")),
            other => panic!("evento inesperado: {other:?}"),
        }
    }
}
