//! # hmmseg-core — Segmentação de Palavras em Chinês com HMM
//!
//! Segmentação por etiquetagem de caracteres no esquema **BMES** (Begin, Middle,
//! End, Single) com um Hidden Markov Model de primeira ordem treinado de forma
//! supervisionada.
//!
//! ## Arquitetura
//!
//! 1.  **Corpus** ([`corpus`]): pares (caracteres, etiquetas) já em memória.
//! 2.  **Estimação** ([`estimator`]): contagem + normalização em log-space → [`HmmModel`].
//! 3.  **Decodificação** ([`viterbi`]): caracteres → etiquetas mais prováveis.
//! 4.  **Segmentação** ([`segment`]): etiquetas → palavras.
//!
//! O estimador roda uma vez; o modelo resultante é somente leitura e pode ser
//! compartilhado por quantas decodificações simultâneas forem necessárias.
//! Leitura de arquivos, CLI e persistência ficam fora deste crate.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use hmmseg_core::{corpus::Corpus, estimate, SegPipeline, DEFAULT_ALPHABET_SIZE};
//!
//! // 1. Corpus a partir de frases já segmentadas
//! let corpus = Corpus::from_segmented(
//!     &[&["我们", "是", "学生"], &["他", "是", "老师"]],
//!     DEFAULT_ALPHABET_SIZE,
//! ).unwrap();
//!
//! // 2. Treino
//! let model = estimate(&corpus).unwrap();
//!
//! // 3. Decodificação + segmentação
//! let pipeline = SegPipeline::new(model);
//! let words = pipeline.predict_and_segment("我们是老师").unwrap();
//! assert_eq!(words.concat(), "我们是老师");
//! ```

pub mod corpus;
pub mod error;
pub mod estimator;
pub mod model;
pub mod pipeline;
pub mod segment;
pub mod state;
pub mod symbol;
pub mod viterbi;

pub use error::{Result, SegError};
pub use estimator::{estimate, Estimator, EstimatorConfig};
pub use model::{HmmModel, ModelSummary, LOG_ZERO};
pub use pipeline::{PipelineEvent, SegPipeline, Segmentation};
pub use segment::segment;
pub use state::State;
pub use symbol::DEFAULT_ALPHABET_SIZE;
pub use viterbi::decode;
