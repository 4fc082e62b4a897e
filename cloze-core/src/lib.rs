//! # cloze-core — Questões de Lacuna a partir de Entidades Nomeadas
//!
//! Este crate pós-processa a saída de um classificador de tokens (NER) para:
//!
//! 1. reconstruir as entidades a partir dos rótulos BIO de cada token;
//! 2. gerar questões de "preencha a lacuna", mascarando cada entidade no texto original.
//!
//! O classificador em si é externo: o pipeline só consome o fluxo
//! `(token, rótulo, confiança)` que ele produz.
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada**: Texto bruto + fluxo rotulado ([`classifier`]).
//! 2.  **Decodificação BIO** ([`decoder`]): máquina de estados OUTSIDE/INSIDE → [`Entity`].
//! 3.  **Renderização** ([`render`]): desfaz a segmentação em sub-palavras (`"Wash"`, `"##ington"`).
//! 4.  **Questões** ([`question`]): uma lacuna por entidade, limitada por tipo.
//! 5.  **Saída**: [`QuizOutput`] com as anotações por token e o [`QuestionMap`].
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use cloze_core::{LexiconClassifier, QuizConfig, QuizPipeline};
//!
//! let pipeline = QuizPipeline::new(LexiconClassifier::demo(), QuizConfig::default());
//! let output = pipeline
//!     .run("Andrew Malik started working at Google in Southern Canada this morning.")
//!     .unwrap();
//!
//! for (entity_type, questions) in output.questions.iter() {
//!     for q in questions {
//!         println!("[{}] {}", entity_type, q);
//!     }
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod decoder;
pub mod legend;
pub mod pipeline;
pub mod question;
pub mod render;
pub mod tagger;

pub use classifier::{ClassifierError, LexiconClassifier, StaticClassifier, TokenClassifier};
pub use config::QuizConfig;
pub use decoder::{decode, DecodeMode, Entity, SpanDecoder};
pub use pipeline::{PipelineError, PipelineEvent, QuizOutput, QuizPipeline};
pub use question::{mask_all_occurrences, QuestionMap};
pub use render::{Subword, SubwordConvention};
pub use tagger::{Tag, TaggedToken};
