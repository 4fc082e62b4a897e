//! # Pipeline de Questões — Orquestrador com Eventos Observáveis
//!
//! Liga os estágios na ordem fixa:
//!
//! 1. **Classificador** ([`TokenClassifier`]): texto → fluxo `(token, rótulo, confiança)`.
//! 2. **Decodificador** ([`SpanDecoder`]): fluxo → entidades.
//! 3. **Renderização + Geração** ([`QuestionGenerator`]): entidades → questões de lacuna.
//!
//! Assim como no modo síncrono, o modo streaming emite um [`PipelineEvent`] por
//! passo via `mpsc`, para o servidor WebSocket repassar ao cliente.

use std::sync::mpsc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classifier::{ClassifierError, StaticClassifier, TokenClassifier};
use crate::config::QuizConfig;
use crate::decoder::{Entity, SpanDecoder};
use crate::question::{QuestionGenerator, QuestionMap};
use crate::render::SubwordConvention;
use crate::tagger::TaggedToken;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input text is empty")]
    EmptyInput,

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Resultado de uma execução: anotações por token (para highlight) e questões.
#[derive(Debug, Clone, Serialize)]
pub struct QuizOutput {
    pub annotations: Vec<TaggedToken>,
    pub entities: Vec<Entity>,
    pub questions: QuestionMap,
}

/// Eventos emitidos durante o processamento.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: fluxo recebido do classificador (já sem delimitadores).
    TokensReceived {
        tokens: Vec<TaggedToken>,
        total: usize,
    },
    /// **Passo 2**: uma entidade foi fechada pelo decodificador.
    EntityDecoded {
        index: usize,
        entity: Entity,
        text: String,
    },
    /// **Passo 3**: uma questão foi adicionada ao tipo.
    QuestionGenerated {
        entity_type: String,
        question: String,
    },
    Done {
        output: QuizOutput,
        processing_ms: u64,
    },
    Error {
        message: String,
    },
}

/// O pipeline principal. Não guarda estado entre chamadas: cada texto ganha
/// um decodificador novo.
pub struct QuizPipeline<C: TokenClassifier> {
    classifier: C,
    config: QuizConfig,
}

impl<C: TokenClassifier> QuizPipeline<C> {
    pub fn new(classifier: C, config: QuizConfig) -> Self {
        Self { classifier, config }
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// Processa o texto com a configuração do pipeline.
    pub fn run(&self, text: &str) -> Result<QuizOutput, PipelineError> {
        self.run_with(text, &self.config)
    }

    /// Processa o texto com uma configuração específica (ex: vinda da requisição).
    pub fn run_with(&self, text: &str, config: &QuizConfig) -> Result<QuizOutput, PipelineError> {
        self.execute(text, config, None)
    }

    /// Vários textos em paralelo; cada um tem seu próprio decodificador.
    pub fn run_batch(&self, texts: &[String]) -> Vec<Result<QuizOutput, PipelineError>> {
        texts.par_iter().map(|text| self.run(text)).collect()
    }

    /// Executa enviando eventos de progresso; termina sempre com `Done` ou `Error`.
    pub fn analyze_streaming(&self, text: &str, config: &QuizConfig, tx: mpsc::Sender<PipelineEvent>) {
        let start = Instant::now();
        match self.execute(text, config, Some(&tx)) {
            Ok(output) => {
                let _ = tx.send(PipelineEvent::Done {
                    output,
                    processing_ms: start.elapsed().as_millis() as u64,
                });
            }
            Err(e) => {
                let _ = tx.send(PipelineEvent::Error { message: e.to_string() });
            }
        }
    }

    fn execute(
        &self,
        text: &str,
        config: &QuizConfig,
        tx: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> Result<QuizOutput, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let tokens = self.classifier.classify(text).map_err(|e| {
            warn!(classifier = self.classifier.name(), error = %e, "classificador falhou");
            e
        })?;
        debug!(classifier = self.classifier.name(), tokens = tokens.len(), "fluxo recebido");

        let output = build_output(text, tokens, config, tx);
        info!(
            entities = output.entities.len(),
            questions = output.questions.question_count(),
            "questões geradas"
        );
        Ok(output)
    }
}

impl QuizPipeline<StaticClassifier> {
    /// Pipeline sobre um fluxo já rotulado, sem chamar modelo algum.
    pub fn from_stream(tokens: Vec<TaggedToken>, config: QuizConfig) -> Self {
        Self::new(StaticClassifier::new(tokens), config)
    }
}

/// Decodifica o fluxo e gera as questões: a parte pura do pipeline.
pub fn process_stream(text: &str, tokens: Vec<TaggedToken>, config: &QuizConfig) -> QuizOutput {
    build_output(text, tokens, config, None)
}

fn build_output(
    text: &str,
    tokens: Vec<TaggedToken>,
    config: &QuizConfig,
    tx: Option<&mpsc::Sender<PipelineEvent>>,
) -> QuizOutput {
    let emit = |event: PipelineEvent| {
        if let Some(tx) = tx {
            let _ = tx.send(event);
        }
    };

    emit(PipelineEvent::TokensReceived {
        tokens: tokens.clone(),
        total: tokens.len(),
    });

    // === Passo 2: Decodificação BIO ===
    let mut decoder = SpanDecoder::new(config.decode_mode);
    let mut index = 0;
    let mut emit_entity = |entity: Option<&Entity>| {
        if let Some(entity) = entity {
            emit(PipelineEvent::EntityDecoded {
                index,
                entity: entity.clone(),
                text: config.subword.render(&entity.tokens),
            });
            index += 1;
        }
    };
    for token in &tokens {
        emit_entity(decoder.push(token));
    }
    emit_entity(decoder.flush());
    let entities = decoder.finish();

    // === Passo 3: Questões ===
    let generator = QuestionGenerator::new(&config.subword, config.max_per_entity_type).with_blank(&config.blank);
    let mut questions = QuestionMap::new();
    for entity in &entities {
        if let Some(question) = generator.offer(&mut questions, text, entity) {
            emit(PipelineEvent::QuestionGenerated {
                entity_type: entity.entity_type.clone(),
                question: question.to_string(),
            });
        }
    }

    QuizOutput {
        annotations: tokens,
        entities,
        questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::LexiconClassifier;
    use crate::decoder::DecodeMode;

    const DEMO: &str = "Andrew Malik started working at Google in Southern Canada this morning.";

    struct FailingClassifier;

    impl TokenClassifier for FailingClassifier {
        fn classify(&self, _text: &str) -> Result<Vec<TaggedToken>, ClassifierError> {
            Err(ClassifierError::Unavailable("model not loaded".into()))
        }
    }

    fn stream(pairs: &[(&str, &str)]) -> Vec<TaggedToken> {
        pairs.iter().map(|(t, l)| TaggedToken::new(*t, *l, 0.9)).collect()
    }

    #[test]
    fn test_pipeline_demo_sentence() {
        let pipeline = QuizPipeline::new(LexiconClassifier::demo(), QuizConfig::default());
        let output = pipeline.run(DEMO).unwrap();
        assert_eq!(output.annotations.len(), 12);
        assert_eq!(output.entities.len(), 4);
        assert_eq!(
            output.questions.get("PER").unwrap(),
            &["______ started working at Google in Southern Canada this morning.".to_string()]
        );
        assert_eq!(
            output.questions.get("TIM").unwrap(),
            &["Andrew Malik started working at Google in Southern Canada ______.".to_string()]
        );
    }

    #[test]
    fn test_pipeline_empty_input() {
        let pipeline = QuizPipeline::new(LexiconClassifier::demo(), QuizConfig::default());
        assert!(matches!(pipeline.run("   \n"), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn test_pipeline_classifier_failure() {
        let pipeline = QuizPipeline::new(FailingClassifier, QuizConfig::default());
        let err = pipeline.run("Ann").unwrap_err();
        assert!(matches!(err, PipelineError::Classifier(ClassifierError::Unavailable(_))));
        assert_eq!(err.to_string(), "classifier unavailable: model not loaded");
    }

    #[test]
    fn test_from_stream_with_wordpieces() {
        let tokens = stream(&[
            ("[CLS]", "O"),
            ("Wash", "B-LOC"),
            ("##ington", "I-LOC"),
            ("is", "O"),
            ("big", "O"),
            ("[SEP]", "O"),
        ]);
        let pipeline = QuizPipeline::from_stream(tokens, QuizConfig::default());
        let output = pipeline.run("Washington is big").unwrap();
        assert_eq!(output.annotations.len(), 4);
        assert_eq!(output.questions.get("LOC").unwrap(), &["______ is big".to_string()]);
    }

    #[test]
    fn test_run_with_overrides_cap_and_mode() {
        let tokens = stream(&[("Ann", "B-PER"), ("Oslo", "I-LOC"), ("Bob", "B-PER")]);
        let pipeline = QuizPipeline::from_stream(tokens, QuizConfig::default());
        let config = QuizConfig {
            max_per_entity_type: 1,
            decode_mode: DecodeMode::Strict,
            ..QuizConfig::default()
        };
        let output = pipeline.run_with("Ann Oslo Bob", &config).unwrap();
        assert_eq!(output.entities.len(), 2);
        assert_eq!(output.entities[0].tokens, vec!["Ann".to_string()]);
        assert_eq!(output.questions.get("PER").unwrap(), &["______ Oslo Bob".to_string()]);
    }

    #[test]
    fn test_process_stream_cap() {
        let tokens = stream(&[
            ("Oslo", "B-LOC"),
            ("Rome", "B-LOC"),
            ("Lima", "B-LOC"),
            ("Kyiv", "B-LOC"),
            ("Quito", "B-LOC"),
        ]);
        let output = process_stream("Oslo Rome Lima Kyiv Quito", tokens, &QuizConfig::default());
        assert_eq!(output.entities.len(), 5);
        assert_eq!(output.questions.get("LOC").unwrap().len(), 2);
    }

    #[test]
    fn test_streaming_events_order() {
        let pipeline = QuizPipeline::new(LexiconClassifier::demo(), QuizConfig::default());
        let (tx, rx) = mpsc::channel();
        pipeline.analyze_streaming(DEMO, &QuizConfig::default(), tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();

        assert!(matches!(&events[0], PipelineEvent::TokensReceived { total: 12, .. }));
        let decoded = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::EntityDecoded { .. }))
            .count();
        assert_eq!(decoded, 4);
        if let Some(PipelineEvent::EntityDecoded { text, .. }) = events.get(1) {
            assert_eq!(text, "Andrew Malik");
        } else {
            panic!("segundo evento deve ser EntityDecoded");
        }
        assert!(matches!(events.last().unwrap(), PipelineEvent::Done { .. }));
    }

    #[test]
    fn test_streaming_reports_error() {
        let pipeline = QuizPipeline::new(FailingClassifier, QuizConfig::default());
        let (tx, rx) = mpsc::channel();
        pipeline.analyze_streaming("Ann", &QuizConfig::default(), tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], PipelineEvent::Error { .. }));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let pipeline = QuizPipeline::new(LexiconClassifier::demo(), QuizConfig::default());
        let texts = vec![
            DEMO.to_string(),
            "Google bought a house in Canada.".to_string(),
            "".to_string(),
        ];
        let batch = pipeline.run_batch(&texts);
        assert_eq!(batch.len(), 3);
        for (text, result) in texts.iter().zip(&batch) {
            match (pipeline.run(text), result) {
                (Ok(a), Ok(b)) => assert_eq!(a.entities, b.entities),
                (Err(_), Err(_)) => {}
                _ => panic!("resultado divergente para {:?}", text),
            }
        }
    }

    #[test]
    fn test_output_serializes() {
        let output = process_stream("Ann", stream(&[("Ann", "B-PER")]), &QuizConfig::default());
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["entities"][0]["type"], "PER");
        assert_eq!(json["questions"]["PER"][0], "______");
    }
}
