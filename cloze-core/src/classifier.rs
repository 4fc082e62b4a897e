//! # Fronteira com o Classificador de Tokens
//!
//! O modelo que rotula tokens é externo ao pipeline. Aqui ficam o contrato
//! ([`TokenClassifier`]) e dois adaptadores:
//!
//! - [`StaticClassifier`]: reaplica um fluxo já calculado (ex: enviado pelo cliente).
//! - [`LexiconClassifier`]: classificador de demonstração baseado em gazetteers,
//!   útil para rodar o servidor sem um modelo neural.
//!
//! Tokens delimitadores (`[CLS]`, `[SEP]`) são removidos nesta fronteira; o
//! decodificador nunca os vê.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::tagger::TaggedToken;

/// Marcadores de início/fim de sequência inseridos pelo tokenizador.
pub const SPECIAL_TOKENS: &[&str] = &["[CLS]", "[SEP]"];

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classification failed: {0}")]
    Failed(String),

    #[error("confidence {value} for token '{token}' is outside [0, 1]")]
    InvalidConfidence { token: String, value: f64 },
}

/// Modelo de classificação de tokens: texto → fluxo `(token, rótulo, confiança)`.
///
/// Implementações devem devolver o fluxo já sem tokens delimitadores.
pub trait TokenClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Vec<TaggedToken>, ClassifierError>;

    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// Remove os tokens delimitadores do fluxo.
pub fn strip_special_tokens(tokens: Vec<TaggedToken>) -> Vec<TaggedToken> {
    tokens
        .into_iter()
        .filter(|t| !SPECIAL_TOKENS.contains(&t.token.as_str()))
        .collect()
}

/// Reaplica um fluxo de rótulos previamente calculado, ignorando o texto.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    tokens: Vec<TaggedToken>,
}

impl StaticClassifier {
    pub fn new(tokens: Vec<TaggedToken>) -> Self {
        Self {
            tokens: strip_special_tokens(tokens),
        }
    }
}

impl TokenClassifier for StaticClassifier {
    fn classify(&self, _text: &str) -> Result<Vec<TaggedToken>, ClassifierError> {
        if let Some(bad) = self
            .tokens
            .iter()
            .find(|t| !(0.0..=1.0).contains(&t.confidence))
        {
            return Err(ClassifierError::InvalidConfidence {
                token: bad.token.clone(),
                value: bad.confidence,
            });
        }
        Ok(self.tokens.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Uma entrada do gazetteer: frase (já em minúsculas, por palavra) e seu tipo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub entity_type: String,
    pub phrase: String,
    #[serde(default = "default_entry_confidence")]
    pub confidence: f64,
}

fn default_entry_confidence() -> f64 {
    0.92
}

/// Classificador por dicionário de entidades conhecidas.
///
/// Divide o texto em palavras (fronteiras Unicode), procura a frase mais longa
/// do gazetteer começando em cada posição e rotula `B-`/`I-`. Após um título
/// ("Mr", "Dr", "President"...) uma palavra capitalizada vira `B-PER`.
pub struct LexiconClassifier {
    /// (tipo, partes em minúsculas, confiança), ordenado da frase mais longa para a mais curta
    phrases: Vec<(String, Vec<String>, f64)>,
    person_titles: Vec<String>,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            phrases: vec![],
            person_titles: ["mr", "mrs", "ms", "dr", "prof", "president", "senator", "minister", "ceo"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Gazetteer pequeno cobrindo a frase de exemplo da interface.
    pub fn demo() -> Self {
        let mut lexicon = Self::new();
        lexicon.add("PER", "Andrew Malik", 0.97);
        lexicon.add("ORG", "Google", 0.95);
        lexicon.add("GEO", "Southern Canada", 0.91);
        lexicon.add("GEO", "Canada", 0.93);
        lexicon.add("TIM", "this morning", 0.88);
        lexicon
    }

    pub fn from_entries(entries: &[LexiconEntry]) -> Self {
        let mut lexicon = Self::new();
        for e in entries {
            lexicon.add(&e.entity_type, &e.phrase, e.confidence);
        }
        lexicon
    }

    /// Registra uma frase. A confiança é limitada a `[0, 1]`; valores não
    /// finitos descartam a entrada.
    pub fn add(&mut self, entity_type: &str, phrase: &str, confidence: f64) {
        let parts: Vec<String> = words(phrase).into_iter().map(|w| w.to_lowercase()).collect();
        if parts.is_empty() || entity_type.is_empty() {
            return;
        }
        if !confidence.is_finite() {
            warn!(entity_type, phrase, confidence, "entrada do gazetteer ignorada: confiança inválida");
            return;
        }
        let confidence = if (0.0..=1.0).contains(&confidence) {
            confidence
        } else {
            warn!(entity_type, phrase, confidence, "confiança do gazetteer fora de [0, 1], ajustada");
            confidence.clamp(0.0, 1.0)
        };
        self.phrases.push((entity_type.to_string(), parts, confidence));
        self.phrases.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    fn longest_match(&self, lower: &[String], i: usize) -> Option<&(String, Vec<String>, f64)> {
        self.phrases.iter().find(|(_, parts, _)| {
            i + parts.len() <= lower.len() && parts.iter().enumerate().all(|(j, p)| lower[i + j] == *p)
        })
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::demo()
    }
}

impl TokenClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Result<Vec<TaggedToken>, ClassifierError> {
        let tokens = words(text);
        let lower: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let mut labels: Vec<Option<(String, f64)>> = vec![None; tokens.len()];

        // 1. Gazetteer (n-gramas, maior primeiro)
        let mut i = 0;
        while i < tokens.len() {
            match self.longest_match(&lower, i) {
                Some((entity_type, parts, confidence)) => {
                    labels[i] = Some((format!("B-{}", entity_type), *confidence));
                    for j in 1..parts.len() {
                        labels[i + j] = Some((format!("I-{}", entity_type), *confidence));
                    }
                    i += parts.len();
                }
                None => i += 1,
            }
        }

        // 2. Regra de título: "Dr. Smith" → Smith é PER
        for i in 0..tokens.len().saturating_sub(1) {
            if !self.person_titles.contains(&lower[i]) {
                continue;
            }
            // pula o ponto de abreviação ("Dr" "." "Smith")
            let next = if tokens.get(i + 1).map(String::as_str) == Some(".") { i + 2 } else { i + 1 };
            let capitalized = tokens
                .get(next)
                .and_then(|t| t.chars().next())
                .map(|c| c.is_uppercase())
                .unwrap_or(false);
            if capitalized && labels[next].is_none() {
                labels[next] = Some(("B-PER".to_string(), 0.80));
            }
        }

        Ok(tokens
            .into_iter()
            .zip(labels)
            .map(|(token, label)| match label {
                Some((label, confidence)) => TaggedToken::new(token, label, confidence),
                None => TaggedToken::new(token, "O", 0.99),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Palavras e pontuações do texto, sem espaços.
fn words(text: &str) -> Vec<String> {
    text.split_word_bounds()
        .filter(|w| !w.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(tokens: &[TaggedToken]) -> Vec<(&str, &str)> {
        tokens.iter().map(|t| (t.token.as_str(), t.label.as_str())).collect()
    }

    #[test]
    fn test_strip_special_tokens() {
        let stream = vec![
            TaggedToken::new("[CLS]", "O", 1.0),
            TaggedToken::new("Ann", "B-PER", 0.9),
            TaggedToken::new("[SEP]", "O", 1.0),
        ];
        let stripped = strip_special_tokens(stream);
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped[0].token, "Ann");
    }

    #[test]
    fn test_static_classifier_replays_stream() {
        let classifier = StaticClassifier::new(vec![
            TaggedToken::new("[CLS]", "O", 1.0),
            TaggedToken::new("Oslo", "B-LOC", 0.8),
        ]);
        let out = classifier.classify("whatever").unwrap();
        assert_eq!(labels(&out), vec![("Oslo", "B-LOC")]);
    }

    #[test]
    fn test_static_classifier_rejects_bad_confidence() {
        let classifier = StaticClassifier::new(vec![TaggedToken::new("Oslo", "B-LOC", 1.7)]);
        assert!(matches!(
            classifier.classify("Oslo"),
            Err(ClassifierError::InvalidConfidence { .. })
        ));
    }

    #[test]
    fn test_lexicon_demo_sentence() {
        let classifier = LexiconClassifier::demo();
        let out = classifier
            .classify("Andrew Malik started working at Google in Southern Canada this morning.")
            .unwrap();
        assert_eq!(
            labels(&out),
            vec![
                ("Andrew", "B-PER"),
                ("Malik", "I-PER"),
                ("started", "O"),
                ("working", "O"),
                ("at", "O"),
                ("Google", "B-ORG"),
                ("in", "O"),
                ("Southern", "B-GEO"),
                ("Canada", "I-GEO"),
                ("this", "B-TIM"),
                ("morning", "I-TIM"),
                (".", "O"),
            ]
        );
    }

    #[test]
    fn test_lexicon_is_case_insensitive() {
        let classifier = LexiconClassifier::demo();
        let out = classifier.classify("google and GOOGLE").unwrap();
        assert_eq!(out[0].label, "B-ORG");
        assert_eq!(out[2].label, "B-ORG");
    }

    #[test]
    fn test_title_pattern() {
        let classifier = LexiconClassifier::new();
        let out = classifier.classify("Yesterday Dr. Watson arrived").unwrap();
        let watson = out.iter().find(|t| t.token == "Watson").unwrap();
        assert_eq!(watson.label, "B-PER");
        assert!(classifier.is_empty());
    }

    #[test]
    fn test_from_entries() {
        let entries = vec![LexiconEntry {
            entity_type: "EVE".into(),
            phrase: "World Cup".into(),
            confidence: 0.9,
        }];
        let classifier = LexiconClassifier::from_entries(&entries);
        let out = classifier.classify("the World Cup final").unwrap();
        assert_eq!(labels(&out)[1..3], [("World", "B-EVE"), ("Cup", "I-EVE")]);
    }

    #[test]
    fn test_lexicon_confidence_stays_in_unit_range() {
        let entry = |phrase: &str, confidence: f64| LexiconEntry {
            entity_type: "ORG".into(),
            phrase: phrase.into(),
            confidence,
        };
        let classifier = LexiconClassifier::from_entries(&[
            entry("Acme", 5.0),
            entry("Globex", -0.3),
            entry("Initech", f64::NAN),
        ]);
        assert_eq!(classifier.len(), 2);

        let out = classifier.classify("Acme bought Globex and Initech").unwrap();
        assert_eq!(out[0].label, "B-ORG");
        assert_eq!(out[0].confidence, 1.0);
        assert_eq!(out[2].label, "B-ORG");
        assert_eq!(out[2].confidence, 0.0);
        assert_eq!(out[4].label, "O");
        assert!(out.iter().all(|t| (0.0..=1.0).contains(&t.confidence)));

        let replayed = StaticClassifier::new(out);
        assert!(replayed.classify("Acme bought Globex and Initech").is_ok());
    }
}
