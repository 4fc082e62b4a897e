//! Configuração do servidor: arquivo JSON opcional + variáveis de ambiente.
//!
//! - `CLOZE_CONFIG`: caminho de um JSON com [`ServerConfig`]
//! - `CLOZE_BIND_ADDR`: sobrescreve `bind_addr`
//! - `CLOZE_MAX_PER_TYPE`: sobrescreve `quiz.max_per_entity_type`

use cloze_core::classifier::LexiconEntry;
use cloze_core::QuizConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub quiz: QuizConfig,
    /// Entradas extras do gazetteer; vazio usa o gazetteer de demonstração.
    pub lexicon: Vec<LexiconEntry>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            quiz: QuizConfig::default(),
            lexicon: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Carrega a partir do processo atual.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var("CLOZE_CONFIG") {
            Ok(path) => Some(std::fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?),
            Err(_) => None,
        };
        Self::from_sources(file.as_deref(), |name| std::env::var(name).ok())
    }

    /// Monta a configuração a partir do conteúdo do arquivo e de um leitor de variáveis.
    pub fn from_sources(
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config: ServerConfig = match file {
            Some(json) => serde_json::from_str(json)?,
            None => ServerConfig::default(),
        };

        if let Some(addr) = env("CLOZE_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(raw) = env("CLOZE_MAX_PER_TYPE") {
            config.quiz.max_per_entity_type = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "CLOZE_MAX_PER_TYPE",
                value: raw.clone(),
            })?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloze_core::DecodeMode;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = ServerConfig::from_sources(None, env_of(&[])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.quiz.max_per_entity_type, 2);
        assert!(cfg.lexicon.is_empty());
    }

    #[test]
    fn test_file_and_env_overrides() {
        let file = r#"{"bind_addr": "127.0.0.1:8080", "quiz": {"max_per_entity_type": 4, "decode_mode": "strict"},
                       "lexicon": [{"entity_type": "ORG", "phrase": "Acme"}]}"#;
        let cfg = ServerConfig::from_sources(Some(file), env_of(&[("CLOZE_MAX_PER_TYPE", "3")])).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.quiz.max_per_entity_type, 3);
        assert_eq!(cfg.quiz.decode_mode, DecodeMode::Strict);
        assert_eq!(cfg.lexicon.len(), 1);
        assert_eq!(cfg.lexicon[0].confidence, 0.92);
    }

    #[test]
    fn test_invalid_env() {
        let err = ServerConfig::from_sources(None, env_of(&[("CLOZE_MAX_PER_TYPE", "two")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "CLOZE_MAX_PER_TYPE", .. }));
    }

    #[test]
    fn test_invalid_file() {
        assert!(matches!(
            ServerConfig::from_sources(Some("{not json"), env_of(&[])),
            Err(ConfigError::Json(_))
        ));
    }
}
