//! Parâmetros do pipeline de questões.

use serde::{Deserialize, Serialize};

use crate::decoder::DecodeMode;
use crate::question::BLANK;
use crate::render::Subword;

/// Limite padrão de questões por tipo de entidade.
pub const DEFAULT_MAX_PER_ENTITY_TYPE: usize = 2;

/// Configuração do pipeline. Todos os campos têm padrão, então `{}` é um JSON válido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Máximo de questões geradas por tipo de entidade.
    pub max_per_entity_type: usize,
    pub decode_mode: DecodeMode,
    /// Convenção de sub-palavras do tokenizador que gerou o fluxo.
    pub subword: Subword,
    /// Marcador que substitui a entidade na questão.
    pub blank: String,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_per_entity_type: DEFAULT_MAX_PER_ENTITY_TYPE,
            decode_mode: DecodeMode::Lenient,
            subword: Subword::default(),
            blank: BLANK.to_string(),
        }
    }
}
