//! # Esquema de Tags BIO
//!
//! Define a representação dos rótulos produzidos pelo classificador de tokens.
//! Diferente de um modelo com categorias fixas, aqui o tipo da entidade é apenas
//! o sufixo do rótulo (`PER`, `LOC`, `GPE`...), vindo de qualquer modelo externo.
//!
//! ## Esquema BIO
//!
//! - `B-TAG`: Begin — primeiro token de uma entidade
//! - `I-TAG`: Inside — tokens subsequentes da mesma entidade
//! - `O`: Outside — não é parte de nenhuma entidade
//!
//! Qualquer rótulo fora desse formato (ex: `"X"`, `"B-"`, `"E-PER"`) é tratado
//! exatamente como `O`.

use serde::{Deserialize, Serialize};

/// Tag BIO já interpretada a partir do rótulo textual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// **Begin**: Marca o INÍCIO de uma entidade. Ex: **Andrew** (B-PER) Malik.
    Begin(String),
    /// **Inside**: Marca a CONTINUAÇÃO de uma entidade. Ex: Andrew **Malik** (I-PER).
    Inside(String),
    /// **Outside**: O token não faz parte de nenhuma entidade.
    Outside,
}

impl Tag {
    /// Parseia uma tag a partir do rótulo (ex: "B-PER" → Begin("PER")).
    ///
    /// Nunca falha: rótulos malformados viram `Outside`.
    pub fn from_label(s: &str) -> Self {
        if let Some(entity_type) = s.strip_prefix("B-") {
            if !entity_type.is_empty() {
                return Tag::Begin(entity_type.to_string());
            }
        }
        if let Some(entity_type) = s.strip_prefix("I-") {
            if !entity_type.is_empty() {
                return Tag::Inside(entity_type.to_string());
            }
        }
        Tag::Outside
    }

    /// Representação textual da tag (ex: "B-PER", "I-ORG", "O")
    pub fn label(&self) -> String {
        match self {
            Tag::Begin(t) => format!("B-{}", t),
            Tag::Inside(t) => format!("I-{}", t),
            Tag::Outside => "O".to_string(),
        }
    }

    /// Retorna o tipo de entidade desta tag (se for B- ou I-)
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Tag::Begin(t) | Tag::Inside(t) => Some(t),
            Tag::Outside => None,
        }
    }

    /// Verifica se a transição tag_prev → self é válida no esquema BIO
    ///
    /// Regras:
    /// - `I-X` só pode seguir `B-X` ou `I-X` (mesmo tipo)
    /// - `B-X` pode seguir qualquer tag
    /// - `O` pode seguir qualquer tag
    pub fn is_valid_transition(prev: &Tag, next: &Tag) -> bool {
        match next {
            Tag::Inside(t) => match prev {
                Tag::Begin(prev_t) | Tag::Inside(prev_t) => prev_t == t,
                _ => false,
            },
            _ => true,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Um token com seu rótulo BIO e a confiança atribuída pelo classificador.
///
/// É a unidade do fluxo token/rótulo recebido do modelo externo. O rótulo é
/// mantido exatamente como veio (inclusive se malformado) para exibição.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub token: String,
    pub label: String,
    /// Probabilidade/confiança desta atribuição (0.0 a 1.0)
    pub confidence: f64,
}

impl TaggedToken {
    pub fn new(token: impl Into<String>, label: impl Into<String>, confidence: f64) -> Self {
        Self {
            token: token.into(),
            label: label.into(),
            confidence,
        }
    }

    pub fn tag(&self) -> Tag {
        Tag::from_label(&self.label)
    }

    /// Confiança formatada para a UI (ex: 0.973 → "97.3%")
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}
