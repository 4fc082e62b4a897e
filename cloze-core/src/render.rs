//! # Reconstrução do Texto das Entidades
//!
//! Tokenizadores de sub-palavras quebram palavras raras em pedaços
//! (`"Washington"` → `"Wash"`, `"##ington"`). Para montar a lacuna precisamos
//! do texto de superfície de volta, então cada convenção de sub-palavra sabe
//! desfazer a própria segmentação.

use serde::{Deserialize, Serialize};

/// Convenção de marcação de sub-palavras usada pelo tokenizador do modelo.
pub trait SubwordConvention {
    /// Junta os tokens de uma entidade em um único texto legível.
    fn render(&self, tokens: &[String]) -> String;
}

/// Convenções suportadas, selecionáveis via configuração.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subword {
    /// WordPiece (BERT): continuação marcada com prefixo, ex: `"##ington"`.
    WordPiece { continuation_prefix: String },
    /// SentencePiece/Metaspace: início de palavra marcado, ex: `"▁Wash"`, `"ington"`.
    Metaspace { marker: String },
    /// Tokens já são palavras inteiras.
    Whitespace,
}

impl Default for Subword {
    fn default() -> Self {
        Subword::WordPiece {
            continuation_prefix: "##".to_string(),
        }
    }
}

impl SubwordConvention for Subword {
    fn render(&self, tokens: &[String]) -> String {
        match self {
            Subword::WordPiece { continuation_prefix } => {
                let joined = tokens.join(" ");
                if continuation_prefix.is_empty() {
                    return joined;
                }
                // Só remove o marcador precedido de espaço: um "##" no primeiro token fica.
                joined.replace(&format!(" {}", continuation_prefix), "")
            }
            Subword::Metaspace { marker } => {
                let joined = tokens.concat();
                if marker.is_empty() {
                    return joined;
                }
                joined.replace(marker.as_str(), " ").trim().to_string()
            }
            Subword::Whitespace => tokens.join(" "),
        }
    }
}
