//! # Legenda dos Rótulos
//!
//! Descrição do esquema BIO e das famílias de entidades que o modelo de
//! referência produz, com a cor de destaque usada pela interface.
//!
//! | Tipo | Significado          |
//! |------|----------------------|
//! | PER  | Pessoa               |
//! | LOC  | Local                |
//! | GEO  | Entidade geográfica  |
//! | ORG  | Organização          |
//! | GPE  | Entidade geopolítica |
//! | TIM  | Expressão temporal   |
//! | ART  | Artefato             |
//! | EVE  | Evento               |
//! | NAT  | Fenômeno natural     |

use serde::Serialize;

use crate::tagger::Tag;

/// Uma família de rótulos (`B-X` e `I-X` compartilham o estilo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelFamily {
    pub entity_type: &'static str,
    pub description: &'static str,
    pub background: &'static str,
    pub foreground: &'static str,
}

impl LabelFamily {
    /// Estilo CSS inline para o highlight.
    pub fn css(&self) -> String {
        format!("background-color:{}; color:{};", self.background, self.foreground)
    }
}

pub const LABEL_FAMILIES: &[LabelFamily] = &[
    LabelFamily { entity_type: "PER", description: "Person", background: "#1f77b4", foreground: "#ffffff" },
    LabelFamily { entity_type: "LOC", description: "Location", background: "#ff7f0e", foreground: "#000000" },
    LabelFamily { entity_type: "GEO", description: "Geographical Entity", background: "#2ca02c", foreground: "#ffffff" },
    LabelFamily { entity_type: "ORG", description: "Organization", background: "#d62728", foreground: "#ffffff" },
    LabelFamily { entity_type: "GPE", description: "Geopolitical Entity", background: "#9467bd", foreground: "#ffffff" },
    LabelFamily { entity_type: "TIM", description: "Time Expression", background: "#8c564b", foreground: "#ffffff" },
    LabelFamily { entity_type: "ART", description: "Artifact", background: "#e377c2", foreground: "#000000" },
    LabelFamily { entity_type: "EVE", description: "Event", background: "#7f7f7f", foreground: "#ffffff" },
    LabelFamily { entity_type: "NAT", description: "Natural Phenomenon", background: "#bcbd22", foreground: "#000000" },
];

pub const BIO_DESCRIPTION: &str = "\
BIO Format:
- B- (Beginning): Start of an entity
- I- (Inside): Continuation of the same entity
- O (Outside): Not an entity";

/// Família de um rótulo (`"I-GPE"` → GPE). `O` e tipos desconhecidos não têm estilo.
pub fn family_for_label(label: &str) -> Option<&'static LabelFamily> {
    let tag = Tag::from_label(label);
    let entity_type = tag.entity_type()?;
    LABEL_FAMILIES.iter().find(|f| f.entity_type == entity_type)
}

/// Estilo CSS do rótulo, ou string vazia quando não há.
pub fn label_style(label: &str) -> String {
    family_for_label(label).map(LabelFamily::css).unwrap_or_default()
}

/// Texto completo da legenda: esquema BIO + rótulos por família.
pub fn description() -> String {
    let mut out = String::from(BIO_DESCRIPTION);
    out.push_str("\n\nEntity Labels:");
    for f in LABEL_FAMILIES {
        out.push_str(&format!("\n- B-{t}, I-{t}: {}", f.description, t = f.entity_type));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_lookup() {
        assert_eq!(family_for_label("B-PER").unwrap().background, "#1f77b4");
        assert_eq!(family_for_label("I-PER"), family_for_label("B-PER"));
        assert!(family_for_label("O").is_none());
        assert!(family_for_label("B-FOO").is_none());
    }

    #[test]
    fn test_label_style() {
        assert_eq!(label_style("B-LOC"), "background-color:#ff7f0e; color:#000000;");
        assert_eq!(label_style("O"), "");
    }

    #[test]
    fn test_description_lists_every_family() {
        let text = description();
        assert!(text.starts_with("BIO Format:"));
        for f in LABEL_FAMILIES {
            assert!(text.contains(&format!("B-{}, I-{}", f.entity_type, f.entity_type)));
        }
        assert!(text.contains("- B-TIM, I-TIM: Time Expression"));
    }
}
