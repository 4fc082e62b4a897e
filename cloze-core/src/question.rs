//! # Gerador de Questões de Lacuna
//!
//! Para cada entidade decodificada, cria uma cópia do texto original com o
//! texto da entidade trocado por uma lacuna (`______`). O número de questões
//! por tipo de entidade é limitado por `max_per_type`.
//!
//! ## Exemplo
//!
//! Texto: `"Andrew Malik started working at Google in Southern Canada."`
//!
//! | Tipo | Questão |
//! |------|---------|
//! | PER  | `"______ started working at Google in Southern Canada."` |
//! | ORG  | `"Andrew Malik started working at ______ in Southern Canada."` |

use regex::RegexBuilder;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::decoder::Entity;
use crate::render::SubwordConvention;

/// Marcador de lacuna padrão.
pub const BLANK: &str = "______";

/// Limite mínimo de tamanho do regex compilado (o padrão do crate `regex`).
const MIN_REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);
/// Bytes de programa reservados por byte do literal (variantes de caixa incluídas).
const REGEX_BYTES_PER_LITERAL_BYTE: usize = 256;

/// Questões agrupadas por tipo de entidade, na ordem em que cada tipo foi examinado.
///
/// Um tipo aparece assim que uma entidade dele é considerada, mesmo que o
/// limite já tenha sido atingido e a lista fique vazia.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionMap {
    entries: Vec<(String, Vec<String>)>,
}

impl QuestionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retorna a lista do tipo, criando-a vazia no primeiro acesso.
    pub fn get_or_insert_empty(&mut self, entity_type: &str) -> &mut Vec<String> {
        let idx = match self.entries.iter().position(|(t, _)| t == entity_type) {
            Some(idx) => idx,
            None => {
                self.entries.push((entity_type.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn get(&self, entity_type: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(t, _)| t == entity_type)
            .map(|(_, qs)| qs.as_slice())
    }

    pub fn contains_type(&self, entity_type: &str) -> bool {
        self.get(entity_type).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(t, qs)| (t.as_str(), qs.as_slice()))
    }

    /// Apenas os tipos que receberam ao menos uma questão.
    pub fn non_empty(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.iter().filter(|(_, qs)| !qs.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total de questões somando todos os tipos.
    pub fn question_count(&self) -> usize {
        self.entries.iter().map(|(_, qs)| qs.len()).sum()
    }
}

impl Serialize for QuestionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (t, qs) in &self.entries {
            map.serialize_entry(t, qs)?;
        }
        map.end()
    }
}

/// Substitui TODAS as ocorrências de `literal` em `text` por `blank`, sem diferenciar maiúsculas.
///
/// `literal` é tratado como texto puro (caracteres especiais de regex são escapados).
/// Um literal vazio devolve o texto intacto. Os limites do regex (programa e cache
/// do DFA) crescem com o literal, então só falha se nem assim ele couber.
pub fn mask_all_occurrences(text: &str, literal: &str, blank: &str) -> Result<String, regex::Error> {
    let size_limit = MIN_REGEX_SIZE_LIMIT.max(literal.len().saturating_mul(REGEX_BYTES_PER_LITERAL_BYTE));
    mask_with_limit(text, literal, blank, size_limit)
}

fn mask_with_limit(text: &str, literal: &str, blank: &str, size_limit: usize) -> Result<String, regex::Error> {
    if literal.is_empty() {
        return Ok(text.to_string());
    }
    let re = RegexBuilder::new(&regex::escape(literal))
        .case_insensitive(true)
        .size_limit(size_limit)
        .dfa_size_limit(size_limit)
        .build()?;
    Ok(re.replace_all(text, regex::NoExpand(blank)).into_owned())
}

/// Gera as questões de lacuna para as entidades, na ordem de descoberta.
pub struct QuestionGenerator<'a, C: SubwordConvention> {
    convention: &'a C,
    max_per_type: usize,
    blank: &'a str,
    size_limit: Option<usize>,
}

impl<'a, C: SubwordConvention> QuestionGenerator<'a, C> {
    pub fn new(convention: &'a C, max_per_type: usize) -> Self {
        Self {
            convention,
            max_per_type,
            blank: BLANK,
            size_limit: None,
        }
    }

    pub fn with_blank(mut self, blank: &'a str) -> Self {
        self.blank = blank;
        self
    }

    /// Fixa o limite do regex em vez de derivá-lo do tamanho da entidade.
    pub fn with_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = Some(size_limit);
        self
    }

    /// Examina uma entidade e, se couber no limite do tipo, adiciona sua questão.
    ///
    /// Retorna a questão criada, ou `None` se a entidade foi pulada (texto vazio,
    /// limite do tipo atingido ou regex grande demais). Uma entidade pulada não
    /// ocupa vaga do tipo.
    pub fn offer<'m>(&self, questions: &'m mut QuestionMap, original_text: &str, entity: &Entity) -> Option<&'m str> {
        let rendered = self.convention.render(&entity.tokens);
        let ent_text = rendered.trim();
        if ent_text.is_empty() {
            return None;
        }

        let list = questions.get_or_insert_empty(&entity.entity_type);
        if list.len() >= self.max_per_type {
            return None;
        }
        let masked = match self.size_limit {
            Some(limit) => mask_with_limit(original_text, ent_text, self.blank, limit),
            None => mask_all_occurrences(original_text, ent_text, self.blank),
        };
        match masked {
            Ok(question) => {
                list.push(question);
                list.last().map(String::as_str)
            }
            Err(e) => {
                warn!(entity_type = %entity.entity_type, chars = ent_text.len(), error = %e, "entidade não mascarada");
                None
            }
        }
    }

    pub fn generate(&self, original_text: &str, entities: &[Entity]) -> QuestionMap {
        let mut questions = QuestionMap::new();
        for entity in entities {
            self.offer(&mut questions, original_text, entity);
        }
        questions
    }
}

/// Atalho com a convenção e o marcador padrão.
pub fn generate<C: SubwordConvention>(
    original_text: &str,
    entities: &[Entity],
    max_per_type: usize,
    convention: &C,
) -> QuestionMap {
    QuestionGenerator::new(convention, max_per_type).generate(original_text, entities)
}
