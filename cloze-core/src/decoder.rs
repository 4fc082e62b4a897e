//! # Decodificador de Spans BIO
//!
//! Converte o fluxo `(token, rótulo, confiança)` do classificador em uma lista
//! ordenada de [`Entity`]. A máquina de estados tem só dois estados:
//!
//! ```text
//!            B-X                      B-Y (fecha X, abre Y)
//!  OUTSIDE ───────► INSIDE(X) ◄──────────────┐
//!     ▲               │  │  I-*  (absorve)   │
//!     │   O / I-*     │  └───────────────────┘
//!     └───────────────┘  (fecha X)
//! ```
//!
//! A transição inteira está em [`step`], uma função pura. [`SpanDecoder`] apenas
//! guarda o estado atual e acumula as entidades fechadas.
//!
//! ## Modo tolerante vs estrito
//!
//! No modo [`DecodeMode::Lenient`] (padrão) um `I-Y` que aparece dentro de uma
//! entidade aberta do tipo `X` é absorvido por ela, sem comparar os tipos.
//! No modo [`DecodeMode::Strict`] esse `I-Y` fecha a entidade `X` e o
//! decodificador volta para OUTSIDE.

use serde::{Deserialize, Serialize};

use crate::tagger::{Tag, TaggedToken};

/// Uma entidade reconstruída: tipo + tokens na ordem em que apareceram.
///
/// Sempre tem pelo menos um token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub tokens: Vec<String>,
}

/// Política para `I-` cujo tipo difere da entidade aberta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Absorve o `I-` na entidade aberta, qualquer que seja o tipo.
    #[default]
    Lenient,
    /// Fecha a entidade aberta; o token divergente não inicia nada.
    Strict,
}

/// Estado da máquina BIO.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DecoderState {
    #[default]
    Outside,
    Inside { entity_type: String, tokens: Vec<String> },
}

impl DecoderState {
    /// Fecha a entidade em construção, se houver.
    pub fn close(self) -> Option<Entity> {
        match self {
            DecoderState::Outside => None,
            DecoderState::Inside { entity_type, tokens } => Some(Entity { entity_type, tokens }),
        }
    }

    pub fn is_inside(&self) -> bool {
        matches!(self, DecoderState::Inside { .. })
    }
}

/// Tabela de transição BIO.
///
/// Recebe o estado atual e o próximo token, devolve o novo estado e a entidade
/// que foi fechada por este token (se alguma).
pub fn step(state: DecoderState, token: &str, tag: &Tag, mode: DecodeMode) -> (DecoderState, Option<Entity>) {
    match (state, tag) {
        (state, Tag::Begin(t)) => {
            let closed = state.close();
            let opened = DecoderState::Inside {
                entity_type: t.clone(),
                tokens: vec![token.to_string()],
            };
            (opened, closed)
        }
        (DecoderState::Inside { entity_type, mut tokens }, Tag::Inside(_)) => {
            let continues = || Tag::is_valid_transition(&Tag::Inside(entity_type.clone()), tag);
            if mode == DecodeMode::Strict && !continues() {
                return (DecoderState::Outside, Some(Entity { entity_type, tokens }));
            }
            tokens.push(token.to_string());
            (DecoderState::Inside { entity_type, tokens }, None)
        }
        // O, rótulo malformado ou I- sem entidade aberta
        (state, _) => (DecoderState::Outside, state.close()),
    }
}

/// Decodificador incremental: um por texto processado.
#[derive(Debug, Default)]
pub struct SpanDecoder {
    state: DecoderState,
    mode: DecodeMode,
    entities: Vec<Entity>,
}

impl SpanDecoder {
    pub fn new(mode: DecodeMode) -> Self {
        Self {
            state: DecoderState::Outside,
            mode,
            entities: Vec::new(),
        }
    }

    /// Consome um token. Retorna a entidade fechada por ele, se houver.
    pub fn push(&mut self, token: &TaggedToken) -> Option<&Entity> {
        let state = std::mem::take(&mut self.state);
        let (next, closed) = step(state, &token.token, &token.tag(), self.mode);
        self.state = next;
        self.record(closed)
    }

    /// Fecha uma entidade pendente no fim do fluxo.
    pub fn flush(&mut self) -> Option<&Entity> {
        let closed = std::mem::take(&mut self.state).close();
        self.record(closed)
    }

    pub fn finish(mut self) -> Vec<Entity> {
        self.flush();
        self.entities
    }

    fn record(&mut self, closed: Option<Entity>) -> Option<&Entity> {
        let entity = closed?;
        self.entities.push(entity);
        self.entities.last()
    }
}

/// Decodifica o fluxo completo em entidades, na ordem de descoberta.
///
/// # Exemplo
/// `[B-PER, I-PER, O, B-LOC]` -> `[Entity(PER, 2 tokens), Entity(LOC, 1 token)]`
pub fn decode(tokens: &[TaggedToken], mode: DecodeMode) -> Vec<Entity> {
    let mut decoder = SpanDecoder::new(mode);
    for token in tokens {
        decoder.push(token);
    }
    decoder.finish()
}
