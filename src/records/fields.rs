//! Field lookup tables for heterogeneous stored documents.
//!
//! Producers have written the same logical field under many names over time
//! and sometimes nest the payload under a container property. Both concerns
//! are data here: an ordered list of payload sources and, per logical field,
//! an ordered list of keys. Lookups walk the lists and stop at the first hit.

#![allow(missing_docs)]

use std::borrow::Cow;

use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// Where a payload container may live on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// A property holding a JSON object.
    Object(&'static str),
    /// A property holding a string that decodes to a JSON object.
    EncodedObject(&'static str),
}

/// Payload containers in priority order.
pub const PAYLOAD_SOURCES: &[PayloadSource] = &[
    PayloadSource::Object("fields"),
    PayloadSource::Object("data"),
    PayloadSource::Object("json"),
    PayloadSource::EncodedObject("json"),
];

impl PayloadSource {
    /// Extract the payload object from `doc`, if this source applies.
    pub fn extract<'a>(&self, doc: &'a Object) -> Option<Cow<'a, Object>> {
        match *self {
            Self::Object(key) => doc.get(key)?.as_object().map(Cow::Borrowed),
            Self::EncodedObject(key) => {
                let raw = doc.get(key)?.as_str()?;
                match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Object(map)) => Some(Cow::Owned(map)),
                    _ => None,
                }
            }
        }
    }
}

/// Which layer of the document a key is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The nested payload (or the document itself when it has none).
    Payload,
    /// The document's top level.
    Document,
}

/// One step of a lookup chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKey {
    pub scope: Scope,
    pub key: &'static str,
}

const fn nested(key: &'static str) -> FieldKey {
    FieldKey {
        scope: Scope::Payload,
        key,
    }
}

const fn top(key: &'static str) -> FieldKey {
    FieldKey {
        scope: Scope::Document,
        key,
    }
}

/// Timestamp keys in priority order.
pub const TIMESTAMP_CHAIN: &[FieldKey] = &[
    nested("currentDate"),
    nested("executionDate"),
    top("currentDate"),
    top("executionDate"),
    top("createdAt"),
    nested("createdAt"),
];

/// Execution-duration keys in priority order.
pub const DURATION_CHAIN: &[FieldKey] = &[
    nested("ExecutionTime"),
    nested("executionTime"),
    nested("tiempoRequerido"),
    top("ExecutionTime"),
];

pub const AIGENT_ID_ALIASES: &[&str] = &[
    "aigentId",
    "AigentID",
    "aigentID",
    "AigentId",
    "aigent_id",
    "agentId",
];

pub const CLIENT_ADDRESS_ALIASES: &[&str] = &[
    "clientAddress",
    "ClientAddress",
    "client_address",
    "direccionCliente",
    "DireccionCliente",
    "direccion",
    "address",
];

pub const BANDWIDTH_ALIASES: &[&str] = &[
    "bandwidth",
    "Bandwidth",
    "anchoBanda",
    "AnchoBanda",
    "ancho_de_banda",
];

pub const KIT_CONFIRMATION_ALIASES: &[&str] = &[
    "kitConfirmation",
    "KitConfirmation",
    "kit_confirmation",
    "confirmacionKit",
    "ConfirmacionKit",
    "kit",
];

/// The two readable layers of a document.
#[derive(Debug)]
pub struct Sources<'a> {
    payload: Cow<'a, Object>,
    document: &'a Object,
}

impl<'a> Sources<'a> {
    /// Resolve the payload container of `document`. Without one, the document
    /// is its own payload.
    pub fn new(document: &'a Object) -> Self {
        let payload = PAYLOAD_SOURCES
            .iter()
            .find_map(|source| source.extract(document))
            .unwrap_or(Cow::Borrowed(document));
        Self { payload, document }
    }

    /// Raw value at one chain step. `null` counts as absent.
    pub fn get(&self, field: FieldKey) -> Option<&Value> {
        let layer: &Object = match field.scope {
            Scope::Payload => &self.payload,
            Scope::Document => self.document,
        };
        layer.get(field.key).filter(|v| !v.is_null())
    }

    /// First chain step whose value `parse` accepts.
    pub fn first_parsed<T>(
        &self,
        chain: &[FieldKey],
        mut parse: impl FnMut(&Value) -> Option<T>,
    ) -> Option<T> {
        chain
            .iter()
            .filter_map(|field| self.get(*field))
            .find_map(|value| parse(value))
    }

    /// Aliases tried against the payload first, then the top level.
    pub fn aliases(aliases: &'static [&'static str]) -> impl Iterator<Item = FieldKey> {
        aliases
            .iter()
            .map(|key| nested(*key))
            .chain(aliases.iter().map(|key| top(*key)))
    }

    /// First non-empty text value among `aliases`.
    pub fn first_text(&self, aliases: &'static [&'static str]) -> Option<String> {
        Self::aliases(aliases)
            .filter_map(|field| self.get(field))
            .find_map(scalar_text)
    }

    /// First value among `aliases` that coerces to a finite number.
    pub fn first_number(&self, aliases: &'static [&'static str]) -> Option<f64> {
        Self::aliases(aliases)
            .filter_map(|field| self.get(field))
            .find_map(scalar_number)
    }
}

/// Trimmed non-empty string form of a scalar.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Finite number from a number or a numeric string (comma decimals allowed).
pub fn scalar_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}
