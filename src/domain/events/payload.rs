//! Delta payloads carried by push events.

use serde_json::{Map, Value};

use crate::domain::catalog::CatalogEntity;
use crate::domain::foundation::EntityKey;

/// What a push event says about the changed data.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaPayload {
    /// Complete records sent inline, sub-collection included; may be
    /// applied without a fetch.
    Inline(Vec<CatalogEntity>),
    /// Only an identifier; the reader must re-fetch.
    Reference(EntityKey),
    /// Nothing usable; the reader must re-fetch.
    Unknown,
}

const KEY_FIELDS: &[&str] = &["id", "slug", "humanSlug", "code", "legacyCode"];

/// A record is only complete when it carries its editions, even if empty.
const EDITION_FIELDS: &[&str] = &["editions", "schedules"];

impl DeltaPayload {
    /// Interprets the `data` member of an event body.
    ///
    /// Returns the payload and, when the shape was invalid, a description of
    /// the problem. Invalid shapes always degrade to `Unknown`. A partial
    /// record (no editions member) is not a new value: it degrades to a
    /// reference to its key, or to `Unknown` inside a collection.
    pub fn from_data(data: Option<&Value>) -> (Self, Option<String>) {
        match data {
            None | Some(Value::Null) => (DeltaPayload::Unknown, None),
            Some(Value::String(id)) if !id.trim().is_empty() => {
                (DeltaPayload::Reference(EntityKey::Id(id.clone())), None)
            }
            Some(Value::Number(n)) => (DeltaPayload::Reference(EntityKey::Id(n.to_string())), None),
            Some(Value::Object(fields)) => {
                if let Some(key) = reference_key(fields) {
                    return (DeltaPayload::Reference(key), None);
                }
                if !is_complete(fields) {
                    return match key_of(fields) {
                        Some(key) => (DeltaPayload::Reference(key), None),
                        None => (
                            DeltaPayload::Unknown,
                            Some("partial record without a key".to_string()),
                        ),
                    };
                }
                match serde_json::from_value::<CatalogEntity>(Value::Object(fields.clone())) {
                    Ok(entity) => (DeltaPayload::Inline(vec![entity]), None),
                    Err(e) => (DeltaPayload::Unknown, Some(format!("inline entity: {e}"))),
                }
            }
            Some(Value::Array(items)) => {
                match items
                    .iter()
                    .cloned()
                    .map(serde_json::from_value::<CatalogEntity>)
                    .collect::<Result<Vec<_>, _>>()
                {
                    Ok(_) if !items.iter().all(|item| item.as_object().is_some_and(is_complete)) => {
                        (DeltaPayload::Unknown, None)
                    }
                    Ok(entities) => (DeltaPayload::Inline(entities), None),
                    Err(e) => (DeltaPayload::Unknown, Some(format!("inline collection: {e}"))),
                }
            }
            Some(other) => (
                DeltaPayload::Unknown,
                Some(format!("unexpected data type: {other}")),
            ),
        }
    }

    /// True when the reader has to go back to the pull protocol.
    pub fn requires_fetch(&self) -> bool {
        !matches!(self, DeltaPayload::Inline(_))
    }
}

/// An object carrying nothing but key fields is a reference, not a record.
fn reference_key(fields: &Map<String, Value>) -> Option<EntityKey> {
    if fields.is_empty() || !fields.keys().all(|k| KEY_FIELDS.contains(&k.as_str())) {
        return None;
    }
    key_of(fields)
}

fn is_complete(fields: &Map<String, Value>) -> bool {
    EDITION_FIELDS.iter().any(|name| fields.contains_key(*name))
}

/// Entity key named by an object's key fields, `id > slug > code`.
fn key_of(fields: &Map<String, Value>) -> Option<EntityKey> {
    let text = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| fields.get(*n))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    };
    let id = text(&["id"]);
    let slug = text(&["slug", "humanSlug"]);
    let code = text(&["code", "legacyCode"]);
    EntityKey::resolve(id.as_deref(), slug.as_deref(), code.as_deref())
}
