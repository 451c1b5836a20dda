//! Validated pull-protocol responses.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::entity::{parse_lenient_time, CatalogEntity};
use crate::domain::foundation::Timestamp;

/// Payload of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// `data: null`, e.g. a single-entity query that matched nothing.
    Empty,
    One(CatalogEntity),
    Many(Vec<CatalogEntity>),
}

impl ResponseData {
    /// Decodes the `data` member of the response envelope.
    pub fn from_value(value: Option<Value>) -> Result<Self, serde_json::Error> {
        match value {
            None | Some(Value::Null) => Ok(ResponseData::Empty),
            Some(Value::Array(items)) => {
                let entities = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<CatalogEntity>, _>>()?;
                Ok(ResponseData::Many(entities))
            }
            Some(other) => Ok(ResponseData::One(serde_json::from_value(other)?)),
        }
    }

    /// Flattens to a list regardless of arity.
    pub fn entities(&self) -> Vec<CatalogEntity> {
        match self {
            ResponseData::Empty => Vec::new(),
            ResponseData::One(entity) => vec![entity.clone()],
            ResponseData::Many(entities) => entities.clone(),
        }
    }

    /// Borrowing iterator over the entities.
    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntity> {
        match self {
            ResponseData::Empty => [].iter(),
            ResponseData::One(entity) => std::slice::from_ref(entity).iter(),
            ResponseData::Many(entities) => entities.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResponseData::Empty => 0,
            ResponseData::One(_) => 1,
            ResponseData::Many(entities) => entities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Paging and timing metadata sent alongside `data`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResponseMeta {
    pub total: Option<u64>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub returned: Option<u64>,
    #[serde(deserialize_with = "meta_timestamp")]
    pub timestamp: Option<Timestamp>,
}

fn meta_timestamp<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
    let raw = Option::<Value>::deserialize(d)?;
    Ok(raw.as_ref().and_then(parse_lenient_time))
}

/// A response that passed envelope validation (`success: true`).
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogResponse {
    pub data: ResponseData,
    pub meta: ResponseMeta,
    /// Freshness hint from the `Cache-Control` header, if any.
    pub cache_ttl_hint: Option<Duration>,
}

impl CatalogResponse {
    pub fn new(data: ResponseData) -> Self {
        Self {
            data,
            meta: ResponseMeta::default(),
            cache_ttl_hint: None,
        }
    }

    pub fn with_cache_ttl_hint(mut self, hint: Option<Duration>) -> Self {
        self.cache_ttl_hint = hint;
        self
    }

    pub fn entities(&self) -> Vec<CatalogEntity> {
        self.data.entities()
    }
}
