//! Strongly-typed identifier value objects.
//!
//! Catalog identifiers are owned by the upstream system and are opaque
//! strings; observation identifiers are generated locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ValidationError;

/// Identifier as it appears on the wire; some feeds send numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Upstream identifier of a catalog entity (course or learning path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "RawId")]
pub struct EntityId(String);

impl EntityId {
    /// Creates an EntityId, rejecting blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::empty_field("id"));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for EntityId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl TryFrom<RawId> for EntityId {
    type Error = ValidationError;

    fn try_from(raw: RawId) -> Result<Self, Self::Error> {
        Self::new(raw.into_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an edition, unique only within its parent entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "RawId")]
pub struct EditionId(String);

impl EditionId {
    /// Creates an EditionId, rejecting blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::empty_field("edition id"));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for EditionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl TryFrom<RawId> for EditionId {
    type Error = ValidationError;

    fn try_from(raw: RawId) -> Result<Self, Self::Error> {
        Self::new(raw.into_string())
    }
}

impl fmt::Display for EditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the three interchangeable keys that identify a catalog entity.
///
/// When several are supplied at once, `Id` wins over `Slug`, which wins
/// over `Code`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Id(String),
    Slug(String),
    Code(String),
}

impl EntityKey {
    /// Resolves the highest-priority key from optional parts.
    pub fn resolve(id: Option<&str>, slug: Option<&str>, code: Option<&str>) -> Option<Self> {
        let present = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(String::from);

        present(id)
            .map(EntityKey::Id)
            .or_else(|| present(slug).map(EntityKey::Slug))
            .or_else(|| present(code).map(EntityKey::Code))
    }

    /// Query parameter name used by the pull protocol.
    pub fn param_name(&self) -> &'static str {
        match self {
            EntityKey::Id(_) => "id",
            EntityKey::Slug(_) => "slug",
            EntityKey::Code(_) => "code",
        }
    }

    /// The raw key value.
    pub fn value(&self) -> &str {
        match self {
            EntityKey::Id(v) | EntityKey::Slug(v) | EntityKey::Code(v) => v,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.param_name(), self.value())
    }
}

/// Locally generated identifier for one consumer observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationId(Uuid);

impl ObservationId {
    /// Creates a new random ObservationId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
