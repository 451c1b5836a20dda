//! Catalog entities and their editions as read from the upstream feed.
//!
//! Both types are read-only copies. Fields the synchronization layer does not
//! interpret are kept verbatim in `attributes` so presentation code still
//! sees the full record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{EditionId, EntityId, EntityKey, Timestamp};

/// A course or learning-path record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    pub id: EntityId,

    #[serde(default, alias = "humanSlug", skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(default, alias = "legacyCode", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Last observed change; the feed carries no version number.
    #[serde(
        default,
        with = "lenient_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Timestamp>,

    #[serde(default, alias = "schedules", skip_serializing_if = "Vec::is_empty")]
    pub editions: Vec<Edition>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CatalogEntity {
    /// Checks whether this entity is the one identified by `key`.
    pub fn matches(&self, key: &EntityKey) -> bool {
        match key {
            EntityKey::Id(id) => self.id.as_str() == id,
            EntityKey::Slug(slug) => self.slug.as_deref() == Some(slug.as_str()),
            EntityKey::Code(code) => self.code.as_deref() == Some(code.as_str()),
        }
    }

    /// Finds an edition by identity.
    pub fn edition(&self, id: &EditionId) -> Option<&Edition> {
        self.editions.iter().find(|e| &e.id == id)
    }
}

/// One concrete offering of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edition {
    pub id: EditionId,

    #[serde(default, alias = "startDate", with = "lenient_time", skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<Timestamp>,

    #[serde(default, alias = "endDate", with = "lenient_time", skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<Timestamp>,

    #[serde(
        default,
        alias = "registrationDeadline",
        with = "lenient_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub enrollment_deadline: Option<Timestamp>,

    /// Explicit enrollment switch from upstream; absent means "follow the deadline".
    #[serde(default, alias = "registrationOpen", skip_serializing_if = "Option::is_none")]
    pub enrollment_open: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,

    #[serde(default, alias = "availableSeats", skip_serializing_if = "Option::is_none")]
    pub seats_available: Option<u32>,

    #[serde(default)]
    pub sold_out: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Edition {
    /// Creates an edition with only its identity set.
    pub fn new(id: EditionId) -> Self {
        Self {
            id,
            starts_at: None,
            ends_at: None,
            enrollment_deadline: None,
            enrollment_open: None,
            capacity: None,
            seats_available: None,
            sold_out: false,
            price: None,
            attributes: Map::new(),
        }
    }

    /// Sold out when flagged upstream or when no seats remain.
    pub fn is_sold_out(&self) -> bool {
        self.sold_out || self.seats_available == Some(0)
    }

    /// Enrollment is open unless switched off upstream or the deadline passed.
    pub fn is_enrollment_open(&self, now: &Timestamp) -> bool {
        if self.enrollment_open == Some(false) {
            return false;
        }
        match &self.enrollment_deadline {
            Some(deadline) => !deadline.is_before(now),
            None => true,
        }
    }
}

/// Accepts RFC 3339 strings, bare `YYYY-MM-DD` dates and epoch milliseconds.
/// Anything else reads as absent rather than failing the whole record.
mod lenient_time {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    use crate::domain::foundation::Timestamp;

    pub fn serialize<S: Serializer>(value: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Timestamp>, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(parse))
    }

    pub(crate) fn parse(value: &Value) -> Option<Timestamp> {
        match value {
            Value::String(s) => Timestamp::parse_rfc3339(s).or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| Timestamp::from_datetime(dt.and_utc()))
            }),
            Value::Number(n) => n.as_i64().and_then(Timestamp::from_unix_millis),
            _ => None,
        }
    }
}

pub(crate) use lenient_time::parse as parse_lenient_time;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edition(id: &str) -> Edition {
        Edition::new(EditionId::new(id).unwrap())
    }

    #[test]
    fn deserializes_upstream_course_with_aliases() {
        let entity: CatalogEntity = serde_json::from_value(json!({
            "id": "c-1",
            "humanSlug": "example-course",
            "legacyCode": "EX1",
            "title": "Example",
            "updatedAt": "2025-01-10T00:00:00Z",
            "editions": [
                {"id": "e-1", "startDate": "2025-03-01", "availableSeats": 4, "price": 990.0}
            ]
        }))
        .unwrap();

        assert_eq!(entity.slug.as_deref(), Some("example-course"));
        assert_eq!(entity.code.as_deref(), Some("EX1"));
        assert!(entity.updated_at.is_some());
        assert_eq!(entity.attributes.get("title"), Some(&json!("Example")));
        assert_eq!(entity.editions[0].seats_available, Some(4));
        assert!(entity.editions[0].starts_at.is_some());
    }

    #[test]
    fn unparseable_dates_read_as_absent() {
        let e: Edition = serde_json::from_value(json!({"id": "e", "startDate": "soon"})).unwrap();
        assert!(e.starts_at.is_none());
    }

    #[test]
    fn epoch_millis_dates_are_accepted() {
        let e: Edition =
            serde_json::from_value(json!({"id": "e", "enrollmentDeadline": 1_705_276_800_000_i64})).unwrap();
        assert!(e.enrollment_deadline.is_some());
    }

    #[test]
    fn matches_any_of_the_three_keys() {
        let entity: CatalogEntity =
            serde_json::from_value(json!({"id": "c-1", "slug": "s", "code": "K"})).unwrap();
        assert!(entity.matches(&EntityKey::Id("c-1".into())));
        assert!(entity.matches(&EntityKey::Slug("s".into())));
        assert!(entity.matches(&EntityKey::Code("K".into())));
        assert!(!entity.matches(&EntityKey::Slug("other".into())));
    }

    #[test]
    fn zero_seats_counts_as_sold_out() {
        let mut e = edition("e");
        assert!(!e.is_sold_out());
        e.seats_available = Some(0);
        assert!(e.is_sold_out());
    }

    #[test]
    fn enrollment_closes_after_deadline_or_when_switched_off() {
        let now = Timestamp::now();
        let mut e = edition("e");
        assert!(e.is_enrollment_open(&now));

        e.enrollment_deadline = Some(now.plus_days(-1));
        assert!(!e.is_enrollment_open(&now));

        e.enrollment_deadline = Some(now.plus_days(3));
        e.enrollment_open = Some(false);
        assert!(!e.is_enrollment_open(&now));
    }
}
