//! Pull-protocol queries and the cache key derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::EntityKey;

/// Upstream resource a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Course records, including their editions.
    Courses,
    /// Learning-path definitions.
    Paths,
    /// Lesson schedules.
    Schedules,
    /// Seat availability per edition.
    Availability,
}

impl Resource {
    /// Path segment appended to the endpoint base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Courses => "courses",
            Resource::Paths => "paths",
            Resource::Schedules => "schedules",
            Resource::Availability => "availability",
        }
    }

    /// Freshness family that decides the default TTL.
    pub fn family(&self) -> QueryFamily {
        match self {
            Resource::Paths => QueryFamily::Stable,
            Resource::Courses | Resource::Schedules | Resource::Availability => {
                QueryFamily::Volatile
            }
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// TTL family of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
    /// Seat counts, schedules and anything with editions. Short TTL.
    Volatile,
    /// Rarely-changing collections such as path definitions. Long TTL.
    Stable,
}

/// Filters for a collection query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CollectionFilter {
    pub category: Option<String>,
    pub kind: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// What a query selects: one entity by key, or a filtered collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Single(EntityKey),
    Collection(CollectionFilter),
}

/// A pull query against the upstream feed.
///
/// Construction normalizes the selector, so two queries that would hit the
/// upstream identically compare equal and share a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogQuery {
    resource: Resource,
    selector: Selector,
}

impl CatalogQuery {
    /// Query for one entity.
    pub fn entity(resource: Resource, key: EntityKey) -> Self {
        Self {
            resource,
            selector: Selector::Single(key),
        }
    }

    /// Query for one entity by slug.
    pub fn by_slug(resource: Resource, slug: impl Into<String>) -> Self {
        Self::entity(resource, EntityKey::Slug(slug.into()))
    }

    /// Query for one entity by id.
    pub fn by_id(resource: Resource, id: impl Into<String>) -> Self {
        Self::entity(resource, EntityKey::Id(id.into()))
    }

    /// Unfiltered collection query.
    pub fn collection(resource: Resource) -> Self {
        Self {
            resource,
            selector: Selector::Collection(CollectionFilter::default()),
        }
    }

    /// Builds a query from raw request parts, applying `id > slug > code`.
    /// Collection filters are ignored once any key is present.
    pub fn from_parts(
        resource: Resource,
        id: Option<&str>,
        slug: Option<&str>,
        code: Option<&str>,
        filter: CollectionFilter,
    ) -> Self {
        match EntityKey::resolve(id, slug, code) {
            Some(key) => Self::entity(resource, key),
            None => Self {
                resource,
                selector: Selector::Collection(filter),
            },
        }
    }

    pub fn with_category(self, category: impl Into<String>) -> Self {
        self.map_filter(|f| f.category = Some(category.into()))
    }

    pub fn with_kind(self, kind: impl Into<String>) -> Self {
        self.map_filter(|f| f.kind = Some(kind.into()))
    }

    pub fn with_limit(self, limit: u32) -> Self {
        self.map_filter(|f| f.limit = Some(limit))
    }

    pub fn with_offset(self, offset: u32) -> Self {
        self.map_filter(|f| f.offset = Some(offset))
    }

    fn map_filter(mut self, apply: impl FnOnce(&mut CollectionFilter)) -> Self {
        if let Selector::Collection(filter) = &mut self.selector {
            apply(filter);
        }
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn family(&self) -> QueryFamily {
        self.resource.family()
    }

    /// The entity key when this query selects a single entity.
    pub fn key(&self) -> Option<&EntityKey> {
        match &self.selector {
            Selector::Single(key) => Some(key),
            Selector::Collection(_) => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.selector, Selector::Collection(_))
    }

    /// Query string parameters in a stable order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match &self.selector {
            Selector::Single(key) => vec![(key.param_name(), key.value().to_string())],
            Selector::Collection(filter) => {
                let mut params = Vec::new();
                if let Some(category) = &filter.category {
                    params.push(("category", category.clone()));
                }
                if let Some(kind) = &filter.kind {
                    params.push(("type", kind.clone()));
                }
                if let Some(limit) = filter.limit {
                    params.push(("limit", limit.to_string()));
                }
                if let Some(offset) = filter.offset {
                    params.push(("offset", offset.to_string()));
                }
                params
            }
        }
    }

    /// Cache key for this query.
    pub fn shape(&self) -> QueryShape {
        QueryShape(self.clone())
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        let params = self.params();
        for (i, (name, value)) in params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}

/// Cache key: the normalized form of a [`CatalogQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryShape(CatalogQuery);

impl QueryShape {
    pub fn query(&self) -> &CatalogQuery {
        &self.0
    }

    pub fn family(&self) -> QueryFamily {
        self.0.family()
    }

    /// True when the cached response could contain the entity named by `key`.
    ///
    /// Collections always may; single-entity shapes only when keyed the
    /// same way with the same value.
    pub fn may_contain(&self, key: &EntityKey) -> bool {
        match self.0.key() {
            Some(own) => own == key,
            None => true,
        }
    }
}

impl fmt::Display for QueryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_applies_key_priority_and_drops_filters() {
        let filter = CollectionFilter {
            category: Some("data".into()),
            ..Default::default()
        };
        let q = CatalogQuery::from_parts(Resource::Courses, None, Some("rust"), Some("R1"), filter);
        assert_eq!(q.key(), Some(&EntityKey::Slug("rust".into())));
        assert_eq!(q.to_string(), "courses?slug=rust");
    }

    #[test]
    fn collection_params_are_ordered() {
        let q = CatalogQuery::collection(Resource::Courses)
            .with_offset(20)
            .with_limit(10)
            .with_kind("workshop")
            .with_category("cloud");
        assert_eq!(
            q.to_string(),
            "courses?category=cloud&type=workshop&limit=10&offset=20"
        );
    }

    #[test]
    fn filters_on_single_entity_queries_are_ignored() {
        let q = CatalogQuery::by_slug(Resource::Courses, "a").with_limit(5);
        assert_eq!(q, CatalogQuery::by_slug(Resource::Courses, "a"));
    }

    #[test]
    fn same_request_shares_a_shape() {
        let a = CatalogQuery::from_parts(Resource::Paths, Some("7"), Some("x"), None, Default::default());
        let b = CatalogQuery::by_id(Resource::Paths, "7");
        assert_eq!(a.shape(), b.shape());
    }

    #[test]
    fn families_follow_resource_volatility() {
        assert_eq!(Resource::Paths.family(), QueryFamily::Stable);
        assert_eq!(Resource::Availability.family(), QueryFamily::Volatile);
        assert_eq!(Resource::Courses.family(), QueryFamily::Volatile);
    }

    #[test]
    fn shape_containment() {
        let single = CatalogQuery::by_slug(Resource::Courses, "a").shape();
        let coll = CatalogQuery::collection(Resource::Courses).shape();
        assert!(single.may_contain(&EntityKey::Slug("a".into())));
        assert!(!single.may_contain(&EntityKey::Slug("b".into())));
        assert!(!single.may_contain(&EntityKey::Id("a".into())));
        assert!(coll.may_contain(&EntityKey::Id("anything".into())));
    }
}
