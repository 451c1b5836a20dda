//! Catalog module - upstream records, pull queries and responses.

mod entity;
mod query;
mod response;

pub use entity::{CatalogEntity, Edition};
pub use query::{CatalogQuery, CollectionFilter, QueryFamily, QueryShape, Resource, Selector};
pub use response::{CatalogResponse, ResponseData, ResponseMeta};
