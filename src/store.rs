use anyhow::Result;
use async_trait::async_trait;
use bson::{Bson, Document};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

/// In-memory document store, usable as a development and test backend
pub mod memory;
/// MongoDB-backed document store
pub mod mongo;

/// Field stamped on every document and bumped on each update. Excluded from
/// responses by the default projection.
pub const REVISION_FIELD: &str = "_rev";

/// Restrictions accumulated by the query pipeline before execution.
///
/// `filter` and `sort` use the document forms the data layer expects
/// (`{field: value}` / `{field: {"$gte": value}}` and `{field: 1|-1}`).
/// A `limit` of 0 means no limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub filter: Document,
    pub sort: Document,
    pub projection: Option<Projection>,
    pub skip: u64,
    pub limit: i64,
}

/// Field projection applied to returned documents.
///
/// An include-list always retains `_id`, matching the backing store's
/// behavior for inclusion projections.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

/// Outcome of a bulk delete. Ids that matched nothing are not listed
/// individually; a `deleted` count below `requested` is the signal that some
/// were missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteSummary {
    pub requested: u64,
    pub deleted: u64,
}

/// The five data-layer operations the CRUD handlers are generic over.
///
/// Implementations own persistence and bookkeeping: `create` stamps `_id`,
/// `created_at`, `updated_at` and `_rev`; `update_by_id` applies the changes
/// as a field-wise set, refreshes `updated_at`, bumps `_rev`, and returns the
/// post-update document (or `None` when the id matched nothing).
#[async_trait]
pub trait EntityModel: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>>;

    async fn find_all(&self, spec: FindSpec) -> Result<Vec<Document>>;

    async fn create(&self, fields: Document) -> Result<Document>;

    async fn update_by_id(&self, id: &str, changes: Document) -> Result<Option<Document>>;

    async fn delete_many(&self, ids: &[String]) -> Result<DeleteSummary>;
}

/// Current time in the stored timestamp format: RFC3339, millisecond
/// precision, `Z` suffix. Lexicographic order equals chronological order.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stamps the bookkeeping fields on a new document. A caller-supplied `_id`
/// is preserved; everything else is overwritten.
pub(crate) fn stamp_new_document(mut fields: Document) -> Document {
    if !fields.contains_key("_id") {
        fields.insert("_id", Uuid::new_v4().to_string());
    }
    let now = now_timestamp();
    fields.insert("created_at", now.clone());
    fields.insert("updated_at", now);
    fields.insert(REVISION_FIELD, Bson::Int64(1));
    fields
}

impl Projection {
    /// Applies the projection to a document in place.
    pub(crate) fn apply(&self, document: &mut Document) {
        let kept: Document = match self {
            Projection::Include(fields) => document
                .iter()
                .filter(|(key, _)| {
                    key.as_str() == "_id" || fields.iter().any(|f| f.as_str() == key.as_str())
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Projection::Exclude(fields) => document
                .iter()
                .filter(|(key, _)| !fields.iter().any(|f| f.as_str() == key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        };
        *document = kept;
    }
}

#[cfg(test)]
mod tests;
