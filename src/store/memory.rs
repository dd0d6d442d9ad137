use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;
use bson::{Bson, Document};
use tokio::sync::RwLock;

use super::{DeleteSummary, EntityModel, FindSpec, REVISION_FIELD, now_timestamp, stamp_new_document};

/// Document store held entirely in memory behind an async read-write lock.
///
/// Evaluates the same filter, sort, projection and pagination semantics as
/// the MongoDB adapter, which makes it the backend of choice for tests and
/// small development setups.
#[derive(Debug, Default)]
pub struct MemoryModel {
    documents: RwLock<Vec<Document>>,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl EntityModel for MemoryModel {
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|doc| has_id(doc, id)).cloned())
    }

    async fn find_all(&self, spec: FindSpec) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut matched: Vec<Document> = documents
            .iter()
            .filter(|doc| matches_filter(doc, &spec.filter))
            .cloned()
            .collect();
        drop(documents);

        // Stable sort keeps insertion order for equal keys
        matched.sort_by(|a, b| compare_by_sort(a, b, &spec.sort));

        let limit = if spec.limit > 0 { spec.limit as usize } else { usize::MAX };
        let mut page: Vec<Document> = matched
            .into_iter()
            .skip(spec.skip as usize)
            .take(limit)
            .collect();

        if let Some(projection) = &spec.projection {
            for document in &mut page {
                projection.apply(document);
            }
        }
        Ok(page)
    }

    async fn create(&self, fields: Document) -> Result<Document> {
        let document = stamp_new_document(fields);
        let mut documents = self.documents.write().await;
        documents.push(document.clone());
        Ok(document)
    }

    async fn update_by_id(&self, id: &str, changes: Document) -> Result<Option<Document>> {
        let mut documents = self.documents.write().await;
        let Some(document) = documents.iter_mut().find(|doc| has_id(doc, id)) else {
            return Ok(None);
        };
        for (key, value) in changes {
            document.insert(key, value);
        }
        document.insert("updated_at", now_timestamp());
        let revision = document.get_i64(REVISION_FIELD).unwrap_or(0);
        document.insert(REVISION_FIELD, Bson::Int64(revision + 1));
        Ok(Some(document.clone()))
    }

    async fn delete_many(&self, ids: &[String]) -> Result<DeleteSummary> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|doc| {
            !ids.iter()
                .any(|id| has_id(doc, id))
        });
        Ok(DeleteSummary {
            requested: ids.len() as u64,
            deleted: (before - documents.len()) as u64,
        })
    }
}

fn has_id(document: &Document, id: &str) -> bool {
    document.get_str("_id").is_ok_and(|value| value == id)
}

/// Evaluates a filter document against a stored document. Conditions are
/// either comparison-operator documents (`{"$gte": v}` and friends) or plain
/// equality values; a document missing the filtered field never matches.
pub(crate) fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, condition)| {
        let Some(value) = document.get(field) else {
            return false;
        };
        match condition {
            Bson::Document(operators) if is_operator_document(operators) => {
                operators.iter().all(|(op, bound)| {
                    let Some(ordering) = compare_values(value, bound) else {
                        return false;
                    };
                    match op.as_str() {
                        "$gt" => ordering == Ordering::Greater,
                        "$gte" => ordering != Ordering::Less,
                        "$lt" => ordering == Ordering::Less,
                        "$lte" => ordering != Ordering::Greater,
                        _ => false,
                    }
                })
            }
            expected => values_equal(value, expected),
        }
    })
}

fn is_operator_document(document: &Document) -> bool {
    !document.is_empty() && document.keys().all(|key| key.starts_with('$'))
}

/// Equality that treats `Int32(4)`, `Int64(4)` and `Double(4.0)` as equal,
/// matching how the backing store compares across numeric types.
pub(crate) fn values_equal(a: &Bson, b: &Bson) -> bool {
    match compare_values(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

/// Orders two values when they are of comparable kinds: any two numbers,
/// two strings, two booleans or two datetimes. Everything else is unordered.
pub(crate) fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(left), Some(right)) = (as_number(a), as_number(b)) {
        return left.partial_cmp(&right);
    }
    match (a, b) {
        (Bson::String(left), Bson::String(right)) => Some(left.cmp(right)),
        (Bson::Boolean(left), Bson::Boolean(right)) => Some(left.cmp(right)),
        (Bson::DateTime(left), Bson::DateTime(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn compare_by_sort(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (field, direction) in sort {
        let left = a.get(field).unwrap_or(&Bson::Null);
        let right = b.get(field).unwrap_or(&Bson::Null);
        let mut ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
        if is_descending(direction) {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn is_descending(direction: &Bson) -> bool {
    as_number(direction).is_some_and(|n| n < 0.0)
}
