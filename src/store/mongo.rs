use anyhow::Result;
use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::stream::TryStreamExt;
use mongodb::{Collection, Database, options::ReturnDocument};

use super::{
    DeleteSummary, EntityModel, FindSpec, Projection, REVISION_FIELD, now_timestamp,
    stamp_new_document,
};

/// Document store backed by a MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoModel {
    collection: Collection<Document>,
}

impl MongoModel {
    pub fn new(database: &Database, collection: &str) -> Self {
        Self {
            collection: database.collection(collection),
        }
    }
}

#[async_trait]
impl EntityModel for MongoModel {
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        let document = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(document)
    }

    async fn find_all(&self, spec: FindSpec) -> Result<Vec<Document>> {
        let mut find = self.collection.find(spec.filter);
        if !spec.sort.is_empty() {
            find = find.sort(spec.sort);
        }
        if let Some(projection) = &spec.projection {
            find = find.projection(projection_document(projection));
        }
        if spec.skip > 0 {
            find = find.skip(spec.skip);
        }
        if spec.limit > 0 {
            find = find.limit(spec.limit);
        }
        let cursor = find.await?;
        let documents = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn create(&self, fields: Document) -> Result<Document> {
        let document = stamp_new_document(fields);
        self.collection.insert_one(&document).await?;
        Ok(document)
    }

    async fn update_by_id(&self, id: &str, changes: Document) -> Result<Option<Document>> {
        // `updated_at` rides in the same $set, so the set document is never
        // empty even when no caller field survived filtering
        let mut set = changes;
        set.insert("updated_at", now_timestamp());
        let mut increments = Document::new();
        increments.insert(REVISION_FIELD, Bson::Int64(1));

        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set, "$inc": increments })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    async fn delete_many(&self, ids: &[String]) -> Result<DeleteSummary> {
        let result = self
            .collection
            .delete_many(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(DeleteSummary {
            requested: ids.len() as u64,
            deleted: result.deleted_count,
        })
    }
}

fn projection_document(projection: &Projection) -> Document {
    let mut document = Document::new();
    match projection {
        Projection::Include(fields) => {
            for field in fields {
                document.insert(field, Bson::Int32(1));
            }
        }
        Projection::Exclude(fields) => {
            for field in fields {
                document.insert(field, Bson::Int32(0));
            }
        }
    }
    document
}
