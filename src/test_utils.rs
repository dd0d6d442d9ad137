use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bson::Document;

use crate::EntityState;
use crate::images::ImageStore;
use crate::store::EntityModel;
use crate::store::memory::MemoryModel;

/// One recorded image-store invocation
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub dest: String,
    pub width: u32,
    pub bytes: usize,
}

/// Image store that records every call instead of touching the filesystem
#[derive(Debug, Default)]
pub struct RecordingImageStore {
    calls: Mutex<Vec<StoredImage>>,
}

impl RecordingImageStore {
    pub fn calls(&self) -> Vec<StoredImage> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn store_resized(&self, data: Vec<u8>, dest: &str, width: u32) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(StoredImage {
            dest: dest.to_string(),
            width,
            bytes: data.len(),
        });
        Ok(())
    }
}

/// Builds an entity state over a fresh in-memory store and a recording
/// image store, for calling handlers directly in unit tests.
pub fn entity_state(
    image_folder: Option<&str>,
) -> (EntityState<MemoryModel>, Arc<RecordingImageStore>) {
    let images = Arc::new(RecordingImageStore::default());
    let state = EntityState {
        model: Arc::new(MemoryModel::new()),
        images: images.clone(),
        image_folder: image_folder.map(str::to_string),
    };
    (state, images)
}

/// Creates a document directly through the store, returning its id
pub async fn seed_document(state: &EntityState<MemoryModel>, fields: Document) -> String {
    let created = state.model.create(fields).await.unwrap();
    created.get_str("_id").unwrap().to_string()
}

/// Waits for detached image tasks to have recorded `count` calls
pub async fn wait_for_images(store: &RecordingImageStore, count: usize) {
    for _ in 0..100 {
        if store.calls().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {count} image store calls");
}
