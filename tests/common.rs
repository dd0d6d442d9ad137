/// Common test utilities for Portico integration tests
///
/// This file contains shared functions for all integration tests: test
/// application setup over the in-memory store, request builders, and
/// helpers for reading JSON responses.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use portico::images::ImageStore;
use portico::store::EntityModel;
use portico::store::memory::MemoryModel;
use portico::{AppState, EntityState, create_app};
use serde_json::Value;
use tower::ServiceExt;

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

/// A test application plus handles on its backing stores
pub struct TestApp {
    pub app: Router,
    pub trips: Arc<MemoryModel>,
    pub users: Arc<MemoryModel>,
    pub images: Arc<RecordingImageStore>,
}

/// Creates a test application backed by in-memory stores
///
/// Using in-memory stores ensures that tests run quickly, are isolated from
/// each other, and need no cleanup afterwards.
pub fn create_test_app() -> TestApp {
    let trips = Arc::new(MemoryModel::new());
    let users = Arc::new(MemoryModel::new());
    let images = Arc::new(RecordingImageStore::default());

    let state = AppState {
        trips: EntityState::new(trips.clone(), images.clone(), Some("trips".to_string())),
        users: EntityState::new(users.clone(), images.clone(), Some("users".to_string())),
    };

    TestApp {
        app: create_app(state),
        trips,
        users,
        images,
    }
}

/// Seeds a document directly through a store, returning its id
pub async fn seed(model: &MemoryModel, fields: bson::Document) -> String {
    let created = model.create(fields).await.unwrap();
    created.get_str("_id").unwrap().to_string()
}

/// Sends a request through the app and returns the status with the parsed
/// JSON body (`Value::Null` for an empty body).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Builds a request with a JSON body
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Builds a bodyless request
pub fn bare_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
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
