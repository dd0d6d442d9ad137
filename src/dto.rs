use axum::{
    Json,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use bson::Document;
use serde::Serialize;

use crate::errors::ApiError;
use crate::query::parse_scalar;
use crate::store::DeleteSummary;

/// Envelope for single-document responses
///
/// Serializes as `{"status": "success", "data": {"document": ...}}`.
#[derive(Serialize, Debug)]
pub struct DocumentEnvelope {
    pub status: &'static str,
    pub data: DocumentData,
}

#[derive(Serialize, Debug)]
pub struct DocumentData {
    pub document: Option<Document>,
}

impl DocumentEnvelope {
    pub fn new(document: Option<Document>) -> Self {
        Self {
            status: "success",
            data: DocumentData { document },
        }
    }
}

/// Envelope for list responses, carrying the result count alongside the data
#[derive(Serialize, Debug)]
pub struct ListEnvelope {
    pub status: &'static str,
    pub results: usize,
    pub data: Vec<Document>,
}

impl ListEnvelope {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            status: "success",
            results: documents.len(),
            data: documents,
        }
    }
}

/// Envelope for the account endpoints
///
/// Serializes as `{"status": "success", "data": {"user": ...}}`.
#[derive(Serialize, Debug)]
pub struct UserEnvelope {
    pub status: &'static str,
    pub data: UserData,
}

#[derive(Serialize, Debug)]
pub struct UserData {
    pub user: Document,
}

impl UserEnvelope {
    pub fn new(user: Document) -> Self {
        Self {
            status: "success",
            data: UserData { user },
        }
    }
}

/// Envelope for bulk-delete responses
#[derive(Serialize, Debug)]
pub struct DeleteEnvelope {
    pub status: &'static str,
    pub data: DeleteSummary,
}

impl DeleteEnvelope {
    pub fn new(summary: DeleteSummary) -> Self {
        Self {
            status: "success",
            data: summary,
        }
    }
}

/// An uploaded image buffer from a multipart request
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub filename: Option<String>,
}

/// Body payload for create and update requests: the document fields plus an
/// optional uploaded image.
///
/// Extracted from an `application/json` object body, or from
/// `multipart/form-data` where every text part becomes a field (values
/// parsed like query-string scalars) and the `image` part becomes the
/// buffer.
#[derive(Debug)]
pub struct DocumentPayload {
    pub fields: Document,
    pub image: Option<ImageUpload>,
}

impl<S: Send + Sync> FromRequest<S> for DocumentPayload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|err| ApiError::BadRequest(format!("Invalid multipart payload: {err}")))?;

            let mut fields = Document::new();
            let mut image = None;
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|err| ApiError::BadRequest(format!("Invalid multipart payload: {err}")))?
            {
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };
                if name == "image" {
                    let filename = field.file_name().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|err| {
                            ApiError::BadRequest(format!("Could not read uploaded image: {err}"))
                        })?
                        .to_vec();
                    image = Some(ImageUpload { data, filename });
                } else {
                    let text = field.text().await.map_err(|err| {
                        ApiError::BadRequest(format!("Could not read field {name:?}: {err}"))
                    })?;
                    fields.insert(name, parse_scalar(&text));
                }
            }
            Ok(Self { fields, image })
        } else {
            let Json(value) = Json::<serde_json::Value>::from_request(req, state)
                .await
                .map_err(|err| ApiError::BadRequest(format!("Invalid JSON payload: {err}")))?;
            let fields = bson::to_document(&value)
                .map_err(|_| ApiError::BadRequest("Request body must be a JSON object".to_string()))?;
            Ok(Self {
                fields,
                image: None,
            })
        }
    }
}
