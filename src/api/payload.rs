//! Request payload extraction
//!
//! Create and update endpoints accept JSON, urlencoded forms and multipart
//! forms. All three are normalized into a [`FieldMap`] holding only the keys
//! the client sent. Repeated form keys become lists, and multipart file parts
//! are written to the upload directory and replaced by their `/media/...`
//! reference path.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header,
    Form,
};
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState};
use crate::config::UploadConfig;
use crate::models::FieldMap;

/// URL prefix uploaded files are served under.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Sparse field set sent by the client.
#[derive(Debug, Clone, Default)]
pub struct Payload(pub FieldMap);

impl FromRequest<AppState> for Payload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation_error(e.body_text()))?;
            return read_multipart(multipart, &state.upload_config).await.map(Payload);
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation_error(e.body_text()))?;
            return Ok(Payload(collect_pairs(pairs)));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation_error(e.body_text()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Payload::default());
        }

        let fields: FieldMap = serde_json::from_slice(&body)
            .map_err(|e| ApiError::validation_error(format!("JSON parse error: {}", e)))?;
        Ok(Payload(fields))
    }
}

/// Build a field map from form pairs, turning repeated keys into lists.
pub fn collect_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> FieldMap {
    let mut fields = FieldMap::new();
    for (key, value) in pairs {
        insert_value(&mut fields, key, Value::String(value));
    }
    fields
}

fn insert_value(fields: &mut FieldMap, key: String, value: Value) {
    match fields.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(key, value);
        }
    }
}

async fn read_multipart(mut multipart: Multipart, config: &UploadConfig) -> Result<FieldMap, ApiError> {
    let mut fields = FieldMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        let Some(filename) = field.file_name().map(str::to_string) else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::validation_error(format!("Failed to read field {}: {}", name, e)))?;
            insert_value(&mut fields, name, Value::String(text));
            continue;
        };

        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        // Browsers send an empty part for an untouched file input
        if filename.is_empty() && data.is_empty() {
            continue;
        }

        let reference = store_file(config, &filename, &content_type, &data)
            .await
            .map_err(|e| e.for_field(&name))?;
        insert_value(&mut fields, name, Value::String(reference));
    }

    Ok(fields)
}

/// Why a file part was refused.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type: {0}")]
    InvalidType(String),

    #[error("File too large. Maximum size: {0} bytes")]
    TooLarge(u64),

    #[error("Failed to save file: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    fn for_field(self, field: &str) -> ApiError {
        match self {
            UploadError::Io(e) => {
                tracing::error!("Failed to store upload: {}", e);
                ApiError::internal_error("Internal server error")
            }
            other => ApiError::with_details(
                "VALIDATION_ERROR",
                "Invalid upload",
                serde_json::json!({ field: [other.to_string()] }),
            ),
        }
    }
}

/// Write an uploaded file and return its reference path.
pub async fn store_file(
    config: &UploadConfig,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Result<String, UploadError> {
    if !config.is_type_allowed(content_type) {
        return Err(UploadError::InvalidType(content_type.to_string()));
    }
    if data.len() as u64 > config.max_file_size {
        return Err(UploadError::TooLarge(config.max_file_size));
    }

    ensure_upload_dir(&config.path).await?;

    let stored_name = format!("{}.{}", Uuid::new_v4(), file_extension(config, filename, content_type));
    fs::write(config.path.join(&stored_name), data).await?;
    tracing::debug!("Stored upload {} as {}", filename, stored_name);

    Ok(format!("{}/{}", MEDIA_URL_PREFIX, stored_name))
}

async fn ensure_upload_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).await?;
    }
    Ok(())
}

/// Extension from the client filename, else from the MIME type.
fn file_extension(config: &UploadConfig, filename: &str, content_type: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() < 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            ext.to_lowercase()
        }
        _ => config.get_extension(content_type).to_string(),
    }
}
