// ===============================
// src/upload.rs
// ===============================
//
// Two-step image upload:
//   1) POST /api/images/presign/put {folder, fileName, contentType} -> {url, key}
//   2) PUT raw bytes to `url` (object storage, no bearer token)
// The returned key is attached by the caller to a later create/update.
// No retry, no chunking; an upload whose owning entity update fails is left
// orphaned.
//
use std::path::Path;

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{ApiError, Result};
use crate::http::ApiClient;
use crate::metrics::UPLOAD_BYTES;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub folder: String,
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub url: String,
    pub key: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[derive(Clone)]
pub struct ImageUploader {
    api: ApiClient,
}

impl ImageUploader {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn presign(&self, req: &PresignRequest) -> Result<PresignResponse> {
        self.api.post("/api/images/presign/put", req).await
    }

    pub async fn put_bytes(&self, url: &str, content_type: &str, bytes: Vec<u8>) -> Result<()> {
        let len = bytes.len() as u64;
        let resp = self
            .api
            .raw()
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await;

        match resp {
            Ok(rsp) if rsp.status().is_success() => {
                UPLOAD_BYTES.inc_by(len);
                Ok(())
            }
            Ok(rsp) => {
                let code = rsp.status();
                let body = rsp.text().await.unwrap_or_default();
                error!(%code, %body, "presigned put failed");
                Err(ApiError::from_response(code, &body))
            }
            Err(e) => {
                error!(?e, "presigned put err");
                Err(ApiError::Network(e))
            }
        }
    }

    /// Upload `bytes` and return the object key.
    pub async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        if bytes.is_empty() {
            return Err(ApiError::Validation("image is empty".to_string()));
        }
        if folder.trim().is_empty() || file_name.trim().is_empty() {
            return Err(ApiError::Validation("folder and file name are required".to_string()));
        }
        let presigned = self
            .presign(&PresignRequest {
                folder: folder.to_string(),
                file_name: file_name.to_string(),
                content_type: content_type.to_string(),
            })
            .await?;
        let size = bytes.len();
        self.put_bytes(&presigned.url, content_type, bytes).await?;
        info!(key = %presigned.key, size, "image uploaded");
        Ok(presigned.key)
    }

    pub async fn upload_file(&self, folder: &str, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ApiError::Validation(format!("bad file name: {}", path.display())))?;
        self.upload(folder, file_name, content_type_for(path), bytes).await
    }
}
