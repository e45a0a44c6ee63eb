use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::info;

use super::{DriveCredentials, ObjectStorage, StoredObject, UploadMetadata};
use crate::error::{RecorderError, Result};

const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id,name,webViewLink";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    web_view_link: Option<String>,
}

/// Google Drive v3 over plain REST
pub struct GoogleDrive {
    credentials: DriveCredentials,
    http: reqwest::Client,
}

impl GoogleDrive {
    pub fn new(credentials: DriveCredentials) -> Self {
        Self {
            credentials,
            http: reqwest::Client::new(),
        }
    }
}

fn upload_error(context: &str, e: impl std::fmt::Display) -> RecorderError {
    RecorderError::Upload(format!("{}: {}", context, e))
}

/// Build a `multipart/related` body: JSON metadata part, then the media part
pub(crate) fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n",
            boundary, metadata
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{}\r\nContent-Type: {}\r\n\r\n", boundary, mime_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl ObjectStorage for GoogleDrive {
    async fn upload(&self, path: &Path, metadata: &UploadMetadata) -> Result<StoredObject> {
        let token = self.credentials.access_token().await?;
        let data = tokio::fs::read(path).await?;

        let mut file_metadata = json!({
            "name": metadata.name,
            "description": metadata.description,
            "mimeType": metadata.mime_type,
        });
        if let Some(folder) = &metadata.parent_folder {
            file_metadata["parents"] = json!([folder]);
        }

        let boundary = format!("vc-recorder-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &file_metadata, &metadata.mime_type, &data);

        info!("Uploading {} to Google Drive ({} bytes)", metadata.name, data.len());

        let response = self
            .http
            .post(UPLOAD_URL)
            .bearer_auth(&token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| upload_error("Drive upload request failed", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| upload_error("Drive upload response unreadable", e))?;
        if !status.is_success() {
            return Err(RecorderError::Upload(format!(
                "Drive upload returned {}: {}",
                status, text
            )));
        }

        let file: DriveFile =
            serde_json::from_str(&text).map_err(|e| upload_error("bad Drive response", e))?;

        info!("Upload complete: {} (ID: {})", file.name, file.id);

        let link = file
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", file.id));

        Ok(StoredObject {
            id: file.id,
            name: file.name,
            link,
        })
    }

    async fn share_publicly(&self, remote_id: &str) -> Result<()> {
        let token = self.credentials.access_token().await?;

        let response = self
            .http
            .post(format!("{}/{}/permissions", FILES_URL, remote_id))
            .bearer_auth(&token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await
            .map_err(|e| upload_error("Drive permission request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RecorderError::Upload(format!(
                "Drive permission returned {}: {}",
                status, text
            )));
        }

        info!("Sharing enabled for {}", remote_id);
        Ok(())
    }
}
