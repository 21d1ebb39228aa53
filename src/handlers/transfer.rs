use crate::error::FmError;
use crate::handlers::operations::RoleQuery;
use crate::provider::archive::DownloadPayload;
use crate::provider::upload::{IncomingFile, UploadAction};
use crate::response::FileManagerResponse;
use crate::state::AppState;
use crate::utils::common::mime_guess;
use axum::{
    body::Body,
    extract::{Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub names: Vec<String>,
}

fn default_path() -> String {
    "/".to_string()
}

/// Stream the requested entries. A single file goes out raw under its
/// own content type; anything else goes out as `application/zip`.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoleQuery>,
    Json(req): Json<DownloadRequest>,
) -> Result<Response, FmError> {
    let provider = state.provider.clone();
    let payload = tokio::task::spawn_blocking(move || {
        provider.download(&req.path, &req.names, query.role.as_deref())
    })
    .await
    .map_err(|e| FmError::Other(e.to_string()))??;

    match payload {
        DownloadPayload::File { path, name } => {
            let content_type = mime_guess(&path);
            let file = tokio::fs::File::open(&path).await.map_err(FmError::from)?;
            Ok(streamed(file, &name, content_type))
        }
        DownloadPayload::Archive { file, name } => {
            let file = tokio::fs::File::from_std(file);
            Ok(streamed(file, &name, "application/zip"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub path: String,
    pub role: Option<String>,
}

/// Inline preview stream for a single image file, addressed by its
/// logical path. Unlike download this renders in place, so no
/// attachment disposition is set.
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, FmError> {
    let provider = state.provider.clone();
    let physical = tokio::task::spawn_blocking(move || {
        provider.preview(&query.path, query.role.as_deref())
    })
    .await
    .map_err(|e| FmError::Other(e.to_string()))??;

    let content_type = mime_guess(&physical);
    let file = tokio::fs::File::open(&physical)
        .await
        .map_err(FmError::from)?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = content_type.parse() {
        headers.insert(header::CONTENT_TYPE, value);
    }
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body).into_response())
}

fn streamed(file: tokio::fs::File, name: &str, content_type: &str) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = content_type.parse() {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = format!("attachment; filename=\"{}\"", name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    let body = Body::from_stream(ReaderStream::new(file));
    (StatusCode::OK, headers, body).into_response()
}

/// Multipart upload. Text fields `path` and `action` configure the
/// batch; every file field is buffered (capped at the configured max
/// size) and handed to the engine in one call. Per-file collisions
/// come back in the envelope; pre-check denials come back as HTTP
/// statuses like download does.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoleQuery>,
    mut multipart: Multipart,
) -> Result<Json<FileManagerResponse>, FmError> {
    let max_size = state.config.max_file_size;
    let mut path = default_path();
    let mut action = UploadAction::Save;
    let mut files: Vec<IncomingFile> = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| FmError::Other(e.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "path" => {
                path = field.text().await.map_err(|e| FmError::Other(e.to_string()))?;
            }
            "action" => {
                let raw = field.text().await.map_err(|e| FmError::Other(e.to_string()))?;
                action = UploadAction::parse(&raw)
                    .ok_or_else(|| FmError::Other(format!("Unknown upload action: {}", raw)))?;
            }
            "uploadFiles" | "files" | "file" => {
                let name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                if name.is_empty() {
                    continue;
                }
                let mut content: Vec<u8> = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| FmError::Other(e.to_string()))?
                {
                    if (content.len() + chunk.len()) as u64 > max_size {
                        return Err(FmError::Other(format!(
                            "File '{}' exceeds the maximum upload size of {} bytes",
                            name, max_size
                        )));
                    }
                    content.extend_from_slice(&chunk);
                }
                files.push(IncomingFile { name, content });
            }
            _ => {}
        }
    }

    let uploader = query.role.clone().unwrap_or_else(|| "Unknown".to_string());
    let role = query.role;
    let provider = state.provider.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        provider.upload(&path, files, action, &uploader, role.as_deref())
    })
    .await
    .map_err(|e| FmError::Other(e.to_string()))??;

    for audit in &outcome.audits {
        tracing::info!(
            file = %audit.file_name,
            uploaded_by = %audit.uploaded_by,
            uploaded_at = %audit.uploaded_at,
            "file uploaded"
        );
    }

    Ok(Json(FileManagerResponse {
        error: outcome.error.map(FmError::into_details),
        ..Default::default()
    }))
}
