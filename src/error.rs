use crate::access::AccessPermission;
use crate::response::ErrorDetails;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

/// Engine error taxonomy. Every public operation converts one of these
/// into the response envelope's `error` field; the categorical code
/// mirrors the file-manager client protocol ("401", "400", "404",
/// "417").
#[derive(Debug)]
pub enum FmError {
    /// A permission rule denied the action.
    Unauthorized(String),
    /// Name collision on create/rename/copy/upload-save.
    Conflict {
        message: String,
        file_exists: Vec<String>,
    },
    /// Copy/move source or upload-remove target missing.
    NotFound(String),
    /// Any other filesystem or runtime failure.
    Other(String),
}

impl FmError {
    pub fn code(&self) -> &'static str {
        match self {
            FmError::Unauthorized(_) => "401",
            FmError::Conflict { .. } => "400",
            FmError::NotFound(_) => "404",
            FmError::Other(_) => "417",
        }
    }

    /// Build the denial error for `target`/`action`, preferring the
    /// matched rule's message when one was configured.
    pub fn denied(permission: Option<&AccessPermission>, target: &str, action: &str) -> Self {
        let message = permission
            .map(|p| p.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "'{}' is not accessible. You need permission to perform the {} action.",
                    target, action
                )
            });
        FmError::Unauthorized(message)
    }

    pub fn conflict(message: String, file_exists: Vec<String>) -> Self {
        FmError::Conflict {
            message,
            file_exists,
        }
    }

    pub fn into_details(self) -> ErrorDetails {
        let code = self.code().to_string();
        match self {
            FmError::Conflict {
                message,
                file_exists,
            } => ErrorDetails {
                code,
                message,
                file_exists: if file_exists.is_empty() {
                    None
                } else {
                    Some(file_exists)
                },
            },
            FmError::Unauthorized(message)
            | FmError::NotFound(message)
            | FmError::Other(message) => ErrorDetails {
                code,
                message,
                file_exists: None,
            },
        }
    }
}

impl std::error::Error for FmError {}

impl fmt::Display for FmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            FmError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
            FmError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            FmError::Other(msg) => write!(f, "Operation failed: {}", msg),
        }
    }
}

/// Binary endpoints (download/upload) surface errors as HTTP statuses
/// instead of the envelope.
impl IntoResponse for FmError {
    fn into_response(self) -> Response {
        let status = match self {
            FmError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FmError::Conflict { .. } => StatusCode::BAD_REQUEST,
            FmError::NotFound(_) => StatusCode::NOT_FOUND,
            FmError::Other(_) => StatusCode::EXPECTATION_FAILED,
        };
        (status, Json(self.into_details())).into_response()
    }
}

impl From<std::io::Error> for FmError {
    fn from(err: std::io::Error) -> Self {
        FmError::Other(err.to_string())
    }
}

impl From<serde_json::Error> for FmError {
    fn from(err: serde_json::Error) -> Self {
        FmError::Other(format!("JSON error: {}", err))
    }
}
