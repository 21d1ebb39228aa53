use crate::error::FmError;
use crate::provider::crud::FileDetails;
use crate::provider::entry::FileEntry;
use serde::Serialize;

/// Response envelope shared by every file-manager operation. Exactly
/// one of the success payload or `error` is meaningful; batch
/// operations may carry both (partial results plus the terminating
/// error).
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileManagerResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<FileEntry>,
    pub files: Vec<FileEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FileDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

impl FileManagerResponse {
    pub fn listing(cwd: FileEntry, files: Vec<FileEntry>) -> Self {
        Self {
            cwd: Some(cwd),
            files,
            ..Default::default()
        }
    }

    pub fn entries(files: Vec<FileEntry>) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }

    pub fn detail(details: FileDetails) -> Self {
        Self {
            details: Some(details),
            ..Default::default()
        }
    }

    pub fn failure(error: FmError) -> Self {
        Self {
            error: Some(error.into_details()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_exists: Option<Vec<String>>,
}
