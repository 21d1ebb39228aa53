use crate::error::FmError;
use crate::provider::FileProvider;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;

/// One file received by the transport layer, fully buffered. The name
/// may carry a relative folder prefix, which is recreated under the
/// target folder.
#[derive(Debug)]
pub struct IncomingFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// Collision policy for an upload batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadAction {
    /// Write only if absent; collisions are collected and reported
    /// together after the whole batch.
    Save,
    /// Delete the named file; missing files are NotFound.
    Remove,
    /// Write unconditionally, replacing any existing file.
    Replace,
    /// Write under the first unused numeric-suffixed name.
    KeepBoth,
}

impl UploadAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "save" => Some(Self::Save),
            "remove" => Some(Self::Remove),
            "replace" => Some(Self::Replace),
            "keepboth" => Some(Self::KeepBoth),
            _ => None,
        }
    }
}

/// Emitted per stored file so the caller can persist an audit trail.
/// Storage of these records is the caller's concern; the upload result
/// does not depend on it.
#[derive(Debug, Clone)]
pub struct UploadAudit {
    pub file_name: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub audits: Vec<UploadAudit>,
    pub error: Option<FmError>,
}

impl FileProvider {
    /// Apply `action` to each incoming file under `path`. The `upload`
    /// capability at the target folder is checked once before any file
    /// is touched.
    pub fn upload(
        &self,
        path: &str,
        files: Vec<IncomingFile>,
        action: UploadAction,
        uploader: &str,
        role: Option<&str>,
    ) -> Result<UploadOutcome, FmError> {
        if let Some(p) = self.access().resolve_path(path, role) {
            if !p.read || !p.upload {
                return Err(FmError::denied(
                    Some(&p),
                    &self.display_name(path),
                    "upload",
                ));
            }
        }

        let mut outcome = UploadOutcome::default();
        let mut existing: Vec<String> = Vec::new();
        let mut missing: Vec<String> = Vec::new();

        for file in files {
            let target = self.physical(&format!("{}/{}", path, file.name));
            if let Some(parent) = target.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            let leaf = file
                .name
                .rsplit('/')
                .next()
                .unwrap_or(&file.name)
                .to_string();

            match action {
                UploadAction::Save => {
                    if target.symlink_metadata().is_ok() {
                        existing.push(file.name.clone());
                        continue;
                    }
                    fs::write(&target, &file.content)?;
                    outcome.audits.push(audit(leaf, uploader));
                }
                UploadAction::Remove => {
                    match fs::remove_file(&target) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {
                            missing.push(file.name.clone());
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                UploadAction::Replace => {
                    if target.symlink_metadata().is_ok() {
                        fs::remove_file(&target)?;
                    }
                    fs::write(&target, &file.content)?;
                    outcome.audits.push(audit(leaf, uploader));
                }
                UploadAction::KeepBoth => {
                    let dir = target
                        .parent()
                        .map(|p| p.to_path_buf())
                        .unwrap_or_else(|| self.root().to_path_buf());
                    let next = Self::next_available_name(&dir, &leaf, true);
                    fs::write(dir.join(&next), &file.content)?;
                    outcome.audits.push(audit(next, uploader));
                }
            }
        }

        if !existing.is_empty() {
            outcome.error = Some(FmError::conflict(
                "File already exists.".to_string(),
                existing,
            ));
        } else if !missing.is_empty() {
            outcome.error = Some(FmError::NotFound(format!(
                "{} not found in given location.",
                missing.join(", ")
            )));
        }
        Ok(outcome)
    }
}

fn audit(file_name: String, uploader: &str) -> UploadAudit {
    UploadAudit {
        file_name,
        uploaded_by: uploader.to_string(),
        uploaded_at: Utc::now(),
    }
}
