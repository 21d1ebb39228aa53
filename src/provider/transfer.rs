use crate::error::FmError;
use crate::provider::{BatchOutcome, FileProvider};
use crate::utils::path::normalize_logical;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferMode {
    Copy,
    Move,
}

/// A transfer name may carry a relative sub-path (`docs/a.txt`). The
/// leaf is what collides and gets renamed; the prefix is recreated
/// under the target folder.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => ("", name),
    }
}

impl FileProvider {
    /// Copy `names` from `path` into `target_path`. Sources need
    /// `read` and `copy`, the target folder needs `writeContents`;
    /// both are checked for the whole batch before anything moves.
    pub fn copy_items(
        &self,
        path: &str,
        target_path: &str,
        names: &[String],
        rename_directives: &[String],
        role: Option<&str>,
    ) -> Result<BatchOutcome, FmError> {
        self.transfer(
            path,
            target_path,
            names,
            rename_directives,
            role,
            TransferMode::Copy,
        )
    }

    /// Move `names` from `path` into `target_path`. Like copy, except
    /// sources need `write` instead of `copy` and each source is
    /// removed once its copy lands.
    pub fn move_items(
        &self,
        path: &str,
        target_path: &str,
        names: &[String],
        rename_directives: &[String],
        role: Option<&str>,
    ) -> Result<BatchOutcome, FmError> {
        self.transfer(
            path,
            target_path,
            names,
            rename_directives,
            role,
            TransferMode::Move,
        )
    }

    fn transfer(
        &self,
        path: &str,
        target_path: &str,
        names: &[String],
        rename_directives: &[String],
        role: Option<&str>,
        mode: TransferMode,
    ) -> Result<BatchOutcome, FmError> {
        // Phase 1: check every source, then the destination folder,
        // before any filesystem mutation. Missing sources are not a
        // pre-check failure; they are collected during the transfer.
        for name in names {
            let (sub, leaf) = split_name(name);
            let src = self.physical(&format!("{}/{}", path, name));
            let is_file = match fs::metadata(&src) {
                Ok(m) => m.is_file(),
                Err(_) => continue,
            };
            let src_parent = normalize_logical(&format!("{}/{}", path, sub));
            if let Some(p) = self.access().resolve(&src_parent, leaf, is_file, role) {
                let (allowed, action) = match mode {
                    TransferMode::Copy => (p.read && p.copy, "copy"),
                    TransferMode::Move => (p.read && p.write, "write"),
                };
                if !allowed {
                    return Err(FmError::denied(Some(&p), leaf, action));
                }
            }
        }
        if let Some(p) = self.access().resolve_path(target_path, role) {
            if !p.read || !p.write_contents {
                return Err(FmError::denied(
                    Some(&p),
                    &self.display_name(target_path),
                    "writeContents",
                ));
            }
        }

        // Phase 2: per item, in input order.
        let mut outcome = BatchOutcome::default();
        let mut missing: Vec<String> = Vec::new();
        let mut exist_files: Vec<String> = Vec::new();
        let mut blocked: Option<PathBuf> = None;

        for name in names {
            let (sub, leaf) = split_name(name);
            let src = self.physical(&format!("{}/{}", path, name));
            let meta = match fs::metadata(&src) {
                Ok(m) => m,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    missing.push(name.clone());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let is_file = meta.is_file();

            let dest_dir = self.physical(&format!("{}/{}", target_path, sub));
            if !dest_dir.exists() {
                fs::create_dir_all(&dest_dir)?;
            }
            let mut target = dest_dir.join(leaf);
            if target.symlink_metadata().is_ok() {
                let directed = rename_directives.iter().any(|d| d == name);
                if directed || src == target {
                    let next = Self::next_available_name(&dest_dir, leaf, is_file);
                    target = dest_dir.join(next);
                } else {
                    exist_files.push(name.clone());
                    continue;
                }
            }

            let copy_blocked = if is_file {
                match fs::copy(&src, &target) {
                    Ok(_) => None,
                    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Some(src.clone()),
                    Err(e) => return Err(e.into()),
                }
            } else {
                Self::copy_dir(&src, &target)?
            };
            if let Some(b) = copy_blocked {
                blocked = Some(b);
                break;
            }

            if mode == TransferMode::Move {
                // The move only succeeded if the source is actually
                // gone afterwards, whatever error the delete raised.
                if is_file {
                    let _ = fs::remove_file(&src);
                } else {
                    let _ = Self::delete_dir(&src);
                }
                if src.symlink_metadata().is_ok() {
                    blocked = Some(src.clone());
                    break;
                }
            }

            let mut entry = self.describe(&target, role)?;
            entry.previous_name = Some(name.clone());
            outcome.entries.push(entry);
        }

        // Phase 3: a mid-transfer denial wins over collisions, which
        // win over missing sources. Results produced so far are kept
        // alongside the error in every case.
        if let Some(b) = blocked {
            let target_name = b
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let message = match mode {
                TransferMode::Copy => format!(
                    "'{}' is not accessible. You need permission to perform the copy action.",
                    target_name
                ),
                TransferMode::Move => format!(
                    "'{}' is not accessible. You need permission to perform this action.",
                    target_name
                ),
            };
            outcome.error = Some(FmError::Unauthorized(message));
        } else if !exist_files.is_empty() {
            outcome.error = Some(FmError::conflict(
                "File Already Exists".to_string(),
                exist_files,
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
