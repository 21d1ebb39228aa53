use crate::access::AccessPermission;
use crate::error::FmError;
use crate::provider::entry::FileEntry;
use crate::provider::{BatchOutcome, FileProvider};
use crate::utils::common::{generate_id, humanize_bytes};
use crate::utils::path::{normalize_logical, parent_and_name};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;

/// Listing result for read/search: the current directory plus its
/// result set (directories first, then files).
#[derive(Debug)]
pub struct Listing {
    pub cwd: FileEntry,
    pub files: Vec<FileEntry>,
}

/// Payload of the details operation. Sizes are humanized strings; a
/// multi-selection carries the joined names and combined size.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    pub name: String,
    pub location: String,
    pub is_file: bool,
    pub size: String,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub multiple_files: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<AccessPermission>,
}

impl FileProvider {
    /// List the immediate children of a folder. Requires `read` at the
    /// folder; a denied permission or a denied enumeration both fail
    /// with Unauthorized before any entry is built.
    pub fn read_dir(
        &self,
        path: &str,
        show_hidden: bool,
        role: Option<&str>,
    ) -> Result<Listing, FmError> {
        let physical = self.physical(path);
        let cwd = self.describe(&physical, role)?;
        if let Some(p) = &cwd.permission {
            if !p.read {
                return Err(FmError::denied(Some(p), &cwd.name, "read"));
            }
        }

        let entries = match fs::read_dir(&physical) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(FmError::denied(cwd.permission.as_ref(), &cwd.name, "read"));
            }
            Err(e) => return Err(e.into()),
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(FmError::from)?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !show_hidden && Self::is_hidden(&name) {
                continue;
            }
            let described = self.describe(&entry.path(), role)?;
            if described.is_file {
                files.push(described);
            } else {
                dirs.push(described);
            }
        }
        dirs.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));
        dirs.extend(files);

        Ok(Listing { cwd, files: dirs })
    }

    /// Create a directory named `name` under `path`. Requires
    /// `writeContents` at the containing folder; an existing entry of
    /// either kind is a Conflict and nothing is mutated.
    pub fn create(&self, path: &str, name: &str, role: Option<&str>) -> Result<FileEntry, FmError> {
        let permission = self.access().resolve_path(path, role);
        if let Some(p) = &permission {
            if !p.read || !p.write_contents {
                return Err(FmError::denied(
                    Some(p),
                    &self.display_name(path),
                    "writeContents",
                ));
            }
        }

        let target = self.physical(&format!("{}/{}", path, name));
        if target.symlink_metadata().is_ok() {
            return Err(FmError::conflict(
                format!("A file or folder with the name {} already exists.", name),
                vec![name.to_string()],
            ));
        }
        fs::create_dir(&target)?;
        self.describe(&target, role)
    }

    /// Rename one entry in place. Requires `write` on the entry. A
    /// case-only rename is not a collision; case-only directory
    /// renames stage through a temporary sibling so case-insensitive
    /// filesystems cannot misread them as no-ops.
    pub fn rename(
        &self,
        path: &str,
        name: &str,
        new_name: &str,
        role: Option<&str>,
    ) -> Result<FileEntry, FmError> {
        let source = self.physical(&format!("{}/{}", path, name));
        let meta = fs::metadata(&source)?;
        let is_file = meta.is_file();

        let permission = self.access().resolve(path, name, is_file, role);
        if let Some(p) = &permission {
            if !p.read || !p.write {
                return Err(FmError::denied(Some(p), name, "write"));
            }
        }

        let target = self.physical(&format!("{}/{}", path, new_name));
        let case_only = name.eq_ignore_ascii_case(new_name);
        if target.symlink_metadata().is_ok() && !case_only {
            return Err(FmError::conflict(
                format!(
                    "Cannot rename {} to {}: destination already exists.",
                    name, new_name
                ),
                vec![new_name.to_string()],
            ));
        }

        if !is_file && case_only && name != new_name {
            let staging = self.physical(&format!("{}/{}_{}", path, name, generate_id()));
            fs::rename(&source, &staging)?;
            fs::rename(&staging, &target)?;
        } else {
            fs::rename(&source, &target)?;
        }
        self.describe(&target, role)
    }

    /// Delete a batch of entries. Every entry is permission-checked
    /// before the first deletion; the batch aborts untouched if any is
    /// denied. During the deletions, the first filesystem-level denial
    /// stops the batch and reports that path, keeping earlier removals.
    pub fn delete(
        &self,
        path: &str,
        names: &[String],
        role: Option<&str>,
    ) -> Result<BatchOutcome, FmError> {
        for name in names {
            if name.is_empty() {
                return Err(FmError::Other("name should not be empty".to_string()));
            }
            let full = self.physical(&format!("{}/{}", path, name));
            let is_file = fs::metadata(&full)?.is_file();
            if let Some(p) = self.access().resolve(path, name, is_file, role) {
                if !p.read || !p.write {
                    return Err(FmError::denied(Some(&p), name, "write"));
                }
            }
        }

        let mut outcome = BatchOutcome::default();
        for name in names {
            let full = self.physical(&format!("{}/{}", path, name));
            let entry = self.describe(&full, role)?;
            let blocked = if entry.is_file {
                match fs::remove_file(&full) {
                    Ok(()) => None,
                    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Some(full.clone()),
                    Err(e) => return Err(e.into()),
                }
            } else {
                Self::delete_dir(&full)?
            };
            if let Some(blocked) = blocked {
                let target = blocked
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| name.clone());
                outcome.error = Some(FmError::Unauthorized(format!(
                    "'{}' is not accessible. You need permission to perform the write action.",
                    target
                )));
                break;
            }
            outcome.entries.push(entry);
        }
        Ok(outcome)
    }

    /// Details for one entry, the current folder, or a multi-selection.
    pub fn details(
        &self,
        path: &str,
        names: &[String],
        role: Option<&str>,
    ) -> Result<FileDetails, FmError> {
        if names.len() <= 1 {
            let logical = match names.first().filter(|n| !n.is_empty()) {
                Some(name) => normalize_logical(&format!("{}/{}", path, name)),
                None => normalize_logical(path),
            };
            let physical = self.physical(&logical);
            let meta = fs::metadata(&physical)?;
            let is_file = meta.is_file();
            let size = if is_file {
                meta.len()
            } else {
                Self::dir_size(&physical)
            };
            let entry = self.describe(&physical, role)?;
            Ok(FileDetails {
                location: self.location_of(&logical),
                name: entry.name,
                is_file,
                size: humanize_bytes(size),
                created: entry.date_created,
                modified: entry.date_modified,
                multiple_files: false,
                permission: entry.permission,
            })
        } else {
            let mut total = 0u64;
            let mut joined = String::new();
            let mut shared_parent: Option<String> = None;
            let mut various = false;
            for name in names {
                let logical = normalize_logical(&format!("{}/{}", path, name));
                let physical = self.physical(&logical);
                let meta = fs::metadata(&physical)?;
                total += if meta.is_file() {
                    meta.len()
                } else {
                    Self::dir_size(&physical)
                };
                if !joined.is_empty() {
                    joined.push_str(", ");
                }
                joined.push_str(name.rsplit('/').next().unwrap_or(name));

                let (parent, _) = parent_and_name(&logical);
                match &shared_parent {
                    None => shared_parent = Some(parent),
                    Some(prev) if *prev != parent => various = true,
                    Some(_) => {}
                }
            }
            let location = if various {
                String::new()
            } else {
                shared_parent
                    .map(|p| self.location_of(p.trim_end_matches('/')))
                    .unwrap_or_default()
            };
            Ok(FileDetails {
                name: joined,
                location,
                is_file: false,
                size: humanize_bytes(total),
                created: None,
                modified: None,
                multiple_files: true,
                permission: None,
            })
        }
    }

    /// Display location rooted at the configured folder name:
    /// `files/docs/report.txt`.
    fn location_of(&self, logical: &str) -> String {
        let canon = normalize_logical(logical);
        if canon == "/" {
            self.root_name().to_string()
        } else {
            format!("{}{}", self.root_name(), canon)
        }
    }

    /// Last segment of a logical folder path, or the root folder name.
    pub(crate) fn display_name(&self, path: &str) -> String {
        let (_, name) = parent_and_name(path);
        if name.is_empty() {
            self.root_name().to_string()
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessController, AccessRule};
    use std::path::Path;

    fn provider(root: &Path) -> FileProvider {
        FileProvider::new(root.to_path_buf(), AccessController::unrestricted())
    }

    fn provider_with_rules(root: &Path, rules: Vec<AccessRule>) -> FileProvider {
        FileProvider::new(root.to_path_buf(), AccessController::new(Some(rules)))
    }

    fn read_only_rule(path: &str, is_file: bool) -> AccessRule {
        AccessRule {
            path: path.to_string(),
            is_file,
            read: true,
            ..Default::default()
        }
    }

    #[test]
    fn read_lists_directories_then_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.txt"), b"x").unwrap();
        fs::create_dir(tmp.path().join("z")).unwrap();
        fs::create_dir(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join(".hidden"), b"x").unwrap();

        let p = provider(tmp.path());
        let listing = p.read_dir("/", false, None).unwrap();
        let names: Vec<&str> = listing.files.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "z", "b.txt"]);

        let listing = p.read_dir("/", true, None).unwrap();
        assert_eq!(listing.files.len(), 4);
    }

    #[test]
    fn read_denied_by_rule() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("vault")).unwrap();
        let p = provider_with_rules(
            tmp.path(),
            vec![AccessRule {
                path: "/vault".to_string(),
                message: Some("Keep out".to_string()),
                ..Default::default()
            }],
        );
        let err = p.read_dir("/vault/", false, None).unwrap_err();
        assert_eq!(err.code(), "401");
        assert!(err.to_string().contains("Keep out"));
    }

    #[test]
    fn create_then_create_again_conflicts() {
        let tmp = tempfile::tempdir().unwrap();
        let p = provider(tmp.path());

        let entry = p.create("/", "x", None).unwrap();
        assert_eq!(entry.name, "x");
        assert!(!entry.is_file);

        let err = p.create("/", "x", None).unwrap_err();
        match err {
            FmError::Conflict { file_exists, .. } => {
                assert_eq!(file_exists, vec!["x".to_string()])
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn create_requires_write_contents() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("ro")).unwrap();
        let p = provider_with_rules(tmp.path(), vec![read_only_rule("/ro", false)]);
        let err = p.create("/ro/", "sub", None).unwrap_err();
        assert_eq!(err.code(), "401");
        assert!(!tmp.path().join("ro/sub").exists());
    }

    #[test]
    fn rename_file_and_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), b"x").unwrap();
        fs::write(tmp.path().join("b.txt"), b"y").unwrap();

        let p = provider(tmp.path());
        let err = p.rename("/", "a.txt", "b.txt", None).unwrap_err();
        assert_eq!(err.code(), "400");

        let entry = p.rename("/", "a.txt", "c.txt", None).unwrap();
        assert_eq!(entry.name, "c.txt");
        assert!(tmp.path().join("c.txt").exists());
        assert!(!tmp.path().join("a.txt").exists());
    }

    #[test]
    fn rename_case_only_is_not_a_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), b"x").unwrap();
        let p = provider(tmp.path());
        let entry = p.rename("/", "a.txt", "A.TXT", None).unwrap();
        assert_eq!(entry.name, "A.TXT");

        fs::create_dir(tmp.path().join("docs")).unwrap();
        let entry = p.rename("/", "docs", "Docs", None).unwrap();
        assert_eq!(entry.name, "Docs");
        assert!(tmp.path().join("Docs").exists());
    }

    #[test]
    fn delete_batch_precheck_blocks_all_mutation() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a"), b"x").unwrap();
        fs::write(tmp.path().join("b"), b"y").unwrap();

        // "b" is readable but not writable.
        let p = provider_with_rules(tmp.path(), vec![read_only_rule("/b", true)]);
        let err = p
            .delete("/", &["a".to_string(), "b".to_string()], None)
            .unwrap_err();
        assert_eq!(err.code(), "401");
        assert!(err.to_string().contains('b'));
        assert!(tmp.path().join("a").exists(), "batch must not start");
        assert!(tmp.path().join("b").exists());
    }

    #[test]
    fn delete_removes_files_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), b"x").unwrap();
        fs::create_dir_all(tmp.path().join("d/sub")).unwrap();
        fs::write(tmp.path().join("d/f"), b"y").unwrap();

        let p = provider(tmp.path());
        let outcome = p
            .delete("/", &["a.txt".to_string(), "d".to_string()], None)
            .unwrap();
        assert!(outcome.error.is_none());
        assert_eq!(outcome.entries.len(), 2);
        assert!(!tmp.path().join("a.txt").exists());
        assert!(!tmp.path().join("d").exists());
    }

    #[test]
    fn details_single_file_and_directory() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("docs/a.txt"), vec![0u8; 2048]).unwrap();

        let p = provider(tmp.path());
        let d = p.details("/docs/", &["a.txt".to_string()], None).unwrap();
        assert_eq!(d.name, "a.txt");
        assert!(d.is_file);
        assert_eq!(d.size, "2 KB");
        assert!(d.location.ends_with("/docs/a.txt"));

        let d = p.details("/docs/", &[], None).unwrap();
        assert!(!d.is_file);
        assert_eq!(d.size, "2 KB", "directory size is recursive");
    }

    #[test]
    fn details_multiple_combines_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a"), vec![0u8; 100]).unwrap();
        fs::write(tmp.path().join("b"), vec![0u8; 200]).unwrap();

        let p = provider(tmp.path());
        let d = p
            .details("/", &["a".to_string(), "b".to_string()], None)
            .unwrap();
        assert_eq!(d.name, "a, b");
        assert!(d.multiple_files);
        assert_eq!(d.size, "300 B");
    }
}
