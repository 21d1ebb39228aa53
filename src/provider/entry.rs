use crate::access::AccessPermission;
use crate::error::FmError;
use crate::provider::FileProvider;
use crate::utils::path::{parent_and_name, to_logical, with_trailing_slash};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// One filesystem object as exposed to the client. Built on demand
/// from stat calls, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub is_file: bool,
    pub size: u64,
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub has_child: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub filter_path: String,
    pub permission: Option<AccessPermission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_name: Option<String>,
}

impl FileProvider {
    /// Describe a physical path as a directory entry, attaching the
    /// resolved permission and (for directories) the child-presence
    /// flag.
    pub(crate) fn describe(&self, physical: &Path, role: Option<&str>) -> Result<FileEntry, FmError> {
        let meta = fs::metadata(physical)?;
        let is_file = meta.is_file();

        let logical = to_logical(self.root(), physical);
        let (parent, name) = parent_and_name(&logical);
        let permission = self.access().resolve(&parent, &name, is_file, role);
        let name = if name.is_empty() {
            // The root itself: expose the configured root folder name.
            self.root_name().to_string()
        } else {
            name
        };

        let kind = if is_file {
            physical
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default()
        } else {
            String::new()
        };

        let has_child = if is_file {
            false
        } else {
            self.check_child(physical)?
        };

        Ok(FileEntry {
            name,
            is_file,
            size: if is_file { meta.len() } else { 0 },
            date_created: meta.created().ok().map(DateTime::<Utc>::from),
            date_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            has_child,
            kind,
            filter_path: with_trailing_slash(&parent),
            permission,
            previous_name: None,
        })
    }

    /// True iff the directory contains at least one subdirectory. An
    /// access-denied error during enumeration is reported as `false`,
    /// never surfaced; all other errors propagate.
    pub(crate) fn check_child(&self, dir: &Path) -> Result<bool, FmError> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::access::{AccessController, AccessRule};
    use crate::provider::FileProvider;
    use std::fs;

    fn provider(root: &std::path::Path) -> FileProvider {
        FileProvider::new(root.to_path_buf(), AccessController::unrestricted())
    }

    #[test]
    fn describe_file_entry() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("docs/report.txt"), b"hello").unwrap();

        let p = provider(tmp.path());
        let entry = p
            .describe(&tmp.path().join("docs/report.txt"), None)
            .unwrap();
        assert_eq!(entry.name, "report.txt");
        assert!(entry.is_file);
        assert_eq!(entry.size, 5);
        assert_eq!(entry.kind, ".txt");
        assert_eq!(entry.filter_path, "/docs/");
        assert!(!entry.has_child);
        assert!(entry.permission.is_none());
    }

    #[test]
    fn describe_directory_sets_has_child() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::create_dir(tmp.path().join("empty")).unwrap();
        fs::write(tmp.path().join("a/file.txt"), b"x").unwrap();

        let p = provider(tmp.path());
        let a = p.describe(&tmp.path().join("a"), None).unwrap();
        assert!(!a.is_file);
        assert_eq!(a.size, 0);
        assert!(a.has_child, "a contains subdirectory b");
        assert_eq!(a.kind, "");

        let empty = p.describe(&tmp.path().join("empty"), None).unwrap();
        assert!(!empty.has_child);
    }

    #[test]
    fn describe_attaches_resolved_permission() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("docs")).unwrap();

        let rules = vec![AccessRule {
            path: "/docs".to_string(),
            read: true,
            ..Default::default()
        }];
        let p = FileProvider::new(tmp.path().to_path_buf(), AccessController::new(Some(rules)));
        let entry = p.describe(&tmp.path().join("docs"), None).unwrap();
        let perm = entry.permission.expect("rules configured");
        assert!(perm.read);
        assert!(!perm.write);
    }
}
