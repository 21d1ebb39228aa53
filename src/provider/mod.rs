pub mod archive;
pub mod crud;
pub mod entry;
pub mod search;
pub mod transfer;
pub mod upload;

use crate::access::AccessController;
use crate::error::FmError;
use crate::provider::entry::FileEntry;
use crate::utils::path as logical_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Rule-aware virtual filesystem rooted at a physical directory. All
/// operations are synchronous and stateless between requests; handlers
/// run them on the blocking pool.
#[derive(Debug)]
pub struct FileProvider {
    root: PathBuf,
    root_name: String,
    access: AccessController,
}

/// Result of a multi-item mutation: the entries produced before the
/// batch terminated, plus the error that terminated it (if any).
/// Partial side effects are never rolled back.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub entries: Vec<FileEntry>,
    pub error: Option<FmError>,
}

impl FileProvider {
    pub fn new(root: PathBuf, access: AccessController) -> Self {
        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            root,
            root_name,
            access,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn access(&self) -> &AccessController {
        &self.access
    }

    /// Physical location of a logical path; escapes are normalized
    /// away so the result is always under the root.
    pub(crate) fn physical(&self, logical: &str) -> PathBuf {
        logical_path::to_physical(&self.root, logical)
    }

    /// Dot-prefix convention for hidden entries.
    pub(crate) fn is_hidden(name: &str) -> bool {
        name.starts_with('.')
    }

    /// First unused name in `dir` derived from `name` by appending a
    /// numeric suffix: `report(1).txt`, `report(2).txt`, ... Directory
    /// names take the suffix at the end: `photos(1)`.
    pub(crate) fn next_available_name(dir: &Path, name: &str, is_file: bool) -> String {
        if dir.join(name).symlink_metadata().is_err() {
            return name.to_string();
        }
        let (stem, ext) = if is_file {
            match name.rfind('.') {
                Some(idx) => (name[..idx].to_string(), name[idx..].to_string()),
                None => (name.to_string(), String::new()),
            }
        } else {
            (name.to_string(), String::new())
        };
        let mut count = 1u32;
        loop {
            let candidate = format!("{}({}){}", stem, count, ext);
            if dir.join(&candidate).symlink_metadata().is_err() {
                return candidate;
            }
            count += 1;
        }
    }

    /// Copy a directory tree. A permission denial anywhere stops the
    /// walk and returns the blocked physical path; entries copied so
    /// far stay in place. Other failures propagate as errors.
    pub(crate) fn copy_dir(src: &Path, dst: &Path) -> Result<Option<PathBuf>, FmError> {
        if !dst.exists() {
            match fs::create_dir_all(dst) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    return Ok(Some(dst.to_path_buf()))
                }
                Err(e) => return Err(e.into()),
            }
        }
        let entries = match fs::read_dir(src) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Ok(Some(src.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut subdirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(FmError::from)?;
            let from = entry.path();
            let to = dst.join(entry.file_name());
            if entry.file_type().map_err(FmError::from)?.is_dir() {
                subdirs.push((from, to));
            } else {
                match fs::copy(&from, &to) {
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                        return Ok(Some(from))
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        for (from, to) in subdirs {
            if let Some(blocked) = Self::copy_dir(&from, &to)? {
                return Ok(Some(blocked));
            }
        }
        Ok(None)
    }

    /// Delete a directory tree bottom-up: files first, then
    /// subdirectories, then the directory itself. The first denied
    /// deletion stops the walk and returns that path; everything
    /// removed up to that point stays removed.
    pub(crate) fn delete_dir(path: &Path) -> Result<Option<PathBuf>, FmError> {
        let entries = match fs::read_dir(path) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Ok(Some(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut subdirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(FmError::from)?;
            let child = entry.path();
            if entry.file_type().map_err(FmError::from)?.is_dir() {
                subdirs.push(child);
            } else {
                match fs::remove_file(&child) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                        return Ok(Some(child))
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        for dir in subdirs {
            if let Some(blocked) = Self::delete_dir(&dir)? {
                return Ok(Some(blocked));
            }
        }
        match fs::remove_dir(path) {
            Ok(()) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Ok(Some(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Recursive size of a directory tree. Subtrees the process cannot
    /// enumerate are skipped, matching the child-presence convention.
    pub(crate) fn dir_size(path: &Path) -> u64 {
        let mut total = 0u64;
        let mut stack = vec![path.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(e) => e,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                if file_type.is_dir() {
                    stack.push(entry.path());
                } else if let Ok(meta) = entry.metadata() {
                    total += meta.len();
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessController;
    use std::fs;

    #[test]
    fn next_available_name_suffixes() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("f.txt"), b"x").unwrap();
        assert_eq!(
            FileProvider::next_available_name(tmp.path(), "f.txt", true),
            "f(1).txt"
        );
        fs::write(tmp.path().join("f(1).txt"), b"x").unwrap();
        assert_eq!(
            FileProvider::next_available_name(tmp.path(), "f.txt", true),
            "f(2).txt"
        );
        assert_eq!(
            FileProvider::next_available_name(tmp.path(), "g.txt", true),
            "g.txt"
        );

        fs::create_dir(tmp.path().join("photos")).unwrap();
        assert_eq!(
            FileProvider::next_available_name(tmp.path(), "photos", false),
            "photos(1)"
        );
    }

    #[test]
    fn copy_dir_preserves_subtree() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src/sub")).unwrap();
        fs::write(tmp.path().join("src/a.txt"), b"a").unwrap();
        fs::write(tmp.path().join("src/sub/b.txt"), b"b").unwrap();

        let blocked =
            FileProvider::copy_dir(&tmp.path().join("src"), &tmp.path().join("dst")).unwrap();
        assert!(blocked.is_none());
        assert_eq!(fs::read(tmp.path().join("dst/a.txt")).unwrap(), b"a");
        assert_eq!(fs::read(tmp.path().join("dst/sub/b.txt")).unwrap(), b"b");
    }

    #[test]
    fn delete_dir_removes_tree() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("d/sub")).unwrap();
        fs::write(tmp.path().join("d/a.txt"), b"a").unwrap();
        fs::write(tmp.path().join("d/sub/b.txt"), b"b").unwrap();

        let blocked = FileProvider::delete_dir(&tmp.path().join("d")).unwrap();
        assert!(blocked.is_none());
        assert!(!tmp.path().join("d").exists());
    }

    #[test]
    fn dir_size_sums_files_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("d/sub")).unwrap();
        fs::write(tmp.path().join("d/a.txt"), b"abc").unwrap();
        fs::write(tmp.path().join("d/sub/b.txt"), b"de").unwrap();
        assert_eq!(FileProvider::dir_size(&tmp.path().join("d")), 5);
    }

    #[test]
    fn physical_rejects_escapes() {
        let tmp = tempfile::tempdir().unwrap();
        let p = FileProvider::new(tmp.path().to_path_buf(), AccessController::unrestricted());
        let out = p.physical("/../../etc/passwd");
        assert!(out.starts_with(tmp.path()));
    }
}
