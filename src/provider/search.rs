use crate::error::FmError;
use crate::provider::crud::Listing;
use crate::provider::FileProvider;
use crate::utils::path::to_logical;
use std::fs;
use std::io;

/// Anchored glob match: `*` is any run of characters, `?` exactly one.
/// Iterative two-pointer scan with single-star backtracking, so a
/// pattern of many stars stays linear.
pub(crate) fn wildcard_match(pattern: &str, text: &str, case_sensitive: bool) -> bool {
    let (pattern, text) = if case_sensitive {
        (pattern.to_string(), text.to_string())
    } else {
        (pattern.to_lowercase(), text.to_lowercase())
    };
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_ti = 0usize;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

impl FileProvider {
    /// Recursive wildcard search under `path`. Matches are decorated
    /// like listing entries; an entry whose ancestor chain denies
    /// `read` for this role is silently dropped. Subtrees the process
    /// itself cannot enumerate are skipped, not reported.
    pub fn search(
        &self,
        path: &str,
        pattern: &str,
        show_hidden: bool,
        case_sensitive: bool,
        role: Option<&str>,
    ) -> Result<Listing, FmError> {
        let start = self.physical(path);
        let cwd = self.describe(&start, role)?;
        if let Some(p) = &cwd.permission {
            if !p.read {
                return Err(FmError::denied(Some(p), &cwd.name, "read"));
            }
        }

        let mut files = Vec::new();
        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(e) => e,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries {
                let entry = entry.map_err(FmError::from)?;
                let name = entry.file_name().to_string_lossy().to_string();
                if !show_hidden && Self::is_hidden(&name) {
                    continue;
                }
                let physical = entry.path();
                if physical.is_dir() {
                    stack.push(physical.clone());
                }
                if !wildcard_match(pattern, &name, case_sensitive) {
                    continue;
                }
                let parent = to_logical(self.root(), physical.parent().unwrap_or(&physical));
                if !self.access().ancestors_allow_read(&parent, role) {
                    continue;
                }
                files.push(self.describe(&physical, role)?);
            }
        }
        files.sort_by(|a, b| a.filter_path.cmp(&b.filter_path).then(a.name.cmp(&b.name)));

        Ok(Listing { cwd, files })
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

    #[test]
    fn wildcard_basics() {
        assert!(wildcard_match("*.txt", "notes.txt", true));
        assert!(!wildcard_match("*.txt", "notes.txt.bak", true));
        assert!(wildcard_match("a?c", "abc", true));
        assert!(!wildcard_match("a?c", "abbc", true));
        assert!(wildcard_match("*", "anything", true));
        assert!(wildcard_match("**a**", "banana", true));
        assert!(!wildcard_match("*.TXT", "notes.txt", true));
        assert!(wildcard_match("*.TXT", "notes.txt", false));
    }

    #[test]
    fn finds_matches_at_every_depth() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("top.txt"), b"x").unwrap();
        fs::write(tmp.path().join("a/mid.txt"), b"x").unwrap();
        fs::write(tmp.path().join("a/b/deep.TXT"), b"x").unwrap();
        fs::write(tmp.path().join("a/skip.pdf"), b"x").unwrap();

        let p = provider(tmp.path());
        let listing = p.search("/", "*.txt", false, false, None).unwrap();
        let names: Vec<&str> = listing.files.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["top.txt", "mid.txt", "deep.TXT"]);

        let listing = p.search("/", "*.txt", false, true, None).unwrap();
        assert_eq!(listing.files.len(), 2, "case-sensitive drops deep.TXT");
    }

    #[test]
    fn matching_directories_are_returned_too() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("reports/reports-old")).unwrap();
        let p = provider(tmp.path());
        let listing = p.search("/", "reports*", false, false, None).unwrap();
        assert_eq!(listing.files.len(), 2);
    }

    #[test]
    fn hidden_entries_filtered_unless_requested() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(".env"), b"x").unwrap();
        let p = provider(tmp.path());
        assert!(p.search("/", "*env*", false, false, None).unwrap().files.is_empty());
        assert_eq!(p.search("/", "*env*", true, false, None).unwrap().files.len(), 1);
    }

    #[test]
    fn ancestor_denial_drops_matches_silently() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("open")).unwrap();
        fs::create_dir(tmp.path().join("closed")).unwrap();
        fs::write(tmp.path().join("open/a.txt"), b"x").unwrap();
        fs::write(tmp.path().join("closed/b.txt"), b"x").unwrap();

        let rules = vec![AccessRule {
            path: "/closed".to_string(),
            ..Default::default()
        }];
        let p = FileProvider::new(
            tmp.path().to_path_buf(),
            AccessController::new(Some(rules)),
        );
        let listing = p.search("/", "*.txt", false, false, None).unwrap();
        let names: Vec<&str> = listing.files.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt"]);
    }

    #[test]
    fn denied_start_folder_is_unauthorized() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("vault")).unwrap();
        let rules = vec![AccessRule {
            path: "/vault".to_string(),
            ..Default::default()
        }];
        let p = FileProvider::new(
            tmp.path().to_path_buf(),
            AccessController::new(Some(rules)),
        );
        let err = p.search("/vault/", "*", false, false, None).unwrap_err();
        assert_eq!(err.code(), "401");
    }
}
