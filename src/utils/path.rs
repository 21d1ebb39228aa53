use std::path::{Path, PathBuf};

/// Normalize a logical, forward-slash path to its canonical form:
/// leading `/`, no duplicate or trailing separators, `.` and `..`
/// resolved. `..` never climbs above the root, so the result of
/// joining a canonical path onto the content root always stays inside
/// the root.
pub fn normalize_logical(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Canonical form that always ends in `/` (the root stays `/`). Used
/// for slash-aware prefix comparisons.
pub fn with_trailing_slash(path: &str) -> String {
    let canon = normalize_logical(path);
    if canon == "/" {
        canon
    } else {
        format!("{}/", canon)
    }
}

/// Map a logical path onto the physical tree under `root`. Escapes are
/// normalized away before the join, so the result is always confined
/// to the root.
pub fn to_physical(root: &Path, logical: &str) -> PathBuf {
    let canon = normalize_logical(logical);
    let mut full = root.to_path_buf();
    for segment in canon.split('/').filter(|s| !s.is_empty()) {
        full.push(segment);
    }
    full
}

/// Logical path of `physical` relative to `root`, in canonical form.
/// Paths outside the root collapse to `/`.
pub fn to_logical(root: &Path, physical: &Path) -> String {
    match physical.strip_prefix(root) {
        Ok(rel) => {
            let joined = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            normalize_logical(&joined)
        }
        Err(_) => "/".to_string(),
    }
}

/// Split a trailing-slash folder path into its parent (trailing-slash
/// form) and last segment: `/a/b/` -> (`/a/`, `b`). The root splits
/// into (`/`, ``).
pub fn parent_and_name(path: &str) -> (String, String) {
    let canon = normalize_logical(path);
    if canon == "/" {
        return ("/".to_string(), String::new());
    }
    match canon.rfind('/') {
        Some(0) => ("/".to_string(), canon[1..].to_string()),
        Some(idx) => (format!("{}/", &canon[..idx]), canon[idx + 1..].to_string()),
        None => ("/".to_string(), canon),
    }
}

/// Lowercased extension of a file name, without the leading dot.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// File name without its extension.
pub fn stem_of(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
