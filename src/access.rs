use crate::utils::path::{
    extension_of, normalize_logical, stem_of, with_trailing_slash,
};
use serde::{Deserialize, Serialize};

/// One declarative policy entry, loaded from the rules file. `path` is
/// a root-relative pattern: an exact path, a folder prefix ending in
/// `*`, an extension wildcard (`*.*` / `*.ext`), or a basename
/// wildcard (`name.*`). A rule with no `role` applies to every caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRule {
    pub path: String,
    #[serde(default)]
    pub is_file: bool,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub write_contents: bool,
    #[serde(default)]
    pub copy: bool,
    #[serde(default)]
    pub download: bool,
    #[serde(default)]
    pub upload: bool,
}

/// Resolved capability set for one entry. Defaults to fully allowed:
/// an entry no rule matches keeps every capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPermission {
    pub read: bool,
    pub write: bool,
    pub write_contents: bool,
    pub copy: bool,
    pub download: bool,
    pub upload: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Default for AccessPermission {
    fn default() -> Self {
        Self {
            read: true,
            write: true,
            write_contents: true,
            copy: true,
            download: true,
            upload: true,
            message: String::new(),
        }
    }
}

impl AccessPermission {
    fn apply_file_rule(&mut self, rule: &AccessRule) {
        self.copy = rule.copy;
        self.download = rule.download;
        self.write = rule.write;
        self.read = rule.read;
        self.message = rule.message.clone().unwrap_or_default();
    }

    fn apply_folder_rule(&mut self, rule: &AccessRule) {
        self.copy = rule.copy;
        self.download = rule.download;
        self.write = rule.write;
        self.write_contents = rule.write_contents;
        self.read = rule.read;
        self.upload = rule.upload;
        self.message = rule.message.clone().unwrap_or_default();
    }
}

/// Evaluates the ordered rule list against a path/name/role. Every
/// structurally matching rule overwrites the accumulated permission,
/// so the LAST matching rule wins regardless of specificity. List
/// order is the tie-break and is load-bearing.
#[derive(Debug, Clone, Default)]
pub struct AccessController {
    rules: Option<Vec<AccessRule>>,
}

impl AccessController {
    pub fn new(rules: Option<Vec<AccessRule>>) -> Self {
        Self { rules }
    }

    /// No configured rules at all: resolution yields `None`, which
    /// callers treat as fully allowed.
    pub fn unrestricted() -> Self {
        Self { rules: None }
    }

    /// Resolve the permission for the entry `name` inside the logical
    /// folder `location`.
    pub fn resolve(
        &self,
        location: &str,
        name: &str,
        is_file: bool,
        role: Option<&str>,
    ) -> Option<AccessPermission> {
        let rules = self.rules.as_ref()?;

        let candidate_dir = normalize_logical(location);
        let candidate_path = if name.is_empty() {
            candidate_dir.clone()
        } else {
            normalize_logical(&format!("{}/{}", candidate_dir, name))
        };

        let mut permission = AccessPermission::default();
        if is_file {
            let name_ext = extension_of(name);
            let name_stem = stem_of(name);
            for rule in rules.iter().filter(|r| r.is_file) {
                if !role_matches(rule, role) {
                    continue;
                }
                if let Some(idx) = rule.path.find("*.*") {
                    // Folder wildcard: any file at or below the parent.
                    let parent = normalize_logical(&rule.path[..idx]);
                    if parent == "/"
                        || with_trailing_slash(&candidate_dir)
                            .starts_with(&with_trailing_slash(&parent))
                    {
                        permission.apply_file_rule(rule);
                    }
                } else if let Some(idx) = rule.path.find("*.") {
                    // Extension wildcard: files with the rule's
                    // extension, in the rule's directory only. A rule
                    // with no folder prefix at all applies in every
                    // directory.
                    let rule_ext = rule.path[idx + 2..].to_lowercase();
                    let prefix = &rule.path[..idx];
                    let parent = normalize_logical(prefix);
                    if (prefix.is_empty() || candidate_dir == parent)
                        && !name_ext.is_empty()
                        && name_ext == rule_ext
                    {
                        permission.apply_file_rule(rule);
                    }
                } else if rule.path.contains(".*") {
                    // Basename wildcard: files with the rule's stem, in
                    // the rule's directory only; folder-less rules apply
                    // everywhere, like the extension form.
                    let rule_file = rule.path.rsplit('/').next().unwrap_or(&rule.path);
                    let rule_stem = stem_of(rule_file);
                    let prefix = &rule.path[..rule.path.len() - rule_file.len()];
                    let parent = normalize_logical(prefix);
                    if (prefix.is_empty() || candidate_dir == parent) && name_stem == rule_stem {
                        permission.apply_file_rule(rule);
                    }
                } else if normalize_logical(&rule.path) == candidate_path {
                    permission.apply_file_rule(rule);
                }
            }
        } else {
            for rule in rules.iter().filter(|r| !r.is_file) {
                if !role_matches(rule, role) {
                    continue;
                }
                let rule_path = normalize_logical(&rule.path);
                if let Some(idx) = rule.path.find('*') {
                    let parent = normalize_logical(&rule.path[..idx]);
                    if parent == "/"
                        || with_trailing_slash(&candidate_path)
                            .starts_with(&with_trailing_slash(&parent))
                    {
                        permission.apply_folder_rule(rule);
                    }
                } else if rule_path == candidate_path {
                    permission.apply_folder_rule(rule);
                } else if with_trailing_slash(&candidate_path)
                    .starts_with(&with_trailing_slash(&rule_path))
                {
                    // Ancestor fallback: a prefix-matching folder rule
                    // passes down write/writeContents only, never read.
                    permission.write = rule.write_contents;
                    permission.write_contents = rule.write_contents;
                }
            }
        }
        Some(permission)
    }

    /// Folder permission for a trailing-slash path: the last segment is
    /// resolved against its parent.
    pub fn resolve_path(&self, path: &str, role: Option<&str>) -> Option<AccessPermission> {
        let (parent, name) = crate::utils::path::parent_and_name(path);
        self.resolve(&parent, &name, false, role)
    }

    /// Walk every ancestor folder named by `filter_path` (root-relative
    /// parent path of an entry); each must grant `read`. Levels without
    /// a matching rule resolve to the allow-default and the walk
    /// continues.
    pub fn ancestors_allow_read(&self, filter_path: &str, role: Option<&str>) -> bool {
        let mut current = String::from("/");
        for segment in filter_path.split('/').filter(|s| !s.is_empty()) {
            match self.resolve_path(&current, role) {
                None => break,
                Some(p) if !p.read => return false,
                Some(_) => {}
            }
            current.push_str(segment);
            current.push('/');
        }
        match self.resolve_path(&current, role) {
            Some(p) if !p.read => false,
            _ => true,
        }
    }
}

fn role_matches(rule: &AccessRule, role: Option<&str>) -> bool {
    match rule.role.as_deref() {
        None => true,
        Some(r) => Some(r) == role,
    }
}
