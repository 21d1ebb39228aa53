use crate::error::FmError;
use crate::provider::crud::Listing;
use crate::provider::{BatchOutcome, FileProvider};
use crate::response::FileManagerResponse;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Dispatch request for the operations endpoint. `action` selects the
/// operation; the remaining fields are action-specific and default to
/// empty when the client omits them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub target_path: Option<String>,
    /// Names the client explicitly authorizes to auto-rename on
    /// collision during copy/move.
    #[serde(default)]
    pub rename_files: Vec<String>,
    #[serde(default)]
    pub search_string: Option<String>,
    #[serde(default)]
    pub show_hidden_items: bool,
    #[serde(default)]
    pub case_sensitive: bool,
}

fn default_path() -> String {
    "/".to_string()
}

/// The transport layer authenticates; this surface only authorizes
/// against whatever role identity the caller passes along.
#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub role: Option<String>,
}

/// Single dispatch surface for read/create/rename/delete/copy/move/
/// search/details. Always answers 200 with the envelope; failures ride
/// in the envelope's `error` field.
pub async fn file_operations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoleQuery>,
    Json(req): Json<OperationRequest>,
) -> Json<FileManagerResponse> {
    let provider = state.provider.clone();
    let result =
        tokio::task::spawn_blocking(move || dispatch(&provider, req, query.role.as_deref()))
            .await
            .unwrap_or_else(|e| FileManagerResponse::failure(FmError::Other(e.to_string())));
    Json(result)
}

fn dispatch(
    provider: &FileProvider,
    req: OperationRequest,
    role: Option<&str>,
) -> FileManagerResponse {
    let path = req.path.as_str();
    let result = match req.action.as_str() {
        "read" => provider
            .read_dir(path, req.show_hidden_items, role)
            .map(|Listing { cwd, files }| FileManagerResponse::listing(cwd, files)),
        "create" => require(req.name.as_deref(), "name").and_then(|name| {
            provider
                .create(path, name, role)
                .map(|entry| FileManagerResponse::entries(vec![entry]))
        }),
        "rename" => require(req.name.as_deref(), "name").and_then(|name| {
            require(req.new_name.as_deref(), "newName").and_then(|new_name| {
                provider
                    .rename(path, name, new_name, role)
                    .map(|entry| FileManagerResponse::entries(vec![entry]))
            })
        }),
        "delete" => provider.delete(path, &req.names, role).map(batch),
        "copy" => require(req.target_path.as_deref(), "targetPath").and_then(|target| {
            provider
                .copy_items(path, target, &req.names, &req.rename_files, role)
                .map(batch)
        }),
        "move" => require(req.target_path.as_deref(), "targetPath").and_then(|target| {
            provider
                .move_items(path, target, &req.names, &req.rename_files, role)
                .map(batch)
        }),
        "search" => require(req.search_string.as_deref(), "searchString").and_then(|pattern| {
            provider
                .search(path, pattern, req.show_hidden_items, req.case_sensitive, role)
                .map(|Listing { cwd, files }| FileManagerResponse::listing(cwd, files))
        }),
        "details" => provider
            .details(path, &req.names, role)
            .map(FileManagerResponse::detail),
        other => Err(FmError::Other(format!("Unknown action: {}", other))),
    };
    result.unwrap_or_else(FileManagerResponse::failure)
}

fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, FmError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FmError::Other(format!("{} is required", field)))
}

fn batch(outcome: BatchOutcome) -> FileManagerResponse {
    FileManagerResponse {
        files: outcome.entries,
        error: outcome.error.map(FmError::into_details),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessController;
    use std::fs;

    fn provider(root: &std::path::Path) -> FileProvider {
        FileProvider::new(root.to_path_buf(), AccessController::unrestricted())
    }

    fn request(json: serde_json::Value) -> OperationRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn read_action_produces_listing() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), b"x").unwrap();
        let p = provider(tmp.path());

        let resp = dispatch(&p, request(serde_json::json!({"action": "read", "path": "/"})), None);
        assert!(resp.error.is_none());
        assert!(resp.cwd.is_some());
        assert_eq!(resp.files.len(), 1);
    }

    #[test]
    fn unknown_action_is_reported_in_envelope() {
        let tmp = tempfile::tempdir().unwrap();
        let p = provider(tmp.path());
        let resp = dispatch(&p, request(serde_json::json!({"action": "defragment"})), None);
        let error = resp.error.unwrap();
        assert_eq!(error.code, "417");
        assert!(error.message.contains("defragment"));
    }

    #[test]
    fn missing_required_field_is_reported_in_envelope() {
        let tmp = tempfile::tempdir().unwrap();
        let p = provider(tmp.path());
        let resp = dispatch(&p, request(serde_json::json!({"action": "create", "path": "/"})), None);
        assert!(resp.error.unwrap().message.contains("name"));
    }

    #[test]
    fn delete_failure_keeps_partial_results() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a"), b"x").unwrap();
        let p = provider(tmp.path());

        let resp = dispatch(
            &p,
            request(serde_json::json!({
                "action": "delete", "path": "/", "names": ["a"]
            })),
            None,
        );
        assert!(resp.error.is_none());
        assert_eq!(resp.files.len(), 1);
        assert!(!tmp.path().join("a").exists());
    }

    #[test]
    fn camel_case_fields_deserialize() {
        let req = request(serde_json::json!({
            "action": "copy",
            "path": "/src/",
            "targetPath": "/dst/",
            "names": ["f.txt"],
            "renameFiles": ["f.txt"],
            "showHiddenItems": true,
            "caseSensitive": false
        }));
        assert_eq!(req.target_path.as_deref(), Some("/dst/"));
        assert_eq!(req.rename_files, vec!["f.txt".to_string()]);
        assert!(req.show_hidden_items);
    }
}
