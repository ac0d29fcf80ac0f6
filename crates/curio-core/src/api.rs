//! Request/reply boundary
//!
//! Decodes routes and JSON bodies into typed requests, runs them against a
//! [`Library`], and encodes the outcome as a status code plus body. This is
//! the only place errors are turned into status codes; everything below
//! works with [`StoreError`].
//!
//! | Route | Request | Success |
//! |---|---|---|
//! | `GET /load` | (none) | tree |
//! | `POST /save` | tree | `{status:"ok"}` |
//! | `GET /load-global-settings` | (none) | settings |
//! | `POST /save-global-settings` | settings | `{status:"success"}` |
//! | `POST /load-session` | `{sessionPath}` | session |
//! | `POST /save-session` | `{sessionPath, data}` | `{status:"success"}` |
//! | `POST /save-json-session` | `{sessionPath, data, fileName?}` | `{status, message, path}` |
//! | `POST /save-profile` | `{path, data}` | `{status:"success"}` |
//! | `POST /rename-profile-file` | `{oldPath, newPath}` | `{status:"success"}` |
//! | `POST /save-image` | `{imageData, suggestedName?}` | `{status, path, filename}` |
//! | `GET /IMG/<filename>` | (none) | image bytes |
//! | `GET /fetch-changelog` | (none) | `{status, data, new_release}` |

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::assets::content_type;
use crate::config::ASSET_DIR_NAME;
use crate::library::Library;
use crate::models::ContentNode;
use crate::storage::{StoreError, StoreResult};

/// File name used for imported sessions that arrive without one
const DEFAULT_IMPORT_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSessionRequest {
    #[serde(default)]
    pub session_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSessionRequest {
    #[serde(default)]
    pub session_path: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveJsonSessionRequest {
    #[serde(default)]
    pub session_path: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SaveProfileRequest {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameProfileRequest {
    #[serde(default)]
    pub old_path: String,
    #[serde(default)]
    pub new_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveImageRequest {
    pub image_data: String,
    #[serde(default)]
    pub suggested_name: Option<String>,
}

/// A decoded request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    LoadTree,
    SaveTree(ContentNode),
    LoadSettings,
    SaveSettings(Value),
    LoadSession(LoadSessionRequest),
    SaveSession(SaveSessionRequest),
    SaveJsonSession(SaveJsonSessionRequest),
    SaveProfile(SaveProfileRequest),
    RenameProfile(RenameProfileRequest),
    SaveImage(SaveImageRequest),
    ServeImage(String),
    FetchChangelog,
}

impl Request {
    /// Decode a route and its body
    ///
    /// Returns `Ok(None)` for an unknown route and `BadRequest` when the body
    /// does not have the shape the route expects. A query string on the
    /// path is ignored.
    pub fn from_route(method: &str, path: &str, body: Value) -> StoreResult<Option<Self>> {
        let path = path.split('?').next().unwrap_or(path);
        let method = method.to_ascii_uppercase();

        let request = match (method.as_str(), path) {
            ("GET", "/load") => Request::LoadTree,
            ("POST", "/save") => Request::SaveTree(decode_body(body)?),
            ("GET", "/load-global-settings") => Request::LoadSettings,
            ("POST", "/save-global-settings") => Request::SaveSettings(body),
            ("POST", "/load-session") => Request::LoadSession(decode_body(body)?),
            ("POST", "/save-session") => Request::SaveSession(decode_body(body)?),
            ("POST", "/save-json-session") => Request::SaveJsonSession(decode_body(body)?),
            ("POST", "/save-profile") => Request::SaveProfile(decode_body(body)?),
            ("POST", "/rename-profile-file") => Request::RenameProfile(decode_body(body)?),
            ("POST", "/save-image") => Request::SaveImage(decode_body(body)?),
            ("GET", "/fetch-changelog") => Request::FetchChangelog,
            ("GET", other) => match asset_name(other) {
                Some(filename) => Request::ServeImage(filename.to_string()),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(request))
    }
}

/// `/IMG/<name>` -> `<name>`
fn asset_name(path: &str) -> Option<&str> {
    path.strip_prefix('/')?
        .strip_prefix(ASSET_DIR_NAME)?
        .strip_prefix('/')
        .filter(|name| !name.is_empty())
}

fn decode_body<T: DeserializeOwned>(body: Value) -> StoreResult<T> {
    serde_json::from_value(body).map_err(|e| StoreError::BadRequest {
        details: e.to_string(),
    })
}

/// Reply payload
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    Binary {
        content_type: &'static str,
        bytes: Vec<u8>,
    },
}

/// Status code plus body, ready for any transport
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: ReplyBody,
}

impl Reply {
    /// 200 with a serialized body
    pub fn ok<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self {
                status: 200,
                body: ReplyBody::Json(value),
            },
            Err(e) => Self::error(500, e.to_string()),
        }
    }

    /// Error reply carrying `{error: message}`
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ReplyBody::Json(json!({ "error": message.into() })),
        }
    }

    /// Error reply for a store failure
    ///
    /// `not_found` replaces the message of lookup misses, so callers see a
    /// route-specific text instead of a filesystem path.
    pub fn from_error(err: &StoreError, not_found: Option<&str>) -> Self {
        let status = err.kind().status_code();
        let message = match not_found {
            Some(message) if err.is_not_found() => message.to_string(),
            _ => err.to_string(),
        };
        Self::error(status, message)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// JSON body, if this is a JSON reply
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ReplyBody::Json(value) => Some(value),
            ReplyBody::Binary { .. } => None,
        }
    }
}

/// Decode and run one route
pub fn dispatch(library: &Library, method: &str, path: &str, body: Value) -> Reply {
    let reply = match Request::from_route(method, path, body) {
        Ok(Some(request)) => handle(library, request),
        Ok(None) => Reply::error(404, "Not found"),
        Err(err) => Reply::from_error(&err, None),
    };

    if reply.status >= 500 {
        warn!(method, path, status = reply.status, "request failed");
    } else {
        debug!(method, path, status = reply.status, "request handled");
    }
    reply
}

/// Run a decoded request
pub fn handle(library: &Library, request: Request) -> Reply {
    match request {
        Request::LoadTree => match library.tree().load() {
            Ok(tree) => Reply::ok(&tree),
            Err(err) => Reply::from_error(&err, None),
        },
        Request::SaveTree(tree) => match library.tree().save(&tree) {
            Ok(()) => Reply::ok(&json!({"status": "ok"})),
            Err(err) => Reply::from_error(&err, None),
        },
        Request::LoadSettings => match library.settings().load() {
            Ok(settings) => Reply::ok(&settings),
            Err(err) => Reply::from_error(&err, Some("Global settings not found")),
        },
        Request::SaveSettings(settings) => match library.settings().save(&settings) {
            Ok(()) => success(),
            Err(err) => Reply::from_error(&err, None),
        },
        Request::LoadSession(req) => {
            let path = req.session_path.unwrap_or_default();
            match library.documents().load(&path) {
                Ok(session) => Reply::ok(&session),
                Err(err) => Reply::from_error(&err, Some("Session file not found")),
            }
        }
        Request::SaveSession(req) => {
            match library.documents().save(&req.session_path, &req.data) {
                Ok(_) => success(),
                Err(err) => Reply::from_error(&err, None),
            }
        }
        Request::SaveJsonSession(req) => save_json_session(library, req),
        Request::SaveProfile(req) => match library.documents().save(&req.path, &req.data) {
            Ok(_) => success(),
            Err(err) => Reply::from_error(&err, None),
        },
        Request::RenameProfile(req) => {
            match library.documents().rename(&req.old_path, &req.new_path) {
                Ok(_) => success(),
                Err(err) => Reply::from_error(&err, Some("Old file not found")),
            }
        }
        Request::SaveImage(req) => {
            match library
                .assets()
                .ingest(&req.image_data, req.suggested_name.as_deref())
            {
                Ok(record) => Reply::ok(&json!({
                    "status": "success",
                    "path": record.path,
                    "filename": record.filename,
                })),
                Err(err) => Reply::from_error(&err, None),
            }
        }
        Request::ServeImage(filename) => match library.assets().serve(&filename) {
            Ok(bytes) => Reply {
                status: 200,
                body: ReplyBody::Binary {
                    content_type: content_type(&filename),
                    bytes,
                },
            },
            Err(err) => Reply::from_error(&err, Some("Image not found")),
        },
        Request::FetchChangelog => match library.changelog().refresh() {
            Ok(refresh) => Reply::ok(&json!({
                "status": "success",
                "data": refresh.entries,
                "new_release": refresh.new_release,
            })),
            Err(err) => Reply::from_error(&err, None),
        },
    }
}

fn success() -> Reply {
    Reply::ok(&json!({"status": "success"}))
}

/// Store an imported session
///
/// Without a `sessionPath`, the document goes to the profiles directory as
/// `imported_<unix-millis>_<fileName>`.
fn save_json_session(library: &Library, req: SaveJsonSessionRequest) -> Reply {
    let path = match req.session_path.filter(|p| !p.is_empty()) {
        Some(path) => PathBuf::from(path),
        None => import_path(library, req.file_name.as_deref()),
    };

    match library.documents().save(&path, &req.data) {
        Ok(written) => Reply::ok(&json!({
            "status": "success",
            "message": format!("JSON session saved to {}", written.display()),
            "path": written,
        })),
        Err(err) => Reply::from_error(&err, None),
    }
}

fn import_path(library: &Library, file_name: Option<&str>) -> PathBuf {
    let name = file_name
        .and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_IMPORT_NAME.to_string());
    library.config().profiles_dir().join(format!(
        "imported_{}_{}",
        Utc::now().timestamp_millis(),
        name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ReleaseSource;
    use crate::config::tests::test_config;
    use crate::models::ChangelogEntry;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use tempfile::TempDir;

    struct StaticSource(Option<Vec<ChangelogEntry>>);

    impl ReleaseSource for StaticSource {
        fn location(&self) -> String {
            "static://releases".to_string()
        }

        fn fetch(&self) -> StoreResult<Vec<ChangelogEntry>> {
            self.0.clone().ok_or_else(|| StoreError::Remote {
                url: self.location(),
                details: "offline".to_string(),
            })
        }
    }

    fn test_library(temp_dir: &TempDir, releases: Option<Vec<ChangelogEntry>>) -> Library {
        Library::with_release_source(test_config(temp_dir), Box::new(StaticSource(releases)))
    }

    fn call(library: &Library, method: &str, path: &str, body: Value) -> (u16, Value) {
        let reply = dispatch(library, method, path, body);
        let value = reply.json().cloned().unwrap_or(Value::Null);
        (reply.status, value)
    }

    #[test]
    fn test_tree_routes() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);

        let (status, body) = call(&library, "GET", "/load", Value::Null);
        assert_eq!(status, 200);
        assert_eq!(
            body,
            json!({"name": "Root", "cover": "", "folders": [], "entries": []})
        );

        let tree = json!({
            "name": "Root",
            "cover": "",
            "folders": [{"name": "F1", "cover": "", "folders": [], "entries": []}],
            "entries": []
        });
        let (status, body) = call(&library, "POST", "/save", tree.clone());
        assert_eq!(status, 200);
        assert_eq!(body, json!({"status": "ok"}));

        let (_, body) = call(&library, "get", "/load?ts=123", Value::Null);
        assert_eq!(body, tree);
    }

    #[test]
    fn test_settings_routes() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);

        let (status, body) = call(&library, "GET", "/load-global-settings", Value::Null);
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "Global settings not found"}));

        let settings = json!({"profiles": [], "activeSession": null});
        let (status, body) = call(&library, "POST", "/save-global-settings", settings.clone());
        assert_eq!(status, 200);
        assert_eq!(body, json!({"status": "success"}));

        let (status, body) = call(&library, "GET", "/load-global-settings", Value::Null);
        assert_eq!(status, 200);
        assert_eq!(body, settings);
    }

    #[test]
    fn test_session_routes() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);

        let (status, _) = call(&library, "POST", "/load-session", json!({"sessionPath": ""}));
        assert_eq!(status, 404);
        let (status, body) = call(&library, "POST", "/load-session", json!({}));
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "Session file not found"}));

        let data = json!({"name": "Root", "folders": [], "entries": [{"t": 1}]});
        let (status, _) = call(
            &library,
            "POST",
            "/save-session",
            json!({"sessionPath": "./Profiles/Default.json", "data": data}),
        );
        assert_eq!(status, 200);

        let (status, body) = call(
            &library,
            "POST",
            "/load-session",
            json!({"sessionPath": "./Profiles/Default.json"}),
        );
        assert_eq!(status, 200);
        assert_eq!(body, data);
    }

    #[test]
    fn test_corrupt_session_is_500() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);
        std::fs::write(temp_dir.path().join("broken.json"), "{").unwrap();

        let (status, body) = call(
            &library,
            "POST",
            "/load-session",
            json!({"sessionPath": "broken.json"}),
        );
        assert_eq!(status, 500);
        assert!(body["error"].as_str().unwrap().contains("Invalid document format"));
    }

    #[test]
    fn test_save_json_session() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);

        let (status, body) = call(
            &library,
            "POST",
            "/save-json-session",
            json!({"sessionPath": "imports/a.json", "data": {"x": 1}, "fileName": "a.json"}),
        );
        assert_eq!(status, 200);
        assert_eq!(body["status"], "success");
        assert!(body["message"].as_str().unwrap().contains("a.json"));
        assert!(temp_dir.path().join("imports/a.json").is_file());

        let (status, body) = call(
            &library,
            "POST",
            "/save-json-session",
            json!({"data": {"y": 2}, "fileName": "../../evil.json"}),
        );
        assert_eq!(status, 200);
        let written = PathBuf::from(body["path"].as_str().unwrap());
        assert!(written.starts_with(temp_dir.path().join("Profiles")));
        let name = written.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("imported_"));
        assert!(name.ends_with("_evil.json"));
        assert_eq!(library.documents().load(&written).unwrap(), json!({"y": 2}));
    }

    #[test]
    fn test_profile_routes() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);

        let (status, _) = call(
            &library,
            "POST",
            "/save-profile",
            json!({"path": "./Profiles/Old.json", "data": {"p": true}}),
        );
        assert_eq!(status, 200);

        let (status, _) = call(
            &library,
            "POST",
            "/rename-profile-file",
            json!({"oldPath": "./Profiles/Old.json", "newPath": "./Profiles/New.json"}),
        );
        assert_eq!(status, 200);
        assert!(temp_dir.path().join("Profiles/New.json").is_file());
        assert!(!temp_dir.path().join("Profiles/Old.json").exists());

        let (status, body) = call(
            &library,
            "POST",
            "/rename-profile-file",
            json!({"oldPath": "./Profiles/Old.json", "newPath": "./Profiles/Other.json"}),
        );
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "Old file not found"}));
    }

    #[test]
    fn test_image_routes() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);
        let bytes = b"\x89PNG fake image".to_vec();
        let image_data = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));

        let (status, body) = call(
            &library,
            "POST",
            "/save-image",
            json!({"imageData": image_data, "suggestedName": "cover art"}),
        );
        assert_eq!(status, 200);
        assert_eq!(
            body,
            json!({"status": "success", "path": "IMG/cover_art.png", "filename": "cover_art.png"})
        );

        let reply = dispatch(&library, "GET", "/IMG/cover_art.png", Value::Null);
        assert_eq!(reply.status, 200);
        assert_eq!(
            reply.body,
            ReplyBody::Binary {
                content_type: "image/png",
                bytes
            }
        );

        let (status, _) = call(&library, "GET", "/IMG/nothing.png", Value::Null);
        assert_eq!(status, 404);
        let (status, _) = call(&library, "GET", "/IMG/../data.json", Value::Null);
        assert_eq!(status, 404);
    }

    #[test]
    fn test_bad_image_request_is_500() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);

        let (status, body) = call(&library, "POST", "/save-image", json!({"suggestedName": "x"}));
        assert_eq!(status, 500);
        assert!(body["error"].as_str().unwrap().contains("Bad request"));

        let (status, _) = call(
            &library,
            "POST",
            "/save-image",
            json!({"imageData": "data:image/png;base64,***"}),
        );
        assert_eq!(status, 500);
    }

    #[test]
    fn test_changelog_route() {
        let temp_dir = TempDir::new().unwrap();
        let releases = vec![ChangelogEntry(
            json!({"tag_name": "v1", "published_at": "2024-01-01T00:00:00Z"}),
        )];
        let library = test_library(&temp_dir, Some(releases));

        let (status, body) = call(&library, "GET", "/fetch-changelog", Value::Null);
        assert_eq!(status, 200);
        assert_eq!(body["status"], "success");
        assert_eq!(body["new_release"], true);
        assert_eq!(body["data"][0]["tag_name"], "v1");

        let (_, body) = call(&library, "GET", "/fetch-changelog", Value::Null);
        assert_eq!(body["new_release"], false);
    }

    #[test]
    fn test_changelog_route_fails_only_without_cache() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);

        let (status, _) = call(&library, "GET", "/fetch-changelog", Value::Null);
        assert_eq!(status, 500);

        std::fs::write(library.changelog().path(), "[]").unwrap();
        let (status, body) = call(&library, "GET", "/fetch-changelog", Value::Null);
        assert_eq!(status, 200);
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["new_release"], false);
    }

    #[test]
    fn test_unknown_routes() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, None);

        assert_eq!(call(&library, "GET", "/nope", Value::Null).0, 404);
        assert_eq!(call(&library, "DELETE", "/save", Value::Null).0, 404);
        assert_eq!(call(&library, "GET", "/IMG/", Value::Null).0, 404);
        assert_eq!(asset_name("/IMG/a.png"), Some("a.png"));
        assert_eq!(asset_name("/IMGa.png"), None);
    }
}
