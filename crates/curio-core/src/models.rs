//! Data models for Curio
//!
//! Defines the content tree, asset records, release-note entries and the
//! read-only view over the global settings document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name given to the root of a fresh or migrated tree
pub const ROOT_NAME: &str = "Root";

/// Leaf item inside a folder; its shape belongs to the front end
pub type Entry = Value;

/// A node of the content tree
///
/// All four fields are always serialized, so every persisted node carries
/// `name`, `cover`, `folders` and `entries` even when empty. Keys this type
/// does not model are kept in `extra` and written back untouched.
///
/// Decoding accepts any JSON object: `null` or missing fields become empty,
/// scalar names are stringified, and a lone folder or entry where a list
/// belongs becomes a one-element list. Only a non-object is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Value")]
pub struct ContentNode {
    /// Display name
    pub name: String,
    /// Cover image path, or empty
    pub cover: String,
    /// Child folders, in display order
    pub folders: Vec<ContentNode>,
    /// Leaf items, in display order
    pub entries: Vec<Entry>,
    /// Unmodelled keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<Value> for ContentNode {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::from_object(map)),
            Value::Array(_) => Err("expected a tree node, found an array".to_string()),
            other => Err(format!("expected a tree node, found {}", other)),
        }
    }
}

impl ContentNode {
    /// Create an empty node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The canonical empty tree: `{name:"Root", cover:"", folders:[], entries:[]}`
    pub fn empty_root() -> Self {
        Self::new(ROOT_NAME)
    }

    fn from_object(mut map: Map<String, Value>) -> Self {
        Self {
            name: text(map.remove("name")),
            cover: text(map.remove("cover")),
            folders: list(map.remove("folders"))
                .into_iter()
                .map(Self::from_folder)
                .collect(),
            entries: list(map.remove("entries")),
            extra: map,
        }
    }

    /// A folder that is not an object is kept as a node named by its value
    fn from_folder(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from_object(map),
            other => Self::new(text(Some(other))),
        }
    }

    /// Add a child folder
    pub fn with_folder(mut self, folder: ContentNode) -> Self {
        self.folders.push(folder);
        self
    }

    /// Add a leaf entry
    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Number of folders in this subtree, excluding this node
    pub fn folder_count(&self) -> usize {
        self.folders.iter().map(|f| 1 + f.folder_count()).sum()
    }

    /// Number of entries in this subtree
    pub fn entry_count(&self) -> usize {
        self.entries.len() + self.folders.iter().map(|f| f.entry_count()).sum::<usize>()
    }
}

fn text(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

fn list(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

/// Result of ingesting an image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetRecord {
    /// Path relative to the data directory, e.g. `IMG/cover_1.png`
    pub path: String,
    /// Unique file name inside the asset directory
    pub filename: String,
    /// Extension including the dot, e.g. `.png`
    pub extension: String,
}

/// One release-note record, kept verbatim as returned by the remote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ChangelogEntry(pub Value);

impl ChangelogEntry {
    /// Raw `published_at` value
    pub fn published_at(&self) -> Option<&Value> {
        self.0.get("published_at")
    }

    /// `published_at` parsed as an RFC 3339 timestamp
    pub fn published_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.published_at()?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Release name, falling back to the tag
    pub fn title(&self) -> Option<&str> {
        ["name", "tag_name"]
            .iter()
            .filter_map(|key| self.0.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
    }
}

/// A named profile pointing at its session file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub name: String,
    /// Path of the profile's session document
    #[serde(default)]
    pub value: String,
}

/// Typed view over the global settings document
///
/// The settings store keeps the document opaque; this view only reads the
/// keys the front end is known to write.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub active_session: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GlobalSettings {
    /// Read the view out of a raw settings document
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// The profile named by `activeSession`, if any
    pub fn active_profile(&self) -> Option<&Profile> {
        let active = self.active_session.as_deref()?;
        self.profiles.iter().find(|p| p.name == active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_root_shape() {
        let value = serde_json::to_value(ContentNode::empty_root()).unwrap();
        assert_eq!(
            value,
            json!({"name": "Root", "cover": "", "folders": [], "entries": []})
        );
    }

    #[test]
    fn test_missing_keys_are_filled() {
        let node: ContentNode =
            serde_json::from_value(json!({"name": "Root", "folders": [{"name": "F1"}]})).unwrap();

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Root",
                "cover": "",
                "folders": [{"name": "F1", "cover": "", "folders": [], "entries": []}],
                "entries": []
            })
        );
    }

    #[test]
    fn test_unknown_keys_and_entries_pass_through() {
        let raw = json!({
            "name": "Films",
            "cover": "IMG/films.png",
            "folders": [],
            "entries": [{"title": "Heat", "rating": 5, "tags": ["crime"]}],
            "sortMode": "alpha"
        });

        let node: ContentNode = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(node.extra.get("sortMode"), Some(&json!("alpha")));
        assert_eq!(serde_json::to_value(&node).unwrap(), raw);
    }

    #[test]
    fn test_null_and_mistyped_fields_are_tolerated() {
        let raw = json!({
            "name": 3,
            "cover": null,
            "folders": [
                {"name": "Books", "cover": null, "folders": null, "entries": [{"t": 1}]},
                "Loose"
            ],
            "entries": {"title": "single"}
        });

        let node: ContentNode = serde_json::from_value(raw).unwrap();
        assert_eq!(node.name, "3");
        assert_eq!(node.cover, "");
        assert_eq!(node.folders.len(), 2);
        assert_eq!(node.folders[0].name, "Books");
        assert_eq!(node.folders[0].cover, "");
        assert!(node.folders[0].folders.is_empty());
        assert_eq!(node.folders[0].entries, vec![json!({"t": 1})]);
        assert_eq!(node.folders[1], ContentNode::new("Loose"));
        assert_eq!(node.entries, vec![json!({"title": "single"})]);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(serde_json::from_value::<ContentNode>(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<ContentNode>(json!("Root")).is_err());
        assert!(serde_json::from_value::<ContentNode>(Value::Null).is_err());
    }

    #[test]
    fn test_counts() {
        let tree = ContentNode::empty_root()
            .with_folder(
                ContentNode::new("A")
                    .with_folder(ContentNode::new("A1").with_entry(json!({"title": "x"})))
                    .with_entry(json!({"title": "y"})),
            )
            .with_folder(ContentNode::new("B"))
            .with_entry(json!({"title": "z"}));

        assert_eq!(tree.folder_count(), 3);
        assert_eq!(tree.entry_count(), 3);
    }

    #[test]
    fn test_changelog_entry_accessors() {
        let entry = ChangelogEntry(json!({
            "tag_name": "v1.2.0",
            "name": "",
            "published_at": "2024-05-01T12:00:00Z"
        }));

        assert_eq!(entry.published_at(), Some(&json!("2024-05-01T12:00:00Z")));
        let ts = entry.published_at_utc().unwrap();
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2024-05-01");
        assert_eq!(entry.title(), Some("v1.2.0"));

        let bare = ChangelogEntry(json!({"published_at": 17}));
        assert!(bare.published_at_utc().is_none());
        assert!(bare.title().is_none());
    }

    #[test]
    fn test_global_settings_view() {
        let raw = json!({
            "profiles": [
                {"name": "Default", "value": "./Profiles/Default.json"},
                {"name": "Work", "value": "./Profiles/Work.json"}
            ],
            "activeSession": "Work",
            "theme": "dark"
        });

        let settings = GlobalSettings::from_value(&raw).unwrap();
        assert_eq!(settings.profiles.len(), 2);
        assert_eq!(
            settings.active_profile().map(|p| p.value.as_str()),
            Some("./Profiles/Work.json")
        );
        assert_eq!(settings.extra.get("theme"), Some(&json!("dark")));

        let empty = GlobalSettings::from_value(&json!({})).unwrap();
        assert!(empty.active_profile().is_none());
    }
}
