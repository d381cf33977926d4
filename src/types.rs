//! Shared types used across all pipeline stages.
//!
//! These types are serialized to JSON between stages (scan → pages) and are
//! the only vocabulary the stages share: a node store of [`Node`]s going in,
//! a list of [`Page`]s coming out.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Opaque node identifier.
///
/// Derived from a stable key (source name + relative path, plus the element
/// index for YAML sequences) so that re-scanning the same tree yields the
/// same ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Hash a stable key into a node id.
    pub fn digest(key: &str) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        Self(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 hex chars, for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A node in the content graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    /// A file on disk.
    File(SourceFile),
    /// A structured-data record parsed from a YAML file.
    Yaml(ContentRecord),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::File(file) => &file.id,
            Node::Yaml(record) => &record.id,
        }
    }

    pub fn as_file(&self) -> Option<&SourceFile> {
        match self {
            Node::File(file) => Some(file),
            Node::Yaml(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&ContentRecord> {
        match self {
            Node::Yaml(record) => Some(record),
            Node::File(_) => None,
        }
    }
}

/// A file discovered under one of the source directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: NodeId,
    /// Name of the source directory the file was found in (`content`, `data`)
    pub source: String,
    /// File name with extension, e.g. `index.yaml`
    pub base: String,
    /// POSIX path relative to the source root, e.g. `posts/hi/index.yaml`
    pub relative_path: String,
    pub absolute_path: PathBuf,
    /// Lowercased extension without the dot; empty when the file has none
    pub extension: String,
}

/// A structured document parsed from a YAML file.
///
/// `data` holds the raw top-level keys exactly as written. `fields` holds
/// what the annotator derived, and stays `None` for records that do not
/// become pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: NodeId,
    /// Id of the [`SourceFile`] this record was parsed from
    pub parent: NodeId,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<DerivedFields>,
}

impl ContentRecord {
    /// The layout this record renders with: the first matching kind in `priority`.
    pub fn layout(&self, priority: &[DocumentKind]) -> Option<DocumentKind> {
        priority
            .iter()
            .copied()
            .find(|kind| self.data.contains_key(kind.name()))
    }
}

/// Metadata computed by the annotator and attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFields {
    /// Site-relative route, e.g. `/posts/hi/`
    pub url: String,
    pub layout: DocumentKind,
}

/// Page archetypes a record can declare by carrying a top-level key of the
/// same name.
///
/// [`DocumentKind::ALL`] is the fixed priority order used when a record
/// carries more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentKind {
    BlogPost,
}

impl DocumentKind {
    pub const ALL: &'static [DocumentKind] = &[DocumentKind::BlogPost];

    pub fn name(self) -> &'static str {
        match self {
            DocumentKind::BlogPost => "BlogPost",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown document kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for DocumentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A generated route bound to a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Route, equal to the record's derived `url`
    pub path: String,
    /// Template path, e.g. `src/templates/BlogPost.js`
    pub component: String,
    pub context: PageContext,
}

/// Payload handed to the template when the page is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(data: Value) -> ContentRecord {
        ContentRecord {
            id: NodeId::from("r"),
            parent: NodeId::from("f"),
            data: data.as_object().cloned().unwrap(),
            fields: None,
        }
    }

    #[test]
    fn node_id_digest_is_stable_hex() {
        let a = NodeId::digest("file:content/posts/hi/index.yaml");
        let b = NodeId::digest("file:content/posts/hi/index.yaml");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn node_id_digest_differs_per_key() {
        assert_ne!(NodeId::digest("a"), NodeId::digest("b"));
    }

    #[test]
    fn document_kind_parses_by_name() {
        assert_eq!("BlogPost".parse::<DocumentKind>(), Ok(DocumentKind::BlogPost));
        assert!("Recipe".parse::<DocumentKind>().is_err());
        assert!("blogpost".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn document_kind_serializes_as_name() {
        let json = serde_json::to_string(&DocumentKind::BlogPost).unwrap();
        assert_eq!(json, "\"BlogPost\"");
    }

    #[test]
    fn layout_found_from_top_level_key() {
        let r = record(json!({"Meta": {}, "BlogPost": {"title": "Hi"}}));
        assert_eq!(r.layout(DocumentKind::ALL), Some(DocumentKind::BlogPost));
    }

    #[test]
    fn layout_ignores_nested_keys() {
        let r = record(json!({"Meta": {"BlogPost": true}}));
        assert_eq!(r.layout(DocumentKind::ALL), None);
    }

    #[test]
    fn layout_respects_priority_list() {
        let r = record(json!({"BlogPost": {}}));
        assert_eq!(r.layout(&[]), None);
    }

    #[test]
    fn node_serializes_with_type_tag() {
        let node = Node::Yaml(record(json!({"BlogPost": {}})));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "Yaml");
        assert!(value.get("fields").is_none());

        let back: Node = serde_json::from_value(value).unwrap();
        assert!(back.as_record().is_some());
    }
}
