//! Node lookup and storage.
//!
//! The annotator, the asset resolver, and the page builder never walk the
//! filesystem themselves. They see the content graph through
//! [`NodeRepository`], which offers exactly three reads:
//!
//! | Operation | Used by |
//! |-----------|---------|
//! | [`find_by_id`](NodeRepository::find_by_id) | annotator (record → parent file) |
//! | [`find_one`](NodeRepository::find_one) | `fileBySrcPath` asset resolution |
//! | [`query_all`](NodeRepository::query_all) | page builder |
//!
//! [`NodeStore`] is the in-memory implementation populated by ingestion and
//! persisted between stages as `nodes.json`. Tests substitute their own
//! implementations (e.g. one whose query always fails).

use crate::types::{ContentRecord, DerivedFields, Node, NodeId, SourceFile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Node store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum AttachError {
    #[error("No record with id {0}")]
    NotFound(NodeId),
    #[error("Node {0} is not a record")]
    NotARecord(NodeId),
    #[error("Record {id} already has fields {existing:?}, refusing to replace with {new:?}")]
    AlreadyAttached {
        id: NodeId,
        existing: DerivedFields,
        new: DerivedFields,
    },
}

/// Single-result file filter: the file at an absolute, normalized path.
#[derive(Debug, Clone)]
pub struct FileFilter {
    pub absolute_path: PathBuf,
}

impl FileFilter {
    pub fn absolute_path(path: impl Into<PathBuf>) -> Self {
        Self {
            absolute_path: path.into(),
        }
    }
}

/// One row of [`NodeRepository::query_all`]: a record id and its derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub id: NodeId,
    pub fields: Option<DerivedFields>,
}

pub trait NodeRepository {
    fn find_by_id(&self, id: &NodeId) -> Option<&Node>;

    /// First file matching `filter`, in insertion order.
    fn find_one(&self, filter: &FileFilter) -> Option<&SourceFile>;

    /// Every structured-data record, in insertion order.
    fn query_all(&self) -> Result<Vec<RecordRow>, QueryError>;
}

/// Serialized form of a [`NodeStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeManifest {
    pub nodes: Vec<Node>,
}

/// In-memory, insertion-ordered node store.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    by_path: HashMap<PathBuf, usize>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. A node with the same id replaces the previous one in place.
    pub fn insert(&mut self, node: Node) {
        let id = node.id().clone();
        let path = node.as_file().map(|f| f.absolute_path.clone());
        let pos = match self.index.get(&id) {
            Some(&pos) => {
                if let Some(old) = self.nodes[pos].as_file() {
                    self.by_path.remove(&old.absolute_path);
                }
                self.nodes[pos] = node;
                pos
            }
            None => {
                self.nodes.push(node);
                self.index.insert(id, self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        if let Some(path) = path {
            self.by_path.entry(path).or_insert(pos);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.nodes.iter().filter_map(Node::as_file)
    }

    pub fn records(&self) -> impl Iterator<Item = &ContentRecord> {
        self.nodes.iter().filter_map(Node::as_record)
    }

    pub fn file_at(&self, absolute_path: &Path) -> Option<&SourceFile> {
        self.by_path
            .get(absolute_path)
            .and_then(|&pos| self.nodes[pos].as_file())
    }

    /// Attach derived fields to a record.
    ///
    /// Fields are write-once: attaching the same values again is accepted,
    /// attaching different values is an error.
    pub fn attach_fields(&mut self, id: &NodeId, fields: DerivedFields) -> Result<(), AttachError> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| AttachError::NotFound(id.clone()))?;
        let Node::Yaml(record) = &mut self.nodes[pos] else {
            return Err(AttachError::NotARecord(id.clone()));
        };
        match &record.fields {
            Some(existing) if *existing == fields => Ok(()),
            Some(existing) => Err(AttachError::AlreadyAttached {
                id: id.clone(),
                existing: existing.clone(),
                new: fields,
            }),
            None => {
                record.fields = Some(fields);
                Ok(())
            }
        }
    }

    pub fn to_manifest(&self) -> NodeManifest {
        NodeManifest {
            nodes: self.nodes.clone(),
        }
    }
}

impl From<NodeManifest> for NodeStore {
    fn from(manifest: NodeManifest) -> Self {
        let mut store = NodeStore::new();
        for node in manifest.nodes {
            store.insert(node);
        }
        store
    }
}

impl NodeRepository for NodeStore {
    fn find_by_id(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    fn find_one(&self, filter: &FileFilter) -> Option<&SourceFile> {
        self.file_at(&filter.absolute_path)
    }

    fn query_all(&self) -> Result<Vec<RecordRow>, QueryError> {
        Ok(self
            .records()
            .map(|r| RecordRow {
                id: r.id.clone(),
                fields: r.fields.clone(),
            })
            .collect())
    }
}
