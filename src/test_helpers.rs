//! Shared test utilities.
//!
//! Node builders for in-memory stores (rooted at a fake `/site` project) and
//! filesystem helpers for tests that ingest a real tree.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut store = NodeStore::new();
//! let parent = file_node("content", "posts/hi/index.yaml");
//! let record = record_node(parent.id(), json!({"BlogPost": {}}));
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::types::{ContentRecord, Node, NodeId, SourceFile};
use serde_json::Value;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

// =========================================================================
// Node builders
// =========================================================================

/// A file node at `/site/<source>/<rel>`.
pub fn file_node(source: &str, rel: &str) -> Node {
    let absolute_path: PathBuf = Path::new("/site").join(source).join(rel);
    let base = rel.rsplit('/').next().unwrap_or(rel).to_string();
    let extension = Path::new(&base)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    Node::File(SourceFile {
        id: NodeId::digest(&format!("file:{source}/{rel}")),
        source: source.to_string(),
        base,
        relative_path: rel.to_string(),
        absolute_path,
        extension,
    })
}

/// A record node parented to `parent`. The id is derived from the parent and
/// the data, so distinct data yields distinct records.
pub fn record_node(parent: &NodeId, data: Value) -> Node {
    Node::Yaml(ContentRecord {
        id: NodeId::digest(&format!("yaml:{parent}:{data}")),
        parent: parent.clone(),
        data: data.as_object().cloned().unwrap_or_default(),
        fields: None,
    })
}
