//! Filesystem ingestion.
//!
//! Walks the source directories and fills a [`NodeStore`]:
//!
//! - every file becomes a [`SourceFile`] node, so asset references can be
//!   looked up by absolute path later;
//! - every `.yaml`/`.yml` file is additionally parsed into [`ContentRecord`]
//!   nodes whose `parent` is that file.
//!
//! ## Sources
//!
//! Two sources are ingested, both relative to the project root:
//!
//! | Name | Config key | Required |
//! |------|------------|----------|
//! | `content` | `content_root` | yes |
//! | `data` | `data_dir` | no, skipped when absent |
//!
//! Symlinks are followed. A linked file is recorded at its path inside the
//! source, not at its target.
//!
//! ## YAML shape
//!
//! - A top-level mapping yields one record.
//! - A top-level sequence yields one record per mapping element. Other
//!   elements are skipped with a warning.
//! - Scalars yield nothing (warning). Empty and comment-only files yield
//!   nothing silently.
//! - Syntax errors abort ingestion.
//!
//! Walk order is sorted by file name, so node order (and therefore page
//! order) is stable across runs.

use crate::config::SiteConfig;
use crate::paths;
use crate::repository::NodeStore;
use crate::types::{ContentRecord, Node, NodeId, SourceFile};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source '{name}' not found at {}", path.display())]
    MissingSource { name: String, path: PathBuf },
    #[error("YAML error in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A named directory to ingest.
#[derive(Debug, Clone)]
pub struct SourceDir {
    pub name: String,
    /// Absolute, normalized root
    pub root: PathBuf,
    pub required: bool,
}

impl SourceDir {
    pub fn new(name: &str, root: PathBuf, required: bool) -> Self {
        Self {
            name: name.to_string(),
            root,
            required,
        }
    }
}

/// The configured sources of a project, with absolute roots.
pub fn project_sources(project_root: &Path, config: &SiteConfig) -> std::io::Result<Vec<SourceDir>> {
    let root = paths::absolutize(project_root)?;
    Ok(vec![
        SourceDir::new("content", paths::normalize(&root.join(&config.content_root)), true),
        SourceDir::new("data", paths::normalize(&root.join(&config.data_dir)), false),
    ])
}

/// Ingest every configured source of the project.
pub fn ingest(project_root: &Path, config: &SiteConfig) -> Result<NodeStore, IngestError> {
    let sources = project_sources(project_root, config)?;
    ingest_sources(&sources)
}

pub fn ingest_sources(sources: &[SourceDir]) -> Result<NodeStore, IngestError> {
    let mut store = NodeStore::new();

    for source in sources {
        if !source.root.is_dir() {
            if source.required {
                return Err(IngestError::MissingSource {
                    name: source.name.clone(),
                    path: source.root.clone(),
                });
            }
            tracing::debug!(source = %source.name, path = %source.root.display(), "Optional source absent, skipping");
            continue;
        }
        ingest_source(source, &mut store)?;
    }

    tracing::info!(
        files = store.files().count(),
        records = store.records().count(),
        "Ingest completed"
    );
    Ok(store)
}

fn ingest_source(source: &SourceDir, store: &mut NodeStore) -> Result<(), IngestError> {
    let walker = WalkDir::new(&source.root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file = source_file(source, entry.path());
        let is_yaml = matches!(file.extension.as_str(), "yaml" | "yml");
        let records = if is_yaml {
            let text = fs::read_to_string(entry.path())?;
            parse_records(&text, &file).map_err(|source| IngestError::Yaml {
                path: entry.path().to_path_buf(),
                source,
            })?
        } else {
            Vec::new()
        };

        store.insert(Node::File(file));
        for record in records {
            store.insert(Node::Yaml(record));
        }
    }
    Ok(())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn source_file(source: &SourceDir, path: &Path) -> SourceFile {
    let relative = path.strip_prefix(&source.root).unwrap_or(path);
    let relative_path = paths::to_posix(relative);
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    SourceFile {
        id: NodeId::digest(&format!("file:{}/{}", source.name, relative_path)),
        source: source.name.clone(),
        base,
        relative_path,
        absolute_path: paths::normalize(path),
        extension,
    }
}

/// Parse the text of a YAML file into records parented to `parent`.
pub fn parse_records(text: &str, parent: &SourceFile) -> Result<Vec<ContentRecord>, serde_yaml::Error> {
    if is_blank_yaml(text) {
        return Ok(Vec::new());
    }

    let value: Value = serde_yaml::from_str(text)?;
    let records = match value {
        Value::Object(data) => vec![record(parent, format!("yaml:{}", parent.id), data)],
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Object(data) => {
                    Some(record(parent, format!("yaml:{}[{}]", parent.id, i), data))
                }
                other => {
                    tracing::warn!(
                        path = %parent.relative_path,
                        index = i,
                        kind = value_kind(&other),
                        "Skipping non-mapping YAML sequence element"
                    );
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!(
                path = %parent.relative_path,
                kind = value_kind(&other),
                "Skipping YAML file whose top level is not a mapping or sequence"
            );
            Vec::new()
        }
    };
    Ok(records)
}

fn record(parent: &SourceFile, key: String, data: serde_json::Map<String, Value>) -> ContentRecord {
    ContentRecord {
        id: NodeId::digest(&key),
        parent: parent.id.clone(),
        data,
        fields: None,
    }
}

fn is_blank_yaml(text: &str) -> bool {
    text.lines().all(|line| {
        let t = line.trim();
        t.is_empty() || t.starts_with('#') || t == "---"
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::NodeRepository;
    use crate::test_helpers::{setup_fixtures, write_file};
    use tempfile::TempDir;

    fn parent() -> SourceFile {
        SourceFile {
            id: NodeId::from("parent"),
            source: "content".into(),
            base: "index.yaml".into(),
            relative_path: "posts/hi/index.yaml".into(),
            absolute_path: PathBuf::from("/site/content/posts/hi/index.yaml"),
            extension: "yaml".into(),
        }
    }

    #[test]
    fn mapping_yields_one_record() {
        let records = parse_records("Meta:\n  Title: Hi\nBlogPost:\n  title: Hi\n", &parent()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].parent, NodeId::from("parent"));
        assert!(records[0].data.contains_key("BlogPost"));
        assert_eq!(records[0].data["Meta"]["Title"], "Hi");
    }

    #[test]
    fn sequence_yields_record_per_mapping() {
        let text = "- BlogPost: {title: A}\n- 42\n- BlogPost: {title: B}\n";
        let records = parse_records(text, &parent()).unwrap();
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
        assert_eq!(records[1].data["BlogPost"]["title"], "B");
    }

    #[test]
    fn scalar_and_empty_yield_nothing() {
        assert!(parse_records("just a string\n", &parent()).unwrap().is_empty());
        assert!(parse_records("", &parent()).unwrap().is_empty());
        assert!(parse_records("# only a comment\n\n", &parent()).unwrap().is_empty());
        assert!(parse_records("~\n", &parent()).unwrap().is_empty());
    }

    #[test]
    fn syntax_error_is_reported() {
        assert!(parse_records("BlogPost: [unclosed\n", &parent()).is_err());
    }

    #[test]
    fn record_ids_are_stable() {
        let a = parse_records("BlogPost: {}\n", &parent()).unwrap();
        let b = parse_records("BlogPost: {title: changed}\n", &parent()).unwrap();
        assert_eq!(a[0].id, b[0].id);
    }

    #[test]
    fn ingest_fixture_site() {
        let tmp = setup_fixtures();
        let config = crate::config::load_config(tmp.path()).unwrap();
        let store = ingest(tmp.path(), &config).unwrap();

        let content: Vec<&str> = store
            .files()
            .filter(|f| f.source == "content")
            .map(|f| f.relative_path.as_str())
            .collect();
        assert!(content.contains(&"posts/hi/index.yaml"));
        assert!(content.contains(&"about/meta.yaml"));

        let data: Vec<&str> = store
            .files()
            .filter(|f| f.source == "data")
            .map(|f| f.relative_path.as_str())
            .collect();
        assert!(data.contains(&"images/hi.jpg"));

        // every record's parent resolves to a yaml file
        for record in store.records() {
            let parent = store.find_by_id(&record.parent).and_then(Node::as_file).unwrap();
            assert!(matches!(parent.extension.as_str(), "yaml" | "yml"));
        }
    }

    #[test]
    fn ingest_skips_hidden_entries() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "content/.cache/index.yaml", "BlogPost: {}\n");
        write_file(tmp.path(), "content/.hidden.yaml", "BlogPost: {}\n");
        write_file(tmp.path(), "content/posts/a/index.yaml", "BlogPost: {}\n");

        let store = ingest(tmp.path(), &SiteConfig::default()).unwrap();
        assert_eq!(store.files().count(), 1);
        assert_eq!(store.records().count(), 1);
    }

    #[test]
    fn ingest_orders_by_file_name() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "content/b/index.yaml", "BlogPost: {}\n");
        write_file(tmp.path(), "content/a/index.yaml", "BlogPost: {}\n");

        let store = ingest(tmp.path(), &SiteConfig::default()).unwrap();
        let paths: Vec<&str> = store.files().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a/index.yaml", "b/index.yaml"]);
    }

    #[test]
    fn missing_content_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = ingest(tmp.path(), &SiteConfig::default());
        assert!(matches!(result, Err(IngestError::MissingSource { .. })));
    }

    #[test]
    fn missing_data_dir_is_fine() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "content/index.yaml", "BlogPost: {}\n");
        let store = ingest(tmp.path(), &SiteConfig::default()).unwrap();
        assert!(store.files().all(|f| f.source == "content"));
    }

    #[test]
    fn invalid_yaml_names_the_file() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "content/broken/index.yaml", "BlogPost: [\n");
        let err = ingest(tmp.path(), &SiteConfig::default()).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_ingested_at_link_path() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "shared/hi.jpg", "fake image");
        write_file(tmp.path(), "content/index.yaml", "BlogPost: {}\n");
        fs::create_dir_all(tmp.path().join("data/images")).unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("shared/hi.jpg"),
            tmp.path().join("data/images/hi.jpg"),
        )
        .unwrap();

        let store = ingest(tmp.path(), &SiteConfig::default()).unwrap();
        let data_root = paths::absolutize(&tmp.path().join("data")).unwrap();
        let image = store.file_at(&data_root.join("images/hi.jpg")).unwrap();
        assert_eq!(image.source, "data");
        assert_eq!(image.relative_path, "images/hi.jpg");
    }

    #[test]
    fn absolute_paths_are_under_source_root() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "data/images/a.jpg", "fake image");
        write_file(tmp.path(), "content/index.yaml", "BlogPost: {}\n");

        let store = ingest(tmp.path(), &SiteConfig::default()).unwrap();
        let data_root = paths::absolutize(&tmp.path().join("data")).unwrap();
        let image = store.files().find(|f| f.base == "a.jpg").unwrap();
        assert_eq!(image.absolute_path, data_root.join("images/a.jpg"));
        assert_eq!(image.extension, "jpg");
    }
}
