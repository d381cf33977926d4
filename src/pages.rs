//! Page building.
//!
//! Final stage of the pipeline. Queries every record once and emits one
//! [`Page`] per record that carries derived fields:
//!
//! ```text
//! record.fields { url: "/posts/hi/", layout: BlogPost }
//!   → Page { path: "/posts/hi/",
//!            component: "src/templates/BlogPost.js",
//!            context: { url: "/posts/hi/" } }
//! ```
//!
//! Records without fields are skipped silently. A failed query aborts the
//! stage with no pages.
//!
//! ## Route collisions
//!
//! Two records can compute the same URL (e.g. `posts/hi/index.yaml` holding a
//! two-element sequence). [`CollisionPolicy::Error`] rejects the build;
//! [`CollisionPolicy::LastWins`] keeps the later record's page at the
//! earlier page's position and logs a warning.
//!
//! ## Output
//!
//! ```text
//! public/
//! └── pages.json     # [{ "path", "component", "context": { "url" } }, ...]
//! ```

use crate::config::CollisionPolicy;
use crate::repository::{NodeRepository, QueryError};
use crate::templates::TemplateRegistry;
use crate::types::{DocumentKind, NodeId, Page, PageContext};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PAGES_MANIFEST: &str = "pages.json";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Query failed, no pages generated: {0}")]
    Query(#[from] QueryError),
    #[error("Route {route} is produced by both {first} and {second}")]
    RouteCollision {
        route: String,
        first: NodeId,
        second: NodeId,
    },
    #[error("Record {id} uses layout {layout}, which has no enabled template")]
    UnregisteredLayout { id: NodeId, layout: DocumentKind },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build one page per annotated record.
pub fn build_pages(
    repo: &dyn NodeRepository,
    templates: &TemplateRegistry,
    policy: CollisionPolicy,
) -> Result<Vec<Page>, BuildError> {
    let rows = repo.query_all()?;

    let mut pages: Vec<Page> = Vec::new();
    // route → (position in `pages`, record that produced it)
    let mut routes: HashMap<String, (usize, NodeId)> = HashMap::new();

    for row in rows {
        let Some(fields) = row.fields else {
            continue;
        };
        let component = templates
            .component_for(fields.layout)
            .ok_or_else(|| BuildError::UnregisteredLayout {
                id: row.id.clone(),
                layout: fields.layout,
            })?;

        let page = Page {
            path: fields.url.clone(),
            component: component.to_string(),
            context: PageContext { url: fields.url },
        };

        match routes.get_mut(&page.path) {
            Some((pos, owner)) => match policy {
                CollisionPolicy::Error => {
                    return Err(BuildError::RouteCollision {
                        route: page.path,
                        first: owner.clone(),
                        second: row.id,
                    });
                }
                CollisionPolicy::LastWins => {
                    tracing::warn!(
                        route = %page.path,
                        replaced = %owner.short(),
                        by = %row.id.short(),
                        "Route collision: later record replaces earlier page"
                    );
                    *owner = row.id;
                    pages[*pos] = page;
                }
            },
            None => {
                routes.insert(page.path.clone(), (pages.len(), row.id));
                pages.push(page);
            }
        }
    }

    tracing::info!(pages = pages.len(), "Page build completed");
    Ok(pages)
}

/// Write `pages.json` into `output_dir`, returning its path.
pub fn write_manifest(pages: &[Page], output_dir: &Path) -> Result<PathBuf, BuildError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(PAGES_MANIFEST);
    let json = serde_json::to_string_pretty(pages)?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Remove the `pages.json` in `output_dir`, if any.
pub fn remove_manifest(output_dir: &Path) -> Result<(), BuildError> {
    match fs::remove_file(output_dir.join(PAGES_MANIFEST)) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Read a `pages.json` written by [`write_manifest`].
pub fn read_manifest(path: &Path) -> Result<Vec<Page>, BuildError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplatesConfig;
    use crate::repository::{FileFilter, NodeStore, RecordRow};
    use crate::test_helpers::{file_node, record_node};
    use crate::types::{DerivedFields, Node, SourceFile};
    use serde_json::json;
    use tempfile::TempDir;

    fn registry() -> TemplateRegistry {
        TemplateRegistry::from_config(&TemplatesConfig::default()).unwrap()
    }

    fn fields(url: &str) -> DerivedFields {
        DerivedFields {
            url: url.to_string(),
            layout: DocumentKind::BlogPost,
        }
    }

    /// Store with one record per entry; `Some(url)` entries are annotated.
    fn store_with(urls: &[Option<&str>]) -> (NodeStore, Vec<NodeId>) {
        let mut store = NodeStore::new();
        let parent = file_node("content", "index.yaml");
        let parent_id = parent.id().clone();
        store.insert(parent);
        let mut ids = Vec::new();
        for (i, url) in urls.iter().enumerate() {
            let record = record_node(&parent_id, json!({"BlogPost": {"n": i}}));
            let id = record.id().clone();
            store.insert(record);
            if let Some(url) = url {
                store.attach_fields(&id, fields(url)).unwrap();
            }
            ids.push(id);
        }
        (store, ids)
    }

    struct FailingRepo;

    impl NodeRepository for FailingRepo {
        fn find_by_id(&self, _id: &NodeId) -> Option<&Node> {
            None
        }

        fn find_one(&self, _filter: &FileFilter) -> Option<&SourceFile> {
            None
        }

        fn query_all(&self) -> Result<Vec<RecordRow>, QueryError> {
            Err(QueryError::Unavailable("connection reset".into()))
        }
    }

    #[test]
    fn one_page_per_annotated_record() {
        let (store, _) = store_with(&[Some("/posts/hi/"), None, Some("/posts/bye/")]);
        let pages = build_pages(&store, &registry(), CollisionPolicy::Error).unwrap();

        assert_eq!(
            pages,
            vec![
                Page {
                    path: "/posts/hi/".into(),
                    component: "src/templates/BlogPost.js".into(),
                    context: PageContext {
                        url: "/posts/hi/".into()
                    },
                },
                Page {
                    path: "/posts/bye/".into(),
                    component: "src/templates/BlogPost.js".into(),
                    context: PageContext {
                        url: "/posts/bye/".into()
                    },
                },
            ]
        );
    }

    #[test]
    fn no_annotated_records_no_pages() {
        let (store, _) = store_with(&[None, None]);
        let pages = build_pages(&store, &registry(), CollisionPolicy::Error).unwrap();
        assert!(pages.is_empty());
    }

    #[test]
    fn query_failure_aborts() {
        let result = build_pages(&FailingRepo, &registry(), CollisionPolicy::Error);
        assert!(matches!(result, Err(BuildError::Query(_))));
    }

    #[test]
    fn collision_rejected_by_default_policy() {
        let (store, ids) = store_with(&[Some("/same/"), Some("/same/")]);
        let err = build_pages(&store, &registry(), CollisionPolicy::Error).unwrap_err();
        match err {
            BuildError::RouteCollision {
                route,
                first,
                second,
            } => {
                assert_eq!(route, "/same/");
                assert_eq!(first, ids[0]);
                assert_eq!(second, ids[1]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn collision_last_wins_keeps_position() {
        let (store, _) = store_with(&[Some("/same/"), Some("/other/"), Some("/same/")]);
        let pages = build_pages(&store, &registry(), CollisionPolicy::LastWins).unwrap();
        let paths: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["/same/", "/other/"]);
    }

    #[test]
    fn unregistered_layout_is_error() {
        let (store, _) = store_with(&[Some("/a/")]);
        // A registry built from a config with no kinds can't exist, so an
        // empty one stands in for a layout that was disabled after annotation.
        let empty = TemplateRegistry::empty();
        assert!(matches!(
            build_pages(&store, &empty, CollisionPolicy::Error),
            Err(BuildError::UnregisteredLayout { .. })
        ));
    }

    #[test]
    fn manifest_written_and_read_back() {
        let tmp = TempDir::new().unwrap();
        let (store, _) = store_with(&[Some("/posts/hi/")]);
        let pages = build_pages(&store, &registry(), CollisionPolicy::Error).unwrap();

        let out = tmp.path().join("public");
        let path = write_manifest(&pages, &out).unwrap();
        assert_eq!(path, out.join(PAGES_MANIFEST));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json[0]["path"], "/posts/hi/");
        assert_eq!(json[0]["context"]["url"], "/posts/hi/");

        assert_eq!(read_manifest(&path).unwrap(), pages);
    }

    #[test]
    fn remove_manifest_tolerates_missing_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("public");
        remove_manifest(&out).unwrap();

        let path = write_manifest(&[], &out).unwrap();
        remove_manifest(&out).unwrap();
        assert!(!path.exists());
    }
}
