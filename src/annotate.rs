//! Node annotation: decides which records become pages.
//!
//! For each record the annotator computes [`DerivedFields`], or explains why
//! it didn't. The fields hold the record's canonical `url` and the `layout`
//! it renders with. A record is annotated only when:
//!
//! 1. its parent file is named exactly like the configured index file
//!    (`index.yaml` by default), and
//! 2. it carries a top-level key naming an enabled [`DocumentKind`].
//!
//! Everything else is a normal "not a page" outcome, never an error.
//!
//! [`annotate`] is pure. [`annotate_all`] computes every record's outcome in
//! parallel (outcomes depend only on the record and its parent file), then
//! attaches fields in a single sequential pass.

use crate::paths;
use crate::repository::{AttachError, NodeRepository, NodeStore};
use crate::types::{DerivedFields, DocumentKind, Node, NodeId};
use rayon::prelude::*;

/// Inputs the annotator needs besides the node itself.
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub index_file: String,
    /// Enabled kinds in priority order
    pub kinds: Vec<DocumentKind>,
    pub trailing_slash: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            index_file: "index.yaml".to_string(),
            kinds: DocumentKind::ALL.to_vec(),
            trailing_slash: true,
        }
    }
}

/// Outcome of annotating one node.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// The node is a file, not a structured-data record.
    NotARecord,
    /// The record's parent file is missing from the store.
    Orphan,
    /// The parent file is not an index file.
    NotIndex,
    /// No enabled document kind among the record's keys.
    NoLayout,
    Annotated(DerivedFields),
}

/// Compute derived fields for one node.
pub fn annotate(node: &Node, repo: &dyn NodeRepository, options: &AnnotateOptions) -> Annotation {
    let Node::Yaml(record) = node else {
        return Annotation::NotARecord;
    };
    let Some(parent) = repo.find_by_id(&record.parent).and_then(Node::as_file) else {
        return Annotation::Orphan;
    };
    if parent.base != options.index_file {
        return Annotation::NotIndex;
    }

    let url = paths::file_path_url(&parent.relative_path, options.trailing_slash);
    match record.layout(&options.kinds) {
        Some(layout) => Annotation::Annotated(DerivedFields { url, layout }),
        None => Annotation::NoLayout,
    }
}

/// Counts of annotation outcomes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotateSummary {
    pub annotated: usize,
    pub not_index: usize,
    pub no_layout: usize,
    pub orphans: usize,
}

impl AnnotateSummary {
    pub fn skipped(&self) -> usize {
        self.not_index + self.no_layout + self.orphans
    }
}

/// Annotate every record in the store.
///
/// Re-running on an already annotated store is a no-op: outcomes are a pure
/// function of each record and its parent path.
pub fn annotate_all(store: &mut NodeStore, options: &AnnotateOptions) -> Result<AnnotateSummary, AttachError> {
    let outcomes: Vec<(NodeId, Annotation)> = {
        let repo: &NodeStore = store;
        repo.nodes()
            .par_iter()
            .filter(|node| matches!(node, Node::Yaml(_)))
            .map(|node| (node.id().clone(), annotate(node, repo, options)))
            .collect()
    };

    let mut summary = AnnotateSummary::default();
    for (id, outcome) in outcomes {
        match outcome {
            Annotation::Annotated(fields) => {
                tracing::debug!(id = %id.short(), url = %fields.url, layout = %fields.layout, "Annotated record");
                store.attach_fields(&id, fields)?;
                summary.annotated += 1;
            }
            Annotation::NotIndex => summary.not_index += 1,
            Annotation::NoLayout => {
                tracing::debug!(id = %id.short(), "Index record has no known layout, not a page");
                summary.no_layout += 1;
            }
            Annotation::Orphan => {
                tracing::warn!(id = %id.short(), "Record parent not found, skipping");
                summary.orphans += 1;
            }
            Annotation::NotARecord => {}
        }
    }

    tracing::info!(
        annotated = summary.annotated,
        skipped = summary.skipped(),
        "Annotation completed"
    );
    Ok(summary)
}
