//! Stage orchestration.
//!
//! A [`Project`] is everything resolved once at startup: the project root,
//! its validated config, the template registry, and the site schema. The
//! CLI drives it through two stages connected by a JSON manifest:
//!
//! ```text
//! 1. Scan    content/ + data/  →  nodes.json   (ingest + annotate)
//! 2. Pages   nodes.json        →  pages.json   (one page per annotated record)
//! ```

use crate::annotate::{self, AnnotateOptions, AnnotateSummary};
use crate::config::{self, ConfigError, SiteConfig};
use crate::ingest::{self, IngestError};
use crate::pages::{self, BuildError};
use crate::paths;
use crate::repository::{AttachError, NodeManifest, NodeRepository, NodeStore};
use crate::schema::{IMAGE_FIELD, META_TYPE, ResolvedAsset, Schema, SchemaError};
use crate::templates::TemplateRegistry;
use crate::types::{Node, Page, SourceFile};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const NODES_MANIFEST: &str = "nodes.json";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),
    #[error("Annotation error: {0}")]
    Attach(#[from] AttachError),
    #[error("Page build error: {0}")]
    Build(#[from] BuildError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct Project {
    /// Absolute project root
    pub root: PathBuf,
    pub config: SiteConfig,
    pub templates: TemplateRegistry,
    pub schema: Schema,
}

/// Result of the scan stage.
#[derive(Debug)]
pub struct ScanResult {
    pub store: NodeStore,
    pub summary: AnnotateSummary,
}

/// An extension-bearing field whose file couldn't be found.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedAsset {
    /// Relative path of the YAML file holding the record
    pub record_path: String,
    pub asset: ResolvedAsset,
}

/// Everything `check` found, without writing anything.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub summary: AnnotateSummary,
    pub pages: usize,
    pub missing_templates: Vec<PathBuf>,
    pub unresolved_assets: Vec<UnresolvedAsset>,
    /// Page build failure (route collision, disabled layout)
    pub build_error: Option<String>,
}

impl CheckReport {
    /// Missing templates and build failures are errors; unresolved assets
    /// only warn.
    pub fn is_ok(&self) -> bool {
        self.missing_templates.is_empty() && self.build_error.is_none()
    }
}

impl Project {
    /// Load and validate config, templates, and schema for `root`.
    pub fn load(root: &Path) -> Result<Self, PipelineError> {
        let root = paths::absolutize(root)?;
        let config = config::load_config(&root)?;
        Self::with_config(root, config)
    }

    pub fn with_config(root: PathBuf, config: SiteConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let templates = TemplateRegistry::from_config(&config.templates)?;
        let schema = Schema::site(&paths::normalize(&root.join(&config.data_dir)));
        schema.validate()?;
        Ok(Self {
            root,
            config,
            templates,
            schema,
        })
    }

    pub fn annotate_options(&self) -> AnnotateOptions {
        AnnotateOptions {
            index_file: self.config.index_file.clone(),
            kinds: self.templates.priority(),
            trailing_slash: self.config.urls.trailing_slash,
        }
    }

    /// Stage 1: ingest every source and annotate the records.
    pub fn scan(&self) -> Result<ScanResult, PipelineError> {
        let mut store = ingest::ingest(&self.root, &self.config)?;
        let summary = annotate::annotate_all(&mut store, &self.annotate_options())?;
        Ok(ScanResult { store, summary })
    }

    /// Stage 2: one page per annotated record.
    pub fn build_pages(&self, repo: &dyn NodeRepository) -> Result<Vec<Page>, PipelineError> {
        Ok(pages::build_pages(
            repo,
            &self.templates,
            self.config.pages.on_route_collision,
        )?)
    }

    /// Stage 2 with output: build pages and write `pages.json` into
    /// `output_dir`. Any existing manifest is removed first, so a failed
    /// build leaves none behind.
    pub fn write_pages(
        &self,
        repo: &dyn NodeRepository,
        output_dir: &Path,
    ) -> Result<(Vec<Page>, PathBuf), PipelineError> {
        pages::remove_manifest(output_dir)?;
        let pages = self.build_pages(repo)?;
        let manifest = pages::write_manifest(&pages, output_dir)?;
        Ok((pages, manifest))
    }

    /// Look up a data-relative asset path through the schema's `Meta.Image`
    /// field extension.
    pub fn resolve_asset<'r>(&self, repo: &'r dyn NodeRepository, partial: &str) -> Option<&'r SourceFile> {
        let mut meta = Map::new();
        meta.insert(IMAGE_FIELD.to_string(), Value::String(partial.to_string()));
        self.schema.resolve_field(META_TYPE, &meta, IMAGE_FIELD, repo)
    }

    /// Run both stages in memory and collect every problem found.
    pub fn check(&self) -> Result<CheckReport, PipelineError> {
        let ScanResult { store, summary } = self.scan()?;

        let mut report = CheckReport {
            summary,
            missing_templates: self.templates.missing_files(&self.root),
            ..CheckReport::default()
        };

        for record in store.records() {
            let record_path = store
                .find_by_id(&record.parent)
                .and_then(Node::as_file)
                .map(|f| format!("{}/{}", f.source, f.relative_path))
                .unwrap_or_default();
            for asset in self.schema.resolve_assets(record, &store) {
                if asset.file.is_none() {
                    report.unresolved_assets.push(UnresolvedAsset {
                        record_path: record_path.clone(),
                        asset,
                    });
                }
            }
        }

        match self.build_pages(&store) {
            Ok(pages) => report.pages = pages.len(),
            Err(e) => report.build_error = Some(e.to_string()),
        }

        Ok(report)
    }
}

/// Write the scan-stage node store to `<temp_dir>/nodes.json`.
pub fn write_nodes(store: &NodeStore, temp_dir: &Path) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(temp_dir)?;
    let path = temp_dir.join(NODES_MANIFEST);
    let json = serde_json::to_string_pretty(&store.to_manifest())?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Read the node store written by [`write_nodes`].
pub fn read_nodes(temp_dir: &Path) -> Result<NodeStore, PipelineError> {
    let content = fs::read_to_string(temp_dir.join(NODES_MANIFEST))?;
    let manifest: NodeManifest = serde_json::from_str(&content)?;
    Ok(manifest.into())
}
