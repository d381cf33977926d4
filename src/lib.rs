//! # yaml-pages
//!
//! A minimal content pipeline for static sites. YAML data files are the
//! content source: every `index.yaml` that declares a document kind becomes
//! a page at the route its directory implies, bound to that kind's template.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Scan   content/ + data/  →  nodes.json   (ingest files, annotate records)
//! 2. Pages  nodes.json        →  pages.json   (one route per annotated record)
//! ```
//!
//! Stage 1 runs the three steps that need the content graph, in order:
//! ingestion fills a node store, the schema knows how to resolve asset
//! references (`Meta.Image` via `fileBySrcPath`), and the annotator attaches
//! `{ url, layout }` to every record that will become a page. Stage 2 only
//! reads those derived fields.
//!
//! Both stages see the graph through [`repository::NodeRepository`]
//! (`find_by_id`, `find_one`, `query_all`), so each step can be tested
//! against an in-memory store or a deliberately failing one.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ingest`] | Walks source directories into `SourceFile` and `ContentRecord` nodes |
//! | [`schema`] | Type definitions and the `fileBySrcPath` field extension |
//! | [`annotate`] | Computes `DerivedFields { url, layout }` for index records |
//! | [`pages`] | Emits one `Page` per annotated record, enforces route policy |
//! | [`pipeline`] | `Project` loading and stage orchestration |
//! | [`repository`] | `NodeRepository` trait and the in-memory `NodeStore` |
//! | [`templates`] | Document kind → template path registry |
//! | [`config`] | `config.toml` loading, merging, and validation |
//! | [`paths`] | URL derivation and lexical path normalization |
//! | [`types`] | Node, record, and page types shared between stages |
//! | [`output`] | CLI output formatting |
//!
//! # Conventions
//!
//! - A record's kind is declared by a top-level key: `BlogPost: {...}`.
//! - `content/posts/hi/index.yaml` → `/posts/hi/`.
//! - Layout `BlogPost` → `src/templates/BlogPost.js`.
//!
//! Each convention is configurable and validated at startup; see [`config`].

pub mod annotate;
pub mod config;
pub mod ingest;
pub mod output;
pub mod pages;
pub mod paths;
pub mod pipeline;
pub mod repository;
pub mod schema;
pub mod templates;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
