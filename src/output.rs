//! CLI output formatting for all pipeline stages.
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Sources
//!     content: 3 files
//!     data: 1 file
//!
//! Records
//! 001 posts/hi/index.yaml → /posts/hi/ (BlogPost)
//! 002 posts/draft/index.yaml
//! 003 about/meta.yaml
//!
//! Annotated 1 of 3 records
//! ```
//!
//! ## Pages
//!
//! ```text
//! 001 /posts/hi/ → src/templates/BlogPost.js
//!
//! Generated 1 page
//! ```

use crate::annotate::AnnotateSummary;
use crate::pipeline::CheckReport;
use crate::repository::{NodeRepository, NodeStore};
use crate::types::{Node, Page, SourceFile};
use std::collections::BTreeMap;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Stage 1: Scan output
// ============================================================================

/// Format scan stage output: file counts per source, then every record with
/// its route when annotated.
pub fn format_scan_output(store: &NodeStore, summary: &AnnotateSummary) -> Vec<String> {
    let mut lines = vec!["Sources".to_string()];

    let mut per_source: BTreeMap<&str, usize> = BTreeMap::new();
    for file in store.files() {
        *per_source.entry(file.source.as_str()).or_default() += 1;
    }
    for (source, count) in &per_source {
        lines.push(format!("    {}: {}", source, plural(*count, "file", "files")));
    }

    let records: Vec<_> = store.records().collect();
    if !records.is_empty() {
        lines.push(String::new());
        lines.push("Records".to_string());
        for (i, record) in records.iter().enumerate() {
            let source = store
                .find_by_id(&record.parent)
                .and_then(Node::as_file)
                .map(|f| f.relative_path.as_str())
                .unwrap_or("?");
            match &record.fields {
                Some(fields) => lines.push(format!(
                    "{} {} → {} ({})",
                    format_index(i + 1),
                    source,
                    fields.url,
                    fields.layout
                )),
                None => lines.push(format!("{} {}", format_index(i + 1), source)),
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Annotated {} of {}",
        summary.annotated,
        plural(records.len(), "record", "records")
    ));
    lines
}

pub fn print_scan_output(store: &NodeStore, summary: &AnnotateSummary) {
    for line in format_scan_output(store, summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Pages output
// ============================================================================

/// Format page stage output: one line per route.
pub fn format_pages_output(pages: &[Page]) -> Vec<String> {
    let mut lines: Vec<String> = pages
        .iter()
        .enumerate()
        .map(|(i, page)| format!("{} {} → {}", format_index(i + 1), page.path, page.component))
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!("Generated {}", plural(pages.len(), "page", "pages")));
    lines
}

pub fn print_pages_output(pages: &[Page]) {
    for line in format_pages_output(pages) {
        println!("{}", line);
    }
}

// ============================================================================
// Check and resolve
// ============================================================================

pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Records: {} annotated, {} skipped",
        report.summary.annotated,
        report.summary.skipped()
    )];

    for path in &report.missing_templates {
        lines.push(format!("    error: template not found: {}", path.display()));
    }
    if let Some(err) = &report.build_error {
        lines.push(format!("    error: {}", err));
    }
    for unresolved in &report.unresolved_assets {
        lines.push(format!(
            "    warning: {} {} = {:?} matches no file",
            unresolved.record_path, unresolved.asset.field_path, unresolved.asset.requested
        ));
    }

    if report.is_ok() {
        lines.push(format!(
            "Content is valid ({})",
            plural(report.pages, "page", "pages")
        ));
    } else {
        lines.push("Content has errors".to_string());
    }
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

pub fn format_asset_lookup(requested: &str, file: Option<&SourceFile>) -> String {
    match file {
        Some(f) => format!("{} → {}", requested, f.absolute_path.display()),
        None => format!("{} → (no match)", requested),
    }
}
