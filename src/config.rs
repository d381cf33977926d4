//! Project configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives at
//! the project root, next to the content and data directories:
//!
//! ```text
//! site/
//! ├── config.toml              # Optional, overrides stock defaults
//! ├── content/                 # Content root (URLs are relative to it)
//! │   └── posts/hi/index.yaml
//! ├── data/                    # Base directory for asset references
//! │   └── images/hi.jpg
//! └── src/templates/
//!     └── BlogPost.js          # One template per document kind
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_root = "content"  # Directory scanned for YAML records
//! data_dir = "data"         # Base directory for fileBySrcPath lookups
//! index_file = "index.yaml" # Only records from files with this name become pages
//!
//! [urls]
//! trailing_slash = true     # "/posts/hi/" rather than "/posts/hi"
//!
//! [templates]
//! dir = "src/templates"     # Template directory, relative to the project root
//! extension = "js"          # Template file extension
//! kinds = ["BlogPost"]      # Enabled document kinds, in priority order
//!
//! [pages]
//! on_route_collision = "error"  # or "last-wins"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::paths;
use crate::types::DocumentKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory scanned for YAML content records.
    pub content_root: String,
    /// Base directory that asset references (`Meta.Image`) are resolved against.
    pub data_dir: String,
    /// File name that marks a record as a page candidate.
    pub index_file: String,
    /// URL shape settings.
    pub urls: UrlConfig,
    /// Document kind → template mapping.
    pub templates: TemplatesConfig,
    /// Page builder settings.
    pub pages: PagesConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_root: "content".to_string(),
            data_dir: "data".to_string(),
            index_file: "index.yaml".to_string(),
            urls: UrlConfig::default(),
            templates: TemplatesConfig::default(),
            pages: PagesConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("content_root", &self.content_root),
            ("data_dir", &self.data_dir),
            ("index_file", &self.index_file),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        // Overlapping sources would ingest every file twice under two parents
        let content = paths::normalize(Path::new(&self.content_root));
        let data = paths::normalize(Path::new(&self.data_dir));
        if content.starts_with(&data) || data.starts_with(&content) {
            return Err(ConfigError::Validation(format!(
                "data_dir '{}' overlaps content_root '{}'",
                self.data_dir, self.content_root
            )));
        }
        if self.index_file.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "index_file must be a file name, not a path".into(),
            ));
        }
        if self.templates.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "templates.dir must not be empty".into(),
            ));
        }
        if self.templates.extension.is_empty() || self.templates.extension.starts_with('.') {
            return Err(ConfigError::Validation(
                "templates.extension must be non-empty and have no leading dot".into(),
            ));
        }
        self.templates.document_kinds()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlConfig {
    /// Append `/` to every non-root URL.
    pub trailing_slash: bool,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            trailing_slash: true,
        }
    }
}

/// Template settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Directory holding one template per document kind.
    pub dir: String,
    /// Template file extension, without the dot.
    pub extension: String,
    /// Enabled document kinds, in priority order. The first kind found on a
    /// record decides its layout.
    pub kinds: Vec<String>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: "src/templates".to_string(),
            extension: "js".to_string(),
            kinds: DocumentKind::ALL.iter().map(|k| k.name().to_string()).collect(),
        }
    }
}

impl TemplatesConfig {
    /// Parse `kinds` into known document kinds, rejecting unknown names,
    /// duplicates, and an empty list.
    pub fn document_kinds(&self) -> Result<Vec<DocumentKind>, ConfigError> {
        if self.kinds.is_empty() {
            return Err(ConfigError::Validation(
                "templates.kinds must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        let mut kinds = Vec::with_capacity(self.kinds.len());
        for name in &self.kinds {
            let kind: DocumentKind = name
                .parse()
                .map_err(|e| ConfigError::Validation(format!("templates.kinds: {e}")))?;
            if !seen.insert(kind) {
                return Err(ConfigError::Validation(format!(
                    "templates.kinds lists '{name}' more than once"
                )));
            }
            kinds.push(kind);
        }
        Ok(kinds)
    }
}

/// What the page builder does when two records compute the same route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Abort the build.
    #[default]
    Error,
    /// The later record replaces the earlier page.
    LastWins,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagesConfig {
    pub on_route_collision: CollisionPolicy,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from `root` as a raw TOML value, `Ok(None)` if absent.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the project root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let config = resolve_config(stock_defaults_value(), load_raw_config(root)?)?;
    tracing::debug!(root = %root.display(), ?config, "Loaded config");
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# yaml-pages configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory scanned for YAML content records. Page URLs are derived from
# each file's location relative to this directory.
content_root = "content"

# Base directory for asset references. A record's `Meta.Image: images/a.jpg`
# resolves to the file at <data_dir>/images/a.jpg.
data_dir = "data"

# Only records parsed from files with this exact name become pages.
index_file = "index.yaml"

# ---------------------------------------------------------------------------
# URLs
# ---------------------------------------------------------------------------
[urls]
# "/posts/hi/" (true) or "/posts/hi" (false). The root is always "/".
trailing_slash = true

# ---------------------------------------------------------------------------
# Templates
# ---------------------------------------------------------------------------
[templates]
# Each page is bound to <dir>/<Kind>.<extension>.
dir = "src/templates"
extension = "js"

# Enabled document kinds, in priority order. A record declares its kind by
# carrying a top-level key of the same name; when it carries several, the
# first one listed here wins.
kinds = ["BlogPost"]

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
[pages]
# What to do when two records compute the same URL:
#   "error"     - abort the build
#   "last-wins" - the later record replaces the earlier page
on_route_collision = "error"
"##
}
