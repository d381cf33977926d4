//! Document kind → template registry.
//!
//! Built once from [`TemplatesConfig`] at startup. Every enabled kind maps to
//! `<dir>/<Kind>.<extension>`; kinds not listed in the config have no
//! template and records of that kind are never annotated.

use crate::config::{ConfigError, TemplatesConfig};
use crate::types::DocumentKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    /// Enabled kinds in priority order, each with its component path.
    entries: Vec<(DocumentKind, String)>,
}

impl TemplateRegistry {
    pub fn from_config(config: &TemplatesConfig) -> Result<Self, ConfigError> {
        let dir = config.dir.trim_end_matches('/');
        let entries = config
            .document_kinds()?
            .into_iter()
            .map(|kind| {
                let component = format!("{}/{}.{}", dir, kind.name(), config.extension);
                (kind, component)
            })
            .collect();
        Ok(Self { entries })
    }

    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Enabled kinds in priority order.
    pub fn priority(&self) -> Vec<DocumentKind> {
        self.entries.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn component_for(&self, kind: DocumentKind) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, component)| component.as_str())
    }

    /// Template files that don't exist under `project_root`.
    pub fn missing_files(&self, project_root: &Path) -> Vec<PathBuf> {
        self.entries
            .iter()
            .map(|(_, component)| project_root.join(component))
            .filter(|path| !path.is_file())
            .collect()
    }
}
