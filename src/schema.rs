//! Content schema and field extensions.
//!
//! Records are untyped YAML, but a few fields carry meaning beyond their raw
//! value. The schema declares those fields and attaches a named *field
//! extension* that knows how to resolve them. The site schema is:
//!
//! ```graphql
//! type YamlMeta @infer {
//!   Image: File @fileBySrcPath
//! }
//!
//! type Yaml implements Node @infer {
//!   Meta: YamlMeta
//! }
//! ```
//!
//! `@infer` means every other key is kept as-is. Only `Meta.Image` is
//! resolved: its string value is a path relative to the data directory,
//! and [`FileBySrcPath`] turns it into the matching [`SourceFile`] node.
//!
//! ## Soft misses
//!
//! Resolution never fails. An absent, empty, or non-string value, or a path
//! with no matching file, resolves to `None`.

use crate::paths;
use crate::repository::{FileFilter, NodeRepository};
use crate::types::{ContentRecord, SourceFile};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FILE_BY_SRC_PATH: &str = "fileBySrcPath";

/// Type name records are checked against.
pub const RECORD_TYPE: &str = "Yaml";

/// Type of a record's `Meta` object, which holds the `Image` asset field.
pub const META_TYPE: &str = "YamlMeta";
pub const IMAGE_FIELD: &str = "Image";

const BUILTIN_TYPES: &[&str] = &["String", "Int", "Float", "Boolean", "ID", "JSON", "Date", "File"];

#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    #[error("Field {type_name}.{field} uses unregistered extension @{extension}")]
    UnknownExtension {
        type_name: String,
        field: String,
        extension: String,
    },
    #[error("Field {type_name}.{field} has unknown type {ty}")]
    UnknownType {
        type_name: String,
        field: String,
        ty: String,
    },
    #[error("Type {0} is defined more than once")]
    DuplicateType(String),
}

/// Resolves one field of a record object to a file node.
pub trait FieldResolver: Send + Sync {
    /// `source` is the object that owns the field (e.g. the record's `Meta`).
    fn resolve<'r>(
        &self,
        source: &Map<String, Value>,
        field_name: &str,
        repo: &'r dyn NodeRepository,
    ) -> Option<&'r SourceFile>;
}

/// Resolves a path relative to the data directory to the file at that path.
#[derive(Debug, Clone)]
pub struct FileBySrcPath {
    /// Absolute, normalized data directory
    pub data_dir: PathBuf,
}

impl FileBySrcPath {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Absolute lookup key for a partial path.
    pub fn lookup_path(&self, partial: &str) -> PathBuf {
        paths::join_under(&self.data_dir, partial)
    }
}

impl FieldResolver for FileBySrcPath {
    fn resolve<'r>(
        &self,
        source: &Map<String, Value>,
        field_name: &str,
        repo: &'r dyn NodeRepository,
    ) -> Option<&'r SourceFile> {
        let partial = source.get(field_name)?.as_str()?;
        if partial.trim().is_empty() {
            return None;
        }
        let file_path = self.lookup_path(partial);
        repo.find_one(&FileFilter::absolute_path(file_path))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: String,
    /// Name of the field extension that resolves this field, if any
    pub extension: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub interfaces: Vec<String>,
    /// Keep undeclared keys as-is
    pub infer: bool,
    pub fields: Vec<FieldDef>,
}

impl TypeDef {
    fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One extension-bearing field found on a record.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAsset {
    /// Dotted path from the record root, e.g. `Meta.Image`
    pub field_path: String,
    /// Raw value as written in the record
    pub requested: String,
    pub file: Option<SourceFile>,
}

pub struct Schema {
    extensions: BTreeMap<String, Box<dyn FieldResolver>>,
    types: Vec<TypeDef>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .field("types", &self.types)
            .finish()
    }
}

impl Schema {
    pub fn new() -> Self {
        Self {
            extensions: BTreeMap::new(),
            types: Vec::new(),
        }
    }

    /// The site schema: `fileBySrcPath` plus the `YamlMeta` and `Yaml` types.
    pub fn site(data_dir: &Path) -> Self {
        let mut schema = Self::new();
        schema.create_field_extension(FILE_BY_SRC_PATH, FileBySrcPath::new(data_dir));
        schema.create_types(vec![
            TypeDef {
                name: META_TYPE.into(),
                interfaces: vec![],
                infer: true,
                fields: vec![FieldDef {
                    name: IMAGE_FIELD.into(),
                    ty: "File".into(),
                    extension: Some(FILE_BY_SRC_PATH.into()),
                }],
            },
            TypeDef {
                name: RECORD_TYPE.into(),
                interfaces: vec!["Node".into()],
                infer: true,
                fields: vec![FieldDef {
                    name: "Meta".into(),
                    ty: META_TYPE.into(),
                    extension: None,
                }],
            },
        ]);
        schema
    }

    pub fn create_field_extension(&mut self, name: &str, resolver: impl FieldResolver + 'static) {
        self.extensions.insert(name.to_string(), Box::new(resolver));
    }

    pub fn create_types(&mut self, types: Vec<TypeDef>) {
        self.types.extend(types);
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn extension(&self, name: &str) -> Option<&dyn FieldResolver> {
        self.extensions.get(name).map(|b| &**b)
    }

    /// Check every field type and extension reference.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut names = std::collections::HashSet::new();
        for ty in &self.types {
            if !names.insert(ty.name.as_str()) {
                return Err(SchemaError::DuplicateType(ty.name.clone()));
            }
        }
        for ty in &self.types {
            for field in &ty.fields {
                if !BUILTIN_TYPES.contains(&field.ty.as_str()) && !names.contains(field.ty.as_str()) {
                    return Err(SchemaError::UnknownType {
                        type_name: ty.name.clone(),
                        field: field.name.clone(),
                        ty: field.ty.clone(),
                    });
                }
                if let Some(ext) = &field.extension
                    && !self.extensions.contains_key(ext)
                {
                    return Err(SchemaError::UnknownExtension {
                        type_name: ty.name.clone(),
                        field: field.name.clone(),
                        extension: ext.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Render the type definitions in schema-definition syntax.
    pub fn to_sdl(&self) -> String {
        let mut out = String::new();
        for (i, ty) in self.types.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = write!(out, "type {}", ty.name);
            if !ty.interfaces.is_empty() {
                let _ = write!(out, " implements {}", ty.interfaces.join(" & "));
            }
            if ty.infer {
                out.push_str(" @infer");
            }
            out.push_str(" {\n");
            for field in &ty.fields {
                let _ = write!(out, "  {}: {}", field.name, field.ty);
                if let Some(ext) = &field.extension {
                    let _ = write!(out, " @{ext}");
                }
                out.push('\n');
            }
            out.push_str("}\n");
        }
        out
    }

    /// Resolve one field of `source` typed as `type_name`.
    ///
    /// `None` when the field has no extension, the extension is not
    /// registered, or the extension finds nothing.
    pub fn resolve_field<'r>(
        &self,
        type_name: &str,
        source: &Map<String, Value>,
        field_name: &str,
        repo: &'r dyn NodeRepository,
    ) -> Option<&'r SourceFile> {
        let field = self.type_def(type_name)?.field(field_name)?;
        let resolver = self.extension(field.extension.as_deref()?)?;
        resolver.resolve(source, field_name, repo)
    }

    /// Every extension-bearing field present on `record`, with its resolution.
    pub fn resolve_assets(&self, record: &ContentRecord, repo: &dyn NodeRepository) -> Vec<ResolvedAsset> {
        let mut out = Vec::new();
        self.collect_assets(RECORD_TYPE, &record.data, "", repo, &mut out, 0);
        out
    }

    fn collect_assets(
        &self,
        type_name: &str,
        source: &Map<String, Value>,
        prefix: &str,
        repo: &dyn NodeRepository,
        out: &mut Vec<ResolvedAsset>,
        depth: usize,
    ) {
        // type graphs are small; the cap only guards self-referencing definitions
        if depth > 16 {
            return;
        }
        let Some(ty) = self.type_def(type_name) else {
            return;
        };
        for field in &ty.fields {
            let Some(value) = source.get(&field.name) else {
                continue;
            };
            let path = if prefix.is_empty() {
                field.name.clone()
            } else {
                format!("{prefix}.{}", field.name)
            };

            if let Some(ext) = &field.extension {
                let Some(requested) = value.as_str() else {
                    continue;
                };
                let file = self
                    .extension(ext)
                    .and_then(|r| r.resolve(source, &field.name, repo))
                    .cloned();
                out.push(ResolvedAsset {
                    field_path: path,
                    requested: requested.to_string(),
                    file,
                });
            } else if let Some(nested) = value.as_object() {
                self.collect_assets(&field.ty, nested, &path, repo, out, depth + 1);
            }
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}
