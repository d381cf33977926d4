//! Path helpers shared by ingestion, the annotator, and asset resolution.
//!
//! ## Canonical URLs
//!
//! A record's URL is derived from where its file sits in the source tree:
//!
//! - `posts/hi/index.yaml` → `/posts/hi/`
//! - `posts/hello.yaml` → `/posts/hello/`
//! - `index.yaml` → `/`
//!
//! The extension is dropped, an `index` stem is dropped, and the result is
//! rooted with a leading `/`. A trailing `/` is appended unless disabled.
//!
//! ## Lookup keys
//!
//! Asset lookups compare absolute paths as strings, so both sides of the
//! comparison go through [`normalize`]: a purely lexical cleanup that never
//! touches the filesystem (no symlink resolution, no existence checks).

use std::path::{Component, Path, PathBuf};

/// Canonical site path for a file at `relative_path` (POSIX, relative to its
/// source root).
pub fn file_path_url(relative_path: &str, trailing_slash: bool) -> String {
    let mut segments: Vec<&str> = relative_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if let Some(file_name) = segments.pop() {
        let stem = match file_name.rfind('.') {
            Some(0) | None => file_name,
            Some(dot) => &file_name[..dot],
        };
        if stem != "index" {
            segments.push(stem);
        }
    }

    // `..` can't climb above the site root
    let mut resolved: Vec<&str> = Vec::new();
    for seg in segments {
        if seg == ".." {
            resolved.pop();
        } else {
            resolved.push(seg);
        }
    }

    if resolved.is_empty() {
        return "/".to_string();
    }

    let mut url = format!("/{}", resolved.join("/"));
    if trailing_slash {
        url.push('/');
    }
    url
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. `..` at the root is dropped.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Join a user-supplied relative path onto `base`.
///
/// A leading `/` in `partial` is treated as relative to `base` rather than
/// replacing it, matching string-joining semantics.
pub fn join_under(base: &Path, partial: &str) -> PathBuf {
    let trimmed = partial.trim_start_matches(['/', '\\']);
    normalize(&base.join(trimmed))
}

/// Absolute, normalized form of `path`, resolved against the current
/// directory when relative.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    Ok(normalize(&std::path::absolute(path)?))
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_posix(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
