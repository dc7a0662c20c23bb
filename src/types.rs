//! Shared types handed from the readers to the index and out to callers.
//!
//! Everything here is plain data that serializes to JSON, so the presentation
//! layer never needs to know how a record was discovered.

use crate::frontmatter::Frontmatter;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Which renderer a record needs.
///
/// Dynamic documents live in per-post directories and go through the
/// component pipeline; static documents are plain markdown rendered to HTML
/// ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Dynamic,
    Static,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Dynamic => f.write_str("dynamic"),
            SourceKind::Static => f.write_str("static"),
        }
    }
}

/// One post as known to the index.
///
/// Records are built once during a scan and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct PostRecord {
    /// Canonical routing key, always `<url_prefix>/...` (e.g. `blog/2023/2/wasm`).
    pub slug: String,
    /// Backing document, relative to the site root.
    pub source_path: PathBuf,
    pub source_kind: SourceKind,
    pub frontmatter: Frontmatter,
    /// Body text, only kept when the scan was asked to include it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

impl PostRecord {
    pub fn is_published(&self) -> bool {
        self.frontmatter.published
    }

    pub fn is_dynamic(&self) -> bool {
        self.source_kind == SourceKind::Dynamic
    }
}

/// A top-level content category with a `metadata.json` descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct SubBlog {
    /// Directory name, used as the category segment in slugs.
    pub slug: String,
    pub path: PathBuf,
    pub title: String,
    pub description: String,
}
