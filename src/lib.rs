//! # postindex
//!
//! Content discovery, slug derivation and navigation for a personal blog.
//! The filesystem is the data source: posts are markdown documents with a
//! YAML header, and their location on disk plus their declared date decide
//! their URL.
//!
//! # Pipeline
//!
//! ```text
//! 1. Read      content/ + static-content/  →  PostRecords   (parse, validate, slug)
//! 2. Merge     PostRecords                 →  ContentIndex  (filter, dedupe, sort)
//! 3. Query     ContentIndex                →  pages          (lookup, prev/next, series)
//! ```
//!
//! Reading and merging happen once per build. The index is immutable after
//! that and every query borrows from it, so the presentation layer can share
//! one index across threads.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading over stock defaults, validation, production flag |
//! | [`frontmatter`] | Header/body splitting and schema-driven validation into [`frontmatter::Frontmatter`] |
//! | [`slug`] | Path + date → slug rules (current and legacy dialects), images directories, URLs |
//! | [`assets`] | Hero image paths, body link rewriting, the per-build [`assets::AssetMap`] |
//! | [`scan`] | Dynamic and static readers, sub-blog discovery |
//! | [`render`] | Markdown → HTML for static posts |
//! | [`index`] | [`index::ContentIndex`]: merge, lookups, navigation, tags, series, pages |
//! | [`types`] | Records shared between readers, index and callers |
//! | [`output`] | CLI report formatting |
//! | [`logging`] | `tracing` subscriber for the CLI |
//!
//! # Design Decisions
//!
//! ## One Validator
//!
//! Headers are checked against a declared schema (`frontmatter.schema.json`,
//! bundled into the binary) and only then deserialized. Every broken field is
//! reported in one [`frontmatter::ValidationError`], and an invalid document
//! stops the build rather than disappearing from the site.
//!
//! ## Source Kind Is Data
//!
//! Each record carries a [`types::SourceKind`]. Callers match on it to pick a
//! renderer; nothing inspects a record's shape to guess where it came from.
//!
//! ## Build-Scoped Asset Map
//!
//! Image references found while rewriting bodies go into an
//! [`assets::AssetMap`] owned by the build, with a SHA-256 of each source
//! image. The image optimizer reads it from the `index.json` manifest.
//!
//! ## Not Found Is Not An Error
//!
//! Lookups return `Option`. Fetches that touch the disk return
//! `Result<Option<_>, _>`, so a stale URL and an unreadable file stay distinct.

pub mod assets;
pub mod config;
pub mod frontmatter;
pub mod index;
pub mod logging;
pub mod output;
pub mod render;
pub mod scan;
pub mod slug;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
