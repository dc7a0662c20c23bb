//! Content discovery.
//!
//! Two readers share one output contract and differ only in how they find
//! documents and what they filter:
//!
//! ```text
//! site/
//! ├── config.toml
//! ├── content/                         # dynamic root, walked recursively
//! │   ├── software/
//! │   │   ├── metadata.json            # sub-blog descriptor (optional)
//! │   │   └── 2023/
//! │   │       └── 1_node_golang_wasm/
//! │   │           ├── index.mdx        # body file (.md or .mdx)
//! │   │           └── hero.png
//! │   └── ...
//! └── static-content/                  # static root, .md only
//!     └── mypost.md
//! ```
//!
//! - [`read_dynamic`] drops unpublished documents on the spot; they never
//!   reach the index, not even in development builds.
//! - [`read_static`] keeps every document, drafts included, because tooling
//!   lists all static paths. Filtering happens in the index.
//!
//! Neither reader sorts its output. A missing content root yields an empty
//! list; any unreadable file or invalid header aborts the whole pass.

use crate::assets::{AssetMap, AssetRef, rewrite_body};
use crate::config::SiteConfig;
use crate::frontmatter::{self, FrontmatterError, ParseOptions};
use crate::slug::{SlugRules, to_slash_path};
use crate::types::{PostRecord, SourceKind, SubBlog};
use rayon::prelude::*;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const DYNAMIC_EXTENSIONS: &[&str] = &["md", "mdx"];
const STATIC_EXTENSIONS: &[&str] = &["md"];
const SUB_BLOG_DESCRIPTOR: &str = "metadata.json";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),
    #[error("Content root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
    #[error("Invalid metadata.json at {}: {source}", .path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ScanError {
    /// True when the failure is a frontmatter validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, ScanError::Frontmatter(FrontmatterError::Invalid(_)))
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ScanError + '_ {
    move |source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// What one reader found.
#[derive(Debug, Default)]
pub struct SourceScan {
    pub records: Vec<PostRecord>,
    /// Image references rebased while reading bodies.
    pub assets: AssetMap,
}

/// Read every dynamic document under `content.dynamic_root`.
///
/// Unpublished documents are skipped. With `include_content` the rewritten
/// body is kept on each record.
pub fn read_dynamic(
    site_root: &Path,
    config: &SiteConfig,
    include_content: bool,
) -> Result<SourceScan, ScanError> {
    let root_name = &config.content.dynamic_root;
    let rules = SlugRules::new(root_name, &config.content);
    let Some(files) = collect_documents(site_root, root_name, DYNAMIC_EXTENSIONS)? else {
        return Ok(SourceScan::default());
    };

    let documents = files
        .par_iter()
        .map(|rel| read_document(site_root, rel, SourceKind::Dynamic, &rules, config, include_content))
        .collect::<Result<Vec<_>, ScanError>>()?;

    let mut scan = SourceScan::default();
    for (record, assets) in documents {
        if !record.is_published() {
            debug!(path = %record.source_path.display(), "skipping unpublished document");
            continue;
        }
        scan.assets.extend(assets);
        scan.records.push(record);
    }
    info!(root = %root_name, found = files.len(), kept = scan.records.len(), "read dynamic documents");
    Ok(scan)
}

/// Read every static document under `content.static_root`, drafts included.
pub fn read_static(
    site_root: &Path,
    config: &SiteConfig,
    include_content: bool,
) -> Result<SourceScan, ScanError> {
    let root_name = &config.content.static_root;
    let rules = SlugRules::new(root_name, &config.content);
    let Some(files) = collect_documents(site_root, root_name, STATIC_EXTENSIONS)? else {
        return Ok(SourceScan::default());
    };

    let documents = files
        .par_iter()
        .map(|rel| read_document(site_root, rel, SourceKind::Static, &rules, config, include_content))
        .collect::<Result<Vec<_>, ScanError>>()?;

    let mut scan = SourceScan::default();
    for (record, assets) in documents {
        scan.assets.extend(assets);
        scan.records.push(record);
    }
    info!(root = %root_name, found = scan.records.len(), "read static documents");
    Ok(scan)
}

/// Body of a record as the presentation layer receives it, with image
/// references rebased. Uses the kept content when the scan included it.
pub fn read_body(
    site_root: &Path,
    config: &SiteConfig,
    record: &PostRecord,
) -> Result<String, ScanError> {
    if let Some(content) = &record.raw_content {
        return Ok(content.clone());
    }
    let root_name = match record.source_kind {
        SourceKind::Dynamic => &config.content.dynamic_root,
        SourceKind::Static => &config.content.static_root,
    };
    let rules = SlugRules::new(root_name, &config.content);
    let full = site_root.join(&record.source_path);
    let text = fs::read_to_string(&full).map_err(io_error(&full))?;
    let rel_str = to_slash_path(&record.source_path)
        .ok_or_else(|| ScanError::NonUtf8Path(record.source_path.clone()))?;
    let dir = rel_str.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let (_, body) = frontmatter::split_document(&text);
    Ok(rewrite_body(body, &rules.images_dir(dir)).0)
}

/// Slugs of every static document, drafts and test posts included.
pub fn all_static_slugs(site_root: &Path, config: &SiteConfig) -> Result<Vec<String>, ScanError> {
    let mut slugs: Vec<String> = read_static(site_root, config, false)?
        .records
        .into_iter()
        .map(|r| r.slug)
        .collect();
    slugs.sort();
    Ok(slugs)
}

/// Top-level directories of the dynamic root that carry a `metadata.json`.
///
/// Sorted by directory name.
pub fn find_sub_blogs(site_root: &Path, config: &SiteConfig) -> Result<Vec<SubBlog>, ScanError> {
    #[derive(Deserialize)]
    struct Descriptor {
        #[serde(default)]
        title: String,
        #[serde(default)]
        description: String,
    }

    let root = site_root.join(&config.content.dynamic_root);
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(&root)
        .map_err(io_error(&root))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.join(SUB_BLOG_DESCRIPTOR).is_file())
        .collect();
    dirs.sort();

    let mut sub_blogs = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let descriptor_path = dir.join(SUB_BLOG_DESCRIPTOR);
        let text = fs::read_to_string(&descriptor_path).map_err(io_error(&descriptor_path))?;
        let descriptor: Descriptor =
            serde_json::from_str(&text).map_err(|source| ScanError::Descriptor {
                path: descriptor_path.clone(),
                source,
            })?;
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ScanError::NonUtf8Path(dir.clone()))?
            .to_string();
        let path = dir.strip_prefix(site_root).unwrap_or(&dir).to_path_buf();
        sub_blogs.push(SubBlog {
            title: if descriptor.title.is_empty() {
                name.clone()
            } else {
                descriptor.title
            },
            slug: name,
            path,
            description: descriptor.description,
        });
    }
    Ok(sub_blogs)
}

/// Document paths under `root_name`, relative to `site_root`, in path order.
///
/// `None` when the root does not exist.
fn collect_documents(
    site_root: &Path,
    root_name: &str,
    extensions: &[&str],
) -> Result<Option<Vec<PathBuf>>, ScanError> {
    let root = site_root.join(root_name);
    if !root.exists() {
        warn!(root = %root.display(), "content root does not exist, treating as empty");
        return Ok(None);
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            let rel = entry.path().strip_prefix(site_root).unwrap_or(entry.path());
            files.push(rel.to_path_buf());
        }
    }
    Ok(Some(files))
}

fn read_document(
    site_root: &Path,
    rel: &Path,
    kind: SourceKind,
    rules: &SlugRules,
    config: &SiteConfig,
    include_content: bool,
) -> Result<(PostRecord, Vec<AssetRef>), ScanError> {
    let full = site_root.join(rel);
    let text = fs::read_to_string(&full).map_err(io_error(&full))?;

    let rel_str = to_slash_path(rel).ok_or_else(|| ScanError::NonUtf8Path(rel.to_path_buf()))?;
    let dir = rel_str.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let images_dir = rules.images_dir(dir);

    let parsed = frontmatter::parse(
        rel,
        &text,
        ParseOptions {
            images_dir: &images_dir,
            social_footer: &config.social.footer,
        },
    )?;
    let fm = parsed.frontmatter;

    let slug = match kind {
        SourceKind::Dynamic => {
            rules.derive_slug(&slug_source(&rel_str, &config.content.body_files), fm.date, fm.legacy)
        }
        SourceKind::Static => {
            let name = fm
                .slug
                .clone()
                .or_else(|| rel.file_stem().and_then(|s| s.to_str()).map(str::to_string))
                .ok_or_else(|| ScanError::NonUtf8Path(rel.to_path_buf()))?;
            rules.dated_slug(fm.date, &name)
        }
    };

    let (body, rebased) = rewrite_body(&parsed.body, &images_dir);
    let assets = rebased
        .iter()
        .map(|target| AssetRef::resolve(site_root, rel, &images_dir, target))
        .collect::<io::Result<Vec<_>>>()
        .map_err(io_error(&full))?;

    debug!(%slug, path = %rel_str, kind = %kind, "parsed document");
    Ok((
        PostRecord {
            slug,
            source_path: rel.to_path_buf(),
            source_kind: kind,
            frontmatter: fm,
            raw_content: include_content.then_some(body),
        },
        assets,
    ))
}

/// Path a dynamic slug is derived from: body files keep their name (the slug
/// rules strip it), any other document loses its extension.
fn slug_source(rel: &str, body_files: &[String]) -> String {
    let file = rel.rsplit('/').next().unwrap_or(rel);
    if body_files.iter().any(|b| b == file) {
        return rel.to_string();
    }
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => rel[..rel.len() - file.len() + stem.len()].to_string(),
        _ => rel.to_string(),
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| ext.eq_ignore_ascii_case(x)))
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}
