//! Image references inside posts.
//!
//! Posts refer to their images relative to their own directory (`./hero.png`).
//! The site serves optimized copies from a separate public root, so every
//! relative reference is rebased onto the post's images directory (see
//! [`SlugRules::images_dir`](crate::slug::SlugRules::images_dir)) and GIFs are
//! swapped for their WebP conversions.
//!
//! Each rebased reference is recorded in an [`AssetMap`] owned by the current
//! build. The image pipeline downstream reads that map instead of a side file,
//! and the SHA-256 of each source image lets it skip files that haven't
//! changed since the last run.

use regex::{Captures, Regex};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Raster formats the optimizer converts to WebP.
const CONVERTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

static LINK_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\(([^)\s]+)").expect("link target pattern is valid"));

/// Public paths derived from a post's `hero_image` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeroImages {
    /// Optimized WebP copy.
    pub image: String,
    /// Blurred WebP placeholder (`blur_` prefix).
    pub blur: String,
    /// Copy in the original format, used for social cards.
    pub original: String,
}

impl HeroImages {
    /// Derive hero paths. Absent or blank references yield empty strings.
    pub fn derive(images_dir: &str, relative: Option<&str>) -> Self {
        let Some(relative) = relative.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self::default();
        };
        let bare = strip_dot_slash(relative);
        Self {
            image: join_public(images_dir, &to_webp(bare)),
            blur: join_public(images_dir, &format!("blur_{}", to_webp(bare))),
            original: join_public(images_dir, bare),
        }
    }
}

/// Rebase `./` link and image targets in `body` onto `images_dir`.
///
/// Targets ending in `.gif` become `.webp` whether or not they were rebased.
/// Returns the rewritten body and the original relative targets that were
/// rebased, in document order.
pub fn rewrite_body(body: &str, images_dir: &str) -> (String, Vec<String>) {
    let mut rebased = Vec::new();
    let rewritten = LINK_TARGET.replace_all(body, |caps: &Captures<'_>| {
        let target = &caps[1];
        let mut out = if target.starts_with("./") {
            rebased.push(target.to_string());
            join_public(images_dir, strip_dot_slash(target))
        } else {
            target.to_string()
        };
        if has_extension(&out, "gif") {
            out = replace_extension(&out, "webp");
        }
        format!("]({out}")
    });
    (rewritten.into_owned(), rebased)
}

/// One image a post refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    /// Documents that reference the image, relative to the site root.
    pub documents: BTreeSet<PathBuf>,
    /// Image source, relative to the site root.
    pub source: PathBuf,
    /// Path the page links to.
    pub public_path: String,
    /// SHA-256 of the source file; `None` when the file is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
}

impl AssetRef {
    /// Resolve `relative` (as written in `document`) and hash the source if present.
    pub fn resolve(
        site_root: &Path,
        document: &Path,
        images_dir: &str,
        relative: &str,
    ) -> io::Result<Self> {
        let bare = strip_dot_slash(relative);
        let source = document
            .parent()
            .map(|dir| dir.join(bare))
            .unwrap_or_else(|| PathBuf::from(bare));
        let public = join_public(images_dir, bare);
        let public_path = if has_extension(&public, "gif") {
            replace_extension(&public, "webp")
        } else {
            public
        };

        let full = site_root.join(&source);
        let source_hash = if full.is_file() {
            Some(hash_file(&full)?)
        } else {
            None
        };

        Ok(Self {
            documents: BTreeSet::from([document.to_path_buf()]),
            source,
            public_path,
            source_hash,
        })
    }
}

/// Every image reference seen during one build, keyed by public path.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AssetMap {
    entries: BTreeMap<String, AssetRef>,
}

impl AssetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reference. Another reference to the same source adds its
    /// documents to the existing entry. A reference to the same public path
    /// from a different source replaces the earlier one and returns it.
    pub fn insert(&mut self, asset: AssetRef) -> Option<AssetRef> {
        match self.entries.get_mut(&asset.public_path) {
            Some(existing) if existing.source == asset.source => {
                existing.documents.extend(asset.documents);
                None
            }
            _ => self.entries.insert(asset.public_path.clone(), asset),
        }
    }

    pub fn get(&self, public_path: &str) -> Option<&AssetRef> {
        self.entries.get(public_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetRef> {
        self.entries.values()
    }

    /// References whose source file does not exist.
    pub fn missing(&self) -> impl Iterator<Item = &AssetRef> {
        self.entries.values().filter(|a| a.source_hash.is_none())
    }

    /// Forget documents for which `keep` returns false, then drop images no
    /// remaining document refers to.
    pub fn retain_documents(&mut self, mut keep: impl FnMut(&Path) -> bool) {
        self.entries.retain(|_, asset| {
            asset.documents.retain(|doc| keep(doc));
            !asset.documents.is_empty()
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<AssetRef> for AssetMap {
    fn extend<I: IntoIterator<Item = AssetRef>>(&mut self, iter: I) {
        for asset in iter {
            self.insert(asset);
        }
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

fn strip_dot_slash(mut path: &str) -> &str {
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path
}

/// Join a public directory and a relative path with exactly one `/`.
pub fn join_public(dir: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        relative.to_string()
    } else {
        format!("{dir}/{relative}")
    }
}

fn extension_of(path: &str) -> Option<&str> {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext)
}

fn has_extension(path: &str, ext: &str) -> bool {
    extension_of(path).is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn replace_extension(path: &str, new_ext: &str) -> String {
    match extension_of(path) {
        Some(ext) => format!("{}{new_ext}", &path[..path.len() - ext.len()]),
        None => path.to_string(),
    }
}

fn to_webp(path: &str) -> String {
    let convertible = extension_of(path).is_some_and(|ext| {
        CONVERTED_EXTENSIONS
            .iter()
            .any(|c| ext.eq_ignore_ascii_case(c))
    });
    if convertible {
        replace_extension(path, "webp")
    } else {
        path.to_string()
    }
}
