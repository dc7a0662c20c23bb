//! Slug and URL derivation.
//!
//! A post's slug comes from where its document sits under the content root
//! and from its declared date:
//!
//! ```text
//! content/software/2023/1_node_golang_wasm/index.mdx   date: 2023-02-13
//!
//! current dialect  →  blog/software/2023/2/node_golang_wasm
//! legacy dialect   →  blog/2023/2/node_golang_wasm
//! ```
//!
//! The `1_` directory prefix only orders posts on disk. It is replaced by the
//! month of the post's `date`, so the URL follows the declared publish date
//! even when the directory numbering disagrees. Legacy posts predate content
//! categories and drop the category segment from their URL.
//!
//! All paths here are `/`-separated strings relative to the site root.

use crate::config::ContentConfig;
use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use std::path::{Component, Path};
use std::sync::LazyLock;

/// Category reported for posts sitting directly under the content root.
pub const ROOT_SUB_BLOG: &str = "root";

static DAY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|/)(\d{1,2})_").expect("day prefix pattern is valid"));

/// Path → URL rules for one content root.
#[derive(Debug, Clone)]
pub struct SlugRules {
    content_root: String,
    url_prefix: String,
    body_files: Vec<String>,
    source_root: String,
    assets_root: String,
}

impl SlugRules {
    /// Rules for documents under `content_root` (relative to the site root).
    pub fn new(content_root: &str, content: &ContentConfig) -> Self {
        Self {
            content_root: content_root.trim_matches('/').to_string(),
            url_prefix: content.url_prefix.trim_matches('/').to_string(),
            body_files: content.body_files.clone(),
            source_root: content.source_root.trim_matches('/').to_string(),
            assets_root: content.assets_root.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Canonical slug for the document at `source_path`.
    ///
    /// Paths outside the content root, or without a day prefix, pass through
    /// the corresponding step unchanged.
    pub fn derive_slug(&self, source_path: &str, date: NaiveDate, legacy: bool) -> String {
        let trimmed = self.strip_body_file(source_path);
        let month = date.month();
        let dated = DAY_PREFIX.replacen(trimmed, 1, |caps: &Captures<'_>| {
            format!("{}{month}/", &caps[1])
        });

        let under_root = self.strip_content_root(&dated);
        if !legacy {
            return match under_root.map(|rest| rest.trim_start_matches('/')) {
                Some("") => self.url_prefix.clone(),
                Some(rest) => format!("{}/{rest}", self.url_prefix),
                None => dated.to_string(),
            };
        }

        let rest = under_root.unwrap_or(&dated).trim_start_matches('/');
        match rest.split_once('/') {
            _ if under_root.is_some() && rest.is_empty() => self.url_prefix.clone(),
            Some((category, tail)) if is_word(category) => format!("{}/{tail}", self.url_prefix),
            _ => rest.to_string(),
        }
    }

    /// Slug for a document that names itself: `<prefix>/<year>/<month>/<name>`.
    pub fn dated_slug(&self, date: NaiveDate, name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.url_prefix,
            date.year(),
            date.month(),
            name.trim_matches('/')
        )
    }

    /// Public directory holding the optimized images of the post at `source_dir`.
    pub fn images_dir(&self, source_dir: &str) -> String {
        let dir = self.strip_body_file(source_dir).trim_end_matches('/');
        if self.source_root.is_empty() {
            return crate::assets::join_public(&self.assets_root, dir);
        }
        match strip_segment_prefix(dir, &self.source_root) {
            Some(rest) => crate::assets::join_public(&self.assets_root, rest),
            None => dir.to_string(),
        }
    }

    /// Top-level category of a document, or [`ROOT_SUB_BLOG`].
    pub fn sub_blog_name(&self, source_path: &str) -> String {
        self.strip_content_root(source_path)
            .map(|rest| rest.trim_start_matches('/'))
            .and_then(|rest| rest.split_once('/'))
            .map(|(category, _)| category)
            .filter(|category| is_word(category))
            .unwrap_or(ROOT_SUB_BLOG)
            .to_string()
    }

    /// Bring a slug from any caller into canonical `<prefix>/...` form.
    ///
    /// Accepts slugs with or without the prefix and stray slashes, so routes
    /// (`2023/2/post`) and stored slugs (`blog/2023/2/post`) compare equal.
    pub fn normalize(&self, slug: &str) -> String {
        let trimmed = slug.trim().trim_matches('/');
        if strip_segment_prefix(trimmed, &self.url_prefix).is_some() {
            trimmed.to_string()
        } else if trimmed.is_empty() {
            self.url_prefix.clone()
        } else {
            format!("{}/{trimmed}", self.url_prefix)
        }
    }

    /// Route segment of a canonical slug, without the URL prefix.
    pub fn route<'a>(&self, slug: &'a str) -> &'a str {
        strip_segment_prefix(slug, &self.url_prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(slug)
    }

    /// Remove a trailing body-file segment, matched exactly and case-sensitively.
    fn strip_body_file<'a>(&self, path: &'a str) -> &'a str {
        let path = path.trim_end_matches('/');
        for body in &self.body_files {
            if let Some(dir) = path
                .strip_suffix(body.as_str())
                .and_then(|rest| rest.strip_suffix('/'))
            {
                return dir;
            }
        }
        path
    }

    fn strip_content_root<'a>(&self, path: &'a str) -> Option<&'a str> {
        strip_segment_prefix(path, &self.content_root)
    }
}

/// Strip `prefix` when it matches whole leading segments of `path`.
fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

fn is_word(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Render a relative path with `/` separators. `None` for non-UTF-8 paths.
pub fn to_slash_path(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir => parts.push(".."),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(parts.join("/"))
}

/// Absolute URL for a site path. Without a `site_url` the path stays root-relative.
pub fn page_url(site_url: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    let host = site_url.trim_end_matches('/');
    format!("{host}/{path}")
}
