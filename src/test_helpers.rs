//! Shared test utilities.
//!
//! Builds throwaway site trees on disk and in-memory records, plus lookup
//! helpers that panic with the available slugs on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = SiteBuilder::new()
//!     .dynamic("software/2023/1_wasm/index.mdx", &post("Wasm", "2023-02-13", true))
//!     .static_doc("mypost.md", &post("Mine", "1988-06-03", true))
//!     .build();
//!
//! let index = ContentIndex::build(site.path(), &SiteConfig::default(), IndexOptions::default())?;
//! let record = find_record(index.posts(), "blog/software/2023/2/wasm");
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::frontmatter::{Frontmatter, parse_date};
use crate::types::{PostRecord, SourceKind};

// =========================================================================
// Site trees on disk
// =========================================================================

/// Collects files, then writes them into a fresh temp directory.
#[derive(Default)]
pub struct SiteBuilder {
    files: Vec<(PathBuf, String)>,
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document under the default dynamic root (`content/`).
    pub fn dynamic(self, rel: &str, doc: &PostSpec) -> Self {
        self.file(&format!("content/{rel}"), &doc.render())
    }

    /// A document under the default static root (`static-content/`).
    pub fn static_doc(self, rel: &str, doc: &PostSpec) -> Self {
        self.file(&format!("static-content/{rel}"), &doc.render())
    }

    pub fn config(self, toml: &str) -> Self {
        self.file("config.toml", toml)
    }

    /// Any file, relative to the site root.
    pub fn file(mut self, rel: &str, contents: &str) -> Self {
        self.files.push((PathBuf::from(rel), contents.to_string()));
        self
    }

    pub fn build(self) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (rel, contents) in &self.files {
            write_file(tmp.path(), rel, contents);
        }
        tmp
    }
}

fn write_file(root: &Path, rel: &Path, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
}

/// A document with a frontmatter header, rendered to text by [`PostSpec::render`].
#[derive(Debug, Clone)]
pub struct PostSpec {
    header: Vec<(String, String)>,
    body: String,
}

/// Start a document with the three required fields.
pub fn post(title: &str, date: &str, published: bool) -> PostSpec {
    PostSpec {
        header: vec![
            ("title".into(), format!("{title:?}")),
            ("date".into(), date.to_string()),
            ("published".into(), published.to_string()),
        ],
        body: format!("Body of {title}.\n"),
    }
}

impl PostSpec {
    /// Add a raw YAML `key: value` line.
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.header.push((key.to_string(), value.to_string()));
        self
    }

    pub fn hero(self, rel: &str) -> Self {
        self.field("hero_image", rel)
    }

    pub fn series(self, name: &str) -> Self {
        self.field("series", name)
    }

    pub fn slug(self, name: &str) -> Self {
        self.field("slug", name)
    }

    pub fn key_words(self, joined: &str) -> Self {
        self.field("key_words", &format!("{joined:?}"))
    }

    pub fn legacy(self) -> Self {
        self.field("legacy", "true")
    }

    pub fn test(self) -> Self {
        self.field("test", "true")
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.header {
            out.push_str(&format!("{key}: {value}\n"));
        }
        out.push_str("---\n");
        out.push_str(&self.body);
        out
    }
}

// =========================================================================
// In-memory records
// =========================================================================

/// A published dynamic record with empty optional fields.
pub fn record(slug: &str, date: &str) -> PostRecord {
    let date = parse_date(date).unwrap_or_else(|| panic!("bad test date {date:?}"));
    PostRecord {
        slug: slug.to_string(),
        source_path: PathBuf::from(format!("content/{slug}/index.mdx")),
        source_kind: SourceKind::Dynamic,
        frontmatter: Frontmatter {
            title: slug.rsplit('/').next().unwrap_or(slug).to_string(),
            date,
            display_date: date.format(crate::frontmatter::DISPLAY_DATE_FORMAT).to_string(),
            description: Vec::new(),
            hero_image: String::new(),
            hero_image_blur: String::new(),
            hero_image_original: String::new(),
            hero_image_alt: String::new(),
            hero_width: None,
            hero_height: None,
            published: true,
            series: None,
            key_words: Vec::new(),
            social_title: String::new(),
            social_subtitle: String::new(),
            social_footer: String::new(),
            test: false,
            legacy: false,
            slug: None,
        },
        raw_content: None,
    }
}

/// Builder-style tweaks for [`record`].
pub trait RecordExt: Sized {
    fn kind(self, kind: SourceKind) -> Self;
    fn path(self, path: &str) -> Self;
    fn draft(self) -> Self;
    fn test(self) -> Self;
    fn series(self, name: &str) -> Self;
    fn content(self, body: &str) -> Self;
    fn hero(self, image: &str, original: &str) -> Self;
    fn key_words(self, words: &[&str]) -> Self;
}

impl RecordExt for PostRecord {
    fn kind(mut self, kind: SourceKind) -> Self {
        self.source_kind = kind;
        if kind == SourceKind::Static {
            let name = self.slug.rsplit('/').next().unwrap_or(&self.slug).to_string();
            self.source_path = PathBuf::from(format!("static-content/{name}.md"));
        }
        self
    }

    fn path(mut self, path: &str) -> Self {
        self.source_path = PathBuf::from(path);
        self
    }

    fn draft(mut self) -> Self {
        self.frontmatter.published = false;
        self
    }

    fn test(mut self) -> Self {
        self.frontmatter.test = true;
        self
    }

    fn series(mut self, name: &str) -> Self {
        self.frontmatter.series = Some(name.to_string());
        self
    }

    fn content(mut self, body: &str) -> Self {
        self.raw_content = Some(body.to_string());
        self
    }

    fn hero(mut self, image: &str, original: &str) -> Self {
        self.frontmatter.hero_image = image.to_string();
        self.frontmatter.hero_image_original = original.to_string();
        self
    }

    fn key_words(mut self, words: &[&str]) -> Self {
        self.frontmatter.key_words = words.iter().map(|w| w.to_string()).collect();
        self
    }
}

// =========================================================================
// Lookups — panic with a clear message on miss
// =========================================================================

/// Find a record by slug. Panics if not found.
pub fn find_record<'a>(records: &'a [PostRecord], slug: &str) -> &'a PostRecord {
    records.iter().find(|r| r.slug == slug).unwrap_or_else(|| {
        let slugs: Vec<&str> = records.iter().map(|r| r.slug.as_str()).collect();
        panic!("record '{slug}' not found. Available: {slugs:?}")
    })
}

// =========================================================================
// Log capture
// =========================================================================

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a thread-local subscriber and return what it logged at
/// `debug` and above, without ANSI colors.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    (value, logs)
}
