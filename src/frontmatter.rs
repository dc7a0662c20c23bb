//! Frontmatter parsing and validation.
//!
//! A document starts with a YAML header between `---` fences:
//!
//! ```text
//! ---
//! title: Running Go in Node
//! date: 2023-02-13
//! description:
//!   - Executing WebAssembly modules inside NodeJS
//! published: true
//! key_words: wasm, go, node
//! hero_image: ./hero.png
//! ---
//! Body text...
//! ```
//!
//! The header is checked against a declared [`Schema`] (a JSON-schema-like
//! document shipped with the crate) before anything reads it. Every problem is
//! collected into a single [`ValidationError`] so an author sees all broken
//! fields at once. Only a header that passes the schema is normalized into a
//! [`Frontmatter`], with defaults filled in.

use crate::assets::HeroImages;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Display format for dates, e.g. `February 13, 2023`.
pub const DISPLAY_DATE_FORMAT: &str = "%B %d, %Y";

static BUILTIN_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    serde_json::from_str(include_str!("frontmatter.schema.json"))
        .expect("bundled frontmatter schema must parse")
});

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("{}: malformed frontmatter header: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        header: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A header that does not satisfy the schema.
#[derive(Error, Debug, Clone)]
#[error("invalid frontmatter in {}: {}", .path.display(), describe_issues(.issues))]
pub struct ValidationError {
    pub path: PathBuf,
    pub issues: Vec<FieldIssue>,
    /// The raw header text, for debugging.
    pub header: String,
}

impl ValidationError {
    /// Names of the offending fields, required fields first.
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: String,
    pub problem: Problem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    Missing,
    WrongType { expected: String },
    InvalidDate(String),
    OutOfRange { value: String },
    NotAMapping,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Missing => f.write_str("missing"),
            Problem::WrongType { expected } => write!(f, "expected {expected}"),
            Problem::InvalidDate(raw) => write!(f, "unparseable date {raw:?}"),
            Problem::OutOfRange { value } => write!(f, "{value} is out of range"),
            Problem::NotAMapping => f.write_str("header is not a key/value mapping"),
        }
    }
}

fn describe_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("`{}` {}", i.field, i.problem))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Schema
// =============================================================================

/// Declared shape of a frontmatter header.
#[derive(Debug, Clone, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub required: Vec<String>,
    pub properties: BTreeMap<String, Property>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub types: TypeSet,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

impl Property {
    fn in_range(&self, value: f64) -> bool {
        self.minimum.is_none_or(|min| value >= min) && self.maximum.is_none_or(|max| value <= max)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    One(ValueType),
    Many(Vec<ValueType>),
}

impl TypeSet {
    fn as_slice(&self) -> &[ValueType] {
        match self {
            TypeSet::One(t) => std::slice::from_ref(t),
            TypeSet::Many(ts) => ts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    /// Arrays of strings; headers never nest deeper.
    Array,
    Boolean,
    Number,
    Integer,
    Null,
}

impl ValueType {
    fn matches(self, value: &serde_yaml::Value) -> bool {
        use serde_yaml::Value;
        match (self, value) {
            (ValueType::String, Value::String(_)) => true,
            (ValueType::Array, Value::Sequence(items)) => items.iter().all(Value::is_string),
            (ValueType::Boolean, Value::Bool(_)) => true,
            (ValueType::Number, Value::Number(_)) => true,
            (ValueType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (ValueType::Null, Value::Null) => true,
            _ => false,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Array => "list of strings",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Null => "null",
        }
    }
}

impl Schema {
    /// The schema bundled with the crate.
    pub fn builtin() -> &'static Schema {
        &BUILTIN_SCHEMA
    }

    /// Check a parsed header, returning every problem found.
    ///
    /// Keys the schema does not declare are ignored. An explicit `null` on an
    /// optional field counts as absent; on a required field it counts as missing.
    pub fn check(&self, header: &serde_yaml::Value) -> Vec<FieldIssue> {
        let empty = serde_yaml::Mapping::new();
        let map = match header {
            serde_yaml::Value::Mapping(map) => map,
            serde_yaml::Value::Null => &empty,
            _ => {
                return vec![FieldIssue {
                    field: "<header>".to_string(),
                    problem: Problem::NotAMapping,
                }];
            }
        };

        let mut issues = Vec::new();
        for field in &self.required {
            if map.get(field.as_str()).is_none_or(serde_yaml::Value::is_null) {
                issues.push(FieldIssue {
                    field: field.clone(),
                    problem: Problem::Missing,
                });
            }
        }

        for (name, property) in &self.properties {
            let Some(value) = map.get(name.as_str()) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let types = property.types.as_slice();
            if !types.iter().any(|t| t.matches(value)) {
                let expected = types.iter().map(|t| t.name()).collect::<Vec<_>>().join(" or ");
                issues.push(FieldIssue {
                    field: name.clone(),
                    problem: Problem::WrongType { expected },
                });
                continue;
            }
            if let serde_yaml::Value::Number(n) = value
                && let Some(number) = n.as_f64()
                && !property.in_range(number)
            {
                issues.push(FieldIssue {
                    field: name.clone(),
                    problem: Problem::OutOfRange {
                        value: n.to_string(),
                    },
                });
                continue;
            }
            if property.format.as_deref() == Some("date")
                && let Some(raw) = value.as_str()
                && parse_date(raw).is_none()
            {
                issues.push(FieldIssue {
                    field: name.clone(),
                    problem: Problem::InvalidDate(raw.to_string()),
                });
            }
        }
        issues
    }
}

// =============================================================================
// Normalized frontmatter
// =============================================================================

/// A validated header with every optional field defaulted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Frontmatter {
    pub title: String,
    pub date: NaiveDate,
    /// `date` formatted for display, e.g. `February 13, 2023`.
    pub display_date: String,
    /// Ordered description lines; a plain string becomes one line.
    pub description: Vec<String>,
    pub hero_image: String,
    pub hero_image_blur: String,
    pub hero_image_original: String,
    pub hero_image_alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_height: Option<u32>,
    pub published: bool,
    pub series: Option<String>,
    pub key_words: Vec<String>,
    pub social_title: String,
    pub social_subtitle: String,
    pub social_footer: String,
    pub test: bool,
    pub legacy: bool,
    /// Explicit slug name, used by static documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// Context the normalization step needs beyond the header itself.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions<'a> {
    /// Public directory that relative image references resolve against.
    pub images_dir: &'a str,
    /// `social_footer` fallback.
    pub social_footer: &'a str,
}

/// A document split into its normalized header and body.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub frontmatter: Frontmatter,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

/// Typed view of a header that already passed [`Schema::check`].
#[derive(Debug, Deserialize)]
struct Header {
    title: String,
    date: String,
    #[serde(default)]
    description: Option<TextOrList>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    hero_image: Option<String>,
    #[serde(default)]
    hero_image_alt: Option<String>,
    #[serde(default)]
    hero_width: Option<u32>,
    #[serde(default)]
    hero_height: Option<u32>,
    published: bool,
    #[serde(default)]
    series: Option<String>,
    #[serde(default)]
    key_words: Option<TextOrList>,
    #[serde(default)]
    social_title: Option<String>,
    #[serde(default)]
    social_subtitle: Option<String>,
    #[serde(default)]
    social_footer: Option<String>,
    #[serde(default)]
    test: Option<bool>,
    #[serde(default)]
    legacy: Option<bool>,
}

/// Split `text` into its raw header and body.
///
/// Returns `None` for the header when the document does not open with a
/// `---` fence or the fence is never closed.
pub fn split_document(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(rest) = text.strip_prefix("---") else {
        return (None, text);
    };
    let Some(rest) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, text)
}

/// Parse and validate a document against the bundled schema.
///
/// `path` is only used for error reporting.
pub fn parse(
    path: &Path,
    text: &str,
    options: ParseOptions<'_>,
) -> Result<ParsedDocument, FrontmatterError> {
    parse_with_schema(Schema::builtin(), path, text, options)
}

pub fn parse_with_schema(
    schema: &Schema,
    path: &Path,
    text: &str,
    options: ParseOptions<'_>,
) -> Result<ParsedDocument, FrontmatterError> {
    let (raw_header, body) = split_document(text);
    let raw_header = raw_header.unwrap_or_default();

    let yaml_error = |source| FrontmatterError::Yaml {
        path: path.to_path_buf(),
        header: raw_header.to_string(),
        source,
    };

    let value: serde_yaml::Value = if raw_header.trim().is_empty() {
        serde_yaml::Value::Null
    } else {
        serde_yaml::from_str(raw_header).map_err(yaml_error)?
    };

    let issues = schema.check(&value);
    if !issues.is_empty() {
        return Err(ValidationError {
            path: path.to_path_buf(),
            issues,
            header: raw_header.to_string(),
        }
        .into());
    }

    let header: Header = serde_yaml::from_value(value).map_err(yaml_error)?;
    let frontmatter = normalize(header, options).ok_or_else(|| ValidationError {
        path: path.to_path_buf(),
        issues: vec![FieldIssue {
            field: "date".to_string(),
            problem: Problem::InvalidDate(String::new()),
        }],
        header: raw_header.to_string(),
    })?;

    Ok(ParsedDocument {
        frontmatter,
        body: body.to_string(),
    })
}

fn normalize(header: Header, options: ParseOptions<'_>) -> Option<Frontmatter> {
    let date = parse_date(&header.date)?;

    let description = match header.description {
        Some(TextOrList::Text(text)) if text.is_empty() => Vec::new(),
        Some(TextOrList::Text(text)) => vec![text],
        Some(TextOrList::List(lines)) => lines,
        None => Vec::new(),
    };

    let hero = HeroImages::derive(options.images_dir, header.hero_image.as_deref());

    let series = header
        .series
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let social_subtitle = header
        .social_subtitle
        .unwrap_or_else(|| description.first().cloned().unwrap_or_default());

    Some(Frontmatter {
        social_title: header.social_title.unwrap_or_else(|| header.title.clone()),
        social_subtitle,
        social_footer: header
            .social_footer
            .unwrap_or_else(|| options.social_footer.to_string()),
        title: header.title,
        display_date: date.format(DISPLAY_DATE_FORMAT).to_string(),
        date,
        description,
        hero_image: hero.image,
        hero_image_blur: hero.blur,
        hero_image_original: hero.original,
        hero_image_alt: header.hero_image_alt.unwrap_or_default(),
        hero_width: header.hero_width,
        hero_height: header.hero_height,
        published: header.published,
        series,
        key_words: parse_key_words(header.key_words),
        test: header.test.unwrap_or(false),
        legacy: header.legacy.unwrap_or(false),
        slug: header.slug.filter(|s| !s.trim().is_empty()),
    })
}

/// Key words come either as a list or as one comma-joined string.
/// Entries are trimmed and blanks dropped; duplicates are kept.
fn parse_key_words(raw: Option<TextOrList>) -> Vec<String> {
    let items: Vec<String> = match raw {
        Some(TextOrList::Text(joined)) => joined.split(',').map(str::to_string).collect(),
        Some(TextOrList::List(list)) => list,
        None => return Vec::new(),
    };
    items
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Parse an ISO-8601 date or date-time, keeping the calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}
