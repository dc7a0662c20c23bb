//! Site configuration.
//!
//! A single optional `config.toml` in the site root overrides the stock
//! defaults. Files are sparse: only the keys being changed need to appear.
//!
//! ```toml
//! production = false          # excludes drafts and test posts when true
//! site_url = ""               # host used for absolute page and image URLs
//! posts_per_page = 5
//!
//! [content]
//! dynamic_root = "content"            # per-post directories, .md / .mdx
//! static_root = "static-content"      # flat markdown documents, .md
//! url_prefix = "blog"                 # replaces the content root in slugs
//! body_files = ["index.mdx", "index.md"]
//! source_root = ""                    # prefix swapped for assets_root
//! assets_root = "/opt_images"
//!
//! [social]
//! footer = "Visit the site for the full post"
//!
//! [series]
//! rust-for-beginners = "Rust for beginners"
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The production flag can also come from the environment; see
//! [`resolve_production`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable consulted when the CLI flag is absent.
pub const ENV_VAR: &str = "POSTINDEX_ENV";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Production builds hide unpublished and test posts.
    pub production: bool,
    /// Base URL for absolute links. Empty means root-relative links.
    pub site_url: String,
    /// Page size for paginated listings.
    pub posts_per_page: usize,
    pub content: ContentConfig,
    pub social: SocialConfig,
    /// Series slug → display title.
    pub series: BTreeMap<String, String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            production: false,
            site_url: String::new(),
            posts_per_page: 5,
            content: ContentConfig::default(),
            social: SocialConfig::default(),
            series: BTreeMap::new(),
        }
    }
}

impl SiteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.posts_per_page == 0 {
            return Err(ConfigError::Validation(
                "posts_per_page must be greater than 0".into(),
            ));
        }
        let content = &self.content;
        if content.url_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "content.url_prefix must not be empty".into(),
            ));
        }
        if content.dynamic_root.trim_matches('/').is_empty()
            || content.static_root.trim_matches('/').is_empty()
        {
            return Err(ConfigError::Validation(
                "content roots must not be empty".into(),
            ));
        }
        if content.dynamic_root.trim_matches('/') == content.static_root.trim_matches('/') {
            return Err(ConfigError::Validation(
                "content.dynamic_root and content.static_root must differ".into(),
            ));
        }
        if content.body_files.iter().any(|f| f.is_empty() || f.contains('/')) {
            return Err(ConfigError::Validation(
                "content.body_files entries must be plain file names".into(),
            ));
        }
        Ok(())
    }

    /// Display title for a series, falling back to the series slug itself.
    pub fn series_title<'a>(&'a self, series: &'a str) -> &'a str {
        self.series.get(series).map(String::as_str).unwrap_or(series)
    }
}

/// Where content lives and how its paths map onto URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Root of the dynamic documents, relative to the site root.
    pub dynamic_root: String,
    /// Root of the static documents, relative to the site root.
    pub static_root: String,
    /// First slug segment; replaces the content root.
    pub url_prefix: String,
    /// File names that mark a post directory's body file. Stripped from slugs.
    pub body_files: Vec<String>,
    /// Path prefix replaced by `assets_root` when deriving image directories.
    /// Empty means `assets_root` is simply prepended.
    pub source_root: String,
    /// Public root of optimized images.
    pub assets_root: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dynamic_root: "content".to_string(),
            static_root: "static-content".to_string(),
            url_prefix: "blog".to_string(),
            body_files: vec!["index.mdx".to_string(), "index.md".to_string()],
            source_root: String::new(),
            assets_root: "/opt_images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SocialConfig {
    /// Footer line for social cards when a post does not set `social_footer`.
    pub footer: String,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            footer: "Visit the site for the full post".to_string(),
        }
    }
}

/// Decide the production flag: explicit CLI flag, then `POSTINDEX_ENV`, then the file.
pub fn resolve_production(cli_flag: bool, env_value: Option<&str>, config: &SiteConfig) -> bool {
    if cli_flag {
        return true;
    }
    match env_value.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("production") => true,
        Some(v) if !v.is_empty() => false,
        _ => config.production,
    }
}

// =============================================================================
// Loading, merging, validation
// =============================================================================

/// Stock defaults as a TOML table, the base layer for user overrides.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `config.toml` from `root` as a raw value, `None` when absent.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the site config from `root/config.toml`, falling back to defaults.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Fully commented stock `config.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# postindex configuration
# All settings are optional. Values shown are the defaults.
# Unknown keys are rejected.

# Production builds hide unpublished posts and posts marked `test: true`.
# Also enabled by --production or POSTINDEX_ENV=production.
production = false

# Host used to build absolute page and image URLs (e.g. "https://example.dev").
# Leave empty for root-relative links.
site_url = ""

# Posts per listing page.
posts_per_page = 5

[content]
# Per-post directories holding an index.mdx / index.md body file.
dynamic_root = "content"
# Flat directory of markdown documents rendered ahead of time.
static_root = "static-content"
# First URL segment; replaces the content root in every slug.
url_prefix = "blog"
# Body-file names stripped from the end of a post path.
body_files = ["index.mdx", "index.md"]
# Prefix of post paths swapped for assets_root when locating images.
# Empty means assets_root is prepended to the post directory.
source_root = ""
# Public root of optimized images.
assets_root = "/opt_images"

[social]
# Social card footer for posts that don't set `social_footer`.
footer = "Visit the site for the full post"

[series]
# Display titles for series slugs.
# rust-for-beginners = "Rust for beginners"
"##
}
