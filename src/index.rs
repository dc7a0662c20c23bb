//! The merged content index.
//!
//! Both readers feed one list of [`PostRecord`]s. Building the index:
//!
//! 1. normalizes every slug to `<url_prefix>/...`,
//! 2. drops `test` posts and drafts in production,
//! 3. resolves slug collisions: a dynamic record beats a static one, and
//!    between records of the same kind the first source path wins,
//! 4. sorts by date, newest first, ties by slug.
//!
//! The result is immutable. Every query borrows from it, so one index can be
//! shared across threads and serve any number of readers without locking.
//!
//! Navigation (`previous_and_next`) always works over published records only,
//! even in development builds where drafts are listed.

use crate::assets::AssetMap;
use crate::config::SiteConfig;
use crate::render::render_markdown;
use crate::scan::{self, ScanError};
use crate::slug::{SlugRules, page_url};
use crate::types::{PostRecord, SourceKind, SubBlog};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// How an index is built.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    /// Drop `test` posts and drafts.
    pub production: bool,
    /// Keep document bodies on the records.
    pub include_content: bool,
}

/// Chronological neighbours among published posts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Adjacent<'a> {
    /// Next older post.
    pub previous: Option<&'a PostRecord>,
    /// Next newer post.
    pub next: Option<&'a PostRecord>,
}

/// A post's position in its series.
///
/// `next_in_series` includes every member dated on or after the post,
/// so the post itself appears there. Callers skip it by slug.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesNeighbors<'a> {
    pub previous_in_series: Vec<&'a PostRecord>,
    pub next_in_series: Vec<&'a PostRecord>,
}

impl<'a> SeriesNeighbors<'a> {
    /// Slug of the member read just before `slug`.
    pub fn previous_link(&self) -> Option<&'a str> {
        self.previous_in_series.last().map(|p| p.slug.as_str())
    }

    /// Slug of the member read just after `slug`.
    pub fn next_link(&self, slug: &str) -> Option<&'a str> {
        self.next_in_series
            .iter()
            .find(|p| p.slug != slug)
            .map(|p| p.slug.as_str())
    }
}

/// Everything a dynamic post page needs.
#[derive(Debug, Clone, Serialize)]
pub struct DynamicPost<'a> {
    pub post: &'a PostRecord,
    /// Body with image references rebased, ready for the component pipeline.
    pub content: String,
    pub url: String,
    pub adjacent: Adjacent<'a>,
    /// Members of the post's series, oldest first. Empty without a series.
    pub series: Vec<&'a PostRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_title: Option<&'a str>,
    pub is_part_of_series: bool,
    pub series_neighbors: SeriesNeighbors<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_series_link: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_series_link: Option<&'a str>,
    /// Absolute image URLs for social cards: original hero first.
    pub seo_images: Vec<String>,
}

/// Everything a static post page needs.
#[derive(Debug, Clone, Serialize)]
pub struct StaticPost<'a> {
    pub post: &'a PostRecord,
    pub html: String,
    pub url: String,
    /// Chronological neighbours, dynamic or static. Static posts never
    /// belong to a series.
    pub adjacent: Adjacent<'a>,
    pub seo_images: Vec<String>,
}

/// Serialized form written by `postindex index`.
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub production: bool,
    pub posts: &'a [PostRecord],
    pub static_paths: Vec<&'a str>,
    pub extra_pages: Vec<usize>,
    pub sub_blogs: &'a [SubBlog],
    pub assets: &'a AssetMap,
}

/// Slug-keyed, date-sorted view over all posts of one build.
#[derive(Debug)]
pub struct ContentIndex {
    posts: Vec<PostRecord>,
    by_slug: HashMap<String, usize>,
    assets: AssetMap,
    sub_blogs: Vec<SubBlog>,
    rules: SlugRules,
    config: SiteConfig,
    site_root: PathBuf,
    production: bool,
}

impl ContentIndex {
    /// Scan both content roots under `site_root` and merge them.
    pub fn build(
        site_root: &Path,
        config: &SiteConfig,
        options: IndexOptions,
    ) -> Result<Self, IndexError> {
        let dynamic = scan::read_dynamic(site_root, config, options.include_content)?;
        let stat = scan::read_static(site_root, config, options.include_content)?;
        let sub_blogs = scan::find_sub_blogs(site_root, config)?;

        let mut assets = dynamic.assets;
        assets.extend(stat.assets.iter().cloned());

        let mut index = Self::from_records(
            site_root,
            config,
            options.production,
            dynamic.records.into_iter().chain(stat.records),
        );
        let kept: HashSet<&Path> = index.posts.iter().map(|p| p.source_path.as_path()).collect();
        assets.retain_documents(|doc| kept.contains(doc));
        index.assets = assets;
        index.sub_blogs = sub_blogs;

        info!(
            posts = index.posts.len(),
            published = index.published().count(),
            assets = index.assets.len(),
            production = options.production,
            "built content index"
        );
        Ok(index)
    }

    /// Merge already-read records. Input order does not matter.
    pub fn from_records(
        site_root: &Path,
        config: &SiteConfig,
        production: bool,
        records: impl IntoIterator<Item = PostRecord>,
    ) -> Self {
        let rules = SlugRules::new(&config.content.dynamic_root, &config.content);

        let mut candidates: Vec<PostRecord> = records
            .into_iter()
            .filter(|r| {
                let keep = !production || (!r.frontmatter.test && r.is_published());
                if !keep {
                    debug!(slug = %r.slug, test = r.frontmatter.test, published = r.is_published(),
                        "excluded from production index");
                }
                keep
            })
            .map(|mut r| {
                r.slug = rules.normalize(&r.slug);
                r
            })
            .collect();

        // First of each slug wins: dynamic before static, then lowest path.
        candidates.sort_by(|a, b| {
            kind_rank(a.source_kind)
                .cmp(&kind_rank(b.source_kind))
                .then_with(|| a.source_path.cmp(&b.source_path))
        });

        let mut posts: Vec<PostRecord> = Vec::with_capacity(candidates.len());
        let mut seen: HashMap<String, usize> = HashMap::new();
        for record in candidates {
            if let Some(&winner) = seen.get(&record.slug) {
                let kept: &PostRecord = &posts[winner];
                warn!(
                    slug = %record.slug,
                    kept = %kept.source_path.display(),
                    kept_kind = %kept.source_kind,
                    dropped = %record.source_path.display(),
                    dropped_kind = %record.source_kind,
                    "slug collision"
                );
                continue;
            }
            seen.insert(record.slug.clone(), posts.len());
            posts.push(record);
        }

        posts.sort_by(|a, b| {
            b.frontmatter
                .date
                .cmp(&a.frontmatter.date)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        let by_slug = posts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.slug.clone(), i))
            .collect();

        Self {
            posts,
            by_slug,
            assets: AssetMap::new(),
            sub_blogs: Vec::new(),
            rules,
            config: config.clone(),
            site_root: site_root.to_path_buf(),
            production,
        }
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// All records, newest first.
    pub fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    pub fn published(&self) -> impl Iterator<Item = &PostRecord> {
        self.posts.iter().filter(|p| p.is_published())
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn assets(&self) -> &AssetMap {
        &self.assets
    }

    pub fn sub_blogs(&self) -> &[SubBlog] {
        &self.sub_blogs
    }

    /// Look up a record. Accepts slugs with or without the URL prefix.
    pub fn get(&self, slug: &str) -> Option<&PostRecord> {
        let slug = self.rules.normalize(slug);
        self.by_slug.get(&slug).map(|&i| &self.posts[i])
    }

    pub fn is_post(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    /// False for static posts and for unknown slugs.
    pub fn is_dynamic_post(&self, slug: &str) -> bool {
        self.get(slug).is_some_and(PostRecord::is_dynamic)
    }

    pub fn source_kind(&self, slug: &str) -> Option<SourceKind> {
        self.get(slug).map(|p| p.source_kind)
    }

    /// Slugs to pre-render, in index order.
    pub fn static_paths(&self) -> Vec<&str> {
        self.posts.iter().map(|p| p.slug.as_str()).collect()
    }

    /// Absolute URL of a slug.
    pub fn url(&self, slug: &str) -> String {
        page_url(&self.config.site_url, slug)
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Neighbours of `slug` among published posts. Unknown or unpublished
    /// slugs have no neighbours.
    pub fn previous_and_next(&self, slug: &str) -> Adjacent<'_> {
        let slug = self.rules.normalize(slug);
        let published: Vec<&PostRecord> = self.published().collect();
        let Some(pos) = published.iter().position(|p| p.slug == slug) else {
            return Adjacent::default();
        };
        Adjacent {
            previous: published.get(pos + 1).copied(),
            next: pos.checked_sub(1).and_then(|i| published.get(i)).copied(),
        }
    }

    /// Dynamic records sharing `series`, oldest first. A static post's
    /// `series` header is ignored.
    pub fn series_members(&self, series: &str) -> Vec<&PostRecord> {
        let mut members: Vec<&PostRecord> = self
            .posts
            .iter()
            .filter(|p| p.is_dynamic())
            .filter(|p| p.frontmatter.series.as_deref() == Some(series))
            .collect();
        sort_ascending(&mut members);
        members
    }

    /// Every series name used by a dynamic post, sorted.
    pub fn all_series(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .posts
            .iter()
            .filter(|p| p.is_dynamic())
            .filter_map(|p| p.frontmatter.series.as_deref())
            .collect();
        names.into_iter().collect()
    }

    pub fn series_title<'a>(&'a self, series: &'a str) -> &'a str {
        self.config.series_title(series)
    }

    // -------------------------------------------------------------------------
    // Listings
    // -------------------------------------------------------------------------

    /// Every key word in use, sorted and unique.
    pub fn tags(&self) -> Vec<&str> {
        let tags: BTreeSet<&str> = self
            .posts
            .iter()
            .flat_map(|p| p.frontmatter.key_words.iter().map(String::as_str))
            .collect();
        tags.into_iter().collect()
    }

    pub fn posts_with_tag(&self, tag: &str) -> Vec<&PostRecord> {
        self.posts
            .iter()
            .filter(|p| p.frontmatter.key_words.iter().any(|k| k == tag))
            .collect()
    }

    /// Dynamic posts filed under the top-level category `name`.
    pub fn posts_in_sub_blog(&self, name: &str) -> Vec<&PostRecord> {
        self.posts
            .iter()
            .filter(|p| p.is_dynamic())
            .filter(|p| {
                crate::slug::to_slash_path(&p.source_path)
                    .is_some_and(|path| self.rules.sub_blog_name(&path) == name)
            })
            .collect()
    }

    pub fn total_pages(&self) -> usize {
        self.posts.len().div_ceil(self.config.posts_per_page)
    }

    /// One listing page, 1-based. `None` past the last page.
    pub fn page(&self, number: usize) -> Option<&[PostRecord]> {
        if number == 0 || number > self.total_pages() {
            return None;
        }
        let per_page = self.config.posts_per_page;
        let start = (number - 1) * per_page;
        let end = (start + per_page).min(self.posts.len());
        Some(&self.posts[start..end])
    }

    /// Listing pages beyond the first, which get their own routes.
    pub fn extra_page_numbers(&self) -> Vec<usize> {
        (2..=self.total_pages()).collect()
    }

    // -------------------------------------------------------------------------
    // Fetch
    // -------------------------------------------------------------------------

    /// A dynamic post with its navigation context. `Ok(None)` when the slug
    /// is unknown or names a static post.
    pub fn fetch_dynamic(&self, slug: &str) -> Result<Option<DynamicPost<'_>>, IndexError> {
        let Some(post) = self.get(slug).filter(|p| p.is_dynamic()) else {
            return Ok(None);
        };
        let content = scan::read_body(&self.site_root, &self.config, post)?;

        let series = post
            .frontmatter
            .series
            .as_deref()
            .map(|s| self.series_members(s))
            .unwrap_or_default();
        let neighbors = series_neighbors(post, &series);

        Ok(Some(DynamicPost {
            post,
            content,
            url: self.url(&post.slug),
            adjacent: self.previous_and_next(&post.slug),
            series_title: post.frontmatter.series.as_deref().map(|s| self.series_title(s)),
            is_part_of_series: series.len() > 1,
            previous_series_link: neighbors.previous_link(),
            next_series_link: neighbors.next_link(&post.slug),
            series_neighbors: neighbors,
            series,
            seo_images: self.seo_images(post),
        }))
    }

    /// A static post rendered to HTML. `Ok(None)` when the slug is unknown
    /// or names a dynamic post.
    pub fn fetch_static(&self, slug: &str) -> Result<Option<StaticPost<'_>>, IndexError> {
        let Some(post) = self.get(slug).filter(|p| !p.is_dynamic()) else {
            return Ok(None);
        };
        let body = scan::read_body(&self.site_root, &self.config, post)?;
        Ok(Some(StaticPost {
            post,
            html: render_markdown(&body),
            url: self.url(&post.slug),
            adjacent: self.previous_and_next(&post.slug),
            seo_images: self.seo_images(post),
        }))
    }

    fn seo_images(&self, post: &PostRecord) -> Vec<String> {
        [&post.frontmatter.hero_image_original, &post.frontmatter.hero_image]
            .into_iter()
            .filter(|path| !path.is_empty())
            .map(|path| page_url(&self.config.site_url, path))
            .collect()
    }

    pub fn manifest(&self) -> Manifest<'_> {
        Manifest {
            production: self.production,
            posts: &self.posts,
            static_paths: self.static_paths(),
            extra_pages: self.extra_page_numbers(),
            sub_blogs: &self.sub_blogs,
            assets: &self.assets,
        }
    }
}

/// Split `members` around `post` by date: strictly older members on one
/// side, members dated on or after `post` (itself included) on the other.
/// Both sides are oldest first.
pub fn series_neighbors<'a>(post: &PostRecord, members: &[&'a PostRecord]) -> SeriesNeighbors<'a> {
    let date = post.frontmatter.date;
    let (mut previous_in_series, mut next_in_series): (Vec<&PostRecord>, Vec<&PostRecord>) =
        members.iter().copied().partition(|m| m.frontmatter.date < date);
    sort_ascending(&mut previous_in_series);
    sort_ascending(&mut next_in_series);
    SeriesNeighbors {
        previous_in_series,
        next_in_series,
    }
}

fn sort_ascending(records: &mut [&PostRecord]) {
    records.sort_by(|a, b| {
        a.frontmatter
            .date
            .cmp(&b.frontmatter.date)
            .then_with(|| a.slug.cmp(&b.slug))
    });
}

fn kind_rank(kind: SourceKind) -> u8 {
    match kind {
        SourceKind::Dynamic => 0,
        SourceKind::Static => 1,
    }
}
