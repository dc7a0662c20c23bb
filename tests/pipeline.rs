//! End-to-end tests: a site tree on disk, through both readers, into the index.

use postindex::config::{SiteConfig, load_config};
use postindex::frontmatter::FrontmatterError;
use postindex::index::{ContentIndex, IndexError, IndexOptions};
use postindex::scan::ScanError;
use postindex::types::SourceKind;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn doc(title: &str, date: &str, extra: &str) -> String {
    format!("---\ntitle: {title}\ndate: {date}\npublished: true\n{extra}---\nBody of {title}.\n")
}

fn build(root: &Path, production: bool) -> Result<ContentIndex, IndexError> {
    let config = load_config(root).unwrap();
    ContentIndex::build(
        root,
        &config,
        IndexOptions {
            production,
            include_content: false,
        },
    )
}

/// A small blog: a three-part series, a legacy post, a static post, a draft
/// and a test post.
fn sample_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "content/software/metadata.json",
        r#"{"title": "Software", "description": "Programming notes"}"#,
    );
    write(
        root,
        "content/software/2023/1_node_golang_wasm/index.mdx",
        &doc(
            "Running Go in Node",
            "2023-02-13",
            "series: wasm\nkey_words: go, wasm, node\nhero_image: ./hero.png\n",
        ),
    );
    write(root, "content/software/2023/1_node_golang_wasm/hero.png", "png");
    write(
        root,
        "content/software/2023/3_wasm_threads/index.mdx",
        &doc("Wasm threads", "2023-03-20", "series: wasm\nkey_words: [wasm]\n"),
    );
    write(
        root,
        "content/software/2022/12_wasm_intro/index.mdx",
        &doc("Wasm intro", "2022-12-01", "series: wasm\n"),
    );
    write(
        root,
        "content/life/2015/6_old_post/index.md",
        &doc("Old post", "2015-06-10", "legacy: true\n"),
    );
    write(
        root,
        "content/life/2024/1_unfinished/index.mdx",
        "---\ntitle: Unfinished\ndate: 2024-01-05\npublished: false\n---\n",
    );
    write(
        root,
        "static-content/mypost.md",
        &doc("My post", "1988-06-03", ""),
    );
    write(
        root,
        "static-content/draft.md",
        "---\ntitle: Draft\ndate: 2024-02-01\npublished: false\n---\n# Draft\n",
    );
    write(
        root,
        "static-content/smoke.md",
        &doc("Smoke test", "2024-03-01", "test: true\n"),
    );
    tmp
}

#[test]
fn builds_sorted_index_from_both_roots() {
    let site = sample_site();
    let index = build(site.path(), false).unwrap();

    assert_eq!(
        index.static_paths(),
        vec![
            "blog/2024/3/smoke",
            "blog/2024/2/draft",
            "blog/software/2023/3/wasm_threads",
            "blog/software/2023/2/node_golang_wasm",
            "blog/software/2022/12/wasm_intro",
            "blog/2015/6/old_post",
            "blog/1988/6/mypost",
        ]
    );
    assert_eq!(index.source_kind("blog/1988/6/mypost"), Some(SourceKind::Static));
    assert!(index.is_dynamic_post("software/2023/2/node_golang_wasm"));
    assert!(!index.is_post("blog/life/2024/1/unfinished"));
    assert_eq!(index.sub_blogs().len(), 1);
    assert_eq!(index.sub_blogs()[0].title, "Software");
}

#[test]
fn production_drops_test_and_draft_posts() {
    let site = sample_site();
    let index = build(site.path(), true).unwrap();
    for post in index.posts() {
        assert!(!post.frontmatter.test, "{} is a test post", post.slug);
        assert!(post.is_published(), "{} is a draft", post.slug);
    }
    assert_eq!(index.len(), 5);
}

#[test]
fn config_file_enables_production() {
    let site = sample_site();
    write(site.path(), "config.toml", "production = true\n");
    let config = load_config(site.path()).unwrap();
    assert!(config.production);
}

#[test]
fn navigation_over_published_posts() {
    let site = sample_site();
    let index = build(site.path(), false).unwrap();

    let newest = index.published().next().unwrap();
    assert_eq!(newest.slug, "blog/2024/3/smoke");
    assert!(index.previous_and_next(&newest.slug).next.is_none());

    let threads = index.previous_and_next("blog/software/2023/3/wasm_threads");
    assert_eq!(threads.next.map(|p| p.slug.as_str()), Some("blog/2024/3/smoke"));
    assert_eq!(
        threads.previous.map(|p| p.slug.as_str()),
        Some("blog/software/2023/2/node_golang_wasm")
    );

    let oldest = index.previous_and_next("blog/1988/6/mypost");
    assert!(oldest.previous.is_none());
}

#[test]
fn dynamic_fetch_has_series_and_images() {
    let site = sample_site();
    let config = SiteConfig {
        site_url: "https://example.dev".to_string(),
        ..load_config(site.path()).unwrap()
    };
    let index = ContentIndex::build(site.path(), &config, IndexOptions::default()).unwrap();

    let post = index
        .fetch_dynamic("blog/software/2023/2/node_golang_wasm")
        .unwrap()
        .unwrap();
    assert!(post.is_part_of_series);
    assert_eq!(post.series.len(), 3);
    assert_eq!(post.previous_series_link, Some("blog/software/2022/12/wasm_intro"));
    assert_eq!(post.next_series_link, Some("blog/software/2023/3/wasm_threads"));
    assert_eq!(post.url, "https://example.dev/blog/software/2023/2/node_golang_wasm");
    assert_eq!(
        post.seo_images,
        vec![
            "https://example.dev/opt_images/content/software/2023/1_node_golang_wasm/hero.png",
            "https://example.dev/opt_images/content/software/2023/1_node_golang_wasm/hero.webp",
        ]
    );
    assert_eq!(post.content, "Body of Running Go in Node.\n");
    assert_eq!(post.post.frontmatter.key_words, vec!["go", "wasm", "node"]);
}

#[test]
fn static_fetch_renders_html() {
    let site = sample_site();
    let index = build(site.path(), false).unwrap();
    let draft = index.fetch_static("2024/2/draft").unwrap().unwrap();
    assert!(draft.html.contains("<h1>Draft</h1>"));
    assert!(index.fetch_dynamic("blog/2024/2/draft").unwrap().is_none());
    assert!(draft.adjacent.previous.is_none() && draft.adjacent.next.is_none());

    let mypost = index.fetch_static("blog/1988/6/mypost").unwrap().unwrap();
    assert!(mypost.adjacent.previous.is_none());
    assert_eq!(
        mypost.adjacent.next.map(|p| p.slug.as_str()),
        Some("blog/2015/6/old_post")
    );
}

#[test]
fn dynamic_wins_collision_with_static() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "content/life/1988/3_mypost/index.mdx",
        &doc("Dynamic", "1988-06-03", "legacy: true\n"),
    );
    write(tmp.path(), "static-content/mypost.md", &doc("Static", "1988-06-03", ""));

    let index = build(tmp.path(), false).unwrap();
    assert_eq!(index.len(), 1);
    let post = index.get("blog/1988/6/mypost").unwrap();
    assert_eq!(post.source_kind, SourceKind::Dynamic);
    assert_eq!(post.frontmatter.title, "Dynamic");
}

#[test]
fn missing_date_aborts_the_build() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "content/life/2020/1_ok/index.mdx",
        &doc("Fine", "2020-01-01", ""),
    );
    write(
        tmp.path(),
        "content/life/2020/2_broken/index.mdx",
        "---\ntitle: Broken\npublished: true\n---\n",
    );

    let err = build(tmp.path(), false).unwrap_err();
    match err {
        IndexError::Scan(ScanError::Frontmatter(FrontmatterError::Invalid(invalid))) => {
            assert_eq!(invalid.fields(), vec!["date"]);
            assert!(invalid.path.ends_with("2_broken/index.mdx"));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn empty_site_builds_empty_index() {
    let tmp = TempDir::new().unwrap();
    let index = build(tmp.path(), true).unwrap();
    assert!(index.is_empty());
    assert!(index.static_paths().is_empty());
}

#[test]
fn manifest_serializes_posts_and_assets() {
    let site = sample_site();
    let index = build(site.path(), false).unwrap();
    let json = serde_json::to_value(index.manifest()).unwrap();
    assert_eq!(json["posts"].as_array().unwrap().len(), 7);
    assert_eq!(json["posts"][0]["source_kind"], "static");
    assert_eq!(json["posts"][0]["frontmatter"]["date"], "2024-03-01");
    assert_eq!(json["extra_pages"], serde_json::json!([2]));
}
