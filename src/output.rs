//! CLI output formatting.
//!
//! Posts are shown by identity first (position, date, title) with their slug
//! and source as indented context lines:
//!
//! ```text
//! Posts
//! 001 2023-02-13 Running Go in Node
//!     Slug: blog/software/2023/2/node_golang_wasm
//!     Source: content/software/2023/1_node_golang_wasm/index.mdx (dynamic)
//! 002 1988-06-03 My post [draft]
//!     Slug: blog/1988/6/mypost
//!     Source: static-content/mypost.md (static)
//!
//! 2 posts (1 published), 3 pages, 4 images
//! ```
//!
//! Each report has a pure `format_*` function returning lines and a `print_*`
//! wrapper that writes them to stdout.

use crate::index::{ContentIndex, DynamicPost, StaticPost};
use crate::types::PostRecord;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Header line for a post: index, ISO date, title, and status markers.
fn post_header(pos: usize, post: &PostRecord) -> String {
    let mut line = format!(
        "{} {} {}",
        format_index(pos),
        post.frontmatter.date,
        post.frontmatter.title
    );
    if !post.is_published() {
        line.push_str(" [draft]");
    }
    if post.frontmatter.test {
        line.push_str(" [test]");
    }
    line
}

fn post_context(post: &PostRecord) -> Vec<String> {
    let mut lines = vec![
        format!("    Slug: {}", post.slug),
        format!(
            "    Source: {} ({})",
            post.source_path.display(),
            post.source_kind
        ),
    ];
    if let Some(series) = &post.frontmatter.series {
        lines.push(format!("    Series: {series}"));
    }
    lines
}

/// Every post in the index followed by a summary line.
pub fn format_index_output(index: &ContentIndex) -> Vec<String> {
    let mut lines = vec!["Posts".to_string()];
    for (i, post) in index.posts().iter().enumerate() {
        lines.push(post_header(i + 1, post));
        lines.extend(post_context(post));
    }

    if !index.sub_blogs().is_empty() {
        lines.push(String::new());
        lines.push("Sub-blogs".to_string());
        for (i, blog) in index.sub_blogs().iter().enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), blog.title));
            lines.push(format!("    Source: {}/", blog.path.display()));
            let desc = truncate_desc(blog.description.trim(), 60);
            if !desc.is_empty() {
                lines.push(format!("    {desc}"));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} ({} published), {}, {}",
        plural(index.len(), "post"),
        index.published().count(),
        plural(index.total_pages(), "page"),
        plural(index.assets().len(), "image"),
    ));
    lines
}

pub fn print_index_output(index: &ContentIndex) {
    for line in format_index_output(index) {
        println!("{}", line);
    }
}

/// One path per line.
pub fn format_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    paths.into_iter().map(str::to_string).collect()
}

pub fn print_paths<'a>(paths: impl IntoIterator<Item = &'a str>) {
    for line in format_paths(paths) {
        println!("{}", line);
    }
}

/// Result of `check`: counts plus every image reference without a source file.
pub fn format_check_output(index: &ContentIndex) -> Vec<String> {
    let mut lines = vec![format!(
        "OK: {} ({} dynamic, {} static)",
        plural(index.len(), "post"),
        index.posts().iter().filter(|p| p.is_dynamic()).count(),
        index.posts().iter().filter(|p| !p.is_dynamic()).count(),
    )];
    let missing: Vec<_> = index.assets().missing().collect();
    if !missing.is_empty() {
        lines.push(format!("Missing images ({})", missing.len()));
        for asset in missing {
            lines.push(format!("    {}", asset.source.display()));
            for document in &asset.documents {
                lines.push(format!("        Referenced by: {}", document.display()));
            }
        }
    }
    lines
}

pub fn print_check_output(index: &ContentIndex) {
    for line in format_check_output(index) {
        println!("{}", line);
    }
}

fn neighbour_line(label: &str, post: Option<&PostRecord>) -> Option<String> {
    post.map(|p| format!("    {label}: {} ({})", p.frontmatter.title, p.slug))
}

/// Detail view of a dynamic post.
pub fn format_dynamic_post(view: &DynamicPost<'_>) -> Vec<String> {
    let fm = &view.post.frontmatter;
    let mut lines = vec![
        format!("{} ({})", fm.title, fm.display_date),
        format!("    URL: {}", view.url),
    ];
    lines.extend(post_context(view.post).into_iter().skip(1));
    lines.extend(fm.description.iter().map(|d| format!("    {}", truncate_desc(d, 60))));
    if !fm.key_words.is_empty() {
        lines.push(format!("    Tags: {}", fm.key_words.join(", ")));
    }
    lines.extend(neighbour_line("Previous", view.adjacent.previous));
    lines.extend(neighbour_line("Next", view.adjacent.next));

    if view.is_part_of_series {
        let title = view.series_title.unwrap_or_default();
        lines.push(format!("    Series: {} ({})", title, plural(view.series.len(), "part")));
        for (i, member) in view.series.iter().enumerate() {
            let marker = if member.slug == view.post.slug { " <" } else { "" };
            lines.push(format!(
                "        {} {}{}",
                format_index(i + 1),
                member.frontmatter.title,
                marker
            ));
        }
    }
    for image in &view.seo_images {
        lines.push(format!("    Image: {image}"));
    }
    lines
}

/// Detail view of a static post.
pub fn format_static_post(view: &StaticPost<'_>) -> Vec<String> {
    let fm = &view.post.frontmatter;
    let mut lines = vec![
        format!("{} ({})", fm.title, fm.display_date),
        format!("    URL: {}", view.url),
    ];
    lines.extend(post_context(view.post).into_iter().skip(1));
    lines.extend(neighbour_line("Previous", view.adjacent.previous));
    lines.extend(neighbour_line("Next", view.adjacent.next));
    lines.push(format!("    Rendered: {} bytes of HTML", view.html.len()));
    lines
}

/// Every tag with the number of posts carrying it.
pub fn format_tags_output(index: &ContentIndex) -> Vec<String> {
    index
        .tags()
        .into_iter()
        .map(|tag| format!("{tag} ({})", plural(index.posts_with_tag(tag).len(), "post")))
        .collect()
}

pub fn print_tags_output(index: &ContentIndex) {
    for line in format_tags_output(index) {
        println!("{}", line);
    }
}

/// Every series with its members, oldest first.
pub fn format_series_output(index: &ContentIndex) -> Vec<String> {
    let mut lines = Vec::new();
    for series in index.all_series() {
        lines.push(format!("{} [{}]", index.series_title(series), series));
        for (i, member) in index.series_members(series).iter().enumerate() {
            lines.push(format!("    {}", post_header(i + 1, member)));
        }
    }
    lines
}

pub fn print_series_output(index: &ContentIndex) {
    for line in format_series_output(index) {
        println!("{}", line);
    }
}

pub fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::test_helpers::*;
    use crate::types::SourceKind;
    use std::path::Path;

    fn sample_index() -> ContentIndex {
        ContentIndex::from_records(
            Path::new("."),
            &SiteConfig::default(),
            false,
            vec![
                record("blog/software/2023/2/wasm", "2023-02-13")
                    .series("wasm")
                    .key_words(&["go", "wasm"])
                    .content(""),
                record("blog/1988/6/mypost", "1988-06-03")
                    .kind(SourceKind::Static)
                    .draft(),
                record("blog/software/2023/3/wasm-two", "2023-03-01")
                    .series("wasm")
                    .key_words(&["wasm"])
                    .content(""),
            ],
        )
    }

    #[test]
    fn truncate_desc_short() {
        assert_eq!(truncate_desc("Short text", 40), "Short text");
    }

    #[test]
    fn truncate_desc_exact() {
        let text = "a".repeat(40);
        assert_eq!(truncate_desc(&text, 40), text);
    }

    #[test]
    fn truncate_desc_long_multibyte() {
        let text = "é".repeat(50);
        assert_eq!(truncate_desc(&text, 40), format!("{}...", "é".repeat(40)));
    }

    #[test]
    fn index_output_lists_posts_newest_first() {
        let lines = format_index_output(&sample_index());
        assert_eq!(lines[0], "Posts");
        assert_eq!(lines[1], "001 2023-03-01 wasm-two");
        assert_eq!(lines[2], "    Slug: blog/software/2023/3/wasm-two");
        assert!(lines.contains(&"003 1988-06-03 mypost [draft]".to_string()));
        assert!(lines.contains(&"    Source: static-content/mypost.md (static)".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "3 posts (2 published), 1 page, 0 images"
        );
    }

    #[test]
    fn paths_one_per_line() {
        let index = sample_index();
        assert_eq!(
            format_paths(index.static_paths()),
            vec![
                "blog/software/2023/3/wasm-two",
                "blog/software/2023/2/wasm",
                "blog/1988/6/mypost"
            ]
        );
    }

    #[test]
    fn check_output_counts_kinds() {
        let lines = format_check_output(&sample_index());
        assert_eq!(lines, vec!["OK: 3 posts (2 dynamic, 1 static)"]);
    }

    #[test]
    fn dynamic_post_shows_series() {
        let index = sample_index();
        let view = index.fetch_dynamic("blog/software/2023/2/wasm").unwrap().unwrap();
        let lines = format_dynamic_post(&view);
        assert_eq!(lines[0], "wasm (February 13, 2023)");
        assert!(lines.contains(&"    Tags: go, wasm".to_string()));
        assert!(lines.contains(&"    Series: wasm (2 parts)".to_string()));
        assert!(lines.contains(&"        001 wasm <".to_string()));
        assert!(lines.contains(&"    Next: wasm-two (blog/software/2023/3/wasm-two)".to_string()));
    }

    #[test]
    fn tags_with_counts() {
        assert_eq!(
            format_tags_output(&sample_index()),
            vec!["go (1 post)", "wasm (2 posts)"]
        );
    }

    #[test]
    fn series_lists_members_oldest_first() {
        let lines = format_series_output(&sample_index());
        assert_eq!(
            lines,
            vec![
                "wasm [wasm]",
                "    001 2023-02-13 wasm",
                "    002 2023-03-01 wasm-two",
            ]
        );
    }
}
