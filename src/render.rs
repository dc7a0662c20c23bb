//! Markdown → HTML for static documents.

use pulldown_cmark::{Options, Parser, html as md_html};

/// GitHub-flavoured extensions used by static posts.
fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_GFM);
    options
}

/// Render a markdown body (frontmatter already removed) to an HTML fragment.
pub fn render_markdown(body: &str) -> String {
    let parser = Parser::new_ext(body, parser_options());
    let mut html = String::with_capacity(body.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_paragraphs() {
        let html = render_markdown("# Title\n\nSome *text*.\n");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>Some <em>text</em>.</p>"));
    }

    #[test]
    fn renders_gfm_tables_and_strikethrough() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn keeps_image_sources() {
        let html = render_markdown("![alt](/opt_images/post/a.webp)");
        assert!(html.contains(r#"<img src="/opt_images/post/a.webp" alt="alt" />"#));
    }
}
