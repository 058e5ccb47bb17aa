//! Markdown to HTML.
//!
//! CommonMark plus tables, footnotes, strikethrough and task lists. Single
//! newlines inside a paragraph become `<br />`, and raw HTML passes through
//! untouched so content files can embed markup.

use pulldown_cmark::{Event, Options, Parser, html};

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render markdown `source` to an HTML fragment.
pub fn to_html(source: &str) -> String {
    let parser = Parser::new_ext(source, options()).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
