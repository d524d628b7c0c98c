//! Markdown rendering. Raw HTML in the source is passed through untouched so
//! shortcode output and hand-written markup survive rendering.

use pulldown_cmark::{html, Options, Parser};

/// Converts markdown to HTML, appending the result onto `w`. Tables and
/// strikethrough are enabled; quotes and dashes are left as written. Fenced
/// code blocks are tagged with a `language-{lang}` class for the stylesheet's
/// syntax highlighter.
pub fn to_html(w: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    html::push_html(w, Parser::new_ext(markdown, options));
}
