//! The HTML transform run over rendered pages on production builds. It removes
//! comments, collapses whitespace, and shortens the doctype. Whitespace inside
//! `pre`, `textarea`, `script`, and `style` elements is left alone.

use lol_html::html_content::ContentType;
use lol_html::{doc_comments, doc_text, element, rewrite_str, RewriteStrSettings};
use std::cell::Cell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

const SHORT_DOCTYPE: &str = "<!DOCTYPE html>";

/// Stands in for a whitespace-only line break between two tags until the
/// tags on either side are known. A private-use code point, so it never
/// collides with page text.
const LINE_BREAK: char = '\u{E000}';

/// Elements next to which line-break whitespace is insignificant.
const BLOCK_TAGS: &[&str] = &[
    "!doctype", "address", "article", "aside", "blockquote", "body", "br",
    "dd", "details", "div", "dl", "dt", "figcaption", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "html",
    "li", "link", "main", "meta", "nav", "ol", "p", "pre", "script", "section",
    "style", "summary", "table", "tbody", "td", "tfoot", "th", "thead",
    "title", "tr", "ul",
];

/// Minifies `content` if `output_path` is an HTML file; any other output is
/// returned unchanged.
pub fn transform(content: String, output_path: &Path) -> Result<String> {
    match output_path.extension() {
        Some(ext) if ext == "html" => minify(&content),
        _ => Ok(content),
    }
}

/// Minifies an HTML document.
pub fn minify(html: &str) -> Result<String> {
    let html = shorten_doctype(html);

    // Depth of elements whose whitespace is significant.
    let preserve = Rc::new(Cell::new(0usize));
    let opened = Rc::clone(&preserve);
    let in_text = Rc::clone(&preserve);

    let output = rewrite_str(
        &html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(
                "pre, textarea, script, style",
                move |el| {
                    if let Some(handlers) = el.end_tag_handlers() {
                        let closed = Rc::clone(&opened);
                        handlers.push(Box::new(move |_end| {
                            closed.set(closed.get().saturating_sub(1));
                            Ok(())
                        }));
                        opened.set(opened.get() + 1);
                    }
                    Ok(())
                }
            )],
            document_content_handlers: vec![
                doc_comments!(|c| {
                    c.remove();
                    Ok(())
                }),
                doc_text!(move |t| {
                    if in_text.get() > 0 {
                        return Ok(());
                    }
                    let text = t.as_str();
                    if text.is_empty() || !text.contains(char::is_whitespace) {
                        return Ok(());
                    }
                    let collapsed = collapse_whitespace(text);
                    t.replace(&collapsed, ContentType::Html);
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(resolve_line_breaks(&output))
}

/// Collapses runs of whitespace into a single space. Whitespace-only text
/// spanning a line break becomes a [`LINE_BREAK`] placeholder, resolved by
/// [`resolve_line_breaks`] once the surrounding tags are known.
fn collapse_whitespace(text: &str) -> String {
    if text.trim().is_empty() && text.contains('\n') {
        return LINE_BREAK.to_string();
    }

    let mut collapsed = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
            }
            in_whitespace = true;
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }
    collapsed
}

/// Drops each run of [`LINE_BREAK`] placeholders that touches a block-level
/// tag or either end of the document, and turns the rest (line breaks
/// between inline elements) into a single space.
fn resolve_line_breaks(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find(LINE_BREAK) {
        output.push_str(&rest[..start]);
        rest = rest[start..].trim_start_matches(LINE_BREAK);

        let before = output.is_empty()
            || (output.ends_with('>')
                && output.rfind('<').map_or(false, |i| is_block_tag(&output[i..])));
        let after = rest.is_empty() || (rest.starts_with('<') && is_block_tag(rest));
        if !(before || after) {
            output.push(' ');
        }
    }
    output.push_str(rest);
    output
}

/// Returns true if `tag`, which starts with `<`, opens or closes a block-level
/// element.
fn is_block_tag(tag: &str) -> bool {
    let name: String = tag[1..]
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '!' || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    BLOCK_TAGS.contains(&name.as_str())
}

/// Replaces a leading doctype declaration with `<!DOCTYPE html>`.
fn shorten_doctype(html: &str) -> String {
    let trimmed = html.trim_start();
    let is_doctype = trimmed
        .get(..9)
        .map_or(false, |start| start.eq_ignore_ascii_case("<!doctype"));
    if is_doctype {
        if let Some(end) = trimmed.find('>') {
            return format!("{}{}", SHORT_DOCTYPE, &trimmed[end + 1..]);
        }
    }
    html.to_owned()
}

/// The result of a fallible minification.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error rewriting an HTML document.
#[derive(Debug)]
pub struct Error(lol_html::errors::RewritingError);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "minifying HTML: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<lol_html::errors::RewritingError> for Error {
    fn from(err: lol_html::errors::RewritingError) -> Error {
        Error(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_minify() -> Result<()> {
        let html = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\">\n\
                    <html>\n  <body>\n    <!-- nav -->\n    <p>Hello,   \n   world</p>\n  </body>\n</html>\n";
        assert_eq!(
            "<!DOCTYPE html><html><body><p>Hello, world</p></body></html>",
            minify(html)?
        );
        Ok(())
    }

    #[test]
    fn test_minify_keeps_inline_spaces() -> Result<()> {
        assert_eq!(
            "<p><a>one</a> <b>two</b></p>",
            minify("<p><a>one</a> <b>two</b></p>")?
        );
        Ok(())
    }

    #[test]
    fn test_minify_keeps_line_breaks_between_inline_elements() -> Result<()> {
        let html = crate::filters::markdown("*alpha*\n*beta*");
        assert_eq!("<p><em>alpha</em> <em>beta</em></p>", minify(&html)?);
        assert_eq!(
            "<ul><li><a>one</a> <a>two</a></li></ul>",
            minify("<ul>\n  <li>\n    <a>one</a>\n    <a>two</a>\n  </li>\n</ul>\n")?
        );
        Ok(())
    }

    #[test]
    fn test_resolve_line_breaks() {
        let br = LINE_BREAK.to_string();
        assert_eq!("", resolve_line_breaks(&br));
        assert_eq!(
            "<div><b>x</b> <i>y</i></div>",
            resolve_line_breaks(&format!("<div>{0}<b>x</b>{0}{0}<i>y</i>{0}</div>", br))
        );
        assert_eq!("a <b>c</b>", resolve_line_breaks(&format!("a{}<b>c</b>", br)));
    }

    #[test]
    fn test_minify_preserves_pre() -> Result<()> {
        let html = "<div>\n  <pre><code>fn main() {\n    println!();\n}</code></pre>\n</div>";
        assert_eq!(
            "<div><pre><code>fn main() {\n    println!();\n}</code></pre></div>",
            minify(html)?
        );
        Ok(())
    }

    #[test]
    fn test_transform_skips_non_html() -> Result<()> {
        let css = String::from("body {\n  margin: 0;\n}\n");
        assert_eq!(css, transform(css.clone(), Path::new("styles/site.css"))?);
        assert_eq!(
            "<p>a b</p>",
            transform(String::from("<p>a\n\tb</p>"), Path::new("index.html"))?
        );
        Ok(())
    }
}
