//! Shortcodes are small HTML-producing functions invoked from content files
//! before markdown rendering. A shortcode tag looks like
//! `{% gravatar "me@example.org", 64 %}`; a paired shortcode wraps a body,
//! `{% notice "Note", "blue" %}body{% endnotice %}`. Arguments are
//! comma-separated and either double-quoted strings or bare words (e.g.
//! numbers). A backslash before `{%` escapes the tag.
//!
//! [`Shortcodes::with_builtins`] registers the site's shortcodes: `gravatar`,
//! `icon`, and the paired `notice`.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs::read_dir;
use std::path::Path;

const OPEN: &str = "{%";
const CLOSE: &str = "%}";

/// A shortcode implementation. Paired shortcodes receive their raw body.
pub type ShortcodeFn = Box<dyn Fn(&[String], Option<&str>) -> Result<String>>;

enum Kind {
    Single,
    Paired,
}

/// A registry of named shortcodes.
#[derive(Default)]
pub struct Shortcodes(HashMap<String, (Kind, ShortcodeFn)>);

impl Shortcodes {
    pub fn new() -> Self {
        Shortcodes(HashMap::new())
    }

    /// Returns a registry with the site's built-in shortcodes. `icons` backs
    /// the `icon` shortcode.
    pub fn with_builtins(icons: Icons) -> Self {
        let mut shortcodes = Shortcodes::new();
        shortcodes.register("gravatar", |args| match args {
            [email, size] => {
                let size: u32 = size.parse().map_err(|_| {
                    Error::InvalidArguments {
                        name: String::from("gravatar"),
                        message: format!("size must be a number; found `{}`", size),
                    }
                })?;
                Ok(gravatar(email, size))
            }
            _ => Err(Error::arity("gravatar", 2, args.len())),
        });
        shortcodes.register("icon", move |args| match args {
            [name] => icons.get(name),
            _ => Err(Error::arity("icon", 1, args.len())),
        });
        shortcodes.register_paired("notice", |args, body| match args {
            [label, color] => Ok(notice(body, label, color)),
            _ => Err(Error::arity("notice", 2, args.len())),
        });
        shortcodes
    }

    /// Registers a shortcode that takes no body.
    pub fn register<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[String]) -> Result<String> + 'static,
    {
        let func: ShortcodeFn =
            Box::new(move |args: &[String], _: Option<&str>| func(args));
        self.0.insert(name.to_owned(), (Kind::Single, func));
    }

    /// Registers a shortcode that wraps a body and is closed by
    /// `{% end{name} %}`.
    pub fn register_paired<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[String], &str) -> Result<String> + 'static,
    {
        let func: ShortcodeFn =
            Box::new(move |args: &[String], body: Option<&str>| {
                func(args, body.unwrap_or(""))
            });
        self.0.insert(name.to_owned(), (Kind::Paired, func));
    }

    /// Expands every shortcode tag in `content`. Paired bodies are expanded
    /// before they are handed to their shortcode.
    pub fn expand(&self, content: &str) -> Result<String> {
        let mut output = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find(OPEN) {
            if rest[..start].ends_with('\\') {
                output.push_str(&rest[..start - 1]);
                output.push_str(OPEN);
                rest = &rest[start + OPEN.len()..];
                continue;
            }

            output.push_str(&rest[..start]);
            let tag = parse_tag(&rest[start..])?;
            rest = &rest[start + tag.len..];

            if let Some(name) = tag.name.strip_prefix("end") {
                if let Some((Kind::Paired, _)) = self.0.get(name) {
                    return Err(Error::UnexpectedEndTag(tag.name.to_owned()));
                }
            }

            match self.0.get(tag.name) {
                None => {
                    return Err(Error::UnknownShortcode(tag.name.to_owned()))
                }
                Some((Kind::Single, func)) => {
                    output.push_str(&func(&tag.args, None)?);
                }
                Some((Kind::Paired, func)) => {
                    let (body_len, end_len) = find_end_tag(rest, tag.name)?;
                    let body = self.expand(&rest[..body_len])?;
                    output.push_str(&func(&tag.args, Some(&body))?);
                    rest = &rest[body_len + end_len..];
                }
            }
        }

        output.push_str(rest);
        Ok(output)
    }
}

/// A parsed shortcode tag.
struct Tag<'a> {
    name: &'a str,
    args: Vec<String>,

    /// The length of the tag in the source, fences included.
    len: usize,
}

/// Parses the shortcode tag at the start of `input`, which must begin with
/// `{%`.
fn parse_tag(input: &str) -> Result<Tag> {
    let close = input.find(CLOSE).ok_or(Error::Unclosed)?;
    let inner = input[OPEN.len()..close].trim();
    let (name, args) = match inner.find(char::is_whitespace) {
        Some(i) => (&inner[..i], inner[i..].trim()),
        None => (inner, ""),
    };
    if name.is_empty() {
        return Err(Error::EmptyTag);
    }
    Ok(Tag {
        name,
        args: parse_args(name, args)?,
        len: close + CLOSE.len(),
    })
}

/// Finds the `{% end{name} %}` closing a paired tag, skipping over nested
/// tags of the same name. Returns the length of the body and of the end tag.
fn find_end_tag(input: &str, name: &str) -> Result<(usize, usize)> {
    let end_name = format!("end{}", name);
    let mut depth = 0;
    let mut offset = 0;
    while let Some(start) = input[offset..].find(OPEN) {
        let start = offset + start;
        if input[..start].ends_with('\\') {
            offset = start + OPEN.len();
            continue;
        }
        let tag = parse_tag(&input[start..])?;
        if tag.name == name {
            depth += 1;
        } else if tag.name == end_name {
            if depth == 0 {
                return Ok((start, tag.len));
            }
            depth -= 1;
        }
        offset = start + tag.len;
    }
    Err(Error::MissingEndTag(name.to_owned()))
}

/// Splits a comma-separated argument list. Quoted arguments may contain
/// commas and `\"` escapes.
fn parse_args(name: &str, input: &str) -> Result<Vec<String>> {
    let invalid = |message: &str| Error::InvalidArguments {
        name: name.to_owned(),
        message: message.to_owned(),
    };

    let mut args = Vec::new();
    let mut chars = input.chars().peekable();
    loop {
        while chars.peek().map_or(false, |c| c.is_whitespace()) {
            chars.next();
        }
        let mut arg = String::new();
        match chars.peek() {
            None => break,
            Some('"') => {
                chars.next();
                loop {
                    match chars.next() {
                        None => return Err(invalid("unterminated string")),
                        Some('\\') => match chars.next() {
                            Some(c) => arg.push(c),
                            None => {
                                return Err(invalid("unterminated string"))
                            }
                        },
                        Some('"') => break,
                        Some(c) => arg.push(c),
                    }
                }
                while chars.peek().map_or(false, |c| c.is_whitespace()) {
                    chars.next();
                }
            }
            Some(_) => {
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    arg.push(c);
                    chars.next();
                }
                arg = arg.trim_end().to_owned();
                if arg.is_empty() {
                    return Err(invalid("empty argument"));
                }
            }
        }
        args.push(arg);
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(c) => {
                return Err(invalid(&format!(
                    "expected `,` between arguments; found `{}`",
                    c
                )))
            }
        }
    }
    Ok(args)
}

/// Formats an avatar image for `email`. The Gravatar hash is the SHA-256 of
/// the trimmed, lowercased address.
pub fn gravatar(email: &str, size: u32) -> String {
    let hash = hex::encode(Sha256::digest(email.trim().to_lowercase().as_bytes()));
    format!(
        r#"<img src="https://www.gravatar.com/avatar/{}?s={}"/>"#,
        hash, size
    )
}

/// Wraps `content` in a labelled, colored notice box.
pub fn notice(content: &str, label: &str, color: &str) -> String {
    format!(
        r#"<div class="flex flex-col">
    <div class="bg-{color}-200 rounded-t font-bold">
      &nbsp;{label}
    </div>
    <div class="border border-t-0 rounded-b pl-1">
      <span class="prose">{content}</span>
    </div>
  </div>"#,
        color = color,
        label = label,
        content = content,
    )
}

/// Inline SVG icons, keyed by file stem.
#[derive(Default)]
pub struct Icons(HashMap<String, String>);

impl Icons {
    /// Loads every `.svg` file in `dir`. A missing directory yields no icons.
    pub fn from_directory(dir: &Path) -> Result<Icons> {
        let mut icons = HashMap::new();
        if !dir.is_dir() {
            return Ok(Icons(icons));
        }
        for result in read_dir(dir)? {
            let path = result?.path();
            if path.extension().map_or(false, |ext| ext == "svg") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    icons.insert(
                        stem.to_owned(),
                        std::fs::read_to_string(&path)?.trim_end().to_owned(),
                    );
                }
            }
        }
        Ok(Icons(icons))
    }

    pub fn insert(&mut self, name: &str, svg: &str) {
        self.0.insert(name.to_owned(), svg.to_owned());
    }

    fn get(&self, name: &str) -> Result<String> {
        self.0
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownIcon(name.to_owned()))
    }
}

/// The result of a fallible shortcode operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error expanding shortcodes.
#[derive(Debug)]
pub enum Error {
    /// Returned when a `{%` has no matching `%}`.
    Unclosed,

    /// Returned for `{% %}`.
    EmptyTag,

    /// Returned when a tag names a shortcode that isn't registered.
    UnknownShortcode(String),

    /// Returned when a paired shortcode has no `{% end... %}` tag.
    MissingEndTag(String),

    /// Returned for an `{% end... %}` tag with no opening tag.
    UnexpectedEndTag(String),

    /// Returned when a shortcode is called with bad arguments.
    InvalidArguments { name: String, message: String },

    /// Returned when the `icon` shortcode names an unknown icon.
    UnknownIcon(String),

    /// Returned for I/O errors loading icons.
    Io(std::io::Error),
}

impl Error {
    fn arity(name: &str, wanted: usize, found: usize) -> Error {
        Error::InvalidArguments {
            name: name.to_owned(),
            message: format!("wanted {} arguments; found {}", wanted, found),
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Unclosed => write!(f, "shortcode is missing its closing `%}}`"),
            Error::EmptyTag => write!(f, "empty shortcode tag"),
            Error::UnknownShortcode(name) => {
                write!(f, "unknown shortcode `{}`", name)
            }
            Error::MissingEndTag(name) => {
                write!(f, "shortcode `{}` is missing `{{% end{} %}}`", name, name)
            }
            Error::UnexpectedEndTag(name) => {
                write!(f, "unexpected `{{% {} %}}`", name)
            }
            Error::InvalidArguments { name, message } => {
                write!(f, "shortcode `{}`: {}", name, message)
            }
            Error::UnknownIcon(name) => write!(f, "unknown icon `{}`", name),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
