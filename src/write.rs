use crate::collections::Collection;
use crate::config::Mode;
use crate::data::SiteData;
use crate::minify;
use crate::post::Post;
use gtmpl::{Context, Template, Value};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Responsible for templating and writing HTML pages to disk from [`Post`]
/// sources.
pub struct Writer<'a> {
    /// The parsed layout templates, keyed by layout name.
    pub layouts: &'a HashMap<String, Template>,

    /// The directory in which output files are written. Each post's
    /// `output_path` is relative to it.
    pub output_directory: &'a Path,

    /// The global data made available to every template as `data`.
    pub data: &'a SiteData,

    /// Production builds run every HTML page through the minifier.
    pub mode: Mode,
}

impl Writer<'_> {
    /// Renders a single [`Post`] through its layout. Posts without a layout
    /// are rendered as their content.
    fn render(&self, post: &Post, data: &Value, collections: &Value) -> Result<String> {
        let layout = match &post.layout {
            None => return Ok(post.content.clone()),
            Some(layout) => layout,
        };
        let template = self
            .layouts
            .get(layout)
            .ok_or_else(|| Error::UnknownLayout(layout.clone()))?;

        let mut page = post.to_value();
        if let Value::Object(obj) = &mut page {
            let relative = post.url.trim_start_matches('/');
            let absolute_url = self.data.base_url.join(relative)?;
            obj.insert(
                "absolute_url".to_owned(),
                Value::String(absolute_url.to_string()),
            );
        }

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("page".to_owned(), page);
        m.insert("data".to_owned(), data.clone());
        m.insert("collections".to_owned(), collections.clone());

        let mut rendered: Vec<u8> = Vec::new();
        template.execute(&mut rendered, &Context::from(Value::Object(m))?)?;
        String::from_utf8(rendered).map_err(|e| Error::Template(e.to_string()))
    }

    /// Takes a single [`Post`], templates it, transforms it, and writes it to
    /// disk.
    fn write_page(&self, post: &Post, data: &Value, collections: &Value) -> Result<()> {
        let mut rendered = self.render(post, data, collections)?;
        if self.mode == Mode::Production {
            rendered = minify::transform(rendered, &post.output_path)?;
        }
        let file_path = self.output_directory.join(&post.output_path);
        debug!("writing `{}`", file_path.display());
        std::fs::write(&file_path, rendered)?;
        Ok(())
    }

    /// Writes a page for every record in `collection`.
    pub fn write_posts(&self, collection: &Collection) -> Result<()> {
        let data = self.data.to_value();
        let collections = collection.to_value();
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        collection
            .all()
            .iter()
            .map(|post| {
                let file_path = self.output_directory.join(&post.output_path);
                if let Some(dir) = file_path.parent() {
                    if seen_dirs.insert(dir.to_owned()) {
                        std::fs::create_dir_all(dir)?;
                    }
                }
                self.write_page(post, &data, &collections).map_err(|e| {
                    Error::Annotated(
                        format!("writing `{}`", post.input_path.display()),
                        Box::new(e),
                    )
                })
            })
            .collect()
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// Returned when a post names a layout that isn't configured.
    UnknownLayout(String),

    /// Returned when a page URL can't be joined onto the base URL.
    UrlParse(url::ParseError),

    /// An error minifying a page.
    Minify(minify::Error),

    /// An error writing the output files.
    Io(io::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<minify::Error> for Error {
    fn from(err: minify::Error) -> Error {
        Error::Minify(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::UnknownLayout(layout) => write!(f, "unknown layout `{}`", layout),
            Error::UrlParse(err) => err.fmt(f),
            Error::Minify(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::UnknownLayout(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Minify(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}
