//! Defines the [`Parser`] and its [`Error`] type: the logic for discovering
//! content files in the input directory and parsing them into [`Post`]s.

use crate::filters;
use crate::post::Post;
use crate::shortcodes::{self, Shortcodes};
use crate::tag::Tag;
use chrono::{DateTime, Local};
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const MARKDOWN_EXTENSION: &str = "md";
const HTML_EXTENSION: &str = "html";

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// `input_directory` is searched recursively for content files.
    input_directory: &'a Path,

    /// `static_directory` is copied verbatim, so it is skipped while
    /// searching for content.
    static_directory: &'a Path,

    /// `url_prefix` is prepended onto every page URL (e.g., `/blog`). It is
    /// empty when the site is served from the root.
    url_prefix: &'a str,

    /// `shortcodes` are expanded in every content file before rendering.
    shortcodes: &'a Shortcodes,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(
        input_directory: &'a Path,
        static_directory: &'a Path,
        url_prefix: &'a str,
        shortcodes: &'a Shortcodes,
    ) -> Parser<'a> {
        Parser {
            input_directory,
            static_directory,
            url_prefix,
            shortcodes,
        }
    }

    /// Searches the input directory for content files (extension `.md` or
    /// `.html`) and parses each into a [`Post`]. Files and directories whose
    /// names begin with `_` or `.` are skipped, as is the static directory.
    /// A content file may open with YAML frontmatter between `---` fences,
    /// with optional fields `title`, `date`, `tags`, `layout`, and
    /// `permalink`; everything after the closing fence is the body. A file
    /// without frontmatter is all body.
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2021-04-16
    /// tags: [post, greet]
    /// layout: post
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    ///
    /// The posts are returned in discovery order; see
    /// [`crate::collections::Collection`] for ordering.
    pub fn parse_posts(&self) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let walker = WalkDir::new(self.input_directory)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry));
        for result in walker {
            let entry = result?;
            if !entry.file_type().is_file() || !Self::is_content(entry.path()) {
                continue;
            }
            // strip_prefix() should never fail since the walk is rooted at
            // `input_directory`
            let relative_path = entry
                .path()
                .strip_prefix(self.input_directory)
                .map_err(|_| InvalidFileNameError(entry.path().to_owned()))?;
            debug!("parsing `{}`", relative_path.display());
            posts.push(self.parse_post(relative_path)?);
        }
        Ok(posts)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('_')
            || name.starts_with('.')
            || entry.path() == self.static_directory
    }

    fn is_content(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some(MARKDOWN_EXTENSION) | Some(HTML_EXTENSION)
        )
    }

    /// Parses a single [`Post`] from the file at `relative_path` (relative to
    /// the input directory), annotating any error with the path.
    pub fn parse_post(&self, relative_path: &Path) -> Result<Post> {
        match self._parse_post(relative_path) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing `{}`", relative_path.display()),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(&self, relative_path: &Path) -> Result<Post> {
        let path = self.input_directory.join(relative_path);
        let contents = std::fs::read_to_string(&path)?;
        let (frontmatter, body) = split_frontmatter(&contents)?;

        let date = match &frontmatter.date {
            Some(date) => filters::parse_date(date).map_err(|err| {
                Error::InvalidDate {
                    date: date.clone(),
                    err,
                }
            })?,
            None => {
                let modified = std::fs::metadata(&path)?.modified()?;
                DateTime::<Local>::from(modified).naive_local().date()
            }
        };

        let output_path =
            output_path(relative_path, frontmatter.permalink.as_deref())?;
        let url = format!("{}{}", self.url_prefix, page_url(&output_path));

        let source = self.shortcodes.expand(body)?;
        let content = match Self::is_markdown(relative_path) {
            true => filters::markdown(&source),
            false => source,
        };

        Ok(Post {
            title: frontmatter.title,
            date,
            tags: frontmatter.tags,
            layout: frontmatter.layout,
            input_path: relative_path.to_owned(),
            output_path,
            url,
            content,
        })
    }

    fn is_markdown(path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some(MARKDOWN_EXTENSION)
    }
}

/// Splits a content file into its frontmatter and body. Frontmatter is
/// optional: a file that doesn't begin with a `---` fence is all body. Once
/// opened, the frontmatter must be closed by `---` on its own line.
fn split_frontmatter(input: &str) -> Result<(Frontmatter, &str)> {
    const FENCE: &str = "---";
    const END_FENCE: &str = "\n---";
    if !input.starts_with(FENCE) {
        return Ok((Frontmatter::default(), input));
    }
    let yaml_start = FENCE.len();
    let yaml_stop = match input[yaml_start..].find(END_FENCE) {
        Some(offset) => yaml_start + offset,
        None => return Err(Error::FrontmatterMissingEndFence),
    };
    let yaml = &input[yaml_start..yaml_stop];
    let frontmatter = match yaml.trim().is_empty() {
        true => Frontmatter::default(),
        false => serde_yaml::from_str(yaml)?,
    };
    let body = input[yaml_stop + END_FENCE.len()..]
        .trim_start_matches(|c: char| c == '\r' || c == '\n');
    Ok((frontmatter, body))
}

/// Computes the output path (relative to the output directory) for a content
/// file. `posts/hello.md` is written to `posts/hello/index.html` so it is
/// served at `posts/hello/`; `index` files keep their directory. A
/// `permalink` overrides this, and one ending in `/` names a directory.
fn output_path(relative_path: &Path, permalink: Option<&str>) -> Result<PathBuf> {
    if let Some(permalink) = permalink {
        let permalink = permalink.trim_start_matches('/');
        let path = match permalink.is_empty() || permalink.ends_with('/') {
            true => Path::new(permalink).join("index.html"),
            false => PathBuf::from(permalink),
        };
        if path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::InvalidPermalink(permalink.to_owned()));
        }
        return Ok(path);
    }

    let stem = relative_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| InvalidFileNameError(relative_path.to_owned()))?;
    let dir = relative_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(match stem {
        "index" => dir.join("index.html"),
        _ => dir.join(stem).join("index.html"),
    })
}

/// Converts an output path into a site-relative URL, dropping a trailing
/// `index.html`.
fn page_url(output_path: &Path) -> String {
    let mut segments: Vec<String> = output_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let directory = segments.last().map_or(false, |last| last == "index.html");
    if directory {
        segments.pop();
    }
    let mut url = format!("/{}", segments.join("/"));
    if directory && !segments.is_empty() {
        url.push('/');
    }
    url
}

#[derive(Deserialize, Clone, Default)]
struct Frontmatter {
    /// The title of the record.
    #[serde(default, alias = "Title")]
    pub title: String,

    /// The publication date (`YYYY-MM-DD`).
    #[serde(default, alias = "Date")]
    pub date: Option<String>,

    /// The tags associated with the record.
    #[serde(default, alias = "Tags", deserialize_with = "Tag::deserialize_set")]
    pub tags: HashSet<Tag>,

    /// The layout the record is rendered with.
    #[serde(default, alias = "Layout")]
    pub layout: Option<String>,

    /// Overrides the output path of the record.
    #[serde(default, alias = "Permalink")]
    pub permalink: Option<String>,
}

#[derive(Debug)]
pub struct InvalidFileNameError(PathBuf);

impl fmt::Display for InvalidFileNameError {
    /// Displays an [`InvalidFileNameError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid file name: {:?}", &self.0)
    }
}

impl std::error::Error for InvalidFileNameError {
    /// Implements the [`std::error::Error`] trait for [`InvalidFileNameError`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a content file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the frontmatter date isn't a `YYYY-MM-DD` date.
    InvalidDate {
        date: String,
        err: chrono::ParseError,
    },

    /// Returned when a permalink would escape the output directory.
    InvalidPermalink(String),

    /// Returned when shortcode expansion fails.
    Shortcode(shortcodes::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned when a source file name isn't valid UTF-8.
    InvalidFileName(InvalidFileNameError),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingEndFence => {
                write!(f, "missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::InvalidDate { date, err } => {
                write!(f, "invalid date `{}`: {}", date, err)
            }
            Error::InvalidPermalink(permalink) => {
                write!(f, "invalid permalink `{}`", permalink)
            }
            Error::Shortcode(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::InvalidFileName(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidDate { date: _, err } => Some(err),
            Error::InvalidPermalink(_) => None,
            Error::Shortcode(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::InvalidFileName(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<InvalidFileNameError> for Error {
    fn from(err: InvalidFileNameError) -> Error {
        Error::InvalidFileName(err)
    }
}

impl From<shortcodes::Error> for Error {
    fn from(err: shortcodes::Error) -> Error {
        Error::Shortcode(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shortcodes::Icons;
    use chrono::NaiveDate;
    use std::fs;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn write(root: &Path, relative_path: &str, contents: &str) -> std::io::Result<()> {
        let path = root.join(relative_path);
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(path, contents)
    }

    #[test]
    fn test_parse_posts() -> TestResult {
        let root = tempfile::tempdir()?;
        let input = root.path();
        write(
            input,
            "posts/hello.md",
            "---\ntitle: Hello\ndate: 2023-06-01\ntags: [post, Rust]\nlayout: post\n---\n# Hi\n\n{% notice \"Note\", \"blue\" %}careful{% endnotice %}\n",
        )?;
        write(input, "index.html", "---\ntitle: Home\ndate: 2020-01-01\n---\n<h1>Home</h1>\n")?;
        write(input, "_includes/post.html", "---\n---\nnot content")?;
        write(input, "static/robots.md", "not content")?;
        write(input, "notes.txt", "not content")?;

        let static_directory = input.join("static");
        let shortcodes = Shortcodes::with_builtins(Icons::default());
        let parser = Parser::new(input, &static_directory, "/blog", &shortcodes);
        let posts = parser.parse_posts()?;
        assert_eq!(2, posts.len());

        let home = &posts[0];
        assert_eq!("Home", home.title);
        assert_eq!(PathBuf::from("index.html"), home.output_path);
        assert_eq!("/blog/", home.url);
        assert_eq!("<h1>Home</h1>\n", home.content);
        assert!(!home.is_post());

        let hello = &posts[1];
        assert_eq!("Hello", hello.title);
        assert_eq!(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(), hello.date);
        assert!(hello.is_post());
        assert!(hello.has_tag("rust"));
        assert_eq!(Some(String::from("post")), hello.layout);
        assert_eq!(PathBuf::from("posts/hello.md"), hello.input_path);
        assert_eq!(PathBuf::from("posts/hello/index.html"), hello.output_path);
        assert_eq!("/blog/posts/hello/", hello.url);
        assert!(hello.content.contains("<h1>Hi</h1>"), "{}", hello.content);
        assert!(
            hello.content.contains(r#"<span class="prose">careful</span>"#),
            "{}",
            hello.content
        );
        Ok(())
    }

    #[test]
    fn test_parse_post_errors() -> TestResult {
        let root = tempfile::tempdir()?;
        let input = root.path();
        write(input, "no-end.md", "---\ntitle: Oops\n")?;
        write(input, "bad-date.md", "---\ndate: June 1st\n---\nbody")?;
        write(input, "bad-shortcode.md", "---\n---\n{% nope %}")?;

        let shortcodes = Shortcodes::new();
        let parser = Parser::new(input, input, "", &shortcodes);

        let inner = |name: &str| match parser.parse_post(Path::new(name)) {
            Err(Error::Annotated(annotation, err)) => {
                assert!(annotation.contains(name), "{}", annotation);
                *err
            }
            Err(e) => panic!("wanted an annotated error; found {}", e),
            Ok(_) => panic!("wanted an error parsing `{}`", name),
        };
        assert!(matches!(
            inner("no-end.md"),
            Error::FrontmatterMissingEndFence
        ));
        assert!(matches!(inner("bad-date.md"), Error::InvalidDate { .. }));
        assert!(matches!(inner("bad-shortcode.md"), Error::Shortcode(_)));
        Ok(())
    }

    #[test]
    fn test_frontmatter_is_optional() -> TestResult {
        let root = tempfile::tempdir()?;
        write(root.path(), "notes.md", "# Notes\n\nNo frontmatter.\n")?;
        let shortcodes = Shortcodes::new();
        let parser = Parser::new(root.path(), root.path(), "", &shortcodes);
        let notes = parser.parse_post(Path::new("notes.md"))?;
        assert_eq!("", notes.title);
        assert!(notes.tags.is_empty());
        assert_eq!(None, notes.layout);
        assert_eq!("<h1>Notes</h1>\n<p>No frontmatter.</p>\n", notes.content);
        assert_eq!("/notes/", notes.url);
        Ok(())
    }

    #[test]
    fn test_timestamp_dates() -> TestResult {
        let root = tempfile::tempdir()?;
        write(
            root.path(),
            "launch.md",
            "---\ntitle: Launch\ndate: 2023-06-01T10:00:00Z\n---\nLaunched.",
        )?;
        let shortcodes = Shortcodes::new();
        let parser = Parser::new(root.path(), root.path(), "", &shortcodes);
        let post = parser.parse_post(Path::new("launch.md"))?;
        assert_eq!(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(), post.date);
        Ok(())
    }

    #[test]
    fn test_split_frontmatter() -> Result<()> {
        let (frontmatter, body) = split_frontmatter("---\ntitle: Hi\n---\r\n\nBody")?;
        assert_eq!("Hi", frontmatter.title);
        assert_eq!("Body", body);

        let (frontmatter, body) = split_frontmatter("---\n---\nBody")?;
        assert_eq!("", frontmatter.title);
        assert_eq!("Body", body);

        let (_, body) = split_frontmatter("Just text.\n")?;
        assert_eq!("Just text.\n", body);

        assert!(matches!(
            split_frontmatter("---\ntitle: Hi\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
        Ok(())
    }

    #[test]
    fn test_missing_date_defaults_to_modification_date() -> TestResult {
        let root = tempfile::tempdir()?;
        write(root.path(), "about.md", "---\ntitle: About\n---\nMe.")?;
        let shortcodes = Shortcodes::new();
        let parser = Parser::new(root.path(), root.path(), "", &shortcodes);
        let post = parser.parse_post(Path::new("about.md"))?;
        let modified = fs::metadata(root.path().join("about.md"))?.modified()?;
        assert_eq!(
            DateTime::<Local>::from(modified).naive_local().date(),
            post.date
        );
        Ok(())
    }

    #[test]
    fn test_output_path() -> Result<()> {
        assert_eq!(
            PathBuf::from("posts/a/index.html"),
            output_path(Path::new("posts/a.md"), None)?
        );
        assert_eq!(
            PathBuf::from("posts/index.html"),
            output_path(Path::new("posts/index.md"), None)?
        );
        assert_eq!(
            PathBuf::from("404.html"),
            output_path(Path::new("404.md"), Some("/404.html"))?
        );
        assert_eq!(
            PathBuf::from("archive/index.html"),
            output_path(Path::new("archive.md"), Some("archive/"))?
        );
        assert!(output_path(Path::new("a.md"), Some("../escape.html")).is_err());
        Ok(())
    }

    #[test]
    fn test_page_url() {
        assert_eq!("/", page_url(Path::new("index.html")));
        assert_eq!("/posts/a/", page_url(Path::new("posts/a/index.html")));
        assert_eq!("/404.html", page_url(Path::new("404.html")));
    }
}
