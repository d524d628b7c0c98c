//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the content
//! ([`crate::parser`]), grouping it into collections
//! ([`crate::collections`]), rendering pages ([`crate::write`]), and copying
//! the static source directory into the output directory.

use crate::collections::Collection;
use crate::config::{BuildConfig, Config};
use crate::data::SiteData;
use crate::filters;
use crate::parser::{Error as ParseError, Parser as PostParser};
use crate::shortcodes::{Error as ShortcodeError, Icons, Shortcodes};
use crate::write::{Error as WriteError, Writer};
use gtmpl::Template;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Builds the site described by `config`. This calls into
/// [`PostParser::parse_posts`] and [`Writer::write_posts`] which do the
/// heavy-lifting. This function also copies the static assets from the source
/// directory into the root of the output directory.
pub fn build_site(config: &Config, build: &BuildConfig) -> Result<()> {
    let start = Instant::now();
    info!("building site in {} mode", build.mode);

    let icons = Icons::from_directory(&config.icons_directory)?;
    let shortcodes = Shortcodes::with_builtins(icons);
    let url_prefix = build.url_prefix();
    let post_parser = PostParser::new(
        &config.input_directory,
        &config.static_directory,
        &url_prefix,
        &shortcodes,
    );

    // collect all content
    let collection = Collection::new(post_parser.parse_posts()?);
    info!(
        "parsed {} pages ({} posts)",
        collection.all().len(),
        collection.newest_posts().len()
    );

    // Parse the layout files.
    let mut layouts = HashMap::with_capacity(config.layouts.len());
    for (name, files) in &config.layouts {
        debug!("parsing layout `{}`", name);
        layouts.insert(name.clone(), parse_template(files.iter())?);
    }

    // Blow away the old output directory so we don't have any collisions.
    rmdir(&config.output_directory)?;
    std::fs::create_dir_all(&config.output_directory)?;

    let data = SiteData::new(config, build);
    let writer = Writer {
        layouts: &layouts,
        output_directory: &config.output_directory,
        data: &data,
        mode: build.mode,
    };
    writer.write_posts(&collection)?;

    if config.static_directory.is_dir() {
        let copied = copy_dir(&config.static_directory, &config.output_directory)?;
        info!("copied {} static files", copied);
    }

    info!(
        "built `{}` in {}ms",
        config.output_directory.display(),
        start.elapsed().as_millis()
    );
    Ok(())
}

/// Copies the contents of `src` into `dst`, returning the number of files
/// copied.
fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for result in WalkDir::new(src).min_depth(1) {
        let entry = result.map_err(|err| Error::CopyStatic {
            path: src.to_owned(),
            err: err.into(),
        })?;
        // strip_prefix shouldn't fail since `src` is always an ancestor of
        // `entry.path()`
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        let result = match entry.file_type().is_dir() {
            true => std::fs::create_dir_all(&target),
            false => std::fs::copy(entry.path(), &target).map(|_| copied += 1),
        };
        result.map_err(|err| Error::CopyStatic {
            path: entry.path().to_owned(),
            err,
        })?;
    }
    Ok(copied)
}

// Loads the template file contents, concatenates them, and parses the result
// into a template with the filter functions registered.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        let template_file = template_file.as_ref();
        let text = std::fs::read_to_string(template_file).map_err(|e| {
            Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            }
        })?;
        contents.push_str(&text);
        contents.push(' ');
    }

    let mut template = Template::default();
    template.add_funcs(filters::TEMPLATE_FUNCS);
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, writing,
/// cleaning the output directory, parsing template files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors loading icons for the shortcodes.
    Shortcode(ShortcodeError),

    /// Returned for errors writing [`crate::post::Post`]s to disk.
    Write(WriteError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while copying static files.
    CopyStatic { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Shortcode(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::CopyStatic { path, err } => {
                write!(f, "Copying static file '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Shortcode(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::CopyStatic { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<ShortcodeError> for Error {
    /// Converts [`ShortcodeError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: ShortcodeError) -> Error {
        Error::Shortcode(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}
