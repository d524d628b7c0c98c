//! Loads the site configuration ([`Config`]) from a `site.yaml` project file
//! and defines the per-invocation [`BuildConfig`].

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "site.yaml";

/// The directory (relative to the input directory) holding layout templates.
pub const INCLUDES_DIRECTORY: &str = "_includes";

/// Whether a build is for local development or for publishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Development
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "development" => Ok(Mode::Development),
            "production" => Ok(Mode::Production),
            _ => Err(Error::InvalidMode(s.to_owned())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

/// Settings for a single build invocation. These are supplied by the caller
/// (see `main.rs`) rather than read from the process environment.
#[derive(Clone, Debug, Default)]
pub struct BuildConfig {
    /// Production builds use the production base URL and minify HTML.
    pub mode: Mode,

    /// A path segment prepended to every page URL, e.g. the repository name
    /// when the site is served from a project page.
    pub path_prefix: Option<String>,
}

impl BuildConfig {
    /// Returns the path prefix as `/{prefix}` with surrounding slashes
    /// trimmed, or the empty string if there is none.
    pub fn url_prefix(&self) -> String {
        match self.path_prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("/{}", prefix),
            _ => String::new(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct BaseUrls {
    production: Url,
    development: Url,
}

#[derive(Deserialize)]
struct Project {
    title: String,

    #[serde(default)]
    author: Option<Author>,

    base_url: BaseUrls,

    #[serde(default = "default_input_directory")]
    input_directory: PathBuf,

    #[serde(default = "default_output_directory")]
    output_directory: PathBuf,

    #[serde(default = "default_static_directory")]
    static_directory: PathBuf,

    #[serde(default = "default_icons_directory")]
    icons_directory: PathBuf,

    #[serde(default)]
    layouts: HashMap<String, Vec<PathBuf>>,
}

fn default_input_directory() -> PathBuf {
    PathBuf::from("src")
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("public")
}

fn default_static_directory() -> PathBuf {
    PathBuf::from("static")
}

fn default_icons_directory() -> PathBuf {
    PathBuf::from("_icons")
}

/// The resolved site configuration. All paths are absolute or relative to the
/// working directory (i.e., already joined onto the project root).
pub struct Config {
    pub title: String,
    pub author: Option<Author>,
    pub production_url: Url,
    pub development_url: Url,
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,

    /// Copied verbatim into the root of the output directory.
    pub static_directory: PathBuf,

    /// Holds the SVG files served by the `icon` shortcode.
    pub icons_directory: PathBuf,

    /// Maps layout names to the template files that make them up, in the
    /// order they are concatenated before parsing.
    pub layouts: HashMap<String, Vec<PathBuf>>,
}

impl Config {
    /// Searches `dir` and its ancestors for a `site.yaml` project file and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            let path = dir.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            current = dir.parent();
        }
        Err(Error::ProjectFileNotFound(dir.to_owned()))
    }

    /// Loads the project file at `path`. Relative directories in the file are
    /// resolved against the file's parent directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::OpenProjectFile {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_reader(file)?;
        let project_root = path
            .parent()
            .ok_or_else(|| Error::ProjectFileNotFound(path.to_owned()))?;

        let input_directory = project_root.join(&project.input_directory);
        let includes = input_directory.join(INCLUDES_DIRECTORY);
        Ok(Config {
            title: project.title,
            author: project.author,
            production_url: project.base_url.production,
            development_url: project.base_url.development,
            output_directory: project_root.join(&project.output_directory),
            static_directory: input_directory.join(&project.static_directory),
            icons_directory: input_directory.join(&project.icons_directory),
            layouts: project
                .layouts
                .into_iter()
                .map(|(name, files)| {
                    let files =
                        files.iter().map(|file| includes.join(file)).collect();
                    (name, files)
                })
                .collect(),
            input_directory,
        })
    }

    /// Returns the base URL for `mode`.
    pub fn base_url(&self, mode: Mode) -> &Url {
        match mode {
            Mode::Production => &self.production_url,
            Mode::Development => &self.development_url,
        }
    }
}

/// The result of a fallible configuration operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no project file exists in a directory or its ancestors.
    ProjectFileNotFound(PathBuf),

    /// Returned when the project file can't be opened.
    OpenProjectFile { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid YAML for a project.
    DeserializeYaml(serde_yaml::Error),

    /// Returned for a build mode other than `development` or `production`.
    InvalidMode(String),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectFileNotFound(dir) => write!(
                f,
                "could not find `{}` in `{}` or any parent directory",
                PROJECT_FILE,
                dir.display()
            ),
            Error::OpenProjectFile { path, err } => {
                write!(f, "opening project file `{}`: {}", path.display(), err)
            }
            Error::DeserializeYaml(err) => {
                write!(f, "loading configuration: {}", err)
            }
            Error::InvalidMode(mode) => write!(
                f,
                "invalid mode `{}`; wanted `development` or `production`",
                mode
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProjectFileNotFound(_) => None,
            Error::OpenProjectFile { path: _, err } => Some(err),
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidMode(_) => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
