use clap::{App, Arg};
use log::error;
use std::path::{Path, PathBuf};
use twiddlingbits::build::build_site;
use twiddlingbits::config::{BuildConfig, Config, Mode};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let eleventy_env = std::env::var("ELEVENTY_ENV").ok();
    let matches = App::new("twiddlingbits")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds the Twiddling Bits blog")
        .arg(
            Arg::with_name("project")
                .long("project")
                .takes_value(true)
                .value_name("DIR")
                .help("Directory containing site.yaml (or one of its children)"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .takes_value(true)
                .value_name("DIR")
                .help("Overrides the output directory from site.yaml"),
        )
        .arg(
            Arg::with_name("mode")
                .long("mode")
                .takes_value(true)
                .env("SITE_ENV")
                .possible_values(&["development", "production"])
                .default_value(default_mode(eleventy_env.as_deref()))
                .help(
                    "Production builds use the production base URL and minify HTML \
                     [falls back to ELEVENTY_ENV]",
                ),
        )
        .arg(
            Arg::with_name("path-prefix")
                .long("path-prefix")
                .takes_value(true)
                .env("PATH_PREFIX")
                .help("Path segment prepended onto every page URL"),
        )
        .get_matches();

    let project = matches.value_of("project").unwrap_or(".");
    let mut config = match Config::from_directory(Path::new(project)) {
        Ok(config) => config,
        Err(e) => exit(&e),
    };
    if let Some(output) = matches.value_of("output") {
        config.output_directory = PathBuf::from(output);
    }

    let mode = match matches.value_of("mode").unwrap_or("development").parse::<Mode>() {
        Ok(mode) => mode,
        Err(e) => exit(&e),
    };
    let build = BuildConfig {
        mode,
        path_prefix: matches
            .value_of("path-prefix")
            .map(str::to_owned)
            .or_else(github_repository_name),
    };

    if let Err(e) = build_site(&config, &build) {
        exit(&e);
    }
}

/// The mode used when neither `--mode` nor `SITE_ENV` is given. `ELEVENTY_ENV`
/// is honoured so existing deploy scripts keep producing production builds.
fn default_mode(eleventy_env: Option<&str>) -> &'static str {
    match eleventy_env {
        Some("production") => "production",
        _ => "development",
    }
}

/// When building on GitHub Actions, a project page is served from
/// `/{repository}/`, so the repository name is the default path prefix.
fn github_repository_name() -> Option<String> {
    let repository = std::env::var("GITHUB_REPOSITORY").ok()?;
    repository
        .split('/')
        .nth(1)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}

// The error types delegate `Display` to the errors they wrap, so the message
// already carries its causes.
fn exit(err: &dyn std::error::Error) -> ! {
    error!("{}", err);
    std::process::exit(1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_mode() {
        assert_eq!("production", default_mode(Some("production")));
        assert_eq!("development", default_mode(Some("staging")));
        assert_eq!("development", default_mode(None));
        assert_eq!(
            Mode::Production,
            default_mode(Some("production")).parse::<Mode>().unwrap()
        );
    }
}
