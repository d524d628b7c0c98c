//! The library code for the `twiddlingbits` static site generator. The
//! architecture can be generally broken down into three steps:
//!
//! 1. Parsing content from source files on disk ([`crate::parser`])
//! 2. Grouping the parsed records into collections ([`crate::collections`])
//! 3. Rendering every record through its layout to disk ([`crate::write`])
//!
//! Parsing expands shortcodes ([`crate::shortcodes`]) and renders markdown
//! ([`crate::markdown`]). The collections are what make the archive page
//! possible: besides the list of posts, newest first, there is `postsByYear`,
//! the posts grouped by publication year ([`collections::group_by_year`]).
//!
//! The rendering step hands every layout the page itself, the global site
//! data ([`crate::data`]) and the collections. On production builds the
//! result is minified ([`crate::minify`]) before it is written.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod collections;
pub mod config;
pub mod data;
pub mod filters;
pub mod markdown;
pub mod minify;
pub mod parser;
pub mod post;
pub mod shortcodes;
pub mod tag;
pub mod write;
