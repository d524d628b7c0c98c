//! Template filters. Each is a plain function used while building page values
//! (see [`crate::post::Post::to_value`]), and [`TEMPLATE_FUNCS`] exposes them
//! to layouts as `postDate`, `markdown`, and `timeToRead`.

use crate::markdown;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use gtmpl_value::{Func, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";
const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The filters registered on every layout template, by name.
pub const TEMPLATE_FUNCS: &[(&str, Func)] = &[
    ("postDate", template_post_date as Func),
    ("markdown", template_markdown as Func),
    ("timeToRead", template_time_to_read as Func),
];

/// The reading speed assumed by [`time_to_read`], in characters per minute.
const CHARACTERS_PER_MINUTE: usize = 1000;

/// Formats a post date in the medium English style, e.g. `Jun 1, 2023`.
pub fn post_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Parses a frontmatter date: `YYYY-MM-DD`, an RFC 3339 timestamp
/// (`2023-06-01T10:00:00Z`), or a local timestamp without an offset. Only
/// the calendar date is kept; timestamps keep the date as written.
pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, DATE_FORMAT).or_else(|err| {
        if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
            return Ok(datetime.naive_local().date());
        }
        match NaiveDateTime::parse_from_str(s, LOCAL_DATETIME_FORMAT) {
            Ok(datetime) => Ok(datetime.date()),
            Err(_) => Err(err),
        }
    })
}

/// Renders a markdown string to HTML.
pub fn markdown(content: &str) -> String {
    let mut html = String::with_capacity(content.len() * 3 / 2);
    markdown::to_html(&mut html, content);
    html
}

/// Estimates the reading time of an HTML or text fragment in the short style,
/// e.g. `3 min`. Markup is not counted. Never less than one minute.
pub fn time_to_read(content: &str) -> String {
    let characters = strip_tags(content)
        .chars()
        .filter(|c| !c.is_whitespace())
        .count();
    let minutes = (characters + CHARACTERS_PER_MINUTE - 1) / CHARACTERS_PER_MINUTE;
    format!("{} min", minutes.max(1))
}

fn string_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a str, String> {
    match args {
        [Value::String(s)] => Ok(s.as_str()),
        _ => Err(format!("{} takes a single string argument", name)),
    }
}

fn template_post_date(args: &[Value]) -> Result<Value, String> {
    let date = string_arg("postDate", args)?;
    let date = parse_date(date).map_err(|err| format!("postDate: `{}`: {}", date, err))?;
    Ok(Value::String(post_date(date)))
}

fn template_markdown(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(markdown(string_arg("markdown", args)?)))
}

fn template_time_to_read(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(time_to_read(string_arg("timeToRead", args)?)))
}

fn strip_tags(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}
