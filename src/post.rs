//! Defines the [`Post`] type, the in-memory form of a content record, and its
//! conversion into a template [`Value`] (see [`Post::to_value`]).

use crate::filters;
use crate::tag::{Tag, POST_TAG};
use chrono::NaiveDate;
use gtmpl_value::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Represents a content record parsed from the input directory. Every page of
/// the site is a [`Post`]; the ones tagged `post` are the publishable blog
/// posts that make up the `post` and `postsByYear` collections.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The title of the record.
    pub title: String,

    /// The publication date of the record.
    pub date: NaiveDate,

    /// The tags associated with the record.
    pub tags: HashSet<Tag>,

    /// The name of the layout the record is rendered with, if any.
    pub layout: Option<String>,

    /// The path of the source file relative to the input directory.
    pub input_path: PathBuf,

    /// The path of the output file relative to the output directory.
    pub output_path: PathBuf,

    /// The site-relative URL of the record (including any path prefix).
    pub url: String,

    /// The rendered HTML body.
    pub content: String,
}

impl Post {
    /// Returns true if the record carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&Tag::new(tag))
    }

    /// Returns true if the record is a publishable blog post.
    pub fn is_post(&self) -> bool {
        self.has_tag(POST_TAG)
    }

    /// Converts a [`Post`] into a template [`Value`]. The result is a
    /// [`Value::Object`] with the fields `title`, `date` (ISO-8601),
    /// `display_date` (see [`filters::post_date`]), `time_to_read` (see
    /// [`filters::time_to_read`]), `url`, `tags` (sorted), and `content`.
    pub fn to_value(&self) -> Value {
        let mut tags: Vec<&Tag> = self.tags.iter().collect();
        tags.sort();

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert("date".to_owned(), Value::String(self.date.to_string()));
        m.insert(
            "display_date".to_owned(),
            Value::String(filters::post_date(self.date)),
        );
        m.insert(
            "time_to_read".to_owned(),
            Value::String(filters::time_to_read(&self.content)),
        );
        m.insert("url".to_owned(), Value::String(self.url.clone()));
        m.insert(
            "tags".to_owned(),
            Value::Array(tags.into_iter().map(Value::from).collect()),
        );
        m.insert("content".to_owned(), Value::String(self.content.clone()));
        Value::Object(m)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Builds a minimal post dated `date` (`YYYY-MM-DD`) for tests.
    pub fn post(title: &str, date: &str) -> Post {
        Post {
            title: title.to_owned(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .expect("test dates are valid"),
            tags: std::iter::once(Tag::new(POST_TAG)).collect(),
            layout: None,
            input_path: PathBuf::from(format!("posts/{}.md", title)),
            output_path: PathBuf::from(format!("posts/{}/index.html", title)),
            url: format!("/posts/{}/", title),
            content: String::new(),
        }
    }

    #[test]
    fn test_to_value() {
        let mut p = post("hello", "2023-06-01");
        p.tags.insert(Tag::new("Rust"));
        p.content = String::from("<p>Hello</p>");

        fn string(v: Option<&Value>) -> &str {
            match v {
                Some(Value::String(s)) => s.as_str(),
                _ => panic!("wanted a string"),
            }
        }

        match p.to_value() {
            Value::Object(m) => {
                assert_eq!("Jun 1, 2023", string(m.get("display_date")));
                assert_eq!("2023-06-01", string(m.get("date")));
                assert_eq!("1 min", string(m.get("time_to_read")));
                match m.get("tags") {
                    Some(Value::Array(tags)) => {
                        let tags: Vec<&str> =
                            tags.iter().map(|t| string(Some(t))).collect();
                        assert_eq!(vec!["post", "rust"], tags);
                    }
                    _ => panic!("wanted an array of tags"),
                }
            }
            _ => panic!("wanted an object"),
        }
    }

    #[test]
    fn test_is_post() {
        let mut p = post("hello", "2023-06-01");
        assert!(p.is_post());
        p.tags.clear();
        assert!(!p.is_post());
    }
}
