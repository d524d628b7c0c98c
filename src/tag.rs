//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag.

use gtmpl_value::Value;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fmt;

/// The tag which marks a content record as a publishable blog post.
pub const POST_TAG: &str = "post";

/// Represents a [`crate::post::Post`] tag. Tag names are slugified on
/// construction so e.g., `macOS` and `MacOS` resolve to the same tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    /// The tag's slugified name.
    pub name: String,
}

impl Tag {
    /// Creates a new [`Tag`], slugifying `name`.
    pub fn new(name: &str) -> Tag {
        Tag {
            name: slug::slugify(name),
        }
    }

    /// Deserializes frontmatter tags, which may be written either as a single
    /// string (`tags: post`) or as a list (`tags: [post, rust]`).
    pub fn deserialize_set<'de, D>(
        deserializer: D,
    ) -> Result<HashSet<Tag>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(name) => {
                std::iter::once(Tag::new(&name)).collect()
            }
            OneOrMany::Many(names) => {
                names.iter().map(|name| Tag::new(name)).collect()
            }
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.name.fmt(f)
    }
}

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(t: &Tag) -> Value {
        Value::String(t.name.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "Tag::deserialize_set")]
        tags: HashSet<Tag>,
    }

    #[test]
    fn test_tag_names_are_slugified() {
        assert_eq!(Tag::new("macOS"), Tag::new("MacOS"));
        assert_eq!("hello-world", Tag::new("Hello World").name);
    }

    #[test]
    fn test_deserialize_single_tag() -> Result<(), serde_yaml::Error> {
        let wrapper: Wrapper = serde_yaml::from_str("tags: post")?;
        assert_eq!(1, wrapper.tags.len());
        assert!(wrapper.tags.contains(&Tag::new(POST_TAG)));
        Ok(())
    }

    #[test]
    fn test_deserialize_tag_list() -> Result<(), serde_yaml::Error> {
        let wrapper: Wrapper =
            serde_yaml::from_str("tags: [post, Rust, rust]")?;
        assert_eq!(2, wrapper.tags.len());
        assert!(wrapper.tags.contains(&Tag::new("rust")));
        Ok(())
    }
}
