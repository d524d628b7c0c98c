//! Defines the [`Collection`] of content records and the `postsByYear`
//! archive grouping ([`posts_by_year`] and [`group_by_year`]).

use crate::post::Post;
use chrono::{Datelike, NaiveDate};
use gtmpl_value::Value;
use log::warn;
use std::collections::{HashMap, HashSet};

/// Anything with a publication date that can be grouped by year.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for Post {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for NaiveDate {
    fn date(&self) -> NaiveDate {
        *self
    }
}

impl<T: Dated + ?Sized> Dated for &T {
    fn date(&self) -> NaiveDate {
        (**self).date()
    }
}

/// The posts published in a single calendar year, newest first.
#[derive(Clone, Debug, PartialEq)]
pub struct YearGroup<T> {
    pub year: i32,
    pub posts: Vec<T>,
}

/// Groups `posts` by publication year.
///
/// `posts` is expected newest-first. Years are emitted in the order they are
/// first seen, so newest-first input yields groups in descending year order.
/// Within a group, posts keep their relative order from `posts`. Posts from
/// the same year need not be adjacent in the input.
pub fn group_by_year<T: Dated + Clone>(posts: &[T]) -> Vec<YearGroup<T>> {
    if !is_newest_first(posts) {
        warn!("grouping posts by year but the posts are not newest-first");
    }

    let mut seen = HashSet::new();
    let years: Vec<i32> = posts
        .iter()
        .map(|post| post.date().year())
        .filter(|year| seen.insert(*year))
        .collect();

    years
        .into_iter()
        .map(|year| YearGroup {
            year,
            posts: posts
                .iter()
                .filter(|post| post.date().year() == year)
                .cloned()
                .collect(),
        })
        .collect()
}

fn is_newest_first<T: Dated>(posts: &[T]) -> bool {
    posts.windows(2).all(|w| w[0].date() >= w[1].date())
}

/// All content records of a site, stored oldest-first (by date, then by input
/// path).
pub struct Collection {
    posts: Vec<Post>,
}

impl Collection {
    pub fn new(mut posts: Vec<Post>) -> Collection {
        posts.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.input_path.cmp(&b.input_path))
        });
        Collection { posts }
    }

    /// Returns every record, oldest-first.
    pub fn all(&self) -> &[Post] {
        &self.posts
    }

    /// Returns the records carrying `tag`, oldest-first.
    pub fn filtered_by_tag(&self, tag: &str) -> Vec<&Post> {
        self.posts.iter().filter(|post| post.has_tag(tag)).collect()
    }

    /// Returns the publishable posts, newest-first.
    pub fn newest_posts(&self) -> Vec<&Post> {
        self.posts.iter().rev().filter(|post| post.is_post()).collect()
    }

    /// Converts the collection into the `collections` template [`Value`]:
    /// an object with `post` (newest-first) and `postsByYear` (see
    /// [`posts_by_year`]).
    pub fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert(
            "post".to_owned(),
            Value::Array(
                self.newest_posts().iter().map(|p| p.to_value()).collect(),
            ),
        );
        m.insert(
            "postsByYear".to_owned(),
            Value::Array(
                posts_by_year(self).iter().map(Value::from).collect(),
            ),
        );
        Value::Object(m)
    }
}

/// The `postsByYear` collection: the publishable posts grouped by year, years
/// descending, posts newest-first within each year. The newest-first ordering
/// [`group_by_year`] expects is established here with a stable sort, so posts
/// sharing a date keep their reversed storage order.
pub fn posts_by_year(collection: &Collection) -> Vec<YearGroup<&Post>> {
    let mut posts = collection.newest_posts();
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    group_by_year(&posts)
}

impl From<&YearGroup<&Post>> for Value {
    /// Converts a [`YearGroup`] into an object with fields `year` and `posts`.
    fn from(group: &YearGroup<&Post>) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("year".to_owned(), Value::from(i64::from(group.year)));
        m.insert(
            "posts".to_owned(),
            Value::Array(group.posts.iter().map(|p| p.to_value()).collect()),
        );
        Value::Object(m)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test::post;
    use crate::tag::Tag;
    use proptest::prelude::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
    }

    fn dates(ss: &[&str]) -> Vec<NaiveDate> {
        ss.iter().map(|s| date(s)).collect()
    }

    #[test]
    fn test_group_by_year_empty() {
        let posts: Vec<NaiveDate> = Vec::new();
        assert!(group_by_year(&posts).is_empty());
    }

    #[test]
    fn test_group_by_year() {
        let posts = dates(&["2023-06-01", "2023-01-01", "2022-05-01"]);
        assert_eq!(
            vec![
                YearGroup {
                    year: 2023,
                    posts: dates(&["2023-06-01", "2023-01-01"]),
                },
                YearGroup {
                    year: 2022,
                    posts: dates(&["2022-05-01"]),
                },
            ],
            group_by_year(&posts)
        );
    }

    #[test]
    fn test_group_by_year_single_post() {
        let posts = dates(&["2021-01-01"]);
        assert_eq!(
            vec![YearGroup {
                year: 2021,
                posts: dates(&["2021-01-01"]),
            }],
            group_by_year(&posts)
        );
    }

    #[test]
    fn test_group_by_year_single_year() {
        let posts = dates(&["2020-12-31", "2020-06-15", "2020-01-01"]);
        let groups = group_by_year(&posts);
        assert_eq!(1, groups.len());
        assert_eq!(posts, groups[0].posts);
    }

    #[test]
    fn test_group_by_year_non_contiguous() {
        let posts = dates(&["2023-03-01", "2021-01-01", "2023-01-01"]);
        assert_eq!(
            vec![
                YearGroup {
                    year: 2023,
                    posts: dates(&["2023-03-01", "2023-01-01"]),
                },
                YearGroup {
                    year: 2021,
                    posts: dates(&["2021-01-01"]),
                },
            ],
            group_by_year(&posts)
        );
    }

    #[test]
    fn test_group_by_year_ties_are_stable() {
        let posts = vec![
            post("b", "2022-02-02"),
            post("a", "2022-02-02"),
            post("c", "2021-01-01"),
        ];
        let groups = group_by_year(&posts);
        let titles: Vec<&str> =
            groups[0].posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["b", "a"], titles);
    }

    #[test]
    fn test_posts_by_year_reverses_storage_order() {
        let mut page = post("about", "2023-01-01");
        page.tags = std::iter::once(Tag::new("page")).collect();
        let collection = Collection::new(vec![
            post("first", "2021-03-01"),
            page,
            post("third", "2022-07-04"),
            post("second", "2021-09-12"),
            post("fourth", "2022-01-01"),
        ]);

        let groups: Vec<(i32, Vec<&str>)> = posts_by_year(&collection)
            .iter()
            .map(|g| {
                (g.year, g.posts.iter().map(|p| p.title.as_str()).collect())
            })
            .collect();
        assert_eq!(
            vec![
                (2022, vec!["third", "fourth"]),
                (2021, vec!["second", "first"]),
            ],
            groups
        );
    }

    #[test]
    fn test_posts_by_year_same_day_reverses_input_path_order() {
        let collection = Collection::new(vec![
            post("a", "2020-05-05"),
            post("b", "2020-05-05"),
        ]);
        let groups = posts_by_year(&collection);
        let titles: Vec<&str> =
            groups[0].posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["b", "a"], titles);
    }

    #[test]
    fn test_filtered_by_tag() {
        let mut page = post("about", "2023-01-01");
        page.tags = std::iter::once(Tag::new("page")).collect();
        let collection = Collection::new(vec![
            post("new", "2022-01-01"),
            page,
            post("old", "2020-01-01"),
        ]);
        let titles: Vec<&str> = collection
            .filtered_by_tag("post")
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(vec!["old", "new"], titles);
        assert_eq!(3, collection.all().len());

        let newest: Vec<&str> = collection
            .newest_posts()
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(vec!["new", "old"], newest);
    }

    fn newest_first_dates() -> impl Strategy<Value = Vec<NaiveDate>> {
        prop::collection::vec(0i64..20_000, 0..64).prop_map(|mut days| {
            days.sort_unstable_by(|a, b| b.cmp(a));
            let epoch = date("1970-01-01");
            days.into_iter()
                .map(|d| epoch + chrono::Duration::days(d))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_groups_partition_the_input(posts in newest_first_dates()) {
            let groups = group_by_year(&posts);
            let flattened: Vec<NaiveDate> = groups
                .iter()
                .flat_map(|g| g.posts.iter().cloned())
                .collect();
            prop_assert_eq!(&posts, &flattened);
        }

        #[test]
        fn prop_years_descend(posts in newest_first_dates()) {
            let groups = group_by_year(&posts);
            for w in groups.windows(2) {
                prop_assert!(w[0].year > w[1].year);
            }
        }

        #[test]
        fn prop_groups_hold_one_year_in_input_order(
            posts in prop::collection::vec(0i64..20_000, 0..64)
        ) {
            let epoch = date("1970-01-01");
            let posts: Vec<NaiveDate> = posts
                .into_iter()
                .map(|d| epoch + chrono::Duration::days(d))
                .collect();
            let groups = group_by_year(&posts);
            let total: usize = groups.iter().map(|g| g.posts.len()).sum();
            prop_assert_eq!(posts.len(), total);
            for group in &groups {
                let wanted: Vec<NaiveDate> = posts
                    .iter()
                    .filter(|p| p.date().year() == group.year)
                    .cloned()
                    .collect();
                prop_assert_eq!(&wanted, &group.posts);
            }
        }
    }
}
