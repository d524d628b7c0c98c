//! Global data made available to every template as `data`.

use crate::config::{Author, BuildConfig, Config};
use chrono::{Datelike, Local};
use gtmpl_value::Value;
use std::collections::HashMap;
use url::Url;

pub struct SiteData {
    pub title: String,
    pub author: Option<Author>,

    /// The production or development base URL, depending on the build mode.
    pub base_url: Url,

    /// The year the site was built, for copyright notices.
    pub year: i32,
}

impl SiteData {
    pub fn new(config: &Config, build: &BuildConfig) -> SiteData {
        SiteData {
            title: config.title.clone(),
            author: config.author.clone(),
            base_url: config.base_url(build.mode).clone(),
            year: Local::now().year(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert("base_url".to_owned(), Value::String(self.base_url.to_string()));
        m.insert("year".to_owned(), Value::from(i64::from(self.year)));
        m.insert(
            "author".to_owned(),
            match &self.author {
                Some(author) => {
                    let mut a: HashMap<String, Value> = HashMap::new();
                    a.insert("name".to_owned(), Value::String(author.name.clone()));
                    a.insert(
                        "email".to_owned(),
                        match &author.email {
                            Some(email) => Value::String(email.clone()),
                            None => Value::Nil,
                        },
                    );
                    Value::Object(a)
                }
                None => Value::Nil,
            },
        );
        Value::Object(m)
    }
}
