use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

use crate::config::StaticEntry;

/// One row of the published friend-links feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub domain_name: String,
    pub name: String,
    pub title: String,
    pub link: String,
    pub date: String,
    pub avatar: String,
    #[serde(skip)]
    pub publish_time: DateTime<Utc>,
}

impl Article {
    pub fn new(
        domain_name: String,
        name: String,
        title: String,
        link: String,
        avatar: String,
        publish_time: DateTime<Utc>,
    ) -> Self {
        Self {
            domain_name,
            name,
            title,
            link,
            date: format_date(publish_time),
            avatar,
            publish_time,
        }
    }
}

impl From<&StaticEntry> for Article {
    fn from(entry: &StaticEntry) -> Self {
        let publish_time = entry.date.and_time(NaiveTime::MIN).and_utc();
        Self {
            domain_name: entry.domain_name.clone(),
            name: entry.name.clone(),
            title: entry.title.clone(),
            link: entry.link.clone(),
            date: format_date(publish_time),
            avatar: entry.avatar.clone(),
            publish_time,
        }
    }
}

pub fn format_date(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}

/// Most recent first. Equal timestamps keep their incoming order.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.publish_time.cmp(&a.publish_time));
}
