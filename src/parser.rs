use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use feed_rs::model::Link;
use feed_rs::parser::{self, ParseFeedError};
use html_escape::decode_html_entities;
use thiserror::Error;

use crate::config::RetryPolicy;
use crate::error_log::ErrorSink;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: ParseFeedError,
    },
}

/// The parts of a syndication document this crate cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub title: String,
    /// Site link, not the feed's own URL.
    pub link: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// Published time, else updated time, else `now`.
    pub fn timestamp_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.published.or(self.updated).unwrap_or(now)
    }
}

/// Layouts with an explicit offset, tried after RFC 3339 and RFC 2822.
const OFFSET_LAYOUTS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Layouts without a zone. These are read as UTC.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d %b %Y %H:%M:%S",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%B %d, %Y"];

/// Read a feed timestamp, accepting the loose layouts blog engines emit on
/// top of RFC 3339 and RFC 2822.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = normalize_timestamp(text);
    if text.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(&text)
        .or_else(|_| DateTime::parse_from_rfc2822(&text))
        .ok()
        .or_else(|| {
            OFFSET_LAYOUTS
                .iter()
                .find_map(|layout| DateTime::parse_from_str(&text, layout).ok())
        })
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NAIVE_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDateTime::parse_from_str(&text, layout).ok())
                .map(|dt| dt.and_utc())
        })
        .or_else(|| {
            DATE_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(&text, layout).ok())
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        })
}

/// Drop a leading weekday name, which is often wrong or not English, and
/// spell zone suffixes as numeric offsets.
fn normalize_timestamp(text: &str) -> String {
    let mut text = text.trim();
    if let Some((head, rest)) = text.split_once(", ") {
        if !head.is_empty() && head.chars().all(char::is_alphabetic) {
            text = rest.trim_start();
        }
    }

    // Some engines roll the hour to 24 without touching the day.
    let text = text.replace(" 24:", " 00:");
    for suffix in [" UTC", " Z", " -0000"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            return format!("{} +0000", stripped);
        }
    }
    text
}

fn decode_text(text: String) -> String {
    decode_html_entities(&text).into_owned()
}

/// Parse RSS, Atom or JSON Feed content.
pub fn parse_feed(payload: &str) -> Result<Feed, ParseFeedError> {
    let parsed = parser::Builder::new()
        .timestamp_parser(parse_timestamp)
        .build()
        .parse(payload.as_bytes())?;

    let items = parsed
        .entries
        .into_iter()
        .map(|entry| FeedItem {
            title: entry.title.map(|t| decode_text(t.content)).unwrap_or_default(),
            link: pick_link(&entry.links),
            published: entry.published,
            updated: entry.updated,
        })
        .collect();

    Ok(Feed {
        title: parsed.title.map(|t| decode_text(t.content)).unwrap_or_default(),
        link: pick_link(&parsed.links),
        items,
    })
}

/// Prefer an alternate (or untyped) link, and never pick `rel="self"` when
/// anything else is available.
pub fn pick_link(links: &[Link]) -> String {
    let rel = |link: &Link| link.rel.as_deref().unwrap_or("alternate").to_lowercase();

    links
        .iter()
        .find(|&l| rel(l) == "alternate")
        .or_else(|| links.iter().find(|&l| rel(l) != "self"))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default()
}

/// Parse with the same fixed-delay retry as fetching.
///
/// The payload does not change between attempts, so a second attempt can only
/// fail the same way. The attempt count and log lines are kept so failure logs
/// read the same as they always have.
pub async fn parse_with_retry(
    payload: &str,
    url: &str,
    policy: &RetryPolicy,
    sink: &dyn ErrorSink,
) -> Result<Feed, ParseError> {
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match parse_feed(payload) {
            Ok(feed) => return Ok(feed),
            Err(e) => {
                sink.record(&format!(
                    "Parse RSS error: {} (attempt {}/{}): {}",
                    url, attempt, attempts, e
                ));

                if attempt >= attempts {
                    sink.record(&format!("Failed to parse RSS: {}: {}", url, e));
                    return Err(ParseError::Exhausted { attempts, last: e });
                }
            }
        }

        tokio::time::sleep(policy.retry_delay()).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_log::MemoryErrorLog;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
            <channel>
                <title>obaby@mars</title>
                <link>https://h4ck.org.cn/</link>
                <description>Blog</description>
                <item>
                    <title>Latest post</title>
                    <link>https://h4ck.org.cn/2024/12/latest</link>
                    <pubDate>Mon, 09 Dec 2024 12:00:00 GMT</pubDate>
                </item>
                <item>
                    <title>Older post</title>
                    <link>https://h4ck.org.cn/2024/12/older</link>
                    <pubDate>Sun, 08 Dec 2024 12:00:00 GMT</pubDate>
                </item>
            </channel>
        </rss>
    "#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
            <title>Homepage on Yihui Xie | 谢益辉</title>
            <link href="https://yihui.org/index.xml" rel="self"/>
            <link href="https://yihui.org/"/>
            <id>https://yihui.org/</id>
            <updated>2024-11-30T08:00:00Z</updated>
            <entry>
                <title>Atom entry</title>
                <link href="https://yihui.org/en/2024/11/entry/"/>
                <id>https://yihui.org/en/2024/11/entry/</id>
                <updated>2024-11-30T08:00:00Z</updated>
            </entry>
        </feed>
    "#;

    fn link(href: &str, rel: Option<&str>) -> Link {
        Link {
            href: href.to_string(),
            rel: rel.map(|r| r.to_string()),
            media_type: None,
            href_lang: None,
            title: None,
            length: None,
        }
    }

    mod parse_feed_tests {
        use super::*;

        #[test]
        fn test_parse_rss() {
            let feed = parse_feed(RSS).unwrap();

            assert_eq!(feed.title, "obaby@mars");
            assert_eq!(feed.link, "https://h4ck.org.cn/");
            assert_eq!(feed.items.len(), 2);
            assert_eq!(feed.items[0].title, "Latest post");
            assert_eq!(feed.items[0].link, "https://h4ck.org.cn/2024/12/latest");
            assert_eq!(
                feed.items[0].published,
                Some(Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_parse_atom_skips_self_link() {
            let feed = parse_feed(ATOM).unwrap();

            assert_eq!(feed.title, "Homepage on Yihui Xie | 谢益辉");
            assert_eq!(feed.link, "https://yihui.org/");
            assert_eq!(feed.items.len(), 1);
            assert_eq!(feed.items[0].link, "https://yihui.org/en/2024/11/entry/");
            assert_eq!(feed.items[0].published, None);
            assert_eq!(
                feed.items[0].updated,
                Some(Utc.with_ymd_and_hms(2024, 11, 30, 8, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_parse_feed_without_items() {
            let xml = r#"<rss version="2.0"><channel><title>Quiet</title></channel></rss>"#;
            let feed = parse_feed(xml).unwrap();

            assert_eq!(feed.title, "Quiet");
            assert_eq!(feed.link, "");
            assert!(feed.items.is_empty());
        }

        fn rss_dated(pub_date: &str) -> String {
            format!(
                r#"<?xml version="1.0"?>
                <rss version="2.0"><channel>
                    <title>Dated</title>
                    <item><title>post</title><pubDate>{pub_date}</pubDate></item>
                </channel></rss>"#
            )
        }

        #[test]
        fn test_parse_loose_datetime() {
            let feed = parse_feed(&rss_dated("2024-12-09 12:00:00")).unwrap();
            assert_eq!(
                feed.items[0].published,
                Some(Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_parse_date_without_time() {
            let feed = parse_feed(&rss_dated("Mon, 09 Dec 2024")).unwrap();
            assert_eq!(
                feed.items[0].published,
                Some(Utc.with_ymd_and_hms(2024, 12, 9, 0, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_parse_rfc2822_with_offset() {
            let feed = parse_feed(&rss_dated("Mon, 09 Dec 2024 12:00:00 +0800")).unwrap();
            assert_eq!(
                feed.items[0].published,
                Some(Utc.with_ymd_and_hms(2024, 12, 9, 4, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_parse_unreadable_date() {
            let feed = parse_feed(&rss_dated("sometime last week")).unwrap();
            assert_eq!(feed.items[0].published, None);
        }

        #[test]
        fn test_titles_decode_html_entities() {
            let xml = r#"<rss version="2.0"><channel>
                <title>Blog&amp;nbsp;Name</title>
                <item><title><![CDATA[Tom &amp; Jerry&#39;s &quot;post&quot;]]></title></item>
            </channel></rss>"#;
            let feed = parse_feed(xml).unwrap();

            assert_eq!(feed.title, "Blog\u{a0}Name");
            assert_eq!(feed.items[0].title, "Tom & Jerry's \"post\"");
        }

        #[test]
        fn test_parse_not_a_feed() {
            assert!(parse_feed("<html><body>nope</body></html>").is_err());
        }
    }

    mod timestamp_tests {
        use super::*;

        #[test]
        fn test_published_wins() {
            let published = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
            let updated = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
            let item = FeedItem {
                published: Some(published),
                updated: Some(updated),
                ..Default::default()
            };
            assert_eq!(item.timestamp_or(Utc::now()), published);
        }

        #[test]
        fn test_updated_fallback() {
            let updated = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
            let item = FeedItem {
                updated: Some(updated),
                ..Default::default()
            };
            assert_eq!(item.timestamp_or(Utc::now()), updated);
        }

        #[test]
        fn test_now_fallback() {
            let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
            assert_eq!(FeedItem::default().timestamp_or(now), now);
        }
    }

    mod parse_timestamp_tests {
        use super::*;

        fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Option<DateTime<Utc>> {
            Some(Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap())
        }

        #[test]
        fn test_rfc2822() {
            assert_eq!(parse_timestamp("Mon, 09 Dec 2024 12:00:00 GMT"), utc(2024, 12, 9, 12, 0, 0));
            assert_eq!(parse_timestamp("Mon, 09 Dec 2024 12:00:00 +0800"), utc(2024, 12, 9, 4, 0, 0));
        }

        #[test]
        fn test_rfc2822_wrong_or_long_weekday() {
            assert_eq!(parse_timestamp("Fri, 09 Dec 2024 12:00:00 GMT"), utc(2024, 12, 9, 12, 0, 0));
            assert_eq!(parse_timestamp("Monday, 09 Dec 2024 12:00:00 GMT"), utc(2024, 12, 9, 12, 0, 0));
        }

        #[test]
        fn test_zone_suffixes() {
            assert_eq!(parse_timestamp("Mon, 09 Dec 2024 12:00:00 UTC"), utc(2024, 12, 9, 12, 0, 0));
            assert_eq!(parse_timestamp("09 Dec 2024 12:00:00 Z"), utc(2024, 12, 9, 12, 0, 0));
            assert_eq!(parse_timestamp("2024-12-09 12:00:00 UTC"), utc(2024, 12, 9, 12, 0, 0));
        }

        #[test]
        fn test_hour_24_is_start_of_day() {
            assert_eq!(parse_timestamp("09 Dec 2024 24:30:00 +0000"), utc(2024, 12, 9, 0, 30, 0));
        }

        #[test]
        fn test_rfc3339() {
            assert_eq!(parse_timestamp("2024-12-09T12:00:00+08:00"), utc(2024, 12, 9, 4, 0, 0));
            assert_eq!(parse_timestamp("2024-12-09T12:00:00Z"), utc(2024, 12, 9, 12, 0, 0));
        }

        #[test]
        fn test_space_separated_with_offset() {
            assert_eq!(parse_timestamp("2024-12-09 12:00:00 +0800"), utc(2024, 12, 9, 4, 0, 0));
        }

        #[test]
        fn test_naive_layouts_are_utc() {
            assert_eq!(parse_timestamp("2024-12-09 12:00:00"), utc(2024, 12, 9, 12, 0, 0));
            assert_eq!(parse_timestamp("2024-12-09 12:00"), utc(2024, 12, 9, 12, 0, 0));
            assert_eq!(parse_timestamp("2024-12-09T12:00:00"), utc(2024, 12, 9, 12, 0, 0));
            assert_eq!(parse_timestamp("2024/12/09 12:00:00"), utc(2024, 12, 9, 12, 0, 0));
            assert_eq!(parse_timestamp("Mon, 09 Dec 2024 12:00:00"), utc(2024, 12, 9, 12, 0, 0));
        }

        #[test]
        fn test_offset_without_colon() {
            assert_eq!(parse_timestamp("2024-12-09T12:00:00+0800"), utc(2024, 12, 9, 4, 0, 0));
        }

        #[test]
        fn test_date_only_layouts() {
            assert_eq!(parse_timestamp("2024-12-09"), utc(2024, 12, 9, 0, 0, 0));
            assert_eq!(parse_timestamp("2024/12/09"), utc(2024, 12, 9, 0, 0, 0));
            assert_eq!(parse_timestamp("Mon, 09 Dec 2024"), utc(2024, 12, 9, 0, 0, 0));
            assert_eq!(parse_timestamp("09 Dec 2024"), utc(2024, 12, 9, 0, 0, 0));
            assert_eq!(parse_timestamp("December 09, 2024"), utc(2024, 12, 9, 0, 0, 0));
        }

        #[test]
        fn test_surrounding_whitespace() {
            assert_eq!(parse_timestamp("\n  2024-12-09 12:00:00  "), utc(2024, 12, 9, 12, 0, 0));
        }

        #[test]
        fn test_garbage() {
            assert_eq!(parse_timestamp(""), None);
            assert_eq!(parse_timestamp("yesterday"), None);
            assert_eq!(parse_timestamp("2024-13-45 99:00:00"), None);
        }
    }

    mod pick_link_tests {
        use super::*;

        #[test]
        fn test_untyped_link() {
            let links = vec![link("https://a.example/", None)];
            assert_eq!(pick_link(&links), "https://a.example/");
        }

        #[test]
        fn test_alternate_beats_self() {
            let links = vec![
                link("https://a.example/feed.xml", Some("self")),
                link("https://a.example/", Some("alternate")),
            ];
            assert_eq!(pick_link(&links), "https://a.example/");
        }

        #[test]
        fn test_other_rel_beats_self() {
            let links = vec![
                link("https://a.example/feed.xml", Some("self")),
                link("https://a.example/related", Some("related")),
            ];
            assert_eq!(pick_link(&links), "https://a.example/related");
        }

        #[test]
        fn test_only_self() {
            let links = vec![link("https://a.example/feed.xml", Some("SELF"))];
            assert_eq!(pick_link(&links), "https://a.example/feed.xml");
        }

        #[test]
        fn test_no_links() {
            assert_eq!(pick_link(&[]), "");
        }
    }

    mod retry_tests {
        use super::*;

        #[tokio::test]
        async fn test_retry_success_logs_nothing() {
            let log = MemoryErrorLog::new();
            let feed = parse_with_retry(RSS, "https://h4ck.org.cn/feed", &RetryPolicy::immediate(3), &log)
                .await
                .unwrap();

            assert_eq!(feed.items.len(), 2);
            assert!(log.lines().is_empty());
        }

        #[tokio::test]
        async fn test_retry_exhausts_on_garbage() {
            let log = MemoryErrorLog::new();
            let result = parse_with_retry(
                "<html>not a feed</html>",
                "https://bad.example/feed",
                &RetryPolicy::immediate(3),
                &log,
            )
            .await;

            assert!(matches!(result, Err(ParseError::Exhausted { attempts: 3, .. })));

            let lines = log.lines();
            assert_eq!(lines.len(), 4);
            assert!(lines[0].starts_with("Parse RSS error: https://bad.example/feed (attempt 1/3): "));
            assert!(lines[1].contains("(attempt 2/3)"));
            assert!(lines[2].contains("(attempt 3/3)"));
            assert!(lines[3].starts_with("Failed to parse RSS: https://bad.example/feed: "));
        }

        #[tokio::test(start_paused = true)]
        async fn test_retry_waits_between_attempts_only() {
            let policy = RetryPolicy {
                max_attempts: 3,
                retry_delay_secs: 10,
                ..RetryPolicy::default()
            };
            let log = MemoryErrorLog::new();
            let started = tokio::time::Instant::now();

            let result = parse_with_retry("not a feed", "https://bad.example/feed", &policy, &log).await;

            assert!(result.is_err());
            assert_eq!(started.elapsed(), std::time::Duration::from_secs(20));
            assert_eq!(log.lines().len(), 4);
        }

        #[tokio::test(start_paused = true)]
        async fn test_retry_success_does_not_wait() {
            let policy = RetryPolicy::default();
            let log = MemoryErrorLog::new();
            let started = tokio::time::Instant::now();

            parse_with_retry(RSS, "https://h4ck.org.cn/feed", &policy, &log)
                .await
                .unwrap();

            assert_eq!(started.elapsed(), std::time::Duration::ZERO);
        }
    }
}
