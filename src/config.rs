use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub feeds_path: PathBuf,
    pub avatars_path: PathBuf,
    pub output_path: PathBuf,
    pub error_log_path: PathBuf,
    /// Maximum number of feeds fetched at once. Unset means all of them.
    pub max_concurrency: Option<usize>,
    pub retry: RetryPolicy,
    pub identity: IdentityConfig,
    pub static_entry: StaticEntry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds_path: PathBuf::from("rss/rss_feeds.txt"),
            avatars_path: PathBuf::from("data/avatar_data.json"),
            output_path: PathBuf::from("data/rss_data.json"),
            error_log_path: PathBuf::from("logs/error.log"),
            max_concurrency: None,
            retry: RetryPolicy::default(),
            identity: IdentityConfig::default(),
            static_entry: StaticEntry::default(),
        }
    }
}

/// Fixed-delay retry policy shared by fetching and parsing.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 10,
            request_timeout_secs: 10,
        }
    }
}

impl RetryPolicy {
    /// A policy with no delay between attempts, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            retry_delay_secs: 0,
            ..Self::default()
        }
    }

    /// Never less than one attempt, even when configured as zero.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IdentityConfig {
    pub default_avatar: String,
    /// Exact feed title to display name.
    pub aliases: HashMap<String, String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let aliases = [
            ("obaby@mars", "obaby"),
            ("青山小站 | 一个在帝都搬砖的新时代农民工", "青山小站"),
            ("Homepage on Miao Yu | 于淼", "于淼"),
            ("Homepage on Yihui Xie | 谢益辉", "谢益辉"),
        ]
        .into_iter()
        .map(|(title, name)| (title.to_string(), name.to_string()))
        .collect();

        Self {
            default_avatar: "https://cos.lhasa.icu/LinksAvatar/default.png".to_string(),
            aliases,
        }
    }
}

/// The hand-curated entry appended after the sorted feed articles.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StaticEntry {
    pub domain_name: String,
    pub name: String,
    pub title: String,
    pub link: String,
    pub date: NaiveDate,
    pub avatar: String,
}

impl Default for StaticEntry {
    fn default() -> Self {
        Self {
            domain_name: "https://foreverblog.cn".to_string(),
            name: "十年之约".to_string(),
            title: "穿梭虫洞-随机访问十年之约友链博客".to_string(),
            link: "https://foreverblog.cn/go.html".to_string(),
            date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
            avatar: "https://cos.lhasa.icu/LinksAvatar/foreverblog.cn.png".to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
