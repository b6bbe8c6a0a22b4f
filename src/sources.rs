//! Readers for the feed list and the avatar list.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid avatar list {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Avatar {
    pub name: String,
    pub avatar: String,
}

/// One URL per line. Blank lines and `#` comments are skipped.
pub fn parse_feed_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

pub fn load_feed_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SourceError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_feed_list(&content))
}

/// Name to avatar URL. A later entry with the same name replaces an earlier one.
pub fn avatar_map(avatars: Vec<Avatar>) -> HashMap<String, String> {
    avatars.into_iter().map(|a| (a.name, a.avatar)).collect()
}

pub fn load_avatars<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>, SourceError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: display.clone(),
        source,
    })?;
    let avatars: Vec<Avatar> = serde_json::from_str(&content).map_err(|source| {
        SourceError::Json {
            path: display,
            source,
        }
    })?;

    Ok(avatar_map(avatars))
}
