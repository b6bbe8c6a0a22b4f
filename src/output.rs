use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::article::Article;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to serialize articles: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

pub fn to_pretty_json(articles: &[Article]) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(articles)?)
}

/// Write `articles` as a pretty-printed JSON array, replacing any previous file.
pub fn write_articles<P: AsRef<Path>>(path: P, articles: &[Article]) -> Result<(), OutputError> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let json = to_pretty_json(articles)?;
    fs::write(path, json)?;
    Ok(())
}
