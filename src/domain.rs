use thiserror::Error;
use url::{ParseError, Url};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid url {url}: {source}")]
    Invalid {
        url: String,
        #[source]
        source: ParseError,
    },
    #[error("empty domain from url: {0}")]
    EmptyHost(String),
}

/// Reduce a site link to `scheme://host`.
///
/// The host comes back in its normalized ASCII form: lowercased, with
/// internationalized names punycode-encoded. Scheme-relative links
/// (`//host/path`) are treated as https.
pub fn extract_domain(site_url: &str) -> Result<String, DomainError> {
    let trimmed = site_url.trim();

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) if trimmed.starts_with("//") => {
            Url::parse(&format!("https:{}", trimmed)).map_err(|source| DomainError::Invalid {
                url: site_url.to_string(),
                source,
            })?
        }
        Err(source) => {
            return Err(DomainError::Invalid {
                url: site_url.to_string(),
                source,
            })
        }
    };

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(format!("{}://{}", parsed.scheme(), host)),
        _ => Err(DomainError::EmptyHost(site_url.to_string())),
    }
}
