use std::collections::HashMap;

use crate::config::IdentityConfig;

/// Maps the title a feed reports for itself to the name shown on the site,
/// and that name to an avatar.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    aliases: HashMap<String, String>,
    avatars: HashMap<String, String>,
    default_avatar: String,
}

impl IdentityResolver {
    pub fn new(
        aliases: HashMap<String, String>,
        avatars: HashMap<String, String>,
        default_avatar: impl Into<String>,
    ) -> Self {
        Self {
            aliases,
            avatars,
            default_avatar: default_avatar.into(),
        }
    }

    pub fn from_config(config: &IdentityConfig, avatars: HashMap<String, String>) -> Self {
        Self::new(config.aliases.clone(), avatars, config.default_avatar.clone())
    }

    pub fn canonical_name(&self, feed_title: &str) -> String {
        self.aliases
            .get(feed_title)
            .cloned()
            .unwrap_or_else(|| feed_title.to_string())
    }

    pub fn avatar_for(&self, name: &str) -> String {
        match self.avatars.get(name) {
            Some(url) if !url.is_empty() => url.clone(),
            _ => self.default_avatar.clone(),
        }
    }

    /// Returns `(canonical_name, avatar_url)`.
    pub fn resolve(&self, feed_title: &str) -> (String, String) {
        let name = self.canonical_name(feed_title);
        let avatar = self.avatar_for(&name);
        (name, avatar)
    }
}
