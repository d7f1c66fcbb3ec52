//! Site configuration (_config.yml)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

/// Environment variable overriding `content.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable overriding `content.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,
    pub languages_dir: String,

    // Date format (Moment.js tokens)
    pub date_format: String,

    /// Seconds a rendered page stays fresh
    pub revalidate_secs: u64,
    /// Upper bound on concurrent renders while pre-rendering
    pub prerender_concurrency: usize,

    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub reading: ReadingConfig,
    #[serde(default)]
    pub rich_text: RichTextConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "SpaceTraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),
            languages_dir: "languages".to_string(),

            date_format: "DD MMM YYYY".to_string(),

            revalidate_secs: 60 * 5,
            prerender_concurrency: 4,

            content: ContentConfig::default(),
            paths: PathsConfig::default(),
            listing: ListingConfig::default(),
            reading: ReadingConfig::default(),
            rich_text: RichTextConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply API credentials from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("Using content endpoint from {}", ENDPOINT_ENV);
            self.content.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.content.access_token = Some(token);
        }
    }

    /// Reject settings that would make rendering meaningless
    pub fn validate(&self) -> Result<()> {
        if self.reading.words_per_minute == 0 {
            bail!("reading.words_per_minute must be greater than zero");
        }
        if self.listing.page_size == 0 || self.paths.page_size == 0 {
            bail!("page sizes must be greater than zero");
        }
        if self.prerender_concurrency == 0 {
            bail!("prerender_concurrency must be greater than zero");
        }
        if !self.timezone.is_empty() && self.timezone.parse::<chrono_tz::Tz>().is_err() {
            bail!("unknown timezone: {}", self.timezone);
        }
        Ok(())
    }
}

/// Where documents come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Prismic,
    Local,
}

/// Content repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub source: ContentSource,
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Directory of JSON documents when `source: local`
    pub local_dir: String,
    pub document_type: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            source: ContentSource::Prismic,
            endpoint: String::new(),
            access_token: None,
            local_dir: "content".to_string(),
            document_type: "posts".to_string(),
        }
    }
}

/// What a route does when its page has not been rendered yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Serve a loading page and render in the background
    Loading,
    /// Render before answering
    Blocking,
}

/// Static path enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub page_size: u32,
    pub fallback: FallbackMode,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            page_size: 1,
            fallback: FallbackMode::Loading,
        }
    }
}

/// Home page listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: u32,
    pub fetch: Vec<String>,
    pub orderings: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            fetch: vec![
                "posts.title".to_string(),
                "posts.subtitle".to_string(),
                "posts.author".to_string(),
            ],
            orderings: "[document.first_publication_date desc]".to_string(),
        }
    }
}

/// Reading-time estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub words_per_minute: usize,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: crate::content::WORDS_PER_MINUTE,
        }
    }
}

/// Rich-text output policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RichTextConfig {
    /// Pass rendered bodies through an HTML sanitizer
    pub sanitize: bool,
}

/// Rendered-page store limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Rendered pages kept in memory, least recently used evicted first
    pub max_pages: usize,
    /// Not-found and in-flight entries, held in their own cache
    pub max_missing_pages: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_pages: 1024,
            max_missing_pages: 128,
        }
    }
}

impl ServerConfig {
    /// `max_pages` as a cache capacity, clamped to 1
    pub fn max_pages_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_pages).unwrap_or(NonZeroUsize::MIN)
    }

    /// `max_missing_pages` as a cache capacity, clamped to 1
    pub fn max_missing_pages_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_missing_pages).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "SpaceTraveling");
        assert_eq!(config.language, "pt-BR");
        assert_eq!(config.revalidate_secs, 300);
        assert_eq!(config.reading.words_per_minute, 200);
        assert_eq!(config.paths.fallback, FallbackMode::Loading);
        assert_eq!(config.server.max_pages_non_zero().get(), 1024);
    }

    #[test]
    fn test_store_limits_are_clamped() {
        let config: SiteConfig =
            serde_yaml::from_str("server:\n  max_pages: 0\n  max_missing_pages: 16\n").unwrap();
        assert_eq!(config.server.max_pages_non_zero().get(), 1);
        assert_eq!(config.server.max_missing_pages_non_zero().get(), 16);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
language: en
content:
  source: local
  local_dir: fixtures
paths:
  page_size: 20
  fallback: blocking
rich_text:
  sanitize: true
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.language, "en");
        assert_eq!(config.content.source, ContentSource::Local);
        assert_eq!(config.content.local_dir, "fixtures");
        assert_eq!(config.content.document_type, "posts");
        assert_eq!(config.paths.page_size, 20);
        assert_eq!(config.paths.fallback, FallbackMode::Blocking);
        assert!(config.rich_text.sanitize);
        assert_eq!(config.listing.page_size, 5);
    }

    #[test]
    fn test_validate() {
        let mut config = SiteConfig::default();
        assert!(config.validate().is_ok());

        config.reading.words_per_minute = 0;
        assert!(config.validate().is_err());

        config.reading.words_per_minute = 200;
        config.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());

        config.timezone = "America/Sao_Paulo".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(
            Some("https://blog.cdn.prismic.io/api/v2".to_string()),
            Some(String::new()),
        );
        assert_eq!(config.content.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.content.access_token, None);
    }
}
