//! spacetraveling: a server-rendered blog front-end for a Prismic repository
//!
//! Posts are fetched from a headless content API, shaped into view models
//! (reading time, localized publication date, rich-text bodies) and rendered
//! with embedded Tera templates, either by the HTTP server or into static
//! files.

pub mod client;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::Path;

/// The blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Localized strings
    pub i18n: i18n::I18n,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
    /// Static assets copied to the output and served as-is
    pub static_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        Self::with_config(base_dir, config)
    }

    /// Create a Blog from an already-built configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Result<Self> {
        config.validate()?;
        let base_dir = base_dir.as_ref().to_path_buf();

        let mut i18n = i18n::I18n::new(&config.language);
        i18n.load_languages(base_dir.join(&config.languages_dir))?;

        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Ok(Self {
            config,
            i18n,
            base_dir,
            public_dir,
            static_dir,
        })
    }

    /// Build the content client selected by the configuration
    pub fn client(&self) -> Result<std::sync::Arc<dyn client::ContentClient>> {
        client::from_config(&self.config, &self.base_dir)
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
