//! Content repository clients
//!
//! [`ContentClient`] is the query contract the renderers depend on:
//! documents by type (paged) and a single document by uid. The network
//! implementation talks to Prismic; [`LocalClient`] serves documents from
//! JSON files or memory.

mod local;
mod prismic;

pub use local::LocalClient;
pub use prismic::PrismicClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ContentSource, SiteConfig, ENDPOINT_ENV};
use crate::content::Document;

/// Errors returned by content clients
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("document not found: {doc_type}/{uid}")]
    NotFound { doc_type: String, uid: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content API returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("content API has no master ref")]
    NoMasterRef,
    #[error("invalid document: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Options for a query by type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Fields to return (`posts.title`); empty returns every field
    pub fetch: Vec<String>,
    pub page_size: u32,
    /// 1-based
    pub page: u32,
    pub orderings: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            fetch: Vec::new(),
            page_size: 20,
            page: 1,
            orderings: None,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results_per_page: u32,
    #[serde(default)]
    pub total_results_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    /// URL of the next page, when there is one
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub prev_page: Option<String>,
    pub results: Vec<Document>,
}

/// Query contract of a content repository
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Documents of `doc_type`, one page at a time
    async fn get_by_type(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, ClientError>;

    /// The document of `doc_type` whose uid is `uid`
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Document, ClientError>;
}

/// Build the client selected by `content.source`
pub fn from_config(config: &SiteConfig, base_dir: &Path) -> anyhow::Result<Arc<dyn ContentClient>> {
    let client: Arc<dyn ContentClient> = match config.content.source {
        ContentSource::Prismic => {
            if config.content.endpoint.is_empty() {
                anyhow::bail!("content.endpoint is required (or set {})", ENDPOINT_ENV);
            }
            tracing::info!("Using Prismic repository at {}", config.content.endpoint);
            Arc::new(PrismicClient::new(
                &config.content.endpoint,
                config.content.access_token.clone(),
            )?)
        }
        ContentSource::Local => {
            let dir = base_dir.join(&config.content.local_dir);
            tracing::info!("Using local documents from {:?}", dir);
            let client = LocalClient::load(&dir)?;
            if client.is_empty() {
                tracing::warn!("No documents found in {:?}", dir);
            }
            Arc::new(client)
        }
    };
    Ok(client)
}
