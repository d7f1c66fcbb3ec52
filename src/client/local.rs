//! Documents served from JSON files or memory

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{ClientError, ContentClient, QueryOptions, QueryResponse};
use crate::content::Document;

/// An in-process content repository
///
/// Queries ignore `fetch` and always return whole documents, newest first.
#[derive(Debug, Clone, Default)]
pub struct LocalClient {
    documents: Vec<Document>,
}

impl LocalClient {
    pub fn new(mut documents: Vec<Document>) -> Self {
        documents.sort_by(|a, b| b.first_publication_date.cmp(&a.first_publication_date));
        Self { documents }
    }

    /// Load every `*.json` file under `dir`; a file holds one document or an array of them
    pub fn load(dir: &Path) -> Result<Self, ClientError> {
        let mut documents = Vec::new();

        for entry in WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = fs::read_to_string(path).map_err(|source| ClientError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let value: serde_json::Value = serde_json::from_str(&content)?;
            match value {
                serde_json::Value::Array(items) => {
                    for item in items {
                        documents.push(serde_json::from_value(item)?);
                    }
                }
                other => documents.push(serde_json::from_value(other)?),
            }
            tracing::debug!("Loaded documents from {:?}", path);
        }

        tracing::info!("Loaded {} local documents", documents.len());
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl ContentClient for LocalClient {
    async fn get_by_type(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, ClientError> {
        let matching: Vec<&Document> = self
            .documents
            .iter()
            .filter(|d| d.doc_type == doc_type)
            .collect();

        let page_size = options.page_size.max(1);
        let page = options.page.max(1);
        let total = matching.len() as u32;
        let total_pages = total.div_ceil(page_size);

        let offset = (page as usize - 1).saturating_mul(page_size as usize);
        let results = matching
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(QueryResponse {
            page,
            results_per_page: page_size,
            total_results_size: total,
            total_pages,
            next_page: (page < total_pages).then(|| format!("?page={}", page + 1)),
            prev_page: (page > 1).then(|| format!("?page={}", page - 1)),
            results,
        })
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Document, ClientError> {
        self.documents
            .iter()
            .find(|d| d.doc_type == doc_type && d.uid == uid)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }
}
