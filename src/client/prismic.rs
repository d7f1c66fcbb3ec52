//! Prismic REST API (v2) client

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;

use super::{ClientError, ContentClient, QueryOptions, QueryResponse};
use crate::content::Document;

/// Client for a Prismic repository endpoint such as
/// `https://<repo>.cdn.prismic.io/api/v2`
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: Client,
    endpoint: Url,
    access_token: Option<String>,
}

/// Repository metadata returned by the endpoint root
#[derive(Debug, Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

impl PrismicClient {
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self, ClientError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))?;
        let http = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self {
            http,
            endpoint,
            access_token,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("spacetraveling/", env!("CARGO_PKG_VERSION"))
    }

    /// The ref of the currently published content
    async fn master_ref(&self) -> Result<String, ClientError> {
        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }

        let resp = self.http.get(url).send().await?;
        let info: ApiInfo = serde_json::from_str(&Self::body(resp).await?)?;
        master_ref_of(info)
    }

    /// Build the search URL for one predicate
    fn search_url(
        &self,
        reference: &str,
        predicate: &str,
        options: &QueryOptions,
    ) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!(
            "{}/documents/search",
            self.endpoint.as_str().trim_end_matches('/')
        ))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("ref", reference);
            query.append_pair("q", &format!("[{}]", predicate));
            query.append_pair("pageSize", &options.page_size.to_string());
            query.append_pair("page", &options.page.max(1).to_string());
            if !options.fetch.is_empty() {
                query.append_pair("fetch", &options.fetch.join(","));
            }
            if let Some(orderings) = &options.orderings {
                query.append_pair("orderings", orderings);
            }
            if let Some(token) = &self.access_token {
                query.append_pair("access_token", token);
            }
        }
        Ok(url)
    }

    async fn search(
        &self,
        predicate: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, ClientError> {
        let reference = self.master_ref().await?;
        let url = self.search_url(&reference, predicate, options)?;
        tracing::debug!("Querying {}", predicate);

        let resp = self.http.get(url).send().await?;
        Ok(serde_json::from_str(&Self::body(resp).await?)?)
    }

    /// Body of a successful response; any other status is an error
    async fn body(resp: Response) -> Result<String, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl ContentClient for PrismicClient {
    async fn get_by_type(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, ClientError> {
        self.search(&type_predicate(doc_type), options).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Document, ClientError> {
        let options = QueryOptions {
            page_size: 1,
            ..QueryOptions::default()
        };
        let response = self.search(&uid_predicate(doc_type, uid), &options).await?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }
}

fn master_ref_of(info: ApiInfo) -> Result<String, ClientError> {
    info.refs
        .into_iter()
        .find(|r| r.is_master_ref)
        .map(|r| r.reference)
        .ok_or(ClientError::NoMasterRef)
}

fn type_predicate(doc_type: &str) -> String {
    format!("[at(document.type,\"{}\")]", quote(doc_type))
}

fn uid_predicate(doc_type: &str, uid: &str) -> String {
    format!("[at(my.{}.uid,\"{}\")]", doc_type, quote(uid))
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
