//! Document fetching: path enumeration, single posts and listing pages

use crate::client::{ClientError, ContentClient, QueryOptions};
use crate::config::SiteConfig;
use crate::content::Document;

/// Largest page size the Prismic API accepts
const ALL_PATHS_PAGE_SIZE: u32 = 100;

/// One page of the post listing
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub page: u32,
    pub posts: Vec<Document>,
    /// Page number of the next listing page, when there is one
    pub next_page: Option<u32>,
}

/// Enumerate the uids to pre-render
///
/// The page size is static configuration; uids beyond it are rendered on
/// demand through the route fallback.
pub async fn fetch_paths(
    client: &dyn ContentClient,
    config: &SiteConfig,
) -> Result<Vec<String>, ClientError> {
    let options = QueryOptions {
        fetch: Vec::new(),
        page_size: config.paths.page_size,
        ..QueryOptions::default()
    };
    let response = client
        .get_by_type(&config.content.document_type, &options)
        .await?;
    Ok(response.results.into_iter().map(|doc| doc.uid).collect())
}

/// Enumerate every uid in the repository, page by page
pub async fn fetch_all_paths(
    client: &dyn ContentClient,
    config: &SiteConfig,
) -> Result<Vec<String>, ClientError> {
    let mut uids = Vec::new();
    let mut options = QueryOptions {
        fetch: Vec::new(),
        page_size: ALL_PATHS_PAGE_SIZE,
        ..QueryOptions::default()
    };

    loop {
        let response = client
            .get_by_type(&config.content.document_type, &options)
            .await?;
        let done = response.next_page.is_none() || response.results.is_empty();
        uids.extend(response.results.into_iter().map(|doc| doc.uid));
        if done {
            return Ok(uids);
        }
        options.page += 1;
    }
}

/// Fetch the post whose uid is `uid`
pub async fn fetch_post(
    client: &dyn ContentClient,
    config: &SiteConfig,
    uid: &str,
) -> Result<Document, ClientError> {
    client
        .get_by_uid(&config.content.document_type, uid)
        .await
}

/// Fetch one page of the listing with the configured fields
pub async fn fetch_listing(
    client: &dyn ContentClient,
    config: &SiteConfig,
    page: u32,
) -> Result<ListingPage, ClientError> {
    let page = page.max(1);
    let options = QueryOptions {
        fetch: config.listing.fetch.clone(),
        page_size: config.listing.page_size,
        page,
        orderings: Some(config.listing.orderings.clone()).filter(|o| !o.is_empty()),
    };
    let response = client
        .get_by_type(&config.content.document_type, &options)
        .await?;

    Ok(ListingPage {
        page,
        next_page: response.next_page.as_ref().map(|_| page.saturating_add(1)),
        posts: response.results,
    })
}
