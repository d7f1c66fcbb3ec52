//! Generator module - turns documents into pages
//!
//! The [`Generator`] derives view models from fetched documents and renders
//! them with the embedded templates. It backs both the HTTP server (one
//! route at a time) and static generation (every enumerated route written
//! under the public directory).

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tera::Context;
use thiserror::Error;
use walkdir::WalkDir;

use crate::client::{ClientError, ContentClient};
use crate::config::SiteConfig;
use crate::content::fetcher::{self, ListingPage};
use crate::content::rich_text::{renderer_for, RichTextRenderer};
use crate::content::{reading_time_at, Document};
use crate::helpers::{
    date_xml, format_in_timezone, heading_anchor, listing_url, post_url, url_for, DateNames,
};
use crate::templates::{BlockView, Labels, PostSummary, PostView, SiteData, TemplateRenderer};
use crate::Blog;

/// Why a route could not be rendered
#[derive(Debug, Error)]
pub enum PageError {
    #[error("page not found")]
    NotFound,
    #[error(transparent)]
    Client(ClientError),
    #[error("render failed: {0}")]
    Render(#[from] anyhow::Error),
}

impl From<ClientError> for PageError {
    fn from(err: ClientError) -> Self {
        if err.is_not_found() {
            PageError::NotFound
        } else {
            PageError::Client(err)
        }
    }
}

/// A page of the site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Listing page, 1-based
    Listing(u32),
    /// Post detail page by uid
    Post(String),
}

impl Route {
    /// URL path of the route under `root`
    pub fn url(&self, root: &str) -> String {
        match self {
            Route::Listing(page) => listing_url(root, *page),
            Route::Post(uid) => post_url(root, uid),
        }
    }

    /// File the route is written to, relative to the public directory
    ///
    /// `None` for a uid that is not a single plain path component.
    pub fn output_path(&self) -> Option<PathBuf> {
        match self {
            Route::Listing(page) if *page <= 1 => Some(PathBuf::from("index.html")),
            Route::Listing(page) => Some(PathBuf::from(format!("page/{}/index.html", page))),
            Route::Post(uid) => {
                let mut components = Path::new(uid).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(name)), None) => {
                        Some(Path::new("post").join(name).join("index.html"))
                    }
                    _ => None,
                }
            }
        }
    }
}

/// What static generation produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub listing_pages: usize,
    pub posts: usize,
    pub failed: usize,
    pub assets: usize,
}

/// Page renderer backed by a content client
pub struct Generator {
    config: SiteConfig,
    client: Arc<dyn ContentClient>,
    renderer: TemplateRenderer,
    rich_text: Box<dyn RichTextRenderer>,
    site: SiteData,
    labels: Labels,
    date_names: DateNames,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog, client: Arc<dyn ContentClient>) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let config = blog.config.clone();

        let site = SiteData {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            root: url_for(&config.root, ""),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(Self {
            rich_text: renderer_for(&config),
            labels: Labels::from_i18n(&blog.i18n),
            date_names: blog.i18n.date_names(),
            client,
            renderer,
            site,
            config,
        })
    }

    /// Derive the detail-page view model of a post
    pub fn post_view(&self, doc: &Document) -> Result<PostView, PageError> {
        let banner = doc
            .data
            .banner
            .as_ref()
            .filter(|banner| !banner.url.is_empty())
            .ok_or_else(|| anyhow!("post {} has no banner", doc.uid))?;

        let content = doc
            .data
            .content
            .iter()
            .map(|block| BlockView {
                heading: block.heading.clone(),
                anchor: heading_anchor(&block.heading),
                body_html: self.rich_text.render(&block.body),
            })
            .collect();

        let (date, date_iso) = self.dates(doc);
        Ok(PostView {
            uid: doc.uid.clone(),
            title: doc.data.title.clone(),
            author: doc.data.author.clone(),
            banner_url: banner.url.clone(),
            banner_alt: banner
                .alt
                .clone()
                .unwrap_or_else(|| self.labels.banner_alt.clone()),
            date,
            date_iso,
            reading_time: reading_time_at(&doc.data.content, self.config.reading.words_per_minute),
            content,
        })
    }

    /// Derive the listing entry of a post
    pub fn summary(&self, doc: &Document) -> PostSummary {
        let (date, date_iso) = self.dates(doc);
        PostSummary {
            uid: doc.uid.clone(),
            href: post_url(&self.config.root, &doc.uid),
            title: doc.data.title.clone(),
            subtitle: doc.data.subtitle.clone(),
            author: doc.data.author.clone(),
            date,
            date_iso,
        }
    }

    fn dates(&self, doc: &Document) -> (Option<String>, Option<String>) {
        match &doc.first_publication_date {
            Some(published) => (
                Some(format_in_timezone(
                    published,
                    &self.config.date_format,
                    &self.date_names,
                    &self.config.timezone,
                )),
                Some(date_xml(published)),
            ),
            None => (None, None),
        }
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("labels", &self.labels);
        context
    }

    /// Render the detail page of a fetched post
    pub fn render_post_page(&self, doc: &Document) -> Result<String, PageError> {
        let mut context = self.base_context();
        context.insert("post", &self.post_view(doc)?);
        Ok(self.renderer.render("post.html", &context)?)
    }

    /// Render one page of the listing
    pub fn render_listing_page(&self, listing: &ListingPage) -> Result<String, PageError> {
        let posts: Vec<PostSummary> = listing.posts.iter().map(|d| self.summary(d)).collect();
        let next_page_url = listing
            .next_page
            .map(|page| listing_url(&self.config.root, page));

        let mut context = self.base_context();
        context.insert("posts", &posts);
        context.insert("page", &listing.page);
        context.insert("next_page_url", &next_page_url);
        Ok(self.renderer.render("index.html", &context)?)
    }

    /// Transient page shown while a post is fetched on demand
    pub fn render_loading(&self, refresh_secs: u64) -> Result<String> {
        let mut context = self.base_context();
        context.insert("refresh_secs", &refresh_secs);
        self.renderer.render("loading.html", &context)
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.renderer.render("not_found.html", &self.base_context())
    }

    pub fn render_error(&self) -> Result<String> {
        self.renderer.render("error.html", &self.base_context())
    }

    /// Fetch whatever `route` needs and render it
    pub async fn render(&self, route: &Route) -> Result<String, PageError> {
        match route {
            Route::Listing(page) => {
                let listing = fetcher::fetch_listing(self.client.as_ref(), &self.config, *page).await?;
                if *page > 1 && listing.posts.is_empty() {
                    return Err(PageError::NotFound);
                }
                self.render_listing_page(&listing)
            }
            Route::Post(uid) => {
                let doc = fetcher::fetch_post(self.client.as_ref(), &self.config, uid).await?;
                self.render_post_page(&doc)
            }
        }
    }

    /// Routes rendered ahead of any request: the home page plus the enumerated posts
    pub async fn prerender_routes(&self) -> Result<Vec<Route>, ClientError> {
        let uids = fetcher::fetch_paths(self.client.as_ref(), &self.config).await?;
        Ok(std::iter::once(Route::Listing(1))
            .chain(uids.into_iter().map(Route::Post))
            .collect())
    }

    /// Render `routes` concurrently, at most `prerender_concurrency` at a time
    pub async fn render_all(&self, routes: Vec<Route>) -> Vec<(Route, Result<String, PageError>)> {
        stream::iter(routes)
            .map(|route| async move {
                let result = self.render(&route).await;
                (route, result)
            })
            .buffer_unordered(self.config.prerender_concurrency.max(1))
            .collect()
            .await
    }

    /// Write the whole site under `public_dir`
    ///
    /// Every listing page is written. Posts are the enumerated paths, or
    /// every post in the repository when `all_posts` is set. A post that
    /// fails to render is logged and skipped.
    pub async fn generate(
        &self,
        public_dir: &Path,
        static_dir: &Path,
        all_posts: bool,
    ) -> Result<GenerateSummary> {
        fs::create_dir_all(public_dir)?;
        let mut summary = GenerateSummary::default();

        let mut page = 1;
        loop {
            let listing = fetcher::fetch_listing(self.client.as_ref(), &self.config, page).await?;
            let html = self.render_listing_page(&listing)?;
            write_page(public_dir, &Route::Listing(page), &html)?;
            summary.listing_pages += 1;
            match listing.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        let uids = if all_posts {
            fetcher::fetch_all_paths(self.client.as_ref(), &self.config).await?
        } else {
            fetcher::fetch_paths(self.client.as_ref(), &self.config).await?
        };
        let routes = uids
            .into_iter()
            .map(Route::Post)
            .filter(|route| {
                let writable = route.output_path().is_some();
                if !writable {
                    tracing::error!("Skipping {:?}: uid is not a valid file name", route);
                    summary.failed += 1;
                }
                writable
            })
            .collect();

        for (route, result) in self.render_all(routes).await {
            match result {
                Ok(html) => {
                    write_page(public_dir, &route, &html)?;
                    summary.posts += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to render {:?}: {}", route, e);
                    summary.failed += 1;
                }
            }
        }

        fs::write(public_dir.join("404.html"), self.render_not_found()?)?;
        summary.assets = copy_static_assets(static_dir, public_dir)?;

        Ok(summary)
    }
}

fn write_page(public_dir: &Path, route: &Route, html: &str) -> Result<()> {
    let relative = route
        .output_path()
        .ok_or_else(|| anyhow!("{:?} has no output path", route))?;
    let dest = public_dir.join(relative);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&dest, html)?;
    tracing::debug!("Wrote {:?}", dest);
    Ok(())
}

/// Copy static assets (logo, stylesheet, ...) into the output
fn copy_static_assets(static_dir: &Path, public_dir: &Path) -> Result<usize> {
    if !static_dir.exists() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(static_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() {
            let relative = path.strip_prefix(static_dir)?;
            let dest = public_dir.join(relative);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::copy(path, &dest)?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalClient;
    use crate::config::ContentSource;

    fn document(value: serde_json::Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    fn intro_post() -> Document {
        document(serde_json::json!({
            "uid": "intro",
            "type": "posts",
            "first_publication_date": "2021-05-19T12:00:00Z",
            "data": {
                "title": "Criando um app CRA do zero",
                "subtitle": "Tudo sobre como criar a sua primeira aplicação",
                "author": "Danilo Vieira",
                "banner": { "url": "https://images.prismic.io/banner.png" },
                "content": [
                    { "heading": "Intro", "body": [ { "type": "paragraph", "text": "one two three", "spans": [] } ] }
                ]
            }
        }))
    }

    fn bannerless_post() -> Document {
        document(serde_json::json!({
            "uid": "no-banner",
            "type": "posts",
            "first_publication_date": null,
            "data": { "title": "Sem banner", "author": "Ana", "content": [] }
        }))
    }

    fn generator(docs: Vec<Document>) -> Generator {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SiteConfig::default();
        config.content.source = ContentSource::Local;
        let blog = Blog::with_config(dir.path(), config).unwrap();
        Generator::new(&blog, Arc::new(LocalClient::new(docs))).unwrap()
    }

    #[test]
    fn test_post_view() {
        let view = generator(vec![]).post_view(&intro_post()).unwrap();
        assert_eq!(view.reading_time, 1);
        assert_eq!(view.date.as_deref(), Some("19 Mai 2021"));
        assert_eq!(view.banner_alt, "banner");
        assert_eq!(view.content[0].anchor, "intro");
        assert_eq!(view.content[0].body_html, "<p>one two three</p>");
    }

    #[test]
    fn test_missing_banner_fails_at_render_time() {
        let err = generator(vec![]).post_view(&bannerless_post()).unwrap_err();
        assert!(matches!(err, PageError::Render(_)));
    }

    #[test]
    fn test_unpublished_post_has_no_date() {
        let summary = generator(vec![]).summary(&bannerless_post());
        assert_eq!(summary.date, None);
        assert_eq!(summary.href, "/post/no-banner");
    }

    #[tokio::test]
    async fn test_render_routes() {
        let generator = generator(vec![intro_post()]);

        let html = generator.render(&Route::Post("intro".to_string())).await.unwrap();
        assert!(html.contains("Criando um app CRA do zero"));
        assert!(html.contains("1 min"));
        assert!(html.contains("19 Mai 2021"));
        assert!(html.contains("Danilo Vieira"));

        let html = generator.render(&Route::Listing(1)).await.unwrap();
        assert!(html.contains("Tudo sobre como criar a sua primeira aplica"));

        let err = generator
            .render(&Route::Post("missing".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::NotFound));

        let err = generator.render(&Route::Listing(7)).await.unwrap_err();
        assert!(matches!(err, PageError::NotFound));
    }

    #[tokio::test]
    async fn test_prerender_routes() {
        let generator = generator(vec![intro_post(), bannerless_post()]);
        let routes = generator.prerender_routes().await.unwrap();
        assert_eq!(
            routes,
            vec![Route::Listing(1), Route::Post("intro".to_string())]
        );

        let rendered = generator.render_all(routes).await;
        assert_eq!(rendered.len(), 2);
        assert!(rendered.iter().all(|(_, result)| result.is_ok()));
    }

    #[tokio::test]
    async fn test_generate_writes_site() {
        let out = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        fs::write(assets.path().join("Logo.svg"), "<svg/>").unwrap();

        let generator = generator(vec![intro_post(), bannerless_post()]);
        let summary = generator
            .generate(out.path(), assets.path(), true)
            .await
            .unwrap();

        assert_eq!(summary.listing_pages, 1);
        assert_eq!(summary.posts, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.assets, 1);
        assert!(out.path().join("index.html").exists());
        assert!(out.path().join("post/intro/index.html").exists());
        assert!(!out.path().join("post/no-banner/index.html").exists());
        assert!(out.path().join("404.html").exists());
        assert!(out.path().join("Logo.svg").exists());
    }

    #[tokio::test]
    async fn test_generate_skips_uids_outside_public_dir() {
        let out = tempfile::tempdir().unwrap();
        let public = out.path().join("public");
        let mut escaping = intro_post();
        escaping.uid = "../escape".to_string();

        let generator = generator(vec![escaping]);
        let summary = generator
            .generate(&public, &out.path().join("static"), true)
            .await
            .unwrap();

        assert_eq!(summary.posts, 0);
        assert_eq!(summary.failed, 1);
        assert!(!out.path().join("escape").exists());
        assert!(public.join("index.html").exists());
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Listing(1).url("/"), "/");
        assert_eq!(Route::Listing(2).url("/"), "/page/2");
        assert_eq!(Route::Post("x".to_string()).url("/"), "/post/x");
        assert_eq!(
            Route::Listing(1).output_path(),
            Some(PathBuf::from("index.html"))
        );
        assert_eq!(
            Route::Listing(3).output_path(),
            Some(PathBuf::from("page/3/index.html"))
        );
        assert_eq!(
            Route::Post("x".to_string()).output_path(),
            Some(PathBuf::from("post/x/index.html"))
        );
        for uid in ["../x", "..", "a/b", "/etc", ""] {
            assert_eq!(Route::Post(uid.to_string()).output_path(), None, "{}", uid);
        }
    }
}
