//! End-to-end tests driving the HTTP router

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tower::ServiceExt;

use spacetraveling::client::{ClientError, ContentClient, LocalClient, QueryOptions, QueryResponse};
use spacetraveling::config::{ContentSource, FallbackMode, SiteConfig};
use spacetraveling::content::Document;
use spacetraveling::server::{self, AppState};
use spacetraveling::Blog;

/// A repository whose documents can be replaced while the server runs
struct Repository {
    inner: RwLock<LocalClient>,
}

impl Repository {
    fn new(docs: Vec<Document>) -> Self {
        Self {
            inner: RwLock::new(LocalClient::new(docs)),
        }
    }

    fn replace(&self, docs: Vec<Document>) {
        *self.inner.write().unwrap() = LocalClient::new(docs);
    }

    fn snapshot(&self) -> LocalClient {
        self.inner.read().unwrap().clone()
    }
}

#[async_trait]
impl ContentClient for Repository {
    async fn get_by_type(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, ClientError> {
        self.snapshot().get_by_type(doc_type, options).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Document, ClientError> {
        self.snapshot().get_by_uid(doc_type, uid).await
    }
}

fn post(uid: &str, title: &str, published: &str) -> Document {
    serde_json::from_value(serde_json::json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "posts",
        "first_publication_date": published,
        "last_publication_date": published,
        "data": {
            "title": title,
            "subtitle": "Pensando em sincronização em vez de ciclos de vida",
            "author": "Joseph Oliveira",
            "banner": { "url": "https://images.prismic.io/spacetraveling/banner.png", "alt": null },
            "content": [
                {
                    "heading": "Proin et varius",
                    "body": [
                        { "type": "paragraph", "text": "Lorem ipsum dolor sit amet", "spans": [] },
                        { "type": "paragraph", "text": "consectetur adipiscing elit", "spans": [
                            { "start": 0, "end": 11, "type": "strong" }
                        ] }
                    ]
                }
            ]
        }
    }))
    .unwrap()
}

fn site(
    fallback: FallbackMode,
    revalidate_secs: u64,
    repository: Arc<Repository>,
) -> (tempfile::TempDir, Arc<AppState>) {
    let mut config = SiteConfig::default();
    config.paths.fallback = fallback;
    config.revalidate_secs = revalidate_secs;
    site_with_config(config, repository)
}

fn site_with_config(
    mut config: SiteConfig,
    repository: Arc<Repository>,
) -> (tempfile::TempDir, Arc<AppState>) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("static")).unwrap();
    std::fs::write(dir.path().join("static/style.css"), "body {}").unwrap();

    config.content.source = ContentSource::Local;

    let blog = Blog::with_config(dir.path(), config).unwrap();
    let state = AppState::new(&blog, repository).unwrap();
    (dir, state)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Poll `uri` until `done` accepts the response
async fn poll(app: &Router, uri: &str, done: impl Fn(StatusCode, &str) -> bool) -> (StatusCode, String) {
    for _ in 0..200 {
        let (status, body) = get(app, uri).await;
        if done(status, &body) {
            return (status, body);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never settled", uri);
}

#[tokio::test]
async fn test_post_page() {
    let repository = Arc::new(Repository::new(vec![post(
        "como-utilizar-hooks",
        "Como utilizar Hooks",
        "2021-05-19T12:00:00+0000",
    )]));
    let (_dir, state) = site(FallbackMode::Blocking, 300, repository);
    let app = server::router(state);

    let (status, body) = get(&app, "/post/como-utilizar-hooks").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<title>SpaceTraveling | Como utilizar Hooks</title>"));
    assert!(body.contains("19 Mai 2021"));
    assert!(body.contains("Joseph Oliveira"));
    assert!(body.contains("1 min"));
    assert!(body.contains("Proin et varius"));
    assert!(body.contains("<p><strong>consectetur</strong> adipiscing elit</p>"));
}

#[tokio::test]
async fn test_listing_page() {
    let repository = Arc::new(Repository::new(vec![
        post("primeiro", "Primeiro post", "2021-03-15T19:25:28+0000"),
        post("segundo", "Segundo post", "2021-04-15T19:25:28+0000"),
    ]));
    let (_dir, state) = site(FallbackMode::Loading, 300, repository);
    let app = server::router(state);

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    let newest = body.find("Segundo post").unwrap();
    let oldest = body.find("Primeiro post").unwrap();
    assert!(newest < oldest);
    assert!(body.contains("15 Abr 2021"));

    let (status, _) = get(&app, "/page/9").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_post_blocking() {
    let repository = Arc::new(Repository::new(vec![]));
    let (_dir, state) = site(FallbackMode::Blocking, 300, repository);
    let app = server::router(state);

    let (status, body) = get(&app, "/post/nao-existe").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Página não encontrada"));
}

#[tokio::test]
async fn test_missing_post_shows_loading_then_not_found() {
    let repository = Arc::new(Repository::new(vec![]));
    let (_dir, state) = site(FallbackMode::Loading, 300, repository);
    let app = server::router(state);

    let (status, body) = get(&app, "/post/nao-existe").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Carregando..."));

    let (status, body) = poll(&app, "/post/nao-existe", |status, _| {
        status != StatusCode::OK
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Página não encontrada"));
}

#[tokio::test]
async fn test_prerendered_post_is_served_from_the_store() {
    let repository = Arc::new(Repository::new(vec![post(
        "hooks",
        "Como utilizar Hooks",
        "2021-05-19T12:00:00Z",
    )]));
    let (_dir, state) = site(FallbackMode::Loading, 300, repository.clone());

    assert_eq!(server::prerender(&state).await.unwrap(), 2);
    assert_eq!(state.pages().len().await, 2);

    repository.replace(vec![]);
    let app = server::router(state);
    let (status, body) = get(&app, "/post/hooks").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Como utilizar Hooks"));
}

#[tokio::test]
async fn test_stale_page_is_revalidated() {
    let repository = Arc::new(Repository::new(vec![post(
        "hooks",
        "Old title",
        "2021-05-19T12:00:00Z",
    )]));
    let (_dir, state) = site(FallbackMode::Loading, 0, repository.clone());
    server::prerender(&state).await.unwrap();
    let app = server::router(state);

    repository.replace(vec![post("hooks", "New title", "2021-05-19T12:00:00Z")]);

    let (status, body) = get(&app, "/post/hooks").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Old title"));

    poll(&app, "/post/hooks", |_, body| body.contains("New title")).await;
}

#[tokio::test]
async fn test_static_assets() {
    let repository = Arc::new(Repository::new(vec![]));
    let (_dir, state) = site(FallbackMode::Loading, 300, repository);
    let app = server::router(state);

    let (status, body) = get(&app, "/style.css").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "body {}");

    let (status, _) = get(&app, "/nothing-here.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_slugs_keep_the_store_bounded() {
    let repository = Arc::new(Repository::new(vec![post(
        "hooks",
        "Como utilizar Hooks",
        "2021-05-19T12:00:00Z",
    )]));
    let mut config = SiteConfig::default();
    config.paths.fallback = FallbackMode::Blocking;
    config.server.max_pages = 8;
    config.server.max_missing_pages = 4;
    let (_dir, state) = site_with_config(config, repository.clone());
    server::prerender(&state).await.unwrap();
    let app = server::router(state.clone());

    for i in 0..500 {
        let (status, _) = get(&app, &format!("/post/junk-{}", i)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    assert!(state.pages().len().await <= 12);

    // The pre-rendered post is still served from the store
    repository.replace(vec![]);
    let (status, body) = get(&app, "/post/hooks").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Como utilizar Hooks"));
}

#[tokio::test]
async fn test_invalid_listing_pages_are_not_found() {
    let repository = Arc::new(Repository::new(vec![post(
        "hooks",
        "Como utilizar Hooks",
        "2021-05-19T12:00:00Z",
    )]));
    let (_dir, state) = site(FallbackMode::Loading, 300, repository);
    let app = server::router(state);

    for uri in ["/page/abc", "/page/-1", "/page/4294967295", "/page/99999999999"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert!(body.contains("Página não encontrada"), "{}", uri);
    }
}
