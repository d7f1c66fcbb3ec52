//! HTTP server rendering pages on demand
//!
//! Pages are rendered through the [`Generator`] and kept in a [`PageStore`].
//! A stored page is served for `revalidate_secs`; after that the stale copy
//! is still served while one background render replaces it. Posts that were
//! not pre-rendered follow the configured fallback: a loading page while the
//! post renders in the background, or an inline render.

mod pages;

pub use pages::{CachedPage, Lookup, PageStore};

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::client::ContentClient;
use crate::config::FallbackMode;
use crate::generator::{Generator, PageError, Route};
use crate::Blog;

/// Seconds between reloads of the loading page
const LOADING_REFRESH_SECS: u64 = 1;

/// Server state
pub struct AppState {
    generator: Generator,
    pages: PageStore,
    static_dir: PathBuf,
    fallback: FallbackMode,
    revalidate: Duration,
}

impl AppState {
    pub fn new(blog: &Blog, client: Arc<dyn ContentClient>) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            generator: Generator::new(blog, client)?,
            pages: PageStore::from_config(&blog.config.server),
            static_dir: blog.static_dir.clone(),
            fallback: blog.config.paths.fallback,
            revalidate: Duration::from_secs(blog.config.revalidate_secs),
        }))
    }

    pub fn pages(&self) -> &PageStore {
        &self.pages
    }

    /// Render a route into a storable page
    ///
    /// Not-found becomes a 404 page; any other failure is logged and
    /// becomes a 500 page.
    async fn render(&self, route: &Route) -> CachedPage {
        match self.generator.render(route).await {
            Ok(html) => CachedPage::new(StatusCode::OK, html),
            Err(PageError::NotFound) => {
                tracing::debug!("Not found: {:?}", route);
                self.not_found_page()
            }
            Err(e) => {
                tracing::error!("Failed to render {:?}: {}", route, e);
                self.error_page()
            }
        }
    }

    fn not_found_page(&self) -> CachedPage {
        let html = self.generator.render_not_found().unwrap_or_else(|e| {
            tracing::error!("Failed to render 404 page: {}", e);
            "Not found".to_string()
        });
        CachedPage::new(StatusCode::NOT_FOUND, html)
    }

    fn error_page(&self) -> CachedPage {
        let html = self.generator.render_error().unwrap_or_else(|e| {
            tracing::error!("Failed to render error page: {}", e);
            "Server error".to_string()
        });
        CachedPage::new(StatusCode::INTERNAL_SERVER_ERROR, html)
    }

    fn loading_response(&self) -> Response {
        match self.generator.render_loading(LOADING_REFRESH_SECS) {
            Ok(html) => ([(header::CACHE_CONTROL, "no-store")], Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render loading page: {}", e);
                page_response(self.error_page(), self.revalidate)
            }
        }
    }
}

/// Render the home page and the enumerated posts into the store
pub async fn prerender(state: &AppState) -> Result<usize> {
    let routes = state.generator.prerender_routes().await?;
    tracing::info!("Pre-rendering {} pages", routes.len());

    let mut rendered = 0;
    for (route, result) in state.generator.render_all(routes).await {
        let page = match result {
            Ok(html) => {
                rendered += 1;
                CachedPage::new(StatusCode::OK, html)
            }
            Err(PageError::NotFound) => state.not_found_page(),
            Err(e) => {
                // Left out of the store so the first request retries it
                tracing::error!("Failed to pre-render {:?}: {}", route, e);
                continue;
            }
        };
        state.pages.insert(route, page).await;
    }

    Ok(rendered)
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/page/:page", get(listing_handler))
        .route("/post/:slug", get(post_handler))
        .fallback(static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let state = AppState::new(blog, blog.client()?)?;
    let count = prerender(&state).await?;
    tracing::info!("Pre-rendered {} pages", count);

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn home_handler(State(state): State<Arc<AppState>>) -> Response {
    serve(state, Route::Listing(1)).await
}

async fn listing_handler(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
) -> Response {
    match page.parse::<u32>() {
        Ok(page) => serve(state, Route::Listing(page.max(1))).await,
        Err(_) => page_response(state.not_found_page(), state.revalidate),
    }
}

async fn post_handler(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    serve(state, Route::Post(slug)).await
}

/// Serve a route from the store, rendering or revalidating it as needed
async fn serve(state: Arc<AppState>, route: Route) -> Response {
    // Listing pages always exist, so they never get a loading state
    let fallback = match route {
        Route::Post(_) => state.fallback,
        Route::Listing(_) => FallbackMode::Blocking,
    };
    let claim = fallback == FallbackMode::Loading;

    match state.pages.lookup(&route, state.revalidate, claim).await {
        Lookup::Serve(page) => page_response(page, state.revalidate),
        Lookup::Revalidate(page) => {
            tracing::debug!("Revalidating {:?}", route);
            tokio::spawn(revalidate(state.clone(), route));
            page_response(page, state.revalidate)
        }
        Lookup::Pending if claim => state.loading_response(),
        Lookup::Missing if claim => {
            tracing::debug!("Rendering {:?} in the background", route);
            tokio::spawn(render_in_background(state.clone(), route));
            state.loading_response()
        }
        Lookup::Pending | Lookup::Missing => {
            let page = state.render(&route).await;
            if page.status != StatusCode::INTERNAL_SERVER_ERROR {
                state.pages.insert(route, page.clone()).await;
            }
            page_response(page, state.revalidate)
        }
    }
}

async fn render_in_background(state: Arc<AppState>, route: Route) {
    let page = state.render(&route).await;
    if page.status == StatusCode::INTERNAL_SERVER_ERROR {
        state.pages.fail(route, page).await;
    } else {
        state.pages.insert(route, page).await;
    }
}

async fn revalidate(state: Arc<AppState>, route: Route) {
    let page = state.render(&route).await;
    if page.status == StatusCode::INTERNAL_SERVER_ERROR {
        state.pages.keep_stale(&route).await;
    } else {
        state.pages.insert(route, page).await;
    }
}

fn page_response(page: CachedPage, revalidate: Duration) -> Response {
    let cache_control = if page.status.is_server_error() {
        "no-store".to_string()
    } else {
        format!(
            "s-maxage={}, stale-while-revalidate",
            revalidate.as_secs()
        )
    };
    (
        page.status,
        [(header::CACHE_CONTROL, cache_control)],
        Html(page.html),
    )
        .into_response()
}

/// Serve static assets, falling back to the 404 page
async fn static_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let mut service = ServeDir::new(&state.static_dir);
    match service.try_call(request).await {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => response.into_response(),
        Ok(_) => page_response(state.not_found_page(), state.revalidate),
        Err(e) => {
            tracing::error!("Failed to serve static file: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}
