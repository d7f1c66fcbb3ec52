//! Rendered-page store with stale-while-revalidate semantics
//!
//! Two bounded LRU caches: rendered pages, and the routes that have no page
//! of their own (not-found results, in-flight and failed renders).

use axum::http::StatusCode;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::ServerConfig;
use crate::generator::Route;

/// A rendered response body and its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub status: StatusCode,
    pub html: String,
}

impl CachedPage {
    pub fn new(status: StatusCode, html: String) -> Self {
        Self { status, html }
    }
}

#[derive(Debug)]
enum Slot {
    /// A background render is in flight
    Pending,
    Ready {
        page: CachedPage,
        rendered_at: Instant,
        refreshing: bool,
    },
    /// A background render failed; served to the next request, then dropped
    Failed(CachedPage),
}

/// What the store holds for a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Serve as-is
    Serve(CachedPage),
    /// Serve as-is; the caller now owns the re-render
    Revalidate(CachedPage),
    /// Another request is rendering the route
    Pending,
    /// Nothing stored; when claimed, the caller owns the render
    Missing,
}

#[derive(Debug)]
struct Slots {
    pages: LruCache<Route, Slot>,
    missing: LruCache<Route, Slot>,
}

/// Pages shared by every request
#[derive(Debug, Clone)]
pub struct PageStore {
    slots: Arc<Mutex<Slots>>,
}

impl PageStore {
    pub fn new(max_pages: NonZeroUsize, max_missing_pages: NonZeroUsize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                pages: LruCache::new(max_pages),
                missing: LruCache::new(max_missing_pages),
            })),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.max_pages_non_zero(),
            config.max_missing_pages_non_zero(),
        )
    }

    /// Look `route` up, treating pages older than `max_age` as stale
    ///
    /// With `claim`, a missing route is marked pending so that only one
    /// background render runs for it.
    pub async fn lookup(&self, route: &Route, max_age: Duration, claim: bool) -> Lookup {
        let mut slots = self.slots.lock().await;

        if let Some(lookup) = lookup_slot(&mut slots.pages, route, max_age) {
            return lookup;
        }
        if let Some(lookup) = lookup_slot(&mut slots.missing, route, max_age) {
            return lookup;
        }
        if claim {
            slots.missing.put(route.clone(), Slot::Pending);
        }
        Lookup::Missing
    }

    /// Store a freshly rendered page
    ///
    /// Not-found pages go to the missing-page cache, everything else to the
    /// page cache.
    pub async fn insert(&self, route: Route, page: CachedPage) {
        let mut slots = self.slots.lock().await;
        let slot = Slot::Ready {
            page,
            rendered_at: Instant::now(),
            refreshing: false,
        };

        if is_missing(&slot) {
            slots.pages.pop(&route);
            slots.missing.put(route, slot);
        } else {
            slots.missing.pop(&route);
            slots.pages.put(route, slot);
        }
    }

    /// Store the outcome of a background render that could not produce the page
    pub async fn fail(&self, route: Route, page: CachedPage) {
        let mut slots = self.slots.lock().await;
        slots.pages.pop(&route);
        slots.missing.put(route, Slot::Failed(page));
    }

    /// End a revalidation whose render failed; the stale page stays
    pub async fn keep_stale(&self, route: &Route) {
        let mut slots = self.slots.lock().await;
        let Slots { pages, missing } = &mut *slots;
        for cache in [pages, missing] {
            if let Some(Slot::Ready { refreshing, .. }) = cache.peek_mut(route) {
                *refreshing = false;
            }
        }
    }

    /// Number of stored entries, pages and missing routes together
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.pages.len() + slots.missing.len()
    }
}

fn is_missing(slot: &Slot) -> bool {
    matches!(slot, Slot::Ready { page, .. } if page.status == StatusCode::NOT_FOUND)
}

fn lookup_slot(
    cache: &mut LruCache<Route, Slot>,
    route: &Route,
    max_age: Duration,
) -> Option<Lookup> {
    let lookup = match cache.get_mut(route)? {
        Slot::Pending => Lookup::Pending,
        Slot::Ready {
            page,
            rendered_at,
            refreshing,
        } => {
            if rendered_at.elapsed() < max_age || *refreshing {
                Lookup::Serve(page.clone())
            } else {
                *refreshing = true;
                Lookup::Revalidate(page.clone())
            }
        }
        Slot::Failed(_) => match cache.pop(route) {
            Some(Slot::Failed(page)) => Lookup::Serve(page),
            _ => Lookup::Missing,
        },
    };
    Some(lookup)
}
