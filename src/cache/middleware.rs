//! Read-through short-circuit middleware.
//!
//! Consults the cache for GET requests before the handler runs; a hit serves
//! the cached snapshot without touching the store. This is the one place a
//! bounded stale read can be observed: a hit may predate a concurrent write's
//! invalidation task.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::{debug, instrument};

use super::coordinator::CacheAside;
use super::keys::CacheKey;

const SOURCE: &str = "cache::middleware";

/// Serve GET requests from the cache when a valid snapshot exists; otherwise
/// fall through to the full read path, which repopulates the entry.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn read_through_cache(
    State(coordinator): State<Arc<CacheAside>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = CacheKey::from_path(request.uri().path());

    if let Some(bytes) = coordinator.read_through(&key).await {
        // A snapshot that no longer parses is treated as a miss, not an error.
        if serde_json::from_slice::<serde_json::Value>(&bytes).is_ok() {
            debug!(target: SOURCE, key = %key, "serving cached snapshot");
            return cached_json_response(bytes);
        }
        debug!(target: SOURCE, key = %key, "cached snapshot malformed, falling through");
    }

    next.run(request).await
}

fn cached_json_response(bytes: Bytes) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{Router, middleware::from_fn_with_state, routing::get};
    use bytes::Bytes;
    use tower::ServiceExt;

    use super::*;
    use crate::cache::{CacheConfig, MemoryCache, TaskTracker, store::Cache};

    fn coordinator_with_cache() -> (Arc<CacheAside>, Arc<MemoryCache>) {
        let config = CacheConfig::default();
        let cache = Arc::new(MemoryCache::new(&config));
        let coordinator = Arc::new(CacheAside::new(config, cache.clone(), TaskTracker::new()));
        (coordinator, cache)
    }

    fn router(coordinator: Arc<CacheAside>) -> Router {
        Router::new()
            .route("/samples/{id}", get(|| async { "from-store" }))
            .layer(from_fn_with_state(coordinator, read_through_cache))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn miss_falls_through_to_handler() {
        let (coordinator, _cache) = coordinator_with_cache();
        let response = router(coordinator)
            .oneshot(
                Request::builder()
                    .uri("/samples/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "from-store");
    }

    #[tokio::test]
    async fn hit_short_circuits_the_handler() {
        let (coordinator, cache) = coordinator_with_cache();
        cache
            .put(
                &CacheKey::from_path("/samples/1"),
                Bytes::from_static(b"{\"id\":1,\"foo\":\"a\",\"int_val\":1}"),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let response = router(coordinator)
            .oneshot(
                Request::builder()
                    .uri("/samples/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(
            body_string(response).await,
            "{\"id\":1,\"foo\":\"a\",\"int_val\":1}"
        );
    }

    #[tokio::test]
    async fn malformed_snapshot_falls_through() {
        let (coordinator, cache) = coordinator_with_cache();
        cache
            .put(
                &CacheKey::from_path("/samples/1"),
                Bytes::from_static(b"{truncated"),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let response = router(coordinator)
            .oneshot(
                Request::builder()
                    .uri("/samples/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "from-store");
    }

    #[tokio::test]
    async fn non_get_requests_bypass_the_cache() {
        let (coordinator, cache) = coordinator_with_cache();
        cache
            .put(
                &CacheKey::from_path("/samples/1"),
                Bytes::from_static(b"{\"id\":1}"),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let app = Router::new()
            .route(
                "/samples/{id}",
                axum::routing::patch(|| async { "patched" }),
            )
            .layer(from_fn_with_state(coordinator, read_through_cache));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::PATCH)
                    .uri("/samples/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "patched");
    }
}
