//! Shared fixtures: an in-memory store fake and a router wired against it.
#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use cachet::application::repos::{
    CreateSampleParams, RepoError, SamplesRepo, UpdateSampleParams,
};
use cachet::cache::{CacheAside, CacheConfig, MemoryCache, TaskTracker};
use cachet::domain::entities::SampleRecord;
use cachet::infra::http::{AppState, build_router};
use tower::ServiceExt;

/// In-memory `SamplesRepo` with the same observable contract as the Postgres
/// implementation, including the partial-update sentinel semantics.
pub struct MemorySamples {
    rows: Mutex<Vec<SampleRecord>>,
    next_id: AtomicI64,
}

impl MemorySamples {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl SamplesRepo for MemorySamples {
    async fn create_sample(&self, params: CreateSampleParams) -> Result<i64, RepoError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().unwrap().push(SampleRecord {
            id,
            foo: params.foo,
            int_val: params.int_val,
        });
        Ok(id)
    }

    async fn get_sample(&self, id: i64) -> Result<SampleRecord, RepoError> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list_samples(&self) -> Result<Vec<SampleRecord>, RepoError> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    async fn update_sample(&self, id: i64, params: UpdateSampleParams) -> Result<u64, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                if !params.foo.is_empty() {
                    row.foo = params.foo;
                }
                if params.int_val != 0 {
                    row.int_val = params.int_val;
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub samples: Arc<MemorySamples>,
    pub cache: Arc<MemoryCache>,
    pub coordinator: Arc<CacheAside>,
}

pub fn test_app() -> TestApp {
    test_app_with_config(CacheConfig::default())
}

pub fn test_app_with_config(config: CacheConfig) -> TestApp {
    let samples = Arc::new(MemorySamples::new());
    let cache = Arc::new(MemoryCache::new(&config));
    let coordinator = Arc::new(CacheAside::new(config, cache.clone(), TaskTracker::new()));
    let router = build_router(AppState {
        samples: samples.clone(),
        coordinator: coordinator.clone(),
    });
    TestApp {
        router,
        samples,
        cache,
        coordinator,
    }
}

pub async fn send_json(
    router: &Router,
    method: &str,
    path: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    router
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
