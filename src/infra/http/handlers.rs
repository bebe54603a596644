//! Sample handlers.
//!
//! Handlers translate HTTP operations into coordinator calls. Reads populate
//! the canonical keys that mutations later purge; the item key comes from the
//! parsed id so a non-canonical path spelling cannot leave an entry that
//! invalidation would miss.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::application::repos::{CreateSampleParams, UpdateSampleParams};
use crate::cache::keys::{
    CacheKey, sample_collection_keys, sample_item_key, sample_mutation_keys,
};

use super::error::{ApiError, repo_to_api};
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SampleCreateRequest {
    #[serde(default)]
    pub foo: String,
    #[serde(default)]
    pub int_val: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct SamplePatchRequest {
    #[serde(default)]
    pub foo: String,
    #[serde(default)]
    pub int_val: i64,
}

#[derive(Debug, Serialize)]
pub struct SampleCreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct SampleUpdatedResponse {
    pub rows_affected: u64,
}

pub async fn index() -> &'static str {
    "cachet sample service"
}

pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.samples.health_check().await.map_err(repo_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_sample(
    State(state): State<AppState>,
    Json(payload): Json<SampleCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.foo.is_empty() {
        return Err(ApiError::bad_request("missing required field: foo", None));
    }

    let params = CreateSampleParams {
        foo: payload.foo,
        int_val: payload.int_val,
    };

    let samples = state.samples.clone();
    let id = state
        .coordinator
        .write_with_invalidation(
            || async move { samples.create_sample(params).await },
            sample_collection_keys(),
        )
        .await
        .map_err(repo_to_api)?;

    Ok((StatusCode::CREATED, Json(SampleCreatedResponse { id })))
}

pub async fn list_samples(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let key = CacheKey::from_path(uri.path());
    let samples = state.samples.clone();

    let records = state
        .coordinator
        .read_with_cache(key, || async move { samples.list_samples().await })
        .await
        .map_err(repo_to_api)?;

    Ok(Json(records))
}

pub async fn get_sample(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let key = sample_item_key(id);
    let samples = state.samples.clone();

    let record = state
        .coordinator
        .read_with_cache(key, || async move { samples.get_sample(id).await })
        .await
        .map_err(repo_to_api)?;

    Ok(Json(record))
}

pub async fn update_sample(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<SamplePatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let params = UpdateSampleParams {
        foo: payload.foo,
        int_val: payload.int_val,
    };
    if params.is_noop() {
        return Err(ApiError::bad_request("missing patch fields", None));
    }

    let samples = state.samples.clone();
    let rows_affected = state
        .coordinator
        .write_with_invalidation(
            || async move { samples.update_sample(id, params).await },
            sample_mutation_keys(id),
        )
        .await
        .map_err(repo_to_api)?;

    Ok(Json(SampleUpdatedResponse { rows_affected }))
}
