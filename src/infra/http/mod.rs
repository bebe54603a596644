pub mod error;
mod handlers;
mod state;

pub use error::{ApiError, repo_to_api};
pub use state::AppState;

use axum::{Router, middleware::from_fn_with_state, routing::get};

use crate::cache::middleware::read_through_cache;

/// Assemble the service router. Sample routes sit behind the read-through
/// middleware; writes pass straight through it.
pub fn build_router(state: AppState) -> Router {
    let samples = Router::new()
        .route(
            "/samples",
            get(handlers::list_samples).post(handlers::create_sample),
        )
        .route(
            "/samples/{id}",
            get(handlers::get_sample).patch(handlers::update_sample),
        )
        .route_layer(from_fn_with_state(
            state.coordinator.clone(),
            read_through_cache,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .merge(samples)
        .with_state(state)
}
