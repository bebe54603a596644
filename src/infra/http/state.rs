use std::sync::Arc;

use crate::application::repos::SamplesRepo;
use crate::cache::CacheAside;

/// Shared handles for request handlers: the store behind its trait and the
/// cache-aside coordinator. Constructed once at startup, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub samples: Arc<dyn SamplesRepo>,
    pub coordinator: Arc<CacheAside>,
}
