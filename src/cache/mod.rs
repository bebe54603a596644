//! Cache-aside layer.
//!
//! The store stays the source of truth; cache entries are derived, expendable
//! snapshots populated after reads and purged after writes. Population and
//! invalidation run as detached background tasks so cache latency never sits
//! on a request's critical path.

pub mod config;
pub mod coordinator;
pub mod keys;
mod lock;
pub mod middleware;
pub mod store;
pub mod tasks;

pub use config::CacheConfig;
pub use coordinator::CacheAside;
pub use keys::CacheKey;
pub use store::{Cache, CacheError, MemoryCache};
pub use tasks::TaskTracker;
