//! Postgres-backed repository implementation.

mod samples;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub use samples::map_sqlx_error;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct PostgresSamples {
    pool: PgPool,
    op_timeout: Duration,
}

impl PostgresSamples {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Deadline applied to every statement, acquire included.
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }
}
