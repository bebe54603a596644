use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, query};

use crate::application::repos::{CreateSampleParams, RepoError, SamplesRepo, UpdateSampleParams};
use crate::domain::entities::SampleRecord;

use super::PostgresSamples;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("invalid input syntax") => {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}

impl PostgresSamples {
    /// Run one statement under the repository's deadline. Expiry is a
    /// `RepoError::Timeout`, same as a server-side statement cancel.
    async fn with_deadline<T, F>(&self, statement: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.op_timeout(), statement).await {
            Ok(result) => result.map_err(map_sqlx_error),
            Err(_) => Err(RepoError::Timeout),
        }
    }
}

#[async_trait]
impl SamplesRepo for PostgresSamples {
    async fn create_sample(&self, params: CreateSampleParams) -> Result<i64, RepoError> {
        let id: i64 = self
            .with_deadline(
                sqlx::query_scalar("INSERT INTO samples (foo, int_val) VALUES ($1, $2) RETURNING id")
                    .bind(&params.foo)
                    .bind(params.int_val)
                    .fetch_one(self.pool()),
            )
            .await?;

        Ok(id)
    }

    async fn get_sample(&self, id: i64) -> Result<SampleRecord, RepoError> {
        self.with_deadline(
            sqlx::query_as::<_, SampleRecord>("SELECT id, foo, int_val FROM samples WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool()),
        )
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn list_samples(&self) -> Result<Vec<SampleRecord>, RepoError> {
        self.with_deadline(
            sqlx::query_as::<_, SampleRecord>("SELECT id, foo, int_val FROM samples ORDER BY id ASC")
                .fetch_all(self.pool()),
        )
        .await
    }

    async fn update_sample(&self, id: i64, params: UpdateSampleParams) -> Result<u64, RepoError> {
        // Sentinel semantics: empty string and zero mean "leave unchanged".
        // `SET id = id` keeps the statement well-formed when a sentinel drops
        // a field.
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE samples SET id = id");

        if !params.foo.is_empty() {
            qb.push(", foo = ");
            qb.push_bind(params.foo);
        }
        if params.int_val != 0 {
            qb.push(", int_val = ");
            qb.push_bind(params.int_val);
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);

        let result = self.with_deadline(qb.build().execute(self.pool())).await?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.with_deadline(async {
            query("SELECT 1").execute(self.pool()).await.map(|_| ())
        })
        .await
    }
}
