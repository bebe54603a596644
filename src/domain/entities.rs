//! Domain records persisted by the store.

use serde::{Deserialize, Serialize};

/// A row in the `samples` table.
///
/// `id` is assigned by the store on insert and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SampleRecord {
    pub id: i64,
    pub foo: String,
    pub int_val: i64,
}
