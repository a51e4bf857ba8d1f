//! Repository for the `asset_code_sequences` table.

use sqlx::PgPool;

/// Per-`(prefix, year)` counters behind asset internal codes.
pub struct SequenceRepo;

impl SequenceRepo {
    /// Increment and return the counter for `(prefix, year)`, creating it at 1.
    ///
    /// A single upsert statement, so concurrent callers serialize on the row
    /// lock and never observe the same value.
    pub async fn next(pool: &PgPool, prefix: &str, year: i32) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO asset_code_sequences (prefix, year, last_value) \
             VALUES ($1, $2, 1) \
             ON CONFLICT (prefix, year) \
             DO UPDATE SET last_value = asset_code_sequences.last_value + 1 \
             RETURNING last_value",
        )
        .bind(prefix)
        .bind(year)
        .fetch_one(pool)
        .await
    }
}
