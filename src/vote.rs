// src/vote.rs
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{OptionTally, PollResults};

const ALREADY_VOTED: &str = "You have already voted on this poll.";

/// Record one vote for `option_id` on `poll_id` from `voter`.
///
/// Steps run in order and stop at the first failure: the option id must be
/// present and non-zero, the voter must not have voted on this poll yet, and
/// the option must belong to the poll.
pub async fn submit_vote(
    pool: &SqlitePool,
    poll_id: i64,
    option_id: Option<i64>,
    voter: &str,
) -> Result<(), AppError> {
    let option_id = option_id
        .filter(|id| *id != 0)
        .ok_or_else(|| AppError::validation("Option ID is required."))?;

    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM votes WHERE poll_id = ? AND ip_address = ?")
            .bind(poll_id)
            .bind(voter)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        debug!(poll_id, voter, "Duplicate vote rejected");
        return Err(AppError::conflict(ALREADY_VOTED));
    }

    let option: Option<i64> =
        sqlx::query_scalar("SELECT id FROM options WHERE id = ? AND poll_id = ?")
            .bind(option_id)
            .bind(poll_id)
            .fetch_optional(pool)
            .await?;

    if option.is_none() {
        return Err(AppError::not_found("Option not found."));
    }

    insert_vote(pool, poll_id, option_id, voter).await?;
    info!(poll_id, option_id, "Vote recorded");

    Ok(())
}

/// Write the vote row. `UNIQUE (poll_id, ip_address)` turns a submission that
/// raced past the duplicate check into a Conflict.
async fn insert_vote(
    pool: &SqlitePool,
    poll_id: i64,
    option_id: i64,
    voter: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO votes (poll_id, option_id, ip_address, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(poll_id)
    .bind(option_id)
    .bind(voter)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::conflict(ALREADY_VOTED),
        other => AppError::Store(other),
    })?;

    Ok(())
}

/// Per-option tallies for a poll, most votes first.
pub async fn get_results(pool: &SqlitePool, poll_id: i64) -> Result<PollResults, AppError> {
    let (id, title, description) = sqlx::query_as::<_, (i64, String, Option<String>)>(
        "SELECT id, title, description FROM polls WHERE id = ?",
    )
    .bind(poll_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Poll not found."))?;

    let results = sqlx::query_as::<_, OptionTally>(
        r#"
        SELECT o.id, o.text, COUNT(v.id) AS vote_count
        FROM options o
        LEFT JOIN votes v ON v.option_id = o.id AND v.poll_id = ?
        WHERE o.poll_id = ?
        GROUP BY o.id, o.text
        ORDER BY vote_count DESC, o.id ASC
        "#,
    )
    .bind(poll_id)
    .bind(poll_id)
    .fetch_all(pool)
    .await?;

    let total_votes = results.iter().map(|r| r.vote_count).sum();

    Ok(PollResults {
        id,
        title,
        description,
        results,
        total_votes,
    })
}
