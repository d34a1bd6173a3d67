// src/poll.rs
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::AppError;
use crate::models::{CreatePollRequest, PollDetail, PollOption, PollSummary};

pub const MIN_OPTIONS: usize = 2;

const INVALID_POLL: &str = "Title and at least 2 options are required.";

/// A poll that passed validation and is ready to be written.
#[derive(Debug, PartialEq, Eq)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
}

impl TryFrom<CreatePollRequest> for NewPoll {
    type Error = AppError;

    fn try_from(request: CreatePollRequest) -> Result<Self, Self::Error> {
        let title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::validation(INVALID_POLL))?;

        let options: Vec<String> = request
            .options
            .unwrap_or_default()
            .iter()
            .map(|o| o.trim().to_string())
            .collect();

        if options.len() < MIN_OPTIONS {
            return Err(AppError::validation(INVALID_POLL));
        }
        if options.iter().any(String::is_empty) {
            return Err(AppError::validation("Options must not be empty."));
        }

        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            title,
            description,
            options,
        })
    }
}

/// All polls, newest first.
pub async fn list_polls(pool: &SqlitePool) -> Result<Vec<PollSummary>, AppError> {
    let polls = sqlx::query_as::<_, PollSummary>(
        "SELECT id, title, description, created_at FROM polls ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(polls)
}

/// Insert the poll and its options in one transaction and return the poll id.
pub async fn create_poll(pool: &SqlitePool, poll: NewPoll) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let poll_id = sqlx::query("INSERT INTO polls (title, description, created_at) VALUES (?, ?, ?)")
        .bind(&poll.title)
        .bind(&poll.description)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    // An early return drops `tx`, which rolls the poll row back.
    for text in &poll.options {
        sqlx::query("INSERT INTO options (poll_id, text) VALUES (?, ?)")
            .bind(poll_id)
            .bind(text)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!(poll_id, options = poll.options.len(), "Poll created");

    Ok(poll_id)
}

pub async fn get_poll(pool: &SqlitePool, poll_id: i64) -> Result<PollDetail, AppError> {
    let poll = sqlx::query_as::<_, PollSummary>(
        "SELECT id, title, description, created_at FROM polls WHERE id = ?",
    )
    .bind(poll_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Poll not found."))?;

    let options = sqlx::query_as::<_, PollOption>(
        "SELECT id, text FROM options WHERE poll_id = ? ORDER BY id ASC",
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await?;

    Ok(PollDetail { poll, options })
}
