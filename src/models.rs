// models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PollSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PollOption {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollDetail {
    #[serde(flatten)]
    pub poll: PollSummary,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OptionTally {
    pub id: i64,
    pub text: String,
    pub vote_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResults {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub results: Vec<OptionTally>,
    #[serde(rename = "totalVotes")]
    pub total_votes: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePollRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CreatePollResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct VoteRequest {
    pub option_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
