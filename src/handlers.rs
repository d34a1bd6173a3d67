// handlers.rs
use axum::extract::State;
use http::StatusCode;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath, VoterIdentity};
use crate::models::{
    CreatePollRequest, CreatePollResponse, MessageResponse, PollDetail, PollResults, PollSummary,
    VoteRequest,
};
use crate::poll::{self, NewPoll};
use crate::routes::AppState;
use crate::vote;

/// List every poll, newest first
pub async fn list_polls(
    State(state): State<AppState>,
) -> Result<AppJson<Vec<PollSummary>>, AppError> {
    Ok(AppJson(poll::list_polls(&state.pool).await?))
}

/// Create a poll together with its options
pub async fn create_poll(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreatePollRequest>,
) -> Result<(StatusCode, AppJson<CreatePollResponse>), AppError> {
    let new_poll = NewPoll::try_from(request)?;
    let id = poll::create_poll(&state.pool, new_poll).await?;

    Ok((
        StatusCode::CREATED,
        AppJson(CreatePollResponse {
            id,
            message: "Poll created successfully.".to_string(),
        }),
    ))
}

pub async fn get_poll(
    State(state): State<AppState>,
    AppPath(poll_id): AppPath<i64>,
) -> Result<AppJson<PollDetail>, AppError> {
    Ok(AppJson(poll::get_poll(&state.pool, poll_id).await?))
}

/// Vote on a poll, once per client address
pub async fn submit_vote(
    State(state): State<AppState>,
    AppPath(poll_id): AppPath<i64>,
    VoterIdentity(voter): VoterIdentity,
    AppJson(request): AppJson<VoteRequest>,
) -> Result<(StatusCode, AppJson<MessageResponse>), AppError> {
    vote::submit_vote(&state.pool, poll_id, request.option_id, &voter).await?;

    Ok((
        StatusCode::CREATED,
        AppJson(MessageResponse {
            message: "Vote submitted successfully.".to_string(),
        }),
    ))
}

pub async fn get_results(
    State(state): State<AppState>,
    AppPath(poll_id): AppPath<i64>,
) -> Result<AppJson<PollResults>, AppError> {
    Ok(AppJson(vote::get_results(&state.pool, poll_id).await?))
}
