//! Question answering handler

use axum::extract::{rejection::QueryRejection, Query, State};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use swai_common::errors::{AppError, Result};

/// Question query string
#[derive(Debug, Deserialize, Validate)]
pub struct AskQuery {
    #[validate(length(min = 1, max = 2000))]
    pub q: String,
}

/// Forward a question to the assistant and return its plain text answer
pub async fn ask(
    State(state): State<AppState>,
    query: std::result::Result<Query<AskQuery>, QueryRejection>,
) -> Result<String> {
    let Query(query) = query.map_err(|e| AppError::Validation {
        message: e.body_text(),
        field: Some("q".to_string()),
    })?;
    query.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("q".to_string()),
    })?;

    tracing::info!(model = state.assistant.model(), "Answering question");
    state.assistant.ask(&query.q).await
}
