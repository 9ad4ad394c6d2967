//! Prometheus exposition

use axum::extract::State;
use crate::AppState;

/// Render every recorded metric in the Prometheus text format
pub async fn render(State(state): State<AppState>) -> String {
    match &state.metrics {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}
