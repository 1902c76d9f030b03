use axum::{extract::Extension, Json};
use market_data::{SearchOutcome, SearchRequest};

use crate::server::app::AppState;
use crate::server::error::ApiError;

/// `POST /search` with `{"prompt": "...", "nlpId": "..."}`.
pub async fn search_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let outcome = state.orchestrator.search(&request).await?;
    Ok(Json(outcome))
}
