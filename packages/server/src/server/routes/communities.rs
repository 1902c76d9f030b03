use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use market_data::{CommunityPage, CommunityQuery, EnrichedCommunity};
use serde::{Deserialize, Serialize};

use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct EnrichRequest {
    pub slugs: Vec<String>,
}

#[derive(Serialize)]
pub struct EnrichResponse {
    pub communities: Vec<EnrichedCommunity>,
}

/// `GET /communities?county=&featured=&page=&pageSize=`
pub async fn list_communities_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<CommunityQuery>,
) -> Result<Json<CommunityPage>, ApiError> {
    let page = state.aggregator.list_page(&query).await?;
    Ok(Json(page))
}

/// `GET /communities/:slug`
pub async fn get_community_handler(
    Extension(state): Extension<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<EnrichedCommunity>, ApiError> {
    let enriched = state.aggregator.get(&slug).await?;
    Ok(Json(enriched))
}

/// `POST /communities/enrich` with `{"slugs": [...]}`.
///
/// Always answers with one entry per slug, in request order; failed slugs come
/// back as placeholders.
pub async fn enrich_communities_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<EnrichRequest>,
) -> Json<EnrichResponse> {
    let communities = state.aggregator.batch_enrich(&request.slugs).await;
    Json(EnrichResponse { communities })
}
