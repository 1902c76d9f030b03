use axum::{
    extract::{Extension, Query},
    Json,
};
use market_data::{AreaKey, MarketDataError, MarketStats};
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct MarketStatsParams {
    pub zip: Option<String>,
    pub city: Option<String>,
    pub area: Option<String>,
}

impl MarketStatsParams {
    /// Zip wins over city, city over area.
    pub fn area_key(self) -> Result<AreaKey, MarketDataError> {
        fn non_blank(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        if let Some(zip) = non_blank(self.zip) {
            return Ok(AreaKey::Zip(zip));
        }
        if let Some(city) = non_blank(self.city) {
            return Ok(AreaKey::City(city));
        }
        non_blank(self.area)
            .map(AreaKey::Area)
            .ok_or_else(|| MarketDataError::validation("one of zip, city or area is required"))
    }
}

/// `GET /market-stats?zip=|city=|area=`
pub async fn market_stats_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<MarketStatsParams>,
) -> Result<Json<MarketStats>, ApiError> {
    let key = params.area_key()?;
    let stats = state.aggregator.market_stats(&key).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_takes_precedence() {
        let params = MarketStatsParams {
            zip: Some(" 78704 ".into()),
            city: Some("Austin".into()),
            area: None,
        };
        assert_eq!(params.area_key().unwrap(), AreaKey::Zip("78704".into()));
    }

    #[test]
    fn test_blank_params_are_rejected() {
        let params = MarketStatsParams {
            zip: Some("  ".into()),
            ..MarketStatsParams::default()
        };
        assert!(matches!(params.area_key(), Err(MarketDataError::Validation(_))));
    }
}
