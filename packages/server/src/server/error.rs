//! HTTP mapping for library errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use market_data::MarketDataError;
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError(pub MarketDataError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MarketDataError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketDataError::NotFound { .. } => StatusCode::NOT_FOUND,
            MarketDataError::NotRealEstateQuery => StatusCode::UNPROCESSABLE_ENTITY,
            MarketDataError::Upstream { .. }
            | MarketDataError::Timeout { .. }
            | MarketDataError::Network(_) => StatusCode::BAD_GATEWAY,
            MarketDataError::Config(_)
            | MarketDataError::Parse(_)
            | MarketDataError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match &self.0 {
            MarketDataError::Validation(_) => "validation",
            MarketDataError::NotFound { .. } => "not_found",
            MarketDataError::NotRealEstateQuery => "not_real_estate_query",
            MarketDataError::Upstream { .. } => "upstream",
            MarketDataError::Timeout { .. } => "timeout",
            MarketDataError::Config(_) => "config",
            MarketDataError::Network(_) => "network",
            MarketDataError::Parse(_) => "parse",
            MarketDataError::Storage(_) => "storage",
        }
    }
}

impl From<MarketDataError> for ApiError {
    fn from(err: MarketDataError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_data::Service;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MarketDataError::validation("bad ring"), StatusCode::BAD_REQUEST),
            (MarketDataError::not_found("community", "nowhere"), StatusCode::NOT_FOUND),
            (MarketDataError::NotRealEstateQuery, StatusCode::UNPROCESSABLE_ENTITY),
            (
                MarketDataError::Upstream {
                    service: Service::Mls,
                    status: 503,
                    body: String::new(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                MarketDataError::Timeout {
                    operation: "listings query",
                    after: Duration::from_secs(8),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                MarketDataError::Network("connection refused".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (MarketDataError::Storage("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
