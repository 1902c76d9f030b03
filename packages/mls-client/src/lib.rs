//! Pure MLS provider REST API client.
//!
//! A minimal client for the upstream listings aggregator. Supports listing
//! search (query-string and polygon-body modes), single-listing lookup, the
//! natural-language query endpoint, and neighborhood boundary lookup.
//!
//! The client never retries and never applies domain defaults; callers own
//! retry, timeout and filter policy.
//!
//! # Example
//!
//! ```rust,ignore
//! use mls_client::MlsClient;
//!
//! let client = MlsClient::new("https://api.example-mls.com", "your-api-key")?;
//!
//! let params = vec![("zip".to_string(), "78704".to_string())];
//! let envelope = client.get_listings(&params).await?;
//! println!("{} listings across {} pages", envelope.count, envelope.num_pages);
//! ```

pub mod error;
pub mod types;

pub use error::{MlsError, Result};
pub use types::{
    ListingStatistics, ListingsEnvelope, LocationsEnvelope, MapBody, NlpListingRequest,
    NlpRequest, NlpResponse, PriceRange, RawAddress, RawDetails, RawListing, RawLocation,
    RawLocationAddress, RawLocationMap, RawLot, RawMapPoint,
};

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const DEFAULT_BASE_URL: &str = "https://api.repliers.io";

/// Header carrying the static API key.
pub const DEFAULT_API_KEY_HEADER: &str = "REPLIERS-API-KEY";

#[derive(Clone)]
pub struct MlsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_key_header: String,
}

impl std::fmt::Debug for MlsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlsClient")
            .field("base_url", &self.base_url)
            .field("api_key_header", &self.api_key_header)
            .finish_non_exhaustive()
    }
}

impl MlsClient {
    /// Create a client. Fails if the API key is blank.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MlsError::Config("MLS API key must not be empty".into()));
        }

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(MlsError::Config("MLS base URL must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
        })
    }

    pub fn with_api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query-string-only listing search.
    #[tracing::instrument(skip(self, params), fields(param_count = params.len()))]
    pub async fn get_listings(&self, params: &[(String, String)]) -> Result<ListingsEnvelope> {
        let url = format!("{}/listings", self.base_url);
        let request = self.authorized(self.client.get(&url)).query(params);
        self.send(request).await
    }

    /// Body-bearing listing search. Geometry travels in the body; every other
    /// filter stays in the query string.
    #[tracing::instrument(skip(self, params, body), fields(param_count = params.len()))]
    pub async fn post_listings<B>(
        &self,
        params: &[(String, String)],
        body: &B,
    ) -> Result<ListingsEnvelope>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}/listings", self.base_url);
        let request = self
            .authorized(self.client.post(&url))
            .query(params)
            .json(body);
        self.send(request).await
    }

    /// Fetch one listing by MLS number. A 404 maps to [`MlsError::NotFound`].
    #[tracing::instrument(skip(self))]
    pub async fn get_listing(&self, mls_number: &str) -> Result<RawListing> {
        let url = format!("{}/listings/{}", self.base_url, mls_number);
        let resp = self.authorized(self.client.get(&url)).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(MlsError::NotFound(mls_number.to_string()));
        }
        Self::decode(resp).await
    }

    /// Resolve a free-text prompt into a provider-native listings request.
    #[tracing::instrument(skip(self, request), fields(has_nlp_id = request.nlp_id.is_some()))]
    pub async fn nlp(&self, request: &NlpRequest) -> Result<NlpResponse> {
        let url = format!("{}/nlp", self.base_url);
        let resp = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_ACCEPTABLE {
            tracing::debug!("NLP endpoint rejected prompt as non real-estate");
            return Err(MlsError::NotRealEstateQuery);
        }
        Self::decode(resp).await
    }

    /// One page of the neighborhood/area boundary lookup.
    #[tracing::instrument(skip(self, params))]
    pub async fn locations(&self, params: &[(String, String)]) -> Result<LocationsEnvelope> {
        let url = format!("{}/locations", self.base_url);
        let request = self.authorized(self.client.get(&url)).query(params);
        self.send(request).await
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(self.api_key_header.as_str(), &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request.send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "MLS request failed");
            return Err(MlsError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| MlsError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_blank_api_key() {
        let err = MlsClient::new(DEFAULT_BASE_URL, "   ").unwrap_err();
        assert!(matches!(err, MlsError::Config(_)));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = MlsClient::new("https://mls.example.com/", "key").unwrap();
        assert_eq!(client.base_url(), "https://mls.example.com");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = MlsClient::new(DEFAULT_BASE_URL, "super-secret").unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("super-secret"));
    }
}
