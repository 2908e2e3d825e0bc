//! Room management client over HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use rpsonline_protocol::{CreateRoomRequest, HealthStatus, RoomCreated, RoomStatus};

use crate::ports::{ApiError, RoomApiPort, ServerEndpoint};

/// Default bound on every room API request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the game server's room endpoints
#[derive(Clone)]
pub struct HttpRoomClient {
    client: Client,
    base_url: Url,
}

impl HttpRoomClient {
    pub fn new(base_url: Url) -> Self {
        Self::with_timeout(base_url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create client with custom timeout.
    pub fn with_timeout(base_url: Url, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url }
    }

    /// Client for the HTTP side of `endpoint`.
    pub fn for_endpoint(
        endpoint: &ServerEndpoint,
        timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        Ok(Self::with_timeout(endpoint.http_base()?, timeout))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if segments.is_empty() {
            return url;
        }
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %response.url(), "API response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "API response error");
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        let body = response.text().await.map_err(map_request_error)?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Failures with no HTTP response at all.
fn map_request_error(error: reqwest::Error) -> ApiError {
    tracing::error!(error = %error, "API request error");
    if error.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network
    }
}

#[async_trait]
impl RoomApiPort for HttpRoomClient {
    async fn create_room(&self, is_ai_game: bool) -> Result<RoomCreated, ApiError> {
        let url = self.url(&["create-room"]);
        tracing::debug!(url = %url, "API Request: POST");

        let response = self
            .client
            .post(url)
            .json(&CreateRoomRequest { is_ai_game })
            .send()
            .await
            .map_err(map_request_error)?;

        Self::read_json(response).await
    }

    async fn room_status(&self, room_id: &str) -> Result<RoomStatus, ApiError> {
        let url = self.url(&["room", room_id, "status"]);
        tracing::debug!(url = %url, "API Request: GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_request_error)?;

        Self::read_json(response).await
    }

    async fn server_health(&self) -> Result<HealthStatus, ApiError> {
        let url = self.url(&[]);
        tracing::debug!(url = %url, "API Request: GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_request_error)?;

        Self::read_json(response).await
    }
}
