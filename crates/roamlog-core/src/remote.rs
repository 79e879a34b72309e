//! Remote trips API client.
//!
//! Bearer tokens are fetched from the [`TokenProvider`] at send time,
//! never captured at enqueue time — a token revoked before replay makes
//! that replay fail and leaves the action queued.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{HttpMethod, QueueAction, Trip, TripPatch};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// External auth collaborator: produces a bearer token on demand.
pub trait TokenProvider {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed-token provider for hosts that manage auth elsewhere.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = normalize_text_option(Some(token.into()))
            .ok_or_else(|| Error::Auth("access token must not be empty".to_string()))?;
        Ok(Self { token })
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StaticToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Remote operations consumed by the facade and the sync coordinator.
pub trait TripsRemote {
    async fn list_trips(&self) -> Result<Vec<Trip>>;
    async fn fetch_trip(&self, id: &str) -> Result<Trip>;
    async fn create_trip(&self, trip: &Trip) -> Result<Trip>;
    async fn update_trip(&self, id: &str, patch: &TripPatch) -> Result<Trip>;
    async fn delete_trip(&self, id: &str) -> Result<()>;

    /// Replay a queued action verbatim: same method, endpoint, and
    /// payload captured at enqueue time, with fresh auth.
    async fn replay(&self, action: &QueueAction) -> Result<()>;
}

/// HTTP implementation of the remote trips contract.
#[derive(Clone)]
pub struct HttpRemote<T> {
    base_url: String,
    client: reqwest::Client,
    tokens: T,
}

impl<T: TokenProvider> HttpRemote<T> {
    pub fn new(base_url: impl Into<String>, tokens: T) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            client: reqwest::Client::builder().build()?,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload an image via `POST /uploads` (multipart, single `file`
    /// field). Returns the served URL.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/uploads", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;

        let payload = response.json::<UploadResponse>().await?;
        Ok(payload.url)
    }

    async fn authorized(
        &self,
        method: reqwest::Method,
        endpoint: &str,
    ) -> Result<reqwest::RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(self
            .client
            .request(method, format!("{}{endpoint}", self.base_url))
            .bearer_auth(token)
            .header("Accept", "application/json"))
    }
}

impl<T: TokenProvider> TripsRemote for HttpRemote<T> {
    async fn list_trips(&self) -> Result<Vec<Trip>> {
        let response = self.authorized(reqwest::Method::GET, "/trips").await?.send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_trip(&self, id: &str) -> Result<Trip> {
        let endpoint = format!("/trips/{id}");
        let response = self.authorized(reqwest::Method::GET, &endpoint).await?.send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn create_trip(&self, trip: &Trip) -> Result<Trip> {
        let response = self
            .authorized(reqwest::Method::POST, "/trips")
            .await?
            .json(trip)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn update_trip(&self, id: &str, patch: &TripPatch) -> Result<Trip> {
        let endpoint = format!("/trips/{id}");
        let response = self
            .authorized(reqwest::Method::PUT, &endpoint)
            .await?
            .json(patch)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn delete_trip(&self, id: &str) -> Result<()> {
        let endpoint = format!("/trips/{id}");
        let response = self
            .authorized(reqwest::Method::DELETE, &endpoint)
            .await?
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn replay(&self, action: &QueueAction) -> Result<()> {
        let method = match action.method {
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let response = self
            .authorized(method, &action.endpoint)
            .await?
            .json(&action.payload)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api(parse_api_error(status, &body)));
    }
    Ok(response)
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("base URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}
