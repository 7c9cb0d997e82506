//! Thin Cloudflare API v4 client shared by the record store and the device directory.
//!
//! One method call is one HTTP request. Non-success statuses and
//! `"success": false` envelopes become errors; nothing is retried.

use devdns_core::{Error, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Standard Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

pub(crate) struct ApiClient {
    /// ⚠️ NEVER log this value
    api_token: String,
    base_url: String,
    http: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiClient {
    pub(crate) fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            http,
        })
    }

    pub(crate) fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
    }

    #[cfg(test)]
    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
    }

    /// GET `path` with query parameters and return the envelope's `result`
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<Option<T>> {
        let response = self
            .request(Method::GET, path)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", context, e)))?;
        read_envelope(response, context).await
    }

    /// Send a JSON body with `method` and return the envelope's `result`
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &serde_json::Value,
        context: &str,
    ) -> Result<Option<T>> {
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", context, e)))?;
        read_envelope(response, context).await
    }

    /// DELETE `path`
    pub(crate) async fn delete(&self, path: &str, context: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, path)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", context, e)))?;
        read_envelope::<serde_json::Value>(response, context).await?;
        Ok(())
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response, context: &str) -> Result<Option<T>> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(status_error(status, &error_text, context));
    }

    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

    if !envelope.success {
        let messages: Vec<String> = envelope
            .errors
            .iter()
            .map(|m| format!("{} ({})", m.message, m.code))
            .collect();
        return Err(Error::provider(
            PROVIDER,
            format!("{} rejected: {}", context, messages.join("; ")),
        ));
    }

    Ok(envelope.result)
}

/// Map a non-success HTTP status to an error
pub(crate) fn status_error(status: StatusCode, error_text: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions. Status: {}",
            context, status
        )),
        404 => Error::not_found(format!("{}: {}", context, status)),
        409 => Error::provider(
            PROVIDER,
            format!("{}: conflict, record changed concurrently. Status: {}", context, status),
        ),
        429 => Error::rate_limited(format!("{}: retry later. Status: {}", context, status)),
        500..=599 => Error::provider(
            PROVIDER,
            format!("{}: Cloudflare server error (transient): {} - {}", context, status, error_text),
        ),
        _ => Error::provider(
            PROVIDER,
            format!("{} failed: {} - {}", context, status, error_text),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "", "Record lookup"),
            Error::Authentication(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "", "Record lookup"),
            Error::NotFound(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "", "Record lookup"),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "upstream", "Record lookup"),
            Error::Provider { .. }
        ));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(ApiClient::new(""), Err(Error::Config(_))));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let client = ApiClient::new("secret_token_12345").unwrap();
        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let mut client = ApiClient::new("token").unwrap();
        client.set_base_url("http://127.0.0.1:1");
        let result = client
            .get::<serde_json::Value>("zones/z/dns_records", &[], "Record lookup")
            .await;
        assert!(matches!(result, Err(Error::Http(_))), "{result:?}");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let mut client = ApiClient::new("token").unwrap();
        assert_eq!(client.base_url(), CLOUDFLARE_API_BASE);
        client.set_base_url("http://127.0.0.1:9000/");
        assert_eq!(client.base_url(), "http://127.0.0.1:9000");
    }
}
