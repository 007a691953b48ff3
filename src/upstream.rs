//! Client for the hosted model API.
//!
//! The relay talks to the upstream through the [`ModelBackend`] trait so
//! request handlers (and their tests) never depend on the network. The
//! production implementation is [`ModelClient`], a thin reqwest client
//! speaking the messages API: JSON in, either a JSON completion or an SSE
//! stream out.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::observability::{UPSTREAM_CALLS, UPSTREAM_ERRORS};
use crate::sse::process_sse;
use crate::types::{Completion, CompletionParams, StreamEvent};

/// Upstream messages API version header value.
const API_VERSION: &str = "2023-06-01";

/// A source of model completions.
///
/// One implementation talks to the hosted API; tests script their own.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Opens a streaming completion call, yielding events as they arrive.
    async fn stream(&self, params: CompletionParams)
    -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// Performs a one-shot completion and returns the generated text.
    async fn complete(&self, params: CompletionParams) -> Result<String>;
}

/// Client for the hosted model API.
#[derive(Debug, Clone)]
pub struct ModelClient {
    api_key: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl ModelClient {
    /// Creates a new client for the given credential and endpoint.
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(format!("Failed to build HTTP client: {e}"), Some(Box::new(e)))
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| Error::configuration("API key contains invalid header characters"))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    /// Maps a reqwest transport failure onto our error taxonomy.
    fn map_request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| error_body.clone());

        Error::api(status_code, message, request_id)
    }
}

#[async_trait]
impl ModelBackend for ModelClient {
    async fn stream(
        &self,
        mut params: CompletionParams,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        params.stream = true;
        UPSTREAM_CALLS.click();

        let url = format!("{}messages", self.base_url);

        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&params)
            .send()
            .await
            .map_err(|e| {
                UPSTREAM_ERRORS.click();
                self.map_request_error(e)
            })?;

        if !response.status().is_success() {
            UPSTREAM_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let stream = response.bytes_stream();
        Ok(process_sse(stream).boxed())
    }

    async fn complete(&self, mut params: CompletionParams) -> Result<String> {
        params.stream = false;
        UPSTREAM_CALLS.click();

        let url = format!("{}messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .headers(self.default_headers()?)
            .json(&params)
            .send()
            .await
            .map_err(|e| {
                UPSTREAM_ERRORS.click();
                self.map_request_error(e)
            })?;

        if !response.status().is_success() {
            UPSTREAM_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let completion = response.json::<Completion>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse completion: {e}"), Some(Box::new(e)))
        })?;
        Ok(completion.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = ModelClient::new(
            "test-key".to_string(),
            "https://api.example.test/v1/".to_string(),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://api.example.test/v1/");
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn headers_reject_control_characters() {
        let client = ModelClient::new(
            "bad\nkey".to_string(),
            "https://api.example.test/v1/".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(client.default_headers().is_err());
    }
}
