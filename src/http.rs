//! Authenticated HTTP client shared by the Drive and Gmail services.
//!
//! Injects the bearer token, maps Google's error responses onto
//! [`RemoteApiError`] and retries transient failures per [`RetryPolicy`].

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::auth::Credentials;
use crate::config::{ApiOptions, RetryPolicy};
use crate::error::{Error, RemoteApiError, RemoteErrorKind, Result};

/// A request body, rebuilt for every attempt.
#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(Value),
    Bytes {
        content_type: String,
        data: Vec<u8>,
    },
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    credentials: Credentials,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(client: Client, credentials: Credentials, retry: RetryPolicy) -> Self {
        Self {
            client,
            credentials,
            retry,
        }
    }

    pub fn build_http_client(options: &ApiOptions) -> Result<Client> {
        Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {}", e)))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.send(Method::GET, url, query, Body::Empty).await?;
        parse_json(response).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body).map_err(|e| {
            Error::from(RemoteApiError::new(
                RemoteErrorKind::BadRequest,
                None,
                format!("Failed to serialize request: {}", e),
            ))
        })?;
        let response = self.send(Method::POST, url, query, Body::Json(body)).await?;
        parse_json(response).await
    }

    /// Sends a raw body (multipart uploads) and parses the JSON answer.
    pub async fn send_bytes<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        content_type: String,
        data: Vec<u8>,
    ) -> Result<T> {
        let body = Body::Bytes { content_type, data };
        let response = self.send(method, url, query, body).await?;
        parse_json(response).await
    }

    pub async fn get_bytes(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>> {
        let response = self.send(Method::GET, url, query, Body::Empty).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn delete(&self, url: &str) -> Result<()> {
        self.send(Method::DELETE, url, &[], Body::Empty).await?;
        Ok(())
    }

    /// Sends the request, retrying transient failures that are safe to
    /// replay. Returns a successful response or the translated error.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Body,
    ) -> Result<Response> {
        let mut attempt = 0;
        loop {
            match self.send_once(method.clone(), url, query, &body).await {
                Ok(response) => return Ok(response),
                Err(e) if may_retry(&method, &e) && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "Request to {} failed ({}), retrying in {:?}",
                        url, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: &Body,
    ) -> Result<Response> {
        let token = self.credentials.access_token().await?;
        debug!("{} {}", method, url);

        let builder = self
            .client
            .request(method, url)
            .query(query)
            .bearer_auth(token);
        let response = with_body(builder, body).send().await?;

        let status = response.status();
        debug!("Response status: {}", status);
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let details = extract_error(&text);
        let message = details
            .message
            .unwrap_or_else(|| format!("HTTP {} error", status));
        error!("Google API error {}: {}", status.as_u16(), message);
        Err(RemoteApiError::from_response(status.as_u16(), details.reason.as_deref(), message).into())
    }
}

/// Only requests that can be replayed without a second side effect are
/// retried on any transient failure. Other methods (creations, sends) are
/// retried on rate limiting alone, where the server did not act.
fn may_retry(method: &Method, err: &Error) -> bool {
    let idempotent = [Method::GET, Method::HEAD, Method::PUT, Method::DELETE, Method::PATCH]
        .contains(method);
    if idempotent {
        err.is_retryable()
    } else {
        err.remote_kind() == Some(RemoteErrorKind::RateLimited)
    }
}

fn with_body(builder: RequestBuilder, body: &Body) -> RequestBuilder {
    match body {
        Body::Empty => builder,
        Body::Json(value) => builder.json(value),
        Body::Bytes { content_type, data } => builder
            .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
            .body(data.clone()),
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let text = response.text().await?;
    // Empty successful responses (e.g. DELETE) read as an empty object.
    let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| {
        Error::from(RemoteApiError::new(
            RemoteErrorKind::InvalidResponse,
            None,
            format!("Failed to parse JSON response: {}", e),
        ))
    })
}

#[derive(Debug, Default, PartialEq)]
struct ErrorDetails {
    message: Option<String>,
    reason: Option<String>,
}

/// Google APIs report errors as
/// `{"error": {"code": 403, "message": "...", "errors": [{"reason": "..."}]}}`.
fn extract_error(body: &str) -> ErrorDetails {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) => return ErrorDetails::default(),
    };
    let Some(error) = parsed.get("error") else {
        return ErrorDetails::default();
    };

    let reason = error
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|first| first.get("reason"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let message = match error.get("message").and_then(Value::as_str) {
        Some(message) => Some(message.to_string()),
        // OAuth endpoints use {"error": "invalid_grant", "error_description": ...}
        None => error.as_str().map(|code| {
            match parsed.get("error_description").and_then(Value::as_str) {
                Some(description) => format!("{}: {}", code, description),
                None => code.to_string(),
            }
        }),
    };

    ErrorDetails { message, reason }
}
