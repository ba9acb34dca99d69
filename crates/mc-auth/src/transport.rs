use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::errors::{AuthError, Result};

/// Body of an outgoing POST
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `application/json`
    Json(Value),
}

/// Successful (2xx) response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed JSON body, a JSON string when the body isn't JSON, `Null` when empty
    pub data: Value,
}

/// Failure surfaced by an [`HttpTransport`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("HTTP error {status}: {}", body_snippet(.data))]
    Status { status: u16, data: Value },

    #[error("Network error: {0}")]
    Request(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(_) => None,
        }
    }

    /// Body of a non-2xx response
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Status { data, .. } => Some(data),
            Self::Request(_) => None,
        }
    }

    /// Human readable description, preferring what the upstream service said
    pub fn upstream_message(&self) -> String {
        self.data()
            .and_then(|data| {
                ["error_description", "message", "errorMessage", "Message"]
                    .iter()
                    .find_map(|key| data.get(*key).and_then(Value::as_str))
            })
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }
}

fn body_snippet(data: &Value) -> String {
    let text = match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.chars().take(200).collect()
}

/// HTTP capability consumed by the provider
///
/// Implementations must report non-2xx responses as [`TransportError::Status`].
/// Timeouts and retries, if any, belong here and not in the provider.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: RequestBody,
        headers: &[(&str, &str)],
    ) -> std::result::Result<HttpResponse, TransportError>;

    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> std::result::Result<HttpResponse, TransportError>;
}

/// Default transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a client honoring the configured timeouts and user agent
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or("mc-auth"))
            .build()
            .map_err(|e| AuthError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }

    pub fn from_client(http: Client) -> Self {
        Self { http }
    }

    async fn finish(
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let data = parse_body(&text);

        debug!("Received HTTP {}", status.as_u16());
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                data,
            });
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            data,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        body: RequestBody,
        headers: &[(&str, &str)],
    ) -> std::result::Result<HttpResponse, TransportError> {
        let mut request = self.http.post(url).header("Accept", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        request = match body {
            RequestBody::Form(fields) => request.form(&fields),
            RequestBody::Json(value) => request.json(&value),
        };

        Self::finish(request).await
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> std::result::Result<HttpResponse, TransportError> {
        let mut request = self.http.get(url).header("Accept", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        Self::finish(request).await
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upstream_message_prefers_error_description() {
        let err = TransportError::Status {
            status: 400,
            data: json!({
                "error": "invalid_grant",
                "error_description": "The provided value for the code is not valid.",
                "message": "ignored"
            }),
        };
        assert_eq!(
            err.upstream_message(),
            "The provided value for the code is not valid."
        );
    }

    #[test]
    fn test_upstream_message_falls_back_to_message() {
        let err = TransportError::Status {
            status: 500,
            data: json!({ "message": "Service unavailable" }),
        };
        assert_eq!(err.upstream_message(), "Service unavailable");
    }

    #[test]
    fn test_upstream_message_uses_raw_error() {
        let err = TransportError::Request("connection refused".to_string());
        assert_eq!(err.upstream_message(), "Network error: connection refused");

        let err = TransportError::Status {
            status: 502,
            data: Value::String("Bad Gateway".to_string()),
        };
        assert_eq!(err.upstream_message(), "HTTP error 502: Bad Gateway");
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"a\":1}"), json!({ "a": 1 }));
        assert_eq!(parse_body("not json"), Value::String("not json".to_string()));
    }
}
