use crate::config::Config;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// A single GET against the API: address plus caller-supplied headers and query params.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl RequestSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Copy of this request with one query parameter overridden.
    pub fn with_param(&self, name: &str, value: impl ToString) -> Self {
        let mut next = self.clone();
        next.params.insert(name.to_string(), value.to_string());
        next
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }
}

/// The one capability the fetcher needs from a transport.
pub trait HttpSend {
    fn send(
        &self,
        req: &RequestSpec,
    ) -> impl Future<Output = Result<RawResponse, HttpError>> + Send;
}

/// What a single attempt turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(Value),
    RateLimited { retry_after: u64 },
    Failed { status: StatusCode, reason: String },
}

pub fn classify(resp: RawResponse) -> AttemptOutcome {
    match resp.status {
        StatusCode::OK | StatusCode::CREATED => match serde_json::from_str::<Value>(&resp.body) {
            Ok(v) => AttemptOutcome::Success(v),
            Err(e) => AttemptOutcome::Failed {
                status: resp.status,
                reason: format!("invalid JSON body: {}", e),
            },
        },
        StatusCode::TOO_MANY_REQUESTS => AttemptOutcome::RateLimited {
            retry_after: parse_retry_after(&resp.headers),
        },
        status => AttemptOutcome::Failed {
            status,
            reason: status_label(status).to_string(),
        },
    }
}

/// Retry-After in whole seconds; absent or malformed means 0.
pub fn parse_retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

pub fn status_label(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::TOO_MANY_REQUESTS => "rate_limited",
        s if s.is_server_error() => "upstream_error",
        s if s.is_success() => "unexpected_success_status",
        _ => "client_error",
    }
}

pub fn build_client(cfg: &Config) -> Result<Client, HttpError> {
    let mut default_headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent).map_err(|e| HttpError::InvalidHeader {
        name: USER_AGENT.to_string(),
        reason: e.to_string(),
    })?;
    default_headers.insert(USER_AGENT, ua);
    let client = Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()?;
    Ok(client)
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, HttpError> {
    let mut map = HeaderMap::new();
    for (k, v) in headers {
        let name = HeaderName::from_bytes(k.as_bytes()).map_err(|e| HttpError::InvalidHeader {
            name: k.clone(),
            reason: e.to_string(),
        })?;
        let value = HeaderValue::from_str(v).map_err(|e| HttpError::InvalidHeader {
            name: k.clone(),
            reason: e.to_string(),
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

/// `HttpSend` over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, HttpError> {
        Ok(Self::new(build_client(cfg)?))
    }
}

impl HttpSend for ReqwestSender {
    async fn send(&self, req: &RequestSpec) -> Result<RawResponse, HttpError> {
        let headers = header_map(&req.headers)?;
        let res = self
            .client
            .get(&req.url)
            .headers(headers)
            .query(&req.params)
            .send()
            .await?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.text().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
