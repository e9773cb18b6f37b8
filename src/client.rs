// src/client.rs
use log::{debug, warn};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::fmt;
use std::time::Duration;

use crate::config::Context;
use crate::errors::{Result, RunnerError};
use crate::payload::{Data, JSON_CONTENT_TYPE, Payload, query_string};

/// Header carrying the evaluation service token.
pub const API_TOKEN_HEADER: &str = "api-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn has_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }

    fn has_query(&self) -> bool {
        matches!(self, Method::Get | Method::Delete)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// How many times a request is attempted and how long to wait after a
/// transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the transport failure of attempt `attempt` (0-based):
    /// `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }
}

/// Client for the evaluation service API.
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: Client,
    retry: RetryPolicy,
}

impl RequestClient {
    pub fn new() -> Result<Self> {
        Self::build(None, RetryPolicy::default())
    }

    /// Rebuilds the underlying HTTP client with a per-request timeout.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self> {
        Self::build(Some(timeout), self.retry)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build(timeout: Option<Duration>, retry: RetryPolicy) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            retry,
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Performs one logical call against the context's host and decodes the
    /// reply. Non-2xx replies become `RunnerError::Server`.
    pub async fn query(
        &self,
        ctx: &Context,
        endpoint: &str,
        data: Option<&Data>,
        method: Method,
    ) -> Result<Payload> {
        let query = if method.has_query() {
            query_string(data)
        } else {
            String::new()
        };
        let body = match data {
            Some(data) if method.has_body() => Some(data.to_body()?),
            _ => None,
        };
        let url = format!("{}{}{}", ctx.host.trim_end_matches('/'), endpoint, query);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(API_TOKEN_HEADER, HeaderValue::from_str(&ctx.api_token)?);

        debug!("📡 {} {}", method, url);

        let resp = self
            .send_with_retry(|| {
                let request = self
                    .http
                    .request(method.into(), &url)
                    .headers(headers.clone());
                match &body {
                    Some(body) => request.body(body.clone()),
                    None => request,
                }
            })
            .await?;

        decode_response(resp).await
    }

    pub async fn get(&self, ctx: &Context, endpoint: &str, params: Option<&Data>) -> Result<Payload> {
        self.query(ctx, endpoint, params, Method::Get).await
    }

    pub async fn post(&self, ctx: &Context, endpoint: &str, data: &Data) -> Result<Payload> {
        self.query(ctx, endpoint, Some(data), Method::Post).await
    }

    pub async fn put(&self, ctx: &Context, endpoint: &str, data: &Data) -> Result<Payload> {
        self.query(ctx, endpoint, Some(data), Method::Put).await
    }

    pub async fn delete(&self, ctx: &Context, endpoint: &str, params: Option<&Data>) -> Result<Payload> {
        self.query(ctx, endpoint, params, Method::Delete).await
    }

    /// Sends the request built by `build` until a non-504 response arrives.
    ///
    /// A 504 is retried straight away. Every transport error waits
    /// `RetryPolicy::backoff`, the last one included, so an exhausted budget
    /// of three attempts has slept `base * 7` before `MaxRetries`.
    pub async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = self.retry.max_attempts;
        for attempt in 0..max_attempts {
            match build().send().await {
                Ok(resp) if resp.status() == StatusCode::GATEWAY_TIMEOUT => {
                    warn!("⏳ Gateway timeout (attempt {}/{})", attempt + 1, max_attempts);
                }
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    warn!("⚠️  Request failed (attempt {}/{}): {}", attempt + 1, max_attempts, e);
                    let delay = self.retry.backoff(attempt);
                    debug!("Backing off for {}ms", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(RunnerError::MaxRetries)
    }
}

pub fn content_type(resp: &Response) -> Option<String> {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Decodes a response by its content type, turning non-2xx into a server error.
pub async fn decode_response(resp: Response) -> Result<Payload> {
    let status = resp.status();
    let content_type = content_type(&resp);
    let bytes = resp.bytes().await?;

    debug!("📥 Response status: {}", status);

    if !status.is_success() {
        return Err(RunnerError::Server {
            status: status.as_u16(),
            body: Payload::decode_lenient(content_type.as_deref(), &bytes),
        });
    }
    Payload::decode(content_type.as_deref(), &bytes)
}
