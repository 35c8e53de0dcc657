use anyhow::{Context, Result};
use async_trait::async_trait;

// ── Transport value types ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
}

impl FeedRequest {
    pub fn get(url: impl Into<String>) -> Self {
        FeedRequest {
            url: url.into(),
            method: "GET".into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Raw response: the body is handed over undecoded, so the consumer
/// decides how to handle `Content-Encoding`.
#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FeedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// ── Capability seam ─────────────────────────────────────────────────

/// HTTP-shaped fetch capability consumed by the pool selector. Tests
/// substitute a canned-response implementation.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn send(&self, request: &FeedRequest) -> Result<FeedResponse>;
}

// ── reqwest-backed implementation ───────────────────────────────────

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn send(&self, request: &FeedRequest) -> Result<FeedResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .with_context(|| format!("invalid HTTP method '{}'", request.method))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("feed request to {} failed", request.url))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .context("reading feed response body")?
            .to_vec();

        Ok(FeedResponse {
            status,
            headers,
            body,
        })
    }
}
