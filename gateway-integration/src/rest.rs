use crate::error::IntegrationError;
use crate::ratelimit::AsyncRateLimiter;
use crate::retry::{self, RetryPolicy};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Error surfaced by a venue in response to a signed request, carrying
/// enough of the raw body to let `gateway-execution` interpret venue-
/// specific error codes (e.g. "insufficient balance" vs "invalid symbol").
#[derive(Debug, Clone)]
pub struct VenueError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    pub payload: String,
}

impl std::fmt::Display for VenueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "venue error {} ({code}): {}", self.status, self.message),
            None => write!(f, "venue error {}: {}", self.status, self.message),
        }
    }
}

impl std::error::Error for VenueError {}

/// Material a [`Signer`] needs to authenticate one request.
pub struct SigningInput<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: &'a [(String, String)],
    pub body: Option<&'a str>,
    pub timestamp_ms: u64,
}

/// The headers and extra query parameters a signed request must carry,
/// computed by a venue-specific [`Signer`].
#[derive(Debug, Default, Clone)]
pub struct SigningOutput {
    pub headers: Vec<(String, String)>,
    pub extra_query: Vec<(String, String)>,
}

/// Per-venue request-signing hook: turns method/path/query/body/timestamp
/// plus credentials into the headers and query parameters a signed call
/// must carry (spec §4.G).
pub trait Signer: Send + Sync + 'static {
    fn sign(&self, input: SigningInput<'_>) -> SigningOutput;
}

/// A `Signer` for venues that require no authentication (public endpoints).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSigner;

impl Signer for NoopSigner {
    fn sign(&self, _input: SigningInput<'_>) -> SigningOutput {
        SigningOutput::default()
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as u64
}

/// Generic REST client composing `reqwest`, a per-venue [`Signer`], rate
/// limiting, and bounded retry (spec §4.G). One instance per
/// `(base_url, AccountType)` pair.
pub struct RestClient<S> {
    http: reqwest::Client,
    base_url: String,
    signer: Arc<S>,
    limiter: Arc<AsyncRateLimiter>,
    retry_policy: RetryPolicy,
}

fn retriable(err: &IntegrationError) -> bool {
    matches!(
        err,
        IntegrationError::Http { status, .. } if *status == 429 || *status >= 500
    ) || matches!(err, IntegrationError::RequestTimeout(_) | IntegrationError::Transport(_))
}

impl<S: Signer> RestClient<S> {
    pub fn new(base_url: impl Into<String>, signer: S, limiter: Arc<AsyncRateLimiter>, retry_policy: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            signer: Arc::new(signer),
            limiter,
            retry_policy,
        }
    }

    /// Issues a request, signing it iff `signed`. Rate-limits against
    /// `rate_limit_key`, then retries on 429/5xx/timeout per the configured
    /// [`RetryPolicy`]. Deserialises the JSON body as `T` on success; any
    /// HTTP status ≥ 400 is mapped to [`IntegrationError::Http`] carrying
    /// the raw body, from which callers build a [`VenueError`].
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&str>,
        signed: bool,
        rate_limit_key: &str,
    ) -> Result<T, IntegrationError> {
        let name = format!("{method} {path}");
        retry::run(&name, self.retry_policy, retriable, || {
            self.request_once::<T>(&method, path, query, body, signed)
        })
        .await
    }

    async fn request_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&str>,
        signed: bool,
    ) -> Result<T, IntegrationError> {
        self.limiter.limit(path, 1.0).await?;

        let mut all_query = query.to_vec();
        let mut headers = reqwest::header::HeaderMap::new();

        if signed {
            let output = self.signer.sign(SigningInput {
                method,
                path,
                query,
                body,
                timestamp_ms: now_ms(),
            });
            for (key, value) in output.extra_query {
                all_query.push((key, value));
            }
            for (key, value) in output.headers {
                let name = reqwest::header::HeaderName::try_from(key)
                    .map_err(|e| IntegrationError::Transport(e.to_string()))?;
                let val = reqwest::header::HeaderValue::try_from(value)
                    .map_err(|e| IntegrationError::Transport(e.to_string()))?;
                headers.insert(name, val);
            }
        }

        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method.clone(), &url).query(&all_query).headers(headers);
        if let Some(body) = body {
            builder = builder.header("content-type", "application/json").body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                IntegrationError::RequestTimeout(0)
            } else {
                IntegrationError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| IntegrationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(IntegrationError::Http { status: status.as_u16(), body: text });
        }

        serde_json::from_str(&text).map_err(IntegrationError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_signer_adds_nothing() {
        let signer = NoopSigner;
        let output = signer.sign(SigningInput { method: &Method::GET, path: "/x", query: &[], body: None, timestamp_ms: 0 });
        assert!(output.headers.is_empty());
        assert!(output.extra_query.is_empty());
    }

    #[test]
    fn retriable_classifies_429_and_5xx() {
        assert!(retriable(&IntegrationError::Http { status: 429, body: String::new() }));
        assert!(retriable(&IntegrationError::Http { status: 503, body: String::new() }));
        assert!(!retriable(&IntegrationError::Http { status: 400, body: String::new() }));
        assert!(retriable(&IntegrationError::RequestTimeout(0)));
        assert!(!retriable(&IntegrationError::Validation("bad params".into())));
    }
}
