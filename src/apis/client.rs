/// Base HTTP client with rate limiting and bounded retry
use crate::errors::ApiError;
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

// ============================================================================
// TOKEN BUCKET RATE LIMITER
// ============================================================================

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter
///
/// Holds up to `capacity` tokens, refilled continuously at `refill_per_sec`.
/// A rate of zero means unlimited.
pub struct RateLimiter {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    /// Limiter allowing `max_per_minute` requests with a burst of one
    pub fn per_minute(max_per_minute: u32) -> Self {
        Self::new(1.0, max_per_minute as f64 / 60.0)
    }

    /// Limiter releasing one token every `interval`
    pub fn every(interval: Duration) -> Self {
        if interval.is_zero() {
            return Self::unlimited();
        }
        Self::new(1.0, 1.0 / interval.as_secs_f64())
    }

    pub fn unlimited() -> Self {
        Self::new(1.0, 0.0)
    }

    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        let capacity = capacity.max(1.0);
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_per_sec: refill_per_sec.max(0.0),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.refill_per_sec == 0.0
    }

    /// Take a token if one is available, otherwise report how long to wait
    fn take_or_wait(&self) -> Option<Duration> {
        if self.is_unlimited() {
            return None;
        }

        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            None
        } else {
            let missing = 1.0 - state.tokens;
            Some(Duration::from_secs_f64(missing / self.refill_per_sec))
        }
    }

    #[cfg(test)]
    pub fn try_acquire(&self) -> bool {
        self.take_or_wait().is_none()
    }

    /// Wait until a token is available and consume it
    pub async fn acquire(&self) {
        while let Some(wait) = self.take_or_wait() {
            tokio::time::sleep(wait).await;
        }
    }
}

// ============================================================================
// RETRY POLICY
// ============================================================================

/// Fixed-backoff retry for recoverable failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff_ms: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff: Duration::from_millis(backoff_ms),
        }
    }

    pub fn none() -> Self {
        Self::new(1, 0)
    }
}

// ============================================================================
// HTTP CLIENT
// ============================================================================

/// HTTP client for one external dependency
///
/// Every request waits on the dependency's limiter; recoverable failures
/// (transport errors, 429, 5xx) are retried per the policy.
pub struct HttpClient {
    name: &'static str,
    client: Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(
        name: &'static str,
        timeout_secs: u64,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| ApiError::Request {
                endpoint: name.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            name,
            client,
            limiter,
            retry,
        })
    }

    /// Send a request built by `build` and decode the JSON body
    ///
    /// `build` is called again for every attempt.
    pub async fn send_json<T, F>(&self, endpoint: &str, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(endpoint, &build).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_recoverable() && attempt < self.retry.attempts => {
                    logger::warning(
                        LogTag::Other(self.name.to_string()),
                        &format!(
                            "{} (attempt {}/{}), retrying in {}ms",
                            err,
                            attempt,
                            self.retry.attempts,
                            self.retry.backoff.as_millis()
                        ),
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once<T, F>(&self, endpoint: &str, build: &F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        self.limiter.acquire().await;

        let response = build(&self.client)
            .send()
            .await
            .map_err(|e| ApiError::Request {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json::<T>().await.map_err(|e| ApiError::Parse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_bucket_burst_then_empty() {
        let limiter = RateLimiter::per_minute(60);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_unlimited_never_blocks() {
        let limiter = RateLimiter::every(Duration::ZERO);
        for _ in 0..100 {
            assert!(limiter.try_acquire());
        }
    }

    #[tokio::test]
    async fn test_acquire_waits_for_refill() {
        let limiter = RateLimiter::every(Duration::from_millis(50));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client =
            HttpClient::new("test", 5, RateLimiter::unlimited(), RetryPolicy::new(3, 0)).unwrap();
        let url = format!("{}/flaky", server.uri());
        let value: serde_json::Value = client.send_json("flaky", |c| c.get(&url)).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad mint"))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            HttpClient::new("test", 5, RateLimiter::unlimited(), RetryPolicy::new(3, 0)).unwrap();
        let url = format!("{}/bad", server.uri());
        let result: Result<serde_json::Value, _> = client.send_json("bad", |c| c.get(&url)).await;
        match result {
            Err(ApiError::Status { status, body, .. }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad mint");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
