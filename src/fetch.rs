//! Outbound HTTP with bounded retries.
//!
//! Both upstream endpoints are plain unauthenticated GETs, so the only
//! sophistication here is the retry schedule: exponential backoff for
//! transport errors and unexpected statuses, and a server-directed pause for
//! rate limiting. Exhausting the schedule is an ordinary [FetchError], never
//! a panic; callers treat it as "no update this tick". Caching is explicitly
//! not this layer's concern.

use reqwest::{header, StatusCode};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

/// Pause before retrying a rate-limited request when the server doesn't say
/// how long to wait.
const RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(5);

/// Sum type representing every possible unexceptional fetch fail state.
#[derive(Debug)]
pub enum FetchError {
    ClientInit(reqwest::Error),
    RetriesExhausted {
        url: Url,
        attempts: u32,
        last: String,
    },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            FetchError::ClientInit(e) => format!("Could not build HTTP client: {}", e),
            FetchError::RetriesExhausted {
                url,
                attempts,
                last,
            } => format!(
                "Gave up fetching {} after {} attempts; last failure: {}",
                url, attempts, last
            ),
        };

        write!(f, "{}", x)
    }
}

/// A reusable fetcher holding a connection pool internally, as per
/// [reqwest::Client].
pub struct Fetcher {
    client: reqwest::Client,
    max_retries: u32,
    backoff_base: Duration,
}

impl Fetcher {
    pub fn new(
        timeout: Duration,
        max_retries: u32,
        backoff_base: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("argus/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(FetchError::ClientInit)?;

        Ok(Fetcher {
            client,
            max_retries: max_retries.max(1),
            backoff_base,
        })
    }

    /// Fetch the body text behind `url`, retrying on timeout, transport
    /// error, or any non-200 status.
    ///
    /// Rate-limited responses honor a `Retry-After` delay when the server
    /// supplies one, without consuming a step of the exponential schedule.
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let mut backoff_exp = 0u32;
        let mut last = String::from("no attempt made");

        for attempt in 1..=self.max_retries {
            let delay = match self.client.get(url.clone()).send().await {
                Ok(res) if res.status() == StatusCode::OK => match res.text().await {
                    Ok(body) => return Ok(body),
                    Err(e) => {
                        last = format!("body read failed: {}", e);
                        next_backoff(self.backoff_base, &mut backoff_exp)
                    }
                },
                Ok(res) if res.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let delay = retry_after(&res).unwrap_or(RATE_LIMIT_FALLBACK);
                    last = format!("rate limited, asked to wait {:?}", delay);
                    delay
                }
                Ok(res) => {
                    last = format!("unexpected status {}", res.status());
                    next_backoff(self.backoff_base, &mut backoff_exp)
                }
                Err(e) => {
                    last = format!("request failed: {}", e);
                    next_backoff(self.backoff_base, &mut backoff_exp)
                }
            };

            tracing::warn!(
                "Fetch attempt {}/{} for {} failed: {}",
                attempt,
                self.max_retries,
                url,
                last
            );

            if attempt < self.max_retries {
                sleep(delay).await;
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.clone(),
            attempts: self.max_retries,
            last,
        })
    }
}

/// The classic 1s/2s/4s progression, scaled off the configured base.
fn next_backoff(base: Duration, exp: &mut u32) -> Duration {
    let delay = base * 2u32.saturating_pow(*exp);
    *exp += 1;
    delay
}

fn retry_after(res: &reqwest::Response) -> Option<Duration> {
    res.headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(2), 3, Duration::from_millis(10)).unwrap()
    }

    fn url_of(server: &mockito::ServerGuard) -> Url {
        Url::parse(&format!("{}/status", server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let mut srv = mockito::Server::new_async().await;
        let mock = srv
            .mock("GET", "/status")
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let body = fetcher().fetch_text(&url_of(&srv)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_recovers_after_upstream_comes_back() {
        let mut srv = mockito::Server::new_async().await;
        let failing = srv
            .mock("GET", "/status")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let res = fetcher().fetch_text(&url_of(&srv)).await;
        assert!(res.is_err());
        failing.assert_async().await;
        failing.remove_async().await;

        let ok = srv
            .mock("GET", "/status")
            .with_body("recovered")
            .create_async()
            .await;

        let body = fetcher().fetch_text(&url_of(&srv)).await.unwrap();
        ok.assert_async().await;
        assert_eq!(body, "recovered");
    }

    #[tokio::test]
    async fn test_exhausts_retries() {
        let mut srv = mockito::Server::new_async().await;
        let mock = srv
            .mock("GET", "/status")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let err = fetcher().fetch_text(&url_of(&srv)).await.unwrap_err();

        mock.assert_async().await;
        match err {
            FetchError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            e => panic!("unexpected error: {}", e),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_honors_retry_after() {
        let mut srv = mockito::Server::new_async().await;
        let limited = srv
            .mock("GET", "/status")
            .with_status(429)
            .with_header("Retry-After", "0")
            .expect(3)
            .create_async()
            .await;

        let res = fetcher().fetch_text(&url_of(&srv)).await;
        // Every attempt was rate limited and honored the zero-second wait;
        // what matters here is that the 429s didn't abort the schedule.
        limited.assert_async().await;
        assert!(res.is_err());
    }

    #[test]
    fn test_backoff_progression() {
        let mut exp = 0;
        let base = Duration::from_secs(1);

        assert_eq!(next_backoff(base, &mut exp), Duration::from_secs(1));
        assert_eq!(next_backoff(base, &mut exp), Duration::from_secs(2));
        assert_eq!(next_backoff(base, &mut exp), Duration::from_secs(4));
    }
}
