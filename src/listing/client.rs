//! Blocking HTTP transport with a per-request timeout and a minimum delay between requests.

use crate::listing::error::TransportError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str = "subscrape/0.1 (subreddit metrics collector)";
const DEFAULT_TIMEOUT_SECS: u64 = 8;
const DEFAULT_DELAY_MS: u64 = 1000;
const MAX_REDIRECTS: usize = 10;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues one GET. Implemented by [HttpTransport]; tests script their own.
pub trait Transport {
    fn get(&mut self, url: &str) -> Result<RawResponse, TransportError>;
}

/// Lets several fetchers share one transport (and its request spacing) in turn.
impl<T: Transport + ?Sized> Transport for &mut T {
    fn get(&mut self, url: &str) -> Result<RawResponse, TransportError> {
        (**self).get(url)
    }
}

/// Blocking HTTP client that enforces a delay between requests.
#[derive(Debug)]
pub struct HttpTransport {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Option<Instant>,
}

impl HttpTransport {
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    fn wait_delay(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
    }
}

impl Transport for HttpTransport {
    /// Sleeps until the configured delay has passed since the last request, then
    /// sends and reads the full body. Non-success statuses are returned, not raised.
    fn get(&mut self, url: &str) -> Result<RawResponse, TransportError> {
        self.wait_delay();
        let result = self.inner.get(url).send();
        self.last_request = Some(Instant::now());
        let response = result?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(RawResponse { status, body })
    }
}

/// Builder for [HttpTransport] with optional User-Agent, delay, and timeout.
#[derive(Debug)]
pub struct HttpTransportBuilder {
    user_agent: Option<String>,
    delay_ms: u64,
    timeout_secs: u64,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_ms: DEFAULT_DELAY_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpTransportBuilder {
    /// Set a custom User-Agent. The listing API rejects requests without one.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Minimum delay between requests in milliseconds. Default 1000.
    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Per-request timeout in seconds. Default 8.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    pub fn build(self) -> Result<HttpTransport, reqwest::Error> {
        let user_agent = self
            .user_agent
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let inner = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(HttpTransport {
            inner,
            delay: Duration::from_millis(self.delay_ms),
            last_request: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_response_success_range() {
        let ok = RawResponse {
            status: 200,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!RawResponse { status: 302, ..ok.clone() }.is_success());
        assert!(!RawResponse { status: 429, ..ok }.is_success());
    }

    #[test]
    fn builder_accepts_custom_settings() {
        let transport = HttpTransport::builder()
            .user_agent("test-agent/1.0")
            .delay_ms(0)
            .timeout_secs(2)
            .build();
        assert!(transport.is_ok());
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        // Grab a free port, then close it so nothing is listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut transport = HttpTransport::builder()
            .delay_ms(0)
            .timeout_secs(2)
            .build()
            .unwrap();
        let result = transport.get(&format!("http://127.0.0.1:{}/r/x/new.json", port));
        assert!(result.is_err());
    }
}
