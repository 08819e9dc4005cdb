use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;

pub const USER_AGENT: &str = "SmugMug-Client-Selection-Tool/1.0";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} returned status {status}")]
    Status { status: StatusCode, url: String },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Invalid URL {0}")]
    InvalidUrl(String),

    #[error("Failed to sign request: {0}")]
    Signing(String),

    #[error("Response from {0} has no usable payload")]
    MissingResponse(String),
}

/// Produces the `Authorization` header value for an outgoing request
pub trait RequestSigner: Send + Sync {
    fn authorization(&self, method: &str, url: &Url) -> Result<String, ApiError>;
}

/// Configuration for the API HTTP client
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    /// Retries for 429/5xx and connection failures. Zero disables retrying.
    pub max_retries: usize,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    /// Pause after every completed call
    pub rate_limit_delay: Duration,
    pub user_agent: String,
    pub enable_cookies: bool,
    pub enable_gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 0,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
            rate_limit_delay: Duration::from_millis(100),
            user_agent: USER_AGENT.to_string(),
            enable_cookies: true,
            enable_gzip: true,
        }
    }
}

/// JSON API client with optional request signing, rate limiting and retry
pub struct ApiHttpClient {
    client: Client,
    config: HttpClientConfig,
    signer: Option<Box<dyn RequestSigner>>,
}

impl ApiHttpClient {
    /// Create a client with default configuration and no signing
    pub fn new() -> Result<Self, ApiError> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .cookie_store(config.enable_cookies)
            .gzip(config.enable_gzip)
            .brotli(true)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            config,
            signer: None,
        })
    }

    /// Sign every request with `signer`
    pub fn with_signer(mut self, signer: impl RequestSigner + 'static) -> Self {
        self.signer = Some(Box::new(signer));
        self
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Calculate retry delay with exponential backoff and jitter
    fn calculate_retry_delay(&self, attempt: usize) -> Duration {
        let base_delay = self.config.initial_retry_delay_ms;
        let max_delay = self.config.max_retry_delay_ms;

        let delay_ms = base_delay
            .saturating_mul(2u64.saturating_pow(attempt as u32))
            .min(max_delay);

        let mut rng = rand::thread_rng();
        let jitter = rng.gen_range(0.75..=1.25);
        Duration::from_millis((delay_ms as f64 * jitter) as u64)
    }

    fn is_retryable_status(status: StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
    }

    /// Send a signed GET, retrying retryable failures up to `max_retries`
    pub async fn get_with_retry(&self, url: &Url) -> Result<Response, ApiError> {
        let mut attempt = 0;

        loop {
            let mut request = self.client.get(url.clone());
            // Signed per attempt so every retry carries a fresh nonce
            if let Some(signer) = &self.signer {
                request = request.header(AUTHORIZATION, signer.authorization("GET", url)?);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if Self::is_retryable_status(status) && attempt < self.config.max_retries {
                        log::warn!(
                            "Received retryable status {} for {}, attempt {}/{}",
                            status,
                            url,
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                        sleep(self.calculate_retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let should_retry = e.is_timeout() || e.is_connect();
                    if should_retry && attempt < self.config.max_retries {
                        log::warn!(
                            "Request failed for {}, attempt {}/{}: {}",
                            url,
                            attempt + 1,
                            self.config.max_retries + 1,
                            e
                        );
                        sleep(self.calculate_retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// GET `url` and decode a JSON body. Waits the rate-limit delay after
    /// the call whatever its outcome.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let result = self.fetch_text(url).await;
        self.rate_limit_delay().await;

        let body = result?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, ApiError> {
        let response = self.get_with_retry(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    pub async fn rate_limit_delay(&self) {
        if !self.config.rate_limit_delay.is_zero() {
            sleep(self.config.rate_limit_delay).await;
        }
    }

    /// Get the underlying reqwest client for direct access
    pub fn client(&self) -> &Client {
        &self.client
    }
}
