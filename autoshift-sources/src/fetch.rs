//! Page fetching.

use std::time::Duration;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("autoshift/", env!("CARGO_PKG_VERSION"));

/// Retrieves page bodies by URL.
///
/// The pipeline only ever talks to this trait, so tests can serve fixture
/// HTML without touching the network.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher with a timeout and a bounded number of retries.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            retries: 2,
            backoff: Duration::from_secs(2),
        })
    }

    /// Number of extra attempts after the first failure.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text()?)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url) {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    log::warn!("Fetching {url} failed ({e}), retry {attempt}/{}", self.retries);
                    std::thread::sleep(self.backoff * attempt);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
