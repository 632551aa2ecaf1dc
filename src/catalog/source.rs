//! Remote catalog source

use std::time::Duration;

use tracing::debug;

use crate::error::{HpcError, Result};

/// Something that can produce the raw catalog payload
pub trait CatalogSource {
    /// Fetch the complete payload; a partial body is an error
    fn fetch(&self) -> Result<Vec<u8>>;
}

/// Fetches the catalog with a single unauthenticated HTTP GET
pub struct HttpCatalogSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("hpcgame/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HpcError::FetchFailed(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CatalogSource for HttpCatalogSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        debug!(url = %self.url, "fetching partition catalog");

        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| HpcError::FetchFailed(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HpcError::FetchFailed(format!("{} returned {}", self.url, status)));
        }

        // Buffer the whole body before anyone gets to see it
        let body = response
            .bytes()
            .map_err(|e| HpcError::FetchFailed(format!("{}: {}", self.url, e)))?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_host_is_fetch_failure() {
        // Port 9 on localhost is discard; nothing listens there in CI
        let source = HttpCatalogSource::new("http://127.0.0.1:9/partitions.json").unwrap();
        assert_eq!(source.url(), "http://127.0.0.1:9/partitions.json");
        assert!(matches!(source.fetch(), Err(HpcError::FetchFailed(_))));
    }
}
