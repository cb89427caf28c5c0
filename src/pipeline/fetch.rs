//! Resource download

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::utils::format::format_bytes;

/// Source of raw resource bytes
///
/// The pipeline only talks to this trait, so tests can serve resources
/// from memory.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Download the resource at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP GET fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the configured timeout and user agent
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout_duration())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::RequestFailed {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { http })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let failed = |e: reqwest::Error| FetchError::RequestFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.http.get(parsed).send().await.map_err(failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.bytes().await.map_err(failed)?;
        debug!("Downloaded {} from {}", format_bytes(body.len() as u64), url);
        Ok(body.to_vec())
    }
}

/// Last path segment of a URL, used as the local file name
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FetchError::InvalidUrl(format!("{url}: no file name in path")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BsonJsonError;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://cdn.example.com/rooms/living.bson").unwrap(),
            "living.bson"
        );
        assert_eq!(
            file_name_from_url("https://cdn.example.com/a/b?version=2").unwrap(),
            "b"
        );
    }

    #[test]
    fn test_file_name_requires_a_path() {
        assert!(file_name_from_url("https://cdn.example.com/").is_err());
        assert!(file_name_from_url("not a url").is_err());
    }

    #[test]
    fn test_http_fetcher_builds_from_defaults() {
        assert!(HttpFetcher::new(&FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_sending() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("::nope::").await.unwrap_err();
        assert!(matches!(
            err,
            BsonJsonError::Fetch(FetchError::InvalidUrl(_))
        ));
    }
}
