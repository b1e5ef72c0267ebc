use std::time::Duration;

use url::Url;

use crate::error::HubError;

pub const DEFAULT_URL: &str = "https://hub.docker.com";

/// The Docker Hub refuses page sizes above 100
pub const MAX_PAGE_SIZE: u32 = 100;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings used to build a [`crate::DockerHubClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Docker Hub API, without the `v2/` suffix
    pub url: Url,

    /// Number of tags requested per page when listing tags
    pub page_size: u32,

    /// Timeout applied to every single request
    pub timeout: Duration,

    pub user_agent: String,
}

impl ClientConfig {
    /// Configuration pointing to the public Docker Hub
    pub fn docker_hub() -> Result<Self, HubError> {
        Self::new(DEFAULT_URL, MAX_PAGE_SIZE, DEFAULT_TIMEOUT_SECS)
    }

    /// Builds a configuration from user provided values, validating each one
    pub fn new(url: &str, page_size: u32, timeout_secs: u64) -> Result<Self, HubError> {
        let mut url = Url::parse(url)
            .map_err(|e| HubError::Validation(format!("`{url}` is not a valid url: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(HubError::Validation(format!(
                "`{url}` must use either the http or https scheme"
            )));
        }

        // `Url::join` drops the last segment unless the path ends with a slash
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(HubError::Validation(format!(
                "the page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        if timeout_secs == 0 {
            return Err(HubError::Validation("the timeout must be at least one second".into()));
        }

        Ok(Self {
            url,
            page_size,
            timeout: Duration::from_secs(timeout_secs),
            user_agent: format!("docker-remote/{}", env!("CARGO_PKG_VERSION")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::docker_hub().unwrap();
        assert_eq!(config.url.as_str(), "https://hub.docker.com/");
        assert_eq!(config.page_size, 100);
        assert!(config.user_agent.starts_with("docker-remote/"));
    }

    #[test]
    fn test_custom_url_keeps_its_path() {
        let config = ClientConfig::new("http://localhost:8080/hub", 10, 5).unwrap();
        assert_eq!(config.url.as_str(), "http://localhost:8080/hub/");
        assert_eq!(
            config.url.join("v2/search/repositories/").unwrap().as_str(),
            "http://localhost:8080/hub/v2/search/repositories/"
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(ClientConfig::new("not a url", 10, 5).is_err());
        assert!(ClientConfig::new("ftp://hub.docker.com", 10, 5).is_err());
        assert!(ClientConfig::new(DEFAULT_URL, 0, 5).is_err());
        assert!(ClientConfig::new(DEFAULT_URL, 101, 5).is_err());
        assert!(ClientConfig::new(DEFAULT_URL, 10, 0).is_err());
    }
}
