use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

pub mod api;
pub mod config;
pub mod error;
pub mod output;
pub mod pagination;
pub mod reference;
pub mod removal;
pub mod repositories;
pub mod session;
pub mod tags;

pub use api::RegistryApi;
pub use config::ClientConfig;
pub use error::{ErrorKind, HubError, Result};
pub use reference::RepositoryRef;
pub use removal::{RemovalOutcome, RemovalPolicy, RemovalRun, RemovalSummary};
pub use repositories::{Repository, RepositorySummary, SearchPage};
pub use session::{Credentials, Session};
pub use tags::{TagDetails, TagPage, TagRecord};

/// Struct that holds the client and the URL to send requests to the Docker Hub
///
/// The client itself is anonymous, the bearer token of a [`Session`] is only
/// attached to the requests that receive one.
#[derive(Debug, Clone)]
pub struct DockerHubClient {
    /// Contains the instance for the reqwest Client with the required headers and
    /// configuration if any.
    pub client: Client,

    /// Holds the URL for the Docker Hub (https://hub.docker.com)
    pub url: Url,

    /// Number of items requested per page on paginated endpoints
    pub page_size: u32,
}

/// Envelope the Docker Hub wraps every paginated listing with
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResult<T> {
    #[serde(default)]
    pub count: Option<usize>,
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl DockerHubClient {
    /// Creates a new instance of DockerHubClient from the provided configuration
    ///
    /// This method will configure and setup the HTTP client that will be used within
    /// the rest of the methods to send requests to the Docker Hub. No request is sent
    /// here, use [`DockerHubClient::authenticate`] to obtain a [`Session`].
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| HubError::Network(format!("couldn't build the reqwest client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            page_size: config.page_size,
        })
    }

    /// Joins `path` (relative, e.g. `v2/repositories/acme/app/`) to the base URL
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.url.join(path)?)
    }

    /// Prepares a request, attaching the bearer token when a session is given
    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        session: Option<&Session>,
    ) -> RequestBuilder {
        tracing::debug!(%method, %url, authenticated = session.is_some(), "sending request");

        let builder = self.client.request(method, url);
        match session {
            Some(session) => builder.bearer_auth(session.token()),
            None => builder,
        }
    }

    /// Sends the request and turns any non-2xx status into a typed error
    ///
    /// `what` describes the target resource and ends up in the error message.
    pub(crate) async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, what, "request failed");
        Err(HubError::from_status(status, what, &body))
    }

    /// Sends a GET request and parses the JSON body into `T`
    pub(crate) async fn fetch<T>(&self, url: Url, session: Option<&Session>, what: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request = self.request(Method::GET, url, session);
        let response = self.send(request, what).await?;

        let bytes = response.bytes().await?;
        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            HubError::Decode(format!("parsing the response for {what} failed: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_result_serde() {
        let value = json!({
          "count": 3,
          "next": "https://hub.docker.com/v2/repositories/library/nginx/tags/?page=2&page_size=2",
          "previous": null,
          "results": [{ "name": "latest" }, { "name": "stable" }]
        });

        let result = serde_json::from_value::<ApiResult<serde_json::Value>>(value).unwrap();
        assert_eq!(result.count, Some(3));
        assert!(result.next.is_some());
        assert_eq!(result.results.len(), 2);
    }

    #[test]
    fn test_api_result_without_count() {
        let value = json!({ "next": null, "results": [] });

        let result = serde_json::from_value::<ApiResult<serde_json::Value>>(value).unwrap();
        assert_eq!(result.count, None);
        assert!(result.next.is_none());
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = ClientConfig::new("http://localhost:5000/hub", 10, 5).unwrap();
        let dh = DockerHubClient::new(&config).unwrap();

        assert_eq!(
            dh.endpoint("v2/repositories/acme/app/").unwrap().as_str(),
            "http://localhost:5000/hub/v2/repositories/acme/app/"
        );
        assert_eq!(dh.page_size, 10);
    }
}
