use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HubError, Result};
use crate::reference::validate_tag;
use crate::{ApiResult, DockerHubClient, RepositoryRef, Session};

/// A tag as listed by the tags endpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TagRecord {
    /// The name of the tag for a given repository in the Docker Hub
    pub name: String,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,

    /// Compressed size of the tag, summed over all its images
    #[serde(rename = "full_size", default, deserialize_with = "null_as_zero")]
    pub size_bytes: u64,

    /// Manifest digest, missing on some legacy tags
    #[serde(default)]
    pub digest: Option<String>,
}

fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of the tag listing
#[derive(Debug, Clone, PartialEq)]
pub struct TagPage {
    /// Tags in the order the registry returned them, most recent first
    pub items: Vec<TagRecord>,

    /// Opaque token to fetch the following page, `None` on the last one
    pub next_page_token: Option<String>,

    /// Total number of tags, when the registry reports it
    pub count: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Image {
    pub architecture: String,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_pushed: Option<DateTime<Utc>>,
}

/// Every attribute the Docker Hub exposes for a single tag
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TagDetails {
    /// The ID of the current tag on the Docker Hub
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub images: Vec<Image>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_updater_username: Option<String>,

    #[serde(default, deserialize_with = "null_as_zero")]
    pub full_size: u64,

    #[serde(default)]
    pub tag_status: Option<String>,

    #[serde(default)]
    pub tag_last_pulled: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tag_last_pushed: Option<DateTime<Utc>>,

    #[serde(default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub digest: Option<String>,
}

impl DockerHubClient {
    fn tags_url(&self, repo: &RepositoryRef) -> Result<Url> {
        self.endpoint(&format!(
            "v2/repositories/{}/{}/tags/",
            repo.resolved_namespace(),
            repo.name()
        ))
    }

    /// Fetches a single page of tags for the given repository
    ///
    /// Without a `page_token` the first page is fetched, otherwise the token must be
    /// the `next_page_token` of a previous page. Tokens pointing to a host other
    /// than the configured Docker Hub are refused so the session never leaks.
    pub async fn list_tags_page(
        &self,
        repo: &RepositoryRef,
        page_token: Option<&str>,
        session: Option<&Session>,
    ) -> Result<TagPage> {
        let url = match page_token {
            Some(token) => {
                let url = Url::parse(token)
                    .map_err(|e| HubError::Decode(format!("invalid page token `{token}`: {e}")))?;
                if url.origin() != self.url.origin() {
                    return Err(HubError::Decode(format!(
                        "page token `{token}` points outside of {}",
                        self.url
                    )));
                }
                url
            }
            None => {
                let mut url = self.tags_url(repo)?;
                url.query_pairs_mut()
                    .append_pair("page_size", &self.page_size.to_string());
                url
            }
        };

        let result = self
            .fetch::<ApiResult<TagRecord>>(url, session, &format!("tags of `{repo}`"))
            .await?;

        Ok(TagPage {
            items: result.results,
            next_page_token: result.next,
            count: result.count,
        })
    }

    /// Retrieves every attribute of a single tag
    pub async fn get_tag(
        &self,
        repo: &RepositoryRef,
        tag: &str,
        session: Option<&Session>,
    ) -> Result<TagDetails> {
        validate_tag(tag)?;
        let url = self.tags_url(repo)?.join(&format!("{tag}/"))?;

        self.fetch::<TagDetails>(url, session, &format!("tag `{}`", repo.tagged(tag)))
            .await
    }

    /// Deletes a tag from the repository
    ///
    /// Removing tags requires a session. Without one the call fails with
    /// [`HubError::Auth`] before any request is sent.
    pub async fn delete_tag(
        &self,
        repo: &RepositoryRef,
        tag: &str,
        session: Option<&Session>,
    ) -> Result<()> {
        let Some(session) = session else {
            return Err(HubError::Auth(format!(
                "removing `{}` requires logging in",
                repo.tagged(tag)
            )));
        };
        validate_tag(tag)?;

        let url = self.tags_url(repo)?.join(&format!("{tag}/"))?;
        let request = self.request(Method::DELETE, url, Some(session));
        self.send(request, &format!("tag `{}`", repo.tagged(tag)))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientConfig, ErrorKind};
    use serde_json::json;

    fn unreachable_client() -> DockerHubClient {
        // Nothing listens on port 9, a request would surface as a network error
        let config = ClientConfig::new("http://127.0.0.1:9", 2, 1).unwrap();
        DockerHubClient::new(&config).unwrap()
    }

    #[test]
    fn test_tag_record_serde() {
        let value = json!({
          "creator": 14304909,
          "id": 529481097,
          "images": [
            {
              "architecture": "amd64",
              "features": "",
              "variant": null,
              "digest": "sha256:96b6a4e66250499a9d87a4adf259ced7cd213e2320fb475914217f4d69abe98d",
              "os": "linux",
              "os_features": "",
              "os_version": null,
              "size": 755930694,
              "status": "active",
              "last_pulled": "2025-03-05T07:52:00.613197154Z",
              "last_pushed": "2024-01-16T20:54:52Z"
            }
          ],
          "last_updated": "2024-01-16T20:54:55.914808Z",
          "last_updater": 14304909,
          "last_updater_username": "mxyng",
          "name": "gguf",
          "repository": 22180121,
          "full_size": 755930694,
          "v2": true,
          "tag_status": "active",
          "tag_last_pulled": "2025-03-05T07:52:00.613197154Z",
          "tag_last_pushed": "2024-01-16T20:54:55.914808Z",
          "media_type": "application/vnd.oci.image.index.v1+json",
          "content_type": "image",
          "digest": "sha256:7c49490a9e4a7ca4326e09c4b47bc525aa0a9dfc8ea0b3a30d62af23a60db712"
        });

        let record = serde_json::from_value::<TagRecord>(value.clone()).unwrap();
        assert_eq!(record.name, "gguf");
        assert_eq!(record.size_bytes, 755930694);
        assert!(record.digest.as_deref().unwrap().starts_with("sha256:7c49"));
        assert!(record.last_updated.is_some());

        let details = serde_json::from_value::<TagDetails>(value).unwrap();
        assert_eq!(details.images.len(), 1);
        assert_eq!(details.images[0].os.as_deref(), Some("linux"));
        assert_eq!(details.last_updater_username.as_deref(), Some("mxyng"));
    }

    #[test]
    fn test_legacy_tag_without_digest() {
        let value = json!({ "name": "old", "full_size": null, "last_updated": null });
        let record = serde_json::from_value::<TagRecord>(value).unwrap();
        assert_eq!(record.size_bytes, 0);
        assert_eq!(record.digest, None);

        let value = json!({ "name": "older" });
        let record = serde_json::from_value::<TagRecord>(value).unwrap();
        assert_eq!(record.size_bytes, 0);
        assert_eq!(record.last_updated, None);
    }

    #[test]
    fn test_tags_url_of_official_repository() {
        let dh = DockerHubClient::new(&ClientConfig::docker_hub().unwrap()).unwrap();

        let official: RepositoryRef = "nginx".parse().unwrap();
        assert_eq!(
            dh.tags_url(&official).unwrap().as_str(),
            "https://hub.docker.com/v2/repositories/library/nginx/tags/"
        );

        let owned: RepositoryRef = "bitnami/nginx".parse().unwrap();
        assert_eq!(
            dh.tags_url(&owned).unwrap().as_str(),
            "https://hub.docker.com/v2/repositories/bitnami/nginx/tags/"
        );
    }

    #[tokio::test]
    async fn test_delete_without_session_sends_nothing() {
        let dh = unreachable_client();
        let repo: RepositoryRef = "acme/app".parse().unwrap();

        let err = dh.delete_tag(&repo, "v1", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_delete_with_session_reaches_the_network() {
        let dh = unreachable_client();
        let repo: RepositoryRef = "acme/app".parse().unwrap();
        let session = Session::new("token");

        let err = dh.delete_tag(&repo, "v1", Some(&session)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_foreign_page_token_is_refused() {
        let dh = unreachable_client();
        let repo: RepositoryRef = "acme/app".parse().unwrap();

        let err = dh
            .list_tags_page(&repo, Some("https://evil.example.com/v2/tags/?page=2"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    #[ignore = "sends requests to the Docker Hub"]
    async fn test_list_tags_page() -> anyhow::Result<()> {
        let dh = DockerHubClient::new(&ClientConfig::docker_hub()?)?;
        let repo: RepositoryRef = "ollama/ollama".parse()?;

        let page = dh.list_tags_page(&repo, None, None).await?;
        println!("{page:#?}");

        Ok(())
    }
}
