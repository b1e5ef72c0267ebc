use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{ApiResult, DockerHubClient, RepositoryRef, Session};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub slug: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub admin: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Repository {
    /// The name of the repository on the Docker Hub
    pub name: String,

    /// The namespace i.e. user or organization where the repository lives in
    pub namespace: String,

    /// The type of repository, can be any of "image", etc.
    #[serde(default)]
    pub repository_type: Option<String>,

    #[serde(default)]
    pub status_description: Option<String>,

    /// The short description, may be empty
    #[serde(default)]
    pub description: Option<String>,

    /// The long-form description, usually markdown
    #[serde(default)]
    pub full_description: Option<String>,

    #[serde(default)]
    pub is_private: bool,

    #[serde(default)]
    pub star_count: u64,

    #[serde(default)]
    pub pull_count: u64,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default)]
    pub date_registered: Option<DateTime<Utc>>,

    /// Permissions of the caller on this repository, all false when anonymous
    #[serde(default)]
    pub permissions: Permissions,

    #[serde(default)]
    pub categories: Vec<Category>,

    /// The size of the virtual image in bytes
    #[serde(default)]
    pub storage_size: Option<u64>,
}

/// One entry of the Docker Hub search results
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RepositorySummary {
    /// Either `name` for official repositories or `namespace/name`
    pub repo_name: String,

    #[serde(default)]
    pub short_description: Option<String>,

    #[serde(default)]
    pub star_count: u64,

    #[serde(default)]
    pub pull_count: u64,

    #[serde(default)]
    pub repo_owner: Option<String>,

    #[serde(default)]
    pub is_official: bool,

    #[serde(default)]
    pub is_automated: bool,
}

/// A single page of search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// Total number of results across every page
    pub count: usize,

    pub results: Vec<RepositorySummary>,

    pub has_next: bool,
}

impl DockerHubClient {
    /// Searches the Docker Hub for repositories matching `query`
    ///
    /// Only the requested page is fetched (pages start at 1), together with the
    /// total number of matching repositories.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        session: Option<&Session>,
    ) -> Result<SearchPage> {
        let mut url = self.endpoint("v2/search/repositories/")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("page", &page.max(1).to_string());

        let result = self
            .fetch::<ApiResult<RepositorySummary>>(url, session, &format!("search `{query}`"))
            .await?;

        Ok(SearchPage {
            count: result.count.unwrap_or(result.results.len()),
            has_next: result.next.is_some(),
            results: result.results,
        })
    }

    /// Retrieves the details of a single repository
    ///
    /// Official repositories are looked up under the `library` namespace. The
    /// returned permissions reflect the provided session, if any.
    pub async fn get_repository(
        &self,
        repo: &RepositoryRef,
        session: Option<&Session>,
    ) -> Result<Repository> {
        let url = self.endpoint(&format!(
            "v2/repositories/{}/{}/",
            repo.resolved_namespace(),
            repo.name()
        ))?;

        self.fetch::<Repository>(url, session, &format!("repository `{repo}`"))
            .await
    }

    /// Returns either the short (`full = false`) or the long-form description
    pub async fn get_description(
        &self,
        repo: &RepositoryRef,
        full: bool,
        session: Option<&Session>,
    ) -> Result<String> {
        let repository = self.get_repository(repo, session).await?;

        let description = if full {
            repository.full_description
        } else {
            repository.description
        };
        Ok(description.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repository_serde() {
        let value = json!({
          "name": "ollama",
          "namespace": "ollama",
          "repository_type": "image",
          "status": 1,
          "status_description": "active",
          "description": "The easiest way to get up and running with large language models.",
          "full_description": "# Ollama\n\nGet up and running.",
          "is_private": false,
          "star_count": 1183,
          "pull_count": 13256501,
          "last_updated": "2025-03-04T04:01:22.754331Z",
          "last_modified": "2024-10-16T13:48:34.145251Z",
          "date_registered": "2023-06-29T23:27:34.326426Z",
          "affiliation": "",
          "permissions": { "read": true, "write": false, "admin": false },
          "media_types": [
            "application/vnd.docker.container.image.v1+json",
            "application/vnd.oci.image.index.v1+json"
          ],
          "content_types": [
            "image"
          ],
          "categories": [
            {
              "name": "Machine Learning & AI",
              "slug": "machine-learning-and-ai"
            }
          ],
          "storage_size": 662988133055 as u64,
        });

        let repository = serde_json::from_value::<Repository>(value).unwrap();

        assert_eq!(repository.namespace, "ollama");
        assert_eq!(repository.full_description.as_deref(), Some("# Ollama\n\nGet up and running."));
        assert!(repository.permissions.read);
        assert!(!repository.permissions.write);
        assert_eq!(repository.categories.len(), 1);
        assert_eq!(repository.storage_size, Some(662988133055));
    }

    #[test]
    fn test_repository_with_null_descriptions() {
        let value = json!({
          "name": "scratchpad",
          "namespace": "acme",
          "description": null,
          "full_description": null,
        });

        let repository = serde_json::from_value::<Repository>(value).unwrap();
        assert_eq!(repository.description, None);
        assert_eq!(repository.permissions, Permissions::default());
    }

    #[test]
    fn test_search_result_serde() {
        let value = json!({
          "count": 2,
          "next": null,
          "previous": null,
          "results": [
            {
              "repo_name": "nginx",
              "short_description": "Official build of Nginx.",
              "star_count": 20000,
              "pull_count": 1000000000u64,
              "repo_owner": "",
              "is_automated": false,
              "is_official": true
            },
            {
              "repo_name": "bitnami/nginx",
              "short_description": null,
              "star_count": 200,
              "pull_count": 1000,
              "is_automated": true,
              "is_official": false
            }
          ]
        });

        let result = serde_json::from_value::<ApiResult<RepositorySummary>>(value).unwrap();
        assert_eq!(result.results.len(), 2);
        assert!(result.results[0].is_official);
        assert_eq!(result.results[1].repo_name, "bitnami/nginx");
        assert_eq!(result.results[1].short_description, None);
    }

    #[tokio::test]
    #[ignore = "sends requests to the Docker Hub"]
    async fn test_get_description() -> anyhow::Result<()> {
        let dh = DockerHubClient::new(&crate::ClientConfig::docker_hub()?)?;
        let repo: RepositoryRef = "nginx".parse()?;

        println!("{}", dh.get_description(&repo, false, None).await?);
        println!("{:#?}", dh.search("nginx", 1, None).await?);

        Ok(())
    }
}
