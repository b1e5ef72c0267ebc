use async_trait::async_trait;

use crate::error::Result;
use crate::{DockerHubClient, RepositoryRef, SearchPage, Session, TagPage};

/// The four request kinds the tag engine and the CLI rely on
///
/// Each call sends exactly one request. [`DockerHubClient`] is the real
/// implementation, tests plug in an in-memory registry instead.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn search(
        &self,
        query: &str,
        page: u32,
        session: Option<&Session>,
    ) -> Result<SearchPage>;

    async fn get_description(
        &self,
        repo: &RepositoryRef,
        full: bool,
        session: Option<&Session>,
    ) -> Result<String>;

    async fn list_tags_page(
        &self,
        repo: &RepositoryRef,
        page_token: Option<&str>,
        session: Option<&Session>,
    ) -> Result<TagPage>;

    /// Must fail with [`crate::HubError::Auth`] without any request when `session` is `None`
    async fn delete_tag(
        &self,
        repo: &RepositoryRef,
        tag: &str,
        session: Option<&Session>,
    ) -> Result<()>;
}

#[async_trait]
impl RegistryApi for DockerHubClient {
    async fn search(
        &self,
        query: &str,
        page: u32,
        session: Option<&Session>,
    ) -> Result<SearchPage> {
        DockerHubClient::search(self, query, page, session).await
    }

    async fn get_description(
        &self,
        repo: &RepositoryRef,
        full: bool,
        session: Option<&Session>,
    ) -> Result<String> {
        DockerHubClient::get_description(self, repo, full, session).await
    }

    async fn list_tags_page(
        &self,
        repo: &RepositoryRef,
        page_token: Option<&str>,
        session: Option<&Session>,
    ) -> Result<TagPage> {
        DockerHubClient::list_tags_page(self, repo, page_token, session).await
    }

    async fn delete_tag(
        &self,
        repo: &RepositoryRef,
        tag: &str,
        session: Option<&Session>,
    ) -> Result<()> {
        DockerHubClient::delete_tag(self, repo, tag, session).await
    }
}
