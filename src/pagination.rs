use futures::stream::{self, Stream, TryStreamExt};

use crate::error::{HubError, Result};
use crate::{RegistryApi, RepositoryRef, Session, TagRecord};

enum Cursor {
    First,
    Next(String),
    Done,
}

/// Lazily walks every tag of a repository, one page at a time
///
/// The next page is only requested once all the tags of the current one have
/// been consumed. Tags come out in the exact order the registry lists them,
/// page after page, with no sorting nor deduplication. Every call starts a new
/// traversal from the first page.
pub fn iterate<'a, A>(
    api: &'a A,
    repo: &'a RepositoryRef,
    session: Option<&'a Session>,
) -> impl Stream<Item = Result<TagRecord>> + 'a
where
    A: RegistryApi + ?Sized,
{
    stream::try_unfold(Cursor::First, move |cursor| async move {
        let token = match cursor {
            Cursor::First => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok(None),
        };

        let page = api.list_tags_page(repo, token.as_deref(), session).await?;
        tracing::debug!(
            %repo,
            tags = page.items.len(),
            has_next = page.next_page_token.is_some(),
            "fetched tags page"
        );

        let cursor = match page.next_page_token {
            // A registry answering with the same token forever would never end
            Some(next) if token.as_deref() == Some(next.as_str()) => {
                return Err(HubError::Decode(format!(
                    "the registry returned the page token `{next}` twice"
                )));
            }
            Some(next) => Cursor::Next(next),
            None => Cursor::Done,
        };

        let items = stream::iter(page.items.into_iter().map(Ok::<_, HubError>));
        Ok(Some((items, cursor)))
    })
    .try_flatten()
}

/// Drains [`iterate`] into a vector
pub async fn collect_tags<A>(
    api: &A,
    repo: &RepositoryRef,
    session: Option<&Session>,
) -> Result<Vec<TagRecord>>
where
    A: RegistryApi + ?Sized,
{
    iterate(api, repo, session).try_collect().await
}
