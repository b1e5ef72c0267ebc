use chrono::{DateTime, Utc};

use crate::error::{ErrorKind, HubError, Result};
use crate::pagination::collect_tags;
use crate::reference::validate_tag;
use crate::{RegistryApi, RepositoryRef, Session};

/// Which tags of a repository should be removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Remove exactly the named tag
    RemoveSingle(String),

    /// Remove every tag currently listed
    RemoveAll,

    /// Keep the first `n` tags of the listing (the most recent ones) and
    /// remove the rest
    KeepLastN(usize),
}

impl RemovalPolicy {
    pub fn single(tag: &str) -> Result<Self> {
        validate_tag(tag)?;
        Ok(RemovalPolicy::RemoveSingle(tag.to_string()))
    }

    /// Accepts any integer so that negative counts are reported as validation errors
    pub fn keep_last(n: i64) -> Result<Self> {
        let n = usize::try_from(n).map_err(|_| {
            HubError::Validation(format!(
                "the number of tags to keep must be zero or positive, got {n}"
            ))
        })?;
        Ok(RemovalPolicy::KeepLastN(n))
    }
}

/// The result of a single tag deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub tag: String,
    pub error: Option<HubError>,
}

impl RemovalOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(HubError::kind)
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error.as_ref().map(HubError::detail)
    }
}

/// Every outcome of a removal batch, in the order the deletions were sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    pub outcomes: Vec<RemovalOutcome>,

    /// Tags never attempted because the session was rejected mid-batch
    pub skipped: Vec<String>,
}

impl RemovalSummary {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failures(&self) -> Vec<&RemovalOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.skipped.is_empty() && self.outcomes.iter().all(RemovalOutcome::succeeded)
    }
}

/// Returns the session if it can be used for a mutating request at `now`
pub fn require_session(session: Option<&Session>, now: DateTime<Utc>) -> Result<&Session> {
    match session {
        None => Err(HubError::Auth(
            "removing tags requires logging in with `--login user:password`".into(),
        )),
        Some(session) if session.is_expired(now) => Err(HubError::Auth(
            "the session token has expired, log in again".into(),
        )),
        Some(session) => Ok(session),
    }
}

/// Resolves the names of the tags the policy would remove, in listing order
///
/// A single tag is taken as is, without checking that it exists. The other
/// policies walk the whole listing and treat its order as authoritative.
pub async fn resolve_targets<A>(
    api: &A,
    policy: &RemovalPolicy,
    repo: &RepositoryRef,
    session: Option<&Session>,
) -> Result<Vec<String>>
where
    A: RegistryApi + ?Sized,
{
    let keep = match policy {
        RemovalPolicy::RemoveSingle(tag) => return Ok(vec![tag.clone()]),
        RemovalPolicy::RemoveAll => 0,
        RemovalPolicy::KeepLastN(n) => *n,
    };

    let listing = collect_tags(api, repo, session).await?;
    tracing::debug!(%repo, listed = listing.len(), keep, "resolved tag listing");

    Ok(listing.into_iter().skip(keep).map(|tag| tag.name).collect())
}

/// Deletes `targets` one after the other, in the given order
///
/// Failures are recorded and the batch goes on, except for authentication
/// failures: on the first deletion the error is returned as is, later on the
/// remaining tags are reported as skipped.
pub async fn remove_tags<A>(
    api: &A,
    repo: &RepositoryRef,
    targets: &[String],
    session: &Session,
) -> Result<RemovalSummary>
where
    A: RegistryApi + ?Sized,
{
    let mut summary = RemovalSummary::default();

    for (index, tag) in targets.iter().enumerate() {
        let error = match api.delete_tag(repo, tag, Some(session)).await {
            Ok(()) => {
                tracing::info!(tag = %repo.tagged(tag), "removed tag");
                None
            }
            Err(err) if err.kind() == ErrorKind::Auth && index == 0 => {
                tracing::error!(tag = %repo.tagged(tag), error = %err, "session rejected");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(tag = %repo.tagged(tag), error = %err, "failed removing tag");
                Some(err)
            }
        };

        let abort = error.as_ref().is_some_and(|e| e.kind() == ErrorKind::Auth);
        summary.outcomes.push(RemovalOutcome {
            tag: tag.clone(),
            error,
        });

        if abort {
            summary.skipped = targets[index + 1..].to_vec();
            tracing::error!(skipped = summary.skipped.len(), "session rejected, aborting");
            break;
        }
    }

    Ok(summary)
}

/// How a confirmed removal ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalRun {
    /// The policy selected no tag, nothing was asked nor sent
    NothingToRemove,

    /// The targets were refused at confirmation, no deletion was sent
    Declined(Vec<String>),

    Completed(RemovalSummary),
}

impl RemovalRun {
    /// Only a refused confirmation or a batch with failed or skipped tags is unsuccessful
    pub fn is_success(&self) -> bool {
        match self {
            RemovalRun::NothingToRemove => true,
            RemovalRun::Declined(_) => false,
            RemovalRun::Completed(summary) => summary.is_success(),
        }
    }
}

/// Applies a removal policy to a repository, asking `confirm` before deleting
///
/// The session is checked before anything is sent, then the targets are
/// resolved. `confirm` is only called when there is at least one target, and
/// the deletions go through [`remove_tags`] once it agrees.
pub async fn execute_confirmed<A, F>(
    api: &A,
    policy: &RemovalPolicy,
    repo: &RepositoryRef,
    session: Option<&Session>,
    confirm: F,
) -> Result<RemovalRun>
where
    A: RegistryApi + ?Sized,
    F: FnOnce(&[String]) -> bool,
{
    let session = require_session(session, Utc::now())?;

    let targets = resolve_targets(api, policy, repo, Some(session)).await?;
    if targets.is_empty() {
        tracing::info!(%repo, "no tags to remove");
        return Ok(RemovalRun::NothingToRemove);
    }

    if !confirm(&targets) {
        tracing::info!(%repo, targets = targets.len(), "removal declined");
        return Ok(RemovalRun::Declined(targets));
    }

    let summary = remove_tags(api, repo, &targets, session).await?;
    Ok(RemovalRun::Completed(summary))
}

/// Applies a removal policy to a repository without asking for confirmation
pub async fn execute<A>(
    api: &A,
    policy: &RemovalPolicy,
    repo: &RepositoryRef,
    session: Option<&Session>,
) -> Result<RemovalSummary>
where
    A: RegistryApi + ?Sized,
{
    match execute_confirmed(api, policy, repo, session, |_| true).await? {
        RemovalRun::NothingToRemove => Ok(RemovalSummary::default()),
        RemovalRun::Declined(targets) => Ok(RemovalSummary {
            outcomes: Vec::new(),
            skipped: targets,
        }),
        RemovalRun::Completed(summary) => Ok(summary),
    }
}
