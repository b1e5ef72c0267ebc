use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::HubError;

/// Namespace used by the Docker Hub for official repositories e.g. `nginx`
pub const OFFICIAL_NAMESPACE: &str = "library";

const MAX_TAG_LEN: usize = 128;

/// A repository on the Docker Hub, written as `namespace/name` or just `name`
///
/// When the namespace is missing the repository is an official one, and the
/// requests are built against the [`OFFICIAL_NAMESPACE`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryRef {
    namespace: Option<String>,
    name: String,
}

impl RepositoryRef {
    pub fn new(namespace: Option<&str>, name: &str) -> Result<Self, HubError> {
        let namespace = namespace.map(|ns| validate_component(ns, "namespace")).transpose()?;
        let name = validate_component(name, "repository name")?;

        Ok(Self { namespace, name })
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace requests should target, falling back to the official one
    pub fn resolved_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(OFFICIAL_NAMESPACE)
    }

    pub fn is_official(&self) -> bool {
        self.resolved_namespace() == OFFICIAL_NAMESPACE
    }

    /// Formats a tag of this repository e.g. `acme/app:v1` or `nginx:latest`
    pub fn tagged(&self, tag: &str) -> String {
        if self.is_official() {
            format!("{}:{}", self.name, tag)
        } else {
            format!("{}/{}:{}", self.resolved_namespace(), self.name, tag)
        }
    }
}

impl FromStr for RepositoryRef {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => RepositoryRef::new(None, name),
            (Some(namespace), Some(name), None) => RepositoryRef::new(Some(namespace), name),
            _ => Err(HubError::Validation(format!(
                "`{s}` is not a valid repository, expected `namespace/repository` or `repository`"
            ))),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

fn validate_component(value: &str, what: &str) -> Result<String, HubError> {
    if value.is_empty() {
        return Err(HubError::Validation(format!("the {what} cannot be empty")));
    }

    let value = value.to_lowercase();
    let starts_alnum = value.starts_with(|c: char| c.is_ascii_alphanumeric());
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));

    if !starts_alnum || !valid_chars {
        return Err(HubError::Validation(format!(
            "`{value}` is not a valid {what}, only lowercase letters, digits, `.`, `_` and `-` are allowed"
        )));
    }

    Ok(value)
}

/// Checks that `tag` is a valid image tag name
///
/// A tag starts with a letter, digit or `_`, followed by up to 127 letters,
/// digits, `_`, `.` or `-`.
pub fn validate_tag(tag: &str) -> Result<(), HubError> {
    let mut chars = tag.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if first_ok && rest_ok && tag.len() <= MAX_TAG_LEN {
        Ok(())
    } else {
        Err(HubError::Validation(format!("`{tag}` is not a valid tag name")))
    }
}
