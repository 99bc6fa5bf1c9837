use groupbridge_types::GroupId;
use thiserror::Error;

/// Errors surfaced by the hybrid resolver and its collaborators.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Mutation targeting a directory group, or a forbidden cross-domain
    /// attachment involving one.
    #[error("Group {0} is a directory group and can not be modified")]
    ImmutableEntity(GroupId),

    #[error("A directory group named '{0}' already exists")]
    NameCollision(String),

    /// Another local group already uses the name.
    #[error("Group '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid membership: {0}")]
    InvalidMembership(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Only raised inside directory clients; lookups degrade to empty results.
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),
}

pub type ResolverResult<T> = Result<T, ResolverError>;

impl ResolverError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ResolverError::NotFound(what.into())
    }

    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            ResolverError::ImmutableEntity(_) | ResolverError::NameCollision(_)
        )
    }
}

impl From<anyhow::Error> for ResolverError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<ResolverError>() {
            Ok(resolver_error) => resolver_error,
            Err(e) => ResolverError::Storage(e),
        }
    }
}
