use crate::types::{ResourceId, RoleId, UserId};
use thiserror::Error;

/// Store-layer error type.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// Mutations validate every precondition before touching the store, so any
/// error other than [`Error::Store`] means nothing was written.
#[derive(Debug, Error)]
pub enum Error {
    /// Store error wrapper, tagged with the store operation that failed.
    #[error("store error in {op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },
    /// Malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Resource is already registered.
    #[error("resource already exists: {0}")]
    ResourceAlreadyExists(ResourceId),
    /// Resource is not registered.
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),
    /// Role does not exist.
    #[error("role not found: {0}")]
    RoleNotFound(RoleId),
    /// Parent role does not exist.
    #[error("parent role not found: {0}")]
    ParentNotFound(RoleId),
    /// Excluded role does not exist.
    #[error("excluded role not found: {0}")]
    ExcludeNotFound(RoleId),
    /// Role still has child roles.
    #[error("role {role} still has dependent role {child}")]
    HasDependents { role: RoleId, child: RoleId },
    /// User cap of a role would be exceeded.
    #[error("role {role} is limited to {max_users} users")]
    TooManyUsers { role: RoleId, max_users: usize },
    /// A user would hold two mutually excluded roles.
    #[error("user {user} cannot hold both {role} and {excluded}")]
    ConflictingAssociation {
        user: UserId,
        role: RoleId,
        excluded: RoleId,
    },
    /// Grant to a child that its parent does not hold.
    #[error("role {role} cannot be granted {resource}: not granted to parent {parent}")]
    NotSubsetOfParent {
        role: RoleId,
        parent: RoleId,
        resource: ResourceId,
    },
    /// A descendant still holds the resource being taken away.
    #[error("role {role} cannot lose {resource}: dependent role {dependent} still holds it")]
    DependentStillAllowed {
        role: RoleId,
        dependent: RoleId,
        resource: ResourceId,
    },
    /// Role inheritance cycle detected.
    #[error("role cycle detected at role {role}")]
    RoleCycleDetected { role: RoleId },
    /// Role inheritance depth exceeded.
    #[error("role inheritance depth exceeded at role {role}; max depth {max_depth}")]
    RoleDepthExceeded { role: RoleId, max_depth: usize },
}

impl Error {
    pub(crate) fn store(op: &'static str, source: StoreError) -> Self {
        Self::Store { op, source }
    }
}
