use crate::types::{ResourceId, RoleId};
use std::fmt;

/// Explicit permission state of a role for one resource.
///
/// A resource absent from a role's permission map is unset and defers to the
/// parent role.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Permission {
    /// Access is granted, regardless of ancestors.
    Allow,
    /// Access is refused, regardless of ancestors.
    Deny,
}

impl Permission {
    /// Returns whether this state grants access.
    pub fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

/// Outcome of a [`Hook`] check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HookDecision {
    /// Grant access and stop resolution.
    Allow,
    /// Refuse access and stop resolution.
    Deny,
    /// Fall through to the role's own state.
    Continue,
}

/// Pre-resolution hook consulted for every role visited while resolving.
///
/// Lets embedding code short-circuit the standard algorithm, e.g. a
/// superuser role that is allowed everything.
pub trait Hook: Send + Sync {
    /// Checks `role` for `resource` before the role's own state is read.
    fn check(&self, role: &RoleId, resource: &ResourceId) -> HookDecision;
}

impl<F> Hook for F
where
    F: Fn(&RoleId, &ResourceId) -> HookDecision + Send + Sync,
{
    fn check(&self, role: &RoleId, resource: &ResourceId) -> HookDecision {
        self(role, resource)
    }
}
