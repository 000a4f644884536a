use crate::permission::Permission;
use crate::types::{ResourceId, RoleId, UserId};
use std::collections::{HashMap, HashSet};

/// Persisted shape of a role, as loaded from and reported by the engine.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleRecord {
    /// Role identifier.
    pub id: RoleId,
    /// Maximum number of users holding the role; `0` means unlimited.
    pub max_users: usize,
    /// Parent role the permissions are inherited from.
    pub parent: Option<RoleId>,
    /// Roles that may not be held by the same user.
    pub excludes: Vec<RoleId>,
    /// Resources explicitly allowed.
    pub allowed: Vec<ResourceId>,
    /// Resources explicitly denied.
    pub denied: Vec<ResourceId>,
}

impl RoleRecord {
    /// Creates a record without parent, constraints or grants.
    pub fn new(id: RoleId) -> Self {
        Self {
            id,
            max_users: 0,
            parent: None,
            excludes: Vec::new(),
            allowed: Vec::new(),
            denied: Vec::new(),
        }
    }
}

/// Capability of anything that can be registered as a role.
///
/// Concrete role, group or user types implement this to be added to an
/// [`Engine`](crate::Engine) without converting to engine types first.
pub trait Roler {
    /// Unique, stable identifier.
    fn id(&self) -> RoleId;

    /// Direct parents. The engine accepts at most one.
    fn parents(&self) -> Vec<RoleId>;
}

impl Roler for RoleRecord {
    fn id(&self) -> RoleId {
        self.id.clone()
    }

    fn parents(&self) -> Vec<RoleId> {
        self.parent.iter().cloned().collect()
    }
}

/// In-memory role node.
#[derive(Clone, Debug)]
pub(crate) struct Role {
    pub(crate) id: RoleId,
    pub(crate) parent: Option<RoleId>,
    pub(crate) excludes: HashSet<RoleId>,
    pub(crate) max_users: usize,
    pub(crate) permissions: HashMap<ResourceId, Permission>,
    /// Users holding the role; `None` until first loaded from the store.
    pub(crate) users: Option<HashSet<UserId>>,
}

impl Role {
    pub(crate) fn new(
        id: RoleId,
        max_users: usize,
        parent: Option<RoleId>,
        excludes: HashSet<RoleId>,
    ) -> Self {
        Self {
            id,
            parent,
            excludes,
            max_users,
            permissions: HashMap::new(),
            users: None,
        }
    }

    pub(crate) fn from_record(record: RoleRecord) -> Self {
        let mut role = Self::new(
            record.id,
            record.max_users,
            record.parent,
            record.excludes.into_iter().collect(),
        );
        role.permissions.extend(
            record
                .denied
                .into_iter()
                .map(|resource| (resource, Permission::Deny)),
        );
        // An allow recorded next to a deny for the same resource wins.
        role.permissions.extend(
            record
                .allowed
                .into_iter()
                .map(|resource| (resource, Permission::Allow)),
        );
        role
    }

    pub(crate) fn to_record(&self) -> RoleRecord {
        let mut excludes: Vec<RoleId> = self.excludes.iter().cloned().collect();
        excludes.sort();
        let mut allowed = Vec::new();
        let mut denied = Vec::new();
        for (resource, permission) in &self.permissions {
            match permission {
                Permission::Allow => allowed.push(resource.clone()),
                Permission::Deny => denied.push(resource.clone()),
            }
        }
        allowed.sort();
        denied.sort();

        RoleRecord {
            id: self.id.clone(),
            max_users: self.max_users,
            parent: self.parent.clone(),
            excludes,
            allowed,
            denied,
        }
    }

    /// Whether `resource` is in the role's granted set.
    pub(crate) fn grants(&self, resource: &ResourceId) -> bool {
        matches!(self.permissions.get(resource), Some(Permission::Allow))
    }

    pub(crate) fn granted(&self) -> impl Iterator<Item = &ResourceId> {
        self.permissions
            .iter()
            .filter(|(_, permission)| permission.is_allow())
            .map(|(resource, _)| resource)
    }
}
