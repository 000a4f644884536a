use crate::error::StoreError;
use crate::role::RoleRecord;
use crate::types::{ResourceId, RoleId, UserId};
use async_trait::async_trait;

/// Store interface for role definitions.
#[async_trait]
pub trait RoleStore {
    /// Loads every role, with its grants, at engine startup.
    async fn load_roles(&self) -> std::result::Result<Vec<RoleRecord>, StoreError>;

    /// Persists a new role without grants.
    async fn add_role(
        &self,
        id: RoleId,
        max_users: usize,
        parent: Option<RoleId>,
        excludes: Vec<RoleId>,
    ) -> std::result::Result<(), StoreError>;

    /// Deletes a role together with its grants and user relations.
    ///
    /// Exclude sets of other roles are rewritten by the engine through
    /// [`RoleStore::set_exclude`] before this call.
    async fn del_role(&self, id: RoleId) -> std::result::Result<(), StoreError>;

    /// Updates the user cap of a role.
    async fn set_count(&self, id: RoleId, max_users: usize) -> std::result::Result<(), StoreError>;

    /// Replaces the exclude set of a role.
    async fn set_exclude(
        &self,
        id: RoleId,
        excludes: Vec<RoleId>,
    ) -> std::result::Result<(), StoreError>;

    /// Replaces the parent of a role.
    async fn set_parent(
        &self,
        id: RoleId,
        parent: Option<RoleId>,
    ) -> std::result::Result<(), StoreError>;
}

/// Store interface for per-role resource state.
///
/// The engine never passes duplicates, nor resources already in the
/// requested state.
#[async_trait]
pub trait GrantStore {
    /// Records an explicit allow of `resources` for `role`.
    async fn add_resource(
        &self,
        role: RoleId,
        resources: Vec<ResourceId>,
    ) -> std::result::Result<(), StoreError>;

    /// Records an explicit deny of `resources` for `role`.
    async fn deny_resource(
        &self,
        role: RoleId,
        resources: Vec<ResourceId>,
    ) -> std::result::Result<(), StoreError>;

    /// Clears any explicit state of `resources` for `role`.
    async fn del_resource(
        &self,
        role: RoleId,
        resources: Vec<ResourceId>,
    ) -> std::result::Result<(), StoreError>;
}

/// Store interface for the resource registry.
#[async_trait]
pub trait ResourceStore {
    /// Loads every registered resource at engine startup.
    async fn load_resources(&self) -> std::result::Result<Vec<ResourceId>, StoreError>;

    /// Registers a resource.
    async fn create_resource(&self, id: ResourceId) -> std::result::Result<(), StoreError>;

    /// Unregisters a resource and drops every role's state for it.
    async fn remove_resource(&self, id: ResourceId) -> std::result::Result<(), StoreError>;
}

/// Store interface for user-role relations.
#[async_trait]
pub trait RelationStore {
    /// Associates a user with roles it does not hold yet.
    async fn relate(&self, user: UserId, roles: Vec<RoleId>) -> std::result::Result<(), StoreError>;

    /// Removes associations between a user and roles.
    async fn unrelate(
        &self,
        user: UserId,
        roles: Vec<RoleId>,
    ) -> std::result::Result<(), StoreError>;

    /// Returns the roles associated with a user.
    async fn load_relate(&self, user: UserId) -> std::result::Result<Vec<RoleId>, StoreError>;

    /// Returns the users associated with a role.
    async fn load_users(&self, role: RoleId) -> std::result::Result<Vec<UserId>, StoreError>;
}

/// Composite store trait.
pub trait Store: RoleStore + GrantStore + ResourceStore + RelationStore + Send + Sync {}

impl<T> Store for T where T: RoleStore + GrantStore + ResourceStore + RelationStore + Send + Sync {}
