use crate::error::StoreError;
use crate::permission::Permission;
use crate::role::RoleRecord;
use crate::store::{GrantStore, RelationStore, ResourceStore, RoleStore};
use crate::types::{ResourceId, RoleId, UserId};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory store implementation for tests and demos.
///
/// Clones share the same data, so an engine rebuilt over a clone sees
/// everything a previous engine persisted.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    roles: BTreeMap<RoleId, StoredRole>,
    resources: BTreeSet<ResourceId>,
    relations: BTreeMap<UserId, BTreeSet<RoleId>>,
}

#[derive(Debug, Default)]
struct StoredRole {
    max_users: usize,
    parent: Option<RoleId>,
    excludes: Vec<RoleId>,
    permissions: BTreeMap<ResourceId, Permission>,
}

impl StoredRole {
    fn to_record(&self, id: &RoleId) -> RoleRecord {
        let mut record = RoleRecord::new(id.clone());
        record.max_users = self.max_users;
        record.parent = self.parent.clone();
        record.excludes = self.excludes.clone();
        for (resource, permission) in &self.permissions {
            match permission {
                Permission::Allow => record.allowed.push(resource.clone()),
                Permission::Deny => record.denied.push(resource.clone()),
            }
        }
        record
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::result::Result<RwLockReadGuard<'_, State>, StoreError> {
        self.inner.read().map_err(|_| "memory store lock poisoned".into())
    }

    fn write(&self) -> std::result::Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.inner.write().map_err(|_| "memory store lock poisoned".into())
    }

    fn set_permissions(
        &self,
        role: RoleId,
        resources: Vec<ResourceId>,
        permission: Option<Permission>,
    ) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .roles
            .get_mut(&role)
            .ok_or_else(|| format!("unknown role {role}"))?;
        for resource in resources {
            match permission {
                Some(permission) => {
                    stored.permissions.insert(resource, permission);
                }
                None => {
                    stored.permissions.remove(&resource);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn load_roles(&self) -> std::result::Result<Vec<RoleRecord>, StoreError> {
        let state = self.read()?;
        Ok(state
            .roles
            .iter()
            .map(|(id, stored)| stored.to_record(id))
            .collect())
    }

    async fn add_role(
        &self,
        id: RoleId,
        max_users: usize,
        parent: Option<RoleId>,
        excludes: Vec<RoleId>,
    ) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        if state.roles.contains_key(&id) {
            return Err(format!("role {id} already stored").into());
        }
        state.roles.insert(
            id,
            StoredRole {
                max_users,
                parent,
                excludes,
                permissions: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn del_role(&self, id: RoleId) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        state.roles.remove(&id);
        for held in state.relations.values_mut() {
            held.remove(&id);
        }
        Ok(())
    }

    async fn set_count(&self, id: RoleId, max_users: usize) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| format!("unknown role {id}"))?;
        stored.max_users = max_users;
        Ok(())
    }

    async fn set_exclude(
        &self,
        id: RoleId,
        excludes: Vec<RoleId>,
    ) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| format!("unknown role {id}"))?;
        stored.excludes = excludes;
        Ok(())
    }

    async fn set_parent(
        &self,
        id: RoleId,
        parent: Option<RoleId>,
    ) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| format!("unknown role {id}"))?;
        stored.parent = parent;
        Ok(())
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn add_resource(
        &self,
        role: RoleId,
        resources: Vec<ResourceId>,
    ) -> std::result::Result<(), StoreError> {
        self.set_permissions(role, resources, Some(Permission::Allow))
    }

    async fn deny_resource(
        &self,
        role: RoleId,
        resources: Vec<ResourceId>,
    ) -> std::result::Result<(), StoreError> {
        self.set_permissions(role, resources, Some(Permission::Deny))
    }

    async fn del_resource(
        &self,
        role: RoleId,
        resources: Vec<ResourceId>,
    ) -> std::result::Result<(), StoreError> {
        self.set_permissions(role, resources, None)
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn load_resources(&self) -> std::result::Result<Vec<ResourceId>, StoreError> {
        let state = self.read()?;
        Ok(state.resources.iter().cloned().collect())
    }

    async fn create_resource(&self, id: ResourceId) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        state.resources.insert(id);
        Ok(())
    }

    async fn remove_resource(&self, id: ResourceId) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        state.resources.remove(&id);
        for stored in state.roles.values_mut() {
            stored.permissions.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl RelationStore for MemoryStore {
    async fn relate(&self, user: UserId, roles: Vec<RoleId>) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        state.relations.entry(user).or_default().extend(roles);
        Ok(())
    }

    async fn unrelate(
        &self,
        user: UserId,
        roles: Vec<RoleId>,
    ) -> std::result::Result<(), StoreError> {
        let mut state = self.write()?;
        if let Some(held) = state.relations.get_mut(&user) {
            for role in &roles {
                held.remove(role);
            }
        }
        Ok(())
    }

    async fn load_relate(&self, user: UserId) -> std::result::Result<Vec<RoleId>, StoreError> {
        let state = self.read()?;
        Ok(state
            .relations
            .get(&user)
            .map(|held| held.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn load_users(&self, role: RoleId) -> std::result::Result<Vec<UserId>, StoreError> {
        let state = self.read()?;
        Ok(state
            .relations
            .iter()
            .filter(|(_, held)| held.contains(&role))
            .map(|(user, _)| user.clone())
            .collect())
    }
}
