use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::permission::{Hook, Permission};
use crate::role::{Role, RoleRecord, Roler};
use crate::store::Store;
use crate::types::{ResourceId, RoleId, Subject, UserId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

const DEFAULT_MAX_INHERIT_DEPTH: usize = 16;

/// RBAC engine over a role hierarchy, backed by a write-through [`Store`].
///
/// Every mutation validates its preconditions, commits to the store, and
/// only then updates memory; a store failure leaves the engine unchanged.
/// Queries read memory only, loading user relations lazily.
///
/// Locks are always taken graph first, registry second.
pub struct Engine<S> {
    store: S,
    hook: Option<Arc<dyn Hook>>,
    max_inherit_depth: usize,
    graph: RwLock<Graph>,
    resources: RwLock<HashSet<ResourceId>>,
}

impl<S: fmt::Debug> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("hook", &self.hook.is_some())
            .field("max_inherit_depth", &self.max_inherit_depth)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder<S> {
    store: S,
    hook: Option<Arc<dyn Hook>>,
    max_inherit_depth: usize,
}

impl<S> EngineBuilder<S> {
    /// Creates a new builder with default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            hook: None,
            max_inherit_depth: DEFAULT_MAX_INHERIT_DEPTH,
        }
    }

    /// Sets the maximum number of ancestors a role may have.
    pub fn max_inherit_depth(mut self, depth: usize) -> Self {
        self.max_inherit_depth = depth;
        self
    }

    /// Sets a hook consulted for every role visited during resolution.
    pub fn hook(mut self, hook: impl Hook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }
}

impl<S: Store> EngineBuilder<S> {
    /// Loads resources and roles from the store and builds the engine.
    pub async fn build(self) -> Result<Engine<S>> {
        let resources = self
            .store
            .load_resources()
            .await
            .map_err(|err| Error::store("load_resources", err))?;
        let records = self
            .store
            .load_roles()
            .await
            .map_err(|err| Error::store("load_roles", err))?;
        let graph = Graph::from_records(records)?;
        info!(
            roles = graph.roles.len(),
            resources = resources.len(),
            "rbac engine loaded"
        );

        Ok(Engine {
            store: self.store,
            hook: self.hook,
            max_inherit_depth: self.max_inherit_depth,
            graph: RwLock::new(graph),
            resources: RwLock::new(resources.into_iter().collect()),
        })
    }
}

fn dedup<T: Clone + Eq + Hash>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

fn require_non_empty<T>(items: &[T], what: &str) -> Result<()> {
    if items.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}

impl<S: Store> Engine<S> {
    /// Registers a resource.
    pub async fn add_resource(&self, id: ResourceId) -> Result<()> {
        let mut resources = self.resources.write().await;
        if resources.contains(&id) {
            return Err(Error::ResourceAlreadyExists(id));
        }
        self.store
            .create_resource(id.clone())
            .await
            .map_err(|err| Error::store("create_resource", err))?;
        info!(resource = %id, "resource registered");
        resources.insert(id);
        Ok(())
    }

    /// Unregisters a resource and drops every role's state for it.
    ///
    /// Removing an unknown resource is a no-op.
    pub async fn remove_resource(&self, id: &ResourceId) -> Result<()> {
        let mut graph = self.graph.write().await;
        let mut resources = self.resources.write().await;
        if !resources.contains(id) {
            debug!(resource = %id, "remove ignored for unknown resource");
            return Ok(());
        }
        self.store
            .remove_resource(id.clone())
            .await
            .map_err(|err| Error::store("remove_resource", err))?;
        resources.remove(id);
        graph.strip_resource(id);
        info!(resource = %id, "resource removed");
        Ok(())
    }

    /// Returns whether a resource is registered.
    pub async fn has_resource(&self, id: &ResourceId) -> bool {
        self.resources.read().await.contains(id)
    }

    /// Returns every registered resource, sorted.
    pub async fn resources(&self) -> Vec<ResourceId> {
        let mut resources: Vec<ResourceId> =
            self.resources.read().await.iter().cloned().collect();
        resources.sort();
        resources
    }

    /// Creates a role with an engine-allocated id.
    ///
    /// `max_users` of zero means unlimited.
    pub async fn new_role(
        &self,
        max_users: usize,
        parent: Option<&RoleId>,
        excludes: &[RoleId],
    ) -> Result<RoleId> {
        let excludes = dedup(excludes);
        let mut graph = self.graph.write().await;
        if let Some(parent) = parent
            && !graph.contains(parent)
        {
            return Err(Error::ParentNotFound(parent.clone()));
        }
        if let Some(missing) = excludes.iter().find(|exclude| !graph.contains(exclude)) {
            return Err(Error::ExcludeNotFound(missing.clone()));
        }
        let (id, seq) = graph.next_role_id()?;
        if let Some(parent) = parent {
            self.check_depth(&graph, &id, parent, 0)?;
        }

        self.store
            .add_role(id.clone(), max_users, parent.cloned(), excludes.clone())
            .await
            .map_err(|err| Error::store("add_role", err))?;
        graph.commit_seq(seq);
        graph.roles.insert(
            id.clone(),
            Role::new(
                id.clone(),
                max_users,
                parent.cloned(),
                excludes.into_iter().collect(),
            ),
        );
        info!(role = %id, parent = ?parent, max_users, "role created");
        Ok(id)
    }

    /// Creates a named role, or re-parents it when it already exists.
    pub async fn set_role(&self, id: &RoleId, parent: Option<&RoleId>) -> Result<()> {
        let mut graph = self.graph.write().await;
        if graph.contains(id) {
            return self.reparent(&mut graph, id, parent).await;
        }
        if let Some(parent) = parent {
            if !graph.contains(parent) {
                return Err(Error::ParentNotFound(parent.clone()));
            }
            self.check_depth(&graph, id, parent, 0)?;
        }

        self.store
            .add_role(id.clone(), 0, parent.cloned(), Vec::new())
            .await
            .map_err(|err| Error::store("add_role", err))?;
        if let Some(seq) = id.sequence() {
            graph.commit_seq(seq);
        }
        graph.roles.insert(
            id.clone(),
            Role::new(id.clone(), 0, parent.cloned(), HashSet::new()),
        );
        info!(role = %id, parent = ?parent, "role created");
        Ok(())
    }

    /// Registers anything implementing [`Roler`] through [`Engine::set_role`].
    ///
    /// Fails with [`Error::InvalidArgument`] when more than one parent is
    /// reported.
    pub async fn register(&self, roler: &impl Roler) -> Result<()> {
        let id = roler.id();
        let parents = roler.parents();
        if parents.len() > 1 {
            return Err(Error::InvalidArgument(format!(
                "role {id} has {} parents; at most one is supported",
                parents.len()
            )));
        }
        self.set_role(&id, parents.first()).await
    }

    /// Changes the parent of an existing role.
    pub async fn set_parent(&self, id: &RoleId, parent: Option<&RoleId>) -> Result<()> {
        let mut graph = self.graph.write().await;
        graph.get(id)?;
        self.reparent(&mut graph, id, parent).await
    }

    async fn reparent(&self, graph: &mut Graph, id: &RoleId, parent: Option<&RoleId>) -> Result<()> {
        let role = graph.get(id)?;
        if role.parent.as_ref() == parent {
            debug!(role = %id, "parent unchanged");
            return Ok(());
        }
        if let Some(parent) = parent {
            let parent_role = graph
                .roles
                .get(parent)
                .ok_or_else(|| Error::ParentNotFound(parent.clone()))?;
            if parent == id || graph.ancestors(parent)?.contains(id) {
                return Err(Error::RoleCycleDetected { role: id.clone() });
            }
            self.check_depth(graph, id, parent, graph.subtree_height(id))?;
            if let Some(resource) = role.granted().find(|resource| !parent_role.grants(resource)) {
                return Err(Error::NotSubsetOfParent {
                    role: id.clone(),
                    parent: parent.clone(),
                    resource: resource.clone(),
                });
            }
        }

        self.store
            .set_parent(id.clone(), parent.cloned())
            .await
            .map_err(|err| Error::store("set_parent", err))?;
        graph.get_mut(id)?.parent = parent.cloned();
        info!(role = %id, parent = ?parent, "role parent changed");
        Ok(())
    }

    /// Deletes a role and drops it from every user.
    ///
    /// Deleting an unknown role is a no-op; a role with children cannot be
    /// deleted. Roles excluding the deleted one get their exclude set
    /// rewritten in the store first.
    pub async fn del_role(&self, id: &RoleId) -> Result<()> {
        let mut graph = self.graph.write().await;
        if !graph.contains(id) {
            debug!(role = %id, "delete ignored for unknown role");
            return Ok(());
        }
        if let Some(child) = graph.children(id).next() {
            return Err(Error::HasDependents {
                role: id.clone(),
                child: child.id.clone(),
            });
        }

        for holder in graph.exclude_holders(id) {
            let remaining: HashSet<RoleId> = graph
                .get(&holder)?
                .excludes
                .iter()
                .filter(|exclude| *exclude != id)
                .cloned()
                .collect();
            let mut sorted: Vec<RoleId> = remaining.iter().cloned().collect();
            sorted.sort();
            self.store
                .set_exclude(holder.clone(), sorted)
                .await
                .map_err(|err| Error::store("set_exclude", err))?;
            graph.get_mut(&holder)?.excludes = remaining;
            debug!(role = %holder, deleted = %id, "exclude dropped for deleted role");
        }

        self.store
            .del_role(id.clone())
            .await
            .map_err(|err| Error::store("del_role", err))?;
        graph.remove_role(id);
        info!(role = %id, "role deleted");
        Ok(())
    }

    /// Sets the user cap of a role; `0` means unlimited.
    pub async fn set_count(&self, id: &RoleId, max_users: usize) -> Result<()> {
        let mut graph = self.graph.write().await;
        let current = graph.get(id)?.max_users;
        if current == max_users {
            return Ok(());
        }
        let lowering = max_users > 0 && (current == 0 || max_users < current);
        if lowering {
            self.load_users(&mut graph, id).await?;
            let holders = graph.get(id)?.users.as_ref().map_or(0, HashSet::len);
            if holders > max_users {
                return Err(Error::TooManyUsers {
                    role: id.clone(),
                    max_users,
                });
            }
        }

        self.store
            .set_count(id.clone(), max_users)
            .await
            .map_err(|err| Error::store("set_count", err))?;
        graph.get_mut(id)?.max_users = max_users;
        info!(role = %id, max_users, "role user cap changed");
        Ok(())
    }

    /// Replaces the set of roles mutually excluded with `id`.
    ///
    /// Fails when a user already holds `id` together with one of `excludes`.
    pub async fn set_exclude(&self, id: &RoleId, excludes: &[RoleId]) -> Result<()> {
        let excludes = dedup(excludes);
        let mut graph = self.graph.write().await;
        graph.get(id)?;
        if excludes.contains(id) {
            return Err(Error::InvalidArgument(format!(
                "role {id} cannot exclude itself"
            )));
        }
        if let Some(missing) = excludes.iter().find(|exclude| !graph.contains(exclude)) {
            return Err(Error::ExcludeNotFound(missing.clone()));
        }

        self.load_users(&mut graph, id).await?;
        for exclude in &excludes {
            self.load_users(&mut graph, exclude).await?;
            let holders = graph.get(id)?.users.as_ref();
            let others = graph.get(exclude)?.users.as_ref();
            if let (Some(holders), Some(others)) = (holders, others)
                && let Some(user) = holders.intersection(others).next()
            {
                return Err(Error::ConflictingAssociation {
                    user: user.clone(),
                    role: id.clone(),
                    excluded: exclude.clone(),
                });
            }
        }

        self.store
            .set_exclude(id.clone(), excludes.clone())
            .await
            .map_err(|err| Error::store("set_exclude", err))?;
        graph.get_mut(id)?.excludes = excludes.into_iter().collect();
        info!(role = %id, "role excludes changed");
        Ok(())
    }

    /// Explicitly allows `resources` for a role.
    ///
    /// Unknown roles are ignored. Every resource must be registered and, when
    /// the role has a parent, already granted to the parent.
    pub async fn allow(&self, id: &RoleId, resources: &[ResourceId]) -> Result<()> {
        let resources = dedup(resources);
        require_non_empty(&resources, "resources")?;
        let mut graph = self.graph.write().await;
        let Some(role) = graph.roles.get(id) else {
            debug!(role = %id, "allow ignored for unknown role");
            return Ok(());
        };
        self.require_registered(&resources).await?;
        let delta: Vec<ResourceId> = resources
            .into_iter()
            .filter(|resource| !role.grants(resource))
            .collect();
        if delta.is_empty() {
            return Ok(());
        }
        if let Some(parent) = &role.parent {
            let parent_role = graph.get(parent)?;
            if let Some(resource) = delta.iter().find(|resource| !parent_role.grants(resource)) {
                return Err(Error::NotSubsetOfParent {
                    role: id.clone(),
                    parent: parent.clone(),
                    resource: resource.clone(),
                });
            }
        }

        self.store
            .add_resource(id.clone(), delta.clone())
            .await
            .map_err(|err| Error::store("add_resource", err))?;
        let count = delta.len();
        let role = graph.get_mut(id)?;
        role.permissions
            .extend(delta.into_iter().map(|resource| (resource, Permission::Allow)));
        info!(role = %id, count, "resources allowed");
        Ok(())
    }

    /// Explicitly denies `resources` for a role, overriding its ancestors.
    ///
    /// Unknown roles are ignored. Fails while a descendant is still granted
    /// one of the resources.
    pub async fn deny(&self, id: &RoleId, resources: &[ResourceId]) -> Result<()> {
        let resources = dedup(resources);
        require_non_empty(&resources, "resources")?;
        let mut graph = self.graph.write().await;
        let Some(role) = graph.roles.get(id) else {
            debug!(role = %id, "deny ignored for unknown role");
            return Ok(());
        };
        self.require_registered(&resources).await?;
        let delta: Vec<ResourceId> = resources
            .into_iter()
            .filter(|resource| role.permissions.get(resource) != Some(&Permission::Deny))
            .collect();
        if delta.is_empty() {
            return Ok(());
        }
        check_dependents(&graph, id, &delta)?;

        self.store
            .deny_resource(id.clone(), delta.clone())
            .await
            .map_err(|err| Error::store("deny_resource", err))?;
        let count = delta.len();
        let role = graph.get_mut(id)?;
        role.permissions
            .extend(delta.into_iter().map(|resource| (resource, Permission::Deny)));
        info!(role = %id, count, "resources denied");
        Ok(())
    }

    /// Clears explicit state of `resources`, deferring to the parent again.
    ///
    /// Unknown roles are ignored. Fails while a descendant is still granted
    /// one of the resources.
    pub async fn revoke(&self, id: &RoleId, resources: &[ResourceId]) -> Result<()> {
        let resources = dedup(resources);
        require_non_empty(&resources, "resources")?;
        let mut graph = self.graph.write().await;
        let Some(role) = graph.roles.get(id) else {
            debug!(role = %id, "revoke ignored for unknown role");
            return Ok(());
        };
        let delta: Vec<ResourceId> = resources
            .into_iter()
            .filter(|resource| role.permissions.contains_key(resource))
            .collect();
        self.clear_permissions(&mut graph, id, delta).await
    }

    /// Clears every explicit state of a role.
    pub async fn revoke_role(&self, id: &RoleId) -> Result<()> {
        let mut graph = self.graph.write().await;
        let Some(role) = graph.roles.get(id) else {
            debug!(role = %id, "revoke ignored for unknown role");
            return Ok(());
        };
        let mut delta: Vec<ResourceId> = role.permissions.keys().cloned().collect();
        delta.sort();
        self.clear_permissions(&mut graph, id, delta).await
    }

    async fn clear_permissions(
        &self,
        graph: &mut Graph,
        id: &RoleId,
        delta: Vec<ResourceId>,
    ) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }
        check_dependents(graph, id, &delta)?;

        self.store
            .del_resource(id.clone(), delta.clone())
            .await
            .map_err(|err| Error::store("del_resource", err))?;
        let role = graph.get_mut(id)?;
        for resource in &delta {
            role.permissions.remove(resource);
        }
        info!(role = %id, count = delta.len(), "resources revoked");
        Ok(())
    }

    /// Associates a user with roles.
    ///
    /// Roles already held are skipped. Fails when a new role is excluded by a
    /// held one (either direction) or its user cap is reached.
    pub async fn related(&self, user: &UserId, roles: &[RoleId]) -> Result<()> {
        let roles = dedup(roles);
        require_non_empty(&roles, "roles")?;
        let mut graph = self.graph.write().await;
        if let Some(missing) = roles.iter().find(|role| !graph.contains(role)) {
            return Err(Error::RoleNotFound(missing.clone()));
        }
        self.load_relations(&mut graph, user).await?;
        let held = graph.relations.get(user).cloned().unwrap_or_default();
        let delta: Vec<RoleId> = roles
            .into_iter()
            .filter(|role| !held.contains(role))
            .collect();
        if delta.is_empty() {
            return Ok(());
        }

        for (index, role) in delta.iter().enumerate() {
            let mut existing = held.iter().chain(&delta[..index]);
            if let Some(excluded) = existing.find(|other| graph.excluded(role, other)) {
                return Err(Error::ConflictingAssociation {
                    user: user.clone(),
                    role: role.clone(),
                    excluded: excluded.clone(),
                });
            }
        }
        for role in &delta {
            let max_users = graph.get(role)?.max_users;
            if max_users == 0 {
                continue;
            }
            self.load_users(&mut graph, role).await?;
            let holders = graph.get(role)?.users.as_ref().map_or(0, HashSet::len);
            if holders >= max_users {
                return Err(Error::TooManyUsers {
                    role: role.clone(),
                    max_users,
                });
            }
        }

        self.store
            .relate(user.clone(), delta.clone())
            .await
            .map_err(|err| Error::store("relate", err))?;
        graph
            .relations
            .entry(user.clone())
            .or_default()
            .extend(delta.iter().cloned());
        for role in &delta {
            if let Some(users) = graph.roles.get_mut(role).and_then(|node| node.users.as_mut()) {
                users.insert(user.clone());
            }
        }
        info!(user = %user, count = delta.len(), "user related to roles");
        Ok(())
    }

    /// Removes associations between a user and roles.
    pub async fn unrelated(&self, user: &UserId, roles: &[RoleId]) -> Result<()> {
        let roles = dedup(roles);
        require_non_empty(&roles, "roles")?;
        let mut graph = self.graph.write().await;
        if let Some(missing) = roles.iter().find(|role| !graph.contains(role)) {
            return Err(Error::RoleNotFound(missing.clone()));
        }
        self.load_relations(&mut graph, user).await?;
        let delta: Vec<RoleId> = match graph.relations.get(user) {
            Some(held) => roles.into_iter().filter(|role| held.contains(role)).collect(),
            None => Vec::new(),
        };
        if delta.is_empty() {
            return Ok(());
        }

        self.store
            .unrelate(user.clone(), delta.clone())
            .await
            .map_err(|err| Error::store("unrelate", err))?;
        if let Some(held) = graph.relations.get_mut(user) {
            for role in &delta {
                held.remove(role);
            }
        }
        for role in &delta {
            if let Some(users) = graph.roles.get_mut(role).and_then(|node| node.users.as_mut()) {
                users.remove(user);
            }
        }
        info!(user = %user, count = delta.len(), "user unrelated from roles");
        Ok(())
    }

    /// Returns the roles currently associated with a user, sorted.
    pub async fn user_roles(&self, user: &UserId) -> Result<Vec<RoleId>> {
        self.ensure_relations(user).await?;
        let graph = self.graph.read().await;
        let mut roles: Vec<RoleId> = graph
            .relations
            .get(user)
            .map(|held| held.iter().cloned().collect())
            .unwrap_or_default();
        roles.sort();
        Ok(roles)
    }

    /// Returns whether `subject` may access `resource`.
    ///
    /// Unknown roles, users and resources resolve to `false`; only a store
    /// failure while loading a user's roles is reported as an error.
    pub async fn is_allow(
        &self,
        subject: impl Into<Subject>,
        resource: &ResourceId,
    ) -> Result<bool> {
        let hook = self.hook.as_deref();
        match subject.into() {
            Subject::Role(role) => {
                let graph = self.graph.read().await;
                Ok(graph.resolve(&role, resource, hook))
            }
            Subject::User(user) => {
                self.ensure_relations(&user).await?;
                let graph = self.graph.read().await;
                Ok(graph.resolve_user(&user, resource, hook).unwrap_or(false))
            }
        }
    }

    /// Returns the explicit permission state of a role; empty when unknown.
    pub async fn role_resources(&self, id: &RoleId) -> HashMap<ResourceId, Permission> {
        let graph = self.graph.read().await;
        graph
            .roles
            .get(id)
            .map(|role| role.permissions.clone())
            .unwrap_or_default()
    }

    /// Returns a snapshot of a role.
    pub async fn role(&self, id: &RoleId) -> Option<RoleRecord> {
        let graph = self.graph.read().await;
        graph.roles.get(id).map(Role::to_record)
    }

    /// Returns every role id, sorted.
    pub async fn roles(&self) -> Vec<RoleId> {
        let graph = self.graph.read().await;
        let mut roles: Vec<RoleId> = graph.roles.keys().cloned().collect();
        roles.sort();
        roles
    }

    fn check_depth(
        &self,
        graph: &Graph,
        role: &RoleId,
        parent: &RoleId,
        below: usize,
    ) -> Result<()> {
        let depth = graph.ancestors(parent)?.len() + 1 + below;
        if depth > self.max_inherit_depth {
            return Err(Error::RoleDepthExceeded {
                role: role.clone(),
                max_depth: self.max_inherit_depth,
            });
        }
        Ok(())
    }

    async fn require_registered(&self, resources: &[ResourceId]) -> Result<()> {
        let registry = self.resources.read().await;
        match resources.iter().find(|resource| !registry.contains(*resource)) {
            Some(missing) => Err(Error::ResourceNotFound(missing.clone())),
            None => Ok(()),
        }
    }

    async fn load_users(&self, graph: &mut Graph, id: &RoleId) -> Result<()> {
        if graph.get(id)?.users.is_some() {
            return Ok(());
        }
        let users = self
            .store
            .load_users(id.clone())
            .await
            .map_err(|err| Error::store("load_users", err))?;
        debug!(role = %id, users = users.len(), "role users loaded");
        graph.get_mut(id)?.users = Some(users.into_iter().collect());
        Ok(())
    }

    async fn load_relations(&self, graph: &mut Graph, user: &UserId) -> Result<()> {
        if graph.relations.contains_key(user) {
            return Ok(());
        }
        let loaded = self
            .store
            .load_relate(user.clone())
            .await
            .map_err(|err| Error::store("load_relate", err))?;
        let held: HashSet<RoleId> = loaded
            .into_iter()
            .filter(|role| graph.contains(role))
            .collect();
        debug!(user = %user, roles = held.len(), "user relations loaded");
        graph.relations.insert(user.clone(), held);
        Ok(())
    }

    /// Loads a user's relations without holding the graph lock during the
    /// store call.
    ///
    /// Users holding no role are not cached, so arbitrary unknown users
    /// queried through [`Engine::is_allow`] do not accumulate in memory.
    async fn ensure_relations(&self, user: &UserId) -> Result<()> {
        let deletions = {
            let graph = self.graph.read().await;
            if graph.relations.contains_key(user) {
                return Ok(());
            }
            graph.deletions
        };
        let mut loaded = self
            .store
            .load_relate(user.clone())
            .await
            .map_err(|err| Error::store("load_relate", err))?;

        let mut graph = self.graph.write().await;
        // A mutation may have loaded and changed the entry meanwhile.
        if graph.relations.contains_key(user) {
            return Ok(());
        }
        // A role deleted meanwhile may have been re-created under the same
        // id, so the unlocked read can no longer be trusted.
        if graph.deletions != deletions {
            loaded = self
                .store
                .load_relate(user.clone())
                .await
                .map_err(|err| Error::store("load_relate", err))?;
        }
        let held: HashSet<RoleId> = loaded
            .into_iter()
            .filter(|role| graph.contains(role))
            .collect();
        debug!(user = %user, roles = held.len(), "user relations loaded");
        if !held.is_empty() {
            graph.relations.insert(user.clone(), held);
        }
        Ok(())
    }
}

fn check_dependents(graph: &Graph, id: &RoleId, resources: &[ResourceId]) -> Result<()> {
    for resource in resources {
        if let Some(dependent) = graph.dependent_holding(id, resource) {
            return Err(Error::DependentStillAllowed {
                role: id.clone(),
                dependent,
                resource: resource.clone(),
            });
        }
    }
    Ok(())
}
