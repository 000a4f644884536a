use crate::error::{Error, Result};
use crate::permission::{Hook, HookDecision, Permission};
use crate::role::{Role, RoleRecord};
use crate::types::{ResourceId, RoleId, UserId};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Role graph plus the user-role index.
///
/// Both live behind one lock in the engine because the exclusion and count
/// invariants read them together.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    pub(crate) roles: HashMap<RoleId, Role>,
    /// Cached relations; users appear here once loaded from the store.
    pub(crate) relations: HashMap<UserId, HashSet<RoleId>>,
    /// Bumped on every role deletion.
    pub(crate) deletions: u64,
    next_seq: u64,
}

impl Graph {
    /// Builds the graph from store records, validating references and
    /// rejecting cycles.
    pub(crate) fn from_records(records: Vec<RoleRecord>) -> Result<Self> {
        let mut graph = Self::default();
        for record in records {
            if let Some(seq) = record.id.sequence() {
                graph.next_seq = graph.next_seq.max(seq.saturating_add(1));
            }
            graph.roles.insert(record.id.clone(), Role::from_record(record));
        }

        for role in graph.roles.values() {
            if let Some(parent) = &role.parent
                && !graph.roles.contains_key(parent)
            {
                return Err(Error::ParentNotFound(parent.clone()));
            }
            if let Some(missing) = role
                .excludes
                .iter()
                .find(|exclude| !graph.roles.contains_key(*exclude))
            {
                return Err(Error::ExcludeNotFound(missing.clone()));
            }
        }
        for id in graph.roles.keys() {
            graph.ancestors(id)?;
        }

        Ok(graph)
    }

    pub(crate) fn contains(&self, id: &RoleId) -> bool {
        self.roles.contains_key(id)
    }

    pub(crate) fn get(&self, id: &RoleId) -> Result<&Role> {
        self.roles
            .get(id)
            .ok_or_else(|| Error::RoleNotFound(id.clone()))
    }

    pub(crate) fn get_mut(&mut self, id: &RoleId) -> Result<&mut Role> {
        self.roles
            .get_mut(id)
            .ok_or_else(|| Error::RoleNotFound(id.clone()))
    }

    /// Next free engine-allocated id and its sequence number.
    pub(crate) fn next_role_id(&self) -> Result<(RoleId, u64)> {
        let mut seq = self.next_seq;
        loop {
            let id = RoleId::from_string(seq.to_string());
            if !self.roles.contains_key(&id) {
                return Ok((id, seq));
            }
            seq = seq.checked_add(1).ok_or_else(|| {
                Error::InvalidArgument("role id sequence exhausted".to_string())
            })?;
        }
    }

    pub(crate) fn commit_seq(&mut self, seq: u64) {
        self.next_seq = self.next_seq.max(seq.saturating_add(1));
    }

    /// Parent chain of `id`, nearest first, excluding `id` itself.
    pub(crate) fn ancestors(&self, id: &RoleId) -> Result<Vec<RoleId>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.roles.get(id).and_then(|role| role.parent.as_ref());
        while let Some(parent) = current {
            if !seen.insert(parent) {
                return Err(Error::RoleCycleDetected {
                    role: parent.clone(),
                });
            }
            chain.push(parent.clone());
            current = self.roles.get(parent).and_then(|role| role.parent.as_ref());
        }
        Ok(chain)
    }

    pub(crate) fn children<'a>(&'a self, id: &RoleId) -> impl Iterator<Item = &'a Role> {
        self.roles
            .values()
            .filter(move |role| role.parent.as_ref() == Some(id))
    }

    /// Every role below `id`, in breadth-first order.
    pub(crate) fn descendants(&self, id: &RoleId) -> Vec<&Role> {
        let mut output = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue: Vec<&RoleId> = vec![id];
        let mut head = 0;
        while head < queue.len() {
            let current = queue[head];
            head += 1;
            for child in self.children(current) {
                if seen.insert(&child.id) {
                    queue.push(&child.id);
                    output.push(child);
                }
            }
        }
        output
    }

    /// Height of the subtree rooted at `id`; a leaf has height zero.
    pub(crate) fn subtree_height(&self, id: &RoleId) -> usize {
        let mut height = 0;
        let mut stack = vec![(id, 0usize)];
        let mut seen = HashSet::from([id]);
        while let Some((current, depth)) = stack.pop() {
            height = height.max(depth);
            for child in self.children(current) {
                if seen.insert(&child.id) {
                    stack.push((&child.id, depth + 1));
                }
            }
        }
        height
    }

    /// First descendant of `id` still granted `resource`.
    pub(crate) fn dependent_holding(&self, id: &RoleId, resource: &ResourceId) -> Option<RoleId> {
        self.descendants(id)
            .into_iter()
            .find(|role| role.grants(resource))
            .map(|role| role.id.clone())
    }

    /// Whether `a` and `b` exclude each other, in either direction.
    pub(crate) fn excluded(&self, a: &RoleId, b: &RoleId) -> bool {
        let excludes = |from: &RoleId, to: &RoleId| {
            self.roles
                .get(from)
                .is_some_and(|role| role.excludes.contains(to))
        };
        excludes(a, b) || excludes(b, a)
    }

    /// Roles whose exclude set names `id`, sorted.
    pub(crate) fn exclude_holders(&self, id: &RoleId) -> Vec<RoleId> {
        let mut holders: Vec<RoleId> = self
            .roles
            .values()
            .filter(|role| role.excludes.contains(id))
            .map(|role| role.id.clone())
            .collect();
        holders.sort();
        holders
    }

    /// Resolves `resource` for `role` by walking its parent chain.
    ///
    /// The first role with explicit state decides; unknown roles and
    /// exhausted chains resolve to `false`.
    pub(crate) fn resolve(
        &self,
        role: &RoleId,
        resource: &ResourceId,
        hook: Option<&dyn Hook>,
    ) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(role);
        while let Some(id) = current {
            if !seen.insert(id) {
                warn!(role = %role, at = %id, "role cycle encountered while resolving");
                return false;
            }
            let Some(node) = self.roles.get(id) else {
                return false;
            };
            if let Some(hook) = hook {
                match hook.check(id, resource) {
                    HookDecision::Allow => return true,
                    HookDecision::Deny => return false,
                    HookDecision::Continue => {}
                }
            }
            match node.permissions.get(resource) {
                Some(Permission::Allow) => return true,
                Some(Permission::Deny) => return false,
                None => current = node.parent.as_ref(),
            }
        }
        false
    }

    /// Resolves `resource` for a cached user; `None` when not cached.
    pub(crate) fn resolve_user(
        &self,
        user: &UserId,
        resource: &ResourceId,
        hook: Option<&dyn Hook>,
    ) -> Option<bool> {
        let held = self.relations.get(user)?;
        Some(held.iter().any(|role| self.resolve(role, resource, hook)))
    }

    /// Removes a role and every reference to it.
    pub(crate) fn remove_role(&mut self, id: &RoleId) {
        self.roles.remove(id);
        self.deletions = self.deletions.wrapping_add(1);
        for role in self.roles.values_mut() {
            role.excludes.remove(id);
        }
        for held in self.relations.values_mut() {
            held.remove(id);
        }
    }

    /// Drops every role's explicit state for `resource`.
    pub(crate) fn strip_resource(&mut self, resource: &ResourceId) {
        for role in self.roles.values_mut() {
            role.permissions.remove(resource);
        }
    }
}
