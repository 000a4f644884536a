//! Role hierarchy RBAC library.
//!
//! This crate provides strong-typed identifiers, a single-parent role tree with
//! strict inheritance, user-role relations with mutual exclusion and user caps,
//! and a pluggable async store that every mutation writes through before the
//! in-memory view changes. The default behavior is deny-by-default.
//!
//! A child role's granted resources are always a subset of its parent's. An
//! explicit deny on a role overrides whatever it inherits; clearing the state
//! with [`Engine::revoke`] defers to the parent again.
//!
//! # Examples
//!
//! Basic authorization flow using the in-memory store (enable `memory-store`):
//! ```no_run
//! # #[cfg(feature = "memory-store")]
//! # async fn demo() -> rs_rbac::Result<()> {
//! use rs_rbac::{EngineBuilder, MemoryStore, ResourceId, RoleId, UserId};
//! let engine = EngineBuilder::new(MemoryStore::new()).build().await?;
//! let posts = ResourceId::try_from("posts:read")?;
//! engine.add_resource(posts.clone()).await?;
//!
//! let staff = RoleId::try_from("staff")?;
//! engine.set_role(&staff, None).await?;
//! engine.allow(&staff, &[posts.clone()]).await?;
//!
//! let alice = UserId::try_from("alice")?;
//! engine.related(&alice, &[staff]).await?;
//! assert!(engine.is_allow(alice, &posts).await?);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod engine;
mod error;
mod graph;
mod permission;
mod role;
mod store;
mod types;

#[cfg(feature = "memory-store")]
mod memory_store;

#[cfg(feature = "axum")]
pub mod axum;

pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::{Error, Result, StoreError};
pub use crate::permission::{Hook, HookDecision, Permission};
pub use crate::role::{RoleRecord, Roler};
pub use crate::store::{GrantStore, RelationStore, ResourceStore, RoleStore, Store};
pub use crate::types::{ResourceId, RoleId, Subject, UserId};

#[cfg(feature = "memory-store")]
pub use crate::memory_store::MemoryStore;
