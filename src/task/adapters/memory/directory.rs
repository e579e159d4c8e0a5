//! In-memory staff directory.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{PropertyId, TenantId, UserId},
    ports::{DirectoryError, DirectoryResult, StaffDirectory},
};

/// Thread-safe in-memory staff directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStaffDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    staff: HashSet<(TenantId, UserId)>,
    scopes: HashSet<(TenantId, UserId, PropertyId)>,
}

impl InMemoryStaffDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user who may receive assignments.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the lock is poisoned.
    pub fn add_staff(&self, tenant_id: TenantId, user_id: UserId) -> DirectoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.staff.insert((tenant_id, user_id));
        Ok(())
    }

    /// Grants an actor administrative scope over a property.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the lock is poisoned.
    pub fn grant_property_scope(
        &self,
        tenant_id: TenantId,
        actor_id: UserId,
        property_id: PropertyId,
    ) -> DirectoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.scopes.insert((tenant_id, actor_id, property_id));
        Ok(())
    }
}

fn poisoned(err: impl std::fmt::Display) -> DirectoryError {
    DirectoryError::unavailable(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl StaffDirectory for InMemoryStaffDirectory {
    async fn is_assignable(&self, tenant_id: TenantId, user_id: UserId) -> DirectoryResult<bool> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.staff.contains(&(tenant_id, user_id)))
    }

    async fn manages_property(
        &self,
        tenant_id: TenantId,
        actor_id: UserId,
        property_id: PropertyId,
    ) -> DirectoryResult<bool> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.scopes.contains(&(tenant_id, actor_id, property_id)))
    }
}
