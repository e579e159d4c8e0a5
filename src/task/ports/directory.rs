//! Staff directory port: who may be assigned work and who administers which
//! properties.

use crate::task::domain::{PropertyId, TenantId, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for directory lookups.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Lookups owned by the user-management subsystem.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// Returns `true` when the user may receive task assignments.
    async fn is_assignable(&self, tenant_id: TenantId, user_id: UserId) -> DirectoryResult<bool>;

    /// Returns `true` when the actor's administrative scope covers the
    /// property.
    async fn manages_property(
        &self,
        tenant_id: TenantId,
        actor_id: UserId,
        property_id: PropertyId,
    ) -> DirectoryResult<bool>;
}

/// Errors returned by directory implementations.
#[derive(Debug, Clone, Error)]
#[error("staff directory unavailable: {0}")]
pub struct DirectoryError(pub Arc<dyn std::error::Error + Send + Sync>);

impl DirectoryError {
    /// Wraps a lookup failure.
    #[must_use]
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }
}
