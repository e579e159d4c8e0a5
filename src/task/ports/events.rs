//! Event bus port.
//!
//! Publishing is fire-and-forget: handler failures are logged by the bus and
//! never reach the publisher, whose transaction has already committed.

use crate::task::domain::{DomainEvent, EventKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Reaction to published events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handler name used in logs.
    fn name(&self) -> &'static str;

    /// Reacts to one event.
    ///
    /// # Errors
    ///
    /// Returns [`EventHandlerError`] when the reaction fails; the bus logs it.
    async fn handle(&self, event: &DomainEvent) -> Result<(), EventHandlerError>;
}

/// Publish/subscribe channel between engine components.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Delivers `event` to every handler subscribed to its kind.
    async fn publish(&self, event: DomainEvent);

    /// Registers `handler` for events of `kind`.
    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>);
}

/// Failure raised by an event handler.
#[derive(Debug, Error)]
#[error("{handler} failed: {source}")]
pub struct EventHandlerError {
    /// Failing handler.
    pub handler: &'static str,
    /// Underlying failure.
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl EventHandlerError {
    /// Wraps a failure raised by `handler`.
    #[must_use]
    pub fn new(handler: &'static str, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            handler,
            source: Box::new(err),
        }
    }
}
