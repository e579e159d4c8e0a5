//! Event bus adapters.
//!
//! [`SyncEventBus`] delivers events inline and in subscription order, which
//! keeps tests deterministic. [`TokioEventBus`] hands events to a dispatcher
//! task and runs every handler invocation as its own Tokio task.

mod sync;
mod tokio;

pub use self::sync::SyncEventBus;
pub use self::tokio::TokioEventBus;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{DomainEvent, EventKind},
    ports::EventHandler,
};

/// Subscriptions shared between a bus and its dispatcher.
#[derive(Clone, Default)]
struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>>,
}

impl HandlerRegistry {
    fn add(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        match self.handlers.write() {
            Ok(mut handlers) => handlers.entry(kind).or_default().push(handler),
            Err(err) => tracing::error!(
                event = kind.name(),
                handler = handler.name(),
                error = %err,
                "handler registry poisoned; subscription dropped"
            ),
        }
    }

    fn handlers_for(&self, kind: EventKind) -> Vec<Arc<dyn EventHandler>> {
        match self.handlers.read() {
            Ok(handlers) => handlers.get(&kind).cloned().unwrap_or_default(),
            Err(err) => {
                tracing::error!(event = kind.name(), error = %err, "handler registry poisoned");
                Vec::new()
            }
        }
    }
}

/// Runs one handler, logging and swallowing its failure.
async fn dispatch(handler: &dyn EventHandler, event: &DomainEvent) {
    tracing::debug!(event = event.name(), handler = handler.name(), "dispatching event");
    if let Err(err) = handler.handle(event).await {
        tracing::error!(
            event = event.name(),
            handler = handler.name(),
            error = %err,
            source = ?err.source,
            "event handler failed"
        );
    }
}
