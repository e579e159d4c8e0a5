//! Tokio-backed asynchronous event bus.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{HandlerRegistry, dispatch};
use crate::task::{
    domain::{DomainEvent, EventKind},
    ports::{EventBus, EventHandler},
};

/// Event bus that queues events on a bounded channel and runs each handler
/// invocation as an independent Tokio task.
///
/// `publish` returns once the event is queued; handlers never block the
/// publisher.
#[derive(Clone)]
pub struct TokioEventBus {
    sender: mpsc::Sender<DomainEvent>,
    registry: HandlerRegistry,
}

impl TokioEventBus {
    /// Starts the dispatcher on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let registry = HandlerRegistry::default();
        tokio::spawn(run_dispatcher(receiver, registry.clone()));
        Self { sender, registry }
    }
}

async fn run_dispatcher(mut receiver: mpsc::Receiver<DomainEvent>, registry: HandlerRegistry) {
    while let Some(event) = receiver.recv().await {
        let shared = Arc::new(event);
        for handler in registry.handlers_for(shared.kind()) {
            let delivered = Arc::clone(&shared);
            tokio::spawn(async move {
                dispatch(handler.as_ref(), &delivered).await;
            });
        }
    }
    tracing::debug!("event dispatcher stopped");
}

#[async_trait]
impl EventBus for TokioEventBus {
    async fn publish(&self, event: DomainEvent) {
        let name = event.name();
        if self.sender.send(event).await.is_err() {
            tracing::warn!(event = name, "event dispatcher stopped; event dropped");
        }
    }

    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.registry.add(kind, handler);
    }
}
