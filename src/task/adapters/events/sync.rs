//! Synchronous, order-deterministic event bus.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use super::{HandlerRegistry, dispatch};
use crate::task::{
    domain::{DomainEvent, EventKind},
    ports::{EventBus, EventHandler},
};

/// Event bus that awaits every handler before `publish` returns.
///
/// Events published by a handler are delivered depth-first before the
/// remaining handlers of the outer event run. Every published event is kept
/// in a log for inspection.
#[derive(Clone, Default)]
pub struct SyncEventBus {
    registry: HandlerRegistry,
    published: Arc<RwLock<Vec<DomainEvent>>>,
}

impl SyncEventBus {
    /// Creates a bus with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event published so far, in publication order.
    #[must_use]
    pub fn published(&self) -> Vec<DomainEvent> {
        self.published
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the published events of one kind.
    #[must_use]
    pub fn published_of(&self, kind: EventKind) -> Vec<DomainEvent> {
        self.published()
            .into_iter()
            .filter(|event| event.kind() == kind)
            .collect()
    }

    fn record(&self, event: &DomainEvent) {
        if let Ok(mut events) = self.published.write() {
            events.push(event.clone());
        }
    }
}

#[async_trait]
impl EventBus for SyncEventBus {
    async fn publish(&self, event: DomainEvent) {
        self.record(&event);
        let handlers = self.registry.handlers_for(event.kind());
        for handler in handlers {
            dispatch(handler.as_ref(), &event).await;
        }
    }

    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.registry.add(kind, handler);
    }
}
