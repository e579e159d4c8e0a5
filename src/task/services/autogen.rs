//! Auto-generation rule evaluator: turns a new reservation into tasks
//! according to the property's enabled automation rules.

use super::{ErrorKind, lifecycle::store_error_kind};
use crate::task::{
    domain::{
        AutoRule, DomainEvent, NewTask, PropertyId, ReservationCreated, Task, TaskCreated,
        TaskDomainError, TaskId, TemplateToken, TenantId, TriggerType, fit_title,
    },
    ports::{EventBus, TaskStore, TaskStoreError},
};
use minijinja::Environment;
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Service-level errors for automation rules.
#[derive(Debug, Error)]
pub enum AutoGenerationError {
    /// The property has no rule for the trigger.
    #[error("property {property_id} has no {trigger} rule")]
    RuleNotFound {
        /// Property searched.
        property_id: PropertyId,
        /// Missing trigger.
        trigger: TriggerType,
    },

    /// A title template does not parse.
    #[error("invalid title template for {trigger} rule: {reason}")]
    InvalidTemplate {
        /// Rule trigger.
        trigger: TriggerType,
        /// Template engine message.
        reason: String,
    },

    /// A title template failed while rendering.
    #[error("failed to render title for {trigger} rule: {reason}")]
    TemplateRender {
        /// Rule trigger.
        trigger: TriggerType,
        /// Template engine message.
        reason: String,
    },

    /// A generated task failed validation.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

impl AutoGenerationError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RuleNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTemplate { .. } | Self::Domain(_) => ErrorKind::InvalidInput,
            Self::TemplateRender { .. } => ErrorKind::Internal,
            Self::Store(err) => store_error_kind(err),
        }
    }
}

/// Result type for automation rule operations.
pub type AutoGenerationResult<T> = Result<T, AutoGenerationError>;

/// Generates tasks from automation rules and manages the rules.
#[derive(Clone)]
pub struct AutoGenerationEvaluator<S, B, C>
where
    S: TaskStore,
    B: EventBus,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    bus: Arc<B>,
    clock: Arc<C>,
}

impl<S, B, C> AutoGenerationEvaluator<S, B, C>
where
    S: TaskStore,
    B: EventBus,
    C: Clock + Send + Sync + 'static,
{
    /// Creates an evaluator.
    #[must_use]
    pub const fn new(store: Arc<S>, bus: Arc<B>, clock: Arc<C>) -> Self {
        Self { store, bus, clock }
    }

    /// Creates one pending task per enabled rule of the reservation's
    /// property.
    ///
    /// Each task starts at the rule's anchor plus its offset and is tagged
    /// with the rule. The reservation link is only set when the reservation
    /// is already persisted. No enabled rules means no tasks and no events.
    ///
    /// # Errors
    ///
    /// Returns [`AutoGenerationError::TemplateRender`] when a title cannot
    /// be rendered and [`AutoGenerationError::Store`] when storage fails; no
    /// task is created in either case.
    #[tracing::instrument(
        skip_all,
        fields(
            tenant_id = %reservation.tenant_id,
            property_id = %reservation.property_id,
            reservation_id = %reservation.reservation_id
        )
    )]
    pub async fn generate_tasks_for_reservation(
        &self,
        reservation: ReservationCreated,
    ) -> AutoGenerationResult<Vec<TaskId>> {
        let clock = Arc::clone(&self.clock);
        let generated = self
            .store
            .transaction(move |uow| -> AutoGenerationResult<Vec<Task>> {
                let rules: Vec<AutoRule> = uow
                    .auto_rules_for_property(reservation.tenant_id, reservation.property_id)?
                    .into_iter()
                    .filter(|rule| rule.enabled)
                    .collect();
                if rules.is_empty() {
                    return Ok(Vec::new());
                }

                let linked = uow
                    .reservation_exists(reservation.tenant_id, reservation.reservation_id)?;
                if !linked {
                    tracing::debug!("reservation not persisted yet; tasks left unlinked");
                }
                let context = TemplateToken::context(&reservation);

                let mut generated = Vec::with_capacity(rules.len());
                for rule in rules {
                    let mut params = NewTask::new(
                        reservation.tenant_id,
                        reservation.property_id,
                        render_title(&rule, &context)?,
                        rule.trigger.category(),
                    )
                    .scheduled_at(rule.scheduled_at(&reservation.stay))
                    .from_auto_rule(rule.id);
                    if linked {
                        params = params.for_reservation(reservation.reservation_id);
                    }
                    let task = Task::new(params, clock.as_ref())?;
                    uow.insert_task(&task)?;
                    generated.push(task);
                }
                Ok(generated)
            })
            .await?;

        tracing::info!(generated = generated.len(), "auto-generated tasks");
        for task in &generated {
            self.bus
                .publish(DomainEvent::TaskCreated(TaskCreated {
                    task_id: task.id(),
                    tenant_id: task.tenant_id(),
                    property_id: task.property_id(),
                }))
                .await;
        }
        Ok(generated.iter().map(Task::id).collect())
    }

    /// Stores a rule, replacing the property's rule for the same trigger.
    ///
    /// # Errors
    ///
    /// Returns [`AutoGenerationError::InvalidTemplate`] when the title
    /// template does not parse.
    pub async fn upsert_rule(&self, rule: AutoRule) -> AutoGenerationResult<AutoRule> {
        validate_template(&rule)?;
        let stored = rule.clone();
        self.store
            .transaction(move |uow| -> AutoGenerationResult<()> {
                uow.upsert_auto_rule(&stored)?;
                Ok(())
            })
            .await?;
        tracing::info!(
            property_id = %rule.property_id,
            trigger = rule.trigger.as_str(),
            enabled = rule.enabled,
            "auto-rule stored"
        );
        Ok(rule)
    }

    /// Enables or disables the property's rule for a trigger.
    ///
    /// # Errors
    ///
    /// Returns [`AutoGenerationError::RuleNotFound`] when the property has
    /// no rule for the trigger.
    pub async fn set_rule_enabled(
        &self,
        tenant_id: TenantId,
        property_id: PropertyId,
        trigger: TriggerType,
        enabled: bool,
    ) -> AutoGenerationResult<AutoRule> {
        self.store
            .transaction(move |uow| -> AutoGenerationResult<AutoRule> {
                let rule = uow
                    .auto_rules_for_property(tenant_id, property_id)?
                    .into_iter()
                    .find(|rule| rule.trigger == trigger)
                    .ok_or(AutoGenerationError::RuleNotFound {
                        property_id,
                        trigger,
                    })?
                    .with_enabled(enabled);
                uow.upsert_auto_rule(&rule)?;
                Ok(rule)
            })
            .await
    }

    /// Returns the property's rules ordered by trigger.
    ///
    /// # Errors
    ///
    /// Returns [`AutoGenerationError::Store`] when storage fails.
    pub async fn rules_for_property(
        &self,
        tenant_id: TenantId,
        property_id: PropertyId,
    ) -> AutoGenerationResult<Vec<AutoRule>> {
        self.store
            .transaction(move |uow| -> AutoGenerationResult<_> {
                Ok(uow.auto_rules_for_property(tenant_id, property_id)?)
            })
            .await
    }
}

fn validate_template(rule: &AutoRule) -> AutoGenerationResult<()> {
    let environment = Environment::new();
    environment
        .template_from_str(&rule.title_template)
        .map(|_| ())
        .map_err(|error| AutoGenerationError::InvalidTemplate {
            trigger: rule.trigger,
            reason: error.to_string(),
        })
}

fn render_title(
    rule: &AutoRule,
    context: &BTreeMap<&'static str, String>,
) -> AutoGenerationResult<String> {
    let environment = Environment::new();
    let rendered = environment
        .render_str(&rule.title_template, context)
        .map_err(|error| AutoGenerationError::TemplateRender {
            trigger: rule.trigger,
            reason: error.to_string(),
        })?;
    if rendered.trim().is_empty() {
        return Ok(fallback_title(rule.trigger).to_owned());
    }
    Ok(fit_title(&rendered))
}

const fn fallback_title(trigger: TriggerType) -> &'static str {
    match trigger {
        TriggerType::BeforeArrival => "Cleaning before arrival",
        TriggerType::AfterDeparture => "Cleaning after departure",
        TriggerType::TurnoverBetweenStays => "Turnover between stays",
    }
}
