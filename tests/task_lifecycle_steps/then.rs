//! Then steps for task lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use eyre::{WrapErr, ensure};
use rstest_bdd_macros::then;
use turnkeep::task::{domain::TaskStatus, services::TaskLifecycleError};

fn last_error(world: &LifecycleWorld) -> Result<&TaskLifecycleError, eyre::Report> {
    match world.last_result.as_ref() {
        Some(Err(err)) => Ok(err),
        Some(Ok(_)) => Err(eyre::eyre!("expected the last action to fail")),
        None => Err(eyre::eyre!("no action was applied in this scenario")),
    }
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &LifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))?;
    let task = world.task()?;
    let stored = run_async(world.service.find_task(world.tenant_id, task.id()))
        .wrap_err("reload task")?
        .ok_or_else(|| eyre::eyre!("task vanished from the store"))?;
    ensure!(
        stored.status() == expected,
        "expected status {expected}, found {}",
        stored.status()
    );
    Ok(())
}

#[then("the task history has {count:usize} entries")]
fn history_length(world: &LifecycleWorld, count: usize) -> Result<(), eyre::Report> {
    let history = run_async(world.service.history(world.tenant_id, world.task()?.id()))
        .wrap_err("load history")?;
    ensure!(
        history.len() == count,
        "expected {count} history entries, found {}",
        history.len()
    );
    Ok(())
}

#[then(r#"the action is rejected while the task is "{status}""#)]
fn action_rejected(world: &LifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))?;
    match last_error(world)? {
        TaskLifecycleError::InvalidTransition { current, .. } if *current == expected => Ok(()),
        other => Err(eyre::eyre!("expected invalid transition from {expected}, got {other}")),
    }
}

#[then("the rejection lists no allowed actions")]
fn rejection_lists_nothing(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match last_error(world)? {
        TaskLifecycleError::InvalidTransition { allowed, .. } => {
            ensure!(allowed.is_empty(), "expected no allowed actions, got {allowed:?}");
            Ok(())
        }
        other => Err(eyre::eyre!("expected invalid transition, got {other}")),
    }
}

#[then("the latest history entry is recorded by proxy")]
fn latest_entry_is_proxy(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let history = run_async(world.service.history(world.tenant_id, world.task()?.id()))
        .wrap_err("load history")?;
    let entry = history
        .last()
        .ok_or_else(|| eyre::eyre!("task has no history"))?;
    ensure!(entry.is_proxy, "expected a proxy entry");
    ensure!(entry.actor_id == world.actor_id, "proxy entry names the wrong actor");
    ensure!(entry.on_behalf_of.is_some(), "proxy entry lacks the represented user");
    Ok(())
}

#[then("the action is refused as outside the actor's scope")]
fn action_out_of_scope(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match last_error(world)? {
        TaskLifecycleError::ScopeViolation { actor_id, .. } if *actor_id == world.actor_id => {
            Ok(())
        }
        other => Err(eyre::eyre!("expected scope violation, got {other}")),
    }
}
