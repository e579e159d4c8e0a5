//! Then steps for reservation cascade BDD scenarios.

use super::world::{CascadeWorld, on_day, run_async};
use eyre::{WrapErr, ensure};
use rstest_bdd_macros::then;
use turnkeep::task::{
    domain::{ReservationAuditAction, Task, TaskStatus},
    ports::TaskStore,
};

fn load_task(world: &CascadeWorld, label: &str) -> Result<Task, eyre::Report> {
    let task_id = world.task_id(label)?;
    let tenant_id = world.tenant_id;
    run_async(
        world
            .store
            .transaction(move |uow| uow.find_task(tenant_id, task_id)),
    )
    .wrap_err("load task")?
    .ok_or_else(|| eyre::eyre!("task {label:?} missing from the store"))
}

fn linked_tasks(world: &CascadeWorld) -> Result<Vec<Task>, eyre::Report> {
    let (tenant_id, reservation_id) = (world.tenant_id, world.reservation_id);
    run_async(
        world
            .store
            .transaction(move |uow| uow.tasks_for_reservation(tenant_id, reservation_id)),
    )
    .wrap_err("load linked tasks")
}

#[then(r#"task "{label}" is scheduled on day {day:u32} at hour {hour:u32}"#)]
fn task_is_scheduled(
    world: &CascadeWorld,
    label: String,
    day: u32,
    hour: u32,
) -> Result<(), eyre::Report> {
    let task = load_task(world, &label)?;
    let expected = on_day(day, hour)?;
    ensure!(
        task.scheduled_at() == Some(expected),
        "expected {label:?} at {expected}, found {:?}",
        task.scheduled_at()
    );
    Ok(())
}

#[then(r#"task "{label}" has status "{status}""#)]
fn task_has_status(world: &CascadeWorld, label: String, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))?;
    let task = load_task(world, &label)?;
    ensure!(
        task.status() == expected,
        "expected {label:?} to be {expected}, found {}",
        task.status()
    );
    Ok(())
}

#[then(r#"the reservation has {count:usize} "{action}" audit entries"#)]
fn reservation_audit_count(
    world: &CascadeWorld,
    count: usize,
    action: String,
) -> Result<(), eyre::Report> {
    let expected = ReservationAuditAction::try_from(action.as_str())
        .map_err(|err| eyre::eyre!("invalid audit action in scenario: {err}"))?;
    let (tenant_id, reservation_id) = (world.tenant_id, world.reservation_id);
    let audits = run_async(world.store.transaction(move |uow| {
        uow.audits_for_reservation(tenant_id, reservation_id)
    }))
    .wrap_err("load audit rows")?;
    let matching = audits.iter().filter(|audit| audit.action == expected).count();
    ensure!(
        matching == count,
        "expected {count} {action} audit entries, found {matching}"
    );
    Ok(())
}

#[then("{count:usize} tasks are linked to the reservation")]
fn linked_task_count(world: &CascadeWorld, count: usize) -> Result<(), eyre::Report> {
    let linked = linked_tasks(world)?;
    ensure!(
        linked.len() == count,
        "expected {count} linked tasks, found {}",
        linked.len()
    );
    Ok(())
}

#[then(r#"the linked task is titled "{title}""#)]
fn linked_task_title(world: &CascadeWorld, title: String) -> Result<(), eyre::Report> {
    let linked = linked_tasks(world)?;
    let [task] = linked.as_slice() else {
        return Err(eyre::eyre!("expected exactly one linked task, found {}", linked.len()));
    };
    ensure!(
        task.title() == title,
        "expected title {title:?}, found {:?}",
        task.title()
    );
    Ok(())
}
