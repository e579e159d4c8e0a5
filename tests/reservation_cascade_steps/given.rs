//! Given steps for reservation cascade BDD scenarios.

use super::world::{CascadeWorld, on_day, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use turnkeep::task::{
    domain::{AutoRule, NewTask, ReservationStay, TaskAction, TaskCategory, TriggerType},
    services::TransitionRequest,
};

#[given(
    "a reservation checking in on day {in_day:u32} at hour {in_hour:u32} and out on day {out_day:u32} at hour {out_hour:u32}"
)]
fn reservation_exists(
    world: &mut CascadeWorld,
    in_day: u32,
    in_hour: u32,
    out_day: u32,
    out_hour: u32,
) -> Result<(), eyre::Report> {
    world
        .store
        .register_reservation(world.tenant_id, world.reservation_id)
        .wrap_err("register reservation")?;
    world.stay = Some(ReservationStay::new(
        on_day(in_day, in_hour)?,
        on_day(out_day, out_hour)?,
    ));
    Ok(())
}

fn create_linked_task(
    world: &mut CascadeWorld,
    label: String,
    day: u32,
    hour: u32,
) -> Result<(), eyre::Report> {
    let params = NewTask::new(
        world.tenant_id,
        world.property_id,
        label.clone(),
        TaskCategory::Cleaning,
    )
    .scheduled_at(on_day(day, hour)?)
    .for_reservation(world.reservation_id);
    let task = run_async(world.engine.lifecycle().create_task(params))
        .wrap_err("create linked task")?;
    world.tasks.insert(label, task.id());
    Ok(())
}

#[given(r#"a pending task "{label}" linked to the reservation on day {day:u32} at hour {hour:u32}"#)]
fn pending_task(
    world: &mut CascadeWorld,
    label: String,
    day: u32,
    hour: u32,
) -> Result<(), eyre::Report> {
    create_linked_task(world, label, day, hour)
}

#[given(
    r#"an in-progress task "{label}" linked to the reservation on day {day:u32} at hour {hour:u32}"#
)]
fn in_progress_task(
    world: &mut CascadeWorld,
    label: String,
    day: u32,
    hour: u32,
) -> Result<(), eyre::Report> {
    create_linked_task(world, label.clone(), day, hour)?;
    let task_id = world.task_id(&label)?;
    for action in [TaskAction::Validate, TaskAction::Start] {
        run_async(world.engine.lifecycle().transition(TransitionRequest::new(
            world.tenant_id,
            task_id,
            action,
            world.actor_id,
        )))
        .wrap_err_with(|| format!("apply {action} to {label}"))?;
    }
    Ok(())
}

fn store_rule(
    world: &CascadeWorld,
    trigger: &str,
    title: String,
    enabled: bool,
) -> Result<(), eyre::Report> {
    let trigger = TriggerType::try_from(trigger)
        .map_err(|err| eyre::eyre!("invalid trigger in scenario: {err}"))?;
    let rule = AutoRule::new(world.tenant_id, world.property_id, trigger, title)
        .with_enabled(enabled);
    run_async(world.engine.autogen().upsert_rule(rule)).wrap_err("store rule")?;
    Ok(())
}

#[given(r#"an enabled "{trigger}" rule titled "{title}""#)]
fn enabled_rule(world: &mut CascadeWorld, trigger: String, title: String) -> Result<(), eyre::Report> {
    store_rule(world, &trigger, title, true)
}

#[given(r#"a disabled "{trigger}" rule titled "{title}""#)]
fn disabled_rule(
    world: &mut CascadeWorld,
    trigger: String,
    title: String,
) -> Result<(), eyre::Report> {
    store_rule(world, &trigger, title, false)
}
