//! Given steps for task lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use turnkeep::task::domain::{NewTask, TaskCategory};

#[given(r#"a pending task titled "{title}""#)]
fn pending_task(world: &mut LifecycleWorld, title: String) -> Result<(), eyre::Report> {
    let task = run_async(world.service.create_task(NewTask::new(
        world.tenant_id,
        world.property_id,
        title,
        TaskCategory::Cleaning,
    )))
    .wrap_err("create task")?;
    world.task = Some(task);
    Ok(())
}

#[given("the actor administers the task's property")]
fn actor_administers_property(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    world
        .directory
        .grant_property_scope(world.tenant_id, world.actor_id, world.property_id)
        .wrap_err("grant property scope")?;
    Ok(())
}
