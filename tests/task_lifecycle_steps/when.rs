//! When steps for task lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use rstest_bdd_macros::when;
use turnkeep::task::{
    domain::{TaskAction, UserId},
    services::TransitionRequest,
};

fn request_for(world: &LifecycleWorld, action: &str) -> Result<TransitionRequest, eyre::Report> {
    let action = TaskAction::try_from(action)
        .map_err(|err| eyre::eyre!("invalid action in scenario: {err}"))?;
    Ok(TransitionRequest::new(
        world.tenant_id,
        world.task()?.id(),
        action,
        world.actor_id,
    ))
}

#[when(r#"the actor applies "{action}""#)]
fn actor_applies(world: &mut LifecycleWorld, action: String) -> Result<(), eyre::Report> {
    let request = request_for(world, &action)?;
    let result = run_async(world.service.transition(request));
    world.record(result);
    Ok(())
}

#[when(r#"the actor applies "{action}" on behalf of a staff member"#)]
fn actor_applies_for_staff(world: &mut LifecycleWorld, action: String) -> Result<(), eyre::Report> {
    let request = request_for(world, &action)?;
    let result = run_async(world.service.proxy_transition(request, UserId::new()));
    world.record(result);
    Ok(())
}
