//! When steps for request workflow BDD scenarios.

use super::world::{RequestWorkflowWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the current step is approved")]
fn approve_current_step(world: &mut RequestWorkflowWorld) -> Result<(), eyre::Report> {
    let request_id = world.request()?.id();
    match run_async(world.engine.approve(request_id, &world.owner)) {
        Ok(approval) => {
            world.request = Some(approval.request);
            world.last_error = None;
        }
        Err(err) => world.last_error = Some(err),
    }
    Ok(())
}

#[when(r#""{name}" is proposed"#)]
fn propose_person(world: &mut RequestWorkflowWorld, name: String) -> Result<(), eyre::Report> {
    let request_id = world.request()?.id();
    let person_id = world
        .people
        .get(&name)
        .copied()
        .ok_or_else(|| eyre::eyre!("unknown person {name} in scenario world"))?;
    let updated = run_async(world.proposals.propose(request_id, Some(person_id), None))
        .wrap_err("propose person")?;
    world.request = Some(updated);
    Ok(())
}

#[when("the action is resolved")]
fn resolve_action(world: &mut RequestWorkflowWorld) -> Result<(), eyre::Report> {
    let action_id = world
        .action
        .as_ref()
        .map(resourcing::request::domain::Action::id)
        .ok_or_else(|| eyre::eyre!("missing action in scenario world"))?;
    let resolved = run_async(world.actions.set_resolved(action_id, true, &world.owner))
        .wrap_err("resolve action")?;
    world.action = Some(resolved);
    Ok(())
}

#[when("the request is provisioned")]
fn provision_request(world: &mut RequestWorkflowWorld) -> Result<(), eyre::Report> {
    let request_id = world.request()?.id();
    world.provisioning_outcome = Some(run_async(world.provisioning.provision(request_id, false)));
    Ok(())
}
