//! Given steps for request workflow BDD scenarios.

use super::world::{RequestWorkflowWorld, run_async};
use eyre::WrapErr;
use resourcing::request::domain::{
    ActionParams, ActionProperties, Actor, PersonId, RequestParams, RequestType, Responsible,
    SubType,
};
use rstest_bdd_macros::given;

fn submit(
    world: &mut RequestWorkflowWorld,
    sub_type: &str,
    candidates: Vec<PersonId>,
) -> Result<(), eyre::Report> {
    let params = RequestParams {
        request_type: RequestType::Allocation,
        sub_type: SubType::new(sub_type).wrap_err("parse sub type")?,
        assigned_department: None,
        correlation_id: None,
        org_position_id: Some(world.position),
        candidates,
    };
    let created = run_async(world.requests.create_request(params, PersonId::new()))
        .wrap_err("create request for scenario")?;
    world.request = Some(created);
    Ok(())
}

fn register(world: &mut RequestWorkflowWorld, name: String) -> Result<PersonId, eyre::Report> {
    let person_id = PersonId::new();
    world
        .profiles
        .add_person(person_id, &name)
        .map_err(|err| eyre::eyre!("register {name}: {err}"))?;
    world.people.insert(name, person_id);
    Ok(person_id)
}

#[given(r#"a "{sub_type}" allocation request"#)]
fn allocation_request(
    world: &mut RequestWorkflowWorld,
    sub_type: String,
) -> Result<(), eyre::Report> {
    submit(world, &sub_type, Vec::new())
}

#[given(r#"an allocation request of type "{sub_type}" with candidates "{first}" and "{second}""#)]
fn allocation_request_with_candidates(
    world: &mut RequestWorkflowWorld,
    sub_type: String,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let candidates = vec![register(world, first)?, register(world, second)?];
    submit(world, &sub_type, candidates)
}

#[given("the workflow has been initialized")]
fn workflow_initialized(world: &mut RequestWorkflowWorld) -> Result<(), eyre::Report> {
    let request_id = world.request()?.id();
    let snapshot = run_async(world.engine.initialize(request_id, &world.owner))
        .wrap_err("initialize workflow")?;
    world.request = Some(snapshot.request);
    Ok(())
}

#[given("the current step has been approved")]
fn current_step_approved(world: &mut RequestWorkflowWorld) -> Result<(), eyre::Report> {
    let request_id = world.request()?.id();
    let approval =
        run_async(world.engine.approve(request_id, &world.owner)).wrap_err("approve step")?;
    world.request = Some(approval.request);
    Ok(())
}

#[given("a required action for the resource owner")]
fn required_action(world: &mut RequestWorkflowWorld) -> Result<(), eyre::Report> {
    let request_id = world.request()?.id();
    let params = ActionParams {
        title: "Confirm cost centre".to_owned(),
        body: None,
        action_type: "task".to_owned(),
        sub_type: None,
        responsible: Responsible::ResourceOwner,
        is_required: true,
        properties: ActionProperties::new(),
    };
    let action = run_async(world.actions.create_action(
        request_id,
        &Actor::task_owner(PersonId::new()),
        &params,
    ))
    .wrap_err("create required action")?;
    world.action = Some(action);
    Ok(())
}

#[given(r#"the org chart rejects allocations with "{message}""#)]
fn org_chart_rejects(world: &mut RequestWorkflowWorld, message: String) -> Result<(), eyre::Report> {
    world
        .org_chart
        .reject_pushes(message, None)
        .map_err(|err| eyre::eyre!("script org chart rejection: {err}"))
}
