//! Then steps for request workflow BDD scenarios.

use super::world::RequestWorkflowWorld;
use resourcing::request::{
    domain::{InvalidWorkflowError, ProvisioningState, ValidationError},
    services::LifecycleError,
};
use rstest_bdd_macros::then;

#[then(r#"the request state is "{state}""#)]
fn request_state_is(world: &RequestWorkflowWorld, state: String) -> Result<(), eyre::Report> {
    let request = world.request()?;
    let actual = request.state().map(|found| found.as_str().to_owned());
    eyre::ensure!(
        actual.as_deref() == Some(state.as_str()),
        "expected request state {state}, found {actual:?}"
    );
    Ok(())
}

#[then(r#"{count:usize} "{name}" event was published"#)]
fn event_count(
    world: &RequestWorkflowWorld,
    count: usize,
    name: String,
) -> Result<(), eyre::Report> {
    let published = world.count_events(&name)?;
    eyre::ensure!(
        published == count,
        "expected {count} {name} events, found {published}"
    );
    Ok(())
}

#[then("the org chart received {count:usize} allocation push")]
fn allocation_pushes(world: &RequestWorkflowWorld, count: usize) -> Result<(), eyre::Report> {
    let pushes = world
        .org_chart
        .pushes()
        .map_err(|err| eyre::eyre!("read pushes: {err}"))?;
    eyre::ensure!(
        pushes.len() == count,
        "expected {count} pushes, found {}",
        pushes.len()
    );
    let outcome = world
        .provisioning_outcome
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing provisioning outcome"))?;
    eyre::ensure!(
        matches!(outcome, Ok(status) if status.state() == ProvisioningState::Provisioned),
        "expected a provisioned request, got {outcome:?}"
    );
    Ok(())
}

#[then("the approval fails because candidates were not narrowed")]
fn candidates_not_narrowed(world: &RequestWorkflowWorld) -> Result<(), eyre::Report> {
    let error = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the approval to fail"))?;
    eyre::ensure!(
        matches!(
            error,
            LifecycleError::Validation(ValidationError::CandidatesNotNarrowed { .. })
        ),
        "expected CandidatesNotNarrowed, got {error:?}"
    );
    Ok(())
}

#[then("the approval is blocked by unresolved actions")]
fn blocked_by_actions(world: &RequestWorkflowWorld) -> Result<(), eyre::Report> {
    let error = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the approval to fail"))?;
    eyre::ensure!(
        matches!(
            error,
            LifecycleError::InvalidWorkflow(InvalidWorkflowError::BlockedByActions { .. })
        ),
        "expected BlockedByActions, got {error:?}"
    );
    Ok(())
}

#[then(r#"provisioning failed with state "{state}""#)]
fn provisioning_failed(world: &RequestWorkflowWorld, state: String) -> Result<(), eyre::Report> {
    let outcome = world
        .provisioning_outcome
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing provisioning outcome"))?;
    let Err(LifecycleError::Provisioning(failure)) = outcome else {
        return Err(eyre::eyre!("expected a provisioning failure, got {outcome:?}"));
    };
    eyre::ensure!(
        failure.state.as_str() == state,
        "expected provisioning state {state}, found {}",
        failure.state
    );
    Ok(())
}
