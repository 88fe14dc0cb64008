//! Workflow template catalog tests.

use crate::request::domain::{
    RequestDomainError, RequestType, StepDefinition, StepId, SubType, WorkflowTemplate,
    WorkflowTemplateCatalog, WorkflowTemplateParams,
};
use rstest::rstest;

fn step(id: &str) -> StepId {
    StepId::new(id).expect("valid step id")
}

fn definition(id: &str, next: Option<&str>) -> StepDefinition {
    StepDefinition {
        id: step(id),
        name: id.to_owned(),
        description: None,
        next_step: next.map(step),
        due_in_days: None,
    }
}

fn params(steps: Vec<StepDefinition>) -> WorkflowTemplateParams {
    WorkflowTemplateParams {
        request_type: RequestType::Allocation,
        sub_type: Some(SubType::normal()),
        steps,
        proposal_step: None,
        unset_proposal_states: Vec::new(),
        provisioning_step: None,
    }
}

#[rstest]
#[case::normal_allocation(RequestType::Allocation, "normal", &["created", "proposal", "approval"])]
#[case::direct_allocation(RequestType::Allocation, "direct", &["created", "approval"])]
#[case::joint_venture(RequestType::Allocation, "joint_venture", &["created", "approval"])]
#[case::change_request_any_sub_type(RequestType::ChangeRequest, "adjustment", &["created", "proposal", "accepted"])]
fn builtin_catalog_resolves_each_request_kind(
    #[case] request_type: RequestType,
    #[case] sub_type: &str,
    #[case] expected: &[&str],
) {
    let catalog = WorkflowTemplateCatalog::builtin();
    let template = catalog
        .resolve(request_type, &SubType::new(sub_type).expect("valid sub type"))
        .expect("builtin template");

    let ids: Vec<&str> = template.steps().iter().map(|found| found.id.as_str()).collect();
    assert_eq!(ids, expected);
    assert!(template.provisioning_step().is_none());
}

#[rstest]
fn builtin_catalog_has_no_template_for_unknown_allocation_sub_types() {
    let catalog = WorkflowTemplateCatalog::builtin();
    let unknown = SubType::new("secondment").expect("valid sub type");

    assert!(catalog.resolve(RequestType::Allocation, &unknown).is_none());
}

#[rstest]
fn normal_allocation_allows_unsetting_the_proposal_only_early() {
    let catalog = WorkflowTemplateCatalog::builtin();
    let template = catalog
        .resolve(RequestType::Allocation, &SubType::normal())
        .expect("builtin template");

    assert_eq!(template.proposal_step(), Some(&step("proposal")));
    assert!(template.allows_unset_proposal_in(&step("created")));
    assert!(template.allows_unset_proposal_in(&step("proposal")));
    assert!(!template.allows_unset_proposal_in(&step("approval")));
}

#[rstest]
fn catalog_loads_from_json() {
    let json = r#"{
        "templates": [{
            "request_type": "allocation",
            "sub_type": "temporary",
            "steps": [
                {"id": "created", "name": "Created", "next_step": "review"},
                {"id": "review", "name": "Review", "next_step": "final", "due_in_days": 5},
                {"id": "final", "name": "Final"}
            ],
            "proposal_step": "review",
            "unset_proposal_states": ["created"],
            "provisioning_step": "final"
        }]
    }"#;

    let catalog = WorkflowTemplateCatalog::from_json_str(json).expect("valid catalog");
    let template = catalog
        .resolve(
            RequestType::Allocation,
            &SubType::new("temporary").expect("valid sub type"),
        )
        .expect("loaded template");

    assert_eq!(template.first_step().map(|first| first.id.as_str()), Some("created"));
    assert_eq!(template.previous_of(&step("final")), Some(&step("review")));
    assert_eq!(template.provisioning_step(), Some(&step("final")));
    assert_eq!(
        template.step(&step("review")).and_then(|found| found.due_in_days),
        Some(5)
    );
}

#[rstest]
fn malformed_json_is_a_decoding_error() {
    let outcome = WorkflowTemplateCatalog::from_json_str("{\"templates\": [");

    assert!(matches!(outcome, Err(RequestDomainError::TemplateDecoding(_))));
}

#[rstest]
fn invalid_template_in_json_is_a_decoding_error() {
    let json = r#"{"templates": [{"request_type": "allocation", "steps": []}]}"#;

    assert!(matches!(
        WorkflowTemplateCatalog::from_json_str(json),
        Err(RequestDomainError::TemplateDecoding(message)) if message.contains("no steps")
    ));
}

#[rstest]
#[case::empty(Vec::new(), "no steps")]
#[case::duplicate(vec![definition("a", Some("b")), definition("b", None), definition("b", None)], "duplicate")]
#[case::dangling(vec![definition("a", Some("missing"))], "unknown step")]
#[case::cycle(vec![definition("a", Some("b")), definition("b", Some("c")), definition("c", Some("b"))], "cycle")]
#[case::entry_with_predecessor(vec![definition("a", Some("b")), definition("b", Some("a"))], "predecessor")]
#[case::reserved(vec![definition("completed", None)], "reserved")]
fn template_validation_rejects_malformed_graphs(
    #[case] steps: Vec<StepDefinition>,
    #[case] reason_fragment: &str,
) {
    let outcome = WorkflowTemplate::new(params(steps));

    assert!(matches!(
        outcome,
        Err(RequestDomainError::InvalidTemplate { reason, .. }) if reason.contains(reason_fragment)
    ));
}

#[rstest]
fn template_validation_rejects_unknown_designated_steps() {
    let mut with_unknown = params(vec![definition("a", Some("b")), definition("b", None)]);
    with_unknown.provisioning_step = Some(step("c"));

    assert!(matches!(
        WorkflowTemplate::new(with_unknown),
        Err(RequestDomainError::InvalidTemplate { reason, .. }) if reason.contains("does not exist")
    ));
}

#[rstest]
fn catalog_rejects_two_templates_for_one_kind() {
    let first = WorkflowTemplate::new(params(vec![definition("a", None)])).expect("valid template");
    let second = first.clone();

    assert!(matches!(
        WorkflowTemplateCatalog::new(vec![first, second]),
        Err(RequestDomainError::InvalidTemplate { reason, .. }) if reason.contains("twice")
    ));
}
