//! Sharing manager tests.

use super::support::{Harness, harness};
use crate::request::{
    domain::{
        Actor, PersonId, RequestId, RequestType, ShareId, ShareParams, ShareSource, SharedRequest,
        ValidationError,
    },
    services::LifecycleError,
};
use rstest::rstest;

fn grant(shared_with: PersonId, scope: &str) -> ShareParams {
    ShareParams {
        shared_with,
        scope: scope.to_owned(),
        source: ShareSource::User,
        reason: Some("  line manager  ".to_owned()),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sharing_is_idempotent_per_person_and_scope(harness: Harness) {
    let request = harness.submit(RequestType::Allocation, "normal", Vec::new()).await;
    let reader = harness.person("Reader");
    let actor = Actor::resource_owner(PersonId::new());
    let manager = harness.sharing();

    let first = manager
        .share(request.id(), &actor, &grant(reader, "basic_read"))
        .await
        .expect("sharing should succeed");
    let repeat = manager
        .share(request.id(), &actor, &grant(reader, " BASIC_READ "))
        .await
        .expect("repeat sharing should succeed");
    let wider = manager
        .share(request.id(), &actor, &grant(reader, "full_read"))
        .await
        .expect("sharing another scope should succeed");

    assert!(first);
    assert!(!repeat);
    assert!(wider);
    let shares = manager
        .list_shares(request.id())
        .await
        .expect("listing should succeed");
    assert_eq!(shares.len(), 2);
    assert!(
        shares
            .iter()
            .all(|share| share.reason() == Some("line manager"))
    );
    assert_eq!(
        harness.event_names(),
        vec!["request_created", "request_shared", "request_shared"]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sharing_validates_person_and_scope(harness: Harness) {
    let request = harness.submit(RequestType::Allocation, "normal", Vec::new()).await;
    let actor = Actor::resource_owner(PersonId::new());
    let manager = harness.sharing();
    let stranger = PersonId::new();

    let unknown = manager
        .share(request.id(), &actor, &grant(stranger, "basic_read"))
        .await;
    let blank = manager
        .share(request.id(), &actor, &grant(harness.person("Reader"), "   "))
        .await;

    assert!(matches!(
        unknown,
        Err(LifecycleError::Validation(ValidationError::UnknownPerson(id))) if id == stranger
    ));
    assert!(matches!(
        blank,
        Err(LifecycleError::Validation(ValidationError::EmptySharingField("scope")))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sharing_needs_an_existing_request(harness: Harness) {
    let missing = RequestId::new();

    let outcome = harness
        .sharing()
        .share(
            missing,
            &Actor::resource_owner(PersonId::new()),
            &grant(harness.person("Reader"), "basic_read"),
        )
        .await;

    assert!(matches!(outcome, Err(LifecycleError::RequestNotFound(id)) if id == missing));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn revoked_grants_are_kept_but_no_longer_active(harness: Harness) {
    let request = harness.submit(RequestType::Allocation, "normal", Vec::new()).await;
    let reader = harness.person("Reader");
    let actor = Actor::resource_owner(PersonId::new());
    let manager = harness.sharing();
    manager
        .share(request.id(), &actor, &grant(reader, "basic_read"))
        .await
        .expect("sharing should succeed");
    let share_id = manager
        .shared_with(reader)
        .await
        .expect("listing should succeed")
        .first()
        .map(SharedRequest::id)
        .expect("one active grant");

    let revoked = manager.revoke(share_id).await.expect("revoking should succeed");
    let again = manager.revoke(share_id).await.expect("repeat revoke should succeed");

    assert!(revoked.is_revoked());
    assert_eq!(again.revoked_at(), revoked.revoked_at());
    assert!(manager.shared_with(reader).await.expect("listable").is_empty());
    assert_eq!(manager.list_shares(request.id()).await.expect("listable"), vec![revoked]);
    assert_eq!(
        harness.event_names(),
        vec!["request_created", "request_shared", "share_revoked"]
    );

    let regranted = manager
        .share(request.id(), &actor, &grant(reader, "basic_read"))
        .await
        .expect("sharing again should succeed");
    assert!(regranted);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn revoking_unknown_grants_is_reported(harness: Harness) {
    let missing = ShareId::new();

    let outcome = harness.sharing().revoke(missing).await;

    assert!(matches!(outcome, Err(LifecycleError::ShareNotFound(id)) if id == missing));
}
