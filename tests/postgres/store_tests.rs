//! Constraint and query tests for the `PostgreSQL` task store.

use crate::postgres::helpers::{PreparedStore, at, prepared_store};
use mockable::DefaultClock;
use rstest::rstest;
use turnkeep::task::{
    domain::{
        ConflictKind, ConflictPair, ConflictStatus, FusionPair, FusionRejection, MAX_TITLE_CHARS,
        TaskPair, TaskStatus,
    },
    ports::TaskStoreError,
};

fn seed_pair(prepared: &PreparedStore) -> TaskPair {
    let first = prepared
        .seed(prepared.params("Linen change", at(2, 10, 0)))
        .expect("seed first task");
    let second = prepared
        .seed(prepared.params("Deep clean", at(2, 10, 30)))
        .expect("seed second task");
    TaskPair::new(first.id(), second.id()).expect("distinct tasks")
}

#[rstest]
fn second_conflict_for_a_pair_is_rejected(prepared_store: Option<PreparedStore>) {
    let Some(prepared) = prepared_store else {
        return;
    };
    let pair = seed_pair(&prepared);
    let tenant_id = prepared.tenant_id;

    prepared
        .run(move |uow| {
            uow.insert_conflict(&ConflictPair::detected(
                tenant_id,
                pair,
                ConflictKind::Property,
                &DefaultClock,
            ))
        })
        .expect("first conflict");

    let result = prepared.run(move |uow| {
        uow.insert_conflict(&ConflictPair::detected(
            tenant_id,
            pair,
            ConflictKind::Staff,
            &DefaultClock,
        ))
    });
    assert!(
        matches!(result, Err(TaskStoreError::DuplicatePair(found)) if found == pair),
        "expected DuplicatePair, got: {result:?}"
    );

    let stored = prepared
        .run(move |uow| uow.list_conflicts(tenant_id, None))
        .expect("list conflicts");
    assert_eq!(stored.len(), 1);
}

#[rstest]
fn second_fusion_proposal_for_a_pair_is_rejected(prepared_store: Option<PreparedStore>) {
    let Some(prepared) = prepared_store else {
        return;
    };
    let pair = seed_pair(&prepared);
    let tenant_id = prepared.tenant_id;
    let property_id = prepared.property_id;

    prepared
        .run(move |uow| {
            uow.insert_fusion_pair(&FusionPair::propose(
                tenant_id,
                property_id,
                pair,
                &DefaultClock,
            ))
        })
        .expect("first proposal");

    let result = prepared.run(move |uow| {
        uow.insert_fusion_pair(&FusionPair::propose(
            tenant_id,
            property_id,
            pair,
            &DefaultClock,
        ))
    });
    assert!(
        matches!(result, Err(TaskStoreError::DuplicatePair(found)) if found == pair),
        "expected DuplicatePair, got: {result:?}"
    );
}

#[rstest]
fn repeated_rejection_is_recorded_once(prepared_store: Option<PreparedStore>) {
    let Some(prepared) = prepared_store else {
        return;
    };
    let pair = seed_pair(&prepared);
    let tenant_id = prepared.tenant_id;

    for _ in 0..2 {
        prepared
            .run(move |uow| {
                uow.insert_fusion_rejection(&FusionRejection::record(
                    tenant_id,
                    pair,
                    &DefaultClock,
                ))
            })
            .expect("rejection insert is idempotent");
    }

    let rejected = prepared
        .run(move |uow| uow.is_fusion_rejected(tenant_id, &pair))
        .expect("rejection lookup");
    assert!(rejected);
}

#[rstest]
fn conflict_listing_filters_by_status(prepared_store: Option<PreparedStore>) {
    let Some(prepared) = prepared_store else {
        return;
    };
    let first_pair = seed_pair(&prepared);
    let second_pair = seed_pair(&prepared);
    let tenant_id = prepared.tenant_id;

    let open = ConflictPair::detected(tenant_id, first_pair, ConflictKind::Property, &DefaultClock);
    let mut seen =
        ConflictPair::detected(tenant_id, second_pair, ConflictKind::Property, &DefaultClock);
    assert!(seen.acknowledge(&DefaultClock));
    let open_id = open.id;
    let seen_id = seen.id;
    prepared
        .run(move |uow| {
            uow.insert_conflict(&open)?;
            uow.insert_conflict(&seen)
        })
        .expect("insert conflicts");

    let acknowledged = prepared
        .run(move |uow| uow.list_conflicts(tenant_id, Some(ConflictStatus::Acknowledged)))
        .expect("list acknowledged");
    let detected = prepared
        .run(move |uow| uow.list_conflicts(tenant_id, Some(ConflictStatus::Detected)))
        .expect("list detected");

    assert_eq!(
        acknowledged.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![seen_id]
    );
    assert_eq!(
        detected.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![open_id]
    );
}

#[rstest]
fn longest_allowed_title_is_stored(prepared_store: Option<PreparedStore>) {
    let Some(prepared) = prepared_store else {
        return;
    };
    let title = "é".repeat(MAX_TITLE_CHARS);
    let task = prepared
        .seed(prepared.params(&title, at(3, 9, 0)))
        .expect("seed task at the title limit");
    let tenant_id = prepared.tenant_id;
    let task_id = task.id();

    let stored = prepared
        .run(move |uow| uow.find_task(tenant_id, task_id))
        .expect("find task")
        .expect("task exists");

    assert_eq!(stored.title(), title);
    assert_eq!(stored.status(), TaskStatus::PendingValidation);
    assert_eq!(stored.scheduled_at(), Some(at(3, 9, 0)));
}
