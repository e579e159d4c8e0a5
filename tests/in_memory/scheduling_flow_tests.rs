//! In-memory integration tests for conflict and fusion flows.

use super::helpers::{EngineFixture, at, engine};
use rstest::rstest;
use turnkeep::task::{
    domain::{
        ConflictKind, ConflictStatus, EventKind, FusionPair, FusionStatus, Task, TaskCategory,
        TaskStatus,
    },
    services::ErrorKind,
};

/// Creates two overlapping cleanings and returns the single pending pair.
async fn overlapping_pair(engine: &EngineFixture) -> (Task, Task, FusionPair) {
    let morning = engine
        .create(engine.cleaning("Morning clean", at(6, 10, 0)))
        .await
        .expect("first task created");
    let linen = engine
        .create(engine.cleaning("Linen change", at(6, 10, 30)))
        .await
        .expect("second task created");
    let pending = engine
        .engine
        .fusion()
        .list_fusion_pairs(engine.tenant_id, Some(FusionStatus::Pending))
        .await
        .expect("pairs listed");
    assert_eq!(pending.len(), 1, "expected one pending pair");
    let pair = pending.into_iter().next().expect("pending pair");
    (morning, linen, pair)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn overlapping_tasks_are_flagged_and_proposed_for_fusion(engine: EngineFixture) {
    let (morning, linen, pair) = overlapping_pair(&engine).await;

    assert!(pair.pair.contains(morning.id()) && pair.pair.contains(linen.id()));
    let conflicts = engine
        .engine
        .conflicts()
        .list_conflicts(engine.tenant_id, None)
        .await
        .expect("conflicts listed");
    assert_eq!(conflicts.len(), 1, "expected one conflict");
    let conflict = conflicts.first().expect("conflict recorded");
    assert_eq!(conflict.kind, ConflictKind::Property);
    assert_eq!(conflict.pair, pair.pair);
    assert_eq!(
        engine
            .engine
            .bus()
            .published_of(EventKind::TaskConflictDetected)
            .len(),
        1
    );
    for task in [&morning, &linen] {
        let stored = engine.reload(task).await.expect("task reloads");
        assert_eq!(stored.status(), TaskStatus::FusionSuggested);
        assert_eq!(stored.fusion_pair_id(), Some(pair.id));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn accepted_fusion_replaces_both_tasks_with_a_turnover(engine: EngineFixture) {
    let (morning, linen, pair) = overlapping_pair(&engine).await;

    let acceptance = engine
        .engine
        .fusion()
        .accept(engine.tenant_id, pair.id, engine.actor_id)
        .await
        .expect("fusion accepted");

    let merged = &acceptance.merged_task;
    assert_eq!(merged.category(), TaskCategory::Turnover);
    assert_eq!(merged.status(), TaskStatus::PendingValidation);
    assert_eq!(merged.scheduled_at(), Some(at(6, 10, 0)));
    assert_eq!(merged.duration_minutes(), Some(84));
    for task in [&morning, &linen] {
        let stored = engine.reload(task).await.expect("task reloads");
        assert_eq!(stored.status(), TaskStatus::Cancelled);
    }

    let accepted = engine
        .engine
        .fusion()
        .list_fusion_pairs(engine.tenant_id, Some(FusionStatus::Accepted))
        .await
        .expect("pairs listed");
    assert_eq!(accepted.len(), 1);
    assert_eq!(
        accepted.first().and_then(|fusion| fusion.merged_task_id),
        Some(merged.id())
    );

    let again = engine
        .engine
        .fusion()
        .accept(engine.tenant_id, pair.id, engine.actor_id)
        .await
        .expect_err("a decided pair cannot be accepted twice");
    assert_eq!(again.kind(), ErrorKind::NotEligible);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_fusion_is_never_proposed_again(engine: EngineFixture) {
    let (morning, linen, pair) = overlapping_pair(&engine).await;

    let outcome = engine
        .engine
        .fusion()
        .reject(engine.tenant_id, pair.id)
        .await
        .expect("fusion rejected");
    assert_eq!(outcome.restored_task_ids.len(), 2);
    for task in [&morning, &linen] {
        let stored = engine.reload(task).await.expect("task reloads");
        assert_eq!(stored.status(), TaskStatus::PendingValidation);
        assert_eq!(stored.fusion_pair_id(), None);
    }

    let retry = engine
        .engine
        .fusion()
        .propose(engine.tenant_id, morning.id())
        .await
        .expect("proposal runs");
    assert_eq!(retry, None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conflicts_move_from_detected_to_resolved(engine: EngineFixture) {
    overlapping_pair(&engine).await;
    let detector = engine.engine.conflicts();
    let detected = detector
        .list_conflicts(engine.tenant_id, Some(ConflictStatus::Detected))
        .await
        .expect("conflicts listed");
    let conflict_id = detected.first().expect("one detected conflict").id;

    assert!(
        detector
            .acknowledge(engine.tenant_id, conflict_id)
            .await
            .expect("acknowledge runs")
    );
    let resolved = detector
        .resolve(engine.tenant_id, conflict_id, "Linen change moved to the afternoon")
        .await
        .expect("conflict resolved");

    assert_eq!(resolved.status, ConflictStatus::Resolved);
    assert_eq!(
        resolved.resolution.as_deref(),
        Some("Linen change moved to the afternoon")
    );
    assert!(
        detector
            .list_conflicts(engine.tenant_id, Some(ConflictStatus::Detected))
            .await
            .expect("conflicts listed")
            .is_empty()
    );
}
