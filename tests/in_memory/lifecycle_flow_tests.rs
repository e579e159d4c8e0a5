//! In-memory integration tests for lifecycle flows through the engine.

use super::helpers::{EngineFixture, at, engine};
use rstest::rstest;
use turnkeep::task::{
    domain::{
        ConflictKind, ConflictStatus, EventKind, NewTask, PropertyId, TaskAction, TaskCategory,
        TaskStatus, UserId,
    },
    services::{AssignmentRequest, ErrorKind},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn incident_can_be_resolved_back_into_work(engine: EngineFixture) {
    let task = engine
        .create(engine.cleaning("Deep clean", at(2, 9, 0)))
        .await
        .expect("task created");
    let in_incident = engine
        .drive(
            &task,
            &[TaskAction::Validate, TaskAction::Start, TaskAction::ReportIncident],
        )
        .await
        .expect("incident reported");
    assert_eq!(in_incident.status(), TaskStatus::Incident);
    assert_eq!(
        engine
            .engine
            .bus()
            .published_of(EventKind::TaskIncidentReported)
            .len(),
        1
    );

    let done = engine
        .drive(&in_incident, &[TaskAction::ResolveResume, TaskAction::Complete])
        .await
        .expect("work completed");
    assert_eq!(done.status(), TaskStatus::Completed);
    assert!(done.completed_at().is_some());

    let history = engine
        .engine
        .lifecycle()
        .history(engine.tenant_id, task.id())
        .await
        .expect("history readable");
    let actions: Vec<TaskAction> = history.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        vec![
            TaskAction::Validate,
            TaskAction::Start,
            TaskAction::ReportIncident,
            TaskAction::ResolveResume,
            TaskAction::Complete,
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn double_booking_a_cleaner_records_a_staff_conflict(engine: EngineFixture) {
    let cleaner = UserId::new();
    engine
        .directory
        .add_staff(engine.tenant_id, cleaner)
        .expect("staff registered");

    let here = engine
        .create(engine.cleaning("Harbour Loft clean", at(3, 10, 0)))
        .await
        .expect("first task created");
    let elsewhere = engine
        .create(
            NewTask::new(
                engine.tenant_id,
                PropertyId::new(),
                "Mill House clean",
                TaskCategory::Cleaning,
            )
            .scheduled_at(at(3, 10, 30))
            .with_duration_minutes(90),
        )
        .await
        .expect("second task created");

    for task in [&here, &elsewhere] {
        engine
            .engine
            .lifecycle()
            .assign(AssignmentRequest::new(
                engine.tenant_id,
                task.id(),
                cleaner,
                engine.actor_id,
            ))
            .await
            .expect("assignment accepted");
    }

    let conflicts = engine
        .engine
        .conflicts()
        .list_conflicts(engine.tenant_id, Some(ConflictStatus::Detected))
        .await
        .expect("conflicts listed");
    assert!(
        conflicts
            .iter()
            .any(|conflict| conflict.kind == ConflictKind::Staff
                && conflict.pair.contains(here.id())
                && conflict.pair.contains(elsewhere.id()))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_staff_cannot_be_assigned(engine: EngineFixture) {
    let task = engine
        .create(engine.cleaning("Linen change", at(4, 9, 0)))
        .await
        .expect("task created");

    let err = engine
        .engine
        .lifecycle()
        .assign(AssignmentRequest::new(
            engine.tenant_id,
            task.id(),
            UserId::new(),
            engine.actor_id,
        ))
        .await
        .expect_err("unregistered user refused");

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let stored = engine.reload(&task).await.expect("task reloads");
    assert_eq!(stored.assigned_to(), None);
    assert!(
        engine
            .engine
            .bus()
            .published_of(EventKind::TaskAssigned)
            .is_empty()
    );
}
