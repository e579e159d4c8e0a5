//! Reservation cascade tests against the `PostgreSQL` schema.

use crate::postgres::helpers::{PreparedStore, at, prepared_store};
use rstest::rstest;
use turnkeep::task::{
    domain::{
        ReservationAuditAction, ReservationCancellation, ReservationChange, ReservationId,
        ReservationSource, ReservationStay, Task, TaskId, TaskStatus,
    },
    services::{CANCELLED_NOTE, ErrorKind, RESCHEDULED_NOTE},
};

fn original_stay() -> ReservationStay {
    ReservationStay::new(at(1, 15, 0), at(4, 11, 0))
}

fn moved_stay() -> ReservationStay {
    ReservationStay::new(at(5, 15, 0), at(8, 11, 0))
}

fn seed_linked(prepared: &PreparedStore, reservation_id: ReservationId) -> [Task; 2] {
    let arrival = prepared
        .seed(
            prepared
                .params("Arrival clean", at(1, 15, 0))
                .for_reservation(reservation_id),
        )
        .expect("seed arrival task");
    let departure = prepared
        .seed(
            prepared
                .params("Departure clean", at(4, 11, 0))
                .for_reservation(reservation_id),
        )
        .expect("seed departure task");
    [arrival, departure]
}

fn change(prepared: &PreparedStore, reservation_id: ReservationId) -> ReservationChange {
    ReservationChange {
        tenant_id: prepared.tenant_id,
        property_id: prepared.property_id,
        reservation_id,
        previous: original_stay(),
        current: moved_stay(),
        source: ReservationSource::CalendarSync,
    }
}

fn cancellation(
    prepared: &PreparedStore,
    reservation_id: ReservationId,
) -> ReservationCancellation {
    ReservationCancellation {
        tenant_id: prepared.tenant_id,
        property_id: prepared.property_id,
        reservation_id,
        stay: original_stay(),
        source: ReservationSource::ManualEdit,
    }
}

fn reload(prepared: &PreparedStore, task_id: TaskId) -> Task {
    let tenant_id = prepared.tenant_id;
    prepared
        .run(move |uow| uow.find_task(tenant_id, task_id))
        .expect("find task")
        .expect("task exists")
}

fn audit_count(prepared: &PreparedStore, reservation_id: ReservationId) -> usize {
    let tenant_id = prepared.tenant_id;
    prepared
        .run(move |uow| uow.audits_for_reservation(tenant_id, reservation_id))
        .expect("list audits")
        .len()
}

/// Makes audit inserts for `task_id` violate a check constraint.
fn refuse_audits_for(prepared: &PreparedStore, task_id: TaskId) {
    prepared
        .execute_sql(&format!(
            "ALTER TABLE reservation_task_audits \
             ADD CONSTRAINT refuse_task_audit CHECK (task_id <> '{task_id}')"
        ))
        .expect("add audit constraint");
}

#[rstest]
fn date_change_reschedules_and_audits_every_task(prepared_store: Option<PreparedStore>) {
    let Some(prepared) = prepared_store else {
        return;
    };
    let reservation_id = ReservationId::new();
    let [arrival, departure] = seed_linked(&prepared, reservation_id);

    let outcome = prepared
        .runtime
        .block_on(prepared.cascade().on_updated(change(&prepared, reservation_id)))
        .expect("cascade should succeed");

    assert_eq!(outcome.rescheduled_task_ids, vec![arrival.id(), departure.id()]);
    let moved = reload(&prepared, departure.id());
    assert_eq!(moved.scheduled_at(), Some(at(8, 11, 0)));
    assert_eq!(moved.note(), Some(RESCHEDULED_NOTE));
    assert_eq!(audit_count(&prepared, reservation_id), 2);
}

#[rstest]
fn failed_audit_insert_rolls_back_the_reschedule(prepared_store: Option<PreparedStore>) {
    let Some(prepared) = prepared_store else {
        return;
    };
    let reservation_id = ReservationId::new();
    let [arrival, departure] = seed_linked(&prepared, reservation_id);
    refuse_audits_for(&prepared, departure.id());

    let err = prepared
        .runtime
        .block_on(prepared.cascade().on_updated(change(&prepared, reservation_id)))
        .expect_err("audit constraint should fail the cascade");

    assert_eq!(err.kind(), ErrorKind::Internal);
    for original in [&arrival, &departure] {
        let stored = reload(&prepared, original.id());
        assert_eq!(stored.scheduled_at(), original.scheduled_at());
        assert_eq!(stored.note(), None);
    }
    assert_eq!(audit_count(&prepared, reservation_id), 0);
}

#[rstest]
fn failed_audit_insert_rolls_back_the_cancellation(prepared_store: Option<PreparedStore>) {
    let Some(prepared) = prepared_store else {
        return;
    };
    let reservation_id = ReservationId::new();
    let [arrival, departure] = seed_linked(&prepared, reservation_id);
    refuse_audits_for(&prepared, departure.id());

    let err = prepared
        .runtime
        .block_on(
            prepared
                .cascade()
                .on_cancelled(cancellation(&prepared, reservation_id)),
        )
        .expect_err("audit constraint should fail the cascade");

    assert_eq!(err.kind(), ErrorKind::Internal);
    for original in [&arrival, &departure] {
        assert_eq!(
            reload(&prepared, original.id()).status(),
            TaskStatus::PendingValidation
        );
    }
    assert_eq!(audit_count(&prepared, reservation_id), 0);
}

#[rstest]
fn cancellation_commits_status_and_audit_together(prepared_store: Option<PreparedStore>) {
    let Some(prepared) = prepared_store else {
        return;
    };
    let reservation_id = ReservationId::new();
    let [arrival, _departure] = seed_linked(&prepared, reservation_id);

    let outcome = prepared
        .runtime
        .block_on(
            prepared
                .cascade()
                .on_cancelled(cancellation(&prepared, reservation_id)),
        )
        .expect("cascade should succeed");

    assert_eq!(outcome.cancelled_task_ids.len(), 2);
    let cancelled = reload(&prepared, arrival.id());
    assert_eq!(cancelled.status(), TaskStatus::Cancelled);
    assert_eq!(cancelled.note(), Some(CANCELLED_NOTE));

    let tenant_id = prepared.tenant_id;
    let audits = prepared
        .run(move |uow| uow.audits_for_reservation(tenant_id, reservation_id))
        .expect("list audits");
    assert!(
        audits
            .iter()
            .all(|audit| audit.action == ReservationAuditAction::Cancelled),
        "expected only cancellation audits, got: {audits:?}"
    );
    assert_eq!(audits.len(), 2);
}
