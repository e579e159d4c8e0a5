//! When steps for reservation cascade BDD scenarios.

use super::world::{CascadeWorld, on_day, run_async};
use rstest_bdd_macros::when;
use turnkeep::task::{
    domain::{
        DomainEvent, ReservationCancellation, ReservationChange, ReservationCreated,
        ReservationSource, ReservationStay,
    },
    ports::EventBus,
};

#[when(
    "the reservation moves to check in on day {in_day:u32} at hour {in_hour:u32} and out on day {out_day:u32} at hour {out_hour:u32}"
)]
fn reservation_moves(
    world: &mut CascadeWorld,
    in_day: u32,
    in_hour: u32,
    out_day: u32,
    out_hour: u32,
) -> Result<(), eyre::Report> {
    let previous = world.stay()?;
    let current = ReservationStay::new(on_day(in_day, in_hour)?, on_day(out_day, out_hour)?);
    run_async(
        world
            .engine
            .bus()
            .publish(DomainEvent::ReservationUpdated(ReservationChange {
                tenant_id: world.tenant_id,
                property_id: world.property_id,
                reservation_id: world.reservation_id,
                previous,
                current,
                source: ReservationSource::CalendarSync,
            })),
    );
    world.stay = Some(current);
    Ok(())
}

#[when("the reservation is cancelled")]
fn reservation_cancelled(world: &mut CascadeWorld) -> Result<(), eyre::Report> {
    let stay = world.stay()?;
    run_async(
        world
            .engine
            .bus()
            .publish(DomainEvent::ReservationCancelled(ReservationCancellation {
                tenant_id: world.tenant_id,
                property_id: world.property_id,
                reservation_id: world.reservation_id,
                stay,
                source: ReservationSource::ManualEdit,
            })),
    );
    Ok(())
}

#[when("the reservation is created")]
fn reservation_created(world: &mut CascadeWorld) -> Result<(), eyre::Report> {
    let stay = world.stay()?;
    run_async(
        world
            .engine
            .bus()
            .publish(DomainEvent::ReservationCreated(ReservationCreated {
                tenant_id: world.tenant_id,
                property_id: world.property_id,
                reservation_id: world.reservation_id,
                stay,
                property_name: "Harbour Loft".to_owned(),
                guest_name: "Ada Byron".to_owned(),
            })),
    );
    Ok(())
}
