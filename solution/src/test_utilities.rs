use model::base_types::{Cost, LocationIdx, Soc, TripIdx};
use model::test_utilities::TestData;
use time::Time;

use crate::vehicle_task::{VehicleElement, VehicleElementKind, VehicleTask};

/// Drives the trips in the given order without charging. Idle time is spent at the end location
/// of the previous trip, before the deadhead.
pub fn task_from_trips(d: &TestData, trips: &[TripIdx]) -> VehicleTask {
    let instance = &d.instance;
    let vehicle_type = instance.vehicle_type();
    let cost_per_meter = d.config.vehicle.cost_per_meter;
    let mut elements: Vec<VehicleElement> = Vec::new();
    let mut location = instance.depot();
    let mut time: Option<Time> = None;

    for trip in trips.iter().map(|t| instance.trip(*t)) {
        let dh = *instance.deadhead(location, trip.from).unwrap();
        let departure = trip.start_time - dh.duration;
        if let Some(t) = time.filter(|t| departure > *t) {
            let drain = if instance.location(location).free_idle() {
                0.0
            } else {
                vehicle_type.idle_consumption(departure - t)
            };
            push(
                &mut elements,
                d,
                VehicleElementKind::Idle,
                (location, location),
                (t, departure),
                drain,
                0.0,
            );
        }
        push(
            &mut elements,
            d,
            VehicleElementKind::Deadhead { distance: dh.distance },
            (location, trip.from),
            (departure, trip.start_time),
            vehicle_type.drive_consumption(dh.distance),
            dh.distance as f64 * cost_per_meter,
        );
        push(
            &mut elements,
            d,
            VehicleElementKind::Trip(trip.idx),
            (trip.from, trip.to),
            (trip.start_time, trip.end_time),
            vehicle_type.drive_consumption(trip.distance),
            trip.distance as f64 * cost_per_meter,
        );
        location = trip.to;
        time = Some(trip.end_time);
    }

    let dh = *instance.deadhead(location, instance.depot()).unwrap();
    let end = time.unwrap();
    push(
        &mut elements,
        d,
        VehicleElementKind::Deadhead { distance: dh.distance },
        (location, instance.depot()),
        (end, end + dh.duration),
        vehicle_type.drive_consumption(dh.distance),
        dh.distance as f64 * cost_per_meter,
    );

    VehicleTask::new(elements, instance, &d.config).unwrap()
}

fn push(
    elements: &mut Vec<VehicleElement>,
    d: &TestData,
    kind: VehicleElementKind,
    (from, to): (LocationIdx, LocationIdx),
    (start_time, end_time): (Time, Time),
    soc_drop: Soc,
    cost: Cost,
) {
    let start_soc = elements
        .last()
        .map(|e| e.end_soc)
        .unwrap_or(d.instance.vehicle_type().start_soc);
    elements.push(VehicleElement {
        kind,
        from,
        to,
        start_time,
        end_time,
        start_soc,
        end_soc: start_soc - soc_drop,
        cost,
    });
}
