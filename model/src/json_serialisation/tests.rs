use serde_json::json;
use time::Time;

use super::load_instance_from_json;

fn small_instance() -> serde_json::Value {
    json!({
        "vehicleType": {
            "id": "vt", "capacityKwh": 200.0, "driveUsagePerKm": 1.0, "idleUsagePerHour": 0.0,
            "minSoc": 10.0, "maxSoc": 100.0, "startSoc": 90.0
        },
        "chargingCurve": [[0.0, 0.02], [80.0, 0.005]],
        "locations": [
            { "id": "D", "depot": true, "canCharge": true },
            { "id": "A", "crewBase": true, "handoverAllowed": true },
            { "id": "B" }
        ],
        "depot": "D",
        "trips": [
            { "id": "late", "from": "B", "to": "A", "startTime": "09:00", "endTime": "09:30",
              "distanceInMeter": 10000 },
            { "id": "early", "from": "A", "to": "B", "startTime": "08:00", "endTime": "08:30",
              "distanceInMeter": 10000 }
        ],
        "deadheads": [
            { "from": "D", "to": "A", "durationInSeconds": 600, "distanceInMeter": 5000 },
            { "from": "D", "to": "B", "durationInSeconds": 600, "distanceInMeter": 5000 }
        ]
    })
}

#[test]
fn trips_are_indexed_by_start_time() {
    // ACT
    let instance = load_instance_from_json(small_instance(), 0.3).unwrap();

    // ASSERT
    itertools::assert_equal(
        instance.trips().iter().map(|t| t.id.as_str()),
        ["early", "late"],
    );
    assert_eq!(instance.trips()[0].start_time, Time::new("8:00"));
    let depot = instance.location(instance.depot());
    assert!(depot.is_depot);
    assert!(depot.charging_curve.is_some());
    assert!(instance
        .location(instance.locations().find("B").unwrap())
        .charging_curve
        .is_none());
}

#[test]
fn unknown_location_is_reported_by_id() {
    // ARRANGE
    let mut input = small_instance();
    input["trips"][0]["to"] = json!("X");

    // ACT
    let result = load_instance_from_json(input, 0.3);

    // ASSERT
    assert_eq!(result.err(), Some("unknown location 'X'".to_string()));
}

#[test]
fn trip_ending_before_its_start_is_rejected() {
    // ARRANGE
    let mut input = small_instance();
    input["trips"][1]["endTime"] = json!("07:30");

    // ACT
    let result = load_instance_from_json(input, 0.3);

    // ASSERT
    assert!(result.unwrap_err().contains("early has non-positive duration"));
}

#[test]
fn depot_has_to_be_flagged() {
    // ARRANGE
    let mut input = small_instance();
    input["depot"] = json!("A");

    // ACT
    let result = load_instance_from_json(input, 0.3);

    // ASSERT
    assert!(result.unwrap_err().contains("not flagged"));
}

#[test]
fn malformed_charging_curve_is_rejected() {
    // ARRANGE
    let mut input = small_instance();
    input["chargingCurve"] = json!([[0.0, 0.02], [50.0, -0.01]]);

    // ACT
    let result = load_instance_from_json(input, 0.3);

    // ASSERT
    assert!(result.unwrap_err().contains("negative charging rate"));
}
