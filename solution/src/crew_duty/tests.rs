use itertools::assert_equal;
use model::base_types::{BlockIdx, LocationIdx};
use model::config::CrewRules;
use model::test_utilities::init_test_data;
use time::{Duration, Time};

use crate::block::{blocks_of, BlockRegistry};
use crate::crew_rules::Violation;
use crate::test_utilities::task_from_trips;

use super::{CrewDuty, DutyElement, DutyElementKind, DutyType};

fn element(
    kind: DutyElementKind,
    from: LocationIdx,
    to: LocationIdx,
    start: &str,
    end: &str,
) -> DutyElement {
    DutyElement {
        kind,
        from,
        to,
        start_time: Time::new(start),
        end_time: Time::new(end),
    }
}

fn broken_elements(depot: LocationIdx, hub: LocationIdx) -> Vec<DutyElement> {
    vec![
        element(DutyElementKind::SignOn, depot, depot, "6:00", "6:05"),
        element(DutyElementKind::Block(BlockIdx(0)), depot, hub, "6:05", "9:55"),
        element(DutyElementKind::SignOff, hub, hub, "9:55", "10:00"),
        element(DutyElementKind::LongIdle, hub, hub, "10:00", "13:00"),
        element(DutyElementKind::SignOn, hub, hub, "13:00", "13:05"),
        element(DutyElementKind::Block(BlockIdx(1)), hub, depot, "13:05", "16:55"),
        element(DutyElementKind::SignOff, depot, depot, "16:55", "17:00"),
    ]
}

#[test]
fn single_duty_test() {
    // ARRANGE
    let d = init_test_data();
    let rules = CrewRules::default();
    let task = task_from_trips(&d, &[d.trips[0]]);
    let mut registry = BlockRegistry::new();
    let (idx, _) = registry.register(blocks_of(&task, &d.instance).remove(0));

    // ACT
    let duty = CrewDuty::single(
        idx,
        registry.get(idx),
        Duration::new("0:05"),
        Duration::new("0:05"),
        &rules,
    );

    // ASSERT
    assert_eq!(duty.duty_type(), DutyType::Single);
    assert_eq!(duty.start_time(), Time::new("5:45"));
    assert_eq!(duty.end_time(), Time::new("7:00"));
    assert_eq!(duty.paid_duration(), Duration::new("1:15"));
    assert!((duty.cost() - 1081.25).abs() < 1e-9);
    assert_equal(duty.blocks().iter().copied(), [idx]);
    assert!(duty.violations(&rules).is_empty());
}

#[test]
fn broken_duty_test() {
    // ARRANGE
    let d = init_test_data();
    let rules = CrewRules::default();

    // ACT
    let duty = CrewDuty::new(DutyType::Broken, broken_elements(d.depot, d.loc_a), &rules).unwrap();

    // ASSERT
    assert_eq!(duty.paid_duration(), Duration::new("8:00"));
    assert!((duty.cost() - 640.0).abs() < 1e-9);
    assert!(!duty.is_long(&rules));
    let shape = duty.shape();
    assert_eq!(shape.max_steering, Duration::new("3:55"));
    assert_eq!(shape.long_idle, Some((Time::new("10:00"), Time::new("13:00"))));
    assert!(duty.violations(&rules).is_empty());
    assert!(duty.covers(BlockIdx(1)));
    assert_eq!(duty.block_set(3).count(), 2);

    let coefficients = duty.aggregate_coefficients(&rules);
    assert!(coefficients.average_length.abs() < 1e-9);
    assert!((coefficients.long - 0.15).abs() < 1e-9);
    assert!((coefficients.broken + 0.7).abs() < 1e-9);
    assert!((coefficients.between - 0.1).abs() < 1e-9);
}

#[test]
fn construction_errors() {
    let d = init_test_data();
    let rules = CrewRules::default();

    // long idle outside a broken duty
    assert!(CrewDuty::new(DutyType::Late, broken_elements(d.depot, d.loc_a), &rules).is_err());

    // gap between elements
    let mut elements = broken_elements(d.depot, d.loc_a);
    elements[3].end_time = Time::new("12:55");
    assert!(CrewDuty::new(DutyType::Broken, elements, &rules).is_err());

    // no block
    let sign_on = element(DutyElementKind::SignOn, d.depot, d.depot, "6:00", "6:05");
    assert!(CrewDuty::new(DutyType::Early, vec![sign_on], &rules).is_err());
}

#[test]
fn steering_time_since_last_break() {
    // ARRANGE
    let d = init_test_data();
    let rules = CrewRules::default();
    let (depot, a) = (d.depot, d.loc_a);
    let elements = vec![
        element(DutyElementKind::SignOn, depot, depot, "6:00", "6:05"),
        element(DutyElementKind::Block(BlockIdx(0)), depot, a, "6:05", "8:00"),
        element(DutyElementKind::Idle, a, a, "8:00", "8:10"),
        element(DutyElementKind::Block(BlockIdx(1)), a, a, "8:10", "10:30"),
        element(
            DutyElementKind::Break {
                net: Duration::new("0:43"),
            },
            a,
            a,
            "10:30",
            "11:15",
        ),
        element(DutyElementKind::Block(BlockIdx(2)), a, depot, "11:15", "12:55"),
        element(DutyElementKind::SignOff, depot, depot, "12:55", "13:00"),
    ];

    // ACT
    let duty = CrewDuty::new(DutyType::Early, elements, &rules).unwrap();

    // ASSERT
    assert_eq!(duty.shape().max_steering, Duration::new("4:30"));
    assert_eq!(
        duty.violations(&rules),
        vec![Violation::SteeringTooLong(Duration::new("0:30"))]
    );
}
