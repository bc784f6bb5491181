use model::base_types::{BlockIdx, LocationIdx};
use model::config::CrewRules;
use model::descriptor::{Descriptor, DescriptorHalf};
use model::test_utilities::init_test_data;
use time::Time;

use crate::block::{blocks_of, BlockRegistry};
use crate::crew_duty::{CrewDuty, DutyElement, DutyElementKind, DutyType};
use crate::test_utilities::task_from_trips;

use super::{DualPrices, SavingsInterval};

fn descriptor(from: usize, start: &str, to: usize, end: &str) -> Descriptor {
    Descriptor::new(
        LocationIdx(from),
        Time::new(start),
        LocationIdx(to),
        Time::new(end),
    )
}

#[test]
fn savings_interval_contains_zero() {
    // ARRANGE
    let half = DescriptorHalf::new(LocationIdx(1), Time::new("8:00"));
    let mut prices = DualPrices::new(
        vec![0.0; 4],
        [
            (descriptor(1, "8:00", 2, "9:00"), -5.0),
            (descriptor(1, "8:00", 0, "10:00"), 3.0),
            (descriptor(2, "8:00", 0, "10:00"), 4.0),
        ],
    );

    // ACT
    let both = prices.savings_from(&half);
    let positive = prices.savings_from(&DescriptorHalf::new(LocationIdx(2), Time::new("8:00")));
    let unknown = prices.savings_from(&DescriptorHalf::new(LocationIdx(1), Time::new("8:01")));
    prices.set_block(descriptor(1, "8:00", 2, "9:00"), 1.0);
    let updated = prices.savings_from(&half);

    // ASSERT
    assert_eq!(both, SavingsInterval { min: -5.0, max: 3.0 });
    assert_eq!(positive, SavingsInterval { min: 0.0, max: 4.0 });
    assert_eq!(unknown, SavingsInterval::NONE);
    assert_eq!(updated, SavingsInterval { min: 0.0, max: 3.0 });
    assert_eq!(prices.block(&descriptor(1, "8:00", 2, "9:00")), 1.0);
    assert_eq!(prices.block(&descriptor(1, "8:00", 2, "9:01")), 0.0);
}

#[test]
fn task_reduced_cost_test() {
    // ARRANGE
    let d = init_test_data();
    let task = task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[2]]);
    let blocks = blocks_of(&task, &d.instance);
    let mut prices = DualPrices::zero(d.instance.trip_count());
    for t in 0..3 {
        prices.set_trip(d.trips[t], 10.0);
    }
    prices.set_trip(d.trips[5], 100.0);
    prices.set_block(blocks[0].descriptor, 2.0);
    prices.max_vehicles = 1.0;

    // ACT
    let reduced_cost = prices.task_reduced_cost(&task, &blocks);

    // ASSERT
    assert!((reduced_cost - (task.cost() - 30.0 - 2.0 + 1.0)).abs() < 1e-9);
    assert!(
        (DualPrices::zero(d.instance.trip_count()).task_reduced_cost(&task, &blocks) - task.cost())
            .abs()
            < 1e-9
    );
}

#[test]
fn duty_reduced_cost_test() {
    // ARRANGE
    let d = init_test_data();
    let rules = CrewRules::default();
    let mut registry = BlockRegistry::new();
    let task = task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[2]]);
    for block in blocks_of(&task, &d.instance) {
        registry.register(block);
    }
    let (depot, a) = (d.depot, d.loc_a);
    let stay = |kind, loc, start: &str, end: &str| {
        DutyElement::stationary(kind, loc, Time::new(start), Time::new(end))
    };
    let drive = |idx, from, to, start: &str, end: &str| DutyElement {
        kind: DutyElementKind::Block(BlockIdx(idx)),
        from,
        to,
        start_time: Time::new(start),
        end_time: Time::new(end),
    };
    let duty = CrewDuty::new(
        DutyType::Broken,
        vec![
            stay(DutyElementKind::SignOn, depot, "6:00", "6:05"),
            drive(0, depot, a, "6:05", "9:55"),
            stay(DutyElementKind::SignOff, a, "9:55", "10:00"),
            stay(DutyElementKind::LongIdle, a, "10:00", "13:00"),
            stay(DutyElementKind::SignOn, a, "13:00", "13:05"),
            drive(1, a, depot, "13:05", "16:55"),
            stay(DutyElementKind::SignOff, depot, "16:55", "17:00"),
        ],
        &rules,
    )
    .unwrap();
    let mut prices = DualPrices::zero(d.instance.trip_count());
    prices.set_block(registry.get(BlockIdx(0)).descriptor, -3.0);
    prices.set_block(registry.get(BlockIdx(1)).descriptor, -4.0);
    prices.average_length = 10.0;
    prices.broken_duties = 100.0;
    prices.long_duties = 1.0;
    prices.between_duties = 50.0;
    prices.max_duties = 2.0;

    // ACT
    let reduced_cost = prices.duty_reduced_cost(&duty, &registry, &rules);

    // ASSERT
    // 640 - 7 (blocks) + 0 (average) + 70 (broken) - 0.15 (long) - 5 (between) + 2
    assert!((reduced_cost - 699.85).abs() < 1e-9);
}
