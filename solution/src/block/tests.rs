use itertools::assert_equal;
use model::base_types::BlockIdx;
use model::descriptor::Descriptor;
use model::test_utilities::init_test_data;
use time::{Duration, Time};

use crate::test_utilities::task_from_trips;
use crate::vehicle_task::VehicleTask;

use super::{blocks_of, BlockRegistry};

#[test]
fn unit_task_is_one_block() {
    // ARRANGE
    let d = init_test_data();
    let task = VehicleTask::unit(d.trips[0], &d.instance, &d.config).unwrap();

    // ACT
    let blocks = blocks_of(&task, &d.instance);

    // ASSERT
    assert_eq!(blocks.len(), 1);
    assert_eq!(
        blocks[0].descriptor,
        Descriptor::new(d.depot, Time::new("5:50"), d.depot, Time::new("6:55"))
    );
    assert_equal(blocks[0].trips.iter().copied(), [d.trips[0]]);
    assert_eq!(blocks[0].duration(), Duration::new("1:05"));
}

#[test]
fn split_at_handover_idle_only() {
    // ARRANGE
    let d = init_test_data();
    // idles 20 minutes at B (no handover) and 20 minutes at A (handover after 5 minutes)
    let task = task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[2]]);

    // ACT
    let blocks = blocks_of(&task, &d.instance);

    // ASSERT
    assert_eq!(blocks.len(), 2);
    assert_eq!(
        blocks[0].descriptor,
        Descriptor::new(d.depot, Time::new("5:50"), d.loc_a, Time::new("7:40"))
    );
    assert_eq!(
        blocks[1].descriptor,
        Descriptor::new(d.loc_a, Time::new("8:00"), d.depot, Time::new("8:55"))
    );
    assert_equal(blocks[0].trips.iter().copied(), [d.trips[0], d.trips[1]]);
    assert_equal(blocks[1].trips.iter().copied(), [d.trips[2]]);
}

#[test]
fn registry_deduplicates_by_descriptor() {
    // ARRANGE
    let d = init_test_data();
    let mut registry = BlockRegistry::new();
    let first = task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[2]]);
    let second = task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[4]]);

    // ACT
    let registered: Vec<(BlockIdx, bool)> = blocks_of(&first, &d.instance)
        .into_iter()
        .chain(blocks_of(&second, &d.instance))
        .map(|b| registry.register(b))
        .collect();

    // ASSERT
    assert_eq!(registry.len(), 3);
    assert_equal(
        registered,
        [
            (BlockIdx(0), true),
            (BlockIdx(1), true),
            (BlockIdx(0), false),
            (BlockIdx(2), true),
        ],
    );
    let descriptor = registry.get(BlockIdx(2)).descriptor;
    assert_eq!(registry.find(&descriptor), Some(BlockIdx(2)));
    assert_eq!(descriptor.start.time, Time::new("10:30"));
}
