use itertools::assert_equal;
use model::base_types::BlockIdx;
use model::test_utilities::init_test_data;
use time::Duration;

use crate::crew_duty::{CrewDuty, DutyType};
use crate::test_utilities::task_from_trips;

use super::{ColumnPool, Insertion};

#[test]
fn unit_columns_test() {
    // ARRANGE
    let d = init_test_data();

    // ACT
    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();

    // ASSERT
    assert_eq!(pool.task_count(), 8);
    assert_eq!(pool.blocks().len(), 8);
    assert_eq!(pool.duty_count(), 8);
    assert!(pool.tasks().iter().all(|c| c.unit && c.blocks.len() == 1));
    assert!(pool
        .duties()
        .iter()
        .all(|c| c.unit && c.duty.duty_type() == DutyType::Single));
    assert_equal(pool.tasks_covering(d.trips[3]), [3]);
}

#[test]
fn tasks_are_deduplicated() {
    // ARRANGE
    let d = init_test_data();
    let mut pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();

    // ACT
    let duplicate = pool.add_task(task_from_trips(&d, &[d.trips[0]]), false);
    let new = pool.add_task(
        task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[2]]),
        false,
    );
    let shares_block = pool.add_task(
        task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[4]]),
        false,
    );

    // ASSERT
    assert_eq!(duplicate.outcome, Insertion::Rejected);
    assert!(duplicate.new_blocks.is_empty());
    assert_eq!(new.outcome, Insertion::Added(8));
    assert_equal(new.new_blocks.iter().copied(), [BlockIdx(8), BlockIdx(9)]);
    assert_equal(new.new_duties.iter().copied(), [8, 9]);
    assert_eq!(shares_block.outcome, Insertion::Added(9));
    assert_equal(shares_block.new_blocks.iter().copied(), [BlockIdx(10)]);
    assert_eq!(pool.known_trip_sets().len(), 10);
}

#[test]
fn cheaper_duty_replaces() {
    // ARRANGE
    let d = init_test_data();
    let mut pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let block = pool.blocks().get(BlockIdx(0)).clone();
    let rules = &d.config.crew;
    let longer = CrewDuty::single(
        BlockIdx(0),
        &block,
        Duration::new("0:10"),
        Duration::new("0:10"),
        rules,
    );
    let shorter = CrewDuty::single(
        BlockIdx(0),
        &block,
        Duration::new("0:01"),
        Duration::new("0:01"),
        rules,
    );

    // ACT
    let more_expensive = pool.add_duty(longer, false);
    let cheaper = pool.add_duty(shorter.clone(), false);

    // ASSERT
    assert_eq!(more_expensive, Insertion::Rejected);
    assert_eq!(cheaper, Insertion::Replaced(0));
    assert_eq!(pool.duty(0).duty, shorter);
    assert!(pool.duty(0).unit);
    assert_eq!(pool.duty_count(), 8);
}

#[test]
fn retain_keeps_unit_columns() {
    // ARRANGE
    let d = init_test_data();
    let mut pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    pool.add_task(
        task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[2]]),
        false,
    );
    pool.add_task(
        task_from_trips(&d, &[d.trips[5], d.trips[6], d.trips[7]]),
        false,
    );

    // ACT
    pool.retain_tasks(|i, _| i == 9);
    pool.retain_duties(|_, _| false);

    // ASSERT
    assert_eq!(pool.task_count(), 9);
    assert!(pool.task(8).task.covers(d.trips[6]));
    assert_eq!(pool.duty_count(), pool.blocks().len());
    // the key index is rebuilt: the removed task can come back
    let again = pool.add_task(
        task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[2]]),
        false,
    );
    assert_eq!(again.outcome, Insertion::Added(9));
}

#[test]
fn blocks_of_tasks_is_block_set_of_crew() {
    // ARRANGE
    let d = init_test_data();
    let mut pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    pool.add_task(
        task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[2]]),
        false,
    );
    pool.add_task(
        task_from_trips(&d, &[d.trips[0], d.trips[1], d.trips[4]]),
        false,
    );

    // ACT
    let blocks = pool.blocks_of_tasks(&[8, 9, 3]);

    // ASSERT
    assert_equal(
        blocks,
        [BlockIdx(8), BlockIdx(9), BlockIdx(10), BlockIdx(3)],
    );
}
