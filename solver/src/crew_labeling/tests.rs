use std::sync::Arc;

use im::Vector;
use model::base_types::BlockIdx;
use model::descriptor::Descriptor;
use model::test_utilities::{init_test_data, TestData};
use solution::block::{Block, BlockRegistry};
use solution::crew_duty::{DutyElementKind, DutyType};
use solution::crew_rules::BreakSpan;
use solution::dual_prices::DualPrices;
use time::{Duration, Time};

use super::{CrewLabel, CrewLabeling};
use crate::crew_network::CrewNetwork;

fn registry(blocks: &[(usize, &str, usize, &str)], d: &TestData) -> BlockRegistry {
    let locations = [d.depot, d.loc_a, d.loc_b, d.loc_c];
    let mut registry = BlockRegistry::new();
    for (from, start, to, end) in blocks.iter() {
        registry.register(Block {
            descriptor: Descriptor::new(
                locations[*from],
                Time::new(start),
                locations[*to],
                Time::new(end),
            ),
            trips: vec![],
        });
    }
    registry
}

fn labeling(d: &TestData, registry: &BlockRegistry) -> CrewLabeling {
    let network = CrewNetwork::new(
        d.instance.clone(),
        &d.config.crew,
        registry,
        (0..registry.len()).map(BlockIdx),
    );
    CrewLabeling::new(Arc::new(network), d.config.clone())
}

fn duals_for(registry: &BlockRegistry, value: f64) -> DualPrices {
    DualPrices::new(
        vec![],
        registry.iter().map(|(_, block)| (block.descriptor, value)),
    )
}

fn label(breaks: &[(&str, &str)], block_duals: f64) -> CrewLabel {
    CrewLabel {
        position: 1,
        parent: None,
        start: Time::new("6:00"),
        rest_end: Time::new("6:00"),
        max_steering: Duration::new("2:00"),
        long_idle: None,
        breaks: breaks
            .iter()
            .map(|(start, net)| BreakSpan {
                start: Time::new(start),
                net: Duration::new(net),
            })
            .collect::<Vector<_>>(),
        block_duals,
    }
}

#[test]
fn two_blocks_with_break_form_early_duty() {
    // ARRANGE
    let d = init_test_data();
    // depot -> A, break at A, A -> depot
    let registry = registry(&[(0, "6:00", 1, "7:40"), (1, "8:00", 0, "9:00")], &d);
    let duals = duals_for(&registry, -2000.0);

    // ACT
    let columns = labeling(&d, &registry).generate_crew_columns(&duals);

    // ASSERT
    assert_eq!(columns.len(), 3);
    let best = &columns[0];
    assert_eq!(best.column.duty_type(), DutyType::Early);
    itertools::assert_equal(best.column.blocks().iter().copied(), vec![BlockIdx(0), BlockIdx(1)]);
    assert_eq!(best.column.paid_duration(), Duration::new("3:10"));
    let expected = 100.0 + 65.0 * (190.0 / 60.0) - 4000.0;
    assert!((best.reduced_cost - expected).abs() < 1e-6);
    assert!(columns.iter().all(|c| c.column.violations(&d.config.crew).is_empty()));
}

#[test]
fn long_idle_at_crew_base_yields_broken_duty() {
    // ARRANGE
    let d = init_test_data();
    let registry = registry(&[(0, "6:00", 0, "9:30"), (0, "13:00", 0, "16:00")], &d);
    let mut duals = duals_for(&registry, -2000.0);
    duals.broken_duties = 50.0;
    duals.average_length = 10.0;

    // ACT
    let columns = labeling(&d, &registry).generate_crew_columns(&duals);

    // ASSERT
    let broken = columns
        .iter()
        .find(|c| c.column.blocks().len() == 2)
        .unwrap();
    assert_eq!(broken.column.duty_type(), DutyType::Broken);
    // 5:55 - 16:05 minus the unpaid 9:35 - 12:55
    assert_eq!(broken.column.paid_duration(), Duration::new("6:50"));
    assert!(broken
        .column
        .elements()
        .iter()
        .any(|e| e.kind == DutyElementKind::LongIdle));
    let recomputed = duals.duty_reduced_cost(&broken.column, &registry, &d.config.crew);
    assert!((broken.reduced_cost - recomputed).abs() < 1e-6);
}

#[test]
fn duties_without_enough_breaks_are_not_generated() {
    // ARRANGE
    let d = init_test_data();
    // 5:55 - 11:05 without a break, and B is no crew base for the single blocks
    let registry = registry(&[(0, "6:00", 2, "8:30"), (2, "8:40", 0, "11:00")], &d);
    let duals = duals_for(&registry, -2000.0);

    // ACT
    let columns = labeling(&d, &registry).generate_crew_columns(&duals);

    // ASSERT
    assert!(columns.is_empty());
}

#[test]
fn positive_reduced_costs_give_no_columns() {
    // ARRANGE
    let d = init_test_data();
    let registry = registry(&[(0, "6:00", 1, "7:40"), (1, "8:00", 0, "9:00")], &d);
    let duals = duals_for(&registry, 0.0);

    // ACT
    let columns = labeling(&d, &registry).generate_crew_columns(&duals);

    // ASSERT
    assert!(columns.is_empty());
}

#[test]
fn more_break_time_and_lower_cost_dominates() {
    // ARRANGE
    let d = init_test_data();
    let rules = &d.config.crew;
    let rested = label(&[("8:00", "0:25"), ("10:00", "0:20")], -10.0);
    let tired = label(&[("8:00", "0:20")], -5.0);
    let rested_but_expensive = label(&[("8:00", "0:25"), ("10:00", "0:20")], 0.0);

    // ACT & ASSERT
    assert!(rested.dominates(&tired, rules));
    assert!(!tired.dominates(&rested, rules));
    assert!(!rested_but_expensive.dominates(&tired, rules));
}

#[test]
fn labels_with_different_start_do_not_compete() {
    // ARRANGE
    let d = init_test_data();
    let first = label(&[], -10.0);
    let mut later = label(&[], -5.0);
    later.start = Time::new("6:30");
    later.rest_end = Time::new("6:30");

    // ACT & ASSERT
    assert!(!first.dominates(&later, &d.config.crew));
    assert!(!later.dominates(&first, &d.config.crew));
}
