use std::collections::HashSet;
use std::sync::Arc;

use model::base_types::BlockIdx;
use model::config::{AnnealingConfig, CrewGeneratorWeights, VehicleGeneratorWeights};
use model::descriptor::Descriptor;
use model::test_utilities::{init_test_data_with_config, test_config, TestData};
use rand::rngs::StdRng;
use rand::SeedableRng;
use solution::block::{Block, BlockRegistry};
use solution::dual_prices::DualPrices;
use time::Time;

use super::{
    crew_generators, generate_crew_batch, generate_vehicle_batch, vehicle_generators,
    GeneratorMix, VehicleColumnGenerator,
};
use crate::crew_network::CrewNetwork;
use crate::vehicle_labeling::VehicleLabeling;
use crate::vehicle_local_search::VehicleLocalSearch;

fn quick_data() -> TestData {
    let mut config = test_config();
    let annealing = AnnealingConfig {
        starting_temperature: 50.0,
        ending_temperature: 0.01,
        cooling_rate: 0.9,
        iterations: 1000,
    };
    config.vehicle_local_search.single.annealing = annealing.clone();
    config.vehicle_local_search.global.annealing = annealing.clone();
    config.crew_local_search.annealing = annealing;
    config.vehicle_labeling.min_trips = 1;
    init_test_data_with_config(config)
}

fn vehicle_mix(
    d: &TestData,
    weights: VehicleGeneratorWeights,
) -> GeneratorMix<dyn VehicleColumnGenerator> {
    vehicle_generators(
        Arc::new(VehicleLabeling::new(d.network.clone(), d.config.clone())),
        Arc::new(VehicleLocalSearch::new(d.network.clone(), d.config.clone())),
        &weights,
    )
    .unwrap()
}

#[test]
fn generators_without_weight_are_never_drawn() {
    // ARRANGE
    let d = quick_data();
    let mix = vehicle_mix(
        &d,
        VehicleGeneratorWeights {
            labeling: 0.0,
            local_search_single: 0.0,
            local_search_global: 3.0,
        },
    );
    let mut rng = StdRng::seed_from_u64(1);

    // ACT
    let draws = mix.draw(5, &mut rng);

    // ASSERT
    assert_eq!(mix.len(), 1);
    assert_eq!(draws.len(), 5);
    assert!(draws
        .iter()
        .all(|(g, _)| g.name() == "vehicle local search (global)"));
    let seeds: HashSet<u64> = draws.iter().map(|(_, s)| *s).collect();
    assert_eq!(seeds.len(), 5);
}

#[test]
fn all_weights_zero_is_an_error() {
    // ARRANGE
    let weighted: Vec<(Arc<dyn VehicleColumnGenerator>, f64)> = vec![];

    // ACT
    let mix = GeneratorMix::new(weighted);

    // ASSERT
    assert!(mix.is_err());
}

#[test]
fn vehicle_batch_merges_instances_and_skips_known_sets() {
    // ARRANGE
    let d = quick_data();
    let mix = vehicle_mix(
        &d,
        VehicleGeneratorWeights {
            labeling: 1.0,
            local_search_single: 1.0,
            local_search_global: 1.0,
        },
    );
    let duals = DualPrices::new(vec![1000.0; d.instance.trip_count()], vec![]);
    let labeled = VehicleLabeling::new(d.network.clone(), d.config.clone())
        .generate_vehicle_columns(&duals);
    let known: HashSet<_> = labeled
        .iter()
        .take(1)
        .map(|c| c.column.trips().clone())
        .collect();
    let mut rng = StdRng::seed_from_u64(2);

    // ACT
    let columns = generate_vehicle_batch(&mix, &duals, &known, 4, &mut rng).unwrap();

    // ASSERT
    assert!(!columns.is_empty());
    let sets: HashSet<_> = columns.iter().map(|c| c.column.trips().clone()).collect();
    assert_eq!(sets.len(), columns.len());
    assert!(sets.is_disjoint(&known));
    assert!(columns
        .windows(2)
        .all(|w| w[0].reduced_cost <= w[1].reduced_cost));
}

#[test]
fn crew_batch_keeps_each_block_set_once() {
    // ARRANGE
    let d = quick_data();
    let mut registry = BlockRegistry::new();
    for (from, start, to, end) in [
        (d.depot, "6:00", d.loc_a, "7:40"),
        (d.loc_a, "8:00", d.depot, "9:00"),
    ] {
        registry.register(Block {
            descriptor: Descriptor::new(from, Time::new(start), to, Time::new(end)),
            trips: vec![],
        });
    }
    let duals = DualPrices::new(
        vec![],
        registry.iter().map(|(_, block)| (block.descriptor, -2000.0)),
    );
    let network = Arc::new(CrewNetwork::new(
        d.instance.clone(),
        &d.config.crew,
        &registry,
        (0..registry.len()).map(BlockIdx),
    ));
    let mix = crew_generators(
        network,
        d.config.clone(),
        &CrewGeneratorWeights {
            labeling: 1.0,
            local_search: 1.0,
        },
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(4);

    // ACT
    let columns = generate_crew_batch(&mix, &duals, 6, &mut rng).unwrap();

    // ASSERT
    let sets: HashSet<Vec<BlockIdx>> = columns
        .iter()
        .map(|c| c.column.blocks().to_vec())
        .collect();
    assert_eq!(sets.len(), columns.len());
    itertools::assert_equal(
        columns[0].column.blocks().iter().copied(),
        vec![BlockIdx(0), BlockIdx(1)],
    );
}
