use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use model::test_utilities::init_test_data;
use solution::column_pool::ColumnPool;
use solution::dual_prices::DualPrices;
use solver::crew_labeling::CrewLabeling;
use solver::crew_network::CrewNetwork;
use solver::vehicle_labeling::VehicleLabeling;

pub fn labeling_benchmarks(c: &mut Criterion) {
    let d = init_test_data();
    let labeling = VehicleLabeling::new(d.network.clone(), d.config.clone());
    let zero = DualPrices::zero(d.instance.trip_count());
    let mut rewarded = DualPrices::zero(d.instance.trip_count());
    for trip in d.trips.iter() {
        rewarded.set_trip(*trip, 1000.0);
    }

    c.bench_function("vehicle_labeling_zero_duals", |b| {
        b.iter(|| labeling.generate_vehicle_columns(&zero))
    });

    c.bench_function("vehicle_labeling_rewarded_trips", |b| {
        b.iter(|| labeling.generate_vehicle_columns(&rewarded))
    });

    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let network = CrewNetwork::new(
        d.instance.clone(),
        &d.config.crew,
        pool.blocks(),
        pool.blocks().iter().map(|(idx, _)| idx),
    );
    let crew_labeling = CrewLabeling::new(Arc::new(network), d.config.clone());
    let mut block_duals = DualPrices::zero(d.instance.trip_count());
    for (_, block) in pool.blocks().iter() {
        block_duals.set_block(block.descriptor, -2000.0);
    }
    c.bench_function("crew_labeling_unit_blocks", |b| {
        b.iter(|| crew_labeling.generate_crew_columns(&block_duals))
    });
}

criterion_group!(benches, labeling_benchmarks);
criterion_main!(benches);
