use std::sync::Arc;

use crate::base_types::{LocationIdx, TripIdx};
use crate::config::Config;
use crate::instance::Instance;
use crate::json_serialisation::load_instance_from_json;
use crate::network::VehicleNetwork;

pub struct TestData {
    pub instance: Arc<Instance>,
    pub config: Arc<Config>,
    pub network: Arc<VehicleNetwork>,
    pub depot: LocationIdx,
    pub loc_a: LocationIdx,
    pub loc_b: LocationIdx,
    pub loc_c: LocationIdx,
    pub trips: Vec<TripIdx>, // t0 .. t7, alternating A->B and B->A
}

/// Eight trips shuttling between A and B, a depot D and a charger C.
pub fn init_test_data() -> TestData {
    init_test_data_with_config(test_config())
}

pub fn init_test_data_with_config(config: Config) -> TestData {
    let input: serde_json::Value =
        serde_json::from_str(include_str!("../resources/test_instance.json")).unwrap();
    test_data_from_json(input, config)
}

pub fn test_data_from_json(input: serde_json::Value, config: Config) -> TestData {
    let instance = Arc::new(load_instance_from_json(input, config.vehicle.kwh_cost).unwrap());
    let config = Arc::new(config);
    let network = Arc::new(VehicleNetwork::new(instance.clone(), &config));
    let location = |id: &str| instance.locations().find(id).unwrap_or(instance.depot());
    TestData {
        depot: instance.depot(),
        loc_a: location("A"),
        loc_b: location("B"),
        loc_c: location("C"),
        trips: (0..instance.trip_count())
            .map(|i| instance.find_trip(&format!("t{}", i)).unwrap_or(TripIdx(i)))
            .collect(),
        instance,
        config,
        network,
    }
}

/// Production defaults, quiet and with a fixed seed.
pub fn test_config() -> Config {
    Config {
        verbose: false,
        seed: 42,
        ..Config::default()
    }
}
