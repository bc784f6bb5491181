pub mod columns;
pub mod crew_labeling;
pub mod crew_local_search;
pub mod crew_network;
pub mod generators;
pub mod master;
pub mod overcoverage;
pub mod test_utilities;
pub mod vehicle_expansion;
pub mod vehicle_labeling;
pub mod vehicle_local_search;
