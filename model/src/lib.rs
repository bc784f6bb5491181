pub mod base_types;
pub mod charging_curve;
pub mod config;
pub mod cover_set;
pub mod deadheads;
pub mod descriptor;
pub mod instance;
pub mod json_serialisation;
pub mod locations;
pub mod network;
pub mod test_utilities;
pub mod trips;
pub mod vehicle_type;
