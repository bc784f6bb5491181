pub mod block;
pub mod column_pool;
pub mod crew_duty;
pub mod crew_rules;
pub mod dual_prices;
pub mod json_serialisation;
mod schedule;
pub mod test_utilities;
pub mod vehicle_task;

pub use schedule::Schedule;
