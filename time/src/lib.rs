pub mod duration;
pub mod time_of_day;

pub use duration::Duration;
pub use time_of_day::Time;
