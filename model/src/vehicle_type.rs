use time::Duration;

use crate::base_types::{Kwh, Meter, Soc};

/// The single vehicle type scheduled in a run. Consumption is expressed in SoC percent.
#[derive(Debug, Clone)]
pub struct VehicleType {
    pub id: String,
    pub capacity: Kwh,
    pub drive_usage: Soc, // per km
    pub idle_usage: Soc,  // per hour
    pub min_soc: Soc,
    pub max_soc: Soc,
    pub start_soc: Soc,
}

impl VehicleType {
    pub fn drive_consumption(&self, distance: Meter) -> Soc {
        distance as f64 / 1000.0 * self.drive_usage
    }

    pub fn idle_consumption(&self, duration: Duration) -> Soc {
        duration.in_hours() * self.idle_usage
    }

    pub fn soc_to_kwh(&self, soc: Soc) -> Kwh {
        soc * self.capacity / 100.0
    }
}
