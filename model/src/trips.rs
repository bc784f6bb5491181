use serde::{Deserialize, Serialize};
use time::{Duration, Time};

use crate::base_types::{LocationIdx, Meter, TripIdx};

/// Marks trips at which the timetable changes frequency. Deadheads flagged as
/// frequency-change-only (short-turn charging runs) may only be used around such trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrequencyChange {
    #[default]
    None,
    StartOfTrip,
    EndOfTrip,
    SingleTrip,
}

impl FrequencyChange {
    /// A frequency-change-only deadhead may leave after this trip.
    pub fn allows_departure(&self) -> bool {
        matches!(self, FrequencyChange::EndOfTrip | FrequencyChange::SingleTrip)
    }

    /// A frequency-change-only deadhead may arrive before this trip.
    pub fn allows_arrival(&self) -> bool {
        matches!(self, FrequencyChange::StartOfTrip | FrequencyChange::SingleTrip)
    }
}

#[derive(Debug, Clone)]
pub struct Trip {
    pub idx: TripIdx,
    pub id: String,
    pub from: LocationIdx,
    pub to: LocationIdx,
    pub start_time: Time,
    pub end_time: Time,
    pub distance: Meter,
    pub frequency_change: FrequencyChange,
}

impl Trip {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}
