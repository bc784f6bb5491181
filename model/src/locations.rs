use time::Duration;

use crate::base_types::LocationIdx;
use crate::charging_curve::ChargingCurve;

/// A stop or depot of the network. Immutable after loading.
#[derive(Debug, Clone)]
pub struct Location {
    pub idx: LocationIdx,
    pub id: String,
    pub handover_allowed: bool,
    pub break_allowed: bool,
    pub crew_base: bool,
    pub is_depot: bool,
    pub sign_on_time: Duration,
    pub sign_off_time: Duration,
    pub bruto_netto: Duration, // walking overhead deducted from every break taken here
    pub charging_curve: Option<ChargingCurve>,
}

impl Location {
    pub fn can_charge(&self) -> bool {
        self.charging_curve.is_some()
    }

    /// A crew change needs time to sign off the old and sign on the new driver.
    pub fn min_handover_time(&self) -> Duration {
        self.sign_on_time.max(self.sign_off_time)
    }

    /// Idling here does not drain the battery (vehicle is parked at a break room or a charger).
    pub fn free_idle(&self) -> bool {
        self.break_allowed || self.can_charge()
    }

    /// Whether an idle period of the given length allows a crew handover here.
    pub fn allows_handover(&self, idle: Duration) -> bool {
        self.handover_allowed && idle.is_positive() && idle >= self.min_handover_time()
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// Locations ////////////////////////////
/////////////////////////////////////////////////////////////////////

/// All locations, addressed by `LocationIdx`.
#[derive(Debug, Clone)]
pub struct Locations {
    locations: Vec<Location>,
}

// static functions
impl Locations {
    pub fn new(locations: Vec<Location>) -> Locations {
        debug_assert!(locations.iter().enumerate().all(|(i, l)| l.idx.0 == i));
        Locations { locations }
    }
}

// methods
impl Locations {
    pub fn get(&self, idx: LocationIdx) -> &Location {
        &self.locations[idx.0]
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn find(&self, id: &str) -> Option<LocationIdx> {
        self.locations.iter().find(|l| l.id == id).map(|l| l.idx)
    }

    pub fn chargers(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter().filter(|l| l.can_charge())
    }
}
