use time::Time;

use crate::base_types::{LocationIdx, TripIdx};
use crate::deadheads::{DeadheadTemplate, Deadheads};
use crate::locations::{Location, Locations};
use crate::trips::Trip;
use crate::vehicle_type::VehicleType;

/// Read-only problem data of one run.
#[derive(Debug, Clone)]
pub struct Instance {
    locations: Locations,
    trips: Vec<Trip>,
    vehicle_type: VehicleType,
    deadheads: Deadheads,
    depot: LocationIdx,
}

// static functions
impl Instance {
    /// Trips are re-indexed by (start time, end time) so that trip order is a topological
    /// order of the vehicle network.
    pub fn new(
        locations: Locations,
        mut trips: Vec<Trip>,
        vehicle_type: VehicleType,
        deadheads: Deadheads,
        depot: LocationIdx,
    ) -> Result<Instance, String> {
        if depot.0 >= locations.len() {
            return Err(format!("depot {} is not a location", depot));
        }
        if !locations.get(depot).is_depot {
            return Err(format!(
                "location {} is used as depot but not flagged as one",
                locations.get(depot).id
            ));
        }
        if vehicle_type.min_soc > vehicle_type.start_soc
            || vehicle_type.start_soc > vehicle_type.max_soc
        {
            return Err(format!(
                "vehicle type {} needs min_soc <= start_soc <= max_soc",
                vehicle_type.id
            ));
        }
        for trip in trips.iter() {
            if !trip.duration().is_positive() {
                return Err(format!("trip {} has non-positive duration", trip.id));
            }
            if trip.from.0 >= locations.len() || trip.to.0 >= locations.len() {
                return Err(format!("trip {} uses an unknown location", trip.id));
            }
        }
        trips.sort_by_key(|t| (t.start_time, t.end_time));
        for (i, trip) in trips.iter_mut().enumerate() {
            trip.idx = TripIdx(i);
        }
        Ok(Instance {
            locations,
            trips,
            vehicle_type,
            deadheads,
            depot,
        })
    }
}

// methods
impl Instance {
    pub fn locations(&self) -> &Locations {
        &self.locations
    }

    pub fn location(&self, idx: LocationIdx) -> &Location {
        self.locations.get(idx)
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn trip(&self, idx: TripIdx) -> &Trip {
        &self.trips[idx.0]
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    pub fn find_trip(&self, id: &str) -> Option<TripIdx> {
        self.trips.iter().find(|t| t.id == id).map(|t| t.idx)
    }

    pub fn vehicle_type(&self) -> &VehicleType {
        &self.vehicle_type
    }

    pub fn deadhead(&self, from: LocationIdx, to: LocationIdx) -> Option<&DeadheadTemplate> {
        self.deadheads.get(from, to)
    }

    pub fn depot(&self) -> LocationIdx {
        self.depot
    }

    /// Earliest possible pull-out over all trips (None without any reachable trip).
    pub fn service_day_start(&self) -> Option<Time> {
        self.trips
            .iter()
            .filter_map(|t| {
                self.deadhead(self.depot, t.from)
                    .map(|dh| t.start_time - dh.duration)
            })
            .min()
    }

    /// Latest possible pull-in over all trips.
    pub fn service_day_end(&self) -> Option<Time> {
        self.trips
            .iter()
            .filter_map(|t| self.deadhead(t.to, self.depot).map(|dh| t.end_time + dh.duration))
            .max()
    }
}
