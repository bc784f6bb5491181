
use std::fmt;
use std::ops::AddAssign;

use itertools::Itertools;
use model::base_types::{Cost, LocationIdx, Meter, Soc, TripIdx};
use model::config::Config;
use model::cover_set::CoverSet;
use model::instance::Instance;
use time::{Duration, Time};

const SOC_TOLERANCE: Soc = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleElementKind {
    Trip(TripIdx),
    Deadhead { distance: Meter },
    Idle,
    Charge { soc_gained: Soc },
}

/// One contiguous piece of a vehicle task. `cost` is the real cost of the piece, dual prices
/// are never folded in here.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleElement {
    pub kind: VehicleElementKind,
    pub from: LocationIdx,
    pub to: LocationIdx,
    pub start_time: Time,
    pub end_time: Time,
    pub start_soc: Soc,
    pub end_soc: Soc,
    pub cost: Cost,
}

impl VehicleElement {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn trip(&self) -> Option<TripIdx> {
        match self.kind {
            VehicleElementKind::Trip(t) => Some(t),
            _ => None,
        }
    }

    /// Idle and charge elements are the stationary parts of a task, the only places where a
    /// crew may be relieved.
    pub fn is_stationary(&self) -> bool {
        matches!(
            self.kind,
            VehicleElementKind::Idle | VehicleElementKind::Charge { .. }
        )
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// CostBreakdown ////////////////////////
/////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    pub pullout: Cost,
    pub trip_driving: Cost,
    pub deadhead_driving: Cost,
    pub idle: Cost,
    pub charging: Cost,
    pub overnight_recharge: Cost,
}

impl CostBreakdown {
    pub fn total(&self) -> Cost {
        self.pullout
            + self.trip_driving
            + self.deadhead_driving
            + self.idle
            + self.charging
            + self.overnight_recharge
    }
}

impl AddAssign for CostBreakdown {
    fn add_assign(&mut self, other: CostBreakdown) {
        self.pullout += other.pullout;
        self.trip_driving += other.trip_driving;
        self.deadhead_driving += other.deadhead_driving;
        self.idle += other.idle;
        self.charging += other.charging;
        self.overnight_recharge += other.overnight_recharge;
    }
}

impl fmt::Display for CostBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "  pullout:            {:>12.2}", self.pullout)?;
        writeln!(f, "  trip driving:       {:>12.2}", self.trip_driving)?;
        writeln!(f, "  deadhead driving:   {:>12.2}", self.deadhead_driving)?;
        writeln!(f, "  idle:               {:>12.2}", self.idle)?;
        writeln!(f, "  charging:           {:>12.2}", self.charging)?;
        writeln!(f, "  overnight recharge: {:>12.2}", self.overnight_recharge)?;
        write!(f, "  total:              {:>12.2}", self.total())
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// VehicleTask //////////////////////////
/////////////////////////////////////////////////////////////////////

/// The day of one vehicle: leaves the depot, serves trips, returns to the depot.
///
/// The following holds at all times:
/// * elements are contiguous in location, time and state of charge,
/// * the first element starts and the last element ends at the depot,
/// * the state of charge stays within the bounds of the vehicle type at every boundary.
///
/// Tasks are immutable. The cost includes the pull-out cost and the overnight recharge back to
/// the starting state of charge.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleTask {
    elements: Vec<VehicleElement>,
    trips: CoverSet,
    breakdown: CostBreakdown,
}

// static functions
impl VehicleTask {
    pub fn new(
        elements: Vec<VehicleElement>,
        instance: &Instance,
        config: &Config,
    ) -> Result<VehicleTask, String> {
        VehicleTask::validate(&elements, instance)?;

        let vehicle_type = instance.vehicle_type();
        let mut breakdown = CostBreakdown {
            pullout: config.vehicle.pullout_cost,
            ..CostBreakdown::default()
        };
        let mut trips = CoverSet::new(instance.trip_count());
        for element in elements.iter() {
            match element.kind {
                VehicleElementKind::Trip(t) => {
                    trips.insert(t.0);
                    breakdown.trip_driving += element.cost;
                }
                VehicleElementKind::Deadhead { .. } => breakdown.deadhead_driving += element.cost,
                VehicleElementKind::Idle => breakdown.idle += element.cost,
                VehicleElementKind::Charge { .. } => breakdown.charging += element.cost,
            }
        }
        let end_soc = elements.last().map(|e| e.end_soc).unwrap_or(vehicle_type.start_soc);
        breakdown.overnight_recharge = overnight_recharge_cost(end_soc, instance, config);

        Ok(VehicleTask {
            elements,
            trips,
            breakdown,
        })
    }

    /// Pull-out, the trip and pull-in. These tasks seed the masters so that every trip can be
    /// covered from the first iteration on.
    pub fn unit(trip: TripIdx, instance: &Instance, config: &Config) -> Result<VehicleTask, String> {
        let depot = instance.depot();
        let vehicle_type = instance.vehicle_type();
        let trip = instance.trip(trip);
        let pull_out = instance
            .deadhead(depot, trip.from)
            .ok_or_else(|| format!("no pull-out deadhead to trip {}", trip.id))?;
        let pull_in = instance
            .deadhead(trip.to, depot)
            .ok_or_else(|| format!("no pull-in deadhead from trip {}", trip.id))?;

        let mut soc = vehicle_type.start_soc;
        let mut elements = Vec::with_capacity(3);
        let mut drive = |kind, from, to, start_time, end_time, distance: Meter| {
            let start_soc = soc;
            soc -= vehicle_type.drive_consumption(distance);
            elements.push(VehicleElement {
                kind,
                from,
                to,
                start_time,
                end_time,
                start_soc,
                end_soc: soc,
                cost: distance as f64 * config.vehicle.cost_per_meter,
            });
        };
        drive(
            VehicleElementKind::Deadhead {
                distance: pull_out.distance,
            },
            depot,
            trip.from,
            trip.start_time - pull_out.duration,
            trip.start_time,
            pull_out.distance,
        );
        drive(
            VehicleElementKind::Trip(trip.idx),
            trip.from,
            trip.to,
            trip.start_time,
            trip.end_time,
            trip.distance,
        );
        drive(
            VehicleElementKind::Deadhead {
                distance: pull_in.distance,
            },
            trip.to,
            depot,
            trip.end_time,
            trip.end_time + pull_in.duration,
            pull_in.distance,
        );

        VehicleTask::new(elements, instance, config)
    }

    fn validate(elements: &[VehicleElement], instance: &Instance) -> Result<(), String> {
        let vehicle_type = instance.vehicle_type();
        let (first, last) = match (elements.first(), elements.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err("vehicle task without elements".to_string()),
        };
        if first.from != instance.depot() || last.to != instance.depot() {
            return Err("vehicle task has to start and end at the depot".to_string());
        }
        if (first.start_soc - vehicle_type.start_soc).abs() > SOC_TOLERANCE {
            return Err(format!(
                "vehicle task starts with soc {:.2} instead of {:.2}",
                first.start_soc, vehicle_type.start_soc
            ));
        }
        for element in elements.iter() {
            if element.end_time < element.start_time {
                return Err(format!("element ends before it starts at {}", element.start_time));
            }
            for soc in [element.start_soc, element.end_soc] {
                if soc < vehicle_type.min_soc - SOC_TOLERANCE
                    || soc > vehicle_type.max_soc + SOC_TOLERANCE
                {
                    return Err(format!(
                        "soc {:.2} out of bounds at {}",
                        soc, element.start_time
                    ));
                }
            }
        }
        for (a, b) in elements.iter().tuple_windows() {
            if a.end_time != b.start_time || a.to != b.from {
                return Err(format!(
                    "vehicle task is not contiguous between {} and {}",
                    a.end_time, b.start_time
                ));
            }
            if (a.end_soc - b.start_soc).abs() > SOC_TOLERANCE {
                return Err(format!("soc jumps at {}", b.start_time));
            }
        }
        Ok(())
    }
}

// methods
impl VehicleTask {
    pub fn elements(&self) -> &[VehicleElement] {
        &self.elements
    }

    pub fn trips(&self) -> &CoverSet {
        &self.trips
    }

    /// Covered trips in driving order.
    pub fn trip_sequence(&self) -> impl Iterator<Item = TripIdx> + '_ {
        self.elements.iter().filter_map(|e| e.trip())
    }

    pub fn trip_count(&self) -> usize {
        self.trips.count()
    }

    pub fn covers(&self, trip: TripIdx) -> bool {
        self.trips.contains(trip.0)
    }

    pub fn cost(&self) -> Cost {
        self.breakdown.total()
    }

    pub fn breakdown(&self) -> &CostBreakdown {
        &self.breakdown
    }

    pub fn start_time(&self) -> Time {
        self.elements[0].start_time
    }

    pub fn end_time(&self) -> Time {
        self.elements[self.elements.len() - 1].end_time
    }

    pub fn end_soc(&self) -> Soc {
        self.elements[self.elements.len() - 1].end_soc
    }

    /// Lowest state of charge at any element boundary.
    pub fn lowest_soc(&self) -> Soc {
        self.elements
            .iter()
            .map(|e| e.end_soc)
            .fold(self.elements[0].start_soc, f64::min)
    }
}

impl fmt::Display for VehicleTask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "task [{} - {}] cost {:.2}, trips:",
            self.start_time(),
            self.end_time(),
            self.cost()
        )?;
        for trip in self.trip_sequence() {
            write!(f, " {}", trip)?;
        }
        Ok(())
    }
}

/// Cost of recharging overnight back to the starting state of charge.
pub fn overnight_recharge_cost(end_soc: Soc, instance: &Instance, config: &Config) -> Cost {
    let vehicle_type = instance.vehicle_type();
    vehicle_type.soc_to_kwh((vehicle_type.start_soc - end_soc).max(0.0)) * config.vehicle.kwh_cost
}
