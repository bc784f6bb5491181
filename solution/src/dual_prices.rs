#[cfg(test)]
mod tests;

use std::collections::HashMap;

use model::base_types::{Cost, TripIdx};
use model::config::CrewRules;
use model::descriptor::{Descriptor, DescriptorHalf};

use crate::block::{Block, BlockRegistry};
use crate::crew_duty::{AggregateCoefficients, CrewDuty};
use crate::vehicle_task::VehicleTask;

/// Range of block duals a vehicle may still collect when it closes the block it has opened at a
/// descriptor half. Zero is always part of the range, as the block may end at a descriptor
/// without a dual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavingsInterval {
    pub min: Cost,
    pub max: Cost,
}

impl SavingsInterval {
    pub const NONE: SavingsInterval = SavingsInterval { min: 0.0, max: 0.0 };

    fn include(&mut self, value: Cost) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Prices handed to the pricing problems, either LP duals or Lagrangian multipliers.
///
/// Sign conventions:
/// * vehicle task: `cost - Σ trip - Σ block + max_vehicles`
/// * crew duty: `cost + Σ block + average_length * (paid / target - 1)
///   - long * (max long fraction - is long) - broken * (max broken fraction - is broken)
///   - between * (max between fraction - is between) + max_duties`
#[derive(Debug, Clone)]
pub struct DualPrices {
    trips: Vec<Cost>,
    blocks: HashMap<Descriptor, Cost>,
    by_start: HashMap<DescriptorHalf, Vec<Descriptor>>,
    savings: HashMap<DescriptorHalf, SavingsInterval>,
    pub max_vehicles: Cost,
    pub max_duties: Cost,
    pub average_length: Cost,
    pub long_duties: Cost,
    pub broken_duties: Cost,
    pub between_duties: Cost,
}

// static functions
impl DualPrices {
    pub fn zero(trip_count: usize) -> DualPrices {
        DualPrices {
            trips: vec![0.0; trip_count],
            blocks: HashMap::new(),
            by_start: HashMap::new(),
            savings: HashMap::new(),
            max_vehicles: 0.0,
            max_duties: 0.0,
            average_length: 0.0,
            long_duties: 0.0,
            broken_duties: 0.0,
            between_duties: 0.0,
        }
    }

    pub fn new(
        trips: Vec<Cost>,
        blocks: impl IntoIterator<Item = (Descriptor, Cost)>,
    ) -> DualPrices {
        let mut prices = DualPrices::zero(trips.len());
        prices.trips = trips;
        for (descriptor, value) in blocks {
            prices.set_block(descriptor, value);
        }
        prices
    }
}

// modifying methods
impl DualPrices {
    pub fn set_trip(&mut self, trip: TripIdx, value: Cost) {
        self.trips[trip.0] = value;
    }

    pub fn set_block(&mut self, descriptor: Descriptor, value: Cost) {
        if self.blocks.insert(descriptor, value).is_none() {
            self.by_start
                .entry(descriptor.start)
                .or_default()
                .push(descriptor);
        }
        let mut interval = SavingsInterval::NONE;
        for other in self.by_start[&descriptor.start].iter() {
            interval.include(self.blocks[other]);
        }
        self.savings.insert(descriptor.start, interval);
    }
}

// methods
impl DualPrices {
    pub fn trip(&self, trip: TripIdx) -> Cost {
        self.trips[trip.0]
    }

    pub fn trips(&self) -> &[Cost] {
        &self.trips
    }

    /// Unknown descriptors have dual zero.
    pub fn block(&self, descriptor: &Descriptor) -> Cost {
        self.blocks.get(descriptor).copied().unwrap_or(0.0)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (&Descriptor, &Cost)> {
        self.blocks.iter()
    }

    pub fn savings_from(&self, half: &DescriptorHalf) -> SavingsInterval {
        self.savings
            .get(half)
            .copied()
            .unwrap_or(SavingsInterval::NONE)
    }

    pub fn task_reduced_cost(&self, task: &VehicleTask, blocks: &[Block]) -> Cost {
        let trip_duals: Cost = task.trip_sequence().map(|t| self.trip(t)).sum();
        let block_duals: Cost = blocks.iter().map(|b| self.block(&b.descriptor)).sum();
        task.cost() - trip_duals - block_duals + self.max_vehicles
    }

    pub fn duty_reduced_cost(
        &self,
        duty: &CrewDuty,
        registry: &BlockRegistry,
        rules: &CrewRules,
    ) -> Cost {
        let block_duals: Cost = duty
            .blocks()
            .iter()
            .map(|b| self.block(&registry.get(*b).descriptor))
            .sum();
        duty.cost() + block_duals + self.aggregate_terms(duty, rules) + self.max_duties
    }

    /// Contribution of the aggregate crew-mix multipliers to the reduced cost of a duty.
    pub fn aggregate_terms(&self, duty: &CrewDuty, rules: &CrewRules) -> Cost {
        self.aggregate_value(&duty.aggregate_coefficients(rules))
    }

    pub fn aggregate_value(&self, coefficients: &AggregateCoefficients) -> Cost {
        self.average_length * coefficients.average_length
            - self.long_duties * coefficients.long
            - self.broken_duties * coefficients.broken
            - self.between_duties * coefficients.between
    }
}
