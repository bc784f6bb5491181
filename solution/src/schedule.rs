
use std::collections::HashSet;
use std::sync::Arc;

use itertools::Itertools;
use model::base_types::{Cost, TripIdx};
use model::config::Config;
use model::descriptor::Descriptor;
use model::instance::Instance;

use crate::block::{blocks_of, BlockRegistry};
use crate::crew_duty::CrewDuty;
use crate::vehicle_task::{CostBreakdown, VehicleTask};

/// Final vehicle and crew schedule of a run, as selected by the integer master.
pub struct Schedule {
    tasks: Vec<VehicleTask>,
    duties: Vec<CrewDuty>,
    blocks: BlockRegistry,
    instance: Arc<Instance>,
    config: Arc<Config>,
}

// static functions
impl Schedule {
    pub fn new(
        tasks: Vec<VehicleTask>,
        duties: Vec<CrewDuty>,
        blocks: BlockRegistry,
        instance: Arc<Instance>,
        config: Arc<Config>,
    ) -> Schedule {
        Schedule {
            tasks,
            duties,
            blocks,
            instance,
            config,
        }
    }
}

// methods
impl Schedule {
    pub fn tasks(&self) -> &[VehicleTask] {
        &self.tasks
    }

    pub fn duties(&self) -> &[CrewDuty] {
        &self.duties
    }

    pub fn blocks(&self) -> &BlockRegistry {
        &self.blocks
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn vehicle_cost(&self) -> Cost {
        self.tasks.iter().map(|t| t.cost()).sum()
    }

    pub fn crew_cost(&self) -> Cost {
        self.duties.iter().map(|d| d.cost()).sum()
    }

    pub fn total_cost(&self) -> Cost {
        self.vehicle_cost() + self.crew_cost()
    }

    pub fn cost_breakdown(&self) -> CostBreakdown {
        let mut total = CostBreakdown::default();
        for task in self.tasks.iter() {
            total += *task.breakdown();
        }
        total
    }

    pub fn uncovered_trips(&self) -> Vec<TripIdx> {
        self.instance
            .trips()
            .iter()
            .map(|t| t.idx)
            .filter(|t| !self.tasks.iter().any(|task| task.covers(*t)))
            .collect()
    }

    pub fn overcovered_trips(&self) -> Vec<TripIdx> {
        self.instance
            .trips()
            .iter()
            .map(|t| t.idx)
            .filter(|t| self.tasks.iter().filter(|task| task.covers(*t)).count() > 1)
            .collect()
    }

    /// Blocks driven by a vehicle but not covered by a duty, and blocks covered by a duty that no
    /// vehicle drives.
    pub fn block_mismatches(&self) -> Vec<Descriptor> {
        let driven: HashSet<Descriptor> = self
            .tasks
            .iter()
            .flat_map(|t| blocks_of(t, &self.instance))
            .map(|b| b.descriptor)
            .collect();
        let staffed: HashSet<Descriptor> = self
            .duties
            .iter()
            .flat_map(|d| d.blocks().iter())
            .map(|b| self.blocks.get(*b).descriptor)
            .collect();
        driven
            .symmetric_difference(&staffed)
            .copied()
            .sorted()
            .collect()
    }

    pub fn print_summary(&self) {
        println!("\n*** final schedule ***");
        println!(
            "vehicles: {}, duties: {}, total cost: {:.2} (vehicles {:.2}, crew {:.2})",
            self.tasks.len(),
            self.duties.len(),
            self.total_cost(),
            self.vehicle_cost(),
            self.crew_cost()
        );
        println!("vehicle costs:\n{}", self.cost_breakdown());
        for duty_type in self.duties.iter().map(|d| d.duty_type()).sorted().dedup() {
            let count = self
                .duties
                .iter()
                .filter(|d| d.duty_type() == duty_type)
                .count();
            println!("  {:<8} {:>5}", duty_type.to_string(), count);
        }
        if self.config.verbose {
            for task in self.tasks.iter() {
                println!("{}", task);
            }
            for duty in self.duties.iter() {
                println!("{}", duty);
            }
        }
        let uncovered = self.uncovered_trips();
        let overcovered = self.overcovered_trips();
        let mismatches = self.block_mismatches();
        if !uncovered.is_empty() || !overcovered.is_empty() || !mismatches.is_empty() {
            println!(
                "WARNING: {} uncovered trips, {} overcovered trips, {} block mismatches",
                uncovered.len(),
                overcovered.len(),
                mismatches.len()
            );
        }
    }
}
