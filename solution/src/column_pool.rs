#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use model::base_types::{BlockIdx, TripIdx};
use model::config::Config;
use model::cover_set::CoverSet;
use model::instance::Instance;

use crate::block::{blocks_of, BlockRegistry};
use crate::crew_duty::{CrewDuty, DutyType};
use crate::vehicle_task::VehicleTask;

pub type ColumnIdx = usize;

#[derive(Debug, Clone)]
pub struct TaskColumn {
    pub task: VehicleTask,
    pub blocks: Vec<BlockIdx>,
    pub unit: bool, // seed column, never pruned
}

#[derive(Debug, Clone)]
pub struct DutyColumn {
    pub duty: CrewDuty,
    pub unit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Added(ColumnIdx),
    /// A column with the same key existed and was more expensive; it got overwritten in place.
    Replaced(ColumnIdx),
    Rejected,
}

/// What happened when a vehicle task entered the pool. Blocks seen for the first time get a
/// single duty each so the crew side can always cover them.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInsertion {
    pub outcome: Insertion,
    pub new_blocks: Vec<BlockIdx>,
    pub new_duties: Vec<ColumnIdx>,
}

type TaskKey = (CoverSet, Vec<BlockIdx>);
type DutyKey = (Vec<BlockIdx>, DutyType);

/// All columns known to a master, deduplicated by what they cover. Only the orchestrating thread
/// mutates the pool.
pub struct ColumnPool {
    instance: Arc<Instance>,
    config: Arc<Config>,
    blocks: BlockRegistry,
    tasks: Vec<TaskColumn>,
    duties: Vec<DutyColumn>,
    task_keys: HashMap<TaskKey, ColumnIdx>,
    duty_keys: HashMap<DutyKey, ColumnIdx>,
}

// static functions
impl ColumnPool {
    pub fn new(instance: Arc<Instance>, config: Arc<Config>) -> ColumnPool {
        ColumnPool {
            instance,
            config,
            blocks: BlockRegistry::new(),
            tasks: Vec::new(),
            duties: Vec::new(),
            task_keys: HashMap::new(),
            duty_keys: HashMap::new(),
        }
    }

    /// A pool holding one unit task per trip and a single duty per resulting block.
    pub fn with_unit_columns(
        instance: Arc<Instance>,
        config: Arc<Config>,
    ) -> Result<ColumnPool, String> {
        let mut pool = ColumnPool::new(instance.clone(), config.clone());
        for trip in instance.trips() {
            let task = VehicleTask::unit(trip.idx, &instance, &config)?;
            pool.add_task(task, true);
        }
        Ok(pool)
    }
}

// modifying methods
impl ColumnPool {
    pub fn add_task(&mut self, task: VehicleTask, unit: bool) -> TaskInsertion {
        let mut block_indices = Vec::new();
        let mut new_blocks = Vec::new();
        for block in blocks_of(&task, &self.instance) {
            let (idx, is_new) = self.blocks.register(block);
            if is_new {
                new_blocks.push(idx);
            }
            block_indices.push(idx);
        }
        let new_duties = new_blocks
            .iter()
            .filter_map(|b| match self.add_unit_duty(*b) {
                Insertion::Added(idx) | Insertion::Replaced(idx) => Some(idx),
                Insertion::Rejected => None,
            })
            .collect();

        let key = (task.trips().clone(), block_indices.clone());
        let column = TaskColumn {
            task,
            blocks: block_indices,
            unit,
        };
        let outcome = match self.task_keys.get(&key).copied() {
            Some(idx) if self.tasks[idx].task.cost() <= column.task.cost() => Insertion::Rejected,
            Some(idx) => {
                let unit = self.tasks[idx].unit || column.unit;
                self.tasks[idx] = TaskColumn { unit, ..column };
                Insertion::Replaced(idx)
            }
            None => {
                self.tasks.push(column);
                self.task_keys.insert(key, self.tasks.len() - 1);
                Insertion::Added(self.tasks.len() - 1)
            }
        };
        TaskInsertion {
            outcome,
            new_blocks,
            new_duties,
        }
    }

    pub fn add_duty(&mut self, duty: CrewDuty, unit: bool) -> Insertion {
        let mut blocks = duty.blocks().to_vec();
        blocks.sort();
        let key = (blocks, duty.duty_type());
        match self.duty_keys.get(&key).copied() {
            Some(idx) if self.duties[idx].duty.cost() <= duty.cost() => Insertion::Rejected,
            Some(idx) => {
                let unit = self.duties[idx].unit || unit;
                self.duties[idx] = DutyColumn { duty, unit };
                Insertion::Replaced(idx)
            }
            None => {
                self.duties.push(DutyColumn { duty, unit });
                self.duty_keys.insert(key, self.duties.len() - 1);
                Insertion::Added(self.duties.len() - 1)
            }
        }
    }

    fn add_unit_duty(&mut self, block_idx: BlockIdx) -> Insertion {
        let block = self.blocks.get(block_idx);
        let duty = CrewDuty::single(
            block_idx,
            block,
            self.instance.location(block.start_location()).sign_on_time,
            self.instance.location(block.end_location()).sign_off_time,
            &self.config.crew,
        );
        self.add_duty(duty, true)
    }

    /// Keeps unit tasks and the tasks for which `keep` holds. Indices are reassigned.
    pub fn retain_tasks(&mut self, mut keep: impl FnMut(ColumnIdx, &TaskColumn) -> bool) {
        let tasks = std::mem::take(&mut self.tasks);
        self.tasks = tasks
            .into_iter()
            .enumerate()
            .filter(|(i, c)| c.unit || keep(*i, c))
            .map(|(_, c)| c)
            .collect();
        self.task_keys = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, c)| ((c.task.trips().clone(), c.blocks.clone()), i))
            .collect();
    }

    /// Keeps unit duties and the duties for which `keep` holds. Indices are reassigned.
    pub fn retain_duties(&mut self, mut keep: impl FnMut(ColumnIdx, &DutyColumn) -> bool) {
        let duties = std::mem::take(&mut self.duties);
        self.duties = duties
            .into_iter()
            .enumerate()
            .filter(|(i, c)| c.unit || keep(*i, c))
            .map(|(_, c)| c)
            .collect();
        self.duty_keys = self
            .duties
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut blocks = c.duty.blocks().to_vec();
                blocks.sort();
                ((blocks, c.duty.duty_type()), i)
            })
            .collect();
    }
}

// methods
impl ColumnPool {
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn blocks(&self) -> &BlockRegistry {
        &self.blocks
    }

    pub fn task(&self, idx: ColumnIdx) -> &TaskColumn {
        &self.tasks[idx]
    }

    pub fn duty(&self, idx: ColumnIdx) -> &DutyColumn {
        &self.duties[idx]
    }

    pub fn tasks(&self) -> &[TaskColumn] {
        &self.tasks
    }

    pub fn duties(&self) -> &[DutyColumn] {
        &self.duties
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn duty_count(&self) -> usize {
        self.duties.len()
    }

    pub fn known_trip_sets(&self) -> HashSet<CoverSet> {
        self.tasks.iter().map(|c| c.task.trips().clone()).collect()
    }

    pub fn tasks_covering(&self, trip: TripIdx) -> impl Iterator<Item = ColumnIdx> + '_ {
        self.tasks
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.task.covers(trip))
            .map(|(i, _)| i)
    }

    /// Blocks of the given tasks, each once and in order of first appearance. This is exactly the
    /// block set the crew side has to cover.
    pub fn blocks_of_tasks(&self, tasks: &[ColumnIdx]) -> Vec<BlockIdx> {
        let mut seen = HashSet::new();
        tasks
            .iter()
            .flat_map(|t| self.tasks[*t].blocks.iter().copied())
            .filter(|b| seen.insert(*b))
            .collect()
    }
}
