pub mod lagrange;
pub mod lp;
#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use model::base_types::{BlockIdx, Cost, TripIdx};
use model::config::Config;
use model::instance::Instance;
use model::network::VehicleNetwork;
use solution::block::BlockRegistry;
use solution::column_pool::{ColumnIdx, ColumnPool, Insertion, TaskInsertion};
use solution::crew_duty::CrewDuty;
use solution::dual_prices::DualPrices;
use solution::vehicle_task::{CostBreakdown, VehicleTask};
use solution::Schedule;

use crate::overcoverage::remove_overcoverage;

pub type VariableId = usize;
pub type ConstraintId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    GreaterEqual,
    LessEqual,
    Equal,
}

/// Optimal LP solution. `values` is indexed by variable, `duals` by constraint; the reduced cost
/// of a variable is its cost minus the dual-weighted sum over its column.
#[derive(Debug, Clone, PartialEq)]
pub struct Relaxation {
    pub objective: f64,
    pub values: Vec<f64>,
    pub duals: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MipSolution {
    pub objective: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolverFailure {
    /// The solver proved infeasibility. `diagnostics` names the conflicting rows or bounds.
    Infeasible { diagnostics: Vec<String> },
    Interrupted,
    Other(String),
}

impl fmt::Display for SolverFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolverFailure::Infeasible { diagnostics } if diagnostics.is_empty() => {
                write!(f, "master problem is infeasible")
            }
            SolverFailure::Infeasible { diagnostics } => {
                write!(f, "master problem is infeasible: {}", diagnostics.join("; "))
            }
            SolverFailure::Interrupted => write!(f, "interrupted"),
            SolverFailure::Other(message) => write!(f, "solver failed: {}", message),
        }
    }
}

impl Error for SolverFailure {}

/// The external LP/MIP solver. All variables have lower bound zero.
pub trait MasterSolver {
    fn add_variable(
        &mut self,
        cost: f64,
        upper: Option<f64>,
        column: &[(ConstraintId, f64)],
        name: &str,
    ) -> VariableId;

    fn add_constraint(
        &mut self,
        expr: &[(VariableId, f64)],
        sense: Sense,
        rhs: f64,
        name: &str,
    ) -> ConstraintId;

    fn solve_relaxation(&mut self) -> Result<Relaxation, SolverFailure>;

    fn fix_to_binary(&mut self, variables: &[VariableId]);

    fn solve_mip(&mut self) -> Result<MipSolution, SolverFailure>;

    /// The solver polls `flag`. Once it is set, a relaxation gives up with
    /// [`SolverFailure::Interrupted`] and a MIP stops early with its incumbent.
    fn terminate(&mut self, flag: Arc<AtomicBool>);
}

/// Checked between rounds: a raised flag ends the rounds and the master goes to its final MIP.
pub(crate) fn stop_requested(stop: &AtomicBool, verbose: bool, before: &str) -> bool {
    let requested = stop.load(Ordering::Relaxed);
    if requested && verbose {
        println!("\x1b[93mstop requested before {}\x1b[0m", before);
    }
    requested
}

/// Whether a round failed only because the solver was stopped by the flag.
pub(crate) fn interrupted_by_flag(err: &anyhow::Error, stop: &AtomicBool) -> bool {
    stop.load(Ordering::Relaxed)
        && err.root_cause().downcast_ref::<SolverFailure>() == Some(&SolverFailure::Interrupted)
}

pub(crate) fn report_failure(failure: SolverFailure, verbose: bool) -> SolverFailure {
    if verbose {
        if let SolverFailure::Infeasible { diagnostics } = &failure {
            println!("\x1b[91mmaster problem infeasible\x1b[0m");
            for line in diagnostics.iter() {
                println!("  {}", line);
            }
        }
    }
    failure
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// MasterModel //////////////////////////
/////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Task(ColumnIdx),
    Duty(ColumnIdx),
}

/// Mirror of a column pool inside a [`MasterSolver`]:
/// * trip rows `Σ x ≥ 1` (`= 1` without overcover),
/// * block rows `Σ x - Σ y = 0`,
/// * optional fleet and crew size rows `Σ x - s ≤ V`, `Σ y - s ≤ D`,
/// * crew-mix rows on the aggregate coefficients of the duties, each with a penalized slack.
///
/// A replaced column gets a fresh variable; the old one stays in the model and maps to the same
/// pool column.
pub struct MasterModel {
    config: Arc<Config>,
    trip_rows: Vec<ConstraintId>,
    block_rows: Vec<ConstraintId>,
    max_vehicles_row: Option<ConstraintId>,
    max_duties_row: Option<ConstraintId>,
    average_length_row: ConstraintId,
    long_row: ConstraintId,
    broken_row: ConstraintId,
    between_row: ConstraintId,
    owners: HashMap<VariableId, Owner>,
}

/// Pool columns picked by a solution, duties and tasks repeated by their multiplicity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub tasks: Vec<ColumnIdx>,
    pub duties: Vec<ColumnIdx>,
}

// static functions
impl MasterModel {
    pub fn build(
        solver: &mut dyn MasterSolver,
        pool: &ColumnPool,
        config: Arc<Config>,
    ) -> MasterModel {
        let master = &config.master;
        let penalty = config.crew.hard_constraint_penalty;
        let trip_sense = if master.allow_overcover {
            Sense::GreaterEqual
        } else {
            Sense::Equal
        };
        let trip_rows = pool
            .instance()
            .trips()
            .iter()
            .map(|trip| {
                solver.add_constraint(&[], trip_sense, 1.0, &format!("trip_{}", trip.id))
            })
            .collect();

        let mut size_row = |limit: Option<usize>, over_cost: Cost, name: &str| {
            limit.map(|limit| {
                let row = solver.add_constraint(&[], Sense::LessEqual, limit as f64, name);
                if over_cost > 0.0 {
                    let slack = format!("{}_slack", name);
                    solver.add_variable(over_cost, None, &[(row, -1.0)], &slack);
                }
                row
            })
        };
        let max_vehicles_row = size_row(
            master.max_vehicles,
            master.vehicle_over_max_cost,
            "max_vehicles",
        );
        let max_duties_row = size_row(master.max_duties, master.crew_over_max_cost, "max_duties");

        let mut mix_row = |sense: Sense, slack: f64, name: &str| {
            let row = solver.add_constraint(&[], sense, 0.0, name);
            solver.add_variable(penalty, None, &[(row, slack)], &format!("{}_slack", name));
            row
        };
        let average_length_row = mix_row(Sense::LessEqual, -1.0, "average_length");
        let long_row = mix_row(Sense::GreaterEqual, 1.0, "long_duties");
        let broken_row = mix_row(Sense::GreaterEqual, 1.0, "broken_duties");
        let between_row = mix_row(Sense::GreaterEqual, 1.0, "between_duties");

        let mut model = MasterModel {
            config: config.clone(),
            trip_rows,
            block_rows: Vec::new(),
            max_vehicles_row,
            max_duties_row,
            average_length_row,
            long_row,
            broken_row,
            between_row,
            owners: HashMap::new(),
        };
        model.sync_blocks(solver, pool.blocks());
        for idx in 0..pool.task_count() {
            model.add_task_variable(solver, pool, idx);
        }
        for idx in 0..pool.duty_count() {
            model.add_duty_variable(solver, pool, idx);
        }
        model
    }
}

// modifying methods
impl MasterModel {
    /// Adds a row for every block the pool learned since the last call.
    fn sync_blocks(&mut self, solver: &mut dyn MasterSolver, blocks: &BlockRegistry) {
        for (idx, block) in blocks.iter().skip(self.block_rows.len()) {
            let row = solver.add_constraint(
                &[],
                Sense::Equal,
                0.0,
                &format!("block_{}_{}", idx, block.descriptor),
            );
            self.block_rows.push(row);
        }
    }

    fn add_task_variable(
        &mut self,
        solver: &mut dyn MasterSolver,
        pool: &ColumnPool,
        idx: ColumnIdx,
    ) -> VariableId {
        let column = pool.task(idx);
        let mut entries: Vec<(ConstraintId, f64)> = column
            .task
            .trip_sequence()
            .map(|t| (self.trip_rows[t.0], 1.0))
            .collect();
        entries.extend(column.blocks.iter().map(|b| (self.block_rows[b.0], 1.0)));
        if let Some(row) = self.max_vehicles_row {
            entries.push((row, 1.0));
        }
        let variable = solver.add_variable(
            column.task.cost(),
            None,
            &entries,
            &format!("task_{}", idx),
        );
        self.owners.insert(variable, Owner::Task(idx));
        variable
    }

    fn add_duty_variable(
        &mut self,
        solver: &mut dyn MasterSolver,
        pool: &ColumnPool,
        idx: ColumnIdx,
    ) -> VariableId {
        let duty = &pool.duty(idx).duty;
        let coefficients = duty.aggregate_coefficients(&self.config.crew);
        let mut entries: Vec<(ConstraintId, f64)> = duty
            .blocks()
            .iter()
            .map(|b| (self.block_rows[b.0], -1.0))
            .collect();
        if let Some(row) = self.max_duties_row {
            entries.push((row, 1.0));
        }
        entries.push((self.average_length_row, coefficients.average_length));
        entries.push((self.long_row, coefficients.long));
        entries.push((self.broken_row, coefficients.broken));
        entries.push((self.between_row, coefficients.between));
        let variable = solver.add_variable(duty.cost(), None, &entries, &format!("duty_{}", idx));
        self.owners.insert(variable, Owner::Duty(idx));
        variable
    }

    /// Mirrors a task that entered the pool, including the rows of its new blocks and their
    /// unit duties. Returns false if the pool rejected the task.
    pub fn add_task(
        &mut self,
        solver: &mut dyn MasterSolver,
        pool: &ColumnPool,
        insertion: &TaskInsertion,
    ) -> bool {
        self.sync_blocks(solver, pool.blocks());
        for duty in insertion.new_duties.iter() {
            self.add_duty_variable(solver, pool, *duty);
        }
        match insertion.outcome {
            Insertion::Added(idx) | Insertion::Replaced(idx) => {
                self.add_task_variable(solver, pool, idx);
                true
            }
            Insertion::Rejected => false,
        }
    }

    pub fn add_duty(
        &mut self,
        solver: &mut dyn MasterSolver,
        pool: &ColumnPool,
        insertion: Insertion,
    ) -> bool {
        match insertion {
            Insertion::Added(idx) | Insertion::Replaced(idx) => {
                self.add_duty_variable(solver, pool, idx);
                true
            }
            Insertion::Rejected => false,
        }
    }
}

// methods
impl MasterModel {
    /// Prices for the pricing problems, translated from the LP duals.
    pub fn duals(&self, relaxation: &Relaxation, blocks: &BlockRegistry) -> DualPrices {
        let dual = |row: ConstraintId| relaxation.duals.get(row).copied().unwrap_or(0.0);
        let mut prices = DualPrices::new(
            self.trip_rows.iter().map(|row| dual(*row)).collect(),
            blocks
                .iter()
                .filter(|(idx, _)| idx.0 < self.block_rows.len())
                .map(|(idx, block)| (block.descriptor, dual(self.block_rows[idx.0]))),
        );
        prices.max_vehicles = self.max_vehicles_row.map_or(0.0, |row| -dual(row));
        prices.max_duties = self.max_duties_row.map_or(0.0, |row| -dual(row));
        prices.average_length = -dual(self.average_length_row);
        prices.long_duties = dual(self.long_row);
        prices.broken_duties = dual(self.broken_row);
        prices.between_duties = dual(self.between_row);
        prices
    }

    /// Variables of all columns, in creation order.
    pub fn column_variables(&self) -> Vec<VariableId> {
        let mut variables: Vec<VariableId> = self.owners.keys().copied().collect();
        variables.sort();
        variables
    }

    /// Tasks carrying a positive value in an LP solution.
    pub fn fractional_tasks(&self, values: &[f64]) -> Vec<ColumnIdx> {
        let mut tasks: Vec<ColumnIdx> = self
            .owners
            .iter()
            .filter(|(v, _)| values.get(**v).copied().unwrap_or(0.0) > 1e-6)
            .filter_map(|(_, owner)| match owner {
                Owner::Task(idx) => Some(*idx),
                Owner::Duty(_) => None,
            })
            .collect();
        tasks.sort();
        tasks.dedup();
        tasks
    }

    /// Rounds an integer solution to the selected pool columns.
    pub fn selection(&self, values: &[f64]) -> Selection {
        let mut tasks: BTreeMap<ColumnIdx, usize> = BTreeMap::new();
        let mut duties: BTreeMap<ColumnIdx, usize> = BTreeMap::new();
        for (variable, owner) in self.owners.iter() {
            let count = values.get(*variable).copied().unwrap_or(0.0).round();
            if count < 1.0 {
                continue;
            }
            let counts = match owner {
                Owner::Task(idx) => tasks.entry(*idx),
                Owner::Duty(idx) => duties.entry(*idx),
            };
            *counts.or_insert(0) += count as usize;
        }
        let expand = |counts: BTreeMap<ColumnIdx, usize>| {
            counts
                .into_iter()
                .flat_map(|(idx, count)| std::iter::repeat(idx).take(count))
                .collect()
        };
        Selection {
            tasks: expand(tasks),
            duties: expand(duties),
        }
    }
}

/// Blocks the crew side has to cover: those of the currently selected tasks, or all known blocks
/// while nothing is selected.
pub(crate) fn active_blocks(pool: &ColumnPool, selected_tasks: &[ColumnIdx]) -> Vec<BlockIdx> {
    let blocks = pool.blocks_of_tasks(selected_tasks);
    if blocks.is_empty() {
        pool.blocks().iter().map(|(idx, _)| idx).collect()
    } else {
        blocks
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// CoverageReport ///////////////////////
/////////////////////////////////////////////////////////////////////

/// Deviations of a final selection from an exact cover. Block entries carry the number of
/// vehicle tasks and of crew duties using the block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageReport {
    pub uncovered_trips: Vec<TripIdx>,
    pub overcovered_trips: Vec<(TripIdx, usize)>,
    pub uncovered_blocks: Vec<(BlockIdx, usize, usize)>,
    pub overcovered_blocks: Vec<(BlockIdx, usize, usize)>,
}

impl CoverageReport {
    pub fn new(pool: &ColumnPool, selection: &Selection) -> CoverageReport {
        let mut trip_count = vec![0; pool.instance().trip_count()];
        let mut vehicle_blocks = vec![0; pool.blocks().len()];
        let mut crew_blocks = vec![0; pool.blocks().len()];
        for idx in selection.tasks.iter() {
            let column = pool.task(*idx);
            for trip in column.task.trip_sequence() {
                trip_count[trip.0] += 1;
            }
            for block in column.blocks.iter() {
                vehicle_blocks[block.0] += 1;
            }
        }
        for idx in selection.duties.iter() {
            for block in pool.duty(*idx).duty.blocks() {
                crew_blocks[block.0] += 1;
            }
        }

        let mut report = CoverageReport::default();
        for (t, count) in trip_count.into_iter().enumerate() {
            match count {
                0 => report.uncovered_trips.push(TripIdx(t)),
                1 => {}
                _ => report.overcovered_trips.push((TripIdx(t), count)),
            }
        }
        for (b, (vehicle, crew)) in vehicle_blocks.into_iter().zip(crew_blocks).enumerate() {
            if crew < vehicle {
                report.uncovered_blocks.push((BlockIdx(b), vehicle, crew));
            } else if crew > vehicle {
                report.overcovered_blocks.push((BlockIdx(b), vehicle, crew));
            }
        }
        report
    }

    /// Every trip covered and every block driven is staffed exactly as often as it is driven.
    /// Overcovered trips are allowed.
    pub fn is_consistent(&self) -> bool {
        self.uncovered_trips.is_empty()
            && self.uncovered_blocks.is_empty()
            && self.overcovered_blocks.is_empty()
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for trip in self.uncovered_trips.iter() {
            writeln!(f, "!!! trip {} not covered", trip)?;
        }
        for (trip, count) in self.overcovered_trips.iter() {
            writeln!(f, "--- trip {} covered {} times", trip, count)?;
        }
        for (block, vehicle, crew) in self
            .uncovered_blocks
            .iter()
            .chain(self.overcovered_blocks.iter())
        {
            writeln!(
                f,
                "!!! block {} used {} times by vehicles, {} times by crews",
                block, vehicle, crew
            )?;
        }
        if self.is_consistent() && self.overcovered_trips.is_empty() {
            write!(f, "exact cover")?;
        }
        Ok(())
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// MasterSolution ///////////////////////
/////////////////////////////////////////////////////////////////////

/// Outcome of a master run. `selected_tasks` are the tasks as chosen by the final MIP, `tasks`
/// the same tasks after overcovered trips were handed to a single vehicle.
#[derive(Debug, Clone)]
pub struct MasterSolution {
    pub selected_tasks: Vec<VehicleTask>,
    pub tasks: Vec<VehicleTask>,
    pub duties: Vec<CrewDuty>,
    pub blocks: BlockRegistry,
    pub objective: Cost,
    pub lower_bound: Option<Cost>,
    pub coverage: CoverageReport,
}

// static functions
impl MasterSolution {
    pub(crate) fn assemble(
        pool: &ColumnPool,
        network: &VehicleNetwork,
        selection: &Selection,
        objective: Cost,
        lower_bound: Option<Cost>,
    ) -> MasterSolution {
        let selected_tasks: Vec<VehicleTask> = selection
            .tasks
            .iter()
            .map(|idx| pool.task(*idx).task.clone())
            .collect();
        let tasks = remove_overcoverage(&selected_tasks, network, pool.config());
        MasterSolution {
            tasks,
            selected_tasks,
            duties: selection
                .duties
                .iter()
                .map(|idx| pool.duty(*idx).duty.clone())
                .collect(),
            blocks: pool.blocks().clone(),
            objective,
            lower_bound,
            coverage: CoverageReport::new(pool, selection),
        }
    }
}

// methods
impl MasterSolution {
    pub fn vehicle_breakdown(&self) -> CostBreakdown {
        let mut total = CostBreakdown::default();
        for task in self.tasks.iter() {
            total += *task.breakdown();
        }
        total
    }

    pub fn crew_cost(&self) -> Cost {
        self.duties.iter().map(|d| d.cost()).sum()
    }

    /// The cleaned tasks and the duties as final schedule.
    pub fn into_schedule(self, instance: Arc<Instance>, config: Arc<Config>) -> Schedule {
        Schedule::new(self.tasks, self.duties, self.blocks, instance, config)
    }

    pub fn print(&self) {
        println!(
            "solution with {} vehicles and {} duties, objective {:.2}",
            self.tasks.len(),
            self.duties.len(),
            self.objective
        );
        if let Some(lower_bound) = self.lower_bound {
            println!("lower bound: {:.2}", lower_bound);
        }
        println!("{}", self.coverage);
        println!("vehicle costs:\n{}", self.vehicle_breakdown());
        println!("crew costs: {:.2}", self.crew_cost());
        for duty in self.duties.iter() {
            println!("  {}", duty);
        }
    }
}
