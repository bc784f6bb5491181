#[cfg(test)]
mod tests;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time as stdtime;

use anyhow::{anyhow, Context};
use model::base_types::Cost;
use model::config::Config;
use model::network::VehicleNetwork;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use solution::block::BlockRegistry;
use solution::column_pool::{ColumnIdx, ColumnPool, TaskColumn};
use solution::crew_duty::CrewDuty;
use solution::dual_prices::DualPrices;

use super::{
    active_blocks, report_failure, stop_requested, MasterModel, MasterSolution, MasterSolver,
    Selection,
};
use crate::crew_network::CrewNetwork;
use crate::generators::{
    crew_generators, generate_crew_batch, generate_vehicle_batch, vehicle_generators,
    GeneratorMix, VehicleColumnGenerator,
};
use crate::vehicle_labeling::VehicleLabeling;
use crate::vehicle_local_search::VehicleLocalSearch;

/////////////////////////////////////////////////////////////////////
////////////////////////////// Multipliers //////////////////////////
/////////////////////////////////////////////////////////////////////

/// Lagrangian multipliers of the relaxed rows. The same shape holds subgradients.
/// `blocks` is indexed by [`model::base_types::BlockIdx`] of the pool's registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Multipliers {
    pub trips: Vec<f64>,
    pub blocks: Vec<f64>,
    pub max_vehicles: f64,
    pub max_duties: f64,
    pub average_length: f64,
    pub long_duties: f64,
    pub broken_duties: f64,
    pub between_duties: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    lower: f64,
    upper: f64,
}

impl Range {
    const FREE: Range = Range {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    fn nonnegative(upper: f64) -> Range {
        Range { lower: 0.0, upper }
    }
}

/// Feasible range of every multiplier. Rows with a penalized slack cap their multiplier at the
/// penalty, beyond it the slack is cheaper than the row.
#[derive(Debug, Clone, Copy)]
struct Limits {
    trip: Range,
    block: Range,
    max_vehicles: Range,
    max_duties: Range,
    aggregate: Range,
}

impl Limits {
    fn new(config: &Config) -> Limits {
        let master = &config.master;
        let size = |limit: Option<usize>, over_cost: Cost| match limit {
            None => Range::nonnegative(0.0),
            Some(_) if over_cost > 0.0 => Range::nonnegative(over_cost),
            Some(_) => Range::nonnegative(f64::INFINITY),
        };
        Limits {
            trip: if master.allow_overcover {
                Range::nonnegative(f64::INFINITY)
            } else {
                Range::FREE
            },
            block: Range::FREE,
            max_vehicles: size(master.max_vehicles, master.vehicle_over_max_cost),
            max_duties: size(master.max_duties, master.crew_over_max_cost),
            aggregate: Range::nonnegative(config.crew.hard_constraint_penalty),
        }
    }
}

// static functions
impl Multipliers {
    pub fn new(trip_count: usize, block_count: usize) -> Multipliers {
        Multipliers {
            trips: vec![0.0; trip_count],
            blocks: vec![0.0; block_count],
            max_vehicles: 0.0,
            max_duties: 0.0,
            average_length: 0.0,
            long_duties: 0.0,
            broken_duties: 0.0,
            between_duties: 0.0,
        }
    }
}

// modifying methods
impl Multipliers {
    /// New blocks start with multiplier zero.
    pub fn resize_blocks(&mut self, block_count: usize) {
        self.blocks.resize(block_count, 0.0);
    }

    fn visit(
        &mut self,
        other: &Multipliers,
        limits: &Limits,
        mut f: impl FnMut(&mut f64, f64, Range),
    ) {
        for (value, other) in self.trips.iter_mut().zip(other.trips.iter()) {
            f(value, *other, limits.trip);
        }
        for (value, other) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            f(value, *other, limits.block);
        }
        f(&mut self.max_vehicles, other.max_vehicles, limits.max_vehicles);
        f(&mut self.max_duties, other.max_duties, limits.max_duties);
        f(&mut self.average_length, other.average_length, limits.aggregate);
        f(&mut self.long_duties, other.long_duties, limits.aggregate);
        f(&mut self.broken_duties, other.broken_duties, limits.aggregate);
        f(&mut self.between_duties, other.between_duties, limits.aggregate);
    }

    /// Drops the components of a subgradient that would push a multiplier out of its range.
    fn project(&mut self, multipliers: &Multipliers, limits: &Limits) {
        self.visit(multipliers, limits, |gradient, value, range| {
            let at_lower = value <= range.lower && *gradient < 0.0;
            let at_upper = value >= range.upper && *gradient > 0.0;
            if at_lower || at_upper {
                *gradient = 0.0;
            }
        });
    }

    fn step(&mut self, gradient: &Multipliers, size: f64, limits: &Limits) {
        self.visit(gradient, limits, |value, gradient, range| {
            *value = (*value + size * gradient).max(range.lower).min(range.upper);
        });
    }
}

// methods
impl Multipliers {
    fn norm_squared(&self) -> f64 {
        self.trips
            .iter()
            .chain(self.blocks.iter())
            .chain(
                [
                    self.max_vehicles,
                    self.max_duties,
                    self.average_length,
                    self.long_duties,
                    self.broken_duties,
                    self.between_duties,
                ]
                .iter(),
            )
            .map(|g| g * g)
            .sum()
    }

    pub fn task_reduced_cost(&self, column: &TaskColumn) -> Cost {
        let trips: f64 = column.task.trip_sequence().map(|t| self.trips[t.0]).sum();
        let blocks: f64 = column.blocks.iter().map(|b| self.block(b.0)).sum();
        column.task.cost() - trips - blocks + self.max_vehicles
    }

    pub fn duty_reduced_cost(&self, duty: &CrewDuty, config: &Config) -> Cost {
        let coefficients = duty.aggregate_coefficients(&config.crew);
        let blocks: f64 = duty.blocks().iter().map(|b| self.block(b.0)).sum();
        duty.cost()
            + blocks
            + self.average_length * coefficients.average_length
            - self.long_duties * coefficients.long
            - self.broken_duties * coefficients.broken
            - self.between_duties * coefficients.between
            + self.max_duties
    }

    fn block(&self, idx: usize) -> f64 {
        self.blocks.get(idx).copied().unwrap_or(0.0)
    }

    /// The multipliers as prices for the column generators.
    pub fn to_prices(&self, registry: &BlockRegistry) -> DualPrices {
        let mut prices = DualPrices::new(
            self.trips.clone(),
            registry
                .iter()
                .map(|(idx, block)| (block.descriptor, self.block(idx.0))),
        );
        prices.max_vehicles = self.max_vehicles;
        prices.max_duties = self.max_duties;
        prices.average_length = self.average_length;
        prices.long_duties = self.long_duties;
        prices.broken_duties = self.broken_duties;
        prices.between_duties = self.between_duties;
        prices
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// Subproblem ///////////////////////////
/////////////////////////////////////////////////////////////////////

/// Minimizer of the Lagrangian function over the pool: the cheapest tasks with negative reduced
/// cost up to the fleet size, every duty with negative reduced cost as often as the busiest block
/// of the chosen tasks.
#[derive(Debug, Clone, PartialEq)]
struct Subproblem {
    tasks: Vec<ColumnIdx>,
    duties: Vec<(ColumnIdx, usize)>,
    lower_bound: Cost,
}

impl Subproblem {
    fn solve(pool: &ColumnPool, multipliers: &Multipliers, config: &Config) -> Subproblem {
        let master = &config.master;
        let mut lower_bound: Cost = multipliers.trips.iter().sum::<f64>()
            - multipliers.max_vehicles * master.max_vehicles.unwrap_or(0) as f64
            - multipliers.max_duties * master.max_duties.unwrap_or(0) as f64;

        let mut candidates: Vec<(ColumnIdx, Cost)> = pool
            .tasks()
            .iter()
            .enumerate()
            .map(|(idx, column)| (idx, multipliers.task_reduced_cost(column)))
            .filter(|(_, reduced_cost)| *reduced_cost < 0.0)
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        // beyond the fleet size a task also pays for the slack, without slack it is cut off
        let mut tasks = Vec::new();
        let mut block_use = vec![0usize; pool.blocks().len()];
        for (rank, (idx, reduced_cost)) in candidates.into_iter().enumerate() {
            let reduced_cost = match master.max_vehicles {
                Some(limit) if rank >= limit && master.vehicle_over_max_cost > 0.0 => {
                    reduced_cost + master.vehicle_over_max_cost
                }
                Some(limit) if rank >= limit => break,
                _ => reduced_cost,
            };
            if reduced_cost >= 0.0 {
                break;
            }
            tasks.push(idx);
            lower_bound += reduced_cost;
            for block in pool.task(idx).blocks.iter() {
                block_use[block.0] += 1;
            }
        }

        let copies = block_use.iter().copied().max().unwrap_or(0).max(1);
        let mut duties = Vec::new();
        for (idx, column) in pool.duties().iter().enumerate() {
            let reduced_cost = multipliers.duty_reduced_cost(&column.duty, config);
            if reduced_cost < 0.0 {
                duties.push((idx, copies));
                lower_bound += reduced_cost * copies as f64;
            }
        }

        Subproblem {
            tasks,
            duties,
            lower_bound,
        }
    }

    fn subgradient(&self, pool: &ColumnPool, config: &Config) -> Multipliers {
        let master = &config.master;
        let mut gradient = Multipliers::new(pool.instance().trip_count(), pool.blocks().len());
        gradient.trips.iter_mut().for_each(|g| *g = 1.0);
        for idx in self.tasks.iter() {
            let column = pool.task(*idx);
            for trip in column.task.trip_sequence() {
                gradient.trips[trip.0] -= 1.0;
            }
            for block in column.blocks.iter() {
                gradient.blocks[block.0] -= 1.0;
            }
        }
        for (idx, copies) in self.duties.iter() {
            let duty = &pool.duty(*idx).duty;
            let copies = *copies as f64;
            for block in duty.blocks() {
                gradient.blocks[block.0] += copies;
            }
            let coefficients = duty.aggregate_coefficients(&config.crew);
            gradient.average_length += coefficients.average_length * copies;
            gradient.long_duties -= coefficients.long * copies;
            gradient.broken_duties -= coefficients.broken * copies;
            gradient.between_duties -= coefficients.between * copies;
        }
        if let Some(limit) = master.max_vehicles {
            gradient.max_vehicles = self.tasks.len() as f64 - limit as f64;
        }
        if let Some(limit) = master.max_duties {
            let duties: usize = self.duties.iter().map(|(_, copies)| copies).sum();
            gradient.max_duties = duties as f64 - limit as f64;
        }
        gradient
    }
}

/// Cost of a selection with every violated soft row charged: aggregate crew-mix rows at the hard
/// constraint penalty, fleet and crew size excess at its over-max cost.
fn penalized_cost(pool: &ColumnPool, selection: &Selection, config: &Config) -> Cost {
    let master = &config.master;
    let penalty = config.crew.hard_constraint_penalty;
    let mut cost: Cost = selection.tasks.iter().map(|t| pool.task(*t).task.cost()).sum();
    let (mut average, mut long, mut broken, mut between) = (0.0, 0.0, 0.0, 0.0);
    for idx in selection.duties.iter() {
        let duty = &pool.duty(*idx).duty;
        cost += duty.cost();
        let coefficients = duty.aggregate_coefficients(&config.crew);
        average += coefficients.average_length;
        long += coefficients.long;
        broken += coefficients.broken;
        between += coefficients.between;
    }
    let violation = average.max(0.0) + (-long).max(0.0) + (-broken).max(0.0) + (-between).max(0.0);
    cost += violation * penalty;

    let excess = |count: usize, limit: Option<usize>, over_cost: Cost| match limit {
        Some(limit) if count > limit => {
            let rate = if over_cost > 0.0 { over_cost } else { penalty };
            (count - limit) as f64 * rate
        }
        _ => 0.0,
    };
    cost + excess(
        selection.tasks.len(),
        master.max_vehicles,
        master.vehicle_over_max_cost,
    ) + excess(
        selection.duties.len(),
        master.max_duties,
        master.crew_over_max_cost,
    )
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// LagrangeMaster ///////////////////////
/////////////////////////////////////////////////////////////////////

/// Column generation driven by Lagrangian multipliers instead of LP duals. After every batch of
/// columns the multipliers are re-optimized by subgradient descent; an external solver is only
/// needed for the final MIP over the pool.
pub struct LagrangeMaster<S: MasterSolver> {
    network: Arc<VehicleNetwork>,
    config: Arc<Config>,
    solver: S,
    pool: ColumnPool,
    vehicle_mix: GeneratorMix<dyn VehicleColumnGenerator>,
    stop: Arc<AtomicBool>,
    rng: StdRng,
    limits: Limits,
    multipliers: Multipliers,
    upper_bound: Cost,
    lower_bound: Option<Cost>,
    selected_tasks: Vec<ColumnIdx>,
}

// static functions
impl<S: MasterSolver> LagrangeMaster<S> {
    pub fn new(
        network: Arc<VehicleNetwork>,
        config: Arc<Config>,
        mut solver: S,
        stop: Arc<AtomicBool>,
    ) -> anyhow::Result<LagrangeMaster<S>> {
        let pool = ColumnPool::with_unit_columns(network.instance().clone(), config.clone())
            .map_err(|err| anyhow!(err))
            .context("cannot seed the column pool")?;
        solver.terminate(stop.clone());
        let unit_selection = Selection {
            tasks: (0..pool.task_count()).collect(),
            duties: (0..pool.duty_count()).collect(),
        };
        let upper_bound = penalized_cost(&pool, &unit_selection, &config);
        let vehicle_mix = vehicle_generators(
            Arc::new(VehicleLabeling::new(network.clone(), config.clone())),
            Arc::new(VehicleLocalSearch::new(network.clone(), config.clone())),
            &config.master.vehicle_generators,
        )
        .map_err(|err| anyhow!(err))?;
        Ok(LagrangeMaster {
            rng: StdRng::seed_from_u64(config.seed),
            limits: Limits::new(&config),
            multipliers: Multipliers::new(pool.instance().trip_count(), pool.blocks().len()),
            network,
            config,
            solver,
            pool,
            vehicle_mix,
            stop,
            upper_bound,
            lower_bound: None,
            selected_tasks: Vec::new(),
        })
    }
}

// modifying methods
impl<S: MasterSolver> LagrangeMaster<S> {
    /// Runs the pricing rounds, the disruption rounds and the final MIP. A raised stop flag ends
    /// the rounds, and the MIP over the current pool still produces a solution.
    pub fn solve(&mut self) -> anyhow::Result<MasterSolution> {
        self.run_rounds()?;
        self.finish().context("final mip")
    }

    fn run_rounds(&mut self) -> anyhow::Result<()> {
        let start_time = stdtime::Instant::now();
        let config = self.config.clone();
        let lagrange = &config.master.lagrange;

        if stop_requested(&self.stop, config.verbose, "the initial subgradient descent") {
            return Ok(());
        }
        self.optimize_multipliers(true)
            .context("initial subgradient descent")?;
        for round in 0..lagrange.rounds {
            let label = format!("round {}", round);
            if stop_requested(&self.stop, config.verbose, &label) {
                return Ok(());
            }
            let (vehicle_iterations, crew_iterations) = if round == 0 {
                (lagrange.vehicle_iterations_init, lagrange.crew_iterations_init)
            } else {
                (lagrange.vehicle_iterations_round, lagrange.crew_iterations_round)
            };
            self.vehicle_phase(vehicle_iterations, true)
                .with_context(|| format!("{}: vehicle pricing", label))?;
            self.crew_phase(crew_iterations, true)
                .with_context(|| format!("{}: crew pricing", label))?;
            self.report_round(&label, start_time);
        }

        for round in 0..lagrange.disruption_rounds {
            let label = format!("disruption round {}", round);
            if stop_requested(&self.stop, config.verbose, &label) {
                return Ok(());
            }
            self.disrupt();
            self.vehicle_phase(lagrange.vehicle_iterations_round, false)
                .with_context(|| format!("{}: vehicle pricing", label))?;
            self.crew_phase(lagrange.crew_iterations_round, false)
                .with_context(|| format!("{}: crew pricing", label))?;
            self.report_round(&label, start_time);
        }
        Ok(())
    }

    /// Subgradient descent from the current multipliers. The best multipliers found are kept,
    /// the pool is pruned against them if allowed, and their subproblem selection becomes the
    /// current one. Returns the best lower bound.
    fn optimize_multipliers(&mut self, allow_pruning: bool) -> anyhow::Result<Cost> {
        let config = self.config.clone();
        let lagrange = &config.master.lagrange;

        let mut pi = lagrange.pi_start;
        let mut best: Option<(Cost, Multipliers)> = None;
        let mut since_improvement = 0;
        let mut stable = 0;
        for _ in 0..lagrange.max_subgradient_rounds {
            let subproblem = Subproblem::solve(&self.pool, &self.multipliers, &config);
            let bound = subproblem.lower_bound;
            let improvement = match &best {
                Some((best_bound, _)) => bound - best_bound,
                None => f64::INFINITY,
            };
            if improvement > 0.0 {
                best = Some((bound, self.multipliers.clone()));
                since_improvement = 0;
            } else {
                since_improvement += 1;
            }
            if improvement < lagrange.stabilization_epsilon * bound.abs().max(1.0) {
                stable += 1;
                if stable >= lagrange.stabilization_rounds {
                    break;
                }
            } else {
                stable = 0;
            }
            if since_improvement >= lagrange.rounds_without_improvement {
                pi *= lagrange.pi_cooling;
                since_improvement = 0;
                if pi < lagrange.pi_end {
                    break;
                }
            }

            let mut gradient = subproblem.subgradient(&self.pool, &config);
            gradient.project(&self.multipliers, &self.limits);
            let norm = gradient.norm_squared();
            let gap = self.upper_bound - bound;
            if norm <= 0.0 || gap <= 0.0 {
                break;
            }
            self.multipliers
                .step(&gradient, pi * gap / norm, &self.limits);
        }

        if let Some((bound, multipliers)) = best {
            self.multipliers = multipliers;
            self.lower_bound = Some(bound);
        }
        if allow_pruning {
            self.prune();
        }
        self.selected_tasks = Subproblem::solve(&self.pool, &self.multipliers, &config).tasks;
        Ok(self.lower_bound.unwrap_or(f64::NEG_INFINITY))
    }

    /// Shrinks the pool to the configured sizes, keeping the columns of lowest reduced cost and
    /// all unit columns.
    fn prune(&mut self) {
        let lagrange = &self.config.master.lagrange;
        let multipliers = &self.multipliers;
        if self.pool.task_count() > lagrange.max_tasks_during {
            let reduced_costs: Vec<Option<Cost>> = self
                .pool
                .tasks()
                .iter()
                .map(|c| (!c.unit).then(|| multipliers.task_reduced_cost(c)))
                .collect();
            let keep = best_by_reduced_cost(&reduced_costs, lagrange.max_tasks_during);
            self.pool.retain_tasks(|idx, _| keep[idx]);
        }
        if self.pool.duty_count() > lagrange.max_duties_during {
            let config = &self.config;
            let reduced_costs: Vec<Option<Cost>> = self
                .pool
                .duties()
                .iter()
                .map(|c| (!c.unit).then(|| multipliers.duty_reduced_cost(&c.duty, config)))
                .collect();
            let keep = best_by_reduced_cost(&reduced_costs, lagrange.max_duties_during);
            self.pool.retain_duties(|idx, _| keep[idx]);
        }
    }

    /// Multiplies trip and block multipliers by random factors to leave a local optimum.
    fn disrupt(&mut self) {
        let lagrange = &self.config.master.lagrange;
        if lagrange.disruption_lower >= lagrange.disruption_upper {
            return;
        }
        for value in self
            .multipliers
            .trips
            .iter_mut()
            .chain(self.multipliers.blocks.iter_mut())
        {
            *value *= self
                .rng
                .gen_range(lagrange.disruption_lower..lagrange.disruption_upper);
        }
    }

    /// Up to `iterations` vehicle batches, each followed by a multiplier update. Stops early once
    /// the generators find nothing new.
    fn vehicle_phase(&mut self, iterations: usize, allow_pruning: bool) -> anyhow::Result<()> {
        for iteration in 0..iterations {
            let prices = self.multipliers.to_prices(self.pool.blocks());
            let columns = generate_vehicle_batch(
                &self.vehicle_mix,
                &prices,
                &self.pool.known_trip_sets(),
                self.config.master.instances_per_iteration,
                &mut self.rng,
            )
            .map_err(|err| anyhow!(err))
            .with_context(|| format!("iteration {}", iteration))?;
            if columns.is_empty() {
                break;
            }
            for priced in columns {
                self.pool.add_task(priced.column, false);
            }
            self.multipliers.resize_blocks(self.pool.blocks().len());
            self.optimize_multipliers(allow_pruning)
                .with_context(|| format!("iteration {}", iteration))?;
        }
        Ok(())
    }

    /// Crew counterpart of [`Self::vehicle_phase`] on the blocks of the currently selected tasks.
    fn crew_phase(&mut self, iterations: usize, allow_pruning: bool) -> anyhow::Result<()> {
        let network = CrewNetwork::new(
            self.pool.instance().clone(),
            &self.config.crew,
            self.pool.blocks(),
            active_blocks(&self.pool, &self.selected_tasks).into_iter(),
        );
        let mix = crew_generators(
            Arc::new(network),
            self.config.clone(),
            &self.config.master.crew_generators,
        )
        .map_err(|err| anyhow!(err))?;

        for iteration in 0..iterations {
            let prices = self.multipliers.to_prices(self.pool.blocks());
            let columns = generate_crew_batch(
                &mix,
                &prices,
                self.config.master.instances_per_iteration,
                &mut self.rng,
            )
            .map_err(|err| anyhow!(err))
            .with_context(|| format!("iteration {}", iteration))?;
            if columns.is_empty() {
                break;
            }
            for priced in columns {
                self.pool.add_duty(priced.column, false);
            }
            self.optimize_multipliers(allow_pruning)
                .with_context(|| format!("iteration {}", iteration))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<MasterSolution> {
        let model = MasterModel::build(&mut self.solver, &self.pool, self.config.clone());
        self.solver.fix_to_binary(&model.column_variables());
        let mip = self
            .solver
            .solve_mip()
            .map_err(|failure| report_failure(failure, self.config.verbose))?;
        let selection = model.selection(&mip.values);
        let solution = MasterSolution::assemble(
            &self.pool,
            &self.network,
            &selection,
            mip.objective,
            self.lower_bound,
        );
        if self.config.verbose {
            solution.print();
        }
        Ok(solution)
    }

    fn report_round(&self, label: &str, start_time: stdtime::Instant) {
        if self.config.verbose {
            println!(
                "{}: lower bound {:.2}, upper bound {:.2}, {} tasks, {} duties ({:0.2}sec)",
                label,
                self.lower_bound.unwrap_or(f64::NEG_INFINITY),
                self.upper_bound,
                self.pool.task_count(),
                self.pool.duty_count(),
                start_time.elapsed().as_secs_f32()
            );
        }
    }
}

// methods
impl<S: MasterSolver> LagrangeMaster<S> {
    pub fn pool(&self) -> &ColumnPool {
        &self.pool
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn multipliers(&self) -> &Multipliers {
        &self.multipliers
    }

    pub fn lower_bound(&self) -> Option<Cost> {
        self.lower_bound
    }

    /// Penalized cost of the unit schedule, the target of every subgradient step.
    pub fn upper_bound(&self) -> Cost {
        self.upper_bound
    }
}

/// Marks the `cap` candidates of lowest reduced cost. `None` entries are never marked.
fn best_by_reduced_cost(reduced_costs: &[Option<Cost>], cap: usize) -> Vec<bool> {
    let mut candidates: Vec<(usize, Cost)> = reduced_costs
        .iter()
        .enumerate()
        .filter_map(|(idx, rc)| rc.map(|rc| (idx, rc)))
        .collect();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    let mut keep = vec![false; reduced_costs.len()];
    for (idx, _) in candidates.into_iter().take(cap) {
        keep[idx] = true;
    }
    keep
}
