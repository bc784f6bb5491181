#[cfg(test)]
mod tests;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time as stdtime;

use anyhow::{anyhow, Context};
use model::config::Config;
use model::network::VehicleNetwork;
use rand::rngs::StdRng;
use rand::SeedableRng;
use solution::column_pool::ColumnPool;

use super::{
    active_blocks, interrupted_by_flag, report_failure, stop_requested, MasterModel,
    MasterSolution, MasterSolver, Relaxation,
};
use crate::crew_network::CrewNetwork;
use crate::generators::{
    crew_generators, generate_crew_batch, generate_vehicle_batch, vehicle_generators,
    CrewColumnGenerator, GeneratorMix, VehicleColumnGenerator,
};
use crate::vehicle_labeling::VehicleLabeling;
use crate::vehicle_local_search::VehicleLocalSearch;

/// Column generation on the LP relaxation of the integrated master problem. Every round prices
/// vehicle tasks until no new column turns up, then crew duties for the blocks the relaxation
/// uses. After the last round all columns are fixed to binary and the MIP is solved.
pub struct LpMaster<S: MasterSolver> {
    network: Arc<VehicleNetwork>,
    config: Arc<Config>,
    solver: S,
    pool: ColumnPool,
    model: MasterModel,
    vehicle_mix: GeneratorMix<dyn VehicleColumnGenerator>,
    stop: Arc<AtomicBool>,
    rng: StdRng,
    last_relaxation: Option<Relaxation>,
    converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Vehicle,
    Crew,
}

// static functions
impl<S: MasterSolver> LpMaster<S> {
    /// Seeds the pool with unit tasks and their single duties and mirrors it into the solver.
    pub fn new(
        network: Arc<VehicleNetwork>,
        config: Arc<Config>,
        mut solver: S,
        stop: Arc<AtomicBool>,
    ) -> anyhow::Result<LpMaster<S>> {
        let pool = ColumnPool::with_unit_columns(network.instance().clone(), config.clone())
            .map_err(|err| anyhow!(err))
            .context("cannot seed the column pool")?;
        solver.terminate(stop.clone());
        let model = MasterModel::build(&mut solver, &pool, config.clone());
        let vehicle_mix = vehicle_generators(
            Arc::new(VehicleLabeling::new(network.clone(), config.clone())),
            Arc::new(VehicleLocalSearch::new(network.clone(), config.clone())),
            &config.master.vehicle_generators,
        )
        .map_err(|err| anyhow!(err))?;
        Ok(LpMaster {
            rng: StdRng::seed_from_u64(config.seed),
            network,
            config,
            solver,
            pool,
            model,
            vehicle_mix,
            stop,
            last_relaxation: None,
            converged: false,
        })
    }
}

// modifying methods
impl<S: MasterSolver> LpMaster<S> {
    /// Runs the pricing rounds and the final MIP. A raised stop flag ends the rounds, and the
    /// MIP over the columns found so far still produces a solution.
    pub fn solve(&mut self) -> anyhow::Result<MasterSolution> {
        match self.run_rounds() {
            Err(err) if !interrupted_by_flag(&err, &self.stop) => return Err(err),
            _ => {}
        }
        self.finish().context("final mip")
    }

    /// Stops after the first round in which both phases converged.
    fn run_rounds(&mut self) -> anyhow::Result<()> {
        let start_time = stdtime::Instant::now();
        for round in 0..self.config.master.lp.rounds {
            if stop_requested(&self.stop, self.config.verbose, &format!("round {}", round)) {
                break;
            }
            let vehicle_converged = self
                .run_phase(Phase::Vehicle)
                .with_context(|| format!("round {}: vehicle pricing", round))?;
            let crew_converged = self
                .run_phase(Phase::Crew)
                .with_context(|| format!("round {}: crew pricing", round))?;
            self.converged = vehicle_converged && crew_converged;
            if self.config.verbose {
                println!(
                    "round {}: lp {:.2}, {} tasks, {} duties ({:0.2}sec)",
                    round,
                    self.last_relaxation.as_ref().map_or(0.0, |r| r.objective),
                    self.pool.task_count(),
                    self.pool.duty_count(),
                    start_time.elapsed().as_secs_f32()
                );
            }
            if self.converged {
                break;
            }
        }
        Ok(())
    }

    fn relax(&mut self) -> anyhow::Result<Relaxation> {
        let relaxation = self
            .solver
            .solve_relaxation()
            .map_err(|failure| report_failure(failure, self.config.verbose))?;
        self.last_relaxation = Some(relaxation.clone());
        Ok(relaxation)
    }

    /// Prices columns of one side until `opt_threshold` iterations in a row bring nothing new.
    /// Returns whether the phase stopped for that reason rather than the iteration cap.
    fn run_phase(&mut self, phase: Phase) -> anyhow::Result<bool> {
        let lp = &self.config.master.lp;
        let (max_iterations, threshold) = match phase {
            Phase::Vehicle => (lp.max_vehicle_iterations, lp.opt_threshold),
            Phase::Crew => (lp.max_crew_iterations, lp.opt_threshold),
        };
        let crew_mix = match phase {
            Phase::Vehicle => None,
            Phase::Crew => Some(self.crew_mix()?),
        };

        let mut without_improvement = 0;
        for iteration in 0..max_iterations {
            let added = match &crew_mix {
                None => self.vehicle_iteration(),
                Some(mix) => self.crew_iteration(mix),
            }
            .with_context(|| format!("iteration {}", iteration))?;
            if added == 0 {
                without_improvement += 1;
                if without_improvement >= threshold {
                    return Ok(true);
                }
            } else {
                without_improvement = 0;
            }
        }
        Ok(false)
    }

    fn vehicle_iteration(&mut self) -> anyhow::Result<usize> {
        let relaxation = self.relax()?;
        let duals = self.model.duals(&relaxation, self.pool.blocks());
        // a cheaper column for a known trip set replaces the old one, so nothing is excluded
        let columns = generate_vehicle_batch(
            &self.vehicle_mix,
            &duals,
            &Default::default(),
            self.config.master.instances_per_iteration,
            &mut self.rng,
        )
        .map_err(|err| anyhow!(err))?;

        let mut added = 0;
        for priced in columns {
            let insertion = self.pool.add_task(priced.column, false);
            if self.model.add_task(&mut self.solver, &self.pool, &insertion) {
                added += 1;
            }
        }
        Ok(added)
    }

    fn crew_iteration(
        &mut self,
        mix: &GeneratorMix<dyn CrewColumnGenerator>,
    ) -> anyhow::Result<usize> {
        let relaxation = self.relax()?;
        let duals = self.model.duals(&relaxation, self.pool.blocks());
        let columns = generate_crew_batch(
            mix,
            &duals,
            self.config.master.instances_per_iteration,
            &mut self.rng,
        )
        .map_err(|err| anyhow!(err))?;

        let mut added = 0;
        for priced in columns {
            let insertion = self.pool.add_duty(priced.column, false);
            if self.model.add_duty(&mut self.solver, &self.pool, insertion) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Crew generators over the blocks of the tasks the current relaxation uses.
    fn crew_mix(&mut self) -> anyhow::Result<GeneratorMix<dyn CrewColumnGenerator>> {
        let values = match &self.last_relaxation {
            Some(relaxation) => relaxation.values.clone(),
            None => self.relax()?.values,
        };
        let tasks = self.model.fractional_tasks(&values);
        let network = CrewNetwork::new(
            self.pool.instance().clone(),
            &self.config.crew,
            self.pool.blocks(),
            active_blocks(&self.pool, &tasks).into_iter(),
        );
        crew_generators(
            Arc::new(network),
            self.config.clone(),
            &self.config.master.crew_generators,
        )
        .map_err(|err| anyhow!(err))
    }

    fn finish(&mut self) -> anyhow::Result<MasterSolution> {
        self.solver.fix_to_binary(&self.model.column_variables());
        let mip = self
            .solver
            .solve_mip()
            .map_err(|failure| report_failure(failure, self.config.verbose))?;
        let selection = self.model.selection(&mip.values);
        let lower_bound = match (&self.last_relaxation, self.converged) {
            (Some(relaxation), true) => Some(relaxation.objective),
            _ => None,
        };
        let solution = MasterSolution::assemble(
            &self.pool,
            &self.network,
            &selection,
            mip.objective,
            lower_bound,
        );
        if self.config.verbose {
            solution.print();
        }
        Ok(solution)
    }
}

// methods
impl<S: MasterSolver> LpMaster<S> {
    pub fn pool(&self) -> &ColumnPool {
        &self.pool
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }
}
