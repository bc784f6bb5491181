
use std::collections::HashSet;
use std::sync::Arc;

use heuristic_framework::simulated_annealing::{AnnealingState, SimulatedAnnealing};
use model::base_types::Cost;
use model::config::{Config, CrewLocalSearchConfig};
use model::cover_set::CoverSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use solution::crew_duty::{CrewDuty, DutyType};
use solution::dual_prices::DualPrices;
use time::Time;

use crate::columns::Priced;
use crate::crew_network::CrewNetwork;
use crate::vehicle_local_search::{annealing_parameters, pick};

/// Best duty type of a block sequence. `cost` is the reduced cost, `penalty` prices the labor
/// rule violations and missing crew bases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DutyEvaluation {
    pub duty_type: Option<DutyType>,
    pub cost: Cost,
    pub penalty: Cost,
}

impl DutyEvaluation {
    pub const EMPTY: DutyEvaluation = DutyEvaluation {
        duty_type: None,
        cost: 0.0,
        penalty: 0.0,
    };

    pub fn objective(&self) -> Cost {
        self.cost + self.penalty
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// DutyEvaluator ////////////////////////
/////////////////////////////////////////////////////////////////////

/// Prices block sequences (positions in the crew network) as duties.
pub struct DutyEvaluator<'a> {
    network: &'a CrewNetwork,
    config: &'a Config,
    duals: &'a DualPrices,
}

impl<'a> DutyEvaluator<'a> {
    pub fn new(
        network: &'a CrewNetwork,
        config: &'a Config,
        duals: &'a DualPrices,
    ) -> DutyEvaluator<'a> {
        DutyEvaluator {
            network,
            config,
            duals,
        }
    }

    pub fn network(&self) -> &CrewNetwork {
        self.network
    }

    /// Tries every priced duty type and keeps the cheapest including penalties. None if two
    /// consecutive blocks are not linked.
    pub fn evaluate(&self, positions: &[usize]) -> Option<DutyEvaluation> {
        if positions.is_empty() {
            return Some(DutyEvaluation::EMPTY);
        }
        let (elements, missing_bases) = self.network.duty_elements(positions)?;
        let block_duals: Cost = positions
            .iter()
            .map(|p| self.duals.block(&self.network.block(*p).1.descriptor))
            .sum();
        let rules = &self.config.crew;
        let weights = &self.config.crew_local_search;

        DutyType::PRICED
            .iter()
            .filter_map(|duty_type| {
                let duty = CrewDuty::new(*duty_type, elements.clone(), rules).ok()?;
                let hours = duty.paid_duration().in_hours();
                let violations: Cost = duty
                    .violations(rules)
                    .iter()
                    .map(|v| v.penalty(weights))
                    .sum();
                let penalty =
                    (violations + weights.crew_hub_penalty * missing_bases as f64) * hours;
                Some(DutyEvaluation {
                    duty_type: Some(*duty_type),
                    cost: duty.cost()
                        + block_duals
                        + self.duals.aggregate_terms(&duty, rules)
                        + self.duals.max_duties,
                    penalty,
                })
            })
            .min_by(|a, b| a.objective().total_cmp(&b.objective()))
    }

    pub fn materialize(
        &self,
        positions: &[usize],
        evaluation: &DutyEvaluation,
    ) -> Option<Priced<CrewDuty>> {
        let duty_type = evaluation.duty_type?;
        let (elements, missing_bases) = self.network.duty_elements(positions)?;
        if missing_bases > 0 {
            return None;
        }
        let duty = CrewDuty::new(duty_type, elements, &self.config.crew).ok()?;
        debug_assert!(duty.violations(&self.config.crew).is_empty());
        Some(Priced::new(evaluation.cost, duty))
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// DutySchedule /////////////////////////
/////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrewOperator {
    SwapTails,
    MoveRange,
    MoveSingle,
}

pub struct CrewUndo {
    changed: Vec<(usize, Vec<usize>, DutyEvaluation)>,
    pushed: bool,
}

/// Every block of the network on exactly one duty. Block positions are sorted by start time,
/// so a sorted duty is in driving order.
pub struct DutySchedule<'e, 'a> {
    evaluator: &'e DutyEvaluator<'a>,
    duties: Vec<Vec<usize>>,
    evaluations: Vec<DutyEvaluation>,
}

// static functions
impl<'e, 'a> DutySchedule<'e, 'a> {
    /// One duty per block.
    pub fn single_duties(evaluator: &'e DutyEvaluator<'a>) -> Self {
        let (duties, evaluations): (Vec<_>, Vec<_>) = (0..evaluator.network().node_count())
            .filter_map(|p| evaluator.evaluate(&[p]).map(|e| (vec![p], e)))
            .unzip();
        DutySchedule {
            evaluator,
            duties,
            evaluations,
        }
    }
}

// methods
impl<'e, 'a> DutySchedule<'e, 'a> {
    pub fn duties(&self) -> &[Vec<usize>] {
        &self.duties
    }

    pub fn evaluations(&self) -> &[DutyEvaluation] {
        &self.evaluations
    }

    pub fn objective(&self) -> Cost {
        self.evaluations.iter().map(|e| e.objective()).sum()
    }

    fn non_empty(&self) -> Vec<usize> {
        (0..self.duties.len())
            .filter(|d| !self.duties[*d].is_empty())
            .collect()
    }

    /// Another non-empty duty or an empty slot (None: a new one is pushed).
    fn random_target(&self, source: usize, rng: &mut StdRng) -> Option<Option<usize>> {
        let empty_slot =
            (0..self.duties.len()).find(|d| *d != source && self.duties[*d].is_empty());
        let mut targets: Vec<Option<usize>> = self
            .non_empty()
            .into_iter()
            .filter(|d| *d != source)
            .map(Some)
            .collect();
        targets.push(empty_slot);
        pick(&targets, rng)
    }

    fn replace(
        &mut self,
        replacements: Vec<(usize, Vec<usize>)>,
        pushed: bool,
    ) -> Option<(f64, CrewUndo)> {
        let mut evaluated = Vec::with_capacity(replacements.len());
        for (duty, positions) in replacements {
            let evaluation = self.evaluator.evaluate(&positions)?;
            evaluated.push((duty, positions, evaluation));
        }
        if pushed {
            self.duties.push(Vec::new());
            self.evaluations.push(DutyEvaluation::EMPTY);
        }
        let mut delta = 0.0;
        let mut changed = Vec::with_capacity(evaluated.len());
        for (duty, positions, evaluation) in evaluated {
            delta += evaluation.objective() - self.evaluations[duty].objective();
            let old_positions = std::mem::replace(&mut self.duties[duty], positions);
            let old_evaluation = std::mem::replace(&mut self.evaluations[duty], evaluation);
            changed.push((duty, old_positions, old_evaluation));
        }
        Some((delta, CrewUndo { changed, pushed }))
    }

    /// Exchanges the blocks of two duties starting at or after a common cut time, the start of
    /// a random block of either duty.
    fn swap_tails(&mut self, rng: &mut StdRng) -> Option<(f64, CrewUndo)> {
        let candidates = self.non_empty();
        if candidates.len() < 2 {
            return None;
        }
        let first = candidates[rng.gen_range(0..candidates.len())];
        let second = loop {
            let d = candidates[rng.gen_range(0..candidates.len())];
            if d != first {
                break d;
            }
        };
        let evaluator = self.evaluator;
        let network = evaluator.network();
        let start_of = |p: &usize| network.block(*p).1.start_time();
        let starts: Vec<Time> = self.duties[first]
            .iter()
            .chain(self.duties[second].iter())
            .map(start_of)
            .collect();
        let cut_time = pick(&starts, rng)?;
        let first_cut = self.duties[first].partition_point(|p| start_of(p) < cut_time);
        let second_cut = self.duties[second].partition_point(|p| start_of(p) < cut_time);
        let (first_head, first_tail) = self.duties[first].split_at(first_cut);
        let (second_head, second_tail) = self.duties[second].split_at(second_cut);
        if first_tail.is_empty() && second_tail.is_empty() {
            return None;
        }
        let new_first = [first_head, second_tail].concat();
        let new_second = [second_head, first_tail].concat();
        self.replace(vec![(first, new_first), (second, new_second)], false)
    }

    /// Moves the blocks `[start, end]` of a random duty into another one, keeping it sorted.
    fn move_blocks(&mut self, single: bool, rng: &mut StdRng) -> Option<(f64, CrewUndo)> {
        let source = pick(&self.non_empty(), rng)?;
        let len = self.duties[source].len();
        let start = rng.gen_range(0..len);
        let end = if single {
            start
        } else {
            rng.gen_range(start..len)
        };
        let moved = &self.duties[source][start..=end];
        let remaining = [&self.duties[source][..start], &self.duties[source][end + 1..]].concat();

        let (target, pushed) = match self.random_target(source, rng)? {
            Some(duty) => (duty, false),
            None => (self.duties.len(), true),
        };
        let mut receiving = if pushed {
            Vec::new()
        } else {
            self.duties[target].clone()
        };
        let at = receiving.partition_point(|p| *p < moved[0]);
        if receiving.get(at).map_or(false, |p| *p < moved[moved.len() - 1]) {
            // the range would interleave with the target's blocks
            return None;
        }
        receiving.splice(at..at, moved.iter().copied());
        self.replace(vec![(source, remaining), (target, receiving)], pushed)
    }
}

impl<'e, 'a> AnnealingState for DutySchedule<'e, 'a> {
    type Operator = CrewOperator;
    type Undo = CrewUndo;

    fn apply(&mut self, operator: CrewOperator, rng: &mut StdRng) -> Option<(f64, CrewUndo)> {
        match operator {
            CrewOperator::SwapTails => self.swap_tails(rng),
            CrewOperator::MoveRange => self.move_blocks(false, rng),
            CrewOperator::MoveSingle => self.move_blocks(true, rng),
        }
    }

    fn undo(&mut self, undo: CrewUndo) {
        for (duty, positions, evaluation) in undo.changed.into_iter().rev() {
            self.duties[duty] = positions;
            self.evaluations[duty] = evaluation;
        }
        if undo.pushed {
            self.duties.pop();
            self.evaluations.pop();
        }
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// CrewLocalSearch //////////////////////
/////////////////////////////////////////////////////////////////////

/// Simulated-annealing pricing of crew duties over the blocks of the crew network.
pub struct CrewLocalSearch {
    network: Arc<CrewNetwork>,
    config: Arc<Config>,
}

// static functions
impl CrewLocalSearch {
    pub fn new(network: Arc<CrewNetwork>, config: Arc<Config>) -> CrewLocalSearch {
        CrewLocalSearch { network, config }
    }
}

// methods
impl CrewLocalSearch {
    pub fn network(&self) -> &Arc<CrewNetwork> {
        &self.network
    }

    /// Anneals a duty schedule of all blocks starting from one duty per block. The penalty-free
    /// duties of the final schedule with negative reduced cost become columns.
    pub fn generate_crew_columns(
        &self,
        duals: &DualPrices,
        seed: u64,
    ) -> Result<Vec<Priced<CrewDuty>>, String> {
        let config: &CrewLocalSearchConfig = &self.config.crew_local_search;
        let evaluator = DutyEvaluator::new(&self.network, &self.config, duals);
        let mut schedule = DutySchedule::single_duties(&evaluator);
        let mut rng = StdRng::seed_from_u64(seed);
        let annealing = SimulatedAnnealing::new(
            vec![
                (CrewOperator::SwapTails, config.swap_tails),
                (CrewOperator::MoveRange, config.move_range),
                (CrewOperator::MoveSingle, config.move_single),
            ],
            annealing_parameters(&config.annealing),
        )?;
        let statistics = annealing.run(&mut schedule, &mut rng);

        let mut columns: Vec<Priced<CrewDuty>> = schedule
            .duties()
            .iter()
            .zip(schedule.evaluations())
            .filter(|(positions, e)| !positions.is_empty() && e.penalty == 0.0 && e.cost < 0.0)
            .filter_map(|(positions, e)| evaluator.materialize(positions, e))
            .collect();
        columns.sort_by(|a, b| a.reduced_cost.total_cmp(&b.reduced_cost));
        let node_count = self.network.node_count();
        let mut seen: HashSet<CoverSet> = HashSet::new();
        columns.retain(|c| {
            let positions = c
                .column
                .blocks()
                .iter()
                .filter_map(|b| self.network.position(*b));
            seen.insert(CoverSet::from_indices(node_count, positions))
        });

        if self.config.verbose {
            println!(
                "crew local search: {} columns, best {:.2}, {}",
                columns.len(),
                columns.first().map_or(0.0, |c| c.reduced_cost),
                statistics
            );
        }
        Ok(columns)
    }
}
