use std::collections::HashSet;

use heuristic_framework::simulated_annealing::{AnnealingState, SimulatedAnnealing};
use model::base_types::TripIdx;
use model::config::VehicleSingleConfig;
use rand::rngs::StdRng;
use rand::Rng;
use solution::vehicle_task::VehicleTask;

use super::{
    annealing_parameters, charge_positions, free_gaps, insertion_position, normalize, pick,
    unique_columns, Evaluation, RouteEvaluator, StopIdx,
};
use crate::columns::Priced;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleOperator {
    AddTrip,
    RemoveTrip,
    AddCharge,
    RemoveCharge,
}

/// How the pool of trips not on the route changed, so that the exact order can be restored.
#[derive(Debug, Clone, Copy)]
enum PoolChange {
    Untouched,
    /// `swap_remove` at this position.
    Taken(usize, TripIdx),
    Returned,
}

pub struct SingleUndo {
    stops: Vec<StopIdx>,
    evaluation: Evaluation,
    pool: PoolChange,
}

/// One vehicle route grown and shrunk by the annealing, the trips not on it form the pool.
pub struct SingleRoute<'e, 'a> {
    evaluator: &'e RouteEvaluator<'a>,
    stops: Vec<StopIdx>,
    evaluation: Evaluation,
    pool: Vec<TripIdx>,
}

impl<'e, 'a> SingleRoute<'e, 'a> {
    /// Route serving `first` only, None if the trip cannot be served on its own.
    pub fn starting_with(evaluator: &'e RouteEvaluator<'a>, first: TripIdx) -> Option<Self> {
        let arena = evaluator.arena();
        let stops = vec![arena.trip_stop(first)];
        let evaluation = evaluator.evaluate(&stops)?;
        let pool = (0..evaluator.network().instance().trip_count())
            .map(TripIdx)
            .filter(|t| *t != first)
            .collect();
        Some(SingleRoute {
            evaluator,
            stops,
            evaluation,
            pool,
        })
    }

    pub fn stops(&self) -> &[StopIdx] {
        &self.stops
    }

    pub fn evaluation(&self) -> Evaluation {
        self.evaluation
    }

    pub fn pool(&self) -> &[TripIdx] {
        &self.pool
    }

    fn trip_positions(&self) -> Vec<usize> {
        let arena = self.evaluator.arena();
        (0..self.stops.len())
            .filter(|i| arena.is_trip(self.stops[*i]))
            .collect()
    }

    /// Re-evaluates after `self.stops` was changed. On failure the route is restored and None
    /// is returned.
    fn commit(&mut self, previous: Vec<StopIdx>, pool: PoolChange) -> Option<(f64, SingleUndo)> {
        let undo = SingleUndo {
            stops: previous,
            evaluation: self.evaluation,
            pool,
        };
        match self.evaluator.evaluate(&self.stops) {
            Some(evaluation) => {
                let delta = evaluation.objective() - self.evaluation.objective();
                self.evaluation = evaluation;
                Some((delta, undo))
            }
            None => {
                self.undo(undo);
                None
            }
        }
    }

    fn add_trip(&mut self, rng: &mut StdRng) -> Option<(f64, SingleUndo)> {
        if self.pool.is_empty() {
            return None;
        }
        let position = rng.gen_range(0..self.pool.len());
        let trip = self.pool.swap_remove(position);
        let previous = self.stops.clone();
        let arena = self.evaluator.arena();
        let at = insertion_position(&self.stops, arena, self.evaluator.network(), trip);
        self.stops.insert(at, arena.trip_stop(trip));
        self.commit(previous, PoolChange::Taken(position, trip))
    }

    fn remove_trip(&mut self, rng: &mut StdRng) -> Option<(f64, SingleUndo)> {
        let at = pick(&self.trip_positions(), rng)?;
        let previous = self.stops.clone();
        let arena = self.evaluator.arena();
        let trip = TripIdx(self.stops.remove(at));
        normalize(&mut self.stops, arena);
        self.pool.push(trip);
        self.commit(previous, PoolChange::Returned)
    }

    fn add_charge(&mut self, rng: &mut StdRng) -> Option<(f64, SingleUndo)> {
        let arena = self.evaluator.arena();
        let gap = pick(&free_gaps(&self.stops, arena), rng)?;
        let charger = arena.random_charger(rng)?;
        let previous = self.stops.clone();
        self.stops.insert(gap, charger);
        self.commit(previous, PoolChange::Untouched)
    }

    fn remove_charge(&mut self, rng: &mut StdRng) -> Option<(f64, SingleUndo)> {
        let at = pick(&charge_positions(&self.stops, self.evaluator.arena()), rng)?;
        let previous = self.stops.clone();
        self.stops.remove(at);
        self.commit(previous, PoolChange::Untouched)
    }
}

impl<'e, 'a> AnnealingState for SingleRoute<'e, 'a> {
    type Operator = SingleOperator;
    type Undo = SingleUndo;

    fn apply(&mut self, operator: SingleOperator, rng: &mut StdRng) -> Option<(f64, SingleUndo)> {
        match operator {
            SingleOperator::AddTrip => self.add_trip(rng),
            SingleOperator::RemoveTrip => self.remove_trip(rng),
            SingleOperator::AddCharge => self.add_charge(rng),
            SingleOperator::RemoveCharge => self.remove_charge(rng),
        }
    }

    fn undo(&mut self, undo: SingleUndo) {
        self.stops = undo.stops;
        self.evaluation = undo.evaluation;
        match undo.pool {
            PoolChange::Untouched => {}
            PoolChange::Taken(position, trip) => {
                self.pool.push(trip);
                let last = self.pool.len() - 1;
                self.pool.swap(position, last);
            }
            PoolChange::Returned => {
                self.pool.pop();
            }
        }
    }
}

/// Anneals a single route starting from a random trip. Every snapshot of a penalty-free route
/// with negative reduced cost becomes a column.
pub fn search(
    evaluator: &RouteEvaluator,
    config: &VehicleSingleConfig,
    rng: &mut StdRng,
) -> Result<Vec<Priced<VehicleTask>>, String> {
    let trip_count = evaluator.network().instance().trip_count();
    if trip_count == 0 {
        return Ok(Vec::new());
    }
    let first = TripIdx(rng.gen_range(0..trip_count));
    let mut route = match SingleRoute::starting_with(evaluator, first) {
        Some(route) => route,
        None => return Ok(Vec::new()),
    };
    let annealing = SimulatedAnnealing::new(
        vec![
            (SingleOperator::AddTrip, config.add_trip),
            (SingleOperator::RemoveTrip, config.remove_trip),
            (SingleOperator::AddCharge, config.add_charge),
            (SingleOperator::RemoveCharge, config.remove_charge),
        ],
        annealing_parameters(&config.annealing),
    )?;

    let mut snapshots: Vec<Vec<StopIdx>> = Vec::new();
    annealing.run_with_snapshots(&mut route, rng, config.snapshots, |state, _| {
        let evaluation = state.evaluation();
        if evaluation.penalty == 0.0 && evaluation.cost < 0.0 && !state.stops().is_empty() {
            snapshots.push(state.stops().to_vec());
        }
    });

    let mut columns: Vec<Priced<VehicleTask>> = snapshots
        .iter()
        .filter_map(|stops| evaluator.materialize(stops))
        .filter(|c| c.reduced_cost < 0.0)
        .collect();
    columns.sort_by(|a, b| a.reduced_cost.total_cmp(&b.reduced_cost));
    Ok(unique_columns(columns, &mut HashSet::new()))
}
