use heuristic_framework::simulated_annealing::{AnnealingState, SimulatedAnnealing};
use model::base_types::TripIdx;
use model::config::VehicleGlobalConfig;
use rand::rngs::StdRng;
use rand::Rng;
use solution::vehicle_task::VehicleTask;
use time::Time;

use super::{
    annealing_parameters, charge_positions, free_gaps, insertion_position, normalize, pick,
    unique_columns, Evaluation, RouteEvaluator, Stop, StopIdx,
};
use crate::columns::Priced;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalOperator {
    SwapTails,
    MoveRange,
    AddCharge,
    RemoveCharge,
}

pub struct GlobalUndo {
    changed: Vec<(usize, Vec<StopIdx>, Evaluation)>,
    pushed: bool,
}

/// A full vehicle schedule: every servable trip on exactly one route. Routes emptied by a move
/// stay in place as empty slots.
pub struct RouteSchedule<'e, 'a> {
    evaluator: &'e RouteEvaluator<'a>,
    routes: Vec<Vec<StopIdx>>,
    evaluations: Vec<Evaluation>,
}

// static functions
impl<'e, 'a> RouteSchedule<'e, 'a> {
    /// One route per trip. Trips that cannot be served alone are left out.
    pub fn unit_routes(evaluator: &'e RouteEvaluator<'a>) -> Self {
        let arena = evaluator.arena();
        let trip_count = evaluator.network().instance().trip_count();
        let (routes, evaluations): (Vec<_>, Vec<_>) = (0..trip_count)
            .filter_map(|t| {
                let stops = vec![arena.trip_stop(TripIdx(t))];
                evaluator.evaluate(&stops).map(|e| (stops, e))
            })
            .unzip();
        RouteSchedule {
            evaluator,
            routes,
            evaluations,
        }
    }
}

// methods
impl<'e, 'a> RouteSchedule<'e, 'a> {
    pub fn routes(&self) -> &[Vec<StopIdx>] {
        &self.routes
    }

    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    pub fn objective(&self) -> f64 {
        self.evaluations.iter().map(|e| e.objective()).sum()
    }

    /// Routes of the trips, in route order.
    pub fn trip_sequences(&self) -> Vec<Vec<TripIdx>> {
        let arena = self.evaluator.arena();
        self.routes
            .iter()
            .map(|r| {
                r.iter()
                    .filter_map(|s| match arena.get(*s) {
                        Stop::Trip(t) => Some(t),
                        Stop::Charge(_) => None,
                    })
                    .collect()
            })
            .collect()
    }

    fn non_empty(&self) -> Vec<usize> {
        (0..self.routes.len())
            .filter(|r| !self.routes[*r].is_empty())
            .collect()
    }

    fn trip_starts(&self, route: usize) -> Vec<Time> {
        let instance = self.evaluator.network().instance();
        let arena = self.evaluator.arena();
        self.routes[route]
            .iter()
            .filter_map(|s| match arena.get(*s) {
                Stop::Trip(t) => Some(instance.trip(t).start_time),
                Stop::Charge(_) => None,
            })
            .collect()
    }

    /// Position directly behind the last trip starting before `time`. Charges after that trip
    /// belong to the tail.
    fn cut_at(&self, route: usize, time: Time) -> usize {
        let instance = self.evaluator.network().instance();
        let arena = self.evaluator.arena();
        self.routes[route]
            .iter()
            .rposition(|s| match arena.get(*s) {
                Stop::Trip(t) => instance.trip(t).start_time < time,
                Stop::Charge(_) => false,
            })
            .map_or(0, |p| p + 1)
    }

    /// Replaces the given routes if all of them can be evaluated. Nothing changes otherwise.
    fn replace(
        &mut self,
        replacements: Vec<(usize, Vec<StopIdx>)>,
        pushed: bool,
    ) -> Option<(f64, GlobalUndo)> {
        let arena = self.evaluator.arena();
        let mut evaluated = Vec::with_capacity(replacements.len());
        for (route, mut stops) in replacements {
            normalize(&mut stops, arena);
            let evaluation = self.evaluator.evaluate(&stops)?;
            evaluated.push((route, stops, evaluation));
        }
        if pushed {
            self.routes.push(Vec::new());
            self.evaluations.push(Evaluation::EMPTY);
        }
        let mut delta = 0.0;
        let mut changed = Vec::with_capacity(evaluated.len());
        for (route, stops, evaluation) in evaluated {
            delta += evaluation.objective() - self.evaluations[route].objective();
            let old_stops = std::mem::replace(&mut self.routes[route], stops);
            let old_evaluation = std::mem::replace(&mut self.evaluations[route], evaluation);
            changed.push((route, old_stops, old_evaluation));
        }
        Some((delta, GlobalUndo { changed, pushed }))
    }

    /// Exchanges the parts of two routes behind a common cut time (2-opt on vehicle routes).
    /// The cut time is the start of a random trip of either route.
    fn swap_tails(&mut self, rng: &mut StdRng) -> Option<(f64, GlobalUndo)> {
        let candidates = self.non_empty();
        if candidates.len() < 2 {
            return None;
        }
        let first = candidates[rng.gen_range(0..candidates.len())];
        let second = loop {
            let r = candidates[rng.gen_range(0..candidates.len())];
            if r != first {
                break r;
            }
        };
        let starts: Vec<Time> = [first, second]
            .iter()
            .flat_map(|r| self.trip_starts(*r))
            .collect();
        let cut_time = pick(&starts, rng)?;
        let first_cut = self.cut_at(first, cut_time);
        let second_cut = self.cut_at(second, cut_time);
        let (first_head, first_tail) = self.routes[first].split_at(first_cut);
        let (second_head, second_tail) = self.routes[second].split_at(second_cut);
        if first_tail.is_empty() && second_tail.is_empty() {
            return None;
        }
        let new_first = [first_head, second_tail].concat();
        let new_second = [second_head, first_tail].concat();
        self.replace(vec![(first, new_first), (second, new_second)], false)
    }

    /// Moves a range of consecutive trips (with the charges between them) into another route,
    /// possibly an empty one.
    fn move_range(&mut self, rng: &mut StdRng) -> Option<(f64, GlobalUndo)> {
        let arena = self.evaluator.arena();
        let source = pick(&self.non_empty(), rng)?;
        let stops = &self.routes[source];
        let trip_positions: Vec<usize> =
            (0..stops.len()).filter(|i| arena.is_trip(stops[*i])).collect();
        let start = rng.gen_range(0..trip_positions.len());
        let end = rng.gen_range(start..trip_positions.len());
        let (from, to) = (trip_positions[start], trip_positions[end]);

        let moved: Vec<StopIdx> = stops[from..=to].to_vec();
        let remaining: Vec<StopIdx> = [&stops[..from], &stops[to + 1..]].concat();

        let empty_slot =
            (0..self.routes.len()).find(|r| *r != source && self.routes[*r].is_empty());
        let mut targets: Vec<Option<usize>> = self
            .non_empty()
            .into_iter()
            .filter(|r| *r != source)
            .map(Some)
            .collect();
        targets.push(empty_slot);
        let (target, pushed) = match pick(&targets, rng)? {
            Some(route) => (route, false),
            None => (self.routes.len(), true),
        };

        let mut receiving = if pushed {
            Vec::new()
        } else {
            self.routes[target].clone()
        };
        let first_trip = match arena.get(moved[0]) {
            Stop::Trip(t) => t,
            Stop::Charge(_) => return None,
        };
        let at = insertion_position(&receiving, arena, self.evaluator.network(), first_trip);
        receiving.splice(at..at, moved);
        self.replace(vec![(source, remaining), (target, receiving)], pushed)
    }

    fn add_charge(&mut self, rng: &mut StdRng) -> Option<(f64, GlobalUndo)> {
        let arena = self.evaluator.arena();
        let route = pick(&self.non_empty(), rng)?;
        let gap = pick(&free_gaps(&self.routes[route], arena), rng)?;
        let charger = arena.random_charger(rng)?;
        let mut stops = self.routes[route].clone();
        stops.insert(gap, charger);
        self.replace(vec![(route, stops)], false)
    }

    fn remove_charge(&mut self, rng: &mut StdRng) -> Option<(f64, GlobalUndo)> {
        let arena = self.evaluator.arena();
        let route = pick(&self.non_empty(), rng)?;
        let at = pick(&charge_positions(&self.routes[route], arena), rng)?;
        let mut stops = self.routes[route].clone();
        stops.remove(at);
        self.replace(vec![(route, stops)], false)
    }
}

impl<'e, 'a> AnnealingState for RouteSchedule<'e, 'a> {
    type Operator = GlobalOperator;
    type Undo = GlobalUndo;

    fn apply(&mut self, operator: GlobalOperator, rng: &mut StdRng) -> Option<(f64, GlobalUndo)> {
        match operator {
            GlobalOperator::SwapTails => self.swap_tails(rng),
            GlobalOperator::MoveRange => self.move_range(rng),
            GlobalOperator::AddCharge => self.add_charge(rng),
            GlobalOperator::RemoveCharge => self.remove_charge(rng),
        }
    }

    fn undo(&mut self, undo: GlobalUndo) {
        for (route, stops, evaluation) in undo.changed.into_iter().rev() {
            self.routes[route] = stops;
            self.evaluations[route] = evaluation;
        }
        if undo.pushed {
            self.routes.pop();
            self.evaluations.pop();
        }
    }
}

/// Anneals a schedule covering all trips, starting from unit routes. The penalty-free routes of
/// the final schedule with negative reduced cost become columns.
pub fn search(
    evaluator: &RouteEvaluator,
    config: &VehicleGlobalConfig,
    rng: &mut StdRng,
) -> Result<Vec<Priced<VehicleTask>>, String> {
    let mut schedule = RouteSchedule::unit_routes(evaluator);
    let annealing = SimulatedAnnealing::new(
        vec![
            (GlobalOperator::SwapTails, config.swap_tails),
            (GlobalOperator::MoveRange, config.move_range),
            (GlobalOperator::AddCharge, config.add_charge),
            (GlobalOperator::RemoveCharge, config.remove_charge),
        ],
        annealing_parameters(&config.annealing),
    )?;
    annealing.run(&mut schedule, rng);

    let mut columns: Vec<Priced<VehicleTask>> = schedule
        .routes()
        .iter()
        .zip(schedule.evaluations())
        .filter(|(stops, e)| !stops.is_empty() && e.penalty == 0.0 && e.cost < 0.0)
        .filter_map(|(stops, _)| evaluator.materialize(stops))
        .collect();
    columns.sort_by(|a, b| a.reduced_cost.total_cmp(&b.reduced_cost));
    Ok(unique_columns(columns, &mut Default::default()))
}
