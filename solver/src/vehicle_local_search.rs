pub mod global;
pub mod single;

use std::collections::HashSet;
use std::sync::Arc;
use std::time as stdtime;

use heuristic_framework::simulated_annealing::AnnealingParameters;
use model::base_types::{Cost, LocationIdx, NodeIdx, TripIdx};
use model::config::{AnnealingConfig, Config};
use model::cover_set::CoverSet;
use model::network::{NetworkArc, VehicleNetwork};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use solution::block::blocks_of;
use solution::dual_prices::DualPrices;
use solution::vehicle_task::VehicleTask;

use crate::columns::Priced;
use crate::vehicle_expansion::{
    expand, replay, ArcChoice, ExpansionContext, ExpansionState, IdleSide, Mode,
};

pub type StopIdx = usize;

/// Something a vehicle visits: a trip, or a charger between two trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stop {
    Trip(TripIdx),
    Charge(LocationIdx),
}

/// All stops of a search. Trips come first (stop index = trip index), followed by one stop per
/// charger. Schedules are sequences of stop indices into the arena.
#[derive(Debug, Clone)]
pub struct StopArena {
    stops: Vec<Stop>,
    trip_count: usize,
}

impl StopArena {
    pub fn new(network: &VehicleNetwork) -> StopArena {
        let instance = network.instance();
        let stops = (0..instance.trip_count())
            .map(|t| Stop::Trip(TripIdx(t)))
            .chain(instance.locations().chargers().map(|c| Stop::Charge(c.idx)))
            .collect();
        StopArena {
            stops,
            trip_count: instance.trip_count(),
        }
    }

    pub fn get(&self, idx: StopIdx) -> Stop {
        self.stops[idx]
    }

    pub fn trip_stop(&self, trip: TripIdx) -> StopIdx {
        trip.0
    }

    pub fn is_trip(&self, idx: StopIdx) -> bool {
        idx < self.trip_count
    }

    pub fn charger_count(&self) -> usize {
        self.stops.len() - self.trip_count
    }

    pub fn random_charger(&self, rng: &mut StdRng) -> Option<StopIdx> {
        match self.charger_count() {
            0 => None,
            n => Some(self.trip_count + rng.gen_range(0..n)),
        }
    }
}

/// Cached result of expanding a schedule in soft mode. `cost` is the reduced cost, an empty
/// schedule costs nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub cost: Cost,
    pub penalty: Cost,
}

impl Evaluation {
    pub const EMPTY: Evaluation = Evaluation {
        cost: 0.0,
        penalty: 0.0,
    };

    pub fn objective(&self) -> Cost {
        self.cost + self.penalty
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// RouteEvaluator ///////////////////////
/////////////////////////////////////////////////////////////////////

/// Maps stop sequences onto network arcs and evaluates them.
pub struct RouteEvaluator<'a> {
    network: &'a VehicleNetwork,
    arena: &'a StopArena,
    config: &'a Config,
    duals: &'a DualPrices,
}

// static functions
impl<'a> RouteEvaluator<'a> {
    pub fn new(
        network: &'a VehicleNetwork,
        arena: &'a StopArena,
        config: &'a Config,
        duals: &'a DualPrices,
    ) -> RouteEvaluator<'a> {
        RouteEvaluator {
            network,
            arena,
            config,
            duals,
        }
    }
}

// methods
impl<'a> RouteEvaluator<'a> {
    pub fn arena(&self) -> &StopArena {
        self.arena
    }

    pub fn network(&self) -> &VehicleNetwork {
        self.network
    }

    fn context(&self, mode: Mode) -> ExpansionContext<'a> {
        ExpansionContext {
            instance: self.network.instance(),
            config: self.config,
            duals: self.duals,
            mode,
        }
    }

    /// Arcs and choices of the stop sequence. None if two trips are not connected, a charge
    /// is not between two trips or two charges follow each other.
    pub fn steps(&self, stops: &[StopIdx]) -> Option<Vec<(&'a NetworkArc, ArcChoice)>> {
        let network = self.network;
        let mut steps = Vec::with_capacity(stops.len() + 1);
        let mut previous = NodeIdx::DepotStart;
        let mut pending_charge: Option<LocationIdx> = None;
        for stop in stops.iter().map(|s| self.arena.get(*s)) {
            match stop {
                Stop::Charge(charger) => {
                    if previous == NodeIdx::DepotStart || pending_charge.is_some() {
                        return None;
                    }
                    pending_charge = Some(charger);
                }
                Stop::Trip(trip) => {
                    let node = NodeIdx::Trip(trip);
                    let arc = network.arc_between(previous, node)?;
                    steps.push((arc, self.choice(arc, pending_charge.take())));
                    previous = node;
                }
            }
        }
        if pending_charge.is_some() || previous == NodeIdx::DepotStart {
            return None;
        }
        let arc = network.arc_between(previous, NodeIdx::DepotEnd)?;
        steps.push((arc, ArcChoice::DIRECT));
        Some(steps)
    }

    fn choice(&self, arc: &NetworkArc, charge: Option<LocationIdx>) -> ArcChoice {
        let (source, target) = (arc.deadhead.from, arc.deadhead.to);
        match charge {
            Some(c) if c == source => ArcChoice::charge_at(IdleSide::Source),
            Some(c) if c == target => ArcChoice::charge_at(IdleSide::Target),
            Some(c) => ArcChoice::detour(c),
            None => {
                let instance = self.network.instance();
                let handover_at = |l| instance.location(l).allows_handover(arc.idle_time);
                if !handover_at(source) && handover_at(target) {
                    ArcChoice {
                        idle_at: IdleSide::Target,
                        ..ArcChoice::DIRECT
                    }
                } else {
                    ArcChoice::DIRECT
                }
            }
        }
    }

    /// Soft-mode evaluation, None if the sequence cannot be driven at all.
    pub fn evaluate(&self, stops: &[StopIdx]) -> Option<Evaluation> {
        if stops.is_empty() {
            return Some(Evaluation::EMPTY);
        }
        let ctx = self.context(Mode::Soft);
        let mut state = ExpansionState::initial(ctx.instance);
        for (arc, choice) in self.steps(stops)? {
            state = expand(&ctx, &state, arc, choice, None)?;
        }
        Some(Evaluation {
            cost: state.cost,
            penalty: state.penalty,
        })
    }

    /// The vehicle task of a penalty-free schedule with its reduced cost.
    pub fn materialize(&self, stops: &[StopIdx]) -> Option<Priced<VehicleTask>> {
        let instance = self.network.instance();
        let (state, elements) = replay(&self.context(Mode::Soft), self.steps(stops)?)?;
        if state.penalty > 0.0 {
            return None;
        }
        let task = VehicleTask::new(elements, instance, self.config).ok()?;
        let reduced_cost = self.duals.task_reduced_cost(&task, &blocks_of(&task, instance));
        debug_assert!((reduced_cost - state.cost).abs() < 1e-6);
        Some(Priced::new(reduced_cost, task))
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// VehicleLocalSearch ///////////////////
/////////////////////////////////////////////////////////////////////

/// Simulated-annealing pricing of vehicle tasks over the network. Both variants work on stop
/// sequences and only hand out penalty-free routes with negative reduced cost.
pub struct VehicleLocalSearch {
    network: Arc<VehicleNetwork>,
    config: Arc<Config>,
    arena: StopArena,
}

// static functions
impl VehicleLocalSearch {
    pub fn new(network: Arc<VehicleNetwork>, config: Arc<Config>) -> VehicleLocalSearch {
        let arena = StopArena::new(&network);
        VehicleLocalSearch {
            network,
            config,
            arena,
        }
    }
}

// methods
impl VehicleLocalSearch {
    pub fn network(&self) -> &Arc<VehicleNetwork> {
        &self.network
    }

    /// Grows one route from a random trip, columns are taken from periodic snapshots.
    pub fn generate_single(
        &self,
        duals: &DualPrices,
        seed: u64,
    ) -> Result<Vec<Priced<VehicleTask>>, String> {
        let start_time = stdtime::Instant::now();
        let evaluator = RouteEvaluator::new(&self.network, &self.arena, &self.config, duals);
        let mut rng = StdRng::seed_from_u64(seed);
        let columns = single::search(
            &evaluator,
            &self.config.vehicle_local_search.single,
            &mut rng,
        )?;
        self.report("single", &columns, start_time);
        Ok(columns)
    }

    /// Improves a schedule of all trips, columns are taken from the final schedule.
    pub fn generate_global(
        &self,
        duals: &DualPrices,
        seed: u64,
    ) -> Result<Vec<Priced<VehicleTask>>, String> {
        let start_time = stdtime::Instant::now();
        let evaluator = RouteEvaluator::new(&self.network, &self.arena, &self.config, duals);
        let mut rng = StdRng::seed_from_u64(seed);
        let columns = global::search(
            &evaluator,
            &self.config.vehicle_local_search.global,
            &mut rng,
        )?;
        self.report("global", &columns, start_time);
        Ok(columns)
    }

    fn report(
        &self,
        variant: &str,
        columns: &[Priced<VehicleTask>],
        start_time: stdtime::Instant,
    ) {
        if self.config.verbose {
            println!(
                "vehicle local search ({}): {} columns, best {:.2} ({:0.2}sec)",
                variant,
                columns.len(),
                columns.first().map_or(0.0, |c| c.reduced_cost),
                start_time.elapsed().as_secs_f32()
            );
        }
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// helpers //////////////////////////////
/////////////////////////////////////////////////////////////////////

pub(crate) fn annealing_parameters(config: &AnnealingConfig) -> AnnealingParameters {
    AnnealingParameters {
        starting_temperature: config.starting_temperature,
        ending_temperature: config.ending_temperature,
        cooling_rate: config.cooling_rate,
        iterations: config.iterations,
    }
}

/// Removes charges at the start or the end and the second of two adjacent charges.
pub(crate) fn normalize(stops: &mut Vec<StopIdx>, arena: &StopArena) {
    let mut previous_is_trip = false;
    stops.retain(|s| {
        let keep = arena.is_trip(*s) || previous_is_trip;
        if keep {
            previous_is_trip = arena.is_trip(*s);
        }
        keep
    });
    while stops.last().map_or(false, |s| !arena.is_trip(*s)) {
        stops.pop();
    }
}

/// Positions in `stops` directly after a trip that are not followed by a charge, i.e. the gaps
/// where a charge can be inserted.
pub(crate) fn free_gaps(stops: &[StopIdx], arena: &StopArena) -> Vec<usize> {
    (1..stops.len())
        .filter(|i| arena.is_trip(stops[i - 1]) && arena.is_trip(stops[*i]))
        .collect()
}

pub(crate) fn charge_positions(stops: &[StopIdx], arena: &StopArena) -> Vec<usize> {
    (0..stops.len()).filter(|i| !arena.is_trip(stops[*i])).collect()
}

/// Index at which a trip starting at `start` keeps the trips of `stops` ordered by start time.
pub(crate) fn insertion_position(
    stops: &[StopIdx],
    arena: &StopArena,
    network: &VehicleNetwork,
    trip: TripIdx,
) -> usize {
    let instance = network.instance();
    let start = instance.trip(trip).start_time;
    stops
        .iter()
        .position(|s| match arena.get(*s) {
            Stop::Trip(t) => instance.trip(t).start_time > start,
            Stop::Charge(_) => false,
        })
        .map(|p| {
            // a charge in front of the next trip stays in front of it
            if p > 0 && !arena.is_trip(stops[p - 1]) {
                p - 1
            } else {
                p
            }
        })
        .unwrap_or(stops.len())
}

pub(crate) fn pick<T: Copy>(items: &[T], rng: &mut StdRng) -> Option<T> {
    items.choose(rng).copied()
}

/// Keeps the columns whose trip set was not seen before, in the given order.
pub(crate) fn unique_columns(
    columns: impl IntoIterator<Item = Priced<VehicleTask>>,
    seen: &mut HashSet<CoverSet>,
) -> Vec<Priced<VehicleTask>> {
    columns
        .into_iter()
        .filter(|c| seen.insert(c.column.trips().clone()))
        .collect()
}
