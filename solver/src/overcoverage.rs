
use std::collections::HashSet;

use model::base_types::{NodeIdx, TripIdx};
use model::config::Config;
use model::instance::Instance;
use model::network::{NetworkArc, VehicleNetwork};
use solution::dual_prices::DualPrices;
use solution::vehicle_task::VehicleTask;

use crate::vehicle_expansion::{
    arc_choices, expand, replay, ArcChoice, ExpansionContext, ExpansionState, Mode,
};

/// Hands every trip covered by several tasks to the first of them. The other tasks drive their
/// remaining trips again, directly connected where possible; a task left without trips is
/// dropped. A task that cannot drive its remaining trips is kept as it was.
pub fn remove_overcoverage(
    tasks: &[VehicleTask],
    network: &VehicleNetwork,
    config: &Config,
) -> Vec<VehicleTask> {
    let mut covered: HashSet<TripIdx> = HashSet::new();
    let mut result = Vec::with_capacity(tasks.len());
    for task in tasks.iter() {
        let remaining: Vec<TripIdx> = task
            .trip_sequence()
            .filter(|t| !covered.contains(t))
            .collect();
        if remaining.len() == task.trip_count() {
            result.push(task.clone());
        } else if !remaining.is_empty() {
            result.push(route_trips(&remaining, network, config).unwrap_or_else(|| task.clone()));
        }
        covered.extend(task.trip_sequence());
    }
    result
}

struct Partial<'n> {
    state: ExpansionState,
    steps: Vec<(&'n NetworkArc, ArcChoice)>,
}

impl<'n> Partial<'n> {
    fn dominates(&self, other: &Partial) -> bool {
        self.state.cost <= other.state.cost
            && self.state.soc >= other.state.soc
            && self.state.last_handover >= other.state.last_handover
            && self.state.last_hub >= other.state.last_hub
    }
}

/// Cheapest resource-feasible task serving exactly the given trips in the given order. Every arc
/// may be driven in each of the ways the labeling knows (idle, charge, detour).
pub fn route_trips(
    trips: &[TripIdx],
    network: &VehicleNetwork,
    config: &Config,
) -> Option<VehicleTask> {
    let instance: &Instance = network.instance();
    let duals = DualPrices::zero(instance.trip_count());
    let ctx = ExpansionContext {
        instance,
        config,
        duals: &duals,
        mode: Mode::Hard,
    };
    let nodes: Vec<NodeIdx> = std::iter::once(NodeIdx::DepotStart)
        .chain(trips.iter().map(|t| NodeIdx::Trip(*t)))
        .chain(std::iter::once(NodeIdx::DepotEnd))
        .collect();

    let mut front = vec![Partial {
        state: ExpansionState::initial(instance),
        steps: Vec::new(),
    }];
    for pair in nodes.windows(2) {
        let arc = network.arc_between(pair[0], pair[1])?;
        let mut next: Vec<Partial> = Vec::new();
        for partial in front.iter() {
            for choice in arc_choices(instance, config, arc) {
                let state = match expand(&ctx, &partial.state, arc, choice, None) {
                    Some(state) => state,
                    None => continue,
                };
                let mut steps = partial.steps.clone();
                steps.push((arc, choice));
                let candidate = Partial { state, steps };
                if next.iter().any(|p| p.dominates(&candidate)) {
                    continue;
                }
                next.retain(|p| !candidate.dominates(p));
                next.push(candidate);
            }
        }
        if next.is_empty() {
            return None;
        }
        front = next;
    }

    let best = front
        .into_iter()
        .min_by(|a, b| a.state.cost.total_cmp(&b.state.cost))?;
    let (_, elements) = replay(&ctx, best.steps)?;
    VehicleTask::new(elements, instance, config).ok()
}
