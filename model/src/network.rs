
use std::sync::Arc;

use time::{Duration, Time};

use crate::base_types::{LocationIdx, NodeIdx};
use crate::config::Config;
use crate::deadheads::DeadheadTemplate;
use crate::instance::Instance;

pub type ArcIdx = usize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkArc {
    pub from: NodeIdx,
    pub to: NodeIdx,
    pub deadhead: DeadheadTemplate,
    /// Moment the source is left: end of the source trip, or the pull-out departure.
    pub start_time: Time,
    /// Moment the target begins: start of the target trip, or the pull-in arrival.
    pub end_time: Time,
    /// Slack that can be spent idling or charging, zero on depot arcs.
    pub idle_time: Duration,
}

impl NetworkArc {
    pub fn is_depot_arc(&self) -> bool {
        self.from.is_depot() || self.to.is_depot()
    }

    pub fn span(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Time-feasible digraph over trips plus depot start and depot end.
/// Outgoing arcs are stored sparse per node for label expansion, and dense node x node for O(1)
/// reconnection in local search.
pub struct VehicleNetwork {
    instance: Arc<Instance>,
    arcs: Vec<NetworkArc>,
    outgoing: Vec<Vec<ArcIdx>>,
    dense: Vec<Vec<Option<ArcIdx>>>,
}

// static functions
impl VehicleNetwork {
    pub fn new(instance: Arc<Instance>, config: &Config) -> VehicleNetwork {
        let candidates = VehicleNetwork::build_arcs(&instance);
        let arcs = match config.vehicle.pre_direct_time {
            Some(limit) => VehicleNetwork::preprocess(&instance, config, candidates, limit),
            None => candidates,
        };

        let node_count = instance.trip_count() + 2;
        let mut outgoing = vec![Vec::new(); node_count];
        let mut dense = vec![vec![None; node_count]; node_count];
        let trip_count = instance.trip_count();
        for (idx, arc) in arcs.iter().enumerate() {
            let from = arc.from.position(trip_count);
            let to = arc.to.position(trip_count);
            outgoing[from].push(idx);
            dense[from][to] = Some(idx);
        }

        if config.verbose {
            println!(
                "vehicle network: {} trips, {} arcs ({:.1} per node)",
                trip_count,
                arcs.len(),
                arcs.len() as f64 / node_count as f64
            );
        }

        VehicleNetwork {
            instance,
            arcs,
            outgoing,
            dense,
        }
    }

    fn build_arcs(instance: &Instance) -> Vec<NetworkArc> {
        let depot = instance.depot();
        let mut arcs = Vec::new();

        for trip in instance.trips() {
            if let Some(dh) = instance.deadhead(depot, trip.from) {
                arcs.push(NetworkArc {
                    from: NodeIdx::DepotStart,
                    to: NodeIdx::Trip(trip.idx),
                    deadhead: *dh,
                    start_time: trip.start_time - dh.duration,
                    end_time: trip.start_time,
                    idle_time: Duration::ZERO,
                });
            }
            if let Some(dh) = instance.deadhead(trip.to, depot) {
                arcs.push(NetworkArc {
                    from: NodeIdx::Trip(trip.idx),
                    to: NodeIdx::DepotEnd,
                    deadhead: *dh,
                    start_time: trip.end_time,
                    end_time: trip.end_time + dh.duration,
                    idle_time: Duration::ZERO,
                });
            }
        }

        for first in instance.trips() {
            for second in instance.trips() {
                if first.idx == second.idx || second.start_time < first.end_time {
                    continue;
                }
                let dh = match instance.deadhead(first.to, second.from) {
                    Some(dh) => dh,
                    None => continue,
                };
                let gap = second.start_time - first.end_time;
                if gap < dh.duration {
                    continue;
                }
                if dh.frequency_change_only
                    && !first.frequency_change.allows_departure()
                    && !second.frequency_change.allows_arrival()
                {
                    continue;
                }
                arcs.push(NetworkArc {
                    from: NodeIdx::Trip(first.idx),
                    to: NodeIdx::Trip(second.idx),
                    deadhead: *dh,
                    start_time: first.end_time,
                    end_time: second.start_time,
                    idle_time: gap - dh.duration,
                });
            }
        }
        arcs
    }

    /// Keeps depot arcs, trip-trip arcs with at most `limit` idle time and arcs which leave
    /// enough time to charge at one of their endpoints. Falls back to all arcs if no trip-trip
    /// arc would survive.
    fn preprocess(
        instance: &Instance,
        config: &Config,
        arcs: Vec<NetworkArc>,
        limit: Duration,
    ) -> Vec<NetworkArc> {
        let useful_charge = |arc: &NetworkArc| {
            arc.idle_time >= config.vehicle.min_charge_time
                && [arc.deadhead.from, arc.deadhead.to]
                    .iter()
                    .any(|l| instance.location(*l).can_charge())
        };
        let kept: Vec<NetworkArc> = arcs
            .iter()
            .filter(|arc| arc.is_depot_arc() || arc.idle_time <= limit || useful_charge(arc))
            .copied()
            .collect();
        if kept.iter().any(|arc| !arc.is_depot_arc()) {
            kept
        } else {
            arcs
        }
    }
}

// methods
impl VehicleNetwork {
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn node_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn arc(&self, idx: ArcIdx) -> &NetworkArc {
        &self.arcs[idx]
    }

    pub fn outgoing(&self, node: NodeIdx) -> impl Iterator<Item = (ArcIdx, &NetworkArc)> {
        self.outgoing[node.position(self.instance.trip_count())]
            .iter()
            .map(move |idx| (*idx, &self.arcs[*idx]))
    }

    /// Dense lookup of the arc between two nodes.
    pub fn arc_between(&self, from: NodeIdx, to: NodeIdx) -> Option<&NetworkArc> {
        let trip_count = self.instance.trip_count();
        self.dense[from.position(trip_count)][to.position(trip_count)].map(|idx| &self.arcs[idx])
    }

    /// Location at which a vehicle is after finishing the node.
    pub fn end_location(&self, node: NodeIdx) -> LocationIdx {
        match node {
            NodeIdx::Trip(t) => self.instance.trip(t).to,
            _ => self.instance.depot(),
        }
    }

    /// Location at which a vehicle has to be to start the node.
    pub fn start_location(&self, node: NodeIdx) -> LocationIdx {
        match node {
            NodeIdx::Trip(t) => self.instance.trip(t).from,
            _ => self.instance.depot(),
        }
    }
}
