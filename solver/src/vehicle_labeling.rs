
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;
use std::time as stdtime;

use model::base_types::{Cost, NodeIdx, Soc, TripIdx};
use model::config::Config;
use model::cover_set::CoverSet;
use model::network::{ArcIdx, NetworkArc, VehicleNetwork};
use rayon::prelude::*;
use solution::block::blocks_of;
use solution::dual_prices::{DualPrices, SavingsInterval};
use solution::vehicle_task::VehicleTask;

use crate::columns::{select_columns, Priced};
use crate::vehicle_expansion::{
    arc_choices, expand, replay, ArcChoice, ExpansionContext, ExpansionState, Mode,
};

const COST_TOLERANCE: Cost = 1e-6;

/// Partial path from the depot start. Labels live in an arena and point to their parent.
#[derive(Debug, Clone)]
pub struct Label {
    pub node: NodeIdx,
    pub parent: Option<usize>,
    pub via: Option<(ArcIdx, ArcChoice)>,
    pub state: ExpansionState,
    pub trips: CoverSet,
    pub trip_count: usize,
    pub savings: SavingsInterval,
    pub bucket: usize,
}

impl Label {
    fn root(trip_count: usize, state: ExpansionState, buckets: usize) -> Label {
        Label {
            node: NodeIdx::DepotStart,
            parent: None,
            via: None,
            bucket: soc_bucket(state.soc, buckets),
            state,
            trips: CoverSet::new(trip_count),
            trip_count: 0,
            savings: SavingsInterval::NONE,
        }
    }

    fn extend(
        &self,
        parent: usize,
        (arc_idx, arc): (ArcIdx, &NetworkArc),
        choice: ArcChoice,
        state: ExpansionState,
        duals: &DualPrices,
        buckets: usize,
    ) -> Label {
        let mut trips = self.trips.clone();
        let mut trip_count = self.trip_count;
        if let Some(trip) = arc.to.trip() {
            trips.insert(trip.0);
            trip_count += 1;
        }
        Label {
            node: arc.to,
            parent: Some(parent),
            via: Some((arc_idx, choice)),
            bucket: soc_bucket(state.soc, buckets),
            savings: state
                .half
                .map_or(SavingsInterval::NONE, |half| duals.savings_from(&half)),
            state,
            trips,
            trip_count,
        }
    }

    /// Whether no completion of `other` can be cheaper than the same completion of `self`.
    /// The open block savings are compared pessimistically for `self`: its worst outcome has to
    /// beat the best outcome of `other`. Only labels in the same or a higher bucket dominate.
    pub fn dominates(&self, other: &Label) -> bool {
        self.bucket >= other.bucket
            && self.state.cost - self.savings.min <= other.state.cost - other.savings.max
    }
}

pub fn soc_bucket(soc: Soc, buckets: usize) -> usize {
    if buckets <= 1 {
        return 0;
    }
    ((soc.clamp(0.0, 100.0) / 100.0) * (buckets - 1) as f64).round() as usize
}

/// Trip positions of a column blocked in the secondary passes: growing prefixes in the first
/// half of the attempts, growing suffixes in the second half. Empty ranges are skipped.
pub fn blocked_ranges(len: usize, attempts: usize) -> Vec<Range<usize>> {
    let prefixes = (attempts + 1) / 2;
    let suffixes = attempts / 2;
    (0..attempts)
        .map(|j| {
            if j < prefixes {
                0..(j + 1) * len / (prefixes + 1)
            } else {
                let k = j - prefixes;
                len - (k + 1) * len / (suffixes + 1)..len
            }
        })
        .filter(|range| !range.is_empty())
        .collect()
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// VehicleLabeling //////////////////////
/////////////////////////////////////////////////////////////////////

/// Exact pricing of vehicle tasks by label setting over the vehicle network.
pub struct VehicleLabeling {
    network: Arc<VehicleNetwork>,
    config: Arc<Config>,
    choices: Vec<Vec<ArcChoice>>, // per arc
}

/// Labels of one pass, kept for inspection.
pub struct LabelingRun {
    pub arena: Vec<Label>,
    pub finished: Vec<usize>,
}

// static functions
impl VehicleLabeling {
    pub fn new(network: Arc<VehicleNetwork>, config: Arc<Config>) -> VehicleLabeling {
        let instance = network.instance().clone();
        let choices = (0..network.arc_count())
            .map(|idx| arc_choices(&instance, &config, network.arc(idx)))
            .collect();
        VehicleLabeling {
            network,
            config,
            choices,
        }
    }
}

// methods
impl VehicleLabeling {
    pub fn network(&self) -> &Arc<VehicleNetwork> {
        &self.network
    }

    pub fn generate_vehicle_columns(&self, duals: &DualPrices) -> Vec<Priced<VehicleTask>> {
        self.generate_excluding(duals, &HashSet::new())
    }

    /// Primary pass plus the secondary passes. Trip sets in `known` are never returned.
    pub fn generate_excluding(
        &self,
        duals: &DualPrices,
        known: &HashSet<CoverSet>,
    ) -> Vec<Priced<VehicleTask>> {
        let start_time = stdtime::Instant::now();
        let nothing_blocked = CoverSet::new(self.network.instance().trip_count());
        let primary = self.price(duals, &nothing_blocked, known);
        let secondary = self.secondary_passes(duals, known, &primary);
        if self.config.verbose {
            println!(
                "vehicle labeling: {} primary, {} secondary columns, best {:.2} ({:0.2}sec)",
                primary.len(),
                secondary.len(),
                primary.first().map_or(0.0, |c| c.reduced_cost),
                start_time.elapsed().as_secs_f32()
            );
        }
        primary.into_iter().chain(secondary).collect()
    }

    /// One labeling pass and the extraction of its depot-end labels.
    fn price(
        &self,
        duals: &DualPrices,
        blocked: &CoverSet,
        known: &HashSet<CoverSet>,
    ) -> Vec<Priced<VehicleTask>> {
        let run = self.run(duals, blocked);
        self.extract(duals, &run, known)
    }

    pub fn run(&self, duals: &DualPrices, blocked: &CoverSet) -> LabelingRun {
        let instance = self.network.instance();
        let ctx = self.context(duals);
        let trip_count = instance.trip_count();
        let buckets = self.config.vehicle_labeling.soc_buckets;

        let mut arena = vec![Label::root(
            trip_count,
            ExpansionState::initial(instance),
            buckets,
        )];
        let mut fronts: Vec<Vec<usize>> = vec![Vec::new(); self.network.node_count()];
        fronts[NodeIdx::DepotStart.position(trip_count)].push(0);
        let mut finished = Vec::new();

        // trips are sorted by start time, which is a topological order of the network
        let order =
            std::iter::once(NodeIdx::DepotStart).chain((0..trip_count).map(NodeIdx::trip_from));
        for node in order {
            let front = std::mem::take(&mut fronts[node.position(trip_count)]);
            for label_idx in front {
                for (arc_idx, arc) in self.network.outgoing(node) {
                    if arc.to.trip().map_or(false, |t| blocked.contains(t.0)) {
                        continue;
                    }
                    for choice in self.choices[arc_idx].iter() {
                        let state = match expand(&ctx, &arena[label_idx].state, arc, *choice, None) {
                            Some(state) => state,
                            None => continue,
                        };
                        let label = arena[label_idx].extend(
                            label_idx,
                            (arc_idx, arc),
                            *choice,
                            state,
                            duals,
                            buckets,
                        );
                        if arc.to == NodeIdx::DepotEnd {
                            arena.push(label);
                            finished.push(arena.len() - 1);
                        } else {
                            insert(&mut arena, &mut fronts[arc.to.position(trip_count)], label);
                        }
                    }
                }
            }
        }
        LabelingRun { arena, finished }
    }

    fn extract(
        &self,
        duals: &DualPrices,
        run: &LabelingRun,
        known: &HashSet<CoverSet>,
    ) -> Vec<Priced<VehicleTask>> {
        let config = &self.config.vehicle_labeling;
        let mut candidates: Vec<&Label> = run
            .finished
            .iter()
            .map(|idx| &run.arena[*idx])
            .filter(|l| {
                l.trip_count >= config.min_trips
                    && l.state.cost < config.max_reduced_cost
                    && !known.contains(&l.trips)
            })
            .collect();
        candidates.sort_by(|a, b| a.state.cost.total_cmp(&b.state.cost));
        let sets: Vec<&CoverSet> = candidates.iter().map(|l| &l.trips).collect();
        select_columns(&sets, config.max_columns)
            .into_iter()
            .filter_map(|position| self.materialize(duals, &run.arena, candidates[position]))
            .collect()
    }

    /// Follows the parent links back to the depot start and replays the path with elements.
    fn materialize(
        &self,
        duals: &DualPrices,
        arena: &[Label],
        label: &Label,
    ) -> Option<Priced<VehicleTask>> {
        let mut steps = Vec::new();
        let mut current = Some(label);
        while let Some(l) = current {
            if let Some(via) = l.via {
                steps.push(via);
            }
            current = l.parent.map(|p| &arena[p]);
        }
        steps.reverse();

        let instance = self.network.instance();
        let (state, elements) = replay(
            &self.context(duals),
            steps.iter().map(|(arc, choice)| (self.network.arc(*arc), *choice)),
        )?;
        let task = VehicleTask::new(elements, instance, &self.config).ok()?;
        let reduced_cost = duals.task_reduced_cost(&task, &blocks_of(&task, instance));
        debug_assert!((state.cost - label.state.cost).abs() < COST_TOLERANCE);
        debug_assert!((reduced_cost - label.state.cost).abs() < COST_TOLERANCE);
        Some(Priced::new(reduced_cost, task))
    }

    /// Re-runs the labeling for the cheapest primary columns, each time with a part of the
    /// column's trips blocked. Passes run in parallel, each with its own copy of the known
    /// trip sets.
    fn secondary_passes(
        &self,
        duals: &DualPrices,
        known: &HashSet<CoverSet>,
        primary: &[Priced<VehicleTask>],
    ) -> Vec<Priced<VehicleTask>> {
        let config = &self.config.vehicle_labeling;
        let base_count = primary.len().min(config.secondary_column_count);
        if base_count == 0 || config.secondary_attempts == 0 {
            return Vec::new();
        }
        let trip_count = self.network.instance().trip_count();
        let mut seen: HashSet<CoverSet> = known
            .iter()
            .cloned()
            .chain(primary.iter().map(|c| c.column.trips().clone()))
            .collect();

        let found: Vec<Vec<Priced<VehicleTask>>> = primary[..base_count]
            .par_iter()
            .map(|base| {
                let mut local = seen.clone();
                let trips: Vec<TripIdx> = base.column.trip_sequence().collect();
                let mut columns = Vec::new();
                for range in blocked_ranges(trips.len(), config.secondary_attempts) {
                    let blocked =
                        CoverSet::from_indices(trip_count, trips[range].iter().map(|t| t.0));
                    for column in self.price(duals, &blocked, &local) {
                        local.insert(column.column.trips().clone());
                        columns.push(column);
                    }
                }
                columns
            })
            .collect();

        found
            .into_iter()
            .flatten()
            .filter(|c| seen.insert(c.column.trips().clone()))
            .collect()
    }

    fn context<'a>(&'a self, duals: &'a DualPrices) -> ExpansionContext<'a> {
        ExpansionContext {
            instance: self.network.instance(),
            config: &self.config,
            duals,
            mode: Mode::Hard,
        }
    }
}

/// Inserts the label into the front unless it is dominated, evicting every label it dominates.
/// Evicted labels stay in the arena, arena indices are never reused.
fn insert(arena: &mut Vec<Label>, front: &mut Vec<usize>, label: Label) -> bool {
    if front.iter().any(|e| arena[*e].dominates(&label)) {
        return false;
    }
    front.retain(|e| !label.dominates(&arena[*e]));
    arena.push(label);
    front.push(arena.len() - 1);
    true
}
