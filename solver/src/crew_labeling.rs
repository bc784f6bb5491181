#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time as stdtime;

use im::Vector;
use model::base_types::Cost;
use model::config::{Config, CrewRules};
use model::cover_set::CoverSet;
use rayon::prelude::*;
use solution::crew_duty::{aggregate_coefficients, duty_cost, CrewDuty, DutyType};
use solution::crew_rules::{self, duty_window, BreakSpan, DutyShape, DutyWindow};
use solution::dual_prices::DualPrices;
use time::{Duration, Time};

use crate::columns::{select_columns, Priced};
use crate::crew_network::{CrewNetwork, LinkKind};

const COST_TOLERANCE: Cost = 1e-6;

/// Partial duty of one duty type, ending with the block at `position`.
#[derive(Debug, Clone)]
pub struct CrewLabel {
    pub position: usize,
    pub parent: Option<usize>,
    pub start: Time,
    /// Duty start or end of the last break or long idle, steering time is measured from here.
    pub rest_end: Time,
    pub max_steering: Duration,
    pub long_idle: Option<(Time, Time)>,
    pub breaks: Vector<BreakSpan>,
    pub block_duals: Cost,
}

/// The parts of the break list the labor rules can tell apart, per side of the long idle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct BreakSummary {
    total: Duration,
    longest: Duration,
    count: usize,
}

impl BreakSummary {
    fn add(&mut self, span: &BreakSpan) {
        self.total += span.net;
        self.longest = self.longest.max(span.net);
        self.count += 1;
    }

    fn covers(&self, other: &BreakSummary) -> bool {
        self.total >= other.total && self.longest >= other.longest && self.count >= other.count
    }
}

impl CrewLabel {
    fn summaries(&self, rules: &CrewRules) -> ([BreakSummary; 2], bool) {
        let dinner = &rules.late_dinner;
        let mut sides = [BreakSummary::default(); 2];
        let mut has_dinner = false;
        for span in self.breaks.iter() {
            let after = self.long_idle.map_or(false, |(idle_start, _)| span.start >= idle_start);
            sides[after as usize].add(span);
            has_dinner |= span.net >= dinner.min_break
                && span.start >= dinner.window_start
                && span.start + span.net <= dinner.window_end;
        }
        (sides, has_dinner)
    }

    /// Both labels end at the same block. Every completion of `other` is also a completion of
    /// `self` with at most the same reduced cost.
    pub fn dominates(&self, other: &CrewLabel, rules: &CrewRules) -> bool {
        if self.start != other.start
            || self.long_idle != other.long_idle
            || self.block_duals > other.block_duals + COST_TOLERANCE
            || self.rest_end < other.rest_end
            || self.max_steering > other.max_steering
        {
            return false;
        }
        let (own, own_dinner) = self.summaries(rules);
        let (theirs, their_dinner) = other.summaries(rules);
        own[0].covers(&theirs[0]) && own[1].covers(&theirs[1]) && (own_dinner || !their_dinner)
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// CrewLabeling /////////////////////////
/////////////////////////////////////////////////////////////////////

/// Exact pricing of crew duties over the block network, one labeling pass per duty type.
pub struct CrewLabeling {
    network: Arc<CrewNetwork>,
    config: Arc<Config>,
}

/// A feasible complete duty found by a pass, before materialization.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    duty_type: DutyType,
    label: usize,
    reduced_cost: Cost,
}

// static functions
impl CrewLabeling {
    pub fn new(network: Arc<CrewNetwork>, config: Arc<Config>) -> CrewLabeling {
        CrewLabeling { network, config }
    }
}

// methods
impl CrewLabeling {
    pub fn network(&self) -> &Arc<CrewNetwork> {
        &self.network
    }

    pub fn generate_crew_columns(&self, duals: &DualPrices) -> Vec<Priced<CrewDuty>> {
        let start_time = stdtime::Instant::now();
        let passes: Vec<(Vec<CrewLabel>, Vec<Candidate>)> = DutyType::PRICED
            .as_slice()
            .par_iter()
            .map(|duty_type| self.run(*duty_type, duals))
            .collect();

        let config = &self.config.crew_labeling;
        let mut candidates: Vec<(usize, Candidate)> = passes
            .iter()
            .enumerate()
            .flat_map(|(pass, (_, found))| found.iter().map(move |c| (pass, *c)))
            .filter(|(_, c)| c.reduced_cost < config.max_reduced_cost)
            .collect();
        candidates.sort_by(|a, b| a.1.reduced_cost.total_cmp(&b.1.reduced_cost));

        let sets: Vec<CoverSet> = candidates
            .iter()
            .map(|(pass, c)| self.block_set(&passes[*pass].0, c.label))
            .collect();
        let set_refs: Vec<&CoverSet> = sets.iter().collect();
        let columns: Vec<Priced<CrewDuty>> = select_columns(&set_refs, config.max_columns)
            .into_iter()
            .filter_map(|i| {
                let (pass, candidate) = &candidates[i];
                self.materialize(duals, &passes[*pass].0, candidate)
            })
            .collect();

        if self.config.verbose {
            println!(
                "crew labeling: {} candidates, {} columns, best {:.2} ({:0.2}sec)",
                candidates.len(),
                columns.len(),
                columns.first().map_or(0.0, |c| c.reduced_cost),
                start_time.elapsed().as_secs_f32()
            );
        }
        columns
    }

    /// One pass for a duty type. Returns the label arena and the feasible complete duties.
    fn run(&self, duty_type: DutyType, duals: &DualPrices) -> (Vec<CrewLabel>, Vec<Candidate>) {
        let rules = &self.config.crew;
        let window = duty_window(duty_type, rules);
        let node_count = self.network.node_count();
        let mut arena: Vec<CrewLabel> = Vec::new();
        let mut fronts: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut candidates = Vec::new();
        let max_in_end = self.config.crew_labeling.max_labels_in_end;

        for position in 0..node_count {
            let (_, block) = self.network.block(position);
            let start = match self.network.sign_on(position) {
                Some(sign_on) => block.start_time() - sign_on,
                None => continue,
            };
            if !window.start_allowed(start) {
                continue;
            }
            let label = CrewLabel {
                position,
                parent: None,
                start,
                rest_end: start,
                max_steering: block.end_time() - start,
                long_idle: None,
                breaks: Vector::new(),
                block_duals: duals.block(&block.descriptor),
            };
            if self.admissible(&label, &window) {
                insert(&mut arena, &mut fronts[position], label, rules);
            }
        }

        // blocks are sorted by start time and links only point forward
        for position in 0..node_count {
            let front = std::mem::take(&mut fronts[position]);
            for label_idx in front {
                if candidates.len() < max_in_end {
                    if let Some(candidate) =
                        self.complete(duty_type, label_idx, &arena[label_idx], duals)
                    {
                        candidates.push(candidate);
                    }
                }
                for link in self.network.outgoing(position) {
                    let extended =
                        self.extend(duty_type, label_idx, &arena[label_idx], link.to, &link.kind, duals);
                    let label = match extended {
                        Some(label) => label,
                        None => continue,
                    };
                    if self.admissible(&label, &window) {
                        insert(&mut arena, &mut fronts[link.to], label, rules);
                    }
                }
            }
        }
        (arena, candidates)
    }

    fn extend(
        &self,
        duty_type: DutyType,
        parent: usize,
        label: &CrewLabel,
        to: usize,
        kind: &LinkKind,
        duals: &DualPrices,
    ) -> Option<CrewLabel> {
        let (_, from_block) = self.network.block(label.position);
        let (_, to_block) = self.network.block(to);
        let mut next = CrewLabel {
            position: to,
            parent: Some(parent),
            block_duals: label.block_duals + duals.block(&to_block.descriptor),
            breaks: label.breaks.clone(),
            ..*label
        };
        match *kind {
            LinkKind::Idle => {}
            LinkKind::Break { net } => {
                next.breaks.push_back(BreakSpan {
                    start: from_block.end_time(),
                    net,
                });
                next.rest_end = to_block.start_time();
            }
            LinkKind::LongIdle { sign_off, rest, .. } => {
                if !duty_type.allows_long_idle() || label.long_idle.is_some() {
                    return None;
                }
                let home = from_block.end_time() + sign_off;
                next.long_idle = Some((home, home + rest));
                next.rest_end = home + rest;
            }
        }
        next.max_steering = next.max_steering.max(to_block.end_time() - next.rest_end);
        Some(next)
    }

    /// Necessary conditions that only get worse when the duty is extended.
    fn admissible(&self, label: &CrewLabel, window: &DutyWindow) -> bool {
        let (_, block) = self.network.block(label.position);
        let paid = self.paid(label, block.end_time());
        label.max_steering <= self.config.crew.max_steering_time
            && window.latest_end.map_or(true, |t| block.end_time() <= t)
            && window.max_paid.map_or(true, |max| paid <= max)
    }

    fn paid(&self, label: &CrewLabel, end: Time) -> Duration {
        let unpaid = label
            .long_idle
            .map_or(Duration::ZERO, |(start, end)| end - start);
        end - label.start - unpaid
    }

    /// Signs off after the last block and checks the complete duty against the labor rules.
    fn complete(
        &self,
        duty_type: DutyType,
        label_idx: usize,
        label: &CrewLabel,
        duals: &DualPrices,
    ) -> Option<Candidate> {
        let rules = &self.config.crew;
        let sign_off = self.network.sign_off(label.position)?;
        let (_, block) = self.network.block(label.position);
        let end = block.end_time() + sign_off;
        let paid = self.paid(label, end);
        let shape = DutyShape {
            start: label.start,
            end,
            paid,
            breaks: label.breaks.iter().copied().collect(),
            long_idle: label.long_idle,
            max_steering: label.max_steering,
        };
        if !crew_rules::evaluate(duty_type, &shape, rules).is_empty() {
            return None;
        }
        let reduced_cost = duty_cost(duty_type, paid, rules)
            + label.block_duals
            + duals.aggregate_value(&aggregate_coefficients(duty_type, paid, rules))
            + duals.max_duties;
        Some(Candidate {
            duty_type,
            label: label_idx,
            reduced_cost,
        })
    }

    fn path(&self, arena: &[CrewLabel], label: usize) -> Vec<usize> {
        let mut positions = Vec::new();
        let mut current = Some(label);
        while let Some(idx) = current {
            positions.push(arena[idx].position);
            current = arena[idx].parent;
        }
        positions.reverse();
        positions
    }

    fn block_set(&self, arena: &[CrewLabel], label: usize) -> CoverSet {
        CoverSet::from_indices(self.network.node_count(), self.path(arena, label))
    }

    fn materialize(
        &self,
        duals: &DualPrices,
        arena: &[CrewLabel],
        candidate: &Candidate,
    ) -> Option<Priced<CrewDuty>> {
        let rules = &self.config.crew;
        let positions = self.path(arena, candidate.label);
        let (elements, missing_bases) = self.network.duty_elements(&positions)?;
        debug_assert_eq!(missing_bases, 0);
        let duty = CrewDuty::new(candidate.duty_type, elements, rules).ok()?;
        let block_duals: Cost = positions
            .iter()
            .map(|p| duals.block(&self.network.block(*p).1.descriptor))
            .sum();
        let reduced_cost =
            duty.cost() + block_duals + duals.aggregate_terms(&duty, rules) + duals.max_duties;
        debug_assert!(duty.violations(rules).is_empty());
        debug_assert!((reduced_cost - candidate.reduced_cost).abs() < COST_TOLERANCE);
        Some(Priced::new(reduced_cost, duty))
    }
}

fn insert(arena: &mut Vec<CrewLabel>, front: &mut Vec<usize>, label: CrewLabel, rules: &CrewRules) {
    if front.iter().any(|e| arena[*e].dominates(&label, rules)) {
        return;
    }
    front.retain(|e| !label.dominates(&arena[*e], rules));
    arena.push(label);
    front.push(arena.len() - 1);
}
