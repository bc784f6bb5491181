#[cfg(test)]
mod tests;

use std::fmt;
use std::time as stdtime;

use itertools::Itertools;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;

/// Outcome of one operator application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorResult {
    /// Strictly lower cost, always kept.
    Improvement,
    /// Equal or higher cost, kept by the Metropolis criterion.
    Accept,
    /// Higher cost, rolled back.
    Decline,
    /// The operator could not be applied (no arc, overlapping times, nothing to remove).
    Invalid,
}

impl OperatorResult {
    const ALL: [OperatorResult; 4] = [
        OperatorResult::Improvement,
        OperatorResult::Accept,
        OperatorResult::Decline,
        OperatorResult::Invalid,
    ];

    fn position(&self) -> usize {
        match self {
            OperatorResult::Improvement => 0,
            OperatorResult::Accept => 1,
            OperatorResult::Decline => 2,
            OperatorResult::Invalid => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealingParameters {
    pub starting_temperature: f64,
    pub ending_temperature: f64,
    pub cooling_rate: f64,
    pub iterations: u64,
}

/// Metropolis criterion: non-positive deltas are always taken (zero included, so the search can
/// drift across plateaus), positive ones with probability `exp(-delta / T)`.
pub fn accept(delta: f64, temperature: f64, rng: &mut impl Rng) -> bool {
    if delta <= 0.0 {
        return true;
    }
    if temperature <= 0.0 {
        return false;
    }
    rng.gen::<f64>() < (-delta / temperature).exp()
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// AnnealingSchedule ////////////////////
/////////////////////////////////////////////////////////////////////

/// Geometric cooling: every `cooling_interval` iterations the temperature is multiplied by the
/// cooling rate, the interval is chosen such that the ending temperature is reached when the
/// iteration budget is used up.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingSchedule {
    temperature: f64,
    cooling_rate: f64,
    cooling_interval: u64,
    iteration: u64,
}

impl AnnealingSchedule {
    pub fn new(parameters: &AnnealingParameters) -> AnnealingSchedule {
        AnnealingSchedule {
            temperature: parameters.starting_temperature,
            cooling_rate: parameters.cooling_rate,
            cooling_interval: AnnealingSchedule::cooling_interval(parameters),
            iteration: 0,
        }
    }

    /// `Q = iterations / (ln(T_end / T_0) / ln(alpha))`. Degenerate parameters (no cooling step
    /// needed, alpha of one) never cool.
    pub fn cooling_interval(parameters: &AnnealingParameters) -> u64 {
        let steps = (parameters.ending_temperature / parameters.starting_temperature).ln()
            / parameters.cooling_rate.ln();
        let interval = (parameters.iterations as f64 / steps).round();
        if interval.is_finite() && interval >= 1.0 {
            interval as u64
        } else {
            parameters.iterations.max(1)
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn step(&mut self) {
        self.iteration += 1;
        if self.iteration % self.cooling_interval == 0 {
            self.temperature *= self.cooling_rate;
        }
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// AnnealingState ///////////////////////
/////////////////////////////////////////////////////////////////////

/// A mutable search state with undoable moves.
pub trait AnnealingState {
    type Operator: Copy + fmt::Debug;
    type Undo;

    /// Applies the operator in place and returns the cost delta plus what is needed to restore
    /// the previous state. None means the operator was not applicable and nothing changed.
    fn apply(&mut self, operator: Self::Operator, rng: &mut StdRng) -> Option<(f64, Self::Undo)>;

    /// Restores exactly the state before the corresponding `apply`.
    fn undo(&mut self, undo: Self::Undo);
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingStatistics {
    pub iterations: u64,
    pub final_temperature: f64,
    pub total_delta: f64,
    counts: [u64; 4],
    pub elapsed: stdtime::Duration,
}

impl AnnealingStatistics {
    pub fn count(&self, result: OperatorResult) -> u64 {
        self.counts[result.position()]
    }
}

impl fmt::Display for AnnealingStatistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} iterations in {:0.2}sec, T = {:.4}, delta {:.2} ({})",
            self.iterations,
            self.elapsed.as_secs_f32(),
            self.final_temperature,
            self.total_delta,
            OperatorResult::ALL
                .iter()
                .map(|r| format!("{:?}: {}", r, self.count(*r)))
                .join(", ")
        )
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// SimulatedAnnealing ///////////////////
/////////////////////////////////////////////////////////////////////

/// Picks an operator by weight in every iteration, applies it and keeps or undoes the move.
pub struct SimulatedAnnealing<O> {
    operators: Vec<O>,
    weights: WeightedIndex<f64>,
    parameters: AnnealingParameters,
}

impl<O: Copy + fmt::Debug> SimulatedAnnealing<O> {
    pub fn new(
        operators: Vec<(O, f64)>,
        parameters: AnnealingParameters,
    ) -> Result<SimulatedAnnealing<O>, String> {
        let weights = WeightedIndex::new(operators.iter().map(|(_, w)| *w))
            .map_err(|err| format!("invalid operator weights: {}", err))?;
        Ok(SimulatedAnnealing {
            operators: operators.into_iter().map(|(o, _)| o).collect(),
            weights,
            parameters,
        })
    }

    pub fn parameters(&self) -> &AnnealingParameters {
        &self.parameters
    }

    pub fn run<S: AnnealingState<Operator = O>>(
        &self,
        state: &mut S,
        rng: &mut StdRng,
    ) -> AnnealingStatistics {
        self.run_with_snapshots(state, rng, 0, |_, _| {})
    }

    /// Like `run`, additionally hands the state to `on_snapshot` after every
    /// `iterations / snapshots` iterations (the last one after the final iteration).
    pub fn run_with_snapshots<S: AnnealingState<Operator = O>>(
        &self,
        state: &mut S,
        rng: &mut StdRng,
        snapshots: usize,
        mut on_snapshot: impl FnMut(&S, u64),
    ) -> AnnealingStatistics {
        let start_time = stdtime::Instant::now();
        let mut schedule = AnnealingSchedule::new(&self.parameters);
        let snapshot_interval = match snapshots {
            0 => None,
            n => Some((self.parameters.iterations / n as u64).max(1)),
        };
        let mut counts = [0; 4];
        let mut total_delta = 0.0;

        for iteration in 1..=self.parameters.iterations {
            let operator = self.operators[self.weights.sample(rng)];
            let result = self.step(state, operator, schedule.temperature(), rng, &mut total_delta);
            counts[result.position()] += 1;
            schedule.step();

            if let Some(interval) = snapshot_interval {
                if iteration % interval == 0 || iteration == self.parameters.iterations {
                    on_snapshot(state, iteration);
                }
            }
        }

        AnnealingStatistics {
            iterations: self.parameters.iterations,
            final_temperature: schedule.temperature(),
            total_delta,
            counts,
            elapsed: start_time.elapsed(),
        }
    }

    fn step<S: AnnealingState<Operator = O>>(
        &self,
        state: &mut S,
        operator: O,
        temperature: f64,
        rng: &mut StdRng,
        total_delta: &mut f64,
    ) -> OperatorResult {
        let (delta, undo) = match state.apply(operator, rng) {
            Some(applied) => applied,
            None => return OperatorResult::Invalid,
        };
        if accept(delta, temperature, rng) {
            *total_delta += delta;
            if delta < 0.0 {
                OperatorResult::Improvement
            } else {
                OperatorResult::Accept
            }
        } else {
            state.undo(undo);
            OperatorResult::Decline
        }
    }
}
