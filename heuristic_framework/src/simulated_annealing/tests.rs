use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{
    accept, AnnealingParameters, AnnealingSchedule, AnnealingState, OperatorResult,
    SimulatedAnnealing,
};

/// A sequence of numbers whose cost is its sum.
#[derive(Debug, Clone, PartialEq)]
struct Numbers {
    values: Vec<i64>,
}

#[derive(Debug, Clone, Copy)]
enum NumberOperator {
    Decrement,
    Increment,
    Impossible,
}

impl AnnealingState for Numbers {
    type Operator = NumberOperator;
    type Undo = (usize, i64);

    fn apply(&mut self, operator: NumberOperator, _rng: &mut StdRng) -> Option<(f64, (usize, i64))> {
        let idx = self.values.iter().position_max()?;
        let old = self.values[idx];
        match operator {
            NumberOperator::Decrement => self.values[idx] -= 1,
            NumberOperator::Increment => self.values[idx] += 1000,
            NumberOperator::Impossible => return None,
        }
        Some(((self.values[idx] - old) as f64, (idx, old)))
    }

    fn undo(&mut self, (idx, old): (usize, i64)) {
        self.values[idx] = old;
    }
}

fn parameters(iterations: u64) -> AnnealingParameters {
    AnnealingParameters {
        starting_temperature: 100.0,
        ending_temperature: 1.0,
        cooling_rate: 0.1,
        iterations,
    }
}

#[test]
fn zero_delta_is_always_accepted() {
    // ARRANGE
    let mut rng = StdRng::seed_from_u64(0);

    // ACT
    let accepted = (0..1000).all(|_| accept(0.0, 1e-12, &mut rng));

    // ASSERT
    assert!(accepted);
}

#[test]
fn worsening_is_rejected_at_zero_temperature() {
    // ARRANGE
    let mut rng = StdRng::seed_from_u64(0);

    // ACT
    let accepted = (0..1000).any(|_| accept(1e-9, 0.0, &mut rng));

    // ASSERT
    assert!(!accepted);
    assert!(accept(-5.0, 0.0, &mut rng));
}

#[test]
fn cooling_interval_reaches_end_temperature_at_budget() {
    // ARRANGE
    let parameters = parameters(20);
    let mut schedule = AnnealingSchedule::new(&parameters);

    // ACT
    for _ in 0..20 {
        schedule.step();
    }

    // ASSERT
    assert_eq!(AnnealingSchedule::cooling_interval(&parameters), 10);
    assert!((schedule.temperature() - 1.0).abs() < 1e-9);
}

#[test]
fn cooling_interval_falls_back_to_budget_for_degenerate_parameters() {
    // ARRANGE
    let parameters = AnnealingParameters {
        starting_temperature: 1.0,
        ending_temperature: 1.0,
        cooling_rate: 0.9,
        iterations: 7,
    };

    // ACT
    let interval = AnnealingSchedule::cooling_interval(&parameters);

    // ASSERT
    assert_eq!(interval, 7);
}

#[test]
fn declined_moves_restore_the_state() {
    // ARRANGE
    let annealing = SimulatedAnnealing::new(
        vec![(NumberOperator::Increment, 1.0)],
        AnnealingParameters {
            starting_temperature: 1e-6,
            ending_temperature: 1e-7,
            cooling_rate: 0.5,
            iterations: 50,
        },
    )
    .unwrap();
    let mut state = Numbers {
        values: vec![3, 7, 5],
    };
    let before = state.clone();
    let mut rng = StdRng::seed_from_u64(1);

    // ACT
    let statistics = annealing.run(&mut state, &mut rng);

    // ASSERT
    assert_eq!(state, before);
    assert_eq!(statistics.count(OperatorResult::Decline), 50);
    assert_eq!(statistics.total_delta, 0.0);
}

#[test]
fn improvements_and_invalid_moves_are_counted() {
    // ARRANGE
    let annealing = SimulatedAnnealing::new(
        vec![
            (NumberOperator::Decrement, 1.0),
            (NumberOperator::Impossible, 1.0),
        ],
        parameters(200),
    )
    .unwrap();
    let mut state = Numbers {
        values: vec![1000, 1000],
    };
    let mut rng = StdRng::seed_from_u64(2);

    // ACT
    let statistics = annealing.run(&mut state, &mut rng);

    // ASSERT
    let improvements = statistics.count(OperatorResult::Improvement);
    assert_eq!(improvements + statistics.count(OperatorResult::Invalid), 200);
    assert!(improvements > 0);
    assert_eq!(state.values.iter().sum::<i64>(), 2000 - improvements as i64);
    assert_eq!(statistics.total_delta, -(improvements as f64));
}

#[test]
fn snapshots_include_the_final_state() {
    // ARRANGE
    let annealing =
        SimulatedAnnealing::new(vec![(NumberOperator::Decrement, 1.0)], parameters(10)).unwrap();
    let mut state = Numbers { values: vec![100] };
    let mut rng = StdRng::seed_from_u64(3);
    let mut seen = Vec::new();

    // ACT
    annealing.run_with_snapshots(&mut state, &mut rng, 2, |s, iteration| {
        seen.push((iteration, s.values[0]))
    });

    // ASSERT
    itertools::assert_equal(seen, vec![(5, 95), (10, 90)]);
}

#[test]
fn zero_weights_are_rejected() {
    // ACT
    let annealing = SimulatedAnnealing::new(vec![(NumberOperator::Decrement, 0.0)], parameters(1));

    // ASSERT
    assert!(annealing.is_err());
}
