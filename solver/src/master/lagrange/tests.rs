use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use model::config::Config;
use model::test_utilities::{init_test_data, init_test_data_with_config, test_config};
use solution::block::blocks_of;
use solution::column_pool::ColumnPool;

use super::{best_by_reduced_cost, LagrangeMaster, Limits, Multipliers, Subproblem};
use crate::test_utilities::{greedy_cover, named_duals, ScriptedSolver};

fn short_run_config() -> Config {
    let mut config = test_config();
    let lagrange = &mut config.master.lagrange;
    lagrange.rounds = 2;
    lagrange.vehicle_iterations_init = 2;
    lagrange.vehicle_iterations_round = 1;
    lagrange.crew_iterations_init = 2;
    lagrange.crew_iterations_round = 1;
    lagrange.max_subgradient_rounds = 300;
    lagrange.disruption_rounds = 1;
    config
}

fn mip_only_solver() -> ScriptedSolver {
    ScriptedSolver::new(named_duals(|_| 0.0), greedy_cover())
}

#[test]
fn subgradient_steps_respect_the_multiplier_ranges() {
    // ARRANGE
    let d = init_test_data();
    let limits = Limits::new(&d.config);
    let mut values = Multipliers::new(2, 1);
    values.trips[1] = 5.0;
    let mut gradient = Multipliers::new(2, 1);
    gradient.trips = vec![-1.0, -1.0];
    gradient.blocks = vec![-1.0];
    gradient.long_duties = -2.0;
    gradient.average_length = 3.0;
    gradient.max_vehicles = 1.0;

    // ACT
    gradient.project(&values, &limits);
    values.step(&gradient, 10.0, &limits);

    // ASSERT
    assert_eq!(gradient.trips, vec![0.0, -1.0]);
    assert_eq!(gradient.long_duties, 0.0);
    assert_eq!(gradient.max_vehicles, 0.0);
    assert_eq!(values.trips, vec![0.0, 0.0]);
    assert_eq!(values.blocks, vec![-10.0]);
    assert_eq!(values.average_length, 30.0);
    assert_eq!(values.max_vehicles, 0.0);
}

#[test]
fn aggregate_multipliers_are_capped_at_the_penalty() {
    // ARRANGE
    let d = init_test_data();
    let limits = Limits::new(&d.config);
    let mut values = Multipliers::new(0, 0);
    let mut gradient = Multipliers::new(0, 0);
    gradient.broken_duties = 1.0;

    // ACT
    values.step(&gradient, 1e9, &limits);

    // ASSERT
    assert_eq!(values.broken_duties, d.config.crew.hard_constraint_penalty);
}

#[test]
fn multiplier_reduced_costs_match_the_generator_prices() {
    // ARRANGE
    let d = init_test_data();
    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let mut multipliers = Multipliers::new(d.instance.trip_count(), pool.blocks().len());
    for (i, value) in multipliers.trips.iter_mut().enumerate() {
        *value = 100.0 * i as f64;
    }
    for (i, value) in multipliers.blocks.iter_mut().enumerate() {
        *value = 50.0 - 20.0 * i as f64;
    }
    multipliers.average_length = 7.0;
    multipliers.long_duties = 3.0;
    multipliers.between_duties = 11.0;

    // ACT
    let prices = multipliers.to_prices(pool.blocks());

    // ASSERT
    for column in pool.tasks() {
        let expected = prices.task_reduced_cost(&column.task, &blocks_of(&column.task, &d.instance));
        assert!((multipliers.task_reduced_cost(column) - expected).abs() < 1e-6);
    }
    for column in pool.duties() {
        let expected = prices.duty_reduced_cost(&column.duty, pool.blocks(), &d.config.crew);
        assert!((multipliers.duty_reduced_cost(&column.duty, &d.config) - expected).abs() < 1e-6);
    }
}

#[test]
fn zero_multipliers_select_nothing() {
    // ARRANGE
    let d = init_test_data();
    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let multipliers = Multipliers::new(d.instance.trip_count(), pool.blocks().len());

    // ACT
    let subproblem = Subproblem::solve(&pool, &multipliers, &d.config);
    let gradient = subproblem.subgradient(&pool, &d.config);

    // ASSERT
    assert!(subproblem.tasks.is_empty());
    assert!(subproblem.duties.is_empty());
    assert_eq!(subproblem.lower_bound, 0.0);
    assert!(gradient.trips.iter().all(|g| *g == 1.0));
    assert!(gradient.blocks.iter().all(|g| *g == 0.0));
    assert_eq!(gradient.norm_squared(), d.instance.trip_count() as f64);
}

#[test]
fn high_trip_multipliers_select_tasks_and_staff_their_blocks() {
    // ARRANGE
    let d = init_test_data();
    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let mut multipliers = Multipliers::new(d.instance.trip_count(), pool.blocks().len());
    multipliers.trips[0] = 1e6;
    multipliers.blocks[0] = -1e5;

    // ACT
    let subproblem = Subproblem::solve(&pool, &multipliers, &d.config);
    let gradient = subproblem.subgradient(&pool, &d.config);

    // ASSERT
    assert_eq!(subproblem.tasks, vec![0]);
    assert_eq!(subproblem.duties, vec![(0, 1)]);
    let expected = 1e6
        + multipliers.task_reduced_cost(pool.task(0))
        + multipliers.duty_reduced_cost(&pool.duty(0).duty, &d.config);
    assert!((subproblem.lower_bound - expected).abs() < 1e-6);
    assert_eq!(gradient.trips[0], 0.0);
    assert_eq!(gradient.blocks[0], 0.0);
}

#[test]
fn fleet_size_limits_the_selected_tasks() {
    // ARRANGE
    let mut hard = test_config();
    hard.master.max_vehicles = Some(1);
    let mut soft = hard.clone();
    soft.master.vehicle_over_max_cost = 500.0;
    let d = init_test_data_with_config(hard);
    let soft = Arc::new(soft);
    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let mut multipliers = Multipliers::new(d.instance.trip_count(), pool.blocks().len());
    multipliers.trips[0] = 1e6;
    multipliers.trips[1] = 2e6;

    // ACT
    let capped = Subproblem::solve(&pool, &multipliers, &d.config);
    let with_slack = Subproblem::solve(&pool, &multipliers, &soft);

    // ASSERT
    assert_eq!(capped.tasks, vec![1]);
    assert_eq!(with_slack.tasks, vec![1, 0]);
    let difference = with_slack.lower_bound - capped.lower_bound;
    let expected = multipliers.task_reduced_cost(pool.task(0)) + 500.0;
    assert!((difference - expected).abs() < 1e-6);
}

#[test]
fn pruning_marks_the_cheapest_candidates() {
    // ACT
    let keep = best_by_reduced_cost(&[Some(3.0), None, Some(-1.0), Some(2.0)], 2);

    // ASSERT
    assert_eq!(keep, vec![false, false, true, true]);
}

#[test]
fn lagrange_master_ends_with_a_consistent_schedule() {
    // ARRANGE
    let d = init_test_data_with_config(short_run_config());
    let stop = Arc::new(AtomicBool::new(false));
    let mut master =
        LagrangeMaster::new(d.network.clone(), d.config.clone(), mip_only_solver(), stop).unwrap();

    // ACT
    let solution = master.solve().unwrap();

    // ASSERT
    assert!(solution.coverage.is_consistent());
    assert!(solution.lower_bound.map_or(false, f64::is_finite));
    assert!(master.upper_bound() > 0.0);
    assert_eq!(master.solver().relaxation_calls, 0);
    assert_eq!(master.solver().mip_calls, 1);
    assert_eq!(
        master.multipliers().blocks.len(),
        master.pool().blocks().len()
    );
}

#[test]
fn pool_caps_of_zero_keep_only_unit_columns() {
    // ARRANGE
    let mut config = short_run_config();
    config.master.lagrange.max_tasks_during = 0;
    config.master.lagrange.max_duties_during = 0;
    config.master.lagrange.disruption_rounds = 0;
    let d = init_test_data_with_config(config);
    let stop = Arc::new(AtomicBool::new(false));
    let mut master =
        LagrangeMaster::new(d.network.clone(), d.config.clone(), mip_only_solver(), stop).unwrap();

    // ACT
    let solution = master.solve().unwrap();

    // ASSERT
    assert!(master.pool().tasks().iter().all(|c| c.unit));
    assert!(master.pool().duties().iter().all(|c| c.unit));
    assert_eq!(master.pool().task_count(), d.instance.trip_count());
    assert!(solution.coverage.is_consistent());
}

#[test]
fn stop_flag_skips_to_the_final_mip() {
    // ARRANGE
    let d = init_test_data_with_config(short_run_config());
    let stop = Arc::new(AtomicBool::new(true));
    let mut master =
        LagrangeMaster::new(d.network.clone(), d.config.clone(), mip_only_solver(), stop).unwrap();

    // ACT
    let solution = master.solve().unwrap();

    // ASSERT
    assert_eq!(master.solver().mip_calls, 1);
    assert_eq!(master.pool().task_count(), d.instance.trip_count());
    assert_eq!(solution.lower_bound, None);
    assert!(solution.coverage.is_consistent());
    let schedule = solution.into_schedule(d.instance.clone(), d.config.clone());
    assert!(schedule.uncovered_trips().is_empty());
}
