use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use model::test_utilities::{init_test_data, init_test_data_with_config, test_config};

use super::LpMaster;
use crate::master::SolverFailure;
use crate::test_utilities::{
    failing_relaxation, greedy_cover, named_duals, RecordedModel, RelaxationScript,
    ScriptedSolver,
};

fn trip_duals(value: f64) -> ScriptedSolver {
    ScriptedSolver::new(
        named_duals(move |name| if name.starts_with("trip_") { value } else { 0.0 }),
        greedy_cover(),
    )
}

#[test]
fn lp_master_combines_trips_into_longer_tasks() {
    // ARRANGE
    let d = init_test_data();
    let stop = Arc::new(AtomicBool::new(false));
    let mut master =
        LpMaster::new(d.network.clone(), d.config.clone(), trip_duals(1000.0), stop).unwrap();
    let unit_tasks = master.pool().task_count();

    // ACT
    let solution = master.solve().unwrap();

    // ASSERT
    assert!(master.pool().task_count() > unit_tasks);
    assert!(solution.coverage.is_consistent());
    assert!(solution.selected_tasks.len() < d.instance.trip_count());
    assert_eq!(solution.tasks, solution.selected_tasks);
    let cost: f64 = solution.selected_tasks.iter().map(|t| t.cost()).sum::<f64>()
        + solution.crew_cost();
    assert!((solution.objective - cost).abs() < 1e-6);
    assert_eq!(solution.lower_bound, Some(0.0));
    assert_eq!(master.solver().mip_calls, 1);
    assert!(master.solver().stop.is_some());
    let schedule = solution.into_schedule(d.instance.clone(), d.config.clone());
    assert!(schedule.uncovered_trips().is_empty());
    assert!(schedule.block_mismatches().is_empty());
}

#[test]
fn zero_duals_keep_the_unit_columns() {
    // ARRANGE
    let d = init_test_data();
    let stop = Arc::new(AtomicBool::new(false));
    let mut master =
        LpMaster::new(d.network.clone(), d.config.clone(), trip_duals(0.0), stop).unwrap();

    // ACT
    let solution = master.solve().unwrap();

    // ASSERT
    assert_eq!(master.pool().task_count(), d.instance.trip_count());
    assert_eq!(solution.selected_tasks.len(), d.instance.trip_count());
    assert_eq!(solution.duties.len(), d.instance.trip_count());
    assert!(solution.coverage.is_consistent());
}

#[test]
fn raised_stop_flag_skips_to_the_final_mip() {
    // ARRANGE
    let d = init_test_data();
    let stop = Arc::new(AtomicBool::new(true));
    let mut master =
        LpMaster::new(d.network.clone(), d.config.clone(), trip_duals(1000.0), stop).unwrap();

    // ACT
    let solution = master.solve().unwrap();

    // ASSERT
    assert_eq!(master.solver().relaxation_calls, 0);
    assert_eq!(master.solver().mip_calls, 1);
    assert_eq!(master.pool().task_count(), d.instance.trip_count());
    assert_eq!(solution.lower_bound, None);
    assert!(solution.coverage.is_consistent());
    let schedule = solution.into_schedule(d.instance.clone(), d.config.clone());
    assert!(schedule.uncovered_trips().is_empty());
}

#[test]
fn solver_stopped_during_a_round_still_yields_a_schedule() {
    // ARRANGE
    let d = init_test_data();
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let stopping_relaxation: RelaxationScript = Box::new(move |_: &RecordedModel| {
        flag.store(true, Ordering::Relaxed);
        Err(SolverFailure::Interrupted)
    });
    let solver = ScriptedSolver::new(stopping_relaxation, greedy_cover());
    let mut master = LpMaster::new(d.network.clone(), d.config.clone(), solver, stop).unwrap();

    // ACT
    let solution = master.solve().unwrap();

    // ASSERT
    assert_eq!(master.solver().relaxation_calls, 1);
    assert_eq!(master.solver().mip_calls, 1);
    assert!(solution.coverage.is_consistent());
}

#[test]
fn interruption_without_the_stop_flag_is_an_error() {
    // ARRANGE
    let d = init_test_data();
    let stop = Arc::new(AtomicBool::new(false));
    let solver = ScriptedSolver::new(
        failing_relaxation(SolverFailure::Interrupted),
        greedy_cover(),
    );
    let mut master = LpMaster::new(d.network.clone(), d.config.clone(), solver, stop).unwrap();

    // ACT
    let err = master.solve().unwrap_err();

    // ASSERT
    assert_eq!(
        err.root_cause().downcast_ref::<SolverFailure>(),
        Some(&SolverFailure::Interrupted)
    );
    assert_eq!(master.solver().mip_calls, 0);
}

#[test]
fn converged_rounds_end_the_pricing() {
    // ARRANGE
    let mut config = test_config();
    config.master.lp.rounds = 4;
    config.master.lp.opt_threshold = 2;
    let d = init_test_data_with_config(config);
    let stop = Arc::new(AtomicBool::new(false));
    let mut master =
        LpMaster::new(d.network.clone(), d.config.clone(), trip_duals(0.0), stop).unwrap();

    // ACT
    let solution = master.solve().unwrap();

    // ASSERT
    // one round: two vehicle and two crew iterations without a new column
    assert_eq!(master.solver().relaxation_calls, 4);
    assert_eq!(solution.lower_bound, Some(0.0));
    assert_eq!(master.solver().mip_calls, 1);
}

#[test]
fn infeasible_relaxation_carries_its_diagnostics() {
    // ARRANGE
    let d = init_test_data();
    let stop = Arc::new(AtomicBool::new(false));
    let failure = SolverFailure::Infeasible {
        diagnostics: vec!["trip_t3 cannot be covered".to_string()],
    };
    let solver = ScriptedSolver::new(failing_relaxation(failure), greedy_cover());
    let mut master = LpMaster::new(d.network.clone(), d.config.clone(), solver, stop).unwrap();

    // ACT
    let err = master.solve().unwrap_err();

    // ASSERT
    let message = format!("{:#}", err);
    assert!(message.contains("round 0: vehicle pricing"));
    assert!(message.contains("trip_t3 cannot be covered"));
    assert_eq!(master.solver().mip_calls, 0);
}
