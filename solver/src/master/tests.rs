use model::base_types::{BlockIdx, TripIdx};
use model::test_utilities::{init_test_data, init_test_data_with_config, test_config};
use solution::block::blocks_of;
use solution::column_pool::{ColumnPool, Insertion};
use solution::vehicle_task::VehicleTask;

use super::{CoverageReport, MasterModel, Relaxation, Selection, Sense};
use crate::test_utilities::{greedy_cover, named_duals, ScriptedSolver};

#[test]
fn translated_duals_price_columns_like_the_solver() {
    // ARRANGE
    let mut config = test_config();
    config.master.max_vehicles = Some(3);
    config.master.vehicle_over_max_cost = 500.0;
    config.master.max_duties = Some(4);
    config.master.crew_over_max_cost = 500.0;
    let d = init_test_data_with_config(config);
    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let mut solver = ScriptedSolver::new(named_duals(|_| 0.0), greedy_cover());
    let model = MasterModel::build(&mut solver, &pool, d.config.clone());
    let duals: Vec<f64> = solver
        .model
        .constraints
        .iter()
        .enumerate()
        .map(|(i, c)| match c.sense {
            Sense::GreaterEqual => 10.0 + i as f64,
            Sense::LessEqual => -3.0 - i as f64,
            Sense::Equal => 7.0 - 2.0 * i as f64,
        })
        .collect();
    let relaxation = Relaxation {
        objective: 0.0,
        values: vec![],
        duals: duals.clone(),
    };

    // ACT
    let prices = model.duals(&relaxation, pool.blocks());

    // ASSERT
    for idx in 0..pool.task_count() {
        let task = &pool.task(idx).task;
        let variable = solver.model.variable(&format!("task_{}", idx)).unwrap();
        let expected = solver.model.reduced_cost(variable, &duals);
        let actual = prices.task_reduced_cost(task, &blocks_of(task, &d.instance));
        assert!((expected - actual).abs() < 1e-6);
    }
    for idx in 0..pool.duty_count() {
        let duty = &pool.duty(idx).duty;
        let variable = solver.model.variable(&format!("duty_{}", idx)).unwrap();
        let expected = solver.model.reduced_cost(variable, &duals);
        let actual = prices.duty_reduced_cost(duty, pool.blocks(), &d.config.crew);
        assert!((expected - actual).abs() < 1e-6);
    }
    let max_vehicles = solver.model.constraint("max_vehicles").unwrap();
    assert_eq!(prices.max_vehicles, -duals[max_vehicles]);
    assert!(prices.max_vehicles > 0.0);
}

#[test]
fn model_rows_follow_the_configuration() {
    // ARRANGE
    let mut config = test_config();
    config.master.allow_overcover = false;
    let d = init_test_data_with_config(config);
    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let mut solver = ScriptedSolver::new(named_duals(|_| 0.0), greedy_cover());

    // ACT
    MasterModel::build(&mut solver, &pool, d.config.clone());

    // ASSERT
    let recorded = &solver.model;
    let trip_row = recorded.constraint("trip_t0").unwrap();
    assert_eq!(recorded.constraints[trip_row].sense, Sense::Equal);
    assert!(recorded.constraint("max_vehicles").is_none());
    let slack = recorded.variable("long_duties_slack").unwrap();
    assert_eq!(recorded.variables[slack].cost, d.config.crew.hard_constraint_penalty);
    let task = recorded.variable("task_0").unwrap();
    let duty = recorded.variable("duty_0").unwrap();
    let block_row = recorded
        .column(task)
        .into_iter()
        .find(|(c, _)| recorded.constraints[*c].name.starts_with("block_0_"))
        .unwrap();
    assert_eq!(block_row.1, 1.0);
    assert!(recorded.column(duty).contains(&(block_row.0, -1.0)));
}

#[test]
fn replaced_task_gets_a_new_variable_for_the_same_column() {
    // ARRANGE
    let d = init_test_data();
    let mut pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let mut solver = ScriptedSolver::new(named_duals(|_| 0.0), greedy_cover());
    let mut model = MasterModel::build(&mut solver, &pool, d.config.clone());
    let old_variable = solver.model.variable("task_0").unwrap();
    let mut elements = pool.task(0).task.elements().to_vec();
    elements[0].cost /= 2.0;
    let cheaper = VehicleTask::new(elements, &d.instance, &d.config).unwrap();

    // ACT
    let insertion = pool.add_task(cheaper, false);
    let added = model.add_task(&mut solver, &pool, &insertion);

    // ASSERT
    assert_eq!(insertion.outcome, Insertion::Replaced(0));
    assert!(added);
    let variables = model.column_variables();
    let mut values = vec![0.0; solver.model.variables.len()];
    values[old_variable] = 1.0;
    assert_eq!(model.selection(&values).tasks, vec![0]);
    assert_eq!(variables.len(), pool.task_count() + pool.duty_count() + 1);
}

#[test]
fn coverage_report_lists_every_deviation() {
    // ARRANGE
    let d = init_test_data();
    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let selection = Selection {
        tasks: vec![0, 1, 1],
        duties: vec![0, 0],
    };

    // ACT
    let report = CoverageReport::new(&pool, &selection);

    // ASSERT
    itertools::assert_equal(report.uncovered_trips.iter().copied(), (2..8).map(TripIdx));
    assert_eq!(report.overcovered_trips, vec![(TripIdx(1), 2)]);
    assert_eq!(report.uncovered_blocks, vec![(BlockIdx(1), 2, 0)]);
    assert_eq!(report.overcovered_blocks, vec![(BlockIdx(0), 1, 2)]);
    assert!(!report.is_consistent());
}

#[test]
fn unit_columns_form_a_consistent_cover() {
    // ARRANGE
    let d = init_test_data();
    let pool = ColumnPool::with_unit_columns(d.instance.clone(), d.config.clone()).unwrap();
    let selection = Selection {
        tasks: (0..pool.task_count()).collect(),
        duties: (0..pool.duty_count()).collect(),
    };

    // ACT
    let report = CoverageReport::new(&pool, &selection);

    // ASSERT
    assert!(report.is_consistent());
    assert!(report.overcovered_trips.is_empty());
    assert_eq!(format!("{}", report), "exact cover");
}
