use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::master::{
    ConstraintId, MasterSolver, MipSolution, Relaxation, Sense, SolverFailure, VariableId,
};

#[derive(Debug, Clone)]
pub struct RecordedVariable {
    pub cost: f64,
    pub upper: Option<f64>,
    pub name: String,
    pub binary: bool,
}

#[derive(Debug, Clone)]
pub struct RecordedConstraint {
    pub sense: Sense,
    pub rhs: f64,
    pub name: String,
}

/// Everything a master told the solver, coefficients stored once per (row, variable).
#[derive(Debug, Clone, Default)]
pub struct RecordedModel {
    pub variables: Vec<RecordedVariable>,
    pub constraints: Vec<RecordedConstraint>,
    pub coefficients: HashMap<(ConstraintId, VariableId), f64>,
}

impl RecordedModel {
    pub fn constraint(&self, name: &str) -> Option<ConstraintId> {
        self.constraints.iter().position(|c| c.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<VariableId> {
        self.variables.iter().position(|v| v.name == name)
    }

    pub fn column(&self, variable: VariableId) -> Vec<(ConstraintId, f64)> {
        let mut column: Vec<(ConstraintId, f64)> = self
            .coefficients
            .iter()
            .filter(|((_, v), _)| *v == variable)
            .map(|((c, _), value)| (*c, *value))
            .collect();
        column.sort_by_key(|(c, _)| *c);
        column
    }

    /// Cost minus the dual-weighted column, the reduced cost the solver would report.
    pub fn reduced_cost(&self, variable: VariableId, duals: &[f64]) -> f64 {
        self.variables[variable].cost
            - self
                .column(variable)
                .iter()
                .map(|(c, value)| duals[*c] * value)
                .sum::<f64>()
    }

    fn rows_with_prefix(&self, variable: VariableId, prefix: &str) -> Vec<(ConstraintId, f64)> {
        self.column(variable)
            .into_iter()
            .filter(|(c, _)| self.constraints[*c].name.starts_with(prefix))
            .collect()
    }
}

pub type RelaxationScript = Box<dyn FnMut(&RecordedModel) -> Result<Relaxation, SolverFailure>>;
pub type MipScript = Box<dyn FnMut(&RecordedModel) -> Result<MipSolution, SolverFailure>>;

/// In-memory stand-in for an LP/MIP solver. Relaxations and integer solutions come from scripts
/// that see the recorded model.
pub struct ScriptedSolver {
    pub model: RecordedModel,
    pub relaxation_calls: usize,
    pub mip_calls: usize,
    pub stop: Option<Arc<AtomicBool>>,
    relaxation: RelaxationScript,
    mip: MipScript,
}

impl ScriptedSolver {
    pub fn new(relaxation: RelaxationScript, mip: MipScript) -> ScriptedSolver {
        ScriptedSolver {
            model: RecordedModel::default(),
            relaxation_calls: 0,
            mip_calls: 0,
            stop: None,
            relaxation,
            mip,
        }
    }

    fn interrupted(&self) -> bool {
        self.stop
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

impl MasterSolver for ScriptedSolver {
    fn add_variable(
        &mut self,
        cost: f64,
        upper: Option<f64>,
        column: &[(ConstraintId, f64)],
        name: &str,
    ) -> VariableId {
        let variable = self.model.variables.len();
        self.model.variables.push(RecordedVariable {
            cost,
            upper,
            name: name.to_string(),
            binary: false,
        });
        for (constraint, value) in column.iter() {
            *self
                .model
                .coefficients
                .entry((*constraint, variable))
                .or_insert(0.0) += value;
        }
        variable
    }

    fn add_constraint(
        &mut self,
        expr: &[(VariableId, f64)],
        sense: Sense,
        rhs: f64,
        name: &str,
    ) -> ConstraintId {
        let constraint = self.model.constraints.len();
        self.model.constraints.push(RecordedConstraint {
            sense,
            rhs,
            name: name.to_string(),
        });
        for (variable, value) in expr.iter() {
            *self
                .model
                .coefficients
                .entry((constraint, *variable))
                .or_insert(0.0) += value;
        }
        constraint
    }

    fn solve_relaxation(&mut self) -> Result<Relaxation, SolverFailure> {
        if self.interrupted() {
            return Err(SolverFailure::Interrupted);
        }
        self.relaxation_calls += 1;
        (self.relaxation)(&self.model)
    }

    fn fix_to_binary(&mut self, variables: &[VariableId]) {
        for variable in variables.iter() {
            self.model.variables[*variable].binary = true;
        }
    }

    /// Also answers once the stop flag is set, like a solver handing back its incumbent.
    fn solve_mip(&mut self) -> Result<MipSolution, SolverFailure> {
        self.mip_calls += 1;
        (self.mip)(&self.model)
    }

    fn terminate(&mut self, flag: Arc<AtomicBool>) {
        self.stop = Some(flag);
    }
}

/// Relaxations without primal values whose duals come from the constraint names.
pub fn named_duals(dual: impl Fn(&str) -> f64 + 'static) -> RelaxationScript {
    Box::new(move |model: &RecordedModel| {
        Ok(Relaxation {
            objective: 0.0,
            values: vec![0.0; model.variables.len()],
            duals: model.constraints.iter().map(|c| dual(&c.name)).collect(),
        })
    })
}

pub fn failing_relaxation(failure: SolverFailure) -> RelaxationScript {
    Box::new(move |_: &RecordedModel| Err(failure.clone()))
}

/// Greedy integer solution on the trip and block rows: trip-disjoint tasks by cost per trip,
/// then block-disjoint duties by cost per block until every driven block is staffed once.
pub fn greedy_cover() -> MipScript {
    Box::new(|model: &RecordedModel| {
        let mut values = vec![0.0; model.variables.len()];
        let of_kind = |prefix: &str| -> Vec<VariableId> {
            (0..model.variables.len())
                .filter(|v| model.variables[*v].name.starts_with(prefix))
                .collect()
        };

        let mut tasks: Vec<(VariableId, Vec<ConstraintId>)> = of_kind("task_")
            .into_iter()
            .map(|v| (v, rows(model.rows_with_prefix(v, "trip_"))))
            .collect();
        tasks.sort_by(|a, b| {
            per_row(model, a.0, a.1.len()).total_cmp(&per_row(model, b.0, b.1.len()))
        });
        let mut trip_covered: HashMap<ConstraintId, bool> = HashMap::new();
        for (variable, trip_rows) in tasks.iter() {
            if trip_rows.iter().all(|r| !trip_covered.contains_key(r)) {
                values[*variable] = 1.0;
                for row in trip_rows.iter() {
                    trip_covered.insert(*row, true);
                }
            }
        }

        let mut needed: HashMap<ConstraintId, i64> = HashMap::new();
        for (variable, _) in tasks.iter().filter(|(v, _)| values[*v] > 0.5) {
            for (row, _) in model.rows_with_prefix(*variable, "block_") {
                *needed.entry(row).or_insert(0) += 1;
            }
        }
        let mut duties: Vec<(VariableId, Vec<ConstraintId>)> = of_kind("duty_")
            .into_iter()
            .map(|v| (v, rows(model.rows_with_prefix(v, "block_"))))
            .collect();
        duties.sort_by(|a, b| {
            per_row(model, a.0, a.1.len()).total_cmp(&per_row(model, b.0, b.1.len()))
        });
        loop {
            let pick = duties.iter().find(|(_, block_rows)| {
                !block_rows.is_empty()
                    && block_rows
                        .iter()
                        .all(|r| needed.get(r).copied().unwrap_or(0) > 0)
            });
            match pick {
                Some((variable, block_rows)) => {
                    values[*variable] += 1.0;
                    for row in block_rows.iter() {
                        if let Some(count) = needed.get_mut(row) {
                            *count -= 1;
                        }
                    }
                }
                None => break,
            }
        }

        let objective = values
            .iter()
            .zip(model.variables.iter())
            .map(|(value, variable)| value * variable.cost)
            .sum();
        Ok(MipSolution { objective, values })
    })
}

fn rows(column: Vec<(ConstraintId, f64)>) -> Vec<ConstraintId> {
    column.into_iter().map(|(c, _)| c).collect()
}

fn per_row(model: &RecordedModel, variable: VariableId, rows: usize) -> f64 {
    model.variables[variable].cost / rows.max(1) as f64
}
