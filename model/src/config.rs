use serde::{Deserialize, Serialize};
use time::{Duration, Time};

use crate::base_types::Cost;

/// All tunable parameters of a run. Every section falls back to the production defaults, so a
/// json config only needs to mention the values it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub verbose: bool,
    pub seed: u64,
    pub vehicle: VehicleCosts,
    pub crew: CrewRules,
    pub vehicle_labeling: VehicleLabelingConfig,
    pub crew_labeling: CrewLabelingConfig,
    pub vehicle_local_search: VehicleLocalSearchConfig,
    pub crew_local_search: CrewLocalSearchConfig,
    pub master: MasterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleCosts {
    pub pullout_cost: Cost,
    pub cost_per_meter: Cost,
    pub idle_cost_per_second: Cost,
    pub kwh_cost: Cost,
    pub max_steering_time: Duration, // continuous driving without handover
    pub max_no_hub_time: Duration,   // continuous time without visiting a crew hub
    pub min_charge_time: Duration,   // shorter stops are not worth plugging in
    pub pre_direct_time: Option<Duration>, // network preprocessing, None keeps all arcs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrewRules {
    pub shift_cost: Cost,
    pub single_shift_cost: Cost,
    pub broken_shift_cost: Cost,
    pub hourly_cost: Cost,
    pub target_duty_length: Duration,
    pub long_duty_length: Duration,
    pub max_duty_length: Duration,
    pub max_night_duty_length: Duration,
    pub max_steering_time: Duration,
    pub min_break: Duration,
    pub max_break: Duration,
    pub min_short_idle: Duration,
    pub max_short_idle: Duration,
    pub min_long_idle: Duration,
    pub max_long_idle: Duration,
    pub max_broken_fraction: f64,
    pub max_between_fraction: f64,
    pub max_long_fraction: f64,
    pub hard_constraint_penalty: Cost,
    pub late_dinner: DinnerBreakRule,
}

/// Late duties spanning the evening need a meal break inside a fixed window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DinnerBreakRule {
    pub latest_start: Time,
    pub earliest_end: Time,
    pub window_start: Time,
    pub window_end: Time,
    pub min_break: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleLabelingConfig {
    pub soc_buckets: usize,
    pub max_columns: usize,
    pub min_trips: usize,
    pub secondary_column_count: usize,
    pub secondary_attempts: usize,
    /// Only labels with a reduced cost strictly below this value are extracted.
    pub max_reduced_cost: Cost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrewLabelingConfig {
    pub max_columns: usize,
    pub max_labels_in_end: usize,
    pub max_reduced_cost: Cost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnealingConfig {
    pub starting_temperature: f64,
    pub ending_temperature: f64,
    pub cooling_rate: f64,
    pub iterations: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleLocalSearchConfig {
    pub single: VehicleSingleConfig,
    pub global: VehicleGlobalConfig,
    pub penalties: VehiclePenalties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleSingleConfig {
    pub annealing: AnnealingConfig,
    pub snapshots: usize,
    pub add_trip: f64,
    pub remove_trip: f64,
    pub add_charge: f64,
    pub remove_charge: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleGlobalConfig {
    pub annealing: AnnealingConfig,
    pub swap_tails: f64,
    pub move_range: f64,
    pub add_charge: f64,
    pub remove_charge: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehiclePenalties {
    pub steering_fixed: Cost,
    pub steering_per_second: Cost,
    pub hub_fixed: Cost,
    pub hub_per_second: Cost,
    pub soc_fixed: Cost,
    pub soc_per_percent: Cost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrewLocalSearchConfig {
    pub annealing: AnnealingConfig,
    pub swap_tails: f64,
    pub move_range: f64,
    pub move_single: f64,
    pub crew_hub_penalty: Cost,
    pub time_penalty: Cost,
    pub steering_penalty: Cost,
    pub break_penalty: Cost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MasterConfig {
    pub max_vehicles: Option<usize>,
    pub max_duties: Option<usize>,
    pub vehicle_over_max_cost: Cost,
    pub crew_over_max_cost: Cost,
    pub allow_overcover: bool,
    pub instances_per_iteration: usize,
    pub vehicle_generators: VehicleGeneratorWeights,
    pub crew_generators: CrewGeneratorWeights,
    pub lp: LpMasterConfig,
    pub lagrange: LagrangeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleGeneratorWeights {
    pub labeling: f64,
    pub local_search_single: f64,
    pub local_search_global: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrewGeneratorWeights {
    pub labeling: f64,
    pub local_search: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LpMasterConfig {
    pub rounds: usize,
    pub max_vehicle_iterations: usize,
    pub max_crew_iterations: usize,
    /// Consecutive pricing iterations without a negative column before a phase stops.
    pub opt_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LagrangeConfig {
    pub rounds: usize,
    pub vehicle_iterations_init: usize,
    pub vehicle_iterations_round: usize,
    pub crew_iterations_init: usize,
    pub crew_iterations_round: usize,
    pub max_tasks_during: usize,
    pub max_duties_during: usize,
    pub pi_start: f64,
    pub pi_end: f64,
    pub pi_cooling: f64,
    pub rounds_without_improvement: usize,
    pub max_subgradient_rounds: usize,
    pub stabilization_epsilon: f64,
    pub stabilization_rounds: usize,
    pub disruption_rounds: usize,
    pub disruption_lower: f64,
    pub disruption_upper: f64,
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// Defaults /////////////////////////////
/////////////////////////////////////////////////////////////////////

impl Default for VehicleCosts {
    fn default() -> Self {
        VehicleCosts {
            pullout_cost: 200.0,
            cost_per_meter: 0.00005,
            idle_cost_per_second: 0.0,
            kwh_cost: 0.32,
            max_steering_time: Duration::new("4:00"),
            max_no_hub_time: Duration::new("8:00"),
            min_charge_time: Duration::new("0:15"),
            pre_direct_time: None,
        }
    }
}

impl Default for CrewRules {
    fn default() -> Self {
        CrewRules {
            shift_cost: 100.0,
            single_shift_cost: 1_000.0,
            broken_shift_cost: 20.0,
            hourly_cost: 65.0,
            target_duty_length: Duration::new("8:00"),
            long_duty_length: Duration::new("8:30"),
            max_duty_length: Duration::new("9:00"),
            max_night_duty_length: Duration::new("7:00"),
            max_steering_time: Duration::new("4:00"),
            min_break: Duration::new("0:15"),
            max_break: Duration::new("1:00"),
            min_short_idle: Duration::ZERO,
            max_short_idle: Duration::new("0:30"),
            min_long_idle: Duration::new("1:30"),
            max_long_idle: Duration::new("5:00"),
            max_broken_fraction: 0.3,
            max_between_fraction: 0.1,
            max_long_fraction: 0.15,
            hard_constraint_penalty: 100_000.0,
            late_dinner: DinnerBreakRule::default(),
        }
    }
}

impl Default for DinnerBreakRule {
    fn default() -> Self {
        DinnerBreakRule {
            latest_start: Time::new("15:00"),
            earliest_end: Time::new("20:30"),
            window_start: Time::new("16:30"),
            window_end: Time::new("20:30"),
            min_break: Duration::new("0:20"),
        }
    }
}

impl Default for VehicleLabelingConfig {
    fn default() -> Self {
        VehicleLabelingConfig {
            soc_buckets: 101,
            max_columns: 50,
            min_trips: 3,
            secondary_column_count: 16,
            secondary_attempts: 4,
            max_reduced_cost: 0.0,
        }
    }
}

impl Default for CrewLabelingConfig {
    fn default() -> Self {
        CrewLabelingConfig {
            max_columns: 50,
            max_labels_in_end: 100_000,
            max_reduced_cost: 0.0,
        }
    }
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            starting_temperature: 50.0,
            ending_temperature: 0.01,
            cooling_rate: 0.98,
            iterations: 10_000_000,
        }
    }
}

impl Default for VehicleSingleConfig {
    fn default() -> Self {
        VehicleSingleConfig {
            annealing: AnnealingConfig {
                cooling_rate: 0.95,
                iterations: 500_000,
                ..AnnealingConfig::default()
            },
            snapshots: 5,
            add_trip: 20.0,
            remove_trip: 2.0,
            add_charge: 10.0,
            remove_charge: 1.0,
        }
    }
}

impl Default for VehicleGlobalConfig {
    fn default() -> Self {
        VehicleGlobalConfig {
            annealing: AnnealingConfig::default(),
            swap_tails: 20.0,
            move_range: 20.0,
            add_charge: 5.0,
            remove_charge: 1.0,
        }
    }
}

impl Default for VehiclePenalties {
    fn default() -> Self {
        VehiclePenalties {
            steering_fixed: 5000.0,
            steering_per_second: 10.0,
            hub_fixed: 5000.0,
            hub_per_second: 10.0,
            soc_fixed: 5000.0,
            soc_per_percent: 100.0,
        }
    }
}

impl Default for CrewLocalSearchConfig {
    fn default() -> Self {
        CrewLocalSearchConfig {
            annealing: AnnealingConfig::default(),
            swap_tails: 5.0,
            move_range: 2.0,
            move_single: 5.0,
            crew_hub_penalty: 100.0,
            time_penalty: 1.0,
            steering_penalty: 1.0,
            break_penalty: 10.0,
        }
    }
}

impl Default for MasterConfig {
    fn default() -> Self {
        MasterConfig {
            max_vehicles: None,
            max_duties: None,
            vehicle_over_max_cost: 0.0,
            crew_over_max_cost: 0.0,
            allow_overcover: true,
            instances_per_iteration: 1,
            vehicle_generators: VehicleGeneratorWeights::default(),
            crew_generators: CrewGeneratorWeights::default(),
            lp: LpMasterConfig::default(),
            lagrange: LagrangeConfig::default(),
        }
    }
}

impl Default for VehicleGeneratorWeights {
    fn default() -> Self {
        VehicleGeneratorWeights {
            labeling: 1.0,
            local_search_single: 0.0,
            local_search_global: 0.0,
        }
    }
}

impl Default for CrewGeneratorWeights {
    fn default() -> Self {
        CrewGeneratorWeights {
            labeling: 1.0,
            local_search: 0.0,
        }
    }
}

impl Default for LpMasterConfig {
    fn default() -> Self {
        LpMasterConfig {
            rounds: 1,
            max_vehicle_iterations: 250,
            max_crew_iterations: 1000,
            opt_threshold: 2,
        }
    }
}

impl Default for LagrangeConfig {
    fn default() -> Self {
        LagrangeConfig {
            rounds: 10,
            vehicle_iterations_init: 10,
            vehicle_iterations_round: 10,
            crew_iterations_init: 10,
            crew_iterations_round: 10,
            max_tasks_during: 40_000,
            max_duties_during: 40_000,
            pi_start: 2.0,
            pi_end: 0.001,
            pi_cooling: 0.9,
            rounds_without_improvement: 10,
            max_subgradient_rounds: 100_000,
            stabilization_epsilon: 1e-6,
            stabilization_rounds: 50,
            disruption_rounds: 0,
            disruption_lower: 0.5,
            disruption_upper: 2.0,
        }
    }
}

// methods
impl Config {
    pub fn from_json(value: serde_json::Value) -> Result<Config, String> {
        serde_json::from_value(value).map_err(|err| format!("invalid config: {}", err))
    }
}
