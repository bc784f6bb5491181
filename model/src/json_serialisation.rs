#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use time::{Duration, Time};

use crate::base_types::{LocationIdx, Meter, Soc, TripIdx};
use crate::charging_curve::ChargingCurve;
use crate::deadheads::{DeadheadTemplate, Deadheads};
use crate::instance::Instance;
use crate::locations::{Location, Locations};
use crate::trips::{FrequencyChange, Trip};
use crate::vehicle_type::VehicleType;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JsonVehicleType {
    id: String,
    capacity_kwh: f64,
    drive_usage_per_km: Soc,
    idle_usage_per_hour: Soc,
    min_soc: Soc,
    max_soc: Soc,
    start_soc: Soc,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JsonLocation {
    id: String,
    #[serde(default)]
    depot: bool,
    #[serde(default)]
    crew_base: bool,
    #[serde(default)]
    handover_allowed: bool,
    #[serde(default)]
    break_allowed: bool,
    #[serde(default)]
    can_charge: bool,
    #[serde(default)]
    sign_on_time_in_seconds: i32,
    #[serde(default)]
    sign_off_time_in_seconds: i32,
    #[serde(default)]
    bruto_netto_in_seconds: i32,
    charging_curve: Option<Vec<(Soc, f64)>>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JsonTrip {
    id: String,
    from: String,
    to: String,
    start_time: String,
    end_time: String,
    distance_in_meter: Meter,
    #[serde(default)]
    frequency_change: FrequencyChange,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JsonDeadhead {
    from: String,
    to: String,
    duration_in_seconds: i32,
    distance_in_meter: Meter,
    #[serde(default)]
    frequency_change_only: bool,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JsonInput {
    vehicle_type: JsonVehicleType,
    #[serde(default)]
    charging_curve: Vec<(Soc, f64)>,
    kwh_cost: Option<f64>,
    locations: Vec<JsonLocation>,
    depot: String,
    trips: Vec<JsonTrip>,
    deadheads: Vec<JsonDeadhead>,
}

/// Builds an `Instance` from its json representation. `kwh_cost` prices the charging curves;
/// the input may override it with a top-level `kwhCost`.
pub fn load_instance_from_json(input: serde_json::Value, kwh_cost: f64) -> Result<Instance, String> {
    let json_input: JsonInput =
        serde_json::from_value(input).map_err(|err| format!("invalid instance: {}", err))?;
    let kwh_cost = json_input.kwh_cost.unwrap_or(kwh_cost);

    let vehicle_type = create_vehicle_type(&json_input.vehicle_type);
    let locations = create_locations(&json_input, &vehicle_type, kwh_cost)?;
    let location_idx = |id: &str| {
        locations
            .find(id)
            .ok_or_else(|| format!("unknown location '{}'", id))
    };
    let trips = create_trips(&json_input, &location_idx)?;
    let deadheads = create_deadheads(&json_input, &location_idx, locations.len())?;
    let depot = location_idx(&json_input.depot)?;

    Instance::new(locations, trips, vehicle_type, deadheads, depot)
}

fn create_vehicle_type(json: &JsonVehicleType) -> VehicleType {
    VehicleType {
        id: json.id.clone(),
        capacity: json.capacity_kwh,
        drive_usage: json.drive_usage_per_km,
        idle_usage: json.idle_usage_per_hour,
        min_soc: json.min_soc,
        max_soc: json.max_soc,
        start_soc: json.start_soc,
    }
}

fn create_locations(
    json_input: &JsonInput,
    vehicle_type: &VehicleType,
    kwh_cost: f64,
) -> Result<Locations, String> {
    let mut locations = Vec::with_capacity(json_input.locations.len());
    for (i, json) in json_input.locations.iter().enumerate() {
        let charging_curve = match (&json.charging_curve, json.can_charge) {
            (Some(points), _) => Some(ChargingCurve::new(points, vehicle_type.capacity, kwh_cost)?),
            (None, true) => Some(ChargingCurve::new(
                &json_input.charging_curve,
                vehicle_type.capacity,
                kwh_cost,
            )?),
            (None, false) => None,
        };
        locations.push(Location {
            idx: LocationIdx(i),
            id: json.id.clone(),
            handover_allowed: json.handover_allowed,
            break_allowed: json.break_allowed,
            crew_base: json.crew_base,
            is_depot: json.depot,
            sign_on_time: Duration::from_seconds(json.sign_on_time_in_seconds),
            sign_off_time: Duration::from_seconds(json.sign_off_time_in_seconds),
            bruto_netto: Duration::from_seconds(json.bruto_netto_in_seconds),
            charging_curve,
        });
    }
    Ok(Locations::new(locations))
}

fn create_trips(
    json_input: &JsonInput,
    location_idx: &impl Fn(&str) -> Result<LocationIdx, String>,
) -> Result<Vec<Trip>, String> {
    json_input
        .trips
        .iter()
        .enumerate()
        .map(|(i, json)| {
            Ok(Trip {
                idx: TripIdx(i),
                id: json.id.clone(),
                from: location_idx(&json.from)?,
                to: location_idx(&json.to)?,
                start_time: json.start_time.parse::<Time>()?,
                end_time: json.end_time.parse::<Time>()?,
                distance: json.distance_in_meter,
                frequency_change: json.frequency_change,
            })
        })
        .collect()
}

fn create_deadheads(
    json_input: &JsonInput,
    location_idx: &impl Fn(&str) -> Result<LocationIdx, String>,
    location_count: usize,
) -> Result<Deadheads, String> {
    let templates = json_input
        .deadheads
        .iter()
        .map(|json| {
            Ok(DeadheadTemplate {
                from: location_idx(&json.from)?,
                to: location_idx(&json.to)?,
                duration: Duration::from_seconds(json.duration_in_seconds),
                distance: json.distance_in_meter,
                frequency_change_only: json.frequency_change_only,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(Deadheads::new(location_count, templates))
}
