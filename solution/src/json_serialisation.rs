use model::instance::Instance;
use serde::{Deserialize, Serialize};

use crate::crew_duty::{CrewDuty, DutyElementKind};
use crate::vehicle_task::{VehicleElementKind, VehicleTask};
use crate::Schedule;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JsonObjective {
    total_cost: f64,
    vehicle_cost: f64,
    crew_cost: f64,
    vehicle_count: usize,
    duty_count: usize,
    uncovered_trips: Vec<String>,
    overcovered_trips: Vec<String>,
    block_mismatches: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JsonVehicleTask {
    cost: f64,
    elements: Vec<JsonVehicleElement>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
enum JsonVehicleElement {
    #[serde(rename_all = "camelCase")]
    ServiceTrip {
        id: String,
        origin: String,
        destination: String,
        departure_time: String,
        arrival_time: String,
        soc_after: f64,
    },
    #[serde(rename_all = "camelCase")]
    DeadHeadTrip {
        origin: String,
        destination: String,
        departure_time: String,
        arrival_time: String,
        soc_after: f64,
    },
    #[serde(rename_all = "camelCase")]
    Idle {
        location: String,
        start_time: String,
        end_time: String,
    },
    #[serde(rename_all = "camelCase")]
    Charge {
        location: String,
        start_time: String,
        end_time: String,
        soc_gained: f64,
    },
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JsonCrewDuty {
    duty_type: String,
    start_time: String,
    end_time: String,
    paid_duration: String,
    cost: f64,
    elements: Vec<JsonDutyElement>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JsonDutyElement {
    kind: String,
    origin: String,
    destination: String,
    start_time: String,
    end_time: String,
}

pub fn write_schedule_to_json(schedule: &Schedule, path: &str) -> Result<(), std::io::Error> {
    let json_output = schedule_to_json(schedule);
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &json_output)?;
    Ok(())
}

pub fn schedule_to_json(schedule: &Schedule) -> serde_json::Value {
    let instance = schedule.instance();
    let trip_ids = |trips: Vec<model::base_types::TripIdx>| -> Vec<String> {
        trips.iter().map(|t| instance.trip(*t).id.clone()).collect()
    };
    let objective = JsonObjective {
        total_cost: schedule.total_cost(),
        vehicle_cost: schedule.vehicle_cost(),
        crew_cost: schedule.crew_cost(),
        vehicle_count: schedule.tasks().len(),
        duty_count: schedule.duties().len(),
        uncovered_trips: trip_ids(schedule.uncovered_trips()),
        overcovered_trips: trip_ids(schedule.overcovered_trips()),
        block_mismatches: schedule
            .block_mismatches()
            .iter()
            .map(|d| d.to_string())
            .collect(),
    };
    let tasks: Vec<JsonVehicleTask> = schedule
        .tasks()
        .iter()
        .map(|t| task_to_json(t, instance))
        .collect();
    let duties: Vec<JsonCrewDuty> = schedule
        .duties()
        .iter()
        .map(|d| duty_to_json(d, instance))
        .collect();
    serde_json::json!({
        "objectiveValue": objective,
        "vehicleTasks": tasks,
        "crewDuties": duties,
    })
}

fn task_to_json(task: &VehicleTask, instance: &Instance) -> JsonVehicleTask {
    let name = |l| instance.location(l).id.clone();
    let elements = task
        .elements()
        .iter()
        .map(|e| match e.kind {
            VehicleElementKind::Trip(t) => JsonVehicleElement::ServiceTrip {
                id: instance.trip(t).id.clone(),
                origin: name(e.from),
                destination: name(e.to),
                departure_time: e.start_time.to_string(),
                arrival_time: e.end_time.to_string(),
                soc_after: e.end_soc,
            },
            VehicleElementKind::Deadhead { .. } => JsonVehicleElement::DeadHeadTrip {
                origin: name(e.from),
                destination: name(e.to),
                departure_time: e.start_time.to_string(),
                arrival_time: e.end_time.to_string(),
                soc_after: e.end_soc,
            },
            VehicleElementKind::Idle => JsonVehicleElement::Idle {
                location: name(e.from),
                start_time: e.start_time.to_string(),
                end_time: e.end_time.to_string(),
            },
            VehicleElementKind::Charge { soc_gained } => JsonVehicleElement::Charge {
                location: name(e.from),
                start_time: e.start_time.to_string(),
                end_time: e.end_time.to_string(),
                soc_gained,
            },
        })
        .collect();
    JsonVehicleTask {
        cost: task.cost(),
        elements,
    }
}

fn duty_to_json(duty: &CrewDuty, instance: &Instance) -> JsonCrewDuty {
    let name = |l| instance.location(l).id.clone();
    let elements = duty
        .elements()
        .iter()
        .map(|e| JsonDutyElement {
            kind: match e.kind {
                DutyElementKind::SignOn => "signOn".to_string(),
                DutyElementKind::Block(b) => format!("block{}", b),
                DutyElementKind::Idle => "idle".to_string(),
                DutyElementKind::Break { .. } => "break".to_string(),
                DutyElementKind::LongIdle => "longIdle".to_string(),
                DutyElementKind::SignOff => "signOff".to_string(),
            },
            origin: name(e.from),
            destination: name(e.to),
            start_time: e.start_time.to_string(),
            end_time: e.end_time.to_string(),
        })
        .collect();
    JsonCrewDuty {
        duty_type: duty.duty_type().to_string(),
        start_time: duty.start_time().to_string(),
        end_time: duty.end_time().to_string(),
        paid_duration: duty.paid_duration().to_string(),
        cost: duty.cost(),
        elements,
    }
}
