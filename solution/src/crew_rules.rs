#[cfg(test)]
mod tests;

use model::base_types::Cost;
use model::config::{CrewLocalSearchConfig, CrewRules};
use time::{Duration, Time};

use crate::crew_duty::DutyType;

/// A segment of at least this length needs the long break combination. A segment of exactly
/// this length belongs to the long class.
const LONG_SEGMENT: i32 = 5 * 3600 + 30 * 60;
/// A segment longer than this needs at least one break.
const SHORT_SEGMENT: i32 = 4 * 3600;
const MIN_TOTAL_BREAK: i32 = 40 * 60;
const MIN_LONGEST_BREAK: i32 = 20 * 60;

/// Time windows and maximal paid duration of a duty type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DutyWindow {
    pub earliest_start: Option<Time>,
    pub latest_start: Option<Time>,
    pub earliest_end: Option<Time>,
    pub latest_end: Option<Time>,
    pub max_paid: Option<Duration>,
}

impl DutyWindow {
    fn new(
        earliest_start: Option<&str>,
        latest_start: Option<&str>,
        earliest_end: Option<&str>,
        latest_end: Option<&str>,
        max_paid: Option<Duration>,
    ) -> DutyWindow {
        DutyWindow {
            earliest_start: earliest_start.map(Time::new),
            latest_start: latest_start.map(Time::new),
            earliest_end: earliest_end.map(Time::new),
            latest_end: latest_end.map(Time::new),
            max_paid,
        }
    }

    pub fn start_allowed(&self, start: Time) -> bool {
        self.earliest_start.map_or(true, |t| start >= t)
            && self.latest_start.map_or(true, |t| start <= t)
    }
}

/// Window table of the duty types. Single duties are seed columns and unrestricted.
pub fn duty_window(duty_type: DutyType, rules: &CrewRules) -> DutyWindow {
    let max = Some(rules.max_duty_length);
    match duty_type {
        DutyType::Early => DutyWindow::new(None, None, None, Some("16:30"), max),
        DutyType::Day => DutyWindow::new(None, None, Some("16:30"), Some("18:15"), max),
        DutyType::Late => DutyWindow::new(Some("13:00"), None, None, Some("26:30"), max),
        DutyType::Night => DutyWindow::new(
            None,
            Some("24:00"),
            Some("26:30"),
            None,
            Some(rules.max_night_duty_length),
        ),
        DutyType::Between => DutyWindow::new(None, Some("13:00"), Some("18:15"), None, max),
        DutyType::Broken => DutyWindow::new(Some("5:30"), None, None, Some("19:30"), max),
        DutyType::Single => DutyWindow::new(None, None, None, None, None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakSpan {
    pub start: Time,
    pub net: Duration, // excluding the walking overhead of the break location
}

/// Everything the labor rules look at, independent of how the duty was put together.
#[derive(Debug, Clone, PartialEq)]
pub struct DutyShape {
    pub start: Time,
    pub end: Time,
    pub paid: Duration,
    pub breaks: Vec<BreakSpan>,
    pub long_idle: Option<(Time, Time)>,
    pub max_steering: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Violation {
    StartTooEarly(Duration),
    StartTooLate(Duration),
    EndTooEarly(Duration),
    EndTooLate(Duration),
    TooLong(Duration),
    SteeringTooLong(Duration),
    MissingBreak,
    MissingDinnerBreak,
    MissingLongIdle,
    UnexpectedLongIdle,
}

impl Violation {
    /// Soft-constraint cost used by the crew local search; hard structural violations (long idle)
    /// are priced like missing breaks.
    pub fn penalty(&self, weights: &CrewLocalSearchConfig) -> Cost {
        match self {
            Violation::StartTooEarly(d)
            | Violation::StartTooLate(d)
            | Violation::EndTooEarly(d)
            | Violation::EndTooLate(d)
            | Violation::TooLong(d) => weights.time_penalty * d.in_sec() as f64,
            Violation::SteeringTooLong(d) => weights.steering_penalty * d.in_sec() as f64,
            Violation::MissingBreak
            | Violation::MissingDinnerBreak
            | Violation::MissingLongIdle
            | Violation::UnexpectedLongIdle => weights.break_penalty,
        }
    }
}

/// Checks a duty of the given type against windows, paid duration, steering time and break
/// rules. An empty result means the duty is feasible.
pub fn evaluate(duty_type: DutyType, shape: &DutyShape, rules: &CrewRules) -> Vec<Violation> {
    let mut violations = Vec::new();
    if duty_type == DutyType::Single {
        return violations;
    }

    let window = duty_window(duty_type, rules);
    if let Some(t) = window.earliest_start.filter(|t| shape.start < *t) {
        violations.push(Violation::StartTooEarly(t - shape.start));
    }
    if let Some(t) = window.latest_start.filter(|t| shape.start > *t) {
        violations.push(Violation::StartTooLate(shape.start - t));
    }
    if let Some(t) = window.earliest_end.filter(|t| shape.end < *t) {
        violations.push(Violation::EndTooEarly(t - shape.end));
    }
    if let Some(t) = window.latest_end.filter(|t| shape.end > *t) {
        violations.push(Violation::EndTooLate(shape.end - t));
    }
    if let Some(max) = window.max_paid.filter(|max| shape.paid > *max) {
        violations.push(Violation::TooLong(shape.paid - max));
    }
    if shape.max_steering > rules.max_steering_time {
        violations.push(Violation::SteeringTooLong(
            shape.max_steering - rules.max_steering_time,
        ));
    }

    match (duty_type, shape.long_idle) {
        (DutyType::Broken, Some((idle_start, idle_end))) => {
            let (before, after): (Vec<BreakSpan>, Vec<BreakSpan>) =
                shape.breaks.iter().copied().partition(|b| b.start < idle_start);
            if !breaks_sufficient(idle_start - shape.start, &before) {
                violations.push(Violation::MissingBreak);
            }
            if !breaks_sufficient(shape.end - idle_end, &after) {
                violations.push(Violation::MissingBreak);
            }
        }
        (DutyType::Broken, None) => {
            violations.push(Violation::MissingLongIdle);
            if !breaks_sufficient(shape.paid, &shape.breaks) {
                violations.push(Violation::MissingBreak);
            }
        }
        (_, Some(_)) => {
            violations.push(Violation::UnexpectedLongIdle);
        }
        (_, None) => {
            if !breaks_sufficient(shape.paid, &shape.breaks) {
                violations.push(Violation::MissingBreak);
            }
        }
    }

    if duty_type == DutyType::Late && !dinner_break_sufficient(shape, rules) {
        violations.push(Violation::MissingDinnerBreak);
    }
    violations
}

/// Break minimum of one continuous piece of work.
pub fn breaks_sufficient(length: Duration, breaks: &[BreakSpan]) -> bool {
    if length.in_sec() >= LONG_SEGMENT {
        let total: Duration = breaks.iter().map(|b| b.net).sum();
        total.in_sec() >= MIN_TOTAL_BREAK
            && breaks.iter().any(|b| b.net.in_sec() >= MIN_LONGEST_BREAK)
    } else if length.in_sec() > SHORT_SEGMENT {
        !breaks.is_empty()
    } else {
        true
    }
}

fn dinner_break_sufficient(shape: &DutyShape, rules: &CrewRules) -> bool {
    let dinner = &rules.late_dinner;
    if shape.start > dinner.latest_start || shape.end < dinner.earliest_end {
        return true;
    }
    shape.breaks.iter().any(|b| {
        b.net >= dinner.min_break
            && b.start >= dinner.window_start
            && b.start + b.net <= dinner.window_end
    })
}
