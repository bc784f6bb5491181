use model::config::CrewRules;
use time::{Duration, Time};

use crate::crew_duty::DutyType;

use super::{breaks_sufficient, duty_window, evaluate, BreakSpan, DutyShape, Violation};

fn brk(start: &str, minutes: i32) -> BreakSpan {
    BreakSpan {
        start: Time::new(start),
        net: Duration::from_minutes(minutes),
    }
}

fn shape(start: &str, end: &str, breaks: Vec<BreakSpan>) -> DutyShape {
    let start = Time::new(start);
    let end = Time::new(end);
    DutyShape {
        start,
        end,
        paid: end - start,
        breaks,
        long_idle: None,
        max_steering: Duration::new("3:00"),
    }
}

#[test]
fn break_minimums_by_length() {
    let h = |s: &str| Duration::new(s);
    assert!(breaks_sufficient(h("4:00"), &[]));
    assert!(!breaks_sufficient(h("4:01"), &[]));
    assert!(breaks_sufficient(h("5:00"), &[brk("9:00", 15)]));
    assert!(!breaks_sufficient(h("5:30"), &[brk("9:00", 30)]));
    assert!(breaks_sufficient(h("5:30"), &[brk("9:00", 20), brk("11:00", 20)]));
    assert!(breaks_sufficient(h("8:00"), &[brk("9:00", 15), brk("11:00", 25)]));
    // enough in total but no single break of 20 minutes
    assert!(!breaks_sufficient(
        h("8:00"),
        &[brk("9:00", 15), brk("10:00", 15), brk("11:00", 15)]
    ));
}

#[test]
fn feasible_early_duty() {
    // ARRANGE
    let rules = CrewRules::default();
    let duty = shape("6:00", "14:00", vec![brk("9:00", 20), brk("11:30", 20)]);

    // ACT
    let violations = evaluate(DutyType::Early, &duty, &rules);

    // ASSERT
    assert!(violations.is_empty());
}

#[test]
fn windows_per_duty_type() {
    // ARRANGE
    let rules = CrewRules::default();
    let duty = shape("6:00", "17:00", vec![brk("9:00", 20), brk("12:00", 20)]);

    // ACT
    let early = evaluate(DutyType::Early, &duty, &rules);
    let day = evaluate(DutyType::Day, &duty, &rules);
    let late = evaluate(DutyType::Late, &duty, &rules);

    // ASSERT
    assert!(early.contains(&Violation::EndTooLate(Duration::new("0:30"))));
    assert!(early.contains(&Violation::TooLong(Duration::new("2:00"))));
    assert!(!day.iter().any(|v| matches!(v, Violation::EndTooEarly(_))));
    assert!(late.contains(&Violation::StartTooEarly(Duration::new("7:00"))));
    assert!(duty_window(DutyType::Night, &rules).max_paid == Some(Duration::new("7:00")));
}

#[test]
fn long_block_without_long_idle() {
    // ARRANGE
    let rules = CrewRules::default();
    let mut duty = shape("6:00", "16:00", Vec::new());
    duty.max_steering = Duration::new("10:00");

    // ACT
    let broken = evaluate(DutyType::Broken, &duty, &rules);
    let early = evaluate(DutyType::Early, &duty, &rules);
    let day = evaluate(DutyType::Day, &duty, &rules);

    // ASSERT
    assert!(broken.contains(&Violation::MissingLongIdle));
    assert!(!early.contains(&Violation::MissingLongIdle));
    assert!(early.contains(&Violation::SteeringTooLong(Duration::new("6:00"))));
    assert!(early.contains(&Violation::MissingBreak));
    assert!(!early.iter().any(|v| matches!(v, Violation::EndTooLate(_))));
    assert!(day.contains(&Violation::EndTooEarly(Duration::new("0:30"))));
}

#[test]
fn broken_duty_checks_both_sides() {
    // ARRANGE
    let rules = CrewRules::default();
    let mut duty = shape("6:00", "18:00", vec![brk("14:00", 20)]);
    duty.long_idle = Some((Time::new("10:00"), Time::new("13:00")));
    duty.paid = Duration::new("9:00");

    // ACT
    let violations = evaluate(DutyType::Broken, &duty, &rules);
    duty.long_idle = Some((Time::new("11:00"), Time::new("14:00")));
    let unbalanced = evaluate(DutyType::Broken, &duty, &rules);
    let not_broken = evaluate(DutyType::Early, &duty, &rules);

    // ASSERT
    // 4h before the long idle need no break, 5h after it need one
    assert!(violations.is_empty());
    // 5h before without break; the 20 minute break now lies after the long idle
    assert_eq!(unbalanced, vec![Violation::MissingBreak]);
    assert!(not_broken.contains(&Violation::UnexpectedLongIdle));
}

#[test]
fn late_dinner_break() {
    // ARRANGE
    let rules = CrewRules::default();
    let with_dinner = shape("14:00", "21:00", vec![brk("17:00", 30), brk("19:30", 20)]);
    let late_dinner = shape("14:00", "21:00", vec![brk("17:00", 15), brk("20:15", 30)]);
    let short_duty = shape("16:00", "21:00", vec![brk("17:00", 15)]);

    // ACT
    let fine = evaluate(DutyType::Late, &with_dinner, &rules);
    let missing = evaluate(DutyType::Late, &late_dinner, &rules);
    let not_needed = evaluate(DutyType::Late, &short_duty, &rules);

    // ASSERT
    assert!(fine.is_empty());
    assert_eq!(missing, vec![Violation::MissingDinnerBreak]);
    assert!(not_needed.is_empty());
}

#[test]
fn dinner_break_is_only_required_on_late_duties() {
    // ARRANGE
    let rules = CrewRules::default();
    let evening = shape("12:00", "21:00", vec![brk("14:00", 20), brk("15:00", 20)]);

    // ACT
    let between = evaluate(DutyType::Between, &evening, &rules);
    let late = evaluate(DutyType::Late, &evening, &rules);

    // ASSERT
    assert!(between.is_empty());
    assert!(late.contains(&Violation::MissingDinnerBreak));
}

#[test]
fn single_duties_are_unrestricted() {
    let rules = CrewRules::default();
    let mut duty = shape("3:00", "23:00", Vec::new());
    duty.max_steering = Duration::new("20:00");
    assert!(evaluate(DutyType::Single, &duty, &rules).is_empty());
}
