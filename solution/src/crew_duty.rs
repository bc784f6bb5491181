#[cfg(test)]
mod tests;

use std::fmt;

use itertools::Itertools;
use model::base_types::{BlockIdx, Cost, LocationIdx};
use model::config::CrewRules;
use model::cover_set::CoverSet;
use serde::{Deserialize, Serialize};
use time::{Duration, Time};

use crate::block::Block;
use crate::crew_rules::{self, BreakSpan, DutyShape, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DutyType {
    Early,
    Day,
    Late,
    Night,
    Between,
    Broken,
    /// One block with sign-on and sign-off, only used to seed the masters.
    Single,
}

impl DutyType {
    /// Duty types the crew pricing generates.
    pub const PRICED: [DutyType; 6] = [
        DutyType::Early,
        DutyType::Day,
        DutyType::Late,
        DutyType::Night,
        DutyType::Between,
        DutyType::Broken,
    ];

    pub fn allows_long_idle(&self) -> bool {
        *self == DutyType::Broken
    }
}

impl fmt::Display for DutyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DutyElementKind {
    SignOn,
    Block(BlockIdx),
    Idle,
    Break { net: Duration },
    /// Unpaid part of a broken duty, the crew is off between sign-off and sign-on.
    LongIdle,
    SignOff,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DutyElement {
    pub kind: DutyElementKind,
    pub from: LocationIdx,
    pub to: LocationIdx,
    pub start_time: Time,
    pub end_time: Time,
}

impl DutyElement {
    pub fn stationary(
        kind: DutyElementKind,
        location: LocationIdx,
        start: Time,
        end: Time,
    ) -> DutyElement {
        DutyElement {
            kind,
            from: location,
            to: location,
            start_time: start,
            end_time: end,
        }
    }

    pub fn for_block(idx: BlockIdx, block: &Block) -> DutyElement {
        DutyElement {
            kind: DutyElementKind::Block(idx),
            from: block.start_location(),
            to: block.end_location(),
            start_time: block.start_time(),
            end_time: block.end_time(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Coefficients of a duty in the aggregate crew-mix rows: positive values consume the allowance
/// (average length), the remaining ones contribute to a required `>= 0` balance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateCoefficients {
    pub average_length: f64,
    pub long: f64,
    pub broken: f64,
    pub between: f64,
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// CrewDuty /////////////////////////////
/////////////////////////////////////////////////////////////////////

/// The day of one crew member. Elements are contiguous in time and location, at least one of them
/// is a block.
#[derive(Debug, Clone, PartialEq)]
pub struct CrewDuty {
    duty_type: DutyType,
    elements: Vec<DutyElement>,
    blocks: Vec<BlockIdx>,
    paid: Duration,
    cost: Cost,
}

// static functions
impl CrewDuty {
    pub fn new(
        duty_type: DutyType,
        elements: Vec<DutyElement>,
        rules: &CrewRules,
    ) -> Result<CrewDuty, String> {
        let blocks: Vec<BlockIdx> = elements
            .iter()
            .filter_map(|e| match e.kind {
                DutyElementKind::Block(b) => Some(b),
                _ => None,
            })
            .collect();
        if blocks.is_empty() {
            return Err("crew duty without blocks".to_string());
        }
        for (a, b) in elements.iter().tuple_windows() {
            if a.end_time != b.start_time || a.to != b.from {
                return Err(format!(
                    "crew duty is not contiguous between {} and {}",
                    a.end_time, b.start_time
                ));
            }
        }
        let long_idles = elements
            .iter()
            .filter(|e| e.kind == DutyElementKind::LongIdle)
            .count();
        if long_idles > 1 || (long_idles == 1 && !duty_type.allows_long_idle()) {
            return Err(format!("{} duty with {} long idles", duty_type, long_idles));
        }

        let total = elements[elements.len() - 1].end_time - elements[0].start_time;
        let unpaid: Duration = elements
            .iter()
            .filter(|e| e.kind == DutyElementKind::LongIdle)
            .map(|e| e.duration())
            .sum();
        let paid = total - unpaid;
        Ok(CrewDuty {
            duty_type,
            elements,
            blocks,
            paid,
            cost: duty_cost(duty_type, paid, rules),
        })
    }

    /// Sign-on, the block, sign-off.
    pub fn single(
        idx: BlockIdx,
        block: &Block,
        sign_on: Duration,
        sign_off: Duration,
        rules: &CrewRules,
    ) -> CrewDuty {
        let elements = vec![
            DutyElement::stationary(
                DutyElementKind::SignOn,
                block.start_location(),
                block.start_time() - sign_on,
                block.start_time(),
            ),
            DutyElement::for_block(idx, block),
            DutyElement::stationary(
                DutyElementKind::SignOff,
                block.end_location(),
                block.end_time(),
                block.end_time() + sign_off,
            ),
        ];
        let paid = block.duration() + sign_on + sign_off;
        CrewDuty {
            duty_type: DutyType::Single,
            elements,
            blocks: vec![idx],
            paid,
            cost: duty_cost(DutyType::Single, paid, rules),
        }
    }
}

// methods
impl CrewDuty {
    pub fn duty_type(&self) -> DutyType {
        self.duty_type
    }

    pub fn elements(&self) -> &[DutyElement] {
        &self.elements
    }

    pub fn blocks(&self) -> &[BlockIdx] {
        &self.blocks
    }

    pub fn covers(&self, block: BlockIdx) -> bool {
        self.blocks.contains(&block)
    }

    pub fn block_set(&self, block_count: usize) -> CoverSet {
        CoverSet::from_indices(block_count, self.blocks.iter().map(|b| b.0))
    }

    pub fn start_time(&self) -> Time {
        self.elements[0].start_time
    }

    pub fn end_time(&self) -> Time {
        self.elements[self.elements.len() - 1].end_time
    }

    pub fn start_location(&self) -> LocationIdx {
        self.elements[0].from
    }

    pub fn end_location(&self) -> LocationIdx {
        self.elements[self.elements.len() - 1].to
    }

    /// Total duration minus the unpaid long idle of a broken duty.
    pub fn paid_duration(&self) -> Duration {
        self.paid
    }

    pub fn cost(&self) -> Cost {
        self.cost
    }

    pub fn is_long(&self, rules: &CrewRules) -> bool {
        self.paid > rules.long_duty_length
    }

    pub fn aggregate_coefficients(&self, rules: &CrewRules) -> AggregateCoefficients {
        aggregate_coefficients(self.duty_type, self.paid, rules)
    }

    /// Projection onto what the labor rules look at. Steering time runs from the duty start
    /// or the end of the last break (or long idle) to the end of each block.
    pub fn shape(&self) -> DutyShape {
        let mut breaks = Vec::new();
        let mut long_idle = None;
        let mut rest_end = self.start_time();
        let mut max_steering = Duration::ZERO;
        for element in self.elements.iter() {
            match element.kind {
                DutyElementKind::Block(_) => {
                    max_steering = max_steering.max(element.end_time - rest_end);
                }
                DutyElementKind::Break { net } => {
                    breaks.push(BreakSpan {
                        start: element.start_time,
                        net,
                    });
                    rest_end = element.end_time;
                }
                DutyElementKind::LongIdle => {
                    long_idle = Some((element.start_time, element.end_time));
                    rest_end = element.end_time;
                }
                _ => {}
            }
        }
        DutyShape {
            start: self.start_time(),
            end: self.end_time(),
            paid: self.paid,
            breaks,
            long_idle,
            max_steering,
        }
    }

    pub fn violations(&self, rules: &CrewRules) -> Vec<Violation> {
        crew_rules::evaluate(self.duty_type, &self.shape(), rules)
    }
}

impl fmt::Display for CrewDuty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} duty [{} - {}] paid {} cost {:.2}, blocks: {}",
            self.duty_type,
            self.start_time(),
            self.end_time(),
            self.paid,
            self.cost,
            self.blocks.iter().join(" ")
        )
    }
}

/// Coefficients of a duty of the given type and paid duration in the aggregate rows.
pub fn aggregate_coefficients(
    duty_type: DutyType,
    paid: Duration,
    rules: &CrewRules,
) -> AggregateCoefficients {
    let indicator = |b: bool| if b { 1.0 } else { 0.0 };
    AggregateCoefficients {
        average_length: paid.in_hours() / rules.target_duty_length.in_hours() - 1.0,
        long: rules.max_long_fraction - indicator(paid > rules.long_duty_length),
        broken: rules.max_broken_fraction - indicator(duty_type == DutyType::Broken),
        between: rules.max_between_fraction - indicator(duty_type == DutyType::Between),
    }
}

/// Fixed cost of the duty type plus the hourly wage on the paid duration.
pub fn duty_cost(duty_type: DutyType, paid: Duration, rules: &CrewRules) -> Cost {
    let fixed = match duty_type {
        DutyType::Single => rules.single_shift_cost,
        DutyType::Broken => rules.shift_cost + rules.broken_shift_cost,
        _ => rules.shift_cost,
    };
    fixed + rules.hourly_cost * paid.in_hours()
}
