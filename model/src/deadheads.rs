use time::Duration;

use crate::base_types::{LocationIdx, Meter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadheadTemplate {
    pub from: LocationIdx,
    pub to: LocationIdx,
    pub duration: Duration,
    pub distance: Meter,
    pub frequency_change_only: bool,
}

/// Dense location x location lookup of deadhead templates.
/// Missing reverse directions are filled with the symmetric template and every location gets a
/// zero-length self loop unless one was given.
#[derive(Debug, Clone)]
pub struct Deadheads {
    table: Vec<Vec<Option<DeadheadTemplate>>>,
}

// static functions
impl Deadheads {
    pub fn new(location_count: usize, templates: Vec<DeadheadTemplate>) -> Deadheads {
        let mut table = vec![vec![None; location_count]; location_count];
        for template in templates.iter() {
            table[template.from.0][template.to.0] = Some(*template);
        }
        for template in templates.iter() {
            let reverse = &mut table[template.to.0][template.from.0];
            if reverse.is_none() {
                *reverse = Some(DeadheadTemplate {
                    from: template.to,
                    to: template.from,
                    ..*template
                });
            }
        }
        for (i, row) in table.iter_mut().enumerate() {
            if row[i].is_none() {
                row[i] = Some(DeadheadTemplate {
                    from: LocationIdx(i),
                    to: LocationIdx(i),
                    duration: Duration::ZERO,
                    distance: 0,
                    frequency_change_only: false,
                });
            }
        }
        Deadheads { table }
    }
}

// methods
impl Deadheads {
    pub fn get(&self, from: LocationIdx, to: LocationIdx) -> Option<&DeadheadTemplate> {
        self.table
            .get(from.0)
            .and_then(|row| row.get(to.0))
            .and_then(|t| t.as_ref())
    }
}
