
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::base_types::{Cost, Kwh, Soc};

const EPSILON: f64 = 1e-6; // absorbs float noise before rounding up to whole seconds

/// One linear segment of a charging curve: between `min_soc` and `max_soc` the battery gains
/// `rate` percent per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePiece {
    pub min_soc: Soc,
    pub max_soc: Soc,
    pub rate: f64,
}

/// Outcome of plugging in for a limited amount of time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeResult {
    pub soc_gained: Soc,
    pub time_used: Duration,
    pub cost: Cost,
}

impl ChargeResult {
    pub fn nothing() -> ChargeResult {
        ChargeResult {
            soc_gained: 0.0,
            time_used: Duration::ZERO,
            cost: 0.0,
        }
    }
}

/// Piecewise-linear charging behaviour of the active vehicle type at one charger.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingCurve {
    pieces: Vec<CurvePiece>,
    cost_per_percent: Cost,
}

// static functions
impl ChargingCurve {
    /// Builds the curve from `(soc, rate)` breakpoints: each breakpoint's rate holds until the
    /// next breakpoint, the last one until 100%.
    /// The first breakpoint has to start at 0%, socs have to increase strictly and rates have to
    /// be non-negative.
    pub fn new(
        breakpoints: &[(Soc, f64)],
        capacity: Kwh,
        kwh_cost: Cost,
    ) -> Result<ChargingCurve, String> {
        if breakpoints.is_empty() {
            return Err("charging curve needs at least one breakpoint".to_string());
        }
        if breakpoints[0].0 != 0.0 {
            return Err(format!(
                "charging curve has to start at 0%, starts at {}%",
                breakpoints[0].0
            ));
        }
        let mut pieces = Vec::with_capacity(breakpoints.len());
        for (i, &(soc, rate)) in breakpoints.iter().enumerate() {
            if rate < 0.0 {
                return Err(format!("negative charging rate {} at {}%", rate, soc));
            }
            let max_soc = match breakpoints.get(i + 1) {
                Some(&(next_soc, _)) => {
                    if next_soc <= soc {
                        return Err(format!(
                            "charging curve breakpoints not increasing: {}% after {}%",
                            next_soc, soc
                        ));
                    }
                    next_soc
                }
                None => 100.0,
            };
            if soc >= 100.0 {
                return Err(format!("breakpoint at {}% lies above full charge", soc));
            }
            pieces.push(CurvePiece {
                min_soc: soc,
                max_soc,
                rate,
            });
        }
        Ok(ChargingCurve {
            pieces,
            cost_per_percent: kwh_cost * capacity / 100.0,
        })
    }
}

// methods
impl ChargingCurve {
    pub fn pieces(&self) -> &[CurvePiece] {
        &self.pieces
    }

    pub fn cost_per_percent(&self) -> Cost {
        self.cost_per_percent
    }

    fn piece_at(&self, soc: Soc) -> Option<&CurvePiece> {
        self.pieces.iter().rev().find(|p| p.min_soc <= soc)
    }

    /// Charges from `start_soc` for at most `available` time without exceeding `soc_limit`.
    /// Time is consumed in whole seconds; a segment with rate zero ends the charge.
    pub fn max_charge_gained(
        &self,
        start_soc: Soc,
        available: Duration,
        soc_limit: Soc,
    ) -> ChargeResult {
        let limit = soc_limit.min(100.0);
        let mut soc = start_soc.max(0.0);
        let mut remaining = available.in_sec().max(0) as f64;
        let mut used = 0.0;

        while remaining > 0.0 && soc < limit {
            let piece = match self.piece_at(soc) {
                Some(p) if p.rate > 0.0 => *p,
                _ => break,
            };
            let segment_end = piece.max_soc.min(limit);
            let time_to_end = ((segment_end - soc) / piece.rate - EPSILON).ceil().max(1.0);
            let usable = time_to_end.min(remaining);
            if usable >= time_to_end {
                soc = segment_end;
            } else {
                soc = (soc + usable * piece.rate).min(segment_end);
            }
            remaining -= usable;
            used += usable;
        }

        let soc_gained = (soc - start_soc.max(0.0)).max(0.0);
        ChargeResult {
            soc_gained,
            time_used: Duration::from_seconds(used as i32),
            cost: soc_gained * self.cost_per_percent,
        }
    }

    /// Cost of recharging from `from` to `to` (zero if `to` is not above `from`).
    pub fn charge_costs(&self, from: Soc, to: Soc) -> Cost {
        (to - from).max(0.0) * self.cost_per_percent
    }

    /// Time needed to charge from `from` to `to`, None if the curve never gets there.
    pub fn time_to_charge(&self, from: Soc, to: Soc) -> Option<Duration> {
        let mut soc = from.max(0.0);
        let target = to.min(100.0);
        let mut seconds = 0.0;
        while soc < target {
            let piece = match self.piece_at(soc) {
                Some(p) if p.rate > 0.0 => *p,
                _ => return None,
            };
            let segment_end = piece.max_soc.min(target);
            seconds += (segment_end - soc) / piece.rate;
            soc = segment_end;
        }
        Some(Duration::from_seconds((seconds - EPSILON).ceil() as i32))
    }
}
