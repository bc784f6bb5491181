
use model::base_types::{Cost, LocationIdx, Meter, NodeIdx, Soc, TripIdx};
use model::config::Config;
use model::deadheads::DeadheadTemplate;
use model::descriptor::DescriptorHalf;
use model::instance::Instance;
use model::network::NetworkArc;
use solution::dual_prices::DualPrices;
use solution::vehicle_task::{overnight_recharge_cost, VehicleElement, VehicleElementKind};
use time::{Duration, Time};

const SOC_EPSILON: Soc = 1e-9;

/// Hard mode prunes on the first violated resource (labeling), soft mode turns violations into
/// penalties (local search).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdleSide {
    Source,
    Target,
}

/// How the slack of an arc is spent: idling (or charging) at one of its endpoints, or driving to
/// a charger in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArcChoice {
    pub idle_at: IdleSide,
    pub charge: bool,
    pub detour: Option<LocationIdx>,
}

impl ArcChoice {
    pub const DIRECT: ArcChoice = ArcChoice {
        idle_at: IdleSide::Source,
        charge: false,
        detour: None,
    };

    pub fn charge_at(idle_at: IdleSide) -> ArcChoice {
        ArcChoice {
            idle_at,
            charge: true,
            detour: None,
        }
    }

    pub fn detour(charger: LocationIdx) -> ArcChoice {
        ArcChoice {
            idle_at: IdleSide::Source,
            charge: true,
            detour: Some(charger),
        }
    }
}

/// Resources of a partial vehicle path. `cost` is reduced by every dual collected so far.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionState {
    pub soc: Soc,
    pub lowest_soc: Soc,
    pub last_handover: Time,
    pub last_hub: Time,
    pub cost: Cost,
    pub penalty: Cost,
    /// Start of the block that is currently driven, None before the pull-out and after the
    /// pull-in.
    pub half: Option<DescriptorHalf>,
}

impl ExpansionState {
    pub fn initial(instance: &Instance) -> ExpansionState {
        let soc = instance.vehicle_type().start_soc;
        ExpansionState {
            soc,
            lowest_soc: soc,
            last_handover: Time::from_seconds(0),
            last_hub: Time::from_seconds(0),
            cost: 0.0,
            penalty: 0.0,
            half: None,
        }
    }
}

pub struct ExpansionContext<'a> {
    pub instance: &'a Instance,
    pub config: &'a Config,
    pub duals: &'a DualPrices,
    pub mode: Mode,
}

/// The two legs and the charging time of a detour to a charger between two trips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetourWindow {
    pub first: DeadheadTemplate,
    pub second: DeadheadTemplate,
    pub charge_time: Duration,
}

/// Extends `state` by the arc and, for arcs into a trip, by the trip itself. Returns None if the
/// choice does not fit the arc or, in hard mode, if a resource is violated. Elements are only
/// built when a buffer is given; the resulting state is the same either way.
pub fn expand(
    ctx: &ExpansionContext,
    state: &ExpansionState,
    arc: &NetworkArc,
    choice: ArcChoice,
    elements: Option<&mut Vec<VehicleElement>>,
) -> Option<ExpansionState> {
    let mut walk = Walk {
        ctx,
        state: state.clone(),
        elements,
    };
    match (arc.from, arc.to) {
        (NodeIdx::DepotStart, NodeIdx::Trip(trip)) => {
            walk.pull_out(arc)?;
            walk.serve(trip)?;
        }
        (NodeIdx::Trip(_), NodeIdx::DepotEnd) => walk.pull_in(arc)?,
        (NodeIdx::Trip(_), NodeIdx::Trip(trip)) => {
            walk.connect(arc, choice)?;
            walk.serve(trip)?;
        }
        _ => return None,
    }
    Some(walk.state)
}

/// Expands a complete path from the initial state and collects its elements.
pub fn replay<'n>(
    ctx: &ExpansionContext,
    steps: impl IntoIterator<Item = (&'n NetworkArc, ArcChoice)>,
) -> Option<(ExpansionState, Vec<VehicleElement>)> {
    let mut elements = Vec::new();
    let mut state = ExpansionState::initial(ctx.instance);
    for (arc, choice) in steps {
        state = expand(ctx, &state, arc, choice, Some(&mut elements))?;
    }
    Some((state, elements))
}

/// Every way of traversing the arc the labeling considers. Depot arcs have no slack.
pub fn arc_choices(instance: &Instance, config: &Config, arc: &NetworkArc) -> Vec<ArcChoice> {
    if arc.is_depot_arc() {
        return vec![ArcChoice::DIRECT];
    }
    let (source, target) = (arc.deadhead.from, arc.deadhead.to);
    let mut choices = vec![ArcChoice::DIRECT];
    if arc.idle_time.is_positive() && source != target {
        choices.push(ArcChoice {
            idle_at: IdleSide::Target,
            ..ArcChoice::DIRECT
        });
    }
    let chargeable = |location: LocationIdx| {
        instance.location(location).can_charge()
            && arc.idle_time >= config.vehicle.min_charge_time
    };
    if chargeable(source) {
        choices.push(ArcChoice::charge_at(IdleSide::Source));
    }
    if source != target && chargeable(target) {
        choices.push(ArcChoice::charge_at(IdleSide::Target));
    }
    for charger in instance.locations().chargers() {
        if charger.idx != source
            && charger.idx != target
            && detour_window(instance, config, arc, charger.idx).is_some()
        {
            choices.push(ArcChoice::detour(charger.idx));
        }
    }
    choices
}

/// Legs of a charging detour between two trips, None if a leg is missing, a
/// frequency-change-only leg is not allowed around the trips or too little time is left for
/// charging.
pub fn detour_window(
    instance: &Instance,
    config: &Config,
    arc: &NetworkArc,
    charger: LocationIdx,
) -> Option<DetourWindow> {
    let (source, target) = (arc.from.trip()?, arc.to.trip()?);
    instance.location(charger).charging_curve.as_ref()?;
    let first = *instance.deadhead(arc.deadhead.from, charger)?;
    let second = *instance.deadhead(charger, arc.deadhead.to)?;
    if first.frequency_change_only && !instance.trip(source).frequency_change.allows_departure() {
        return None;
    }
    if second.frequency_change_only && !instance.trip(target).frequency_change.allows_arrival() {
        return None;
    }
    let charge_time = arc.span() - first.duration - second.duration;
    if charge_time < config.vehicle.min_charge_time {
        return None;
    }
    Some(DetourWindow {
        first,
        second,
        charge_time,
    })
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// Walk /////////////////////////////////
/////////////////////////////////////////////////////////////////////

struct Walk<'c, 'e> {
    ctx: &'c ExpansionContext<'c>,
    state: ExpansionState,
    elements: Option<&'e mut Vec<VehicleElement>>,
}

impl<'c, 'e> Walk<'c, 'e> {
    fn pull_out(&mut self, arc: &NetworkArc) -> Option<()> {
        let depot = self.ctx.instance.depot();
        self.state.cost += self.ctx.config.vehicle.pullout_cost + self.ctx.duals.max_vehicles;
        self.state.half = Some(DescriptorHalf::new(depot, arc.start_time));
        self.state.last_handover = arc.start_time;
        self.state.last_hub = arc.start_time;
        self.deadhead(&arc.deadhead, arc.start_time, arc.end_time)
    }

    fn pull_in(&mut self, arc: &NetworkArc) -> Option<()> {
        let instance = self.ctx.instance;
        self.deadhead(&arc.deadhead, arc.start_time, arc.end_time)?;
        self.close_block(instance.depot(), arc.end_time)?;
        self.check_hub(arc.end_time, true)?;
        self.state.cost += overnight_recharge_cost(self.state.soc, instance, self.ctx.config);
        if self.ctx.mode == Mode::Soft {
            let deficit = instance.vehicle_type().min_soc - self.state.lowest_soc;
            if deficit > SOC_EPSILON {
                let penalties = &self.ctx.config.vehicle_local_search.penalties;
                self.state.penalty += penalties.soc_fixed + penalties.soc_per_percent * deficit;
            }
        }
        Some(())
    }

    fn connect(&mut self, arc: &NetworkArc, choice: ArcChoice) -> Option<()> {
        let dh = arc.deadhead;
        if let Some(charger) = choice.detour {
            let window = detour_window(self.ctx.instance, self.ctx.config, arc, charger)?;
            let charge_start = arc.start_time + window.first.duration;
            let charge_end = arc.end_time - window.second.duration;
            self.deadhead(&window.first, arc.start_time, charge_start)?;
            self.stay(charger, charge_start, charge_end, true)?;
            return self.deadhead(&window.second, charge_end, arc.end_time);
        }
        match choice.idle_at {
            IdleSide::Source => {
                let departure = arc.start_time + arc.idle_time;
                self.stay(dh.from, arc.start_time, departure, choice.charge)?;
                self.deadhead(&dh, departure, arc.end_time)
            }
            IdleSide::Target => {
                let arrival = arc.start_time + dh.duration;
                self.deadhead(&dh, arc.start_time, arrival)?;
                self.stay(dh.to, arrival, arc.end_time, choice.charge)
            }
        }
    }

    fn serve(&mut self, trip_idx: TripIdx) -> Option<()> {
        let trip = self.ctx.instance.trip(trip_idx);
        self.drive(
            VehicleElementKind::Trip(trip_idx),
            (trip.from, trip.to),
            (trip.start_time, trip.end_time),
            trip.distance,
        )?;
        self.state.cost -= self.ctx.duals.trip(trip_idx);
        self.check_steering(trip.end_time, false)?;
        self.check_hub(trip.end_time, false)
    }

    fn deadhead(&mut self, dh: &DeadheadTemplate, start: Time, end: Time) -> Option<()> {
        self.drive(
            VehicleElementKind::Deadhead {
                distance: dh.distance,
            },
            (dh.from, dh.to),
            (start, end),
            dh.distance,
        )
    }

    fn drive(
        &mut self,
        kind: VehicleElementKind,
        locations: (LocationIdx, LocationIdx),
        times: (Time, Time),
        distance: Meter,
    ) -> Option<()> {
        let drain = self.ctx.instance.vehicle_type().drive_consumption(distance);
        let cost = distance as f64 * self.ctx.config.vehicle.cost_per_meter;
        self.push(kind, locations, times, -drain, cost)
    }

    /// Idles or charges at the location. A stationary period long enough for a crew change ends
    /// the current block and starts the next one.
    fn stay(&mut self, location: LocationIdx, start: Time, end: Time, charge: bool) -> Option<()> {
        let instance = self.ctx.instance;
        let vehicle_type = instance.vehicle_type();
        let loc = instance.location(location);
        let duration = end - start;
        if charge {
            let curve = loc.charging_curve.as_ref()?;
            if duration < self.ctx.config.vehicle.min_charge_time {
                return None;
            }
            let result = curve.max_charge_gained(self.state.soc, duration, vehicle_type.max_soc);
            self.push(
                VehicleElementKind::Charge {
                    soc_gained: result.soc_gained,
                },
                (location, location),
                (start, end),
                result.soc_gained,
                result.cost,
            )?;
        } else if duration.is_positive() {
            let drain = if loc.free_idle() {
                0.0
            } else {
                vehicle_type.idle_consumption(duration)
            };
            let cost = self.ctx.config.vehicle.idle_cost_per_second * duration.in_sec() as f64;
            self.push(
                VehicleElementKind::Idle,
                (location, location),
                (start, end),
                -drain,
                cost,
            )?;
        } else {
            return Some(());
        }

        if loc.allows_handover(duration) {
            self.close_block(location, start)?;
            if loc.crew_base {
                self.check_hub(start, true)?;
                self.state.last_hub = end;
            }
            self.state.half = Some(DescriptorHalf::new(location, end));
            self.state.last_handover = end;
        }
        Some(())
    }

    fn push(
        &mut self,
        kind: VehicleElementKind,
        (from, to): (LocationIdx, LocationIdx),
        (start_time, end_time): (Time, Time),
        soc_change: Soc,
        cost: Cost,
    ) -> Option<()> {
        let start_soc = self.state.soc;
        let end_soc = start_soc + soc_change;
        if let Some(elements) = self.elements.as_mut() {
            elements.push(VehicleElement {
                kind,
                from,
                to,
                start_time,
                end_time,
                start_soc,
                end_soc,
                cost,
            });
        }
        self.state.soc = end_soc;
        self.state.lowest_soc = self.state.lowest_soc.min(end_soc);
        self.state.cost += cost;
        if self.ctx.mode == Mode::Hard
            && end_soc < self.ctx.instance.vehicle_type().min_soc - SOC_EPSILON
        {
            return None;
        }
        Some(())
    }

    fn close_block(&mut self, location: LocationIdx, time: Time) -> Option<()> {
        let half = self.state.half.take()?;
        self.check_steering(time, true)?;
        let descriptor = half.close(DescriptorHalf::new(location, time));
        self.state.cost -= self.ctx.duals.block(&descriptor);
        Some(())
    }

    /// Hard mode prunes as soon as the limit is exceeded, soft mode charges the overtime once,
    /// when the period is closed.
    fn check_steering(&mut self, now: Time, closing: bool) -> Option<()> {
        let config = self.ctx.config;
        let penalties = &config.vehicle_local_search.penalties;
        let over = (now - self.state.last_handover) - config.vehicle.max_steering_time;
        self.check_overtime(
            over,
            closing,
            penalties.steering_fixed,
            penalties.steering_per_second,
        )
    }

    fn check_hub(&mut self, now: Time, closing: bool) -> Option<()> {
        let config = self.ctx.config;
        let penalties = &config.vehicle_local_search.penalties;
        let over = (now - self.state.last_hub) - config.vehicle.max_no_hub_time;
        self.check_overtime(over, closing, penalties.hub_fixed, penalties.hub_per_second)
    }

    fn check_overtime(
        &mut self,
        over: Duration,
        closing: bool,
        fixed: Cost,
        per_second: Cost,
    ) -> Option<()> {
        if !over.is_positive() {
            return Some(());
        }
        match self.ctx.mode {
            Mode::Hard => None,
            Mode::Soft => {
                if closing {
                    self.state.penalty += fixed + per_second * over.in_sec() as f64;
                }
                Some(())
            }
        }
    }
}
