//! Software stand-ins for the pad rig and the rocket, so a whole launch
//! cycle can run on a laptop.
//!
//! Everything here is single-threaded: the pad sequencer is shared with
//! the rocket's transport through `Rc<RefCell<..>>`, and the caller must
//! not hold a borrow of it while driving the rocket.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use splash_link::{Endpoint, Response, Transport, TransportError};
use splash_pad::{api, Distributor, EventSink, LaunchpadSequencer, PadActuators, PulseCounter};
use splash_rocket::{Network, RocketActuators, RocketError, Sensors};
use tracing::{debug, info, warn};

const G: f32 = 9.81;
const SEA_LEVEL_BAR: f32 = 1.01325;
/// Terminal velocity under the parachute.
const DESCENT_MS: f32 = 4.5;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub seed: u64,
    pub volume_l: f32,
    pub pressure_bar: f32,
    pub step_ms: u64,
    pub max_duration_ms: u64,
    /// Time the scripted operator waits between arming and launch.
    pub countdown_ms: u64,
    /// Sleep between steps instead of running as fast as possible.
    pub realtime: bool,
    pub fill_rate_lps: f32,
    pub compressor_bar_per_s: f32,
    pub ground_altitude_m: f32,
    /// Probability that a single rocket request is lost.
    pub link_drop_rate: f64,
    /// Probability that a post-flight network join fails.
    pub join_failure_rate: f64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            seed: 7,
            volume_l: 0.5,
            pressure_bar: 6.0,
            step_ms: 10,
            max_duration_ms: 180_000,
            countdown_ms: 3000,
            realtime: false,
            fill_rate_lps: 0.2,
            compressor_bar_per_s: 0.5,
            ground_altitude_m: 250.0,
            link_drop_rate: 0.05,
            join_failure_rate: 0.3,
        }
    }
}

/// Last commanded position of each pad actuator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RigActuators {
    pub valve_open: bool,
    pub distributor: Option<Distributor>,
    pub lock_open: bool,
}

impl PadActuators for RigActuators {
    fn set_valve(&mut self, open: bool) {
        debug!("rig: valve {}", if open { "open" } else { "closed" });
        self.valve_open = open;
    }

    fn set_distributor(&mut self, position: Distributor) {
        debug!("rig: distributor {:?}", position);
        self.distributor = Some(position);
    }

    fn set_lock(&mut self, open: bool) {
        debug!("rig: lock {}", if open { "released" } else { "engaged" });
        self.lock_open = open;
    }
}

/// State of the bottle at the moment the lock let go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Liftoff {
    pub water_l: f32,
    pub pressure_bar: f32,
}

/// Water line, compressor and flow meter.
#[derive(Debug)]
pub struct PadRig {
    water_l: f32,
    pressure_bar: f32,
    pulse_residue: f32,
    liters_per_pulse: f32,
    fill_rate_lps: f32,
    compressor_bar_per_s: f32,
    on_pad: bool,
    counter: PulseCounter,
    rng: StdRng,
}

impl PadRig {
    pub fn new(cfg: &SimCfg, liters_per_pulse: f32) -> Self {
        Self {
            water_l: 0.0,
            pressure_bar: SEA_LEVEL_BAR,
            pulse_residue: 0.0,
            liters_per_pulse,
            fill_rate_lps: cfg.fill_rate_lps,
            compressor_bar_per_s: cfg.compressor_bar_per_s,
            on_pad: true,
            counter: PulseCounter::new(),
            rng: StdRng::seed_from_u64(cfg.seed),
        }
    }

    /// Advance the plumbing by `dt_ms` under the given actuator positions.
    /// Returns the bottle state when the rocket leaves the pad.
    pub fn step(&mut self, dt_ms: u64, act: &RigActuators) -> Option<Liftoff> {
        let dt = dt_ms as f32 / 1000.0;

        if act.valve_open {
            self.on_pad = true;
            let dv = self.fill_rate_lps * dt;
            self.water_l += dv;
            let pulses = self.pulse_residue + dv / self.liters_per_pulse;
            let whole = pulses.floor();
            self.pulse_residue = pulses - whole;
            self.counter.record_pulses(whole as u32);
        }

        match act.distributor {
            Some(Distributor::Compressor) if self.on_pad => self.pressure_bar += self.compressor_bar_per_s * dt,
            Some(Distributor::Locked) => {}
            _ => self.pressure_bar += (SEA_LEVEL_BAR - self.pressure_bar) * (2.0 * dt).min(1.0),
        }

        if act.lock_open && self.on_pad {
            self.on_pad = false;
            let liftoff = Liftoff { water_l: self.water_l, pressure_bar: self.pressure_bar };
            self.water_l = 0.0;
            self.pressure_bar = SEA_LEVEL_BAR;
            return Some(liftoff);
        }
        None
    }

    /// Pulses counted since the last call.
    pub fn take_pulses(&self) -> u32 {
        self.counter.take()
    }

    pub fn read_pressure(&mut self) -> f32 {
        self.pressure_bar + self.rng.gen_range(-0.01..0.01)
    }

    pub fn water_l(&self) -> f32 {
        self.water_l
    }
}

/// One-dimensional ballistic flight with an instant-opening parachute.
#[derive(Debug, Default)]
pub struct FlightModel {
    altitude_m: f32,
    velocity_ms: f32,
    apex_m: f32,
    airborne: bool,
    flown: bool,
    chute_open: bool,
}

pub type World = Rc<RefCell<FlightModel>>;

impl FlightModel {
    pub fn shared() -> World {
        Rc::new(RefCell::new(FlightModel::default()))
    }

    /// Impulsive launch. Best efficiency with the bottle about a third full.
    pub fn launch(&mut self, liftoff: Liftoff, capacity_l: f32) {
        let fill = (liftoff.water_l / capacity_l.max(0.01)).clamp(0.0, 1.0);
        let efficiency = 1.0 - (fill - 0.33).abs();
        self.velocity_ms = 14.0 * (liftoff.pressure_bar - SEA_LEVEL_BAR).max(0.0).sqrt() * efficiency;
        self.airborne = true;
        self.flown = true;
        info!(
            "sim: liftoff with {:.2} L at {:.2} bar, {:.1} m/s",
            liftoff.water_l, liftoff.pressure_bar, self.velocity_ms
        );
    }

    pub fn step(&mut self, dt_ms: u64) {
        if !self.airborne {
            return;
        }
        let dt = dt_ms as f32 / 1000.0;
        self.velocity_ms -= G * dt;
        if self.chute_open {
            self.velocity_ms = self.velocity_ms.max(-DESCENT_MS);
        }
        self.altitude_m += self.velocity_ms * dt;
        self.apex_m = self.apex_m.max(self.altitude_m);
        if self.altitude_m <= 0.0 && self.velocity_ms < 0.0 {
            self.altitude_m = 0.0;
            self.velocity_ms = 0.0;
            self.airborne = false;
            info!("sim: touchdown, apex {:.1} m", self.apex_m);
        }
    }

    pub fn altitude_m(&self) -> f32 {
        self.altitude_m
    }

    pub fn apex_m(&self) -> f32 {
        self.apex_m
    }

    pub fn is_airborne(&self) -> bool {
        self.airborne
    }

    /// Vertical proper acceleration: zero in free flight, 1 g otherwise.
    fn accel_z(&self) -> f32 {
        let terminal = self.chute_open && self.velocity_ms <= -DESCENT_MS;
        if self.airborne && !terminal {
            0.0
        } else {
            G
        }
    }
}

pub struct SimSensors {
    world: World,
    ground_m: f32,
    rng: StdRng,
}

impl SimSensors {
    pub fn new(world: World, cfg: &SimCfg) -> Self {
        Self { world, ground_m: cfg.ground_altitude_m, rng: StdRng::seed_from_u64(cfg.seed.wrapping_add(1)) }
    }

    fn noise(&mut self, amplitude: f32) -> f32 {
        self.rng.gen_range(-amplitude..amplitude)
    }

    fn altitude_asl(&self) -> f32 {
        self.ground_m + self.world.borrow().altitude_m()
    }
}

impl Sensors for SimSensors {
    fn init(&mut self) -> Result<(), RocketError> {
        Ok(())
    }

    fn read_pressure(&mut self) -> f32 {
        SEA_LEVEL_BAR * (1.0 - 2.25577e-5 * self.altitude_asl()).powf(5.25588)
    }

    fn read_altitude(&mut self) -> f32 {
        self.altitude_asl() + self.noise(0.05)
    }

    fn read_temperature(&mut self) -> f32 {
        18.0 - 0.0065 * self.altitude_asl() + self.noise(0.1)
    }

    fn read_acceleration(&mut self) -> [f32; 3] {
        let z = self.world.borrow().accel_z();
        [self.noise(0.05), self.noise(0.05), z + self.noise(0.05)]
    }

    fn read_gyro(&mut self) -> [f32; 3] {
        [self.noise(0.01), self.noise(0.01), self.noise(0.01)]
    }
}

/// The parachute hatch servo drives the flight model directly.
pub struct SimHatch {
    world: World,
}

impl SimHatch {
    pub fn new(world: World) -> Self {
        Self { world }
    }
}

impl RocketActuators for SimHatch {
    fn set_parachute(&mut self, deployed: bool) {
        debug!("sim: hatch {}", if deployed { "open" } else { "closed" });
        self.world.borrow_mut().chute_open = deployed;
    }

    fn sound_fault(&mut self) {
        warn!("sim: rocket fault buzzer");
    }
}

/// Out of range while airborne; flaky joins after the flight.
pub struct SimNetwork {
    world: World,
    joined: bool,
    failure_rate: f64,
    rng: StdRng,
}

impl SimNetwork {
    pub fn new(world: World, cfg: &SimCfg) -> Self {
        Self {
            world,
            joined: false,
            failure_rate: cfg.join_failure_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(cfg.seed.wrapping_add(2)),
        }
    }
}

impl Network for SimNetwork {
    fn join(&mut self) -> Result<(), RocketError> {
        let (airborne, flown) = {
            let world = self.world.borrow();
            (world.is_airborne(), world.flown)
        };
        if airborne || (flown && self.rng.gen_bool(self.failure_rate)) {
            self.joined = false;
            return Err(RocketError::NetworkUnavailable);
        }
        self.joined = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.joined && !self.world.borrow().is_airborne()
    }
}

pub type SharedPad<A, S> = Rc<RefCell<LaunchpadSequencer<A, S>>>;

/// Rocket-side transport that serves requests straight from the shared pad
/// sequencer, dropping a fraction of them.
pub struct Loopback<A, S> {
    pad: SharedPad<A, S>,
    drop_rate: f64,
    rng: StdRng,
    pub dropped: u32,
}

impl<A, S> Loopback<A, S> {
    pub fn new(pad: SharedPad<A, S>, cfg: &SimCfg) -> Self {
        Self {
            pad,
            drop_rate: cfg.link_drop_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(cfg.seed.wrapping_add(3)),
            dropped: 0,
        }
    }
}

impl<A: PadActuators, S: EventSink> Transport for Loopback<A, S> {
    fn send_command(&mut self, endpoint: Endpoint, payload: &[u8]) -> Result<Response, TransportError> {
        if self.rng.gen_bool(self.drop_rate) {
            self.dropped += 1;
            return Err(TransportError::Unreachable(format!("{} lost", endpoint.path())));
        }
        let mut pad = self.pad.try_borrow_mut().map_err(|_| TransportError::Unreachable("pad busy".into()))?;
        Ok(api::handle_rocket_request(&mut *pad, endpoint, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_valve_produces_flow_pulses() {
        let cfg = SimCfg::default();
        let lpp = 1.0 / 450.0;
        let mut rig = PadRig::new(&cfg, lpp);
        let act = RigActuators { valve_open: true, ..Default::default() };
        for _ in 0..100 {
            rig.step(10, &act);
        }
        // 0.2 L over one second
        let measured = rig.take_pulses() as f32 * lpp;
        assert!((measured - 0.2).abs() < 0.005, "measured {}", measured);
        assert_eq!(rig.take_pulses(), 0);
    }

    #[test]
    fn locked_distributor_holds_pressure() {
        let mut rig = PadRig::new(&SimCfg::default(), 1.0 / 450.0);
        let mut act = RigActuators { distributor: Some(Distributor::Compressor), ..Default::default() };
        for _ in 0..200 {
            rig.step(10, &act);
        }
        let charged = rig.pressure_bar;
        assert!(charged > 1.9);
        act.distributor = Some(Distributor::Locked);
        rig.step(1000, &act);
        assert_eq!(rig.pressure_bar, charged);
        act.distributor = Some(Distributor::Atmosphere);
        for _ in 0..400 {
            rig.step(10, &act);
        }
        assert!((rig.pressure_bar - SEA_LEVEL_BAR).abs() < 0.01);
    }

    #[test]
    fn lock_release_launches_once() {
        let mut rig = PadRig::new(&SimCfg::default(), 1.0 / 450.0);
        let act = RigActuators { lock_open: true, ..Default::default() };
        assert!(rig.step(10, &act).is_some());
        assert!(rig.step(10, &act).is_none());
    }

    #[test]
    fn flight_goes_up_and_comes_back() {
        let world = FlightModel::shared();
        world.borrow_mut().launch(Liftoff { water_l: 0.5, pressure_bar: 6.0 }, 1.5);
        let mut steps = 0;
        while world.borrow().is_airborne() {
            world.borrow_mut().step(10);
            steps += 1;
            assert!(steps < 10_000);
        }
        let apex = world.borrow().apex_m();
        assert!(apex > 30.0 && apex < 60.0, "apex {}", apex);
        assert_eq!(world.borrow().altitude_m(), 0.0);
    }

    #[test]
    fn network_is_down_in_flight() {
        let world = FlightModel::shared();
        let cfg = SimCfg { join_failure_rate: 0.0, ..SimCfg::default() };
        let mut net = SimNetwork::new(world.clone(), &cfg);
        net.join().unwrap();
        assert!(net.is_connected());
        world.borrow_mut().launch(Liftoff { water_l: 0.5, pressure_bar: 3.0 }, 1.5);
        world.borrow_mut().step(10);
        assert!(!net.is_connected());
        assert_eq!(net.join(), Err(RocketError::NetworkUnavailable));
    }
}
