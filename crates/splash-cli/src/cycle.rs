//! One scripted launch cycle against the simulated rig and rocket:
//! close the fairing, fill, count down, launch, wait for the flight data.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{bail, Result};
use splash_link::Link;
use splash_pad::{FlightArchive, LaunchpadSequencer, PadConfig};
use splash_proto::FairingPosition::{Closed, Open};
use splash_proto::{FlightRecord, LaunchpadState, RocketState};
use splash_rocket::{Readiness, RocketConfig, RocketSequencer};
use tracing::{info, warn};

use crate::console::TraceSink;
use crate::sim::{FlightModel, Loopback, PadRig, RigActuators, SimCfg, SimHatch, SimNetwork, SimSensors, World};

pub type SimPad = LaunchpadSequencer<RigActuators, TraceSink>;
type SimRocket = RocketSequencer<SimSensors, SimHatch, SimNetwork, Loopback<RigActuators, TraceSink>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    CloseFairing,
    Fill,
    /// Armed since the given time; launch once the countdown has run.
    Countdown(Option<u64>),
    Recover,
    Done,
}

#[derive(Debug)]
pub struct CycleReport {
    pub pad_states: Vec<LaunchpadState>,
    pub rocket_states: Vec<RocketState>,
    pub flight: Option<FlightRecord>,
    pub apex_m: f32,
    pub elapsed_ms: u64,
    pub dropped_requests: u32,
}

pub struct Cycle {
    pad: Rc<RefCell<SimPad>>,
    rocket: SimRocket,
    rig: PadRig,
    world: World,
    sim: SimCfg,
    now_ms: u64,
    phase: Phase,
    rocket_states: Vec<RocketState>,
}

impl Cycle {
    /// Boots both sides; fails if the rocket cannot reach the pad.
    pub fn new(
        pad_cfg: &PadConfig,
        rocket_cfg: &RocketConfig,
        sim: &SimCfg,
        archive: Box<dyn FlightArchive>,
        epoch_offset_ms: u64,
    ) -> Result<Self> {
        let pad = LaunchpadSequencer::new(pad_cfg.clone(), RigActuators::default(), TraceSink::default(), archive)
            .with_epoch_offset(epoch_offset_ms);
        let pad = Rc::new(RefCell::new(pad));

        let world = FlightModel::shared();
        let link = Link::new(Loopback::new(pad.clone(), sim), rocket_cfg.retry).with_sleep(|_| {});
        let mut rocket = RocketSequencer::new(
            rocket_cfg.clone(),
            SimSensors::new(world.clone(), sim),
            SimHatch::new(world.clone()),
            SimNetwork::new(world.clone(), sim),
            link,
        );
        if rocket.initialize(0) == Readiness::RestartRequired {
            bail!("sim: rocket failed to initialize");
        }

        Ok(Self {
            rig: PadRig::new(sim, pad_cfg.liters_per_pulse),
            rocket_states: vec![rocket.state()],
            pad,
            rocket,
            world,
            sim: sim.clone(),
            now_ms: 0,
            phase: Phase::CloseFairing,
        })
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Advance both sides by one step. Returns `true` once the flight has
    /// been archived and the rocket is back in idle.
    pub fn step(&mut self) -> Result<bool> {
        let dt = self.sim.step_ms.max(1);
        self.now_ms += dt;

        let actuators = *self.pad.borrow().actuators();
        if let Some(liftoff) = self.rig.step(dt, &actuators) {
            let capacity = self.pad.borrow().rocket_volume();
            self.world.borrow_mut().launch(liftoff, capacity);
        }
        self.world.borrow_mut().step(dt);

        let pressure = self.rig.read_pressure();
        let pulses = self.rig.take_pulses();
        // borrow released before the rocket talks to the pad
        let events = {
            let mut pad = self.pad.borrow_mut();
            pad.tick(dt, pressure, pulses);
            pad.drain_rocket_events()
        };
        for event in events {
            if let Err(e) = self.rocket.on_launchpad_event(event) {
                warn!("sim: rocket ignored {:?}: {}", event, e);
            }
        }

        self.rocket.poll(self.now_ms);
        let state = self.rocket.state();
        if self.rocket_states.last() != Some(&state) {
            self.rocket_states.push(state);
        }
        if state == RocketState::Error {
            bail!("sim: rocket entered {} at {} ms", state, self.now_ms);
        }

        self.operate()?;

        if self.phase != Phase::Done && self.now_ms >= self.sim.max_duration_ms {
            let pad = self.pad.borrow().state();
            bail!("sim: no complete cycle after {} ms (pad {}, rocket {})", self.now_ms, pad, state);
        }
        Ok(self.phase == Phase::Done)
    }

    /// The scripted operator.
    fn operate(&mut self) -> Result<()> {
        let pad_state = self.pad.borrow().state();
        let rocket_state = self.rocket.state();

        match self.phase {
            Phase::CloseFairing if pad_state == LaunchpadState::Idle => {
                self.pad.borrow_mut().close_fairing()?;
                self.phase = Phase::Fill;
            }
            Phase::Fill if rocket_state == RocketState::Idling(Closed) => {
                info!("sim: filling {} L to {} bar", self.sim.volume_l, self.sim.pressure_bar);
                self.pad.borrow_mut().request_start_filling(self.sim.volume_l, self.sim.pressure_bar)?;
                self.phase = Phase::Countdown(None);
            }
            Phase::Countdown(None) if pad_state == LaunchpadState::ReadyForLaunch => {
                if rocket_state == RocketState::WaitingForLaunch {
                    info!("sim: armed, countdown {} ms", self.sim.countdown_ms);
                    self.phase = Phase::Countdown(Some(self.now_ms));
                }
            }
            Phase::Countdown(Some(armed)) if self.now_ms.saturating_sub(armed) >= self.sim.countdown_ms => {
                self.pad.borrow_mut().request_launch()?;
                self.phase = Phase::Recover;
            }
            Phase::Recover
                if pad_state == LaunchpadState::ReceivedData && rocket_state == RocketState::Idling(Open) =>
            {
                info!("sim: cycle complete after {} ms", self.now_ms);
                self.phase = Phase::Done;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn report(&self) -> Result<CycleReport> {
        let pad = self.pad.borrow();
        let flight = match pad.last_flight() {
            Some(id) => Some(pad.get_flight(id)?),
            None => None,
        };
        Ok(CycleReport {
            pad_states: pad.sink().states.clone(),
            rocket_states: self.rocket_states.clone(),
            flight,
            apex_m: self.world.borrow().apex_m(),
            elapsed_ms: self.now_ms,
            dropped_requests: self.rocket.link().transport().dropped,
        })
    }

    /// Back to a safe idle on both sides, e.g. before exiting mid-run.
    pub fn abort(&mut self) -> Result<()> {
        let events = {
            let mut pad = self.pad.borrow_mut();
            pad.request_abort()?;
            pad.drain_rocket_events()
        };
        for event in events {
            if let Err(e) = self.rocket.on_launchpad_event(event) {
                warn!("sim: rocket ignored {:?}: {}", event, e);
            }
        }
        Ok(())
    }
}
