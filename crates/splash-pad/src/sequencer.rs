//! The launchpad state machine.
//!
//! One `LaunchpadSequencer` owns every piece of pad state: the active
//! `LaunchpadState`, the integrated water volume, the last pressure reading,
//! the log ring and the in-flight upload. It is driven from a single loop
//! that alternates command handling with one `tick` per iteration.

use std::collections::VecDeque;

use serde::Serialize;
use splash_proto::LaunchpadState::{self, *};
use splash_proto::{FlightRecord, LaunchParameters, LaunchpadEvent, LogLine, LogRing, PadEvent};
use tracing::{error, info, warn};

use crate::archive::FlightArchive;
use crate::error::PadError;
use crate::events::EventSink;
use crate::hardware::{Distributor, PadActuators};
use crate::rocket_link::{RocketLinkStatus, UploadSession};
use crate::transitions::{self, EntryAction};
use crate::PadConfig;

/// Absorbs f32 drift when integrating many small flow deltas.
pub const REACHED_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// Requested the state already active.
    NoChange(LaunchpadState),
    Changed { from: LaunchpadState, to: LaunchpadState },
}

impl StateChange {
    pub fn state(&self) -> LaunchpadState {
        match *self {
            StateChange::NoChange(s) => s,
            StateChange::Changed { to, .. } => to,
        }
    }
}

/// What one control-loop iteration observed and did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub state: LaunchpadState,
    pub water_volume: f32,
    pub pressure: f32,
    pub transition: Option<StateChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PadStatus {
    pub state: LaunchpadState,
    pub uptime_ms: u64,
    pub water_volume_l: f32,
    pub pressure_bar: f32,
    pub target: Option<LaunchParameters>,
    pub launch_timestamp: Option<u64>,
    pub transfer_progress: Option<f32>,
    pub last_flight: Option<u64>,
    pub rocket: RocketLinkStatus,
}

pub struct LaunchpadSequencer<A, S> {
    pub(crate) config: PadConfig,
    pub(crate) actuators: A,
    pub(crate) sink: S,
    pub(crate) archive: Box<dyn FlightArchive>,
    pub(crate) state: LaunchpadState,
    pub(crate) uptime_ms: u64,
    pub(crate) state_entered_ms: u64,
    pub(crate) epoch_offset_ms: u64,
    pub(crate) water_volume: f32,
    pub(crate) pressure: f32,
    pub(crate) target: Option<LaunchParameters>,
    pub(crate) launch_time_ms: Option<u64>,
    pub(crate) logs: LogRing,
    pub(crate) rocket: RocketLinkStatus,
    pub(crate) rocket_contact: bool,
    pub(crate) upload: Option<UploadSession>,
    /// Sample count of the flight archived on entering `ReceivedData`.
    pub(crate) archived_total: Option<usize>,
    pub(crate) last_flight: Option<u64>,
    pub(crate) outbox: VecDeque<LaunchpadEvent>,
}

impl<A: PadActuators, S: EventSink> LaunchpadSequencer<A, S> {
    /// Boots into `Idle` with the idle-entry actions applied to the hardware.
    pub fn new(config: PadConfig, actuators: A, sink: S, archive: Box<dyn FlightArchive>) -> Self {
        let logs = LogRing::new(config.log_capacity);
        let mut seq = Self {
            config,
            actuators,
            sink,
            archive,
            state: Idle,
            uptime_ms: 0,
            state_entered_ms: 0,
            epoch_offset_ms: 0,
            water_volume: 0.0,
            pressure: 0.0,
            target: None,
            launch_time_ms: None,
            logs,
            rocket: RocketLinkStatus::default(),
            rocket_contact: false,
            upload: None,
            archived_total: None,
            last_flight: None,
            outbox: VecDeque::new(),
        };
        seq.apply_entry(EntryAction::SafeIdle);
        seq.log(format!("boot: state {}", Idle));
        seq
    }

    /// Offset added to uptime when keying archived flights, so keys stay
    /// unique across reboots. The binary passes the wall clock at boot.
    pub fn with_epoch_offset(mut self, offset_ms: u64) -> Self {
        self.epoch_offset_ms = offset_ms;
        self
    }

    pub fn config(&self) -> &PadConfig {
        &self.config
    }

    pub fn state(&self) -> LaunchpadState {
        self.state
    }

    pub fn uptime_ms(&self) -> u64 {
        self.uptime_ms
    }

    pub fn water_volume(&self) -> f32 {
        self.water_volume
    }

    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    pub fn target(&self) -> Option<LaunchParameters> {
        self.target
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn rocket(&self) -> &RocketLinkStatus {
        &self.rocket
    }

    /// Key of the most recently archived flight.
    pub fn last_flight(&self) -> Option<u64> {
        self.last_flight
    }

    pub fn logs(&self) -> Vec<LogLine> {
        self.logs.snapshot()
    }

    pub fn status(&self) -> PadStatus {
        PadStatus {
            state: self.state,
            uptime_ms: self.uptime_ms,
            water_volume_l: self.water_volume,
            pressure_bar: self.pressure,
            target: self.target,
            launch_timestamp: self.launch_time_ms.map(|t| t + self.epoch_offset_ms),
            transfer_progress: self.upload.as_ref().map(|u| u.progress()),
            last_flight: self.last_flight,
            rocket: self.rocket.clone(),
        }
    }

    /// Events queued for the rocket since the last call, oldest first.
    pub fn drain_rocket_events(&mut self) -> Vec<LaunchpadEvent> {
        self.outbox.drain(..).collect()
    }

    fn in_state_ms(&self) -> u64 {
        self.uptime_ms.saturating_sub(self.state_entered_ms)
    }

    /// Move to `to` if the table allows it from the current state.
    ///
    /// Requesting the active state is a logged no-op that issues no actuator
    /// command. An illegal move is logged, forces `Idle` and returns
    /// `SequenceViolation`.
    pub fn transition_to(&mut self, to: LaunchpadState, cause: &str) -> Result<StateChange, PadError> {
        let from = self.state;
        if from == to {
            self.log(format!("state {} unchanged ({})", to, cause));
            self.sink.broadcast(&PadEvent::NewLaunchpadState { state: to });
            return Ok(StateChange::NoChange(to));
        }

        let Some(rule) = transitions::lookup(from, to) else {
            let err = PadError::SequenceViolation { from, to };
            match transitions::required_predecessor(to) {
                Some(needed) => self.log_warn(format!("{} ({}); {} is entered from {}", err, cause, to, needed)),
                None => self.log_warn(format!("{} ({})", err, cause)),
            }
            self.enter(Idle, EntryAction::SafeIdle, "sequence violation");
            return Err(err);
        };

        self.enter(to, rule.entry, cause);
        Ok(StateChange::Changed { from, to })
    }

    fn enter(&mut self, to: LaunchpadState, entry: EntryAction, cause: &str) {
        let from = self.state;
        self.state = to;
        self.state_entered_ms = self.uptime_ms;
        let follow_up = self.apply_entry(entry);

        self.log(format!("state {} -> {} ({})", from, to, cause));
        if to == Idle && !matches!(from, Idle | ReceivedData) {
            self.log_warn(format!("sequence aborted at stage {}", from));
        }
        self.sink.broadcast(&PadEvent::NewLaunchpadState { state: to });
        self.outbox.push_back(LaunchpadEvent::PadStateChanged(to));
        if let Some(ev) = follow_up {
            self.sink.broadcast(&ev);
        }
    }

    /// Hardware and bookkeeping for entering a state. Returns an event to
    /// broadcast once the state change itself has gone out.
    fn apply_entry(&mut self, entry: EntryAction) -> Option<PadEvent> {
        match entry {
            EntryAction::SafeIdle => {
                self.actuators.set_lock(false);
                self.actuators.set_valve(false);
                self.actuators.set_distributor(Distributor::Atmosphere);
                self.rocket_contact = false;
                self.upload = None;
                self.archived_total = None;
                None
            }
            EntryAction::StartFilling => {
                self.water_volume = 0.0;
                self.actuators.set_distributor(Distributor::Atmosphere);
                self.actuators.set_valve(true);
                None
            }
            EntryAction::StartPressurizing => {
                self.actuators.set_valve(false);
                self.actuators.set_distributor(Distributor::Compressor);
                None
            }
            EntryAction::LockDistributor => {
                self.actuators.set_distributor(Distributor::Locked);
                None
            }
            EntryAction::ReleaseHold => {
                self.launch_time_ms = Some(self.uptime_ms);
                self.actuators.set_lock(true);
                None
            }
            EntryAction::SafeAfterRelease => {
                self.actuators.set_distributor(Distributor::Atmosphere);
                self.actuators.set_lock(false);
                self.rocket_contact = false;
                None
            }
            EntryAction::BeginReceiving => {
                self.upload = Some(UploadSession::new(self.uptime_ms));
                Some(PadEvent::ReceivingData { percentage: 0.0 })
            }
            EntryAction::ArchiveFlight => self.archive_upload(),
        }
    }

    fn archive_upload(&mut self) -> Option<PadEvent> {
        let session = self.upload.take()?;
        let total = session.received();
        let launch_timestamp = self.launch_time_ms.unwrap_or(self.uptime_ms) + self.epoch_offset_ms;
        let record = FlightRecord {
            launch_timestamp,
            parameters: self.target,
            samples: session.into_samples(),
        };
        match self.archive.store(&record) {
            Ok(id) => {
                self.last_flight = Some(id);
                self.archived_total = Some(total);
                self.log(format!("archive: stored flight {} ({} samples)", id, record.samples.len()));
                Some(PadEvent::NewDataAvailable { flight: id })
            }
            Err(e) => {
                error!("pad: {}", e);
                self.log(format!("archive: store failed: {}", e));
                None
            }
        }
    }

    /// One control-loop iteration: integrate the readings, then evaluate
    /// the automatic transitions of the active state.
    pub fn tick(&mut self, delta_ms: u64, pressure_bar: f32, flow_pulses: u32) -> TickReport {
        self.uptime_ms += delta_ms;
        self.pressure = pressure_bar;
        self.water_volume += flow_pulses as f32 * self.config.liters_per_pulse;

        if matches!(self.state, WaterFilling | Pressurizing) {
            self.sink.broadcast(&PadEvent::Filling {
                water_volume: self.water_volume,
                pressure: self.pressure,
            });
        }

        let transition = self.evaluate().and_then(|(to, cause)| self.transition_to(to, cause).ok());

        TickReport {
            state: self.state,
            water_volume: self.water_volume,
            pressure: self.pressure,
            transition,
        }
    }

    fn evaluate(&mut self) -> Option<(LaunchpadState, &'static str)> {
        match self.state {
            WaterFilling => {
                let target = self.target?;
                (self.water_volume + REACHED_TOLERANCE >= target.water_volume).then_some((Pressurizing, "volume reached"))
            }
            Pressurizing => {
                let target = self.target?;
                (self.pressure + REACHED_TOLERANCE >= target.pressure).then_some((ReadyForLaunch, "pressure reached"))
            }
            Launching => (self.in_state_ms() >= self.config.clearing_delay_ms).then_some((WaitingForRocket, "pad clear")),
            WaitingForRocket => {
                if self.rocket_contact {
                    Some((ReceivingData, "rocket link detected"))
                } else if self.in_state_ms() > self.config.rocket_wait_timeout_ms {
                    self.log_warn(format!("rocket silent for {} ms", self.in_state_ms()));
                    Some((Idle, "rocket wait timeout"))
                } else {
                    None
                }
            }
            ReceivingData => {
                let session = self.upload.as_ref()?;
                let stalled_ms = self.uptime_ms.saturating_sub(session.last_chunk_ms);
                let (received, complete) = (session.received(), session.is_complete());
                if complete {
                    Some((ReceivedData, "upload complete"))
                } else if stalled_ms > self.config.upload_stall_timeout_ms {
                    self.log_warn(format!("upload stalled at {} samples, discarding", received));
                    Some((Idle, "upload stall timeout"))
                } else {
                    None
                }
            }
            Idle | ReadyForLaunch | ReceivedData => None,
        }
    }

    pub(crate) fn log(&mut self, message: String) {
        info!("pad: {}", message);
        self.push_log(message);
    }

    pub(crate) fn log_warn(&mut self, message: String) {
        warn!("pad: {}", message);
        self.push_log(message);
    }

    fn push_log(&mut self, message: String) {
        let line = self.logs.push(self.uptime_ms, message);
        self.sink.broadcast(&PadEvent::NewLog {
            timestamp: line.timestamp,
            message: line.message.clone(),
        });
    }

    /// Log and broadcast a refused command, handing the error back.
    pub(crate) fn reject(&mut self, err: PadError) -> PadError {
        self.log_warn(format!("rejected: {}", err));
        err
    }

    pub(crate) fn require(&mut self, command: &'static str, allowed: LaunchpadState) -> Result<(), PadError> {
        if self.state == allowed {
            Ok(())
        } else {
            Err(self.reject(PadError::InvalidState { command, state: self.state }))
        }
    }
}
