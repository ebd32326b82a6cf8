//! The flight-side state machine.
//!
//! Sampling is gated by `poll(now_ms)`: a sample is taken only when the
//! state-dependent interval has elapsed, then `tick` evaluates it. Network
//! calls made from `tick` block; an overrun delays the next sample.

use splash_link::{Endpoint, Link, Transport};
use splash_proto::messages::UploadAck;
use splash_proto::FairingPosition::{Closed, Open};
use splash_proto::RocketState::{self, *};
use splash_proto::{FlightSample, LaunchpadEvent, LaunchpadState, LogLine, LogRing, RocketIdentity};
use tracing::{debug, error, info, warn};

use crate::config::RocketConfig;
use crate::detectors::{ApogeeDetector, LandingDetector, LaunchDetector};
use crate::error::RocketError;
use crate::hardware::{Network, RocketActuators, Sensors};
use crate::telemetry::TelemetryBuffer;
use crate::transitions::{self, Entry};

pub const FIRMWARE: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// In `Error`; only a power cycle gets out.
    RestartRequired,
}

pub struct RocketSequencer<S, A, N, T> {
    config: RocketConfig,
    sensors: S,
    actuators: A,
    network: N,
    link: Link<T>,

    state: RocketState,
    state_entered_ms: u64,
    now_ms: u64,
    last_sample_ms: Option<u64>,
    last_join_ms: Option<u64>,
    ground_ref_m: f32,

    telemetry: TelemetryBuffer,
    launch: LaunchDetector,
    apogee: ApogeeDetector,
    landing: LandingDetector,
    logs: LogRing,
}

impl<S, A, N, T> RocketSequencer<S, A, N, T>
where
    S: Sensors,
    A: RocketActuators,
    N: Network,
    T: Transport,
{
    pub fn new(config: RocketConfig, sensors: S, actuators: A, network: N, link: Link<T>) -> Self {
        let telemetry = TelemetryBuffer::new(config.prelaunch_capacity(), config.flight_log_capacity);
        Self {
            launch: LaunchDetector::new(config.launch_altitude_m),
            apogee: ApogeeDetector::new(config.apogee_window, config.apogee_min_altitude_m),
            landing: LandingDetector::new(config.landing_altitude_m, config.landing_dwell_ms),
            logs: LogRing::new(config.log_capacity),
            telemetry,
            config,
            sensors,
            actuators,
            network,
            link,
            state: Idling(Open),
            state_entered_ms: 0,
            now_ms: 0,
            last_sample_ms: None,
            last_join_ms: None,
            ground_ref_m: 0.0,
        }
    }

    /// Sensor bring-up, network join and identification. Any failure puts
    /// the rocket in `Error`.
    pub fn initialize(&mut self, now_ms: u64) -> Readiness {
        self.now_ms = now_ms;
        self.state_entered_ms = now_ms;
        match self.bring_up() {
            Ok(()) => {
                self.log(format!("ready as {} ({})", self.config.name, FIRMWARE));
                self.push_state();
                Readiness::Ready
            }
            Err(e) => {
                self.log_error(format!("initialize failed: {}", e));
                self.fail("initialize");
                Readiness::RestartRequired
            }
        }
    }

    fn bring_up(&mut self) -> Result<(), RocketError> {
        self.sensors.init()?;
        self.telemetry.clear();
        self.ground_ref_m = self.sensors.read_altitude();
        self.actuators.set_parachute(true);
        self.network.join()?;
        self.identify()
    }

    fn identify(&mut self) -> Result<(), RocketError> {
        let identity = RocketIdentity { name: self.config.name.clone(), firmware: FIRMWARE.to_string() };
        let _: serde_json::Value = self.link.request(Endpoint::IdentifyRocket, &identity)?;
        debug!("rocket: identified to pad (rtt: {:?} ms)", self.link.health().rtt_ms);
        Ok(())
    }

    pub fn config(&self) -> &RocketConfig {
        &self.config
    }

    pub fn state(&self) -> RocketState {
        self.state
    }

    pub fn readiness(&self) -> Readiness {
        if self.state == Error { Readiness::RestartRequired } else { Readiness::Ready }
    }

    pub fn telemetry(&self) -> &TelemetryBuffer {
        &self.telemetry
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<T> {
        &mut self.link
    }

    pub fn ground_reference_m(&self) -> f32 {
        self.ground_ref_m
    }

    pub fn logs(&self) -> Vec<LogLine> {
        self.logs.snapshot()
    }

    pub fn sampling_interval_ms(&self) -> u64 {
        match self.state {
            WaitingForLaunch | Ascending | FreeFalling => self.config.fast_sample_interval_ms,
            _ => self.config.slow_sample_interval_ms,
        }
    }

    /// Read every sensor once. Altitude is relative to the ground reference.
    pub fn sample(&mut self, now_ms: u64) -> FlightSample {
        let [accel_x, accel_y, accel_z] = self.sensors.read_acceleration();
        let [gyro_x, gyro_y, gyro_z] = self.sensors.read_gyro();
        FlightSample {
            timestamp: now_ms,
            temperature: self.sensors.read_temperature(),
            pressure: self.sensors.read_pressure(),
            relative_altitude: self.sensors.read_altitude() - self.ground_ref_m,
            accel_x,
            accel_y,
            accel_z,
            gyro_x,
            gyro_y,
            gyro_z,
        }
    }

    /// Take and evaluate a sample if one is due. Returns it when taken.
    pub fn poll(&mut self, now_ms: u64) -> Option<FlightSample> {
        self.now_ms = now_ms;
        let due = self
            .last_sample_ms
            .map_or(true, |t| now_ms.saturating_sub(t) >= self.sampling_interval_ms());
        if !due {
            return None;
        }
        self.last_sample_ms = Some(now_ms);
        let sample = self.sample(now_ms);
        self.tick(sample);
        Some(sample)
    }

    fn in_state_ms(&self) -> u64 {
        self.now_ms.saturating_sub(self.state_entered_ms)
    }

    /// Evaluate one sample against the active state.
    pub fn tick(&mut self, sample: FlightSample) -> RocketState {
        self.now_ms = self.now_ms.max(sample.timestamp);
        let (ts, alt) = (sample.timestamp, sample.relative_altitude);

        match self.state {
            WaitingForLaunch => {
                self.telemetry.record_prelaunch(sample);
                if self.launch.detect(alt) {
                    self.advance(Ascending, "launch detected");
                } else if self.in_state_ms() >= self.config.max_armed_ms {
                    self.log_warn(format!("no launch after {} ms armed", self.in_state_ms()));
                    self.advance(Idling(Closed), "armed timeout");
                }
            }
            Ascending => {
                self.telemetry.append(sample);
                if self.apogee.update(ts, alt) {
                    let speed = self.apogee.mean_speed().unwrap_or(0.0);
                    self.log(format!("apogee near {:.1} m (mean speed {:.2} m/s)", alt, speed));
                    self.advance(FreeFalling, "apogee detected");
                } else if self.in_state_ms() >= self.config.max_ascending_ms {
                    self.log_warn(format!("no apogee after {} ms", self.in_state_ms()));
                    self.advance(FreeFalling, "ascent timeout");
                }
            }
            FreeFalling => {
                self.telemetry.append(sample);
                if alt <= self.config.parachute_altitude_m {
                    self.advance(ParachuteFalling, "parachute altitude");
                }
            }
            ParachuteFalling => {
                self.telemetry.append(sample);
                if self.landing.update(ts, alt) {
                    self.advance(Reconnecting, "landing detected");
                }
            }
            Reconnecting => self.try_reconnect(),
            SendingData => self.send_flight_log(),
            Idling(_) | Error => {}
        }
        self.state
    }

    fn try_reconnect(&mut self) {
        let now = self.now_ms;
        let due = self
            .last_join_ms
            .map_or(true, |t| now.saturating_sub(t) >= self.config.reconnect_interval_ms);
        if !due {
            return;
        }
        self.last_join_ms = Some(now);

        if let Err(e) = self.network.join() {
            debug!("rocket: join failed: {}", e);
            return;
        }
        match self.identify() {
            Ok(()) => self.advance(SendingData, "pad link up"),
            Err(e) => {
                self.log_error(format!("identification failed: {}", e));
                self.fail("identify");
            }
        }
    }

    fn send_flight_log(&mut self) {
        match self.upload() {
            Ok(count) => {
                self.log(format!("upload: {} samples acknowledged", count));
                self.telemetry.clear();
                self.advance(Idling(Open), "upload acknowledged");
            }
            Err(e) => {
                // flight log stays in RAM until the power cycle
                self.log_error(format!("upload failed: {}", e));
                self.fail("upload");
            }
        }
    }

    fn upload(&mut self) -> Result<usize, RocketError> {
        let chunks = self.telemetry.upload_chunks(self.config.upload_chunk_samples);
        let mut acked = 0;
        for chunk in chunks {
            let end = chunk
                .end()
                .ok_or_else(|| RocketError::TransportFailure(format!("chunk at {} out of range", chunk.offset)))?;
            let ack: UploadAck = self.link.request(Endpoint::UploadFlightData, &chunk)?;
            if ack.received < end {
                return Err(RocketError::TransportFailure(format!(
                    "pad acknowledged {} of {} samples",
                    ack.received, end
                )));
            }
            debug!("upload: {}/{}", ack.received, ack.total);
            acked = ack.received;
        }
        Ok(acked)
    }

    /// React to a signal from the pad.
    pub fn on_launchpad_event(&mut self, event: LaunchpadEvent) -> Result<(), RocketError> {
        match (event, self.state) {
            (LaunchpadEvent::FairingCommand(position), Idling(_)) => self.transition_to(Idling(position), "fairing command"),
            (LaunchpadEvent::FairingCommand(_), state) => {
                Err(self.reject(RocketError::InvalidState { event: "fairing-command", state }))
            }
            (LaunchpadEvent::PadStateChanged(LaunchpadState::ReadyForLaunch), Idling(Closed)) => {
                self.transition_to(WaitingForLaunch, "pad ready for launch")
            }
            (LaunchpadEvent::PadStateChanged(LaunchpadState::ReadyForLaunch), Idling(Open)) => {
                self.log_warn("fairing open, not arming".to_string());
                Err(self.reject(RocketError::InvalidState { event: "prepare", state: Idling(Open) }))
            }
            (LaunchpadEvent::PadStateChanged(LaunchpadState::Idle), WaitingForLaunch) => {
                self.transition_to(Idling(Closed), "pad aborted")
            }
            (LaunchpadEvent::PadStateChanged(pad), _) => {
                debug!("rocket: pad now {}", pad);
                Ok(())
            }
        }
    }

    /// Move to `to` if the table allows it. A same-state request is a
    /// logged no-op, an illegal one sends the rocket to `Error`.
    pub fn transition_to(&mut self, to: RocketState, cause: &str) -> Result<(), RocketError> {
        let from = self.state;
        if from == to {
            self.log(format!("state {} unchanged ({})", to, cause));
            return Ok(());
        }
        let err = RocketError::SequenceViolation { from, to };
        if from == Error {
            self.log_error(format!("{} ({}); restart required", err, cause));
            return Err(err);
        }
        match transitions::lookup(from, to) {
            Some(rule) => {
                self.enter(to, rule.entry, cause);
                Ok(())
            }
            None => {
                self.log_error(format!("{} ({})", err, cause));
                self.enter(Error, Entry::Fault, "sequence violation");
                Err(err)
            }
        }
    }

    /// Internal moves are always legal; a failure is already logged.
    fn advance(&mut self, to: RocketState, cause: &str) {
        let _ = self.transition_to(to, cause);
    }

    fn fail(&mut self, cause: &str) {
        self.advance(Error, cause);
    }

    fn enter(&mut self, to: RocketState, entry: Entry, cause: &str) {
        let from = self.state;
        self.state = to;
        self.state_entered_ms = self.now_ms;
        self.apply(entry, to);
        self.log(format!("state {} -> {} ({})", from, to, cause));
        if to.is_grounded() {
            self.push_state();
        }
    }

    fn apply(&mut self, entry: Entry, to: RocketState) {
        match entry {
            Entry::Fairing => {
                if let Idling(position) = to {
                    self.actuators.set_parachute(position == Open);
                }
            }
            Entry::Disarm => self.telemetry.clear(),
            Entry::Arm => {
                self.ground_ref_m = self.sensors.read_altitude();
                self.telemetry.clear();
                self.apogee.reset();
                self.landing.reset();
                debug!("rocket: ground reference {:.2} m", self.ground_ref_m);
            }
            Entry::Liftoff => {
                let kept = self.telemetry.promote_to_flight_log();
                self.log(format!("{} pre-launch samples kept", kept));
            }
            Entry::Apogee => {}
            Entry::DeployParachute => self.actuators.set_parachute(true),
            Entry::Reconnect => self.last_join_ms = None,
            Entry::BeginUpload => {}
            Entry::Recovered => {
                self.apogee.reset();
                self.landing.reset();
                self.actuators.set_parachute(true);
            }
            Entry::Fault => self.actuators.sound_fault(),
        }
    }

    /// Best effort, single attempt.
    fn push_state(&mut self) {
        let state = self.state;
        if !self.network.is_connected() {
            debug!("rocket: offline, state {} not pushed", state);
            return;
        }
        if let Err(e) = self.link.push(Endpoint::RocketState, &state) {
            warn!("rocket: state push failed: {}", e);
        }
    }

    fn reject(&mut self, err: RocketError) -> RocketError {
        self.log_warn(format!("rejected: {}", err));
        err
    }

    fn log(&mut self, message: String) {
        info!("rocket: {}", message);
        self.logs.push(self.now_ms, message);
    }

    fn log_warn(&mut self, message: String) {
        warn!("rocket: {}", message);
        self.logs.push(self.now_ms, message);
    }

    fn log_error(&mut self, message: String) {
        error!("rocket: {}", message);
        self.logs.push(self.now_ms, message);
    }
}
