use splash_proto::LaunchpadState::*;
use splash_proto::{FairingPosition, FlightRecord, LaunchParameters, LaunchpadEvent};

use crate::error::PadError;
use crate::events::EventSink;
use crate::hardware::PadActuators;
use crate::sequencer::{LaunchpadSequencer, StateChange};

impl<A: PadActuators, S: EventSink> LaunchpadSequencer<A, S> {
    pub fn request_start_filling(&mut self, volume: f32, pressure: f32) -> Result<StateChange, PadError> {
        self.require("start-filling", Idle)?;

        let max_volume = self.config.max_rocket_volume_l;
        // negated comparisons also reject NaN
        if !(volume > 0.0 && volume <= max_volume) {
            return Err(self.reject(PadError::InvalidParameter(format!(
                "water volume {} L outside (0, {}]",
                volume, max_volume
            ))));
        }
        let max_pressure = self.config.pressure_limit();
        if !(pressure > 1.0 && pressure <= max_pressure) {
            return Err(self.reject(PadError::InvalidParameter(format!(
                "pressure {} bar outside (1, {}]",
                pressure, max_pressure
            ))));
        }

        self.target = Some(LaunchParameters { water_volume: volume, pressure });
        self.transition_to(WaterFilling, "start-filling")
    }

    pub fn request_launch(&mut self) -> Result<StateChange, PadError> {
        self.require("launch", ReadyForLaunch)?;
        if self.config.require_rocket_ready && !self.rocket.is_ready() {
            self.log_warn("rocket has not reported WAITING_FOR_LAUNCH".to_string());
            return Err(self.reject(PadError::InvalidState { command: "launch", state: self.state }));
        }
        self.transition_to(Launching, "launch")
    }

    pub fn request_abort(&mut self) -> Result<StateChange, PadError> {
        self.transition_to(Idle, "abort")
    }

    pub fn request_return_to_idle(&mut self) -> Result<StateChange, PadError> {
        self.transition_to(Idle, "return-to-idle")
    }

    pub fn skip_water_filling(&mut self) -> Result<StateChange, PadError> {
        self.require("skip-water-filling", WaterFilling)?;
        self.transition_to(Pressurizing, "water filling skipped")
    }

    pub fn skip_pressurizing(&mut self) -> Result<StateChange, PadError> {
        self.require("skip-pressurizing", Pressurizing)?;
        self.transition_to(ReadyForLaunch, "pressurizing skipped")
    }

    pub fn open_fairing(&mut self) -> Result<(), PadError> {
        self.command_fairing("open-fairing", FairingPosition::Open)
    }

    pub fn close_fairing(&mut self) -> Result<(), PadError> {
        self.command_fairing("close-fairing", FairingPosition::Closed)
    }

    fn command_fairing(&mut self, command: &'static str, position: FairingPosition) -> Result<(), PadError> {
        self.require(command, Idle)?;
        self.outbox.push_back(LaunchpadEvent::FairingCommand(position));
        self.log(format!("fairing: {:?} requested", position));
        Ok(())
    }

    /// Bottle capacity; the upper bound for `request_start_filling`.
    pub fn rocket_volume(&self) -> f32 {
        self.config.max_rocket_volume_l
    }

    /// Archived flight keys, newest first.
    pub fn list_flights(&self) -> Result<Vec<u64>, PadError> {
        self.archive.list()
    }

    pub fn get_flight(&self, id: u64) -> Result<FlightRecord, PadError> {
        self.archive.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::events::VecSink;
    use crate::hardware::RecordingActuators;
    use crate::PadConfig;

    fn seq(config: PadConfig) -> LaunchpadSequencer<RecordingActuators, VecSink> {
        LaunchpadSequencer::new(config, RecordingActuators::default(), VecSink::default(), Box::new(MemoryArchive::default()))
    }

    #[test]
    fn start_filling_bounds() {
        let mut s = seq(PadConfig::default());
        for (v, p) in [(0.0, 6.0), (1.6, 6.0), (1.0, 1.0), (1.0, 10.5), (f32::NAN, 6.0)] {
            assert!(matches!(s.request_start_filling(v, p), Err(PadError::InvalidParameter(_))), "{} {}", v, p);
            assert_eq!(s.state(), Idle);
            assert_eq!(s.target(), None);
        }
        s.request_start_filling(1.5, 10.0).unwrap();
        assert_eq!(s.state(), WaterFilling);
    }

    #[test]
    fn configured_pressure_cannot_exceed_hard_ceiling() {
        let mut s = seq(PadConfig { max_pressure_bar: 14.0, ..PadConfig::default() });
        assert!(s.request_start_filling(1.0, 12.0).is_err());
    }

    #[test]
    fn fairing_only_from_idle() {
        let mut s = seq(PadConfig::default());
        s.close_fairing().unwrap();
        assert_eq!(s.drain_rocket_events(), vec![LaunchpadEvent::FairingCommand(FairingPosition::Closed)]);

        s.request_start_filling(1.0, 5.0).unwrap();
        s.drain_rocket_events();
        let err = s.open_fairing().unwrap_err();
        assert_eq!(err, PadError::InvalidState { command: "open-fairing", state: WaterFilling });
        assert!(s.drain_rocket_events().is_empty());
    }

    #[test]
    fn launch_waits_for_ready_rocket_when_required() {
        let mut s = seq(PadConfig { require_rocket_ready: true, ..PadConfig::default() });
        s.request_start_filling(1.0, 5.0).unwrap();
        s.skip_water_filling().unwrap();
        s.skip_pressurizing().unwrap();
        assert!(s.request_launch().is_err());
        assert_eq!(s.state(), ReadyForLaunch);

        s.report_rocket_state(splash_proto::RocketState::WaitingForLaunch);
        s.request_launch().unwrap();
        assert_eq!(s.state(), Launching);
    }

    #[test]
    fn rejections_are_logged() {
        let mut s = seq(PadConfig::default());
        s.request_launch().unwrap_err();
        let last = s.logs().pop().unwrap();
        assert!(last.message.starts_with("rejected: launch refused"), "{}", last.message);
    }
}
