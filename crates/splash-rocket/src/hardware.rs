use crate::error::RocketError;

/// Barometer + IMU. Reads may return the last cached value when the device
/// is busy; the sequencer never retries a read.
pub trait Sensors {
    fn init(&mut self) -> Result<(), RocketError>;
    fn read_pressure(&mut self) -> f32;
    /// Barometric altitude, metres above sea level.
    fn read_altitude(&mut self) -> f32;
    fn read_temperature(&mut self) -> f32;
    fn read_acceleration(&mut self) -> [f32; 3];
    fn read_gyro(&mut self) -> [f32; 3];
}

pub trait RocketActuators {
    /// Parachute hatch servo. `true` opens the hatch.
    fn set_parachute(&mut self, deployed: bool);
    /// Audible fault pattern.
    fn sound_fault(&mut self);
}

/// Station-mode join to the pad's access point.
pub trait Network {
    fn join(&mut self) -> Result<(), RocketError>;
    fn is_connected(&self) -> bool;
}

#[derive(Debug, Default, Clone)]
pub struct RecordingActuators {
    pub parachute: Vec<bool>,
    pub faults: u32,
}

impl RecordingActuators {
    pub fn hatch_open(&self) -> bool {
        self.parachute.last().copied().unwrap_or(false)
    }
}

impl RocketActuators for RecordingActuators {
    fn set_parachute(&mut self, deployed: bool) {
        self.parachute.push(deployed);
    }

    fn sound_fault(&mut self) {
        self.faults += 1;
    }
}
