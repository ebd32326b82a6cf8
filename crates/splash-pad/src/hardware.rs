use serde::{Deserialize, Serialize};

/// Position of the pressure distributor valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distributor {
    Atmosphere,
    Compressor,
    Locked,
}

/// Pad-side actuators. Calls are synchronous and assumed reliable.
pub trait PadActuators {
    /// Water fill valve / pump.
    fn set_valve(&mut self, open: bool);
    fn set_distributor(&mut self, position: Distributor);
    /// Release mechanism holding the rocket. `true` lets it go.
    fn set_lock(&mut self, open: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Valve(bool),
    Distributor(Distributor),
    Lock(bool),
}

/// Records every command; the last value of each actuator is the hardware state.
#[derive(Debug, Default, Clone)]
pub struct RecordingActuators {
    pub calls: Vec<ActuatorCall>,
}

impl RecordingActuators {
    pub fn valve_open(&self) -> bool {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Valve(v) => Some(*v),
            _ => None,
        }).unwrap_or(false)
    }

    pub fn distributor(&self) -> Option<Distributor> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Distributor(d) => Some(*d),
            _ => None,
        })
    }

    pub fn lock_open(&self) -> bool {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Lock(v) => Some(*v),
            _ => None,
        }).unwrap_or(false)
    }
}

impl PadActuators for RecordingActuators {
    fn set_valve(&mut self, open: bool) {
        self.calls.push(ActuatorCall::Valve(open));
    }

    fn set_distributor(&mut self, position: Distributor) {
        self.calls.push(ActuatorCall::Distributor(position));
    }

    fn set_lock(&mut self, open: bool) {
        self.calls.push(ActuatorCall::Lock(open));
    }
}
