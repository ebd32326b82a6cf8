pub mod api;
pub mod archive;
pub mod doctor;
pub mod error;
pub mod events;
pub mod flow;
pub mod hardware;
pub mod rocket_link;
pub mod sequencer;
pub mod transitions;

mod commands;

use serde::Deserialize;

pub use archive::{CsvArchive, FlightArchive, MemoryArchive};
pub use error::PadError;
pub use events::{EventSink, NullSink};
pub use flow::PulseCounter;
pub use hardware::{Distributor, PadActuators};
pub use rocket_link::RocketLinkStatus;
pub use sequencer::{LaunchpadSequencer, PadStatus, StateChange, TickReport};

/// Hard ceiling for the requested pressure, whatever the config says.
pub const MAX_PRESSURE_BAR: f32 = 10.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PadConfig {
    /// Capacity of the rocket bottle; upper bound for the requested water volume.
    pub max_rocket_volume_l: f32,

    /// Upper bound for the requested pressure. Clamped to MAX_PRESSURE_BAR.
    pub max_pressure_bar: f32,

    /// Flow meter calibration (YF-S201 style sensors give ~450 pulses/L).
    pub liters_per_pulse: f32,

    /// Dwell after the hold is released before the pad counts as clear.
    pub clearing_delay_ms: u64,

    /// Refuse `launch` until the rocket reports WAITING_FOR_LAUNCH.
    pub require_rocket_ready: bool,

    /// Give up waiting for the rocket to call home after this long.
    pub rocket_wait_timeout_ms: u64,

    /// Abort a flight-data transfer when no chunk arrives for this long.
    pub upload_stall_timeout_ms: u64,

    pub log_capacity: usize,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            max_rocket_volume_l: 1.5,
            max_pressure_bar: MAX_PRESSURE_BAR,
            liters_per_pulse: 1.0 / 450.0,
            clearing_delay_ms: 3000,
            require_rocket_ready: false,
            rocket_wait_timeout_ms: 600_000,
            upload_stall_timeout_ms: 30_000,
            log_capacity: 200,
        }
    }
}

impl PadConfig {
    pub fn pressure_limit(&self) -> f32 {
        self.max_pressure_bar.min(MAX_PRESSURE_BAR)
    }
}
