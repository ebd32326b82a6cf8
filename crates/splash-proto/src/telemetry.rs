use serde::{Deserialize, Serialize};

use crate::state::{FairingPosition, LaunchpadState, RocketState};

/// Live events pushed to observers of the pad (operator UI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PadEvent {
    NewLog { timestamp: u64, message: String },
    NewLaunchpadState { state: LaunchpadState },
    NewRocketState { state: RocketState },
    Filling {
        #[serde(rename = "water-volume")]
        water_volume: f32,
        pressure: f32,
    },
    ReceivingData { percentage: f32 },
    NewDataAvailable { flight: u64 },
}

/// Out-of-band signals the rocket reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum LaunchpadEvent {
    FairingCommand(FairingPosition),
    PadStateChanged(LaunchpadState),
}
