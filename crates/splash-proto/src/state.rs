use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ground-side sequence. Variants are declared in their forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchpadState {
    Idle,
    WaterFilling,
    Pressurizing,
    ReadyForLaunch,
    Launching,
    WaitingForRocket,
    ReceivingData,
    ReceivedData,
}

impl LaunchpadState {
    pub const ALL: [LaunchpadState; 8] = [
        LaunchpadState::Idle,
        LaunchpadState::WaterFilling,
        LaunchpadState::Pressurizing,
        LaunchpadState::ReadyForLaunch,
        LaunchpadState::Launching,
        LaunchpadState::WaitingForRocket,
        LaunchpadState::ReceivingData,
        LaunchpadState::ReceivedData,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LaunchpadState::Idle => "IDLE",
            LaunchpadState::WaterFilling => "WATER_FILLING",
            LaunchpadState::Pressurizing => "PRESSURIZING",
            LaunchpadState::ReadyForLaunch => "READY_FOR_LAUNCH",
            LaunchpadState::Launching => "LAUNCHING",
            LaunchpadState::WaitingForRocket => "WAITING_FOR_ROCKET",
            LaunchpadState::ReceivingData => "RECEIVING_DATA",
            LaunchpadState::ReceivedData => "RECEIVED_DATA",
        }
    }
}

impl fmt::Display for LaunchpadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FairingPosition {
    Open,
    Closed,
}

/// Flight-side sequence. `Error` is a trap: only a restart leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RocketState {
    Idling(FairingPosition),
    WaitingForLaunch,
    Ascending,
    FreeFalling,
    ParachuteFalling,
    Reconnecting,
    SendingData,
    Error,
}

impl RocketState {
    pub const ALL: [RocketState; 9] = [
        RocketState::Idling(FairingPosition::Open),
        RocketState::Idling(FairingPosition::Closed),
        RocketState::WaitingForLaunch,
        RocketState::Ascending,
        RocketState::FreeFalling,
        RocketState::ParachuteFalling,
        RocketState::Reconnecting,
        RocketState::SendingData,
        RocketState::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RocketState::Idling(FairingPosition::Open) => "IDLING_OPEN",
            RocketState::Idling(FairingPosition::Closed) => "IDLING_CLOSED",
            RocketState::WaitingForLaunch => "WAITING_FOR_LAUNCH",
            RocketState::Ascending => "ASCENDING",
            RocketState::FreeFalling => "FREE_FALLING",
            RocketState::ParachuteFalling => "PARACHUTE_FALLING",
            RocketState::Reconnecting => "RECONNECTING",
            RocketState::SendingData => "SENDING_DATA",
            RocketState::Error => "ERROR",
        }
    }

    /// True while the vehicle is on the pad or recovered (link expected up).
    pub fn is_grounded(self) -> bool {
        matches!(
            self,
            RocketState::Idling(_) | RocketState::WaitingForLaunch | RocketState::SendingData
        )
    }
}

impl fmt::Display for RocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown rocket state: {}", self.0)
    }
}

impl std::error::Error for UnknownState {}

impl FromStr for RocketState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RocketState::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

impl TryFrom<String> for RocketState {
    type Error = UnknownState;

    fn try_from(s: String) -> Result<Self, UnknownState> {
        s.parse()
    }
}

impl From<RocketState> for String {
    fn from(st: RocketState) -> Self {
        st.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rocket_state_from_owned_string() {
        assert_eq!(RocketState::try_from("ERROR".to_string()), Ok(RocketState::Error));
        assert_eq!(RocketState::try_from("LOST".to_string()), Err(UnknownState("LOST".to_string())));
    }

    #[test]
    fn rocket_state_names_round_trip_through_json() {
        for st in RocketState::ALL {
            let json = serde_json::to_string(&st).unwrap();
            assert_eq!(json, format!("\"{}\"", st.as_str()));
            let back: RocketState = serde_json::from_str(&json).unwrap();
            assert_eq!(back, st);
        }
    }

    #[test]
    fn launchpad_state_uses_screaming_names() {
        let json = serde_json::to_string(&LaunchpadState::ReadyForLaunch).unwrap();
        assert_eq!(json, "\"READY_FOR_LAUNCH\"");
        assert_eq!(LaunchpadState::ReadyForLaunch.to_string(), "READY_FOR_LAUNCH");
    }

    #[test]
    fn unknown_rocket_state_is_rejected() {
        assert!("HOVERING".parse::<RocketState>().is_err());
        assert!(serde_json::from_str::<RocketState>("\"HOVERING\"").is_err());
    }
}
