//! Allowed rocket transitions. Anything else lands in `Error`.

use splash_proto::FairingPosition::{Closed, Open};
use splash_proto::RocketState::{self, *};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// Drive the hatch to match the requested fairing position.
    Fairing,
    /// Pad abort before launch: hatch closed, pre-launch history dropped.
    Disarm,
    /// Capture the ground reference and start filling the ring.
    Arm,
    /// Promote the ring into the flight log.
    Liftoff,
    Apogee,
    DeployParachute,
    /// Start the join/identify loop.
    Reconnect,
    BeginUpload,
    Recovered,
    Fault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// `None` matches every state.
    pub from: Option<RocketState>,
    pub to: RocketState,
    pub entry: Entry,
}

const fn rule(from: RocketState, to: RocketState, entry: Entry) -> Rule {
    Rule { from: Some(from), to, entry }
}

pub const RULES: [Rule; 11] = [
    rule(Idling(Open), Idling(Closed), Entry::Fairing),
    rule(Idling(Closed), Idling(Open), Entry::Fairing),
    rule(Idling(Closed), WaitingForLaunch, Entry::Arm),
    rule(WaitingForLaunch, Idling(Closed), Entry::Disarm),
    rule(WaitingForLaunch, Ascending, Entry::Liftoff),
    rule(Ascending, FreeFalling, Entry::Apogee),
    rule(FreeFalling, ParachuteFalling, Entry::DeployParachute),
    rule(ParachuteFalling, Reconnecting, Entry::Reconnect),
    rule(Reconnecting, SendingData, Entry::BeginUpload),
    rule(SendingData, Idling(Open), Entry::Recovered),
    Rule { from: None, to: Error, entry: Entry::Fault },
];

pub fn lookup(from: RocketState, to: RocketState) -> Option<&'static Rule> {
    RULES
        .iter()
        .find(|r| r.to == to && r.from.map_or(true, |f| f == from))
}
