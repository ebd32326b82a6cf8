//! Allowed launchpad transitions and the action run on entering the target.
//!
//! Anything not listed here is a sequence violation and sends the pad back
//! to `Idle`.

use splash_proto::LaunchpadState::{self, *};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Any,
    From(LaunchpadState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    /// Close the lock, stop the flow, vent to atmosphere.
    SafeIdle,
    /// Reset the volume, vent, open the fill valve.
    StartFilling,
    /// Close the fill valve, switch the distributor to the compressor.
    StartPressurizing,
    LockDistributor,
    /// Stamp the launch time and release the hold.
    ReleaseHold,
    /// Vent and re-close the lock.
    SafeAfterRelease,
    BeginReceiving,
    ArchiveFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub origin: Origin,
    pub to: LaunchpadState,
    pub entry: EntryAction,
}

pub const RULES: [Rule; 8] = [
    Rule { origin: Origin::Any, to: Idle, entry: EntryAction::SafeIdle },
    Rule { origin: Origin::From(Idle), to: WaterFilling, entry: EntryAction::StartFilling },
    Rule { origin: Origin::From(WaterFilling), to: Pressurizing, entry: EntryAction::StartPressurizing },
    Rule { origin: Origin::From(Pressurizing), to: ReadyForLaunch, entry: EntryAction::LockDistributor },
    Rule { origin: Origin::From(ReadyForLaunch), to: Launching, entry: EntryAction::ReleaseHold },
    Rule { origin: Origin::From(Launching), to: WaitingForRocket, entry: EntryAction::SafeAfterRelease },
    Rule { origin: Origin::From(WaitingForRocket), to: ReceivingData, entry: EntryAction::BeginReceiving },
    Rule { origin: Origin::From(ReceivingData), to: ReceivedData, entry: EntryAction::ArchiveFlight },
];

impl Rule {
    pub fn admits(&self, from: LaunchpadState, to: LaunchpadState) -> bool {
        self.to == to
            && match self.origin {
                Origin::Any => true,
                Origin::From(required) => required == from,
            }
    }
}

/// The rule covering `from -> to`, if that move is legal. Same-state
/// requests are handled by the caller as no-ops and never reach the table.
pub fn lookup(from: LaunchpadState, to: LaunchpadState) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.admits(from, to))
}

/// The single state `to` may be entered from (`None` for `Idle`).
pub fn required_predecessor(to: LaunchpadState) -> Option<LaunchpadState> {
    RULES.iter().find(|r| r.to == to).and_then(|r| match r.origin {
        Origin::Any => None,
        Origin::From(s) => Some(s),
    })
}
