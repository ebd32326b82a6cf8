use serde::{Deserialize, Serialize};

use crate::sample::FlightSample;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LaunchParameters {
    pub water_volume: f32, // liters
    pub pressure: f32,     // bar
}

/// Sent by the rocket right after it joins the pad network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RocketIdentity {
    pub name: String,
    pub firmware: String,
}

/// One slice of the flight log. `offset` is the index of `samples[0]`
/// within the whole log, `total` the length of the whole log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadChunk {
    pub offset: usize,
    pub total: usize,
    pub samples: Vec<FlightSample>,
}

impl UploadChunk {
    /// One past the index of the last sample; `None` if that overflows.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.samples.len())
    }

    pub fn is_last(&self) -> bool {
        self.end().is_some_and(|end| end >= self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAck {
    pub received: usize,
    pub total: usize,
}

/// A completed flight as archived by the pad, keyed by launch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub launch_timestamp: u64,
    pub parameters: Option<LaunchParameters>,
    pub samples: Vec<FlightSample>,
}

impl FlightRecord {
    pub fn max_altitude(&self) -> Option<f32> {
        self.samples
            .iter()
            .map(|s| s.relative_altitude)
            .fold(None, |acc, a| Some(acc.map_or(a, |m: f32| m.max(a))))
    }

    pub fn duration_ms(&self) -> u64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(a), Some(b)) => b.timestamp.saturating_sub(a.timestamp),
            _ => 0,
        }
    }
}
