//! Flight event detectors. Each one sees a single (timestamp, altitude)
//! pair per sample; altitudes are relative to the pad.

use std::collections::VecDeque;

/// Single-sample threshold crossing.
#[derive(Debug, Clone, Copy)]
pub struct LaunchDetector {
    threshold_m: f32,
}

impl LaunchDetector {
    pub fn new(threshold_m: f32) -> Self {
        Self { threshold_m }
    }

    pub fn detect(&self, altitude: f32) -> bool {
        altitude >= self.threshold_m
    }
}

/// Fires once the mean of the last `window` vertical-speed estimates drops
/// to zero or below while above `min_altitude_m`.
#[derive(Debug, Clone)]
pub struct ApogeeDetector {
    speeds: VecDeque<f32>,
    window: usize,
    min_altitude_m: f32,
    last: Option<(u64, f32)>,
    fired: bool,
}

impl ApogeeDetector {
    pub fn new(window: usize, min_altitude_m: f32) -> Self {
        let window = window.max(1);
        Self { speeds: VecDeque::with_capacity(window), window, min_altitude_m, last: None, fired: false }
    }

    pub fn update(&mut self, timestamp_ms: u64, altitude: f32) -> bool {
        if let Some((t0, a0)) = self.last {
            if timestamp_ms > t0 {
                let dt = (timestamp_ms - t0) as f32 / 1000.0;
                if self.speeds.len() == self.window { self.speeds.pop_front(); }
                self.speeds.push_back((altitude - a0) / dt);
            }
        }
        self.last = Some((timestamp_ms, altitude));

        if self.fired || self.speeds.len() < self.window { return false; }
        if self.mean_speed().is_some_and(|v| v <= 0.0) && altitude > self.min_altitude_m {
            self.fired = true;
            return true;
        }
        false
    }

    /// m/s, `None` before the first estimate.
    pub fn mean_speed(&self) -> Option<f32> {
        if self.speeds.is_empty() { return None; }
        Some(self.speeds.iter().sum::<f32>() / self.speeds.len() as f32)
    }

    pub fn reset(&mut self) {
        self.speeds.clear();
        self.last = None;
        self.fired = false;
    }
}

/// Altitude must stay below `threshold_m` for `dwell_ms` without
/// interruption. Going back above the threshold restarts the dwell.
#[derive(Debug, Clone)]
pub struct LandingDetector {
    threshold_m: f32,
    dwell_ms: u64,
    below_since: Option<u64>,
    fired: bool,
}

impl LandingDetector {
    pub fn new(threshold_m: f32, dwell_ms: u64) -> Self {
        Self { threshold_m, dwell_ms, below_since: None, fired: false }
    }

    pub fn update(&mut self, timestamp_ms: u64, altitude: f32) -> bool {
        if altitude >= self.threshold_m {
            self.below_since = None;
            return false;
        }
        let since = *self.below_since.get_or_insert(timestamp_ms);
        if !self.fired && timestamp_ms.saturating_sub(since) >= self.dwell_ms {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.below_since = None;
        self.fired = false;
    }
}
