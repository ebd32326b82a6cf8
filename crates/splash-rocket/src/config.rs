use serde::Deserialize;
use splash_link::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RocketConfig {
    /// Reported to the pad in the identification handshake.
    pub name: String,

    pub fast_sample_interval_ms: u64,
    pub slow_sample_interval_ms: u64,

    /// How much pre-launch history is prepended to the flight log.
    pub prelaunch_window_ms: u64,
    pub flight_log_capacity: usize,

    pub launch_altitude_m: f32,
    /// Number of vertical-speed estimates averaged by the apogee detector.
    pub apogee_window: usize,
    pub apogee_min_altitude_m: f32,
    pub parachute_altitude_m: f32,
    pub landing_altitude_m: f32,
    pub landing_dwell_ms: u64,
    pub max_ascending_ms: u64,
    /// Disarm on our own if the pad never launches or never says it aborted.
    pub max_armed_ms: u64,

    pub reconnect_interval_ms: u64,
    pub upload_chunk_samples: usize,
    pub retry: RetryPolicy,

    pub log_capacity: usize,
}

impl Default for RocketConfig {
    fn default() -> Self {
        Self {
            name: "splash-1".to_string(),
            fast_sample_interval_ms: 20,
            slow_sample_interval_ms: 100,
            prelaunch_window_ms: 2000,
            flight_log_capacity: 4000,
            launch_altitude_m: 2.0,
            apogee_window: 5,
            apogee_min_altitude_m: 5.0,
            parachute_altitude_m: 15.0,
            landing_altitude_m: 1.0,
            landing_dwell_ms: 3000,
            max_ascending_ms: 10_000,
            max_armed_ms: 600_000,
            reconnect_interval_ms: 500,
            upload_chunk_samples: 200,
            retry: RetryPolicy::default(),
            log_capacity: 200,
        }
    }
}

impl RocketConfig {
    /// Ring slots needed to hold `prelaunch_window_ms` of fast-rate samples.
    pub fn prelaunch_capacity(&self) -> usize {
        let per = self.fast_sample_interval_ms.max(1);
        ((self.prelaunch_window_ms / per) as usize).max(1)
    }
}
