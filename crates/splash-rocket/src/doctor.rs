use anyhow::Result;

use crate::config::RocketConfig;

pub fn check_config(cfg: &RocketConfig) -> Result<()> {
    anyhow::ensure!(!cfg.name.trim().is_empty(), "rocket.name must not be empty");
    anyhow::ensure!(cfg.fast_sample_interval_ms >= 1, "rocket.fast_sample_interval_ms must be >= 1");
    anyhow::ensure!(
        cfg.slow_sample_interval_ms >= cfg.fast_sample_interval_ms,
        "rocket.slow_sample_interval_ms must not be faster than the fast rate"
    );
    anyhow::ensure!(
        cfg.flight_log_capacity > cfg.prelaunch_capacity(),
        "rocket.flight_log_capacity ({}) must exceed the pre-launch ring ({})",
        cfg.flight_log_capacity,
        cfg.prelaunch_capacity()
    );
    anyhow::ensure!(cfg.launch_altitude_m > 0.0, "rocket.launch_altitude_m must be > 0");
    anyhow::ensure!(cfg.apogee_window >= 2, "rocket.apogee_window should average at least 2 estimates");
    anyhow::ensure!(
        cfg.landing_altitude_m < cfg.parachute_altitude_m,
        "rocket.landing_altitude_m must be below parachute_altitude_m"
    );
    anyhow::ensure!(cfg.landing_dwell_ms >= cfg.slow_sample_interval_ms, "rocket.landing_dwell_ms shorter than one sample");
    anyhow::ensure!(cfg.max_ascending_ms >= 1000, "rocket.max_ascending_ms should be >= 1000");
    anyhow::ensure!(
        cfg.max_armed_ms > cfg.prelaunch_window_ms,
        "rocket.max_armed_ms must exceed the pre-launch window"
    );
    anyhow::ensure!(cfg.upload_chunk_samples >= 1, "rocket.upload_chunk_samples must be >= 1");
    splash_link::doctor::check_retry(&cfg.retry)?;
    Ok(())
}
