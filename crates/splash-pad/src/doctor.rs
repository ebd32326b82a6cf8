use anyhow::Result;

use crate::{PadConfig, MAX_PRESSURE_BAR};

pub fn check_config(cfg: &PadConfig) -> Result<()> {
    anyhow::ensure!(cfg.max_rocket_volume_l > 0.0, "pad.max_rocket_volume_l must be > 0");
    anyhow::ensure!(cfg.max_rocket_volume_l <= 5.0, "pad.max_rocket_volume_l looks wrong for a bottle rocket (> 5 L)");
    anyhow::ensure!(cfg.max_pressure_bar > 1.0, "pad.max_pressure_bar must be > 1 (ambient)");
    if cfg.max_pressure_bar > MAX_PRESSURE_BAR {
        tracing::warn!("doctor: pad.max_pressure_bar {} clamped to {}", cfg.max_pressure_bar, MAX_PRESSURE_BAR);
    }
    anyhow::ensure!(cfg.liters_per_pulse > 0.0, "pad.liters_per_pulse must be > 0");
    anyhow::ensure!(cfg.clearing_delay_ms >= 500, "pad.clearing_delay_ms too short to clear the pad");
    anyhow::ensure!(
        cfg.rocket_wait_timeout_ms > cfg.clearing_delay_ms,
        "pad.rocket_wait_timeout_ms must exceed clearing_delay_ms"
    );
    anyhow::ensure!(cfg.upload_stall_timeout_ms >= 1000, "pad.upload_stall_timeout_ms should be >= 1000");
    anyhow::ensure!(cfg.log_capacity >= 1, "pad.log_capacity must be >= 1");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass() {
        check_config(&PadConfig::default()).unwrap();
    }

    #[test]
    fn zero_flow_calibration_fails() {
        let cfg = PadConfig { liters_per_pulse: 0.0, ..PadConfig::default() };
        assert!(check_config(&cfg).is_err());
    }
}
