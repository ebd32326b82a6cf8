use anyhow::Result;

use crate::RetryPolicy;

pub fn check_retry(policy: &RetryPolicy) -> Result<()> {
    anyhow::ensure!(policy.attempts >= 1, "retry.attempts must be >= 1");
    anyhow::ensure!(policy.attempts <= 20, "retry.attempts too high; a stalled link would block the loop");
    anyhow::ensure!(policy.delay_ms <= 10_000, "retry.delay_ms should be <= 10000");
    Ok(())
}
