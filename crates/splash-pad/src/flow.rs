use std::sync::atomic::{AtomicU32, Ordering};

/// Flow meter edge counter. `record_pulse` is the only thing the interrupt
/// handler may call; the control loop calls `take` once per tick.
///
/// A pulse landing between the load and the reset inside `take` is never
/// lost (swap is atomic), but pulses counted during a tick are attributed to
/// the next one. That skew is accepted.
#[derive(Debug, Default)]
pub struct PulseCounter {
    pulses: AtomicU32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self { pulses: AtomicU32::new(0) }
    }

    pub fn record_pulse(&self) {
        self.pulses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pulses(&self, n: u32) {
        self.pulses.fetch_add(n, Ordering::Relaxed);
    }

    /// Read and reset in one step.
    pub fn take(&self) -> u32 {
        self.pulses.swap(0, Ordering::AcqRel)
    }
}
