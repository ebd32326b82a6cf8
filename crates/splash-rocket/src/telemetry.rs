use splash_proto::{FlightSample, UploadChunk};
use tracing::warn;

/// Fixed-capacity circular buffer; the oldest sample is overwritten.
#[derive(Debug, Clone)]
pub struct PrelaunchRing {
    slots: Vec<FlightSample>,
    capacity: usize,
    // index of the next write
    head: usize,
}

impl PrelaunchRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { slots: Vec::with_capacity(capacity), capacity, head: 0 }
    }

    pub fn push(&mut self, sample: FlightSample) {
        if self.slots.len() < self.capacity {
            self.slots.push(sample);
        } else {
            self.slots[self.head] = sample;
        }
        self.head = (self.head + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &FlightSample> {
        let split = if self.slots.len() < self.capacity { 0 } else { self.head };
        self.slots[split..].iter().chain(self.slots[..split].iter())
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Stored,
    /// Log full; the sample was discarded.
    Dropped,
}

/// Linear, fixed-capacity flight log. Never grows past its capacity.
#[derive(Debug, Clone)]
pub struct FlightLog {
    samples: Vec<FlightSample>,
    capacity: usize,
    dropped: usize,
}

impl FlightLog {
    pub fn new(capacity: usize) -> Self {
        Self { samples: Vec::with_capacity(capacity), capacity, dropped: 0 }
    }

    pub fn append(&mut self, sample: FlightSample) -> AppendOutcome {
        if self.samples.len() >= self.capacity {
            self.dropped += 1;
            return AppendOutcome::Dropped;
        }
        self.samples.push(sample);
        AppendOutcome::Stored
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn as_slice(&self) -> &[FlightSample] {
        &self.samples
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.dropped = 0;
    }
}

/// Pre-launch look-back ring plus the post-launch log, stitched together
/// when ascent is confirmed.
#[derive(Debug, Clone)]
pub struct TelemetryBuffer {
    ring: PrelaunchRing,
    log: FlightLog,
    promoted: bool,
}

impl TelemetryBuffer {
    pub fn new(ring_capacity: usize, log_capacity: usize) -> Self {
        Self {
            ring: PrelaunchRing::new(ring_capacity),
            log: FlightLog::new(log_capacity),
            promoted: false,
        }
    }

    pub fn record_prelaunch(&mut self, sample: FlightSample) {
        self.ring.push(sample);
    }

    /// Copy the ring, oldest first, to the head of the flight log; later
    /// appends follow right after. Only the first call per flight has an
    /// effect. Returns the number of samples copied.
    pub fn promote_to_flight_log(&mut self) -> usize {
        if self.promoted {
            warn!("telemetry: flight log already promoted");
            return 0;
        }
        self.promoted = true;
        self.log.clear();
        let mut copied = 0;
        for sample in self.ring.iter() {
            if self.log.append(*sample) == AppendOutcome::Stored {
                copied += 1;
            }
        }
        self.ring.clear();
        copied
    }

    pub fn append(&mut self, sample: FlightSample) -> AppendOutcome {
        let outcome = self.log.append(sample);
        if outcome == AppendOutcome::Dropped && self.log.dropped() == 1 {
            warn!("telemetry: flight log full at {} samples, dropping newest", self.log.capacity());
        }
        outcome
    }

    /// Everything recorded so far, in order. Nothing is removed; call
    /// [`clear`](Self::clear) once the pad has acknowledged the upload.
    pub fn drain_for_upload(&self) -> &[FlightSample] {
        self.log.as_slice()
    }

    /// The upload split into chunks of at most `chunk_samples`. An empty
    /// log still yields one (empty) chunk so the pad learns the total.
    pub fn upload_chunks(&self, chunk_samples: usize) -> Vec<UploadChunk> {
        let samples = self.drain_for_upload();
        let total = samples.len();
        if total == 0 {
            return vec![UploadChunk { offset: 0, total: 0, samples: Vec::new() }];
        }
        samples
            .chunks(chunk_samples.max(1))
            .enumerate()
            .map(|(i, part)| UploadChunk {
                offset: i * chunk_samples.max(1),
                total,
                samples: part.to_vec(),
            })
            .collect()
    }

    pub fn ring(&self) -> &PrelaunchRing {
        &self.ring
    }

    pub fn flight_log(&self) -> &FlightLog {
        &self.log
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        self.log.clear();
        self.promoted = false;
    }
}
