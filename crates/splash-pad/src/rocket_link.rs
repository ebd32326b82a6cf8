use serde::Serialize;
use splash_proto::messages::UploadAck;
use splash_proto::{FlightSample, LaunchpadState, PadEvent, RocketIdentity, RocketState, UploadChunk};

use crate::error::PadError;
use crate::events::EventSink;
use crate::hardware::PadActuators;
use crate::sequencer::LaunchpadSequencer;

/// What the pad knows about the rocket on the other end of the link.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RocketLinkStatus {
    pub identity: Option<RocketIdentity>,
    pub state: Option<RocketState>,
    pub last_seen_ms: Option<u64>,
}

impl RocketLinkStatus {
    pub fn is_ready(&self) -> bool {
        self.state == Some(RocketState::WaitingForLaunch)
    }

    pub fn seen(&mut self, now_ms: u64) {
        self.last_seen_ms = Some(now_ms);
    }
}

/// Outcome of feeding one chunk to an [`UploadSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Appended,
    /// Already held (a retried send after a lost ack).
    Duplicate,
}

/// Reassembles a chunked flight-log upload.
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    total: Option<usize>,
    samples: Vec<FlightSample>,
    pub last_chunk_ms: u64,
}

impl UploadSession {
    pub fn new(now_ms: u64) -> Self {
        Self { total: None, samples: Vec::new(), last_chunk_ms: now_ms }
    }

    pub fn accept(&mut self, chunk: UploadChunk, now_ms: u64) -> Result<ChunkOutcome, PadError> {
        let end = chunk.end().ok_or_else(|| {
            PadError::InvalidParameter(format!("chunk offset {} out of range", chunk.offset))
        })?;
        if end > chunk.total {
            return Err(PadError::InvalidParameter(format!(
                "chunk {}..{} exceeds declared total {}",
                chunk.offset, end, chunk.total
            )));
        }
        match self.total {
            Some(total) if total != chunk.total => {
                return Err(PadError::InvalidParameter(format!(
                    "declared total changed from {} to {}",
                    total, chunk.total
                )));
            }
            _ => {}
        }

        let received = self.samples.len();
        if chunk.offset > received {
            return Err(PadError::InvalidParameter(format!(
                "chunk starts at {} but only {} samples received",
                chunk.offset, received
            )));
        }

        self.total = Some(chunk.total);
        self.last_chunk_ms = now_ms;

        if end <= received {
            return Ok(ChunkOutcome::Duplicate);
        }
        // partial overlap: keep only the new tail
        let skip = received - chunk.offset;
        self.samples.extend(chunk.samples.into_iter().skip(skip));
        Ok(ChunkOutcome::Appended)
    }

    pub fn received(&self) -> usize {
        self.samples.len()
    }

    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// 0.0 until the first chunk, 1.0 once everything declared has arrived.
    pub fn progress(&self) -> f32 {
        match self.total {
            None => 0.0,
            Some(0) => 1.0,
            Some(total) => (self.samples.len() as f32 / total as f32).min(1.0),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.total, Some(total) if self.samples.len() >= total)
    }

    pub fn into_samples(self) -> Vec<FlightSample> {
        self.samples
    }
}

impl<A: PadActuators, S: EventSink> LaunchpadSequencer<A, S> {
    /// Handshake sent by the rocket after it joins the network. While the
    /// pad is waiting for the rocket this is the "link detected" condition.
    pub fn identify_rocket(&mut self, identity: RocketIdentity) {
        self.rocket.seen(self.uptime_ms);
        if self.state == LaunchpadState::WaitingForRocket {
            self.rocket_contact = true;
        }
        self.log(format!("rocket: {} (firmware {}) identified", identity.name, identity.firmware));
        self.rocket.identity = Some(identity);
    }

    pub fn report_rocket_state(&mut self, state: RocketState) {
        self.rocket.seen(self.uptime_ms);
        if self.rocket.state != Some(state) {
            self.log(format!("rocket: state {}", state));
        }
        self.rocket.state = Some(state);
        self.sink.broadcast(&PadEvent::NewRocketState { state });
    }

    pub fn rocket_readiness(&self) -> bool {
        self.rocket.is_ready()
    }

    /// Ingest one chunk of the flight log. The first chunk while waiting
    /// for the rocket moves the pad to `ReceivingData`; completion is
    /// picked up by the next `tick`.
    pub fn upload_flight_data(&mut self, chunk: UploadChunk) -> Result<UploadAck, PadError> {
        match self.state {
            LaunchpadState::WaitingForRocket => {
                self.rocket_contact = true;
                self.transition_to(LaunchpadState::ReceivingData, "flight data incoming")?;
            }
            LaunchpadState::ReceivingData => {}
            LaunchpadState::ReceivedData => return self.ack_archived(&chunk),
            state => {
                return Err(self.reject(PadError::InvalidState { command: "upload-flight-data", state }));
            }
        }
        self.rocket.seen(self.uptime_ms);

        let now = self.uptime_ms;
        let session = self.upload.get_or_insert_with(|| UploadSession::new(now));
        let outcome = session.accept(chunk, now);
        let (received, total, progress) = (session.received(), session.total().unwrap_or(0), session.progress());

        match outcome {
            Ok(ChunkOutcome::Appended) => {
                self.sink.broadcast(&PadEvent::ReceivingData { percentage: progress * 100.0 });
            }
            Ok(ChunkOutcome::Duplicate) => {
                self.log(format!("upload: duplicate chunk ignored ({}/{})", received, total));
            }
            Err(e) => return Err(self.reject(e)),
        }
        Ok(UploadAck { received, total })
    }

    /// A chunk resent after the pad archived the flight (its ack was lost)
    /// is acknowledged in full. Anything else is out of sequence.
    fn ack_archived(&mut self, chunk: &UploadChunk) -> Result<UploadAck, PadError> {
        match self.archived_total {
            Some(total) if chunk.total == total && chunk.end().is_some_and(|end| end <= total) => {
                self.rocket.seen(self.uptime_ms);
                self.log(format!("upload: resent chunk after archive acknowledged ({}/{})", total, total));
                Ok(UploadAck { received: total, total })
            }
            _ => Err(self.reject(PadError::InvalidState {
                command: "upload-flight-data",
                state: LaunchpadState::ReceivedData,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(offset: usize, len: usize, total: usize) -> UploadChunk {
        let samples = (offset..offset + len)
            .map(|i| FlightSample { timestamp: i as u64, ..Default::default() })
            .collect();
        UploadChunk { offset, total, samples }
    }

    #[test]
    fn assembles_in_order() {
        let mut s = UploadSession::new(0);
        assert_eq!(s.progress(), 0.0);
        assert_eq!(s.accept(chunk(0, 4, 10), 5).unwrap(), ChunkOutcome::Appended);
        assert!((s.progress() - 0.4).abs() < 1e-6);
        s.accept(chunk(4, 6, 10), 9).unwrap();
        assert!(s.is_complete());
        assert_eq!(s.last_chunk_ms, 9);
        let ts: Vec<u64> = s.into_samples().iter().map(|x| x.timestamp).collect();
        assert_eq!(ts, (0..10).collect::<Vec<u64>>());
    }

    #[test]
    fn resent_chunk_is_not_duplicated() {
        let mut s = UploadSession::new(0);
        s.accept(chunk(0, 5, 10), 0).unwrap();
        assert_eq!(s.accept(chunk(0, 5, 10), 1).unwrap(), ChunkOutcome::Duplicate);
        assert_eq!(s.received(), 5);
        s.accept(chunk(3, 4, 10), 2).unwrap();
        assert_eq!(s.received(), 7);
    }

    #[test]
    fn gaps_and_bad_totals_are_rejected() {
        let mut s = UploadSession::new(0);
        assert!(s.accept(chunk(2, 2, 10), 0).is_err());
        s.accept(chunk(0, 2, 10), 0).unwrap();
        assert!(s.accept(chunk(2, 2, 12), 0).is_err());
        assert!(s.accept(UploadChunk { offset: 2, total: 3, samples: chunk(2, 2, 4).samples }, 0).is_err());
        assert_eq!(s.received(), 2);
    }

    #[test]
    fn wrapping_offset_is_rejected() {
        let mut s = UploadSession::new(0);
        let c = UploadChunk { offset: usize::MAX, total: 1, samples: chunk(0, 1, 1).samples };
        assert!(matches!(s.accept(c, 0), Err(PadError::InvalidParameter(_))));
        assert_eq!(s.received(), 0);
        assert_eq!(s.total(), None);
    }

    #[test]
    fn empty_flight_is_complete_immediately() {
        let mut s = UploadSession::new(0);
        s.accept(UploadChunk { offset: 0, total: 0, samples: vec![] }, 0).unwrap();
        assert!(s.is_complete());
        assert_eq!(s.progress(), 1.0);
    }
}
