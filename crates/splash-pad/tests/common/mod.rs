#![allow(dead_code)]

use splash_pad::events::VecSink;
use splash_pad::hardware::RecordingActuators;
use splash_pad::{FlightArchive, LaunchpadSequencer, MemoryArchive, PadConfig};
use splash_proto::LaunchpadState::{self, *};
use splash_proto::{FlightSample, UploadChunk};

pub type Pad = LaunchpadSequencer<RecordingActuators, VecSink>;

pub fn pad(config: PadConfig) -> Pad {
    pad_with_archive(config, Box::new(MemoryArchive::default()))
}

pub fn pad_with_archive(config: PadConfig, archive: Box<dyn FlightArchive>) -> Pad {
    LaunchpadSequencer::new(config, RecordingActuators::default(), VecSink::default(), archive)
}

pub fn chunk(offset: usize, len: usize, total: usize) -> UploadChunk {
    UploadChunk {
        offset,
        total,
        samples: (offset..offset + len)
            .map(|i| FlightSample {
                timestamp: 1000 + i as u64 * 20,
                relative_altitude: i as f32,
                ..Default::default()
            })
            .collect(),
    }
}

/// Take the shortest path one state forward.
pub fn advance(p: &mut Pad) {
    match p.state() {
        Idle => {
            p.request_start_filling(1.0, 5.0).unwrap();
        }
        WaterFilling => {
            p.skip_water_filling().unwrap();
        }
        Pressurizing => {
            p.skip_pressurizing().unwrap();
        }
        ReadyForLaunch => {
            p.request_launch().unwrap();
        }
        Launching => {
            let delay = p.config().clearing_delay_ms;
            p.tick(delay, 1.0, 0);
        }
        WaitingForRocket => {
            p.upload_flight_data(chunk(0, 2, 4)).unwrap();
        }
        ReceivingData => {
            p.upload_flight_data(chunk(2, 2, 4)).unwrap();
            p.tick(10, 1.0, 0);
        }
        ReceivedData => panic!("no forward move from RECEIVED_DATA"),
    }
}

pub fn drive_to(p: &mut Pad, target: LaunchpadState) {
    while p.state() != target {
        advance(p);
    }
}
