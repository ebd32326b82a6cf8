#![allow(dead_code)]

use splash_link::{Endpoint, Link, Response, RetryPolicy, Transport, TransportError};
use splash_proto::messages::UploadAck;
use splash_proto::{FairingPosition, FlightSample, LaunchpadEvent, LaunchpadState, RocketState, UploadChunk};
use splash_rocket::hardware::RecordingActuators;
use splash_rocket::{Network, RocketConfig, RocketError, RocketSequencer, Sensors};

#[derive(Debug, Default)]
pub struct FakeSensors {
    pub altitude_m: f32,
    pub broken: bool,
}

impl Sensors for FakeSensors {
    fn init(&mut self) -> Result<(), RocketError> {
        if self.broken {
            return Err(RocketError::SensorFailure("barometer not found".into()));
        }
        Ok(())
    }

    fn read_pressure(&mut self) -> f32 {
        1.013
    }

    fn read_altitude(&mut self) -> f32 {
        self.altitude_m
    }

    fn read_temperature(&mut self) -> f32 {
        21.0
    }

    fn read_acceleration(&mut self) -> [f32; 3] {
        [0.0, 0.0, 9.81]
    }

    fn read_gyro(&mut self) -> [f32; 3] {
        [0.0; 3]
    }
}

#[derive(Debug)]
pub struct FakeNetwork {
    pub up: bool,
    pub joins: u32,
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self { up: true, joins: 0 }
    }
}

impl Network for FakeNetwork {
    fn join(&mut self) -> Result<(), RocketError> {
        self.joins += 1;
        if self.up {
            Ok(())
        } else {
            Err(RocketError::NetworkUnavailable)
        }
    }

    fn is_connected(&self) -> bool {
        self.up
    }
}

/// Minimal pad: acks everything and keeps the uploaded samples.
#[derive(Debug, Default)]
pub struct PadStub {
    pub requests: Vec<Endpoint>,
    pub states: Vec<RocketState>,
    pub received: Vec<FlightSample>,
    pub refuse_uploads: bool,
    pub unreachable: bool,
}

impl Transport for PadStub {
    fn send_command(&mut self, endpoint: Endpoint, payload: &[u8]) -> Result<Response, TransportError> {
        self.requests.push(endpoint);
        if self.unreachable {
            return Err(TransportError::Unreachable("no route to pad".into()));
        }
        match endpoint {
            Endpoint::IdentifyRocket => Ok(Response::new(200, r#"{"status":"ok"}"#)),
            Endpoint::RocketState => {
                let state: RocketState =
                    serde_json::from_slice(payload).map_err(|e| TransportError::Encoding(e.to_string()))?;
                self.states.push(state);
                Ok(Response::new(200, r#"{"status":"ok"}"#))
            }
            Endpoint::UploadFlightData => {
                if self.refuse_uploads {
                    return Ok(Response::new(409, r#"{"status":"error","message":"busy"}"#));
                }
                let chunk: UploadChunk =
                    serde_json::from_slice(payload).map_err(|e| TransportError::Encoding(e.to_string()))?;
                let end = chunk.end().unwrap();
                self.received.extend(chunk.samples);
                let ack = UploadAck { received: end, total: chunk.total };
                Ok(Response::new(200, serde_json::to_vec(&ack).unwrap()))
            }
        }
    }
}

pub type Rocket = RocketSequencer<FakeSensors, RecordingActuators, FakeNetwork, PadStub>;

pub fn rocket(config: RocketConfig) -> Rocket {
    let link = Link::new(PadStub::default(), RetryPolicy { attempts: 3, delay_ms: 0 }).with_sleep(|_| {});
    RocketSequencer::new(
        config,
        FakeSensors { altitude_m: 100.0, broken: false },
        RecordingActuators::default(),
        FakeNetwork::default(),
        link,
    )
}

/// Initialized, fairing closed, armed by the pad.
pub fn armed(config: RocketConfig) -> Rocket {
    let mut r = rocket(config);
    r.initialize(0);
    r.on_launchpad_event(LaunchpadEvent::FairingCommand(FairingPosition::Closed)).unwrap();
    r.on_launchpad_event(LaunchpadEvent::PadStateChanged(LaunchpadState::ReadyForLaunch)).unwrap();
    assert_eq!(r.state(), RocketState::WaitingForLaunch);
    r
}

pub fn at(ts: u64, alt: f32) -> FlightSample {
    FlightSample { timestamp: ts, relative_altitude: alt, ..Default::default() }
}
