//! Command surface for the front-end layers: operator commands as a typed
//! enum, rocket requests as raw endpoint + JSON body.

use serde::{Deserialize, Serialize};
use serde_json::json;
use splash_link::{Endpoint, Response};
use splash_proto::{FlightRecord, LaunchpadState, LogLine, RocketIdentity, RocketState, UploadChunk};
use tracing::debug;

use crate::error::PadError;
use crate::events::EventSink;
use crate::hardware::PadActuators;
use crate::sequencer::{LaunchpadSequencer, PadStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum PadCommand {
    StartFilling { volume: f32, pressure: f32 },
    Launch,
    Abort,
    ReturnToIdle,
    SkipWaterFilling,
    SkipPressurizing,
    OpenFairing,
    CloseFairing,
    GetState,
    GetRocketState,
    GetWaterVolume,
    GetPressure,
    GetRocketVolume,
    GetRocketReadiness,
    GetLogs,
    GetStatus,
    ListFlights,
    GetFlight { id: u64 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum PadReply {
    Done,
    State(LaunchpadState),
    RocketState(Option<RocketState>),
    Quantity(f32),
    Flag(bool),
    Logs(Vec<LogLine>),
    Status(PadStatus),
    Flights(Vec<u64>),
    Flight(FlightRecord),
}

pub fn dispatch<A: PadActuators, S: EventSink>(
    seq: &mut LaunchpadSequencer<A, S>,
    command: PadCommand,
) -> Result<PadReply, PadError> {
    debug!("api: {:?}", command);
    let reply = match command {
        PadCommand::StartFilling { volume, pressure } => {
            seq.request_start_filling(volume, pressure)?;
            PadReply::Done
        }
        PadCommand::Launch => {
            seq.request_launch()?;
            PadReply::Done
        }
        PadCommand::Abort => {
            seq.request_abort()?;
            PadReply::Done
        }
        PadCommand::ReturnToIdle => {
            seq.request_return_to_idle()?;
            PadReply::Done
        }
        PadCommand::SkipWaterFilling => {
            seq.skip_water_filling()?;
            PadReply::Done
        }
        PadCommand::SkipPressurizing => {
            seq.skip_pressurizing()?;
            PadReply::Done
        }
        PadCommand::OpenFairing => {
            seq.open_fairing()?;
            PadReply::Done
        }
        PadCommand::CloseFairing => {
            seq.close_fairing()?;
            PadReply::Done
        }
        PadCommand::GetState => PadReply::State(seq.state()),
        PadCommand::GetRocketState => PadReply::RocketState(seq.rocket().state),
        PadCommand::GetWaterVolume => PadReply::Quantity(seq.water_volume()),
        PadCommand::GetPressure => PadReply::Quantity(seq.pressure()),
        PadCommand::GetRocketVolume => PadReply::Quantity(seq.rocket_volume()),
        PadCommand::GetRocketReadiness => PadReply::Flag(seq.rocket_readiness()),
        PadCommand::GetLogs => PadReply::Logs(seq.logs()),
        PadCommand::GetStatus => PadReply::Status(seq.status()),
        PadCommand::ListFlights => PadReply::Flights(seq.list_flights()?),
        PadCommand::GetFlight { id } => PadReply::Flight(seq.get_flight(id)?),
    };
    Ok(reply)
}

fn error_response(err: &PadError) -> Response {
    let body = json!({ "status": "error", "message": err.to_string() });
    Response::new(err.status_code(), body.to_string())
}

fn ok_response(body: serde_json::Value) -> Response {
    Response::new(200, body.to_string())
}

fn decode<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, PadError> {
    serde_json::from_slice(body).map_err(|e| PadError::InvalidParameter(format!("malformed body: {}", e)))
}

/// Serve one request from the rocket. Never fails: errors become a JSON
/// body `{"status": "error", "message": ...}` with a matching status code.
pub fn handle_rocket_request<A: PadActuators, S: EventSink>(
    seq: &mut LaunchpadSequencer<A, S>,
    endpoint: Endpoint,
    body: &[u8],
) -> Response {
    let result = match endpoint {
        Endpoint::IdentifyRocket => decode::<RocketIdentity>(body).map(|id| {
            seq.identify_rocket(id);
            json!({ "status": "ok", "state": seq.state() })
        }),
        Endpoint::RocketState => decode::<RocketState>(body).map(|state| {
            seq.report_rocket_state(state);
            json!({ "status": "ok" })
        }),
        Endpoint::UploadFlightData => decode::<UploadChunk>(body)
            .and_then(|chunk| seq.upload_flight_data(chunk))
            .map(|ack| json!(ack)),
    };
    match result {
        Ok(body) => ok_response(body),
        Err(e) => error_response(&e),
    }
}
