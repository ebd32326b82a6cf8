pub mod log;
pub mod messages;
pub mod sample;
pub mod state;
pub mod telemetry;

pub use log::{LogLine, LogRing};
pub use messages::{FlightRecord, LaunchParameters, RocketIdentity, UploadChunk};
pub use sample::FlightSample;
pub use state::{FairingPosition, LaunchpadState, RocketState};
pub use telemetry::{LaunchpadEvent, PadEvent};
