pub mod config;
pub mod detectors;
pub mod doctor;
pub mod error;
pub mod hardware;
pub mod sequencer;
pub mod telemetry;
pub mod transitions;

pub use config::RocketConfig;
pub use detectors::{ApogeeDetector, LandingDetector, LaunchDetector};
pub use error::RocketError;
pub use hardware::{Network, RocketActuators, Sensors};
pub use sequencer::{Readiness, RocketSequencer};
pub use telemetry::{AppendOutcome, FlightLog, PrelaunchRing, TelemetryBuffer};
