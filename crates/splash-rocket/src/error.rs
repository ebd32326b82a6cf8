use splash_proto::RocketState;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RocketError {
    #[error("illegal transition {from} -> {to}")]
    SequenceViolation { from: RocketState, to: RocketState },

    #[error("sensor: {0}")]
    SensorFailure(String),

    #[error("network unavailable")]
    NetworkUnavailable,

    #[error("pad link: {0}")]
    TransportFailure(String),

    #[error("{event} ignored in state {state}")]
    InvalidState { event: &'static str, state: RocketState },
}

impl From<splash_link::TransportError> for RocketError {
    fn from(e: splash_link::TransportError) -> Self {
        RocketError::TransportFailure(e.to_string())
    }
}
