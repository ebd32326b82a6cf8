use splash_proto::LaunchpadState;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PadError {
    #[error("{command} refused in state {state}")]
    InvalidState { command: &'static str, state: LaunchpadState },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("illegal transition {from} -> {to}; sequence aborted")]
    SequenceViolation { from: LaunchpadState, to: LaunchpadState },

    #[error("rocket link: {0}")]
    TransportFailure(String),

    #[error("no flight recorded at {0}")]
    UnknownFlight(u64),

    #[error("flight archive: {0}")]
    Archive(String),
}

impl PadError {
    /// Status code an HTTP front-end should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            PadError::InvalidState { .. } => 409,
            PadError::InvalidParameter(_) => 400,
            PadError::UnknownFlight(_) => 404,
            PadError::SequenceViolation { .. } | PadError::TransportFailure(_) | PadError::Archive(_) => 500,
        }
    }
}
