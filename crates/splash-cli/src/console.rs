//! Operator console: one command per line, either the short form
//! (`fill 1.2 6`, `launch`, ...) or the JSON wire form of a pad command.

use anyhow::{bail, ensure, Context, Result};
use splash_pad::api::PadCommand;
use splash_pad::EventSink;
use splash_proto::{LaunchpadState, PadEvent};
use tracing::{debug, warn};

pub const HELP: &str = "\
commands:
  fill <litres> <bar>   start filling
  launch | abort | idle
  skip-water | skip-pressure
  open | close          fairing
  state | rocket | ready | volume | pressure | water
  status | logs | flights | flight <id>
  {\"command\": ...}      JSON form";

/// Observer sink for the binary: pad events go to the debug log, visited
/// states are kept for the end-of-run summary.
#[derive(Debug, Default)]
pub struct TraceSink {
    pub states: Vec<LaunchpadState>,
}

impl EventSink for TraceSink {
    fn broadcast(&mut self, event: &PadEvent) {
        if let PadEvent::NewLaunchpadState { state } = event {
            if self.states.last() != Some(state) {
                self.states.push(*state);
            }
        }
        match serde_json::to_string(event) {
            Ok(json) => debug!("event: {}", json),
            Err(e) => warn!("event: encode failed: {}", e),
        }
    }
}

fn number(word: Option<&str>, what: &str) -> Result<f32> {
    let word = word.with_context(|| format!("missing {}", what))?;
    word.parse().with_context(|| format!("bad {}: {}", what, word))
}

pub fn parse_command(line: &str) -> Result<PadCommand> {
    let line = line.trim();
    if line.starts_with('{') {
        return serde_json::from_str(line).context("parse json command");
    }

    let mut words = line.split_whitespace();
    let verb = words.next().context("empty command")?;
    let cmd = match verb {
        "fill" => {
            let volume = number(words.next(), "volume")?;
            let pressure = number(words.next(), "pressure")?;
            PadCommand::StartFilling { volume, pressure }
        }
        "launch" => PadCommand::Launch,
        "abort" => PadCommand::Abort,
        "idle" => PadCommand::ReturnToIdle,
        "skip-water" => PadCommand::SkipWaterFilling,
        "skip-pressure" => PadCommand::SkipPressurizing,
        "open" => PadCommand::OpenFairing,
        "close" => PadCommand::CloseFairing,
        "state" => PadCommand::GetState,
        "rocket" => PadCommand::GetRocketState,
        "ready" => PadCommand::GetRocketReadiness,
        "volume" => PadCommand::GetRocketVolume,
        "pressure" => PadCommand::GetPressure,
        "water" => PadCommand::GetWaterVolume,
        "status" => PadCommand::GetStatus,
        "logs" => PadCommand::GetLogs,
        "flights" => PadCommand::ListFlights,
        "flight" => {
            let id = words.next().context("flight needs an id")?;
            PadCommand::GetFlight { id: id.parse().with_context(|| format!("bad flight id: {}", id))? }
        }
        other => bail!("unknown command: {}", other),
    };
    ensure!(words.next().is_none(), "too many arguments for {}", verb);
    Ok(cmd)
}
