mod console;
mod cycle;
mod sim;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use splash_pad::{api, CsvArchive, FlightArchive, LaunchpadSequencer, MemoryArchive, PadConfig};
use splash_proto::{FlightRecord, FlightSample, LaunchpadState};
use splash_rocket::RocketConfig;

use console::{parse_command, TraceSink, HELP};
use cycle::{Cycle, CycleReport};
use sim::{PadRig, RigActuators, SimCfg};

/// Control loop period of the interactive pad.
const PAD_TICK_MS: u64 = 50;

#[derive(Debug, Parser)]
#[command(name = "splash", version, about = "Water rocket launchpad and flight sequencer")]
struct Cli {
    #[arg(long, default_value = "splash.toml")]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration.
    Doctor,
    /// Run one complete launch cycle against the simulated rig and rocket.
    Sim {
        #[arg(long)]
        seed: Option<u64>,
        /// Water to load, litres.
        #[arg(long)]
        volume: Option<f32>,
        /// Target pressure, bar.
        #[arg(long)]
        pressure: Option<f32>,
    },
    /// Interactive pad on the simulated rig; commands are read from stdin.
    Pad,
    Flights {
        #[command(subcommand)]
        cmd: FlightsCmd,
    },
}

#[derive(Debug, Subcommand)]
enum FlightsCmd {
    List,
    /// Print one flight as CSV.
    Show { id: u64 },
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    pad: PadConfig,
    rocket: RocketConfig,
    sim: Option<SimCfg>,
    archive: Option<ArchiveCfg>,
}

#[derive(Debug, serde::Deserialize)]
struct ArchiveCfg {
    dir: String,
}

fn load_config(path: &str) -> Result<Config> {
    if !Path::new(path).exists() {
        warn!("config: {} not found, using defaults", path);
        return Ok(Config::default());
    }
    let s = std::fs::read_to_string(path).context("read config")?;
    toml::from_str(&s).context("parse config toml")
}

/// Wall clock at boot, used to key archived flights across reboots.
fn epoch_offset_ms() -> u64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or(0)
}

fn open_archive(cfg: &Config) -> Result<Box<dyn FlightArchive>> {
    match &cfg.archive {
        Some(a) => {
            let archive = CsvArchive::open(&a.dir).with_context(|| format!("open archive {}", a.dir))?;
            info!("archive: {}", archive.dir().display());
            Ok(Box::new(archive))
        }
        None => {
            warn!("archive: no [archive] section, flights are kept in memory only");
            Ok(Box::new(MemoryArchive::default()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg).await?,
        Command::Sim { seed, volume, pressure } => {
            let mut sim = cfg.sim.clone().unwrap_or_default();
            sim.seed = seed.unwrap_or(sim.seed);
            sim.volume_l = volume.unwrap_or(sim.volume_l);
            sim.pressure_bar = pressure.unwrap_or(sim.pressure_bar);
            run_sim(&cfg, &sim).await?
        }
        Command::Pad => pad(&cfg).await?,
        Command::Flights { cmd } => flights(&cfg, cmd).await?,
    }
    Ok(())
}

async fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    splash_pad::doctor::check_config(&cfg.pad)?;
    splash_rocket::doctor::check_config(&cfg.rocket)?;

    if let Some(a) = &cfg.archive {
        anyhow::ensure!(!a.dir.trim().is_empty(), "archive.dir must not be empty");
        CsvArchive::open(&a.dir).with_context(|| format!("archive.dir {} not usable", a.dir))?;
    } else {
        warn!("doctor: no [archive] section, flights will not survive a restart");
    }

    if let Some(sim) = &cfg.sim {
        anyhow::ensure!(sim.step_ms >= 1, "sim.step_ms must be >= 1");
        anyhow::ensure!(
            sim.step_ms <= cfg.rocket.fast_sample_interval_ms,
            "sim.step_ms coarser than the rocket's fast sample interval"
        );
        anyhow::ensure!(sim.fill_rate_lps > 0.0, "sim.fill_rate_lps must be > 0");
        anyhow::ensure!(sim.compressor_bar_per_s > 0.0, "sim.compressor_bar_per_s must be > 0");
        anyhow::ensure!((0.0..1.0).contains(&sim.link_drop_rate), "sim.link_drop_rate must be in [0, 1)");
        anyhow::ensure!((0.0..1.0).contains(&sim.join_failure_rate), "sim.join_failure_rate must be in [0, 1)");
        if sim.volume_l > cfg.pad.max_rocket_volume_l || sim.pressure_bar > cfg.pad.pressure_limit() {
            warn!("doctor: sim launch parameters exceed the pad limits, the pad will refuse them");
        }
    }

    info!("doctor: OK");
    Ok(())
}

async fn run_sim(cfg: &Config, sim: &SimCfg) -> Result<()> {
    info!("sim: starting (seed {})", sim.seed);
    let mut cycle = Cycle::new(&cfg.pad, &cfg.rocket, sim, open_archive(cfg)?, epoch_offset_ms())?;
    let step = Duration::from_millis(sim.step_ms.max(1));

    loop {
        match cycle.step() {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => {
                if let Err(abort) = cycle.abort() {
                    warn!("sim: abort after failure refused: {}", abort);
                }
                return Err(e);
            }
        }
        if sim.realtime {
            tokio::time::sleep(step).await;
        } else if cycle.now_ms() % 1000 == 0 {
            tokio::task::yield_now().await;
        }
    }

    print_report(&cycle.report()?);
    Ok(())
}

fn print_report(report: &CycleReport) {
    let pad: Vec<&str> = report.pad_states.iter().map(|s| s.as_str()).collect();
    let rocket: Vec<&str> = report.rocket_states.iter().map(|s| s.as_str()).collect();
    println!("pad:    {}", pad.join(" -> "));
    println!("rocket: {}", rocket.join(" -> "));
    println!("sim time {:.1} s, {} requests lost", report.elapsed_ms as f32 / 1000.0, report.dropped_requests);
    println!("true apex {:.1} m", report.apex_m);
    match &report.flight {
        Some(f) => println!("{}", summary(f)),
        None => println!("no flight archived"),
    }
}

fn summary(f: &FlightRecord) -> String {
    let params = f
        .parameters
        .map(|p| format!("{:.2} L @ {:.2} bar", p.water_volume, p.pressure))
        .unwrap_or_else(|| "unknown parameters".to_string());
    format!(
        "flight {}: {} samples, {:.1} s, max altitude {:.1} m, {}",
        f.launch_timestamp,
        f.samples.len(),
        f.duration_ms() as f32 / 1000.0,
        f.max_altitude().unwrap_or(0.0),
        params
    )
}

async fn pad(cfg: &Config) -> Result<()> {
    info!("pad: starting");
    let sim = cfg.sim.clone().unwrap_or_default();
    let mut seq =
        LaunchpadSequencer::new(cfg.pad.clone(), RigActuators::default(), TraceSink::default(), open_archive(cfg)?)
            .with_epoch_offset(epoch_offset_ms());
    let mut rig = PadRig::new(&sim, cfg.pad.liters_per_pulse);

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(PAD_TICK_MS));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if rig.step(PAD_TICK_MS, seq.actuators()).is_some() {
                    info!("pad: rocket away");
                }
                seq.tick(PAD_TICK_MS, rig.read_pressure(), rig.take_pulses());
                for event in seq.drain_rocket_events() {
                    debug!("pad: no rocket attached, {:?} not delivered", event);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else {
                    info!("pad: stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let reply = parse_command(&line).and_then(|cmd| Ok(api::dispatch(&mut seq, cmd)?));
                match reply {
                    Ok(reply) => println!("{}", serde_json::to_string_pretty(&reply)?),
                    Err(e) => println!("error: {:#}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("pad: interrupted");
                break;
            }
        }
    }

    if seq.state() != LaunchpadState::Idle {
        seq.request_abort()?;
    }
    info!("pad: stopped in {} (water {:.2} L in rig)", seq.state(), rig.water_l());
    Ok(())
}

async fn flights(cfg: &Config, cmd: FlightsCmd) -> Result<()> {
    let dir = &cfg.archive.as_ref().context("no [archive] config section")?.dir;
    let archive = CsvArchive::open(dir).with_context(|| format!("open archive {}", dir))?;

    match cmd {
        FlightsCmd::List => {
            let ids = archive.list()?;
            if ids.is_empty() {
                println!("no flights in {}", dir);
            }
            for id in ids {
                match archive.get(id) {
                    Ok(f) => println!("{}", summary(&f)),
                    Err(e) => println!("flight {}: unreadable ({})", id, e),
                }
            }
        }
        FlightsCmd::Show { id } => {
            let f = archive.get(id).with_context(|| format!("flight {}", id))?;
            println!("# {}", summary(&f));
            println!("{}", FlightSample::COLUMNS.join(","));
            for s in &f.samples {
                println!(
                    "{},{:.2},{:.5},{:.2},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3}",
                    s.timestamp,
                    s.temperature,
                    s.pressure,
                    s.relative_altitude,
                    s.accel_x,
                    s.accel_y,
                    s.accel_z,
                    s.gyro_x,
                    s.gyro_y,
                    s.gyro_z
                );
            }
        }
    }
    Ok(())
}
