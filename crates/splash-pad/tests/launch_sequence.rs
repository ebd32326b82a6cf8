mod common;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use splash_pad::transitions;
use splash_pad::{Distributor, PadConfig, PadError, StateChange};
use splash_proto::LaunchpadState::{self, *};
use splash_proto::{PadEvent, RocketIdentity, RocketState};

use common::{chunk, drive_to, pad, Pad};

#[test]
fn fill_pressurize_launch_clear() {
    let mut p = pad(PadConfig::default());

    assert_eq!(p.request_start_filling(1.2, 6.0).unwrap(), StateChange::Changed { from: Idle, to: WaterFilling });
    assert!(p.actuators().valve_open());
    assert_eq!(p.actuators().distributor(), Some(Distributor::Atmosphere));

    // 540 pulses at 1/450 L each
    for _ in 0..9 {
        let r = p.tick(100, 1.0, 54);
        assert_eq!(r.state, WaterFilling);
        assert_eq!(r.transition, None);
    }
    let r = p.tick(100, 1.0, 54);
    assert_eq!(r.transition, Some(StateChange::Changed { from: WaterFilling, to: Pressurizing }));
    assert_relative_eq!(p.water_volume(), 1.2, epsilon = 1e-3);
    assert!(!p.actuators().valve_open());
    assert_eq!(p.actuators().distributor(), Some(Distributor::Compressor));

    assert_eq!(p.tick(100, 3.0, 0).state, Pressurizing);
    assert_eq!(p.tick(100, 6.0, 0).state, ReadyForLaunch);
    assert_eq!(p.actuators().distributor(), Some(Distributor::Locked));

    p.request_launch().unwrap();
    assert_eq!(p.state(), Launching);
    assert!(p.actuators().lock_open());

    assert_eq!(p.tick(1000, 1.0, 0).state, Launching);
    assert_eq!(p.tick(1000, 1.0, 0).state, Launching);
    assert_eq!(p.tick(1000, 1.0, 0).state, WaitingForRocket);
    assert!(!p.actuators().lock_open());
    assert_eq!(p.actuators().distributor(), Some(Distributor::Atmosphere));

    assert_eq!(
        p.sink().states(),
        vec![WaterFilling, Pressurizing, ReadyForLaunch, Launching, WaitingForRocket]
    );
    let fills = p.sink().events.iter().filter(|e| matches!(e, PadEvent::Filling { .. })).count();
    assert_eq!(fills, 12);
}

#[test]
fn negative_volume_is_rejected() {
    let mut p = pad(PadConfig::default());
    let err = p.request_start_filling(-1.0, 6.0).unwrap_err();
    assert!(matches!(err, PadError::InvalidParameter(_)));
    assert_eq!(p.state(), Idle);
    assert!(p.sink().states().is_empty());
}

type Command = (&'static str, &'static [LaunchpadState], fn(&mut Pad) -> Result<(), PadError>);

fn start_filling(p: &mut Pad) -> Result<(), PadError> {
    p.request_start_filling(1.0, 5.0).map(|_| ())
}

fn launch(p: &mut Pad) -> Result<(), PadError> {
    p.request_launch().map(|_| ())
}

fn skip_water(p: &mut Pad) -> Result<(), PadError> {
    p.skip_water_filling().map(|_| ())
}

fn skip_pressure(p: &mut Pad) -> Result<(), PadError> {
    p.skip_pressurizing().map(|_| ())
}

fn open_fairing(p: &mut Pad) -> Result<(), PadError> {
    p.open_fairing()
}

fn close_fairing(p: &mut Pad) -> Result<(), PadError> {
    p.close_fairing()
}

fn upload(p: &mut Pad) -> Result<(), PadError> {
    p.upload_flight_data(chunk(0, 1, 1)).map(|_| ())
}

const COMMANDS: [Command; 7] = [
    ("start-filling", &[Idle], start_filling),
    ("launch", &[ReadyForLaunch], launch),
    ("skip-water-filling", &[WaterFilling], skip_water),
    ("skip-pressurizing", &[Pressurizing], skip_pressure),
    ("open-fairing", &[Idle], open_fairing),
    ("close-fairing", &[Idle], close_fairing),
    ("upload-flight-data", &[WaitingForRocket, ReceivingData], upload),
];

#[test]
fn commands_outside_their_state_change_nothing() {
    for state in LaunchpadState::ALL {
        let mut p = pad(PadConfig::default());
        drive_to(&mut p, state);

        for (name, allowed, run) in COMMANDS {
            if allowed.contains(&state) {
                continue;
            }
            let before = (p.state(), p.water_volume(), p.pressure(), p.target(), p.actuators().calls.len());
            let err = run(&mut p).unwrap_err();
            assert!(matches!(err, PadError::InvalidState { .. }), "{} in {}: {:?}", name, state, err);
            let after = (p.state(), p.water_volume(), p.pressure(), p.target(), p.actuators().calls.len());
            assert_eq!(before, after, "{} in {}", name, state);
        }
    }
}

#[test]
fn repeated_state_request_is_idempotent() {
    for state in LaunchpadState::ALL {
        let mut p = pad(PadConfig::default());
        drive_to(&mut p, state);
        let calls = p.actuators().calls.len();
        let logs = p.logs().len();

        for _ in 0..2 {
            assert_eq!(p.transition_to(state, "repeat").unwrap(), StateChange::NoChange(state));
        }
        assert_eq!(p.actuators().calls.len(), calls, "{}", state);
        assert_eq!(p.logs().len(), logs + 2);
        assert!(p.logs().last().unwrap().message.contains("unchanged"));
        assert_eq!(p.sink().states().last(), Some(&state));
    }
}

#[test]
fn random_command_sequences_follow_the_table() {
    for seed in 0..40u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut p = pad(PadConfig { clearing_delay_ms: 1000, rocket_wait_timeout_ms: 20_000, ..PadConfig::default() });

        for _ in 0..400 {
            match rng.gen_range(0..11) {
                0 => {
                    let _ = p.request_start_filling(rng.gen_range(-0.5..2.0), rng.gen_range(0.0..12.0));
                }
                1 => {
                    let _ = p.request_launch();
                }
                2 => {
                    let _ = p.request_abort();
                }
                3 => {
                    let _ = p.request_return_to_idle();
                }
                4 => {
                    let _ = p.skip_water_filling();
                }
                5 => {
                    let _ = p.skip_pressurizing();
                }
                6 | 7 => {
                    p.tick(rng.gen_range(0..4000), rng.gen_range(0.0..8.0), rng.gen_range(0..200));
                }
                8 => p.identify_rocket(RocketIdentity { name: "r".into(), firmware: "t".into() }),
                9 => {
                    let total = rng.gen_range(1..6);
                    let offset = rng.gen_range(0..total);
                    let len = rng.gen_range(0..=total - offset);
                    let _ = p.upload_flight_data(chunk(offset, len, total));
                }
                _ => {
                    let to = LaunchpadState::ALL[rng.gen_range(0..LaunchpadState::ALL.len())];
                    let _ = p.transition_to(to, "random");
                }
            }
        }

        let mut visited = vec![Idle];
        visited.extend(p.sink().states());
        for pair in visited.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(a == b || transitions::lookup(a, b).is_some(), "seed {}: {} -> {}", seed, a, b);
        }
        assert_eq!(visited.last(), Some(&p.state()));
    }
}

#[test]
fn rocket_state_reports_are_broadcast() {
    let mut p = pad(PadConfig::default());
    p.report_rocket_state(RocketState::SendingData);
    assert_eq!(p.rocket().state, Some(RocketState::SendingData));
    assert!(p
        .sink()
        .events
        .contains(&PadEvent::NewRocketState { state: RocketState::SendingData }));
    assert!(!p.rocket_readiness());
}
