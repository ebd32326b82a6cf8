mod common;

use splash_pad::{CsvArchive, PadConfig, PadError};
use splash_proto::LaunchpadState::*;
use splash_proto::{LaunchParameters, PadEvent, RocketIdentity};

use common::{chunk, drive_to, pad, pad_with_archive};

fn identity() -> RocketIdentity {
    RocketIdentity { name: "splash-1".into(), firmware: "0.3.1".into() }
}

#[test]
fn identified_rocket_uploads_in_chunks() {
    let mut p = pad(PadConfig::default()).with_epoch_offset(1_000_000);
    drive_to(&mut p, WaitingForRocket);

    p.identify_rocket(identity());
    assert_eq!(p.tick(100, 1.0, 0).state, ReceivingData);
    assert_eq!(p.status().transfer_progress, Some(0.0));

    let ack = p.upload_flight_data(chunk(0, 2, 5)).unwrap();
    assert_eq!((ack.received, ack.total), (2, 5));
    // lost ack, rocket sends the same chunk again
    let ack = p.upload_flight_data(chunk(0, 2, 5)).unwrap();
    assert_eq!(ack.received, 2);
    assert!(matches!(p.upload_flight_data(chunk(3, 2, 5)), Err(PadError::InvalidParameter(_))));

    p.upload_flight_data(chunk(2, 3, 5)).unwrap();
    assert_eq!(p.state(), ReceivingData);
    assert_eq!(p.tick(100, 1.0, 0).state, ReceivedData);

    // launch happened at uptime 0
    let id = p.last_flight().unwrap();
    assert_eq!(id, 1_000_000);
    assert_eq!(p.list_flights().unwrap(), vec![id]);
    let rec = p.get_flight(id).unwrap();
    assert_eq!(rec.samples.len(), 5);
    assert_eq!(rec.parameters, Some(LaunchParameters { water_volume: 1.0, pressure: 5.0 }));
    assert!(rec.samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let events = &p.sink().events;
    assert!(events.contains(&PadEvent::NewDataAvailable { flight: id }));
    assert!(events.contains(&PadEvent::ReceivingData { percentage: 100.0 }));

    // stays until the operator acts
    assert_eq!(p.tick(60_000, 1.0, 0).state, ReceivedData);
    p.request_return_to_idle().unwrap();
    assert_eq!(p.state(), Idle);
}

#[test]
fn final_chunk_resent_after_archive_is_acknowledged() {
    let mut p = pad(PadConfig::default());
    drive_to(&mut p, WaitingForRocket);
    p.upload_flight_data(chunk(0, 2, 4)).unwrap();
    p.upload_flight_data(chunk(2, 2, 4)).unwrap();
    assert_eq!(p.tick(10, 1.0, 0).state, ReceivedData);
    let id = p.last_flight().unwrap();

    // the ack of the last chunk never reached the rocket
    let ack = p.upload_flight_data(chunk(2, 2, 4)).unwrap();
    assert_eq!((ack.received, ack.total), (4, 4));
    assert_eq!(p.state(), ReceivedData);
    assert_eq!(p.list_flights().unwrap(), vec![id]);
    assert_eq!(p.get_flight(id).unwrap().samples.len(), 4);

    // a different flight is still out of sequence
    let err = p.upload_flight_data(chunk(0, 2, 6)).unwrap_err();
    assert_eq!(err, PadError::InvalidState { command: "upload-flight-data", state: ReceivedData });

    p.request_return_to_idle().unwrap();
    assert!(p.upload_flight_data(chunk(2, 2, 4)).is_err());
}

#[test]
fn upload_refused_before_launch() {
    let mut p = pad(PadConfig::default());
    let err = p.upload_flight_data(chunk(0, 1, 1)).unwrap_err();
    assert_eq!(err, PadError::InvalidState { command: "upload-flight-data", state: Idle });
}

#[test]
fn identification_before_waiting_is_not_contact() {
    let mut p = pad(PadConfig::default());
    p.identify_rocket(identity());
    drive_to(&mut p, WaitingForRocket);
    assert_eq!(p.tick(100, 1.0, 0).state, WaitingForRocket);
    assert_eq!(p.rocket().identity.as_ref().map(|i| i.name.as_str()), Some("splash-1"));
}

#[test]
fn silent_rocket_times_out_to_idle() {
    let cfg = PadConfig::default();
    let mut p = pad(cfg.clone());
    drive_to(&mut p, WaitingForRocket);
    assert_eq!(p.tick(cfg.rocket_wait_timeout_ms, 1.0, 0).state, WaitingForRocket);
    assert_eq!(p.tick(1, 1.0, 0).state, Idle);
    assert!(p.logs().iter().any(|l| l.message.contains("rocket wait timeout")));
}

#[test]
fn stalled_upload_is_discarded() {
    let cfg = PadConfig::default();
    let mut p = pad(cfg.clone());
    drive_to(&mut p, ReceivingData);
    assert_eq!(p.tick(cfg.upload_stall_timeout_ms, 1.0, 0).state, ReceivingData);
    assert_eq!(p.tick(1, 1.0, 0).state, Idle);
    assert_eq!(p.status().transfer_progress, None);
    assert!(p.list_flights().unwrap().is_empty());
}

#[test]
fn abort_mid_transfer_keeps_archive_clean() {
    let mut p = pad(PadConfig::default());
    drive_to(&mut p, ReceivingData);
    p.request_abort().unwrap();
    assert_eq!(p.state(), Idle);
    assert!(p.upload_flight_data(chunk(2, 2, 4)).is_err());
    assert!(p.list_flights().unwrap().is_empty());
}

#[test]
fn flights_land_in_the_csv_archive() {
    let dir = tempfile::tempdir().unwrap();
    let archive = CsvArchive::open(dir.path()).unwrap();
    let mut p = pad_with_archive(PadConfig::default(), Box::new(archive)).with_epoch_offset(42);
    drive_to(&mut p, ReceivedData);

    let ids = p.list_flights().unwrap();
    assert_eq!(ids, vec![42]);
    assert!(dir.path().join("42.csv").exists());
    assert!(dir.path().join("42.json").exists());
    assert_eq!(p.get_flight(42).unwrap().samples.len(), 4);
}
