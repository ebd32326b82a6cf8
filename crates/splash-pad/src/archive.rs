use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use splash_proto::{FlightRecord, FlightSample, LaunchParameters};
use tracing::{debug, warn};

use crate::error::PadError;

/// Persistent store of completed flights, keyed by launch timestamp.
pub trait FlightArchive {
    /// Returns the key the record was stored under.
    fn store(&mut self, record: &FlightRecord) -> Result<u64, PadError>;
    /// Keys, newest first.
    fn list(&self) -> Result<Vec<u64>, PadError>;
    fn get(&self, id: u64) -> Result<FlightRecord, PadError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    flights: BTreeMap<u64, FlightRecord>,
}

impl MemoryArchive {
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

impl FlightArchive for MemoryArchive {
    fn store(&mut self, record: &FlightRecord) -> Result<u64, PadError> {
        let id = record.launch_timestamp;
        if self.flights.contains_key(&id) {
            return Err(PadError::Archive(format!("flight {} already archived", id)));
        }
        self.flights.insert(id, record.clone());
        Ok(id)
    }

    fn list(&self) -> Result<Vec<u64>, PadError> {
        Ok(self.flights.keys().rev().copied().collect())
    }

    fn get(&self, id: u64) -> Result<FlightRecord, PadError> {
        self.flights.get(&id).cloned().ok_or(PadError::UnknownFlight(id))
    }
}

/// Launch parameters kept next to the samples.
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    launch_timestamp: u64,
    parameters: Option<LaunchParameters>,
    samples: usize,
}

/// One `<id>.csv` per flight (header in column order, one row per sample)
/// plus an `<id>.json` sidecar.
#[derive(Debug, Clone)]
pub struct CsvArchive {
    dir: PathBuf,
}

fn archive_err(what: &str, path: &Path, e: impl Display) -> PadError {
    PadError::Archive(format!("{} {}: {}", what, path.display(), e))
}

impl CsvArchive {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PadError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| archive_err("create", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn csv_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{}.csv", id))
    }

    fn sidecar_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl FlightArchive for CsvArchive {
    fn store(&mut self, record: &FlightRecord) -> Result<u64, PadError> {
        let id = record.launch_timestamp;
        let path = self.csv_path(id);
        if path.exists() {
            return Err(PadError::Archive(format!("flight {} already archived", id)));
        }

        let mut wtr = csv::Writer::from_path(&path).map_err(|e| archive_err("create", &path, e))?;
        // header must exist even for an empty flight
        if record.samples.is_empty() {
            wtr.write_record(FlightSample::COLUMNS).map_err(|e| archive_err("write", &path, e))?;
        }
        for sample in &record.samples {
            wtr.serialize(sample).map_err(|e| archive_err("write", &path, e))?;
        }
        wtr.flush().map_err(|e| archive_err("flush", &path, e))?;

        let side = self.sidecar_path(id);
        let file = File::create(&side).map_err(|e| archive_err("create", &side, e))?;
        let meta = Sidecar {
            launch_timestamp: id,
            parameters: record.parameters,
            samples: record.samples.len(),
        };
        serde_json::to_writer_pretty(file, &meta).map_err(|e| archive_err("write", &side, e))?;

        debug!("archive: wrote {} rows to {}", record.samples.len(), path.display());
        Ok(id)
    }

    fn list(&self) -> Result<Vec<u64>, PadError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| archive_err("read", &self.dir, e))?;
        let mut ids: Vec<u64> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .filter_map(|p| p.file_stem()?.to_str()?.parse().ok())
            .collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    fn get(&self, id: u64) -> Result<FlightRecord, PadError> {
        let path = self.csv_path(id);
        if !path.exists() {
            return Err(PadError::UnknownFlight(id));
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| archive_err("open", &path, e))?;
        let header = rdr.headers().map_err(|e| archive_err("read", &path, e))?;
        if header.iter().ne(FlightSample::COLUMNS) {
            return Err(archive_err("read", &path, "unexpected column layout"));
        }
        let samples = rdr
            .deserialize::<FlightSample>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| archive_err("read", &path, e))?;

        let side = self.sidecar_path(id);
        let parameters = match File::open(&side) {
            Ok(file) => {
                let meta: Sidecar = serde_json::from_reader(file).map_err(|e| archive_err("read", &side, e))?;
                meta.parameters
            }
            Err(e) => {
                warn!("archive: no sidecar for flight {}: {}", id, e);
                None
            }
        };

        Ok(FlightRecord { launch_timestamp: id, parameters, samples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: u64, n: usize) -> FlightRecord {
        FlightRecord {
            launch_timestamp: ts,
            parameters: Some(LaunchParameters { water_volume: 1.2, pressure: 6.0 }),
            samples: (0..n)
                .map(|i| FlightSample { timestamp: i as u64 * 20, relative_altitude: i as f32 * 0.5, ..Default::default() })
                .collect(),
        }
    }

    #[test]
    fn memory_archive_orders_newest_first() {
        let mut a = MemoryArchive::default();
        a.store(&record(10, 1)).unwrap();
        a.store(&record(30, 1)).unwrap();
        a.store(&record(20, 1)).unwrap();
        assert_eq!(a.list().unwrap(), vec![30, 20, 10]);
        assert!(a.store(&record(20, 2)).is_err());
        assert_eq!(a.get(99), Err(PadError::UnknownFlight(99)));
    }

    #[test]
    fn csv_archive_keeps_header_and_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = CsvArchive::open(dir.path().join("flights")).unwrap();
        let rec = record(1_700_000_000_123, 5);
        assert_eq!(a.store(&rec).unwrap(), rec.launch_timestamp);

        let text = fs::read_to_string(a.dir().join("1700000000123.csv")).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, FlightSample::COLUMNS.join(","));
        assert_eq!(text.lines().count(), 6);

        assert_eq!(a.get(rec.launch_timestamp).unwrap(), rec);
        assert_eq!(a.list().unwrap(), vec![rec.launch_timestamp]);
    }

    #[test]
    fn csv_archive_handles_empty_flight() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = CsvArchive::open(dir.path()).unwrap();
        a.store(&record(5, 0)).unwrap();
        assert!(a.get(5).unwrap().samples.is_empty());
        assert_eq!(a.get(6), Err(PadError::UnknownFlight(6)));
    }
}
