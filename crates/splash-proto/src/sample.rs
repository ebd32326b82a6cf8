use serde::{Deserialize, Serialize};

/// One sensor snapshot. Field order matches the persisted column order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSample {
    pub timestamp: u64,          // ms since boot
    pub temperature: f32,        // °C
    pub pressure: f32,           // bar
    pub relative_altitude: f32,  // m above pad reference
    pub accel_x: f32,            // m/s²
    pub accel_y: f32,
    pub accel_z: f32,
    pub gyro_x: f32,             // deg/s
    pub gyro_y: f32,
    pub gyro_z: f32,
}

impl FlightSample {
    pub const COLUMNS: [&'static str; 10] = [
        "timestamp",
        "temperature",
        "pressure",
        "relativeAltitude",
        "accelX",
        "accelY",
        "accelZ",
        "gyroX",
        "gyroY",
        "gyroZ",
    ];
}
