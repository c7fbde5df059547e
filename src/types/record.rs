//! Decoded telemetry records

use serde::{Deserialize, Serialize};

use super::{MessageKind, PyroStatus};

/// Link-quality metrics the ground receiver appends to colon-format packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkQuality {
    /// Received signal strength (dBm)
    pub rssi_dbm: i32,
    /// Signal-to-noise ratio (dB)
    pub snr_db: i32,
    /// Received packet length (bytes)
    pub packet_len: i32,
}

/// Primary altimeter sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltimeterA {
    /// Device sample counter
    pub sample_count: u32,
    /// Seconds since power-on, derived from the sample counter
    pub elapsed_s: f64,
    /// High-g accelerometer reading
    pub hg: i32,
    /// Pressure gauge reading
    pub pg: i32,
    /// Battery voltage (V)
    pub battery_v: f64,
    pub flight_state: i32,
    pub aux_1: i32,
    pub aux_2: i32,
    pub link: LinkQuality,
}

/// Secondary altimeter / timer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltimeterB {
    /// Seconds of day
    pub time_s: f64,
    pub altitude_ft: i32,
    pub velocity_fps: i32,
    /// Battery voltage (V)
    pub battery_v: f64,
    pub pyro: PyroStatus,
    pub flight_state: i32,
    pub link: LinkQuality,
}

/// GPS tracker position report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// Seconds of day
    pub time_s: f64,
    pub altitude_ft: i32,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub h_velocity: i32,
    pub heading_deg: i32,
    pub v_velocity: i32,
    /// Fix type (0 none, 2 2D, 3 3D)
    pub fix: i32,
    /// Satellites in view
    pub sats_total: i32,
    /// Satellites above 24 dB-Hz
    pub sats_24: i32,
    /// Satellites above 32 dB-Hz
    pub sats_32: i32,
    /// Satellites above 40 dB-Hz
    pub sats_40: i32,
}

/// Radio link diagnostic report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkHealth {
    /// Seconds of day
    pub time_s: f64,
    pub packets_rx: u32,
    pub packets_tx: u32,
    /// Uplink RSSI (dBm)
    pub rssi_1: i32,
    pub snr_1: i32,
    pub acks_rx: u32,
    pub acks_tx: u32,
    /// Acknowledgement RSSI (dBm)
    pub rssi_2: i32,
    pub snr_2: i32,
    pub spreading_factor: i32,
    pub frequency_hz: i64,
    /// Tracker battery voltage (V)
    pub battery_v: f64,
}

/// A fully validated record, one case per message kind.
///
/// There is no partial record: a value of this type only exists for input
/// that passed every structural and numeric check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DecodedRecord {
    AltimeterA(AltimeterA),
    AltimeterB(AltimeterB),
    GpsTracker(GpsFix),
    LinkHealth(LinkHealth),
}

impl DecodedRecord {
    pub fn kind(&self) -> MessageKind {
        match self {
            DecodedRecord::AltimeterA(_) => MessageKind::AltimeterA,
            DecodedRecord::AltimeterB(_) => MessageKind::AltimeterB,
            DecodedRecord::GpsTracker(_) => MessageKind::GpsTracker,
            DecodedRecord::LinkHealth(_) => MessageKind::LinkHealth,
        }
    }
}
