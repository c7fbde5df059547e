//! Table-driven line decoding
//!
//! One algorithm serves every format in [`crate::schema::FORMATS`]:
//!
//! 1. Strip everything up to and including the format's marker.
//! 2. Normalize and tokenize per the format's declared rules.
//! 3. Check the token count against the format's arity.
//! 4. Convert every mapped token, rejecting the whole segment on the first
//!    corrupted one.
//! 5. Assemble the typed record.
//!
//! Decoding is pure: the same segment text always yields the same result.

mod fields;
mod normalize;

pub(crate) use normalize::{marker_positions, strip_preamble, tokenize};

use crate::error::Rejection;
use crate::schema::{DEFAULT_TRACKER_ID, format_for};
use crate::types::{
    AltimeterA, AltimeterB, ClassifiedSegment, DecodedRecord, GpsFix, LinkHealth, LinkQuality,
    MessageKind, PyroStatus,
};

use fields::Fields;

/// Decodes classified segments into validated records.
#[derive(Debug, Clone)]
pub struct Decoder {
    tracker_id: String,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKER_ID)
    }
}

impl Decoder {
    /// Create a decoder that treats `tracker_id` as a label token.
    pub fn new(tracker_id: impl Into<String>) -> Self {
        Self { tracker_id: tracker_id.into() }
    }

    /// Decode a classified segment.
    pub fn decode(&self, segment: &ClassifiedSegment) -> Result<DecodedRecord, Rejection> {
        self.decode_text(segment.kind, &segment.text)
    }

    /// Decode `text` as a `kind` line. The text may carry a preamble before
    /// the marker.
    pub fn decode_text(&self, kind: MessageKind, text: &str) -> Result<DecodedRecord, Rejection> {
        let format = format_for(kind);
        let payload =
            normalize::strip_preamble(text, format).ok_or(Rejection::MissingMarker { kind })?;

        let tokens = normalize::tokenize(payload, format, &self.tracker_id);
        let mismatch =
            || Rejection::StructuralMismatch { kind, expected: format.arity, found: tokens.len() };
        if !format.arity.accepts(tokens.len()) {
            return Err(mismatch());
        }

        let mut values = Fields::with_capacity(format.fields.len());
        for spec in format.fields {
            let token = tokens.get(spec.index).ok_or_else(mismatch)?;
            let value = fields::convert(token, spec.kind).ok_or_else(|| {
                Rejection::NumericCorruption { kind, field: spec.name, token: token.to_string() }
            })?;
            values.push(spec.name, value);
        }

        // The format table and the record builders must name the same fields.
        assemble(kind, &values).ok_or_else(mismatch)
    }
}

fn assemble(kind: MessageKind, f: &Fields) -> Option<DecodedRecord> {
    let record = match kind {
        MessageKind::AltimeterA => DecodedRecord::AltimeterA(AltimeterA {
            sample_count: f.get("sample_count")?,
            elapsed_s: f.get("elapsed_s")?,
            hg: f.get("hg")?,
            pg: f.get("pg")?,
            battery_v: f.get("battery_v")?,
            flight_state: f.get("flight_state")?,
            aux_1: f.get("aux_1")?,
            aux_2: f.get("aux_2")?,
            link: link_quality(f)?,
        }),
        MessageKind::AltimeterB => DecodedRecord::AltimeterB(AltimeterB {
            time_s: f.get("time_s")?,
            altitude_ft: f.get("altitude_ft")?,
            velocity_fps: f.get("velocity_fps")?,
            battery_v: f.get("battery_v")?,
            pyro: PyroStatus(f.get("pyro")?),
            flight_state: f.get("flight_state")?,
            link: link_quality(f)?,
        }),
        MessageKind::GpsTracker => DecodedRecord::GpsTracker(GpsFix {
            time_s: f.get("time_s")?,
            altitude_ft: f.get("altitude_ft")?,
            latitude_deg: f.get("latitude_deg")?,
            longitude_deg: f.get("longitude_deg")?,
            h_velocity: f.get("h_velocity")?,
            heading_deg: f.get("heading_deg")?,
            v_velocity: f.get("v_velocity")?,
            fix: f.get("fix")?,
            sats_total: f.get("sats_total")?,
            sats_24: f.get("sats_24")?,
            sats_32: f.get("sats_32")?,
            sats_40: f.get("sats_40")?,
        }),
        MessageKind::LinkHealth => DecodedRecord::LinkHealth(LinkHealth {
            time_s: f.get("time_s")?,
            packets_rx: f.get("packets_rx")?,
            packets_tx: f.get("packets_tx")?,
            rssi_1: f.get("rssi_1")?,
            snr_1: f.get("snr_1")?,
            acks_rx: f.get("acks_rx")?,
            acks_tx: f.get("acks_tx")?,
            rssi_2: f.get("rssi_2")?,
            snr_2: f.get("snr_2")?,
            spreading_factor: f.get("spreading_factor")?,
            frequency_hz: f.get("frequency_hz")?,
            battery_v: f.get("battery_v")?,
        }),
    };
    Some(record)
}

fn link_quality(f: &Fields) -> Option<LinkQuality> {
    Some(LinkQuality {
        rssi_dbm: f.get("rssi_dbm")?,
        snr_db: f.get("snr_db")?,
        packet_len: f.get("packet_len")?,
    })
}
