//! Text format table
//!
//! Every known line format is one [`FormatSchema`] row. The decoder is a
//! single generic algorithm over these rows, so adding a device format is a
//! data change.

use crate::types::MessageKind;

/// Tracker radio id used when none is configured.
pub const DEFAULT_TRACKER_ID: &str = "FthrWt04072";

/// Expected token count for a text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Fixed-arity format: exactly this many tokens.
    Exact(usize),
    /// Variable-trailer format: at least this many tokens.
    AtLeast(usize),
}

impl Arity {
    /// Check a token count against this arity.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Field separator of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// Runs of whitespace
    Whitespace,
    /// A single character; repeats collapse
    Char(char),
}

impl Separator {
    /// Character used when re-joining tokens.
    pub const fn join_char(self) -> char {
        match self {
            Separator::Whitespace => ' ',
            Separator::Char(c) => c,
        }
    }
}

/// How a token is converted into a field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// 32-bit signed integer
    Int,
    /// 32-bit unsigned integer
    UInt,
    /// 64-bit signed integer
    Long,
    /// Finite real number
    Real,
    /// Finite number divided by a fixed-point scale
    Scaled { divisor: f64 },
    /// `HHMMSS[.fff]` digits recombined into seconds of day
    ClockTime,
    /// Three-character pyro channel code
    PyroCode,
}

/// Maps one token position to a named field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Token index after normalization and tokenization
    pub index: usize,
    pub kind: FieldKind,
}

const fn field(name: &'static str, index: usize, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, index, kind }
}

/// Declared cleanup rules applied before the arity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    /// Characters removed from inside every token
    pub strip_chars: &'static [char],
    /// Tokens dropped when they match exactly
    pub ignore_words: &'static [&'static str],
    /// Drop every token containing an ASCII letter
    pub drop_alpha_tokens: bool,
    /// Drop tokens equal to the configured tracker id
    pub ignore_tracker_id: bool,
}

/// Addressing checks a segment must pass before it is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    /// Segment must contain the configured tracker id
    pub tracker_id: bool,
    /// Segment must contain each of these whitespace-delimited tokens
    pub tokens: &'static [&'static str],
}

impl Gate {
    const OPEN: Gate = Gate { tracker_id: false, tokens: &[] };
}

/// One row of the format table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatSchema {
    pub kind: MessageKind,
    /// Preamble token the payload starts after
    pub marker: &'static str,
    /// Marker only matches at line start or after a non-alphanumeric byte
    pub marker_boundary: bool,
    pub separator: Separator,
    pub arity: Arity,
    /// Receiver-appended tokens at the end of the line that belong to this
    /// packet even when another packet is concatenated after it
    pub tail_fields: usize,
    pub normalizer: Normalizer,
    pub gate: Gate,
    pub fields: &'static [FieldSpec],
}

const COLON_NORMALIZER: Normalizer = Normalizer {
    strip_chars: &['"', '#', '\''],
    ignore_words: &[],
    drop_alpha_tokens: false,
    ignore_tracker_id: false,
};

/// Schema version 1 format table.
pub static FORMATS: [FormatSchema; 4] = [
    FormatSchema {
        kind: MessageKind::AltimeterA,
        marker: "R:",
        marker_boundary: true,
        separator: Separator::Char(':'),
        arity: Arity::Exact(10),
        tail_fields: 3,
        normalizer: COLON_NORMALIZER,
        gate: Gate::OPEN,
        fields: &[
            field("sample_count", 0, FieldKind::UInt),
            field("elapsed_s", 0, FieldKind::Scaled { divisor: 10.0 }),
            field("hg", 1, FieldKind::Int),
            field("pg", 2, FieldKind::Int),
            field("battery_v", 3, FieldKind::Scaled { divisor: 1000.0 }),
            field("flight_state", 4, FieldKind::Int),
            field("aux_1", 5, FieldKind::Int),
            field("aux_2", 6, FieldKind::Int),
            field("rssi_dbm", 7, FieldKind::Int),
            field("snr_db", 8, FieldKind::Int),
            field("packet_len", 9, FieldKind::Int),
        ],
    },
    FormatSchema {
        kind: MessageKind::AltimeterB,
        marker: "T:",
        marker_boundary: true,
        separator: Separator::Char(':'),
        arity: Arity::Exact(9),
        tail_fields: 3,
        normalizer: COLON_NORMALIZER,
        gate: Gate::OPEN,
        fields: &[
            field("time_s", 0, FieldKind::ClockTime),
            field("altitude_ft", 1, FieldKind::Int),
            field("velocity_fps", 2, FieldKind::Int),
            field("battery_v", 3, FieldKind::Scaled { divisor: 10.0 }),
            field("pyro", 4, FieldKind::PyroCode),
            field("flight_state", 5, FieldKind::Int),
            field("rssi_dbm", 6, FieldKind::Int),
            field("snr_db", 7, FieldKind::Int),
            field("packet_len", 8, FieldKind::Int),
        ],
    },
    FormatSchema {
        kind: MessageKind::GpsTracker,
        marker: "GPS_STAT",
        marker_boundary: false,
        separator: Separator::Whitespace,
        arity: Arity::Exact(22),
        tail_fields: 0,
        normalizer: Normalizer {
            strip_chars: &[':', '#', '\''],
            ignore_words: &["CRC_OK", "TRK", "Alt", "lt", "ln", "Vel", "Fix", "CRC"],
            drop_alpha_tokens: false,
            ignore_tracker_id: true,
        },
        gate: Gate { tracker_id: true, tokens: &["TRK"] },
        fields: &[
            field("time_s", 4, FieldKind::ClockTime),
            field("altitude_ft", 5, FieldKind::Int),
            field("latitude_deg", 6, FieldKind::Real),
            field("longitude_deg", 7, FieldKind::Real),
            field("h_velocity", 8, FieldKind::Int),
            field("heading_deg", 9, FieldKind::Int),
            field("v_velocity", 10, FieldKind::Int),
            field("fix", 11, FieldKind::Int),
            field("sats_total", 12, FieldKind::Int),
            field("sats_24", 13, FieldKind::Int),
            field("sats_32", 14, FieldKind::Int),
            field("sats_40", 15, FieldKind::Int),
        ],
    },
    FormatSchema {
        kind: MessageKind::LinkHealth,
        marker: "RX_NOMTK",
        marker_boundary: false,
        separator: Separator::Whitespace,
        arity: Arity::AtLeast(17),
        tail_fields: 0,
        normalizer: Normalizer {
            strip_chars: &[':', '_', '\''],
            ignore_words: &[],
            drop_alpha_tokens: true,
            ignore_tracker_id: true,
        },
        gate: Gate { tracker_id: true, tokens: &[] },
        fields: &[
            field("time_s", 4, FieldKind::ClockTime),
            field("packets_rx", 5, FieldKind::UInt),
            field("packets_tx", 6, FieldKind::UInt),
            field("rssi_1", 7, FieldKind::Int),
            field("snr_1", 8, FieldKind::Int),
            field("acks_rx", 9, FieldKind::UInt),
            field("acks_tx", 10, FieldKind::UInt),
            field("rssi_2", 11, FieldKind::Int),
            field("snr_2", 12, FieldKind::Int),
            field("spreading_factor", 13, FieldKind::Int),
            field("frequency_hz", 14, FieldKind::Long),
            field("battery_v", 15, FieldKind::Scaled { divisor: 1000.0 }),
        ],
    },
];

/// Look up the format row for a kind.
pub fn format_for(kind: MessageKind) -> &'static FormatSchema {
    match kind {
        MessageKind::AltimeterA => &FORMATS[0],
        MessageKind::AltimeterB => &FORMATS[1],
        MessageKind::GpsTracker => &FORMATS[2],
        MessageKind::LinkHealth => &FORMATS[3],
    }
}
