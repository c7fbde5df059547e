//! Token → value conversion

use crate::schema::FieldKind;
use crate::types::{FromValue, PyroStatus, Value};

/// Convert one token according to its field kind.
///
/// Returns `None` for anything that is not a clean, in-range number. Radio
/// bit errors routinely turn digits into letters or punctuation, so every
/// conversion is strict.
pub(crate) fn convert(token: &str, kind: FieldKind) -> Option<Value> {
    match kind {
        FieldKind::Int => token.parse::<i32>().ok().map(Value::Int32),
        FieldKind::UInt => token.parse::<u32>().ok().map(Value::UInt32),
        FieldKind::Long => token.parse::<i64>().ok().map(Value::Int64),
        FieldKind::Real => parse_real(token).map(Value::Float64),
        FieldKind::Scaled { divisor } => parse_real(token).map(|v| Value::Float64(v / divisor)),
        FieldKind::ClockTime => parse_clock(token).map(Value::Float64),
        FieldKind::PyroCode => PyroStatus::from_code(token).map(|p| Value::UInt32(p.value())),
    }
}

/// Finite decimal number. Exponents, `inf` and `nan` are not accepted.
fn parse_real(token: &str) -> Option<f64> {
    if !token.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.')) {
        return None;
    }
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `HHMMSS[.fff]` → seconds of day.
fn parse_clock(token: &str) -> Option<f64> {
    let digits = token.as_bytes();
    if digits.len() < 6 || !digits[..6].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let hours: u32 = token[..2].parse().ok()?;
    let minutes: u32 = token[2..4].parse().ok()?;
    let seconds = parse_real(&token[4..])?;
    if hours >= 24 || minutes >= 60 || !(0.0..61.0).contains(&seconds) {
        return None;
    }
    Some(f64::from(hours * 3600 + minutes * 60) + seconds)
}

/// Converted values of one segment, looked up by field name.
#[derive(Debug, Default)]
pub(crate) struct Fields {
    values: Vec<(&'static str, Value)>,
}

impl Fields {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity) }
    }

    pub(crate) fn push(&mut self, name: &'static str, value: Value) {
        self.values.push((name, value));
    }

    pub(crate) fn get<T: FromValue>(&self, name: &str) -> Option<T> {
        self.values.iter().find(|(n, _)| *n == name).and_then(|(_, v)| T::from_value(v))
    }
}
