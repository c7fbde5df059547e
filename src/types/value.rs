//! Field value and wire type definitions

use serde::{Deserialize, Serialize};

/// Fixed-width encodings available in a binary frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    /// 32-bit signed integer
    Int32,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit IEEE 754 float
    Float64,
}

impl WireType {
    /// Returns the size in bytes of this wire type.
    pub const fn size(&self) -> usize {
        match self {
            WireType::Int32 | WireType::UInt32 => 4,
            WireType::Int64 | WireType::Float64 => 8,
        }
    }
}

/// A decoded, unit-converted field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    Float64(f64),
}

impl Value {
    /// The wire type this value serializes as.
    pub const fn wire_type(&self) -> WireType {
        match self {
            Value::Int32(_) => WireType::Int32,
            Value::UInt32(_) => WireType::UInt32,
            Value::Int64(_) => WireType::Int64,
            Value::Float64(_) => WireType::Float64,
        }
    }

    /// Append the little-endian encoding of this value.
    pub fn write_le(&self, out: &mut Vec<u8>) {
        match self {
            Value::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::UInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Float64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

/// Extraction of a concrete Rust type from a [`Value`].
///
/// Only exact type matches succeed; no numeric coercion happens here.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::UInt32(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
}
