//! Pyro channel status decoding for the altimeter-B timer

use serde::{Deserialize, Serialize};

/// State of a single pyro channel as reported by the timer firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PyroChannel {
    /// No continuity
    Open,
    /// Igniter connected, not fired
    Continuity,
    /// Channel fired
    Fired,
    /// Channel reported a fault
    Fault,
}

impl PyroChannel {
    /// Positional lookup of one status character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'O' => Some(PyroChannel::Open),
            'C' => Some(PyroChannel::Continuity),
            'F' => Some(PyroChannel::Fired),
            'X' => Some(PyroChannel::Fault),
            _ => None,
        }
    }

    pub const fn value(self) -> u32 {
        match self {
            PyroChannel::Open => 0,
            PyroChannel::Continuity => 1,
            PyroChannel::Fired => 2,
            PyroChannel::Fault => 3,
        }
    }

    const fn from_value(v: u32) -> Self {
        match v & 0b11 {
            0 => PyroChannel::Open,
            1 => PyroChannel::Continuity,
            2 => PyroChannel::Fired,
            _ => PyroChannel::Fault,
        }
    }
}

/// Composite status of the three pyro channels.
///
/// Each channel occupies two bits: channel 1 has weight 1, channel 2 weight 4,
/// channel 3 weight 16. `"CCO"` therefore encodes as `1 + 4 + 0 = 5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyroStatus(pub u32);

impl PyroStatus {
    /// Number of channels in a status code.
    pub const CHANNELS: usize = 3;

    /// Per-position weights, first character first.
    pub const WEIGHTS: [u32; Self::CHANNELS] = [1, 4, 16];

    /// Decode a 3-character status code. Any other length or an unknown
    /// character yields `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        let mut total = 0;
        for weight in Self::WEIGHTS {
            let channel = PyroChannel::from_char(chars.next()?)?;
            total += channel.value() * weight;
        }
        if chars.next().is_some() {
            return None;
        }
        Some(Self(total))
    }

    /// Status of channel `index` (0-based).
    pub fn channel(&self, index: usize) -> Option<PyroChannel> {
        let weight = Self::WEIGHTS.get(index)?;
        Some(PyroChannel::from_value(self.0 / weight))
    }

    /// Get the raw composite value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn weights_accumulate_per_position() {
        assert_eq!(PyroStatus::from_code("OOO"), Some(PyroStatus(0)));
        assert_eq!(PyroStatus::from_code("CCO"), Some(PyroStatus(5)));
        assert_eq!(PyroStatus::from_code("FCO"), Some(PyroStatus(6)));
        assert_eq!(PyroStatus::from_code("XXX"), Some(PyroStatus(63)));
    }

    #[test]
    fn rejects_bad_codes() {
        assert_eq!(PyroStatus::from_code(""), None);
        assert_eq!(PyroStatus::from_code("CC"), None);
        assert_eq!(PyroStatus::from_code("CCCC"), None);
        assert_eq!(PyroStatus::from_code("C1O"), None);
        assert_eq!(PyroStatus::from_code("cco"), None);
    }

    #[test]
    fn channels_read_back() {
        let status = PyroStatus::from_code("FCX").unwrap();
        assert_eq!(status.channel(0), Some(PyroChannel::Fired));
        assert_eq!(status.channel(1), Some(PyroChannel::Continuity));
        assert_eq!(status.channel(2), Some(PyroChannel::Fault));
        assert_eq!(status.channel(3), None);
    }

    proptest! {
        #[test]
        fn prop_channels_match_code(code in "[OCFX]{3}") {
            let status = PyroStatus::from_code(&code).unwrap();
            for (i, c) in code.chars().enumerate() {
                prop_assert_eq!(status.channel(i), PyroChannel::from_char(c));
            }
            prop_assert!(status.value() < 64);
        }
    }
}
