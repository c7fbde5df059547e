//! Message kind tags

use serde::{Deserialize, Serialize};

/// The known telemetry formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// Primary altimeter, colon-separated with a receiver link-quality tail
    AltimeterA,
    /// Secondary altimeter/timer with pyro channel status
    AltimeterB,
    /// GPS tracker position report
    GpsTracker,
    /// Radio link diagnostic report
    LinkHealth,
}

impl MessageKind {
    /// Every kind, in wire tag order.
    pub const ALL: [MessageKind; 4] = [
        MessageKind::GpsTracker,
        MessageKind::LinkHealth,
        MessageKind::AltimeterA,
        MessageKind::AltimeterB,
    ];

    /// Stable lowercase name used in logs and configuration.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageKind::AltimeterA => "altimeter-a",
            MessageKind::AltimeterB => "altimeter-b",
            MessageKind::GpsTracker => "gps-tracker",
            MessageKind::LinkHealth => "link-health",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
