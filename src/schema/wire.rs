//! Binary frame layouts
//!
//! The consumer splits the byte stream by reading the leading tag and looking
//! up the frame size here. There is no length prefix and no delimiter, so a
//! tag's layout must never change within a schema version. New layouts get
//! new tags.

use crate::types::WireType::{Float64 as F64, Int32 as I32, Int64 as I64, UInt32 as U32};
use crate::types::{MessageKind, WireType};

/// Version of the tag space and layouts below.
pub const SCHEMA_VERSION: u32 = 1;

/// Encoding of the leading type tag.
pub const TAG_TYPE: WireType = WireType::Int32;

/// One field of a frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireField {
    pub name: &'static str,
    pub ty: WireType,
}

const fn wf(name: &'static str, ty: WireType) -> WireField {
    WireField { name, ty }
}

/// Byte layout for one tag. All fields are little-endian and packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub tag: i32,
    pub kind: MessageKind,
    /// Fields after the tag, in wire order
    pub fields: &'static [WireField],
}

impl FrameLayout {
    /// Total frame size in bytes, tag included.
    pub const fn size(&self) -> usize {
        let mut total = TAG_TYPE.size();
        let mut i = 0;
        while i < self.fields.len() {
            total += self.fields[i].ty.size();
            i += 1;
        }
        total
    }
}

/// Schema version 1 layouts, in tag order.
pub static LAYOUTS: [FrameLayout; 4] = [
    FrameLayout {
        tag: 12,
        kind: MessageKind::GpsTracker,
        fields: &[
            wf("time_s", F64),
            wf("altitude_ft", I32),
            wf("latitude_deg", F64),
            wf("longitude_deg", F64),
            wf("h_velocity", I32),
            wf("heading_deg", I32),
            wf("v_velocity", I32),
            wf("fix", I32),
            wf("sats_total", I32),
            wf("sats_24", I32),
            wf("sats_32", I32),
            wf("sats_40", I32),
        ],
    },
    FrameLayout {
        tag: 13,
        kind: MessageKind::LinkHealth,
        fields: &[
            wf("time_s", F64),
            wf("rssi_1", I32),
            wf("rssi_2", I32),
            wf("battery_v", F64),
            wf("snr_1", I32),
            wf("snr_2", I32),
            wf("packets_rx", U32),
            wf("packets_tx", U32),
            wf("acks_rx", U32),
            wf("acks_tx", U32),
            wf("spreading_factor", I32),
            wf("frequency_hz", I64),
        ],
    },
    FrameLayout {
        tag: 14,
        kind: MessageKind::AltimeterA,
        fields: &[
            wf("elapsed_s", F64),
            wf("sample_count", U32),
            wf("hg", I32),
            wf("pg", I32),
            wf("battery_v", F64),
            wf("flight_state", I32),
            wf("aux_1", I32),
            wf("aux_2", I32),
            wf("rssi_dbm", I32),
            wf("snr_db", I32),
            wf("packet_len", I32),
        ],
    },
    FrameLayout {
        tag: 15,
        kind: MessageKind::AltimeterB,
        fields: &[
            wf("time_s", F64),
            wf("altitude_ft", I32),
            wf("velocity_fps", I32),
            wf("battery_v", F64),
            wf("pyro", U32),
            wf("flight_state", I32),
            wf("rssi_dbm", I32),
            wf("snr_db", I32),
            wf("packet_len", I32),
        ],
    },
];

/// Layout used to encode records of `kind`.
pub fn layout_for_kind(kind: MessageKind) -> &'static FrameLayout {
    match kind {
        MessageKind::GpsTracker => &LAYOUTS[0],
        MessageKind::LinkHealth => &LAYOUTS[1],
        MessageKind::AltimeterA => &LAYOUTS[2],
        MessageKind::AltimeterB => &LAYOUTS[3],
    }
}

/// Layout registered for a wire tag, if any.
pub fn layout_for_tag(tag: i32) -> Option<&'static FrameLayout> {
    LAYOUTS.iter().find(|layout| layout.tag == tag)
}

/// Size of the frame starting at the front of `buf`.
///
/// Returns `None` when fewer than four bytes are available or the tag is
/// unknown. The frame itself may not be complete yet.
pub fn peek_frame_len(buf: &[u8]) -> Option<usize> {
    let tag_bytes: [u8; 4] = buf.get(..4)?.try_into().ok()?;
    layout_for_tag(i32::from_le_bytes(tag_bytes)).map(FrameLayout::size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes_are_pinned() {
        // Any change below needs a new tag and a schema bump.
        assert_eq!(SCHEMA_VERSION, 1);
        assert_eq!(layout_for_kind(MessageKind::GpsTracker).size(), 64);
        assert_eq!(layout_for_kind(MessageKind::LinkHealth).size(), 64);
        assert_eq!(layout_for_kind(MessageKind::AltimeterA).size(), 56);
        assert_eq!(layout_for_kind(MessageKind::AltimeterB).size(), 48);
    }

    #[test]
    fn tags_are_unique_and_round_trip() {
        for kind in MessageKind::ALL {
            let layout = layout_for_kind(kind);
            assert_eq!(layout.kind, kind);
            assert_eq!(layout_for_tag(layout.tag), Some(layout));
        }
        assert_eq!(layout_for_tag(0), None);
        assert_eq!(layout_for_tag(99), None);
    }

    #[test]
    fn peek_reads_the_leading_tag() {
        let mut buf = 14i32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 10]);
        assert_eq!(peek_frame_len(&buf), Some(56));
        assert_eq!(peek_frame_len(&buf[..3]), None);
        assert_eq!(peek_frame_len(&7i32.to_le_bytes()), None);
    }
}
