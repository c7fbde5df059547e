//! Binary frame encoding

use crate::schema::layout_for_kind;
use crate::types::{BinaryFrame, DecodedRecord, LinkQuality, Value};

/// Encode a record into its fixed-layout frame.
///
/// Total: every record has exactly one layout and every field value is
/// already range-checked by the decoder.
pub fn encode(record: &DecodedRecord) -> BinaryFrame {
    let layout = layout_for_kind(record.kind());
    let mut bytes = Vec::with_capacity(layout.size());
    bytes.extend_from_slice(&layout.tag.to_le_bytes());
    for value in wire_values(record) {
        value.write_le(&mut bytes);
    }
    debug_assert_eq!(bytes.len(), layout.size());
    BinaryFrame::new(layout.tag, bytes)
}

/// Field values in wire order, tag excluded.
pub(crate) fn wire_values(record: &DecodedRecord) -> Vec<Value> {
    match record {
        DecodedRecord::GpsTracker(r) => vec![
            r.time_s.into(),
            r.altitude_ft.into(),
            r.latitude_deg.into(),
            r.longitude_deg.into(),
            r.h_velocity.into(),
            r.heading_deg.into(),
            r.v_velocity.into(),
            r.fix.into(),
            r.sats_total.into(),
            r.sats_24.into(),
            r.sats_32.into(),
            r.sats_40.into(),
        ],
        DecodedRecord::LinkHealth(r) => vec![
            r.time_s.into(),
            r.rssi_1.into(),
            r.rssi_2.into(),
            r.battery_v.into(),
            r.snr_1.into(),
            r.snr_2.into(),
            r.packets_rx.into(),
            r.packets_tx.into(),
            r.acks_rx.into(),
            r.acks_tx.into(),
            r.spreading_factor.into(),
            r.frequency_hz.into(),
        ],
        DecodedRecord::AltimeterA(r) => {
            let mut values = vec![
                r.elapsed_s.into(),
                r.sample_count.into(),
                r.hg.into(),
                r.pg.into(),
                r.battery_v.into(),
                r.flight_state.into(),
                r.aux_1.into(),
                r.aux_2.into(),
            ];
            values.extend(link_values(&r.link));
            values
        }
        DecodedRecord::AltimeterB(r) => {
            let mut values = vec![
                r.time_s.into(),
                r.altitude_ft.into(),
                r.velocity_fps.into(),
                r.battery_v.into(),
                r.pyro.value().into(),
                r.flight_state.into(),
            ];
            values.extend(link_values(&r.link));
            values
        }
    }
}

fn link_values(link: &LinkQuality) -> [Value; 3] {
    [link.rssi_dbm.into(), link.snr_db.into(), link.packet_len.into()]
}
