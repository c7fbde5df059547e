//! Marker search and tokenization

use std::borrow::Cow;

use crate::schema::{FormatSchema, Separator};

/// Byte offsets of every match of `format`'s marker in `text`.
///
/// Boundary-flagged markers only match at the start of `text` or after a
/// byte that is not ASCII alphanumeric.
pub(crate) fn marker_positions<'a>(
    text: &'a str,
    format: &'a FormatSchema,
) -> impl Iterator<Item = usize> + 'a {
    let bytes = text.as_bytes();
    text.match_indices(format.marker).map(|(pos, _)| pos).filter(move |&pos| {
        !format.marker_boundary || pos == 0 || !bytes[pos - 1].is_ascii_alphanumeric()
    })
}

/// Payload following the first valid marker, or `None` when the marker is
/// missing or truncated.
pub(crate) fn strip_preamble<'a>(text: &'a str, format: &FormatSchema) -> Option<&'a str> {
    let pos = marker_positions(text, format).next()?;
    text.get(pos + format.marker.len()..)
}

/// Split a payload into cleaned tokens according to the format's rules.
///
/// Repeated separators collapse. Tokens emptied by character stripping are
/// dropped, as are ignorable words, the tracker id (when the format asks for
/// it), and tokens holding letters (when the format asks for it).
pub(crate) fn tokenize<'a>(
    payload: &'a str,
    format: &FormatSchema,
    tracker_id: &str,
) -> Vec<Cow<'a, str>> {
    let rules = &format.normalizer;
    let raw: Box<dyn Iterator<Item = &'a str>> = match format.separator {
        Separator::Whitespace => Box::new(payload.split_whitespace()),
        Separator::Char(sep) => Box::new(payload.split(sep)),
    };

    raw.filter_map(|token| {
        let token = token.trim();
        let cleaned: Cow<'a, str> = if token.contains(rules.strip_chars) {
            Cow::Owned(token.chars().filter(|c| !rules.strip_chars.contains(c)).collect())
        } else {
            Cow::Borrowed(token)
        };

        let keep = !cleaned.is_empty()
            && !rules.ignore_words.iter().any(|word| cleaned == *word)
            && !(rules.ignore_tracker_id && !tracker_id.is_empty() && cleaned == tracker_id)
            && !(rules.drop_alpha_tokens && cleaned.bytes().any(|b| b.is_ascii_alphabetic()));
        keep.then_some(cleaned)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DEFAULT_TRACKER_ID, format_for};
    use crate::types::MessageKind;

    #[test]
    fn boundary_markers_skip_embedded_matches() {
        let format = format_for(MessageKind::AltimeterA);
        let positions: Vec<_> = marker_positions("SNR:5 R:1", format).collect();
        assert_eq!(positions, vec![6]);
    }

    #[test]
    fn long_markers_tolerate_leading_garbage() {
        let format = format_for(MessageKind::GpsTracker);
        assert_eq!(strip_preamble("x7#GPS_STAT 202", format), Some(" 202"));
        assert_eq!(strip_preamble("GPS_STA 202", format), None);
    }

    #[test]
    fn colon_tokens_collapse_and_strip() {
        let format = format_for(MessageKind::AltimeterA);
        let tokens = tokenize("2864:: -13 :\"-75\"#:", format, DEFAULT_TRACKER_ID);
        assert_eq!(tokens, vec!["2864", "-13", "-75"]);
    }

    #[test]
    fn gps_tokens_drop_labels_and_tracker_id() {
        let format = format_for(MessageKind::GpsTracker);
        let tokens = tokenize(
            " 03:00:59.920 CRC_OK TRK FthrWt04072 Alt 000114 # 21 CRC: 7C9A",
            format,
            DEFAULT_TRACKER_ID,
        );
        assert_eq!(tokens, vec!["030059.920", "000114", "21", "7C9A"]);
    }

    #[test]
    fn link_health_tokens_drop_anything_alphabetic() {
        let format = format_for(MessageKind::LinkHealth);
        let tokens =
            tokenize("PkRx 10636 RSSI -077 trk_B_V 3972 CRC: 5D9B", format, DEFAULT_TRACKER_ID);
        assert_eq!(tokens, vec!["10636", "-077", "3972"]);
    }
}
