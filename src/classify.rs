//! Packet classification
//!
//! Decides which format(s) a raw line carries by locating format markers.
//! The ground receiver occasionally concatenates two packets into one line;
//! such compound lines are split into two segments. The receiver appends its
//! link-quality tail once, at the very end; when the first packet is short
//! exactly those fields and both packets share a separator, the tail is copied
//! onto the first segment so both decode on their own.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::decode::{marker_positions, strip_preamble, tokenize};
use crate::schema::{DEFAULT_TRACKER_ID, FORMATS, FormatSchema, Separator};
use crate::types::{ClassifiedSegment, RawLine};

/// Default minimum trimmed line length, in bytes.
pub const DEFAULT_MIN_LINE_LENGTH: usize = 8;

/// Classifier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Radio id that GPS and link-health packets must carry
    pub tracker_id: String,
    /// Lines shorter than this (after trimming) are line noise
    pub min_line_length: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { tracker_id: DEFAULT_TRACKER_ID.to_string(), min_line_length: DEFAULT_MIN_LINE_LENGTH }
    }
}

/// Result of classifying one line.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Shorter than the configured minimum
    TooShort,
    /// No known marker
    Unrecognized,
    /// One or two segments matched. Segments rejected by an addressing gate
    /// are counted in `not_addressed` and left out of `segments`.
    Matched { segments: Vec<ClassifiedSegment>, not_addressed: usize },
}

impl Classification {
    pub fn into_segments(self) -> Vec<ClassifiedSegment> {
        match self {
            Classification::Matched { segments, .. } => segments,
            Classification::TooShort | Classification::Unrecognized => Vec::new(),
        }
    }
}

/// Classify a line into zero, one or two segments.
pub fn classify(line: &RawLine, config: &ClassifierConfig) -> Vec<ClassifiedSegment> {
    classify_line(line, config).into_segments()
}

/// Classify a line, reporting why nothing matched.
pub fn classify_line(line: &RawLine, config: &ClassifierConfig) -> Classification {
    let text = line.text();
    let text = text.trim();
    if text.len() < config.min_line_length {
        trace!(feed = %line.feed, seq = line.seq, len = text.len(), "Dropping short line");
        return Classification::TooShort;
    }

    let mut markers: Vec<(usize, &'static FormatSchema)> = FORMATS
        .iter()
        .flat_map(|format| marker_positions(text, format).map(move |pos| (pos, format)))
        .collect();
    if markers.is_empty() {
        trace!(feed = %line.feed, seq = line.seq, "No known marker, dropping line");
        return Classification::Unrecognized;
    }
    markers.sort_by_key(|(pos, _)| *pos);

    let pieces = match markers.as_slice() {
        [(pos, format)] => vec![(*format, text[*pos..].to_string())],
        [(first_pos, first), (second_pos, second), ..] => {
            trace!(
                feed = %line.feed,
                seq = line.seq,
                first = %first.kind,
                second = %second.kind,
                "Splitting compound line"
            );
            let head = first_segment(text, *first_pos, *second_pos, first, second, config);
            vec![(*first, head), (*second, text[*second_pos..].to_string())]
        }
        [] => Vec::new(),
    };

    let mut segments = Vec::with_capacity(pieces.len());
    let mut not_addressed = 0;
    for (format, text) in pieces {
        if passes_gate(&text, format, &config.tracker_id) {
            segments.push(ClassifiedSegment {
                kind: format.kind,
                feed: line.feed.clone(),
                seq: line.seq,
                text,
            });
        } else {
            trace!(feed = %line.feed, seq = line.seq, kind = %format.kind, "Packet not for us");
            not_addressed += 1;
        }
    }
    Classification::Matched { segments, not_addressed }
}

/// Text between the two markers, with the second packet's link-quality tail
/// re-appended when the first packet is short exactly that many fields.
fn first_segment(
    text: &str,
    start: usize,
    end: usize,
    first: &FormatSchema,
    second: &FormatSchema,
    config: &ClassifierConfig,
) -> String {
    // The next packet's preamble (`@ `, separators) sits between the two.
    let body = text[start..end].trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
    if first.tail_fields == 0 || first.separator != second.separator {
        return body.to_string();
    }

    let found = strip_preamble(body, first)
        .map_or(0, |payload| tokenize(payload, first, &config.tracker_id).len());
    if first.arity.accepts(found) || !first.arity.accepts(found + first.tail_fields) {
        return body.to_string();
    }

    let sep = first.separator.join_char();
    let mut segment = String::with_capacity(body.len() + 16);
    segment.push_str(body);
    for token in tail_tokens(&text[end..], first) {
        segment.push(sep);
        segment.push_str(token);
    }
    segment
}

/// The last `tail_fields` separator-delimited tokens of `text`.
fn tail_tokens<'a>(text: &'a str, format: &FormatSchema) -> Vec<&'a str> {
    let mut tail: Vec<&str> = match format.separator {
        Separator::Whitespace => text.split_whitespace().rev().take(format.tail_fields).collect(),
        Separator::Char(sep) => text
            .split(sep)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .rev()
            .take(format.tail_fields)
            .collect(),
    };
    tail.reverse();
    tail
}

fn passes_gate(segment: &str, format: &FormatSchema, tracker_id: &str) -> bool {
    let gate = &format.gate;
    if gate.tracker_id && !tracker_id.is_empty() && !segment.contains(tracker_id) {
        return false;
    }
    gate.tokens.iter().all(|required| segment.split_whitespace().any(|t| t == *required))
}
