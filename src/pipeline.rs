//! Classify → decode → encode for one raw line

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, trace};

use crate::classify::{Classification, ClassifierConfig, classify_line};
use crate::decode::Decoder;
use crate::encode::encode;
use crate::error::Rejection;
use crate::types::{BinaryFrame, DecodedRecord, RawLine};

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    /// Raw lines processed
    pub lines: u64,
    /// Lines shorter than the minimum length
    pub too_short: u64,
    /// Lines without any known marker
    pub unrecognized: u64,
    /// Segments dropped by an addressing gate
    pub not_addressed: u64,
    /// Segments decoded and encoded
    pub frames: u64,
    pub missing_marker: u64,
    pub structural_mismatch: u64,
    pub numeric_corruption: u64,
}

impl PipelineSnapshot {
    /// Total segments rejected by the decoder.
    pub fn rejected(&self) -> u64 {
        self.missing_marker + self.structural_mismatch + self.numeric_corruption
    }
}

/// Shared pipeline counters. Feed tasks update these concurrently.
#[derive(Debug, Default)]
pub struct PipelineStats {
    lines: AtomicU64,
    too_short: AtomicU64,
    unrecognized: AtomicU64,
    not_addressed: AtomicU64,
    frames: AtomicU64,
    missing_marker: AtomicU64,
    structural_mismatch: AtomicU64,
    numeric_corruption: AtomicU64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            lines: self.lines.load(Ordering::Relaxed),
            too_short: self.too_short.load(Ordering::Relaxed),
            unrecognized: self.unrecognized.load(Ordering::Relaxed),
            not_addressed: self.not_addressed.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            missing_marker: self.missing_marker.load(Ordering::Relaxed),
            structural_mismatch: self.structural_mismatch.load(Ordering::Relaxed),
            numeric_corruption: self.numeric_corruption.load(Ordering::Relaxed),
        }
    }

    fn record_rejection(&self, rejection: &Rejection) {
        let counter = match rejection {
            Rejection::MissingMarker { .. } => &self.missing_marker,
            Rejection::StructuralMismatch { .. } => &self.structural_mismatch,
            Rejection::NumericCorruption { .. } => &self.numeric_corruption,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Stateless line processor. Clones share counters.
#[derive(Debug, Clone)]
pub struct Pipeline {
    classifier: ClassifierConfig,
    decoder: Decoder,
    stats: Arc<PipelineStats>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Pipeline {
    pub fn new(classifier: ClassifierConfig) -> Self {
        let decoder = Decoder::new(classifier.tracker_id.clone());
        Self { classifier, decoder, stats: Arc::new(PipelineStats::default()) }
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Decode a line into records without encoding them.
    pub fn decode_line(&self, line: &RawLine) -> Vec<DecodedRecord> {
        self.stats.lines.fetch_add(1, Ordering::Relaxed);

        let (segments, not_addressed) = match classify_line(line, &self.classifier) {
            Classification::TooShort => {
                self.stats.too_short.fetch_add(1, Ordering::Relaxed);
                return Vec::new();
            }
            Classification::Unrecognized => {
                self.stats.unrecognized.fetch_add(1, Ordering::Relaxed);
                return Vec::new();
            }
            Classification::Matched { segments, not_addressed } => (segments, not_addressed),
        };
        self.stats.not_addressed.fetch_add(not_addressed as u64, Ordering::Relaxed);

        let mut records = Vec::with_capacity(segments.len());
        for segment in &segments {
            match self.decoder.decode(segment) {
                Ok(record) => records.push(record),
                Err(rejection) => {
                    debug!(feed = %segment.feed, seq = segment.seq, %rejection, "Rejected segment");
                    self.stats.record_rejection(&rejection);
                }
            }
        }
        records
    }

    /// Decode and encode every segment of a line, in segment order.
    pub fn process(&self, line: &RawLine) -> Vec<BinaryFrame> {
        let frames: Vec<BinaryFrame> = self.decode_line(line).iter().map(encode).collect();
        if !frames.is_empty() {
            trace!(feed = %line.feed, seq = line.seq, frames = frames.len(), "Encoded line");
            self.stats.frames.fetch_add(frames.len() as u64, Ordering::Relaxed);
        }
        frames
    }
}
