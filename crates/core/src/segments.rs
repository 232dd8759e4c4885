//! Frame-label array ⇄ segment codec.
//!
//! The persisted form of an annotation is always the dense per-frame label
//! array. Segments are a read-only projection of it: maximal runs of one
//! non-`NONE` label, ascending and non-overlapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Sentinel label for frames nobody has labeled.
pub const NONE_LABEL: &str = "NONE";

/// Maximum label length in bytes.
pub const MAX_LABEL_LENGTH: usize = 128;

/// A maximal run of frames sharing one label. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub label: String,
    pub start_frame: usize,
    pub end_frame: usize,
}

impl Segment {
    /// Number of frames covered by the segment.
    pub fn frame_count(&self) -> usize {
        self.end_frame - self.start_frame + 1
    }
}

/// Build a fresh array of `len` frames, all labeled `NONE`.
pub fn blank_labels(len: usize) -> Vec<String> {
    vec![NONE_LABEL.to_string(); len]
}

/// Run-length encode a frame-label array into segments.
///
/// Labels that are not part of the currently loaded label set are emitted
/// like any other; the codec never drops data.
pub fn encode<S: AsRef<str>>(labels: &[S]) -> Vec<Segment> {
    let mut segments = Vec::new();
    // (label, start) of the run currently open, if any.
    let mut open: Option<(&str, usize)> = None;

    for (index, label) in labels.iter().enumerate() {
        let label = label.as_ref();

        if let Some((current, start)) = open {
            if current == label {
                continue;
            }
            segments.push(Segment {
                label: current.to_string(),
                start_frame: start,
                end_frame: index - 1,
            });
            open = None;
        }

        if label != NONE_LABEL {
            open = Some((label, index));
        }
    }

    if let Some((current, start)) = open {
        segments.push(Segment {
            label: current.to_string(),
            start_frame: start,
            end_frame: labels.len() - 1,
        });
    }

    segments
}

/// Write `segment.label` across the segment's inclusive frame range.
pub fn fill_range(labels: &mut [String], segment: &Segment) -> Result<(), CoreError> {
    if segment.start_frame > segment.end_frame {
        return Err(CoreError::Validation(format!(
            "Segment start {} is after end {}",
            segment.start_frame, segment.end_frame
        )));
    }
    if segment.end_frame >= labels.len() {
        return Err(CoreError::Validation(format!(
            "Segment end {} is outside 0..{}",
            segment.end_frame,
            labels.len()
        )));
    }

    for slot in &mut labels[segment.start_frame..=segment.end_frame] {
        slot.clone_from(&segment.label);
    }
    Ok(())
}

/// Replay segments into a fresh `NONE`-filled array of `len` frames.
pub fn replay(segments: &[Segment], len: usize) -> Result<Vec<String>, CoreError> {
    let mut labels = blank_labels(len);
    for segment in segments {
        fill_range(&mut labels, segment)?;
    }
    Ok(labels)
}

/// Count frames per label in a single pass.
pub fn label_counts<S: AsRef<str>>(labels: &[S]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label.as_ref().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Validate a label before it is persisted.
///
/// The on-disk format is one label per line, so line breaks and empty
/// labels would corrupt the frame count on the next load.
pub fn validate_label(label: &str) -> Result<(), CoreError> {
    if label.is_empty() {
        return Err(CoreError::Validation("Label must not be empty".into()));
    }
    if label.len() > MAX_LABEL_LENGTH {
        return Err(CoreError::Validation(format!(
            "Label exceeds {MAX_LABEL_LENGTH} bytes"
        )));
    }
    if label.contains(['\n', '\r']) {
        return Err(CoreError::Validation(
            "Label must not contain line breaks".into(),
        ));
    }
    Ok(())
}
