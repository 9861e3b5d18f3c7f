use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::constants::DEFAULT_TRIMMING_WINDOW_SIZE;
use crate::common::sequence::PHRED_OFFSET;
use crate::common::Read;

/// Sliding window quality trimming. Disabled when `threshold` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTrimmerParameters {
    pub threshold: u8,
    pub window_size: usize,
}

impl Default for QualityTrimmerParameters {
    fn default() -> Self {
        QualityTrimmerParameters {
            threshold: 0,
            window_size: DEFAULT_TRIMMING_WINDOW_SIZE,
        }
    }
}

impl QualityTrimmerParameters {
    pub fn new(threshold: u8, window_size: usize) -> Self {
        QualityTrimmerParameters {
            threshold,
            window_size,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold > 0
    }
}

/// What trimming did to one read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadTrimming {
    /// Bases removed per mate
    pub removed: Vec<usize>,
    /// Some mate was trimmed down to nothing
    pub emptied: bool,
}

impl ReadTrimming {
    pub fn is_trimmed(&self) -> bool {
        self.removed.iter().any(|&r| r > 0)
    }
}

#[inline(always)]
fn window_passes(qual: &[u8], threshold: u64) -> bool {
    let sum: u64 = qual
        .iter()
        .map(|&q| q.saturating_sub(PHRED_OFFSET) as u64)
        .sum();
    sum >= threshold * qual.len() as u64
}

/// Range of `qual` kept after trimming failing windows from both ends.
/// Empty when no window passes.
pub fn trim_range(qual: &[u8], params: &QualityTrimmerParameters) -> Range<usize> {
    let len = qual.len();
    if len == 0 {
        return 0..0;
    }
    let w = params.window_size.clamp(1, len);
    let threshold = params.threshold as u64;

    let Some(start) = (0..=len - w).find(|&s| window_passes(&qual[s..s + w], threshold)) else {
        return 0..0;
    };
    // a passing window exists, so the reverse scan always finds one
    let end = (start..=len - w)
        .rev()
        .find(|&s| window_passes(&qual[s..s + w], threshold))
        .map_or(len, |s| s + w);
    start..end
}

/// Trim every mate of `read` in place. Mates are never dropped.
pub fn trim_read(read: &mut Read, params: &QualityTrimmerParameters) -> ReadTrimming {
    let mut result = ReadTrimming::default();
    for mate in read.mates.iter_mut() {
        let before = mate.len();
        let range = trim_range(&mate.qual, params);
        mate.retain_range(range);
        result.removed.push(before - mate.len());
        if before > 0 && mate.is_empty() {
            result.emptied = true;
        }
    }
    result
}
