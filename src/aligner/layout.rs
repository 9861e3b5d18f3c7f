use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::sequence::{reverse_complement, same_base};
use crate::common::{Read, SingleRead};

/// Relative orientation of the two mates of a paired read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadsLayout {
    /// R2 is read from the opposite strand (standard Illumina paired-end)
    Opposite,
    Collinear,
}

impl FromStr for ReadsLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opposite" => Ok(ReadsLayout::Opposite),
            "collinear" => Ok(ReadsLayout::Collinear),
            _ => Err(format!("Unknown reads layout: {}", s)),
        }
    }
}

impl ReadsLayout {
    /// Mates brought onto the same strand
    pub fn create_targets(&self, read: &Read) -> Vec<SingleRead> {
        let mut targets = Vec::with_capacity(read.mates.len());
        targets.push(read.r1().clone());
        if let Some(r2) = read.r2() {
            match self {
                ReadsLayout::Opposite => targets.push(reverse_mate(r2)),
                ReadsLayout::Collinear => targets.push(r2.clone()),
            }
        }
        targets
    }
}

pub fn reverse_mate(mate: &SingleRead) -> SingleRead {
    let mut qual = mate.qual.clone();
    qual.reverse();
    SingleRead::new(mate.description.clone(), reverse_complement(&mate.seq), qual)
}

/// Merge two same-strand mates on their overlap.
/// The overlap must be at least `min_overlap` long with at most 10%
/// mismatches; the longest acceptable overlap wins. In the overlap the base
/// with the higher quality is kept.
pub fn merge_mates(left: &SingleRead, right: &SingleRead, min_overlap: usize) -> Option<SingleRead> {
    if min_overlap == 0 || left.len() < min_overlap || right.len() < min_overlap {
        return None;
    }

    for offset in 0..=(left.len() - min_overlap) {
        let overlap = (left.len() - offset).min(right.len());
        let max_mismatches = overlap / 10;
        let mut mismatches = 0;
        for i in 0..overlap {
            if !same_base(left.seq[offset + i], right.seq[i]) {
                mismatches += 1;
                if mismatches > max_mismatches {
                    break;
                }
            }
        }
        if mismatches > max_mismatches {
            continue;
        }

        let mut seq = Vec::with_capacity(offset + right.len().max(left.len() - offset));
        let mut qual = Vec::with_capacity(seq.capacity());
        seq.extend_from_slice(&left.seq[..offset]);
        qual.extend_from_slice(&left.qual[..offset]);
        for i in 0..overlap {
            let (l, r) = (offset + i, i);
            if left.qual[l] >= right.qual[r] {
                seq.push(left.seq[l]);
                qual.push(left.qual[l]);
            } else {
                seq.push(right.seq[r]);
                qual.push(right.qual[r]);
            }
        }
        // right mate shorter than the left tail: keep what remains of left
        seq.extend_from_slice(&left.seq[offset + overlap..]);
        qual.extend_from_slice(&left.qual[offset + overlap..]);
        seq.extend_from_slice(&right.seq[overlap..]);
        qual.extend_from_slice(&right.qual[overlap..]);
        return Some(SingleRead::new(left.description.clone(), seq, qual));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mate(seq: &[u8]) -> SingleRead {
        SingleRead::new(None, seq.to_vec(), vec![b'I'; seq.len()])
    }

    #[test]
    fn test_opposite_targets() {
        let read = Read::paired(0, mate(b"AACC"), mate(b"GGTA"));
        let targets = ReadsLayout::Opposite.create_targets(&read);
        assert_eq!(targets[1].seq, b"TACC".to_vec());
        let targets = ReadsLayout::Collinear.create_targets(&read);
        assert_eq!(targets[1].seq, b"GGTA".to_vec());
    }

    #[test]
    fn test_merge_mates() {
        let left = mate(b"TTTTGATTACAGATTACA");
        let right = mate(b"GATTACAGATTACACCCC");
        let merged = merge_mates(&left, &right, 12).unwrap();
        assert_eq!(merged.seq, b"TTTTGATTACAGATTACACCCC".to_vec());
        assert_eq!(merged.qual.len(), merged.seq.len());
    }

    #[test]
    fn test_merge_prefers_quality() {
        let left = SingleRead::new(None, b"ACGTACGTACGTAC".to_vec(), b"IIIIIIIIIIII#I".to_vec());
        let right = SingleRead::new(None, b"ACGTACGTACGTTC".to_vec(), b"IIIIIIIIIIIIII".to_vec());
        let merged = merge_mates(&left, &right, 12).unwrap();
        assert_eq!(merged.seq, b"ACGTACGTACGTTC".to_vec());
    }

    #[test]
    fn test_no_overlap() {
        assert!(merge_mates(&mate(b"AAAAAAAAAAAAAA"), &mate(b"CCCCCCCCCCCCCC"), 12).is_none());
        assert!(merge_mates(&mate(b"ACGT"), &mate(b"ACGT"), 12).is_none());
    }
}
