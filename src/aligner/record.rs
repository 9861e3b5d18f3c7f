use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::mutations::{shift_indels_at_homopolymers, Mutation};
use super::AlignmentParameters;
use crate::common::{Read, SingleRead};
use crate::repertoire::{CalibratedRepertoire, GeneType};

/// Alignment of one gene feature against one target of a read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub target_index: usize,
    pub gene_range: (usize, usize),
    pub target_range: (usize, usize),
    pub mutations: Vec<Mutation>,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub gene_name: String,
    pub gene_type: GeneType,
    pub score: f32,
    pub alignments: Vec<Alignment>,
}

/// Where a target sequence came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceHistory {
    Raw {
        read_id: u64,
        mate: usize,
        reversed: bool,
        length: usize,
    },
    Merge {
        read_id: u64,
        overlap_offset: usize,
        left: Box<SequenceHistory>,
        right: Box<SequenceHistory>,
    },
}

impl SequenceHistory {
    pub fn read_id(&self) -> u64 {
        match self {
            SequenceHistory::Raw { read_id, .. } | SequenceHistory::Merge { read_id, .. } => {
                *read_id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub read_id: u64,
    /// Ranked hits (best first) for every gene type the aligner ran for
    pub hits: BTreeMap<GeneType, Vec<Hit>>,
    pub targets: Vec<SingleRead>,
    pub history: Vec<SequenceHistory>,
    pub original_reads: Option<Vec<Read>>,
    pub chimera: bool,
}

impl AlignmentRecord {
    /// Record for a read that failed to align: empty hit lists, the layout
    /// targets and the raw read as sole history.
    pub fn placeholder(read: &Read, params: &AlignmentParameters) -> Self {
        let hits = params
            .gene_types()
            .into_iter()
            .map(|gt| (gt, Vec::new()))
            .collect();
        let targets = params.reads_layout.create_targets(read);
        let history = targets
            .iter()
            .enumerate()
            .map(|(mate, t)| SequenceHistory::Raw {
                read_id: read.id,
                mate,
                reversed: mate == 1 && params.reads_layout == super::ReadsLayout::Opposite,
                length: t.len(),
            })
            .collect();

        AlignmentRecord {
            read_id: read.id,
            hits,
            targets,
            history,
            original_reads: params.save_original_reads.then(|| vec![read.clone()]),
            chimera: false,
        }
    }

    pub fn best_hit(&self, gene_type: GeneType) -> Option<&Hit> {
        self.hits.get(&gene_type).and_then(|h| h.first())
    }

    pub fn has_hits(&self) -> bool {
        self.hits.values().any(|h| !h.is_empty())
    }

    /// Normalize indel positions inside homopolymers. Idempotent.
    pub fn shift_indels_at_homopolymers(&mut self, repertoire: &CalibratedRepertoire) {
        for (gene_type, hits) in self.hits.iter_mut() {
            for hit in hits.iter_mut() {
                let Some(gene) = repertoire.gene(*gene_type, &hit.gene_name) else {
                    continue;
                };
                for alignment in hit.alignments.iter_mut() {
                    shift_indels_at_homopolymers(&gene.sequence, &mut alignment.mutations);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NotAlignedReason {
    EmptyRead,
    NoHits,
    NoVHits,
    NoJHits,
    /// The engine failed on this read; the run continues
    AlignmentFailed,
}

impl NotAlignedReason {
    pub const ALL: [NotAlignedReason; 5] = [
        NotAlignedReason::EmptyRead,
        NotAlignedReason::NoHits,
        NotAlignedReason::NoVHits,
        NotAlignedReason::NoJHits,
        NotAlignedReason::AlignmentFailed,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            NotAlignedReason::EmptyRead => "empty read",
            NotAlignedReason::NoHits => "no hits (not TCR/IG?)",
            NotAlignedReason::NoVHits => "no V hits",
            NotAlignedReason::NoJHits => "no J hits",
            NotAlignedReason::AlignmentFailed => "alignment failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentOutcome {
    Aligned(AlignmentRecord),
    NotAligned(NotAlignedReason),
}

/// Engine output for one read, carrying the read for routing and reordering
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub read: Read,
    pub outcome: AlignmentOutcome,
}

impl AlignmentResult {
    pub fn read_id(&self) -> u64 {
        self.read.id
    }

    pub fn shift_indels_at_homopolymers(mut self, repertoire: &CalibratedRepertoire) -> Self {
        if let AlignmentOutcome::Aligned(record) = &mut self.outcome {
            record.shift_indels_at_homopolymers(repertoire);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SingleRead;

    #[test]
    fn test_placeholder() {
        let mut params = AlignmentParameters::default();
        params.save_original_reads = true;
        let read = Read::paired(
            7,
            SingleRead::new(None, b"ACGT".to_vec(), b"IIII".to_vec()),
            SingleRead::new(None, b"AAC".to_vec(), b"III".to_vec()),
        );
        let record = AlignmentRecord::placeholder(&read, &params);
        assert_eq!(record.read_id, 7);
        assert_eq!(record.hits.len(), 4);
        assert!(!record.has_hits());
        assert_eq!(record.targets[1].seq, b"GTT".to_vec());
        assert_eq!(record.history.len(), 2);
        assert_eq!(record.history[0].read_id(), 7);
        assert_eq!(record.original_reads.as_ref().unwrap()[0], read);
        assert!(!record.chimera);
    }
}
