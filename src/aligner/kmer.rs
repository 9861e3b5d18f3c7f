use std::collections::BTreeMap;
use std::sync::OnceLock;

use log::debug;
use rustc_hash::FxHashMap;

use super::layout::{merge_mates, reverse_mate};
use super::mutations::Mutation;
use super::{
    AlignError, Alignment, AlignmentEngine, AlignmentOutcome, AlignmentParameters,
    AlignmentRecord, GeneAlignerParameters, Hit, NotAlignedReason, ReadsLayout, SequenceHistory,
};
use crate::common::sequence::{kmers, same_base};
use crate::common::{Read, SingleRead};
use crate::repertoire::{AlignableGene, CalibratedRepertoire, GeneType};

const MATCH_SCORE: f32 = 5.0;
const MISMATCH_SCORE: f32 = -4.0;

/// k-mer seed positions of all genes of one type
struct TypeIndex {
    k: usize,
    seeds: FxHashMap<u64, Vec<(u32, u32)>>,
}

impl TypeIndex {
    fn build(genes: &[AlignableGene], params: &GeneAlignerParameters) -> Self {
        let k = params.seed_length;
        let mut seeds: FxHashMap<u64, Vec<(u32, u32)>> = FxHashMap::default();
        for (gene_idx, gene) in genes.iter().enumerate() {
            for (pos, code) in kmers(&gene.sequence, k) {
                seeds
                    .entry(code)
                    .or_default()
                    .push((gene_idx as u32, pos as u32));
            }
        }
        TypeIndex { k, seeds }
    }
}

/// Reference alignment engine: k-mer seeding, diagonal voting and ungapped
/// extension of the best diagonal per gene. The seed index is built on first
/// use from the calibrated repertoire of the run, so an instance serves a
/// single run.
#[derive(Default)]
pub struct KmerAligner {
    index: OnceLock<FxHashMap<GeneType, TypeIndex>>,
}

struct Targets {
    reads: Vec<SingleRead>,
    history: Vec<SequenceHistory>,
}

impl KmerAligner {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(
        &self,
        params: &AlignmentParameters,
        repertoire: &CalibratedRepertoire,
    ) -> &FxHashMap<GeneType, TypeIndex> {
        self.index.get_or_init(|| {
            let mut index = FxHashMap::default();
            for gene_type in params.gene_types() {
                let Some(gp) = params.gene_parameters(gene_type) else {
                    continue;
                };
                let type_index = TypeIndex::build(repertoire.genes(gene_type), gp);
                debug!(
                    "Seed index for {} genes: {} distinct {}-mers",
                    gene_type,
                    type_index.seeds.len(),
                    type_index.k
                );
                index.insert(gene_type, type_index);
            }
            index
        })
    }

    fn create_targets(read: &Read, params: &AlignmentParameters) -> Targets {
        let reads = params.reads_layout.create_targets(read);
        let reversed_r2 = params.reads_layout == ReadsLayout::Opposite;
        let history: Vec<SequenceHistory> = reads
            .iter()
            .enumerate()
            .map(|(mate, t)| SequenceHistory::Raw {
                read_id: read.id,
                mate,
                reversed: mate == 1 && reversed_r2,
                length: t.len(),
            })
            .collect();

        if params.merge_reads && reads.len() == 2 {
            if let Some(merged) = merge_mates(&reads[0], &reads[1], params.min_merge_overlap) {
                let overlap_offset = merged.len().saturating_sub(reads[1].len());
                return Targets {
                    reads: vec![merged],
                    history: vec![SequenceHistory::Merge {
                        read_id: read.id,
                        overlap_offset,
                        left: Box::new(history[0].clone()),
                        right: Box::new(history[1].clone()),
                    }],
                };
            }
        }
        Targets { reads, history }
    }

    fn reverse_targets(targets: &Targets) -> Targets {
        let reads = targets.reads.iter().rev().map(reverse_mate).collect();
        let history = targets
            .history
            .iter()
            .rev()
            .map(|h| match h {
                SequenceHistory::Raw {
                    read_id,
                    mate,
                    reversed,
                    length,
                } => SequenceHistory::Raw {
                    read_id: *read_id,
                    mate: *mate,
                    reversed: !reversed,
                    length: *length,
                },
                merged => merged.clone(),
            })
            .collect();
        Targets { reads, history }
    }

    /// Best-scoring contiguous stretch of the ungapped alignment on `diagonal`
    /// (target position = gene position + diagonal).
    fn extend(gene: &[u8], target: &[u8], target_index: usize, diagonal: i64) -> Option<Alignment> {
        let gene_from = 0i64.max(-diagonal) as usize;
        let gene_to = (gene.len() as i64).min(target.len() as i64 - diagonal);
        if gene_to <= gene_from as i64 {
            return None;
        }
        let gene_to = gene_to as usize;

        let mut best = (0.0f32, gene_from, gene_from);
        let mut current = 0.0f32;
        let mut start = gene_from;
        for g in gene_from..gene_to {
            let t = (g as i64 + diagonal) as usize;
            current += if same_base(gene[g], target[t]) {
                MATCH_SCORE
            } else {
                MISMATCH_SCORE
            };
            if current <= 0.0 {
                current = 0.0;
                start = g + 1;
            } else if current > best.0 {
                best = (current, start, g + 1);
            }
        }

        let (score, from, to) = best;
        if score <= 0.0 {
            return None;
        }
        let mutations = (from..to)
            .filter_map(|g| {
                let t = (g as i64 + diagonal) as usize;
                (!same_base(gene[g], target[t])).then(|| Mutation::Substitution {
                    pos: g,
                    from: gene[g],
                    to: target[t],
                })
            })
            .collect();
        Some(Alignment {
            target_index,
            gene_range: (from, to),
            target_range: ((from as i64 + diagonal) as usize, (to as i64 + diagonal) as usize),
            mutations,
            score,
        })
    }

    fn align_gene_type(
        index: &TypeIndex,
        genes: &[AlignableGene],
        params: &GeneAlignerParameters,
        targets: &[SingleRead],
    ) -> Vec<Hit> {
        // (gene, target, diagonal) -> seed votes
        let mut votes: FxHashMap<(u32, usize, i64), u32> = FxHashMap::default();
        for (target_index, target) in targets.iter().enumerate() {
            for (pos, code) in kmers(&target.seq, index.k) {
                if let Some(list) = index.seeds.get(&code) {
                    for &(gene_idx, gene_pos) in list {
                        let diagonal = pos as i64 - gene_pos as i64;
                        *votes.entry((gene_idx, target_index, diagonal)).or_default() += 1;
                    }
                }
            }
        }

        // best diagonal per (gene, target); ties go to the smaller diagonal
        let mut best: BTreeMap<(u32, usize), (u32, i64)> = BTreeMap::new();
        for (&(gene_idx, target_index, diagonal), &count) in votes.iter() {
            let entry = best.entry((gene_idx, target_index)).or_insert((count, diagonal));
            if count > entry.0 || (count == entry.0 && diagonal < entry.1) {
                *entry = (count, diagonal);
            }
        }

        let mut hits: BTreeMap<u32, Hit> = BTreeMap::new();
        for (&(gene_idx, target_index), &(_, diagonal)) in best.iter() {
            let gene = &genes[gene_idx as usize];
            let target = &targets[target_index].seq;
            if let Some(alignment) = Self::extend(&gene.sequence, target, target_index, diagonal) {
                let hit = hits.entry(gene_idx).or_insert_with(|| Hit {
                    gene_name: gene.name.clone(),
                    gene_type: gene.gene_type,
                    score: 0.0,
                    alignments: Vec::new(),
                });
                hit.score += alignment.score;
                hit.alignments.push(alignment);
            }
        }

        let mut hits: Vec<Hit> = hits
            .into_values()
            .filter(|h| h.score >= params.min_score)
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.gene_name.cmp(&b.gene_name))
        });
        if let Some(top) = hits.first().map(|h| h.score) {
            hits.retain(|h| h.score >= top * params.relative_min_score);
        }
        hits.truncate(params.max_hits);
        hits
    }

    fn align_targets(
        &self,
        targets: &[SingleRead],
        params: &AlignmentParameters,
        repertoire: &CalibratedRepertoire,
    ) -> BTreeMap<GeneType, Vec<Hit>> {
        let index = self.index(params, repertoire);
        let mut hits = BTreeMap::new();
        for gene_type in params.gene_types() {
            let found = match (index.get(&gene_type), params.gene_parameters(gene_type)) {
                (Some(type_index), Some(gp)) => {
                    Self::align_gene_type(type_index, repertoire.genes(gene_type), gp, targets)
                }
                _ => Vec::new(),
            };
            hits.insert(gene_type, found);
        }
        hits
    }
}

fn vj_score(hits: &BTreeMap<GeneType, Vec<Hit>>) -> f32 {
    [GeneType::Variable, GeneType::Joining]
        .iter()
        .filter_map(|gt| hits.get(gt).and_then(|h| h.first()))
        .map(|h| h.score)
        .sum()
}

impl AlignmentEngine for KmerAligner {
    fn align(
        &self,
        read: &Read,
        params: &AlignmentParameters,
        repertoire: &CalibratedRepertoire,
    ) -> Result<AlignmentOutcome, AlignError> {
        for mate in &read.mates {
            if mate.seq.len() != mate.qual.len() {
                return Err(AlignError::Recoverable(format!(
                    "sequence and quality lengths differ in read {}",
                    read.id
                )));
            }
        }
        if read.total_len() == 0 {
            return Ok(AlignmentOutcome::NotAligned(NotAlignedReason::EmptyRead));
        }

        let forward = Self::create_targets(read, params);
        let reverse = Self::reverse_targets(&forward);
        let forward_hits = self.align_targets(&forward.reads, params, repertoire);
        let reverse_hits = self.align_targets(&reverse.reads, params, repertoire);
        let (targets, hits) = if vj_score(&reverse_hits) > vj_score(&forward_hits) {
            (reverse, reverse_hits)
        } else {
            (forward, forward_hits)
        };

        let v = hits.get(&GeneType::Variable).map_or(0, |h| h.len());
        let j = hits.get(&GeneType::Joining).map_or(0, |h| h.len());
        if v == 0 && j == 0 {
            return Ok(AlignmentOutcome::NotAligned(NotAlignedReason::NoHits));
        }
        if !params.allow_partial_alignments {
            if v == 0 {
                return Ok(AlignmentOutcome::NotAligned(NotAlignedReason::NoVHits));
            }
            if j == 0 {
                return Ok(AlignmentOutcome::NotAligned(NotAlignedReason::NoJHits));
            }
        }

        let chain_of = |gt: GeneType| {
            hits.get(&gt)
                .and_then(|h| h.first())
                .and_then(|h| repertoire.gene(gt, &h.gene_name))
                .map(|g| &g.chains)
        };
        let chimera = match (chain_of(GeneType::Variable), chain_of(GeneType::Joining)) {
            (Some(v), Some(j)) => !v.intersects(j),
            _ => false,
        };

        Ok(AlignmentOutcome::Aligned(AlignmentRecord {
            read_id: read.id,
            hits,
            targets: targets.reads,
            history: targets.history,
            original_reads: params.save_original_reads.then(|| vec![read.clone()]),
            chimera,
        }))
    }
}
