use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::router::RouteOutcome;
use super::trim::ReadTrimming;
use crate::aligner::{AlignmentOutcome, NotAlignedReason};
use crate::repertoire::GeneType;
use crate::runtime::Error;

fn reason_index(reason: NotAlignedReason) -> usize {
    NotAlignedReason::ALL
        .iter()
        .position(|r| *r == reason)
        .unwrap_or(0)
}

fn gene_type_index(gene_type: GeneType) -> usize {
    GeneType::ALL
        .iter()
        .position(|g| *g == gene_type)
        .unwrap_or(0)
}

fn unix_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Run-wide counters. Shared by handle between the producer, the workers and
/// the router; all updates are atomic.
#[derive(Debug)]
pub struct RunReport {
    started: SystemTime,
    finished: Mutex<Option<SystemTime>>,
    command_line: String,
    input_files: Vec<String>,
    output_files: Vec<String>,

    total_reads: AtomicU64,
    aligned: AtomicU64,
    not_aligned: [AtomicU64; 5],
    chimeras: AtomicU64,
    hits: [AtomicU64; 4],

    excluded_functional: AtomicU64,
    excluded_non_functional: AtomicU64,

    reads_trimmed: AtomicU64,
    bases_removed: [AtomicU64; 2],
    trimmed_to_empty: AtomicU64,

    routed_alignment: AtomicU64,
    routed_rejected: AtomicU64,
    discarded: AtomicU64,

    reorder_buffer_peak: AtomicUsize,
    finalized: AtomicBool,
}

impl RunReport {
    pub fn new(command_line: String, input_files: Vec<String>, output_files: Vec<String>) -> Self {
        RunReport {
            started: SystemTime::now(),
            finished: Mutex::new(None),
            command_line,
            input_files,
            output_files,
            total_reads: AtomicU64::new(0),
            aligned: AtomicU64::new(0),
            not_aligned: Default::default(),
            chimeras: AtomicU64::new(0),
            hits: Default::default(),
            excluded_functional: AtomicU64::new(0),
            excluded_non_functional: AtomicU64::new(0),
            reads_trimmed: AtomicU64::new(0),
            bases_removed: Default::default(),
            trimmed_to_empty: AtomicU64::new(0),
            routed_alignment: AtomicU64::new(0),
            routed_rejected: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            reorder_buffer_peak: AtomicUsize::new(0),
            finalized: AtomicBool::new(false),
        }
    }

    /// Counters are frozen once the snapshot is taken
    fn debug_assert_open(&self) {
        debug_assert!(
            !self.finalized.load(Ordering::Relaxed),
            "run report updated after finalize"
        );
    }

    pub fn on_input(&self) {
        self.debug_assert_open();
        self.total_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_trimmed(&self, trimming: &ReadTrimming) {
        self.debug_assert_open();
        if !trimming.is_trimmed() {
            return;
        }
        self.reads_trimmed.fetch_add(1, Ordering::Relaxed);
        for (mate, removed) in trimming.removed.iter().enumerate().take(2) {
            self.bases_removed[mate].fetch_add(*removed as u64, Ordering::Relaxed);
        }
        if trimming.emptied {
            self.trimmed_to_empty.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn on_outcome(&self, outcome: &AlignmentOutcome) {
        self.debug_assert_open();
        match outcome {
            AlignmentOutcome::Aligned(record) => {
                self.aligned.fetch_add(1, Ordering::Relaxed);
                for gene_type in GeneType::ALL {
                    if record.best_hit(gene_type).is_some() {
                        self.hits[gene_type_index(gene_type)].fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            AlignmentOutcome::NotAligned(reason) => {
                self.not_aligned[reason_index(*reason)].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn on_chimera(&self) {
        self.debug_assert_open();
        self.chimeras.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_route(&self, outcome: RouteOutcome) {
        self.debug_assert_open();
        let counter = match outcome {
            RouteOutcome::AlignmentSink => &self.routed_alignment,
            RouteOutcome::RejectedSink => &self.routed_rejected,
            RouteOutcome::Discarded => &self.discarded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_excluded_genes(&self, functional: u64, non_functional: u64) {
        self.debug_assert_open();
        self.excluded_functional.store(functional, Ordering::Relaxed);
        self.excluded_non_functional
            .store(non_functional, Ordering::Relaxed);
    }

    pub fn set_reorder_buffer_peak(&self, peak: usize) {
        self.debug_assert_open();
        self.reorder_buffer_peak.fetch_max(peak, Ordering::Relaxed);
    }

    pub fn total_reads(&self) -> u64 {
        self.total_reads.load(Ordering::Relaxed)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Stop the clock and freeze the counters. Only the first call succeeds.
    pub fn finalize(&self) -> Result<ReportSnapshot, Error> {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return Err(Error::ReportFinalized);
        }
        let finished = SystemTime::now();
        if let Ok(mut f) = self.finished.lock() {
            *f = Some(finished);
        }

        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        Ok(ReportSnapshot {
            started_at: unix_millis(self.started),
            finished_at: unix_millis(finished),
            elapsed_ms: finished
                .duration_since(self.started)
                .unwrap_or(Duration::ZERO)
                .as_millis() as u64,
            command_line: self.command_line.clone(),
            input_files: self.input_files.clone(),
            output_files: self.output_files.clone(),
            total_reads: load(&self.total_reads),
            aligned: load(&self.aligned),
            not_aligned: NotAlignedReason::ALL
                .iter()
                .map(|r| (*r, load(&self.not_aligned[reason_index(*r)])))
                .collect(),
            chimeras: load(&self.chimeras),
            hits: GeneType::ALL
                .iter()
                .map(|g| (*g, load(&self.hits[gene_type_index(*g)])))
                .collect(),
            excluded_functional_genes: load(&self.excluded_functional),
            excluded_non_functional_genes: load(&self.excluded_non_functional),
            trimming: TrimmingSnapshot {
                reads_trimmed: load(&self.reads_trimmed),
                bases_removed_r1: load(&self.bases_removed[0]),
                bases_removed_r2: load(&self.bases_removed[1]),
                trimmed_to_empty: load(&self.trimmed_to_empty),
            },
            routing: RoutingSnapshot {
                alignment_sink: load(&self.routed_alignment),
                rejected_sink: load(&self.routed_rejected),
                discarded: load(&self.discarded),
            },
            reorder_buffer_peak: self.reorder_buffer_peak.load(Ordering::Relaxed),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimmingSnapshot {
    pub reads_trimmed: u64,
    pub bases_removed_r1: u64,
    pub bases_removed_r2: u64,
    pub trimmed_to_empty: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingSnapshot {
    pub alignment_sink: u64,
    pub rejected_sink: u64,
    pub discarded: u64,
}

/// Immutable copy of a finalized `RunReport`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    pub started_at: u64,
    pub finished_at: u64,
    pub elapsed_ms: u64,
    pub command_line: String,
    pub input_files: Vec<String>,
    pub output_files: Vec<String>,
    pub total_reads: u64,
    pub aligned: u64,
    pub not_aligned: BTreeMap<NotAlignedReason, u64>,
    pub chimeras: u64,
    pub hits: BTreeMap<GeneType, u64>,
    pub excluded_functional_genes: u64,
    pub excluded_non_functional_genes: u64,
    pub trimming: TrimmingSnapshot,
    pub routing: RoutingSnapshot,
    pub reorder_buffer_peak: usize,
}

impl ReportSnapshot {
    pub fn not_aligned(&self, reason: NotAlignedReason) -> u64 {
        self.not_aligned.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_not_aligned(&self) -> u64 {
        self.not_aligned.values().sum()
    }

    pub fn hits(&self, gene_type: GeneType) -> u64 {
        self.hits.get(&gene_type).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_once() {
        let report = RunReport::new("vdjalign align".to_string(), vec![], vec![]);
        report.on_input();
        report.on_input();
        report.on_outcome(&AlignmentOutcome::NotAligned(NotAlignedReason::NoJHits));
        report.on_route(RouteOutcome::Discarded);
        report.on_trimmed(&ReadTrimming {
            removed: vec![3, 0],
            emptied: false,
        });
        report.on_trimmed(&ReadTrimming {
            removed: vec![0, 0],
            emptied: false,
        });
        report.set_reorder_buffer_peak(4);
        report.set_reorder_buffer_peak(2);

        let snapshot = report.finalize().unwrap();
        assert_eq!(snapshot.total_reads, 2);
        assert_eq!(snapshot.not_aligned(NotAlignedReason::NoJHits), 1);
        assert_eq!(snapshot.total_not_aligned(), 1);
        assert_eq!(snapshot.routing.discarded, 1);
        assert_eq!(snapshot.trimming.reads_trimmed, 1);
        assert_eq!(snapshot.trimming.bases_removed_r1, 3);
        assert_eq!(snapshot.reorder_buffer_peak, 4);
        assert!(snapshot.finished_at >= snapshot.started_at);

        assert!(matches!(report.finalize(), Err(Error::ReportFinalized)));
        assert!(report.is_finalized());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "run report updated after finalize")]
    fn test_no_update_after_finalize() {
        let report = RunReport::new("vdjalign align".to_string(), vec![], vec![]);
        report.on_input();
        report.finalize().unwrap();
        report.on_route(RouteOutcome::AlignmentSink);
    }
}
