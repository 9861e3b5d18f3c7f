use std::io;
use std::time::Duration;

use vdjalign::aligner::{
    AlignError, AlignmentEngine, AlignmentOutcome, AlignmentParameters, AlignmentRecord, Hit,
    NotAlignedReason,
};
use vdjalign::common::{Read, SingleRead};
use vdjalign::core::{run, PipelineConfig, QualityTrimmerParameters, ReportSnapshot, Sinks};
use vdjalign::fileformat::{AlignmentSink, RejectedSink, VecReadSource};
use vdjalign::repertoire::{CalibratedRepertoire, GeneType};
use vdjalign::runtime::Error;

/// Aligns on the first base: A aligned, C chimera, N no hits, X fatal
struct FirstBaseEngine;

impl AlignmentEngine for FirstBaseEngine {
    fn align(
        &self,
        read: &Read,
        params: &AlignmentParameters,
        _repertoire: &CalibratedRepertoire,
    ) -> Result<AlignmentOutcome, AlignError> {
        // uneven work so batches finish out of order
        std::thread::sleep(Duration::from_micros((read.id * 7919) % 200));
        let mut record = AlignmentRecord::placeholder(read, params);
        record.hits.insert(
            GeneType::Variable,
            vec![Hit {
                gene_name: "TRBV1*01".to_string(),
                gene_type: GeneType::Variable,
                score: 200.0,
                alignments: vec![],
            }],
        );
        match read.r1().seq.first() {
            Some(b'A') => Ok(AlignmentOutcome::Aligned(record)),
            Some(b'C') => {
                record.chimera = true;
                Ok(AlignmentOutcome::Aligned(record))
            }
            Some(b'X') => Err(AlignError::Fatal("broken index".to_string())),
            Some(_) => Ok(AlignmentOutcome::NotAligned(NotAlignedReason::NoHits)),
            None => Ok(AlignmentOutcome::NotAligned(NotAlignedReason::EmptyRead)),
        }
    }
}

#[derive(Default)]
struct CollectRejected {
    paired: bool,
    ids: Vec<u64>,
}

impl RejectedSink for CollectRejected {
    fn write(&mut self, read: &Read) -> io::Result<()> {
        self.ids.push(read.id);
        Ok(())
    }

    fn is_paired(&self) -> bool {
        self.paired
    }
}

/// Fails on the n-th write
struct BrokenSink {
    writes_left: usize,
}

impl AlignmentSink for BrokenSink {
    fn write(&mut self, _record: &AlignmentRecord) -> io::Result<()> {
        if self.writes_left == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.writes_left -= 1;
        Ok(())
    }
}

fn single(seq: &str) -> Read {
    Read::single(
        0,
        SingleRead::new(None, seq.as_bytes().to_vec(), vec![b'I'; seq.len()]),
    )
}

fn reads(seqs: &[&str]) -> Vec<Read> {
    seqs.iter().map(|s| single(s)).collect()
}

fn run_with(
    seqs: &[&str],
    config: &PipelineConfig,
    alignments: &mut Vec<AlignmentRecord>,
    rejected: Option<&mut CollectRejected>,
) -> Result<ReportSnapshot, Error> {
    run(
        VecReadSource::new(reads(seqs)),
        AlignmentParameters::default(),
        CalibratedRepertoire::new(),
        FirstBaseEngine,
        Sinks::new(
            Some(alignments),
            rejected.map(|r| r as &mut dyn RejectedSink),
        ),
        config,
    )
}

#[test]
fn three_reads_two_threads() {
    let mut alignments = Vec::new();
    let report = run_with(&["ACGT", "AAAA", "ATTT"], &PipelineConfig::new(2), &mut alignments, None)
        .unwrap();

    let ids: Vec<u64> = alignments.iter().map(|r| r.read_id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(report.total_reads, 3);
    assert_eq!(report.aligned, 3);
    assert_eq!(report.chimeras, 0);
    assert_eq!(report.hits(GeneType::Variable), 3);
}

#[test]
fn unaligned_read_goes_to_rejected_sink_only() {
    let mut alignments = Vec::new();
    let mut rejected = CollectRejected::default();
    let report = run_with(
        &["ACGT", "GGGG", "ACCA"],
        &PipelineConfig::new(2),
        &mut alignments,
        Some(&mut rejected),
    )
    .unwrap();

    assert_eq!(alignments.iter().map(|r| r.read_id).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(rejected.ids, vec![1]);
    assert_eq!(report.not_aligned(NotAlignedReason::NoHits), 1);
    assert_eq!(report.routing.rejected_sink, 1);
    assert_eq!(report.routing.alignment_sink, 2);
    assert_eq!(report.routing.discarded, 0);
}

#[test]
fn limit_bounds_intake() {
    let mut alignments = Vec::new();
    let mut config = PipelineConfig::new(3);
    config.runtime.limit = Some(2);
    let report = run_with(&["AC", "AC", "AC", "AC", "AC"], &config, &mut alignments, None).unwrap();

    assert_eq!(report.total_reads, 2);
    assert_eq!(alignments.len(), 2);
}

#[test]
fn output_order_for_any_thread_count_and_batch_size() {
    let seqs: Vec<String> = (0..500)
        .map(|i| if i % 5 == 0 { "GGT".to_string() } else { "ACG".to_string() })
        .collect();
    let seqs: Vec<&str> = seqs.iter().map(|s| s.as_str()).collect();

    for threads in [1, 2, 8] {
        for batch_size in [1, 3, 64, 1000] {
            let mut config = PipelineConfig::new(threads);
            config.threading.batch_size = batch_size;
            config.threading.buffer_depth = 2;
            let mut alignments = Vec::new();
            let mut rejected = CollectRejected::default();
            let report = run_with(&seqs, &config, &mut alignments, Some(&mut rejected)).unwrap();

            let ids: Vec<u64> = alignments.iter().map(|r| r.read_id).collect();
            assert!(ids.windows(2).all(|w| w[0] < w[1]), "threads {} batch {}", threads, batch_size);
            assert!(rejected.ids.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(ids.len() + rejected.ids.len(), 500);
            assert_eq!(report.total_reads, 500);
        }
    }
}

#[test]
fn every_read_has_exactly_one_destination() {
    let seqs = ["ACGT", "GGGG", "", "CCCC", "TTTT", "AAAA"];
    let mut alignments = Vec::new();
    let report = run_with(&seqs, &PipelineConfig::new(2), &mut alignments, None).unwrap();

    let routed =
        report.routing.alignment_sink + report.routing.rejected_sink + report.routing.discarded;
    assert_eq!(routed, report.total_reads);
    assert_eq!(report.aligned + report.total_not_aligned(), report.total_reads);
    assert_eq!(report.routing.discarded, 3);
    assert_eq!(report.chimeras, 1);
    assert_eq!(report.not_aligned(NotAlignedReason::EmptyRead), 1);
}

#[test]
fn write_all_writes_every_read() {
    let seqs = ["ACGT", "GGGG", "TTTT", "AAAA"];
    let mut config = PipelineConfig::new(2);
    config.runtime.write_all = true;
    let mut alignments = Vec::new();
    let report = run_with(&seqs, &config, &mut alignments, None).unwrap();

    assert_eq!(alignments.len(), 4);
    assert_eq!(report.routing.alignment_sink, 4);
    assert!(!alignments[1].has_hits());
    assert!(alignments[0].has_hits());
}

#[test]
fn sink_failure_is_fatal() {
    let seqs: Vec<&str> = std::iter::repeat("ACGT").take(300).collect();
    let mut sink = BrokenSink { writes_left: 10 };
    let mut config = PipelineConfig::new(4);
    config.threading.batch_size = 4;
    let result = run(
        VecReadSource::new(reads(&seqs)),
        AlignmentParameters::default(),
        CalibratedRepertoire::new(),
        FirstBaseEngine,
        Sinks::new(Some(&mut sink), None),
        &config,
    );
    assert!(matches!(result, Err(Error::SinkWrite { .. })));
}

#[test]
fn fatal_engine_error_aborts_run() {
    let seqs = ["ACGT", "ACGT", "XXXX", "ACGT"];
    let mut alignments = Vec::new();
    let result = run_with(&seqs, &PipelineConfig::new(2), &mut alignments, None);
    assert!(matches!(result, Err(Error::Alignment { read_id: 2, .. })));
}

#[test]
fn paired_input_needs_paired_rejected_sink() {
    let mut alignments = Vec::new();
    let mut rejected = CollectRejected {
        paired: true,
        ids: vec![],
    };
    let result = run_with(&["ACGT"], &PipelineConfig::new(1), &mut alignments, Some(&mut rejected));
    assert!(matches!(result, Err(Error::Configuration { .. })));
    assert!(alignments.is_empty());
}

#[test]
fn invalid_pipeline_config() {
    let mut alignments = Vec::new();
    let mut config = PipelineConfig::new(2);
    config.threading.batch_size = 0;
    assert!(matches!(
        run_with(&["ACGT"], &config, &mut alignments, None),
        Err(Error::Configuration { .. })
    ));
}

#[test]
fn dry_run_counts_as_alignment_output() {
    let report = run(
        VecReadSource::new(reads(&["ACGT", "GGGG"])),
        AlignmentParameters::default(),
        CalibratedRepertoire::new(),
        FirstBaseEngine,
        Sinks::default(),
        &PipelineConfig::new(1),
    )
    .unwrap();
    assert_eq!(report.routing.alignment_sink, 1);
    assert_eq!(report.routing.discarded, 1);
}

#[test]
fn trimmed_reads_are_counted_and_emptied_reads_rejected() {
    // '#' is phred 2, 'I' is phred 40
    let reads = [
        ("GGACGT", "##IIII"),
        ("ACGTCC", "IIII##"),
        ("AAAA", "####"),
        ("ACGT", "IIII"),
    ]
    .iter()
    .map(|(seq, qual)| {
        Read::single(
            0,
            SingleRead::new(None, seq.as_bytes().to_vec(), qual.as_bytes().to_vec()),
        )
    })
    .collect();

    let mut config = PipelineConfig::new(2);
    config.runtime.trimmer = QualityTrimmerParameters::new(20, 1);
    let mut alignments: Vec<AlignmentRecord> = Vec::new();
    let mut rejected = CollectRejected::default();
    let report = run(
        VecReadSource::new(reads),
        AlignmentParameters::default(),
        CalibratedRepertoire::new(),
        FirstBaseEngine,
        Sinks::new(Some(&mut alignments), Some(&mut rejected)),
        &config,
    )
    .unwrap();

    assert_eq!(report.total_reads, 4);
    assert_eq!(report.trimming.reads_trimmed, 3);
    assert_eq!(report.trimming.bases_removed_r1, 8);
    assert_eq!(report.trimming.bases_removed_r2, 0);
    assert_eq!(report.trimming.trimmed_to_empty, 1);

    // the emptied read is aligned, rejected and routed once
    assert_eq!(report.aligned, 3);
    assert_eq!(report.not_aligned(NotAlignedReason::EmptyRead), 1);
    assert_eq!(report.total_not_aligned(), 1);
    assert_eq!(alignments.iter().map(|r| r.read_id).collect::<Vec<_>>(), vec![0, 1, 3]);
    assert_eq!(rejected.ids, vec![2]);
    assert_eq!(report.routing.alignment_sink, 3);
    assert_eq!(report.routing.rejected_sink, 1);
    assert_eq!(report.routing.discarded, 0);
}
