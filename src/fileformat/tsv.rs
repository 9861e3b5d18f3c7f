use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use itertools::Itertools;
use serde::Serialize;

use super::AlignmentSink;
use crate::aligner::{AlignmentRecord, Hit};
use crate::repertoire::GeneType;
use crate::runtime::Error;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TsvRow {
    read_id: u64,
    descr_r1: String,
    descr_r2: String,
    target_sequences: String,
    target_qualities: String,
    best_v_hit: String,
    best_d_hit: String,
    best_j_hit: String,
    best_c_hit: String,
    all_v_hits_with_score: String,
    all_d_hits_with_score: String,
    all_j_hits_with_score: String,
    all_c_hits_with_score: String,
    best_v_alignments: String,
    best_j_alignments: String,
    chimera: bool,
}

fn hits<'a>(record: &'a AlignmentRecord, gene_type: GeneType) -> &'a [Hit] {
    record
        .hits
        .get(&gene_type)
        .map(|h| h.as_slice())
        .unwrap_or(&[])
}

fn best_hit(record: &AlignmentRecord, gene_type: GeneType) -> String {
    record
        .best_hit(gene_type)
        .map(|h| h.gene_name.clone())
        .unwrap_or_default()
}

fn all_hits_with_score(record: &AlignmentRecord, gene_type: GeneType) -> String {
    hits(record, gene_type)
        .iter()
        .map(|h| format!("{}({:.0})", h.gene_name, h.score))
        .join(",")
}

/// `geneFrom|geneTo|targetFrom|targetTo|mutations|score` per target, `;` separated
fn best_alignments(record: &AlignmentRecord, gene_type: GeneType) -> String {
    let Some(hit) = record.best_hit(gene_type) else {
        return String::new();
    };
    hit.alignments
        .iter()
        .map(|a| {
            format!(
                "{}|{}|{}|{}|{}|{:.0}",
                a.gene_range.0,
                a.gene_range.1,
                a.target_range.0,
                a.target_range.1,
                a.mutations.iter().map(|m| m.encode()).join(""),
                a.score
            )
        })
        .join(";")
}

fn original_description(record: &AlignmentRecord, mate: usize) -> String {
    record
        .original_reads
        .as_ref()
        .and_then(|reads| reads.first())
        .and_then(|read| read.mates.get(mate))
        .and_then(|m| m.description.clone())
        .unwrap_or_default()
}

/// Tab separated export, one line per alignment record
pub struct TsvAlignmentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl TsvAlignmentWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::create(path.as_ref()).map_err(|e| Error::sink_write("alignment", e))?;
        Ok(Self::new(file))
    }
}

impl<W: Write> TsvAlignmentWriter<W> {
    pub fn new(writer: W) -> Self {
        TsvAlignmentWriter {
            writer: csv::WriterBuilder::new()
                .delimiter(b'\t')
                .has_headers(true)
                .from_writer(writer),
        }
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

fn to_io_error(e: csv::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

impl<W: Write> AlignmentSink for TsvAlignmentWriter<W> {
    fn write(&mut self, record: &AlignmentRecord) -> io::Result<()> {
        let row = TsvRow {
            read_id: record.read_id,
            descr_r1: original_description(record, 0),
            descr_r2: original_description(record, 1),
            target_sequences: record
                .targets
                .iter()
                .map(|t| String::from_utf8_lossy(&t.seq))
                .join(","),
            target_qualities: record
                .targets
                .iter()
                .map(|t| String::from_utf8_lossy(&t.qual))
                .join(","),
            best_v_hit: best_hit(record, GeneType::Variable),
            best_d_hit: best_hit(record, GeneType::Diversity),
            best_j_hit: best_hit(record, GeneType::Joining),
            best_c_hit: best_hit(record, GeneType::Constant),
            all_v_hits_with_score: all_hits_with_score(record, GeneType::Variable),
            all_d_hits_with_score: all_hits_with_score(record, GeneType::Diversity),
            all_j_hits_with_score: all_hits_with_score(record, GeneType::Joining),
            all_c_hits_with_score: all_hits_with_score(record, GeneType::Constant),
            best_v_alignments: best_alignments(record, GeneType::Variable),
            best_j_alignments: best_alignments(record, GeneType::Joining),
            chimera: record.chimera,
        };
        self.writer.serialize(row).map_err(to_io_error)
    }

    fn finish(&mut self, _processed_reads: u64) -> io::Result<()> {
        self.writer.flush()
    }
}
