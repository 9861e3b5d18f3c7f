use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::aligner::NotAlignedReason;
use crate::core::ReportSnapshot;
use crate::repertoire::GeneType;
use crate::runtime::Error;

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

/// Human readable rendering of a finished run
pub struct TextReport<'a>(pub &'a ReportSnapshot);

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        let total = r.total_reads;
        writeln!(f, "============== Align Report ==============")?;
        writeln!(f, "Command line arguments: {}", r.command_line)?;
        writeln!(f, "Input file(s): {}", r.input_files.join(","))?;
        writeln!(f, "Output file(s): {}", r.output_files.join(","))?;
        writeln!(f, "Analysis time: {:.2}s", r.elapsed_ms as f64 / 1000.0)?;
        writeln!(f, "Total sequencing reads: {}", total)?;
        writeln!(
            f,
            "Successfully aligned reads: {} ({:.2}%)",
            r.aligned,
            percent(r.aligned, total)
        )?;
        for reason in NotAlignedReason::ALL {
            let count = r.not_aligned(reason);
            if count > 0 {
                writeln!(
                    f,
                    "Alignment failed, {}: {} ({:.2}%)",
                    reason.description(),
                    count,
                    percent(count, total)
                )?;
            }
        }
        writeln!(
            f,
            "Chimeras: {} ({:.2}%)",
            r.chimeras,
            percent(r.chimeras, total)
        )?;
        for gene_type in GeneType::ALL {
            writeln!(
                f,
                "{} gene hits: {} ({:.2}%)",
                gene_type.letter(),
                r.hits(gene_type),
                percent(r.hits(gene_type), total)
            )?;
        }
        if r.excluded_functional_genes + r.excluded_non_functional_genes > 0 {
            writeln!(
                f,
                "Genes excluded from alignment: {} functional, {} non-functional",
                r.excluded_functional_genes, r.excluded_non_functional_genes
            )?;
        }
        if r.trimming.reads_trimmed > 0 {
            writeln!(
                f,
                "Reads trimmed: {} ({:.2}%), bases removed R1: {}, R2: {}, trimmed to empty: {}",
                r.trimming.reads_trimmed,
                percent(r.trimming.reads_trimmed, total),
                r.trimming.bases_removed_r1,
                r.trimming.bases_removed_r2,
                r.trimming.trimmed_to_empty
            )?;
        }
        writeln!(
            f,
            "Reads written: {} alignments, {} not aligned, {} discarded",
            r.routing.alignment_sink, r.routing.rejected_sink, r.routing.discarded
        )?;
        writeln!(f, "Reorder buffer peak: {} batches", r.reorder_buffer_peak)
    }
}

/// Append the text report, creating the file if needed
pub fn append_text_report<P: AsRef<Path>>(path: P, report: &ReportSnapshot) -> Result<(), Error> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::sink_write("report", e))?;
    let mut writer = BufWriter::new(file);
    write!(writer, "{}", TextReport(report)).map_err(|e| Error::sink_write("report", e))?;
    writer.flush().map_err(|e| Error::sink_write("report", e))
}

pub fn write_json_report<P: AsRef<Path>>(path: P, report: &ReportSnapshot) -> Result<(), Error> {
    let file = File::create(path.as_ref()).map_err(|e| Error::sink_write("report", e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .map_err(|e| Error::sink_write("report", e.into()))?;
    writer.flush().map_err(|e| Error::sink_write("report", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::AlignmentOutcome;
    use crate::core::{RouteOutcome, RunReport};

    fn snapshot() -> ReportSnapshot {
        let report = RunReport::new("align a.fq out.vdjca".to_string(), vec!["a.fq".to_string()], vec![]);
        for _ in 0..4 {
            report.on_input();
        }
        report.on_outcome(&AlignmentOutcome::NotAligned(NotAlignedReason::NoJHits));
        report.on_route(RouteOutcome::Discarded);
        report.finalize().unwrap()
    }

    #[test]
    fn test_text_report() {
        let text = TextReport(&snapshot()).to_string();
        assert!(text.contains("Total sequencing reads: 4"));
        assert!(text.contains("Alignment failed, no J hits: 1 (25.00%)"));
        assert!(!text.contains("no V hits"));
        assert!(text.contains("Command line arguments: align a.fq out.vdjca"));
    }

    #[test]
    fn test_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("report.txt");
        let json_path = dir.path().join("report.json");
        let report = snapshot();

        append_text_report(&text_path, &report).unwrap();
        append_text_report(&text_path, &report).unwrap();
        let text = std::fs::read_to_string(&text_path).unwrap();
        assert_eq!(text.matches("Align Report").count(), 2);

        write_json_report(&json_path, &report).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["totalReads"], 4);
        assert_eq!(value["routing"]["discarded"], 1);
    }
}
