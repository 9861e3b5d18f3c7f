use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use log::{info, warn};

use super::determine_thread_counts_1;
use crate::aligner::{AlignmentParameters, KmerAligner};
use crate::core::params::{PipelineConfig, Threading};
use crate::core::{calibrate, AlignConfiguration, QualityTrimmerParameters, ReportSnapshot, Sinks};
use crate::fileformat::report::{append_text_report, write_json_report, TextReport};
use crate::fileformat::{
    detect_fileformat, open_read_source, verify_input_read_file, AlignmentSink,
    DetectedFileformat, FastqRejectedWriter, RejectedSink, TsvAlignmentWriter, VdjcaHeader,
    VdjcaWriter,
};
use crate::repertoire::{Chains, GeneLibrary};
use crate::runtime::{self, Config, LogLevel};

pub const DEFAULT_PRESET: &str = "default";
pub const DEFAULT_CHAINS: &str = "ALL";
pub const DRY_RUN_OUTPUT: &str = ".";

fn parse_override(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[derive(Args)]
pub struct AlignCMD {
    #[arg(num_args = 2..=3, required = true, value_parser)]
    /// R1 [R2] OUTPUT. OUTPUT is .vdjca, .tsv, or "." to only produce a report
    pub paths: Vec<PathBuf>,

    #[arg(short = 'b', long = "library", value_parser)]
    /// V/D/J/C gene library (JSON, optionally gzipped)
    pub path_library: PathBuf,

    #[arg(short = 't', long = "threads", value_parser = clap::value_parser!(usize))]
    num_threads_total: Option<usize>,

    #[arg(short = 'n', long = "limit", value_parser)]
    /// Only process the first N reads
    pub limit: Option<u64>,

    #[arg(long = "trimming-quality-threshold", value_parser, default_value = "0")]
    /// Mean window quality below which read ends are trimmed. 0 disables trimming
    pub trimming_quality_threshold: u8,

    #[arg(long = "trimming-window-size", value_parser, default_value = "6")]
    pub trimming_window_size: usize,

    #[arg(short = 'p', long = "parameters", value_parser, default_value = DEFAULT_PRESET)]
    /// Aligner parameters preset: default, rna-seq or amplicon
    pub preset: String,

    #[arg(short = 'O', value_parser = parse_override)]
    /// Override an aligner parameter, e.g. -OvParameters.minScore=120
    pub overrides: Vec<(String, String)>,

    #[arg(short = 'c', long = "chains", value_parser, default_value = DEFAULT_CHAINS)]
    /// Only align against genes of these chains (ALL, TCR, IG or e.g. TRA,TRB)
    pub chains: String,

    #[arg(short = 'd', long = "no-merge")]
    /// Do not merge overlapping paired-end reads
    pub no_merge: bool,

    #[arg(long = "write-all")]
    /// Also write not aligned reads to the alignment output
    pub write_all: bool,

    #[arg(long = "not-aligned-R1", value_parser)]
    pub path_not_aligned_r1: Option<PathBuf>,

    #[arg(long = "not-aligned-R2", value_parser)]
    pub path_not_aligned_r2: Option<PathBuf>,

    #[arg(short = 'r', long = "report", value_parser)]
    /// Text report, appended to if it exists
    pub path_report: Option<PathBuf>,

    #[arg(short = 'j', long = "json-report", value_parser)]
    pub path_json_report: Option<PathBuf>,

    #[arg(long = "batch-size", value_parser)]
    pub batch_size: Option<usize>,

    #[arg(long = "buffer-depth", value_parser)]
    /// Number of batches allowed in flight per channel
    pub buffer_depth: Option<usize>,

    #[arg(long = "buffers")]
    /// Log buffer usage at the end of the run
    pub buffers: bool,

    #[arg(long = "verbose")]
    pub verbose: bool,

    #[arg(long = "log-level", value_parser, default_value = "info")]
    pub log_level: LogLevel,
}

impl AlignCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        runtime::setup_logger(self.log_level);
        Config::init(Config {
            log_level: self.log_level,
            verbose: self.verbose,
        });

        let (path_r1, path_r2, path_out) = self.split_paths()?;
        self.check_not_aligned_outputs(path_r2.is_some())?;
        verify_input_read_file(path_r1)?;
        if let Some(path_r2) = path_r2 {
            verify_input_read_file(path_r2)?;
        }

        let num_threads_total = determine_thread_counts_1(self.num_threads_total)?;
        info!("Using threads {}", num_threads_total);

        let mut config = PipelineConfig::new(num_threads_total);
        config.threading = self.threading(num_threads_total);
        config.runtime.write_all = self.write_all;
        config.runtime.verbose = self.verbose;
        config.runtime.limit = self.limit;
        config.runtime.trimmer =
            QualityTrimmerParameters::new(self.trimming_quality_threshold, self.trimming_window_size);
        config.io.command_line = std::env::args().collect::<Vec<_>>().join(" ");
        config.io.input_files = [Some(path_r1), path_r2]
            .into_iter()
            .flatten()
            .map(|p| p.display().to_string())
            .collect();
        config.io.output_files = [Some(path_out), self.path_not_aligned_r1.as_deref(), self.path_not_aligned_r2.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !is_dry_run(p))
            .map(|p| p.display().to_string())
            .collect();
        // Nothing is created on disk before this point
        config.validate()?;

        let library = GeneLibrary::from_path(&self.path_library)
            .with_context(|| format!("Failed to load library {}", self.path_library.display()))?;
        for w in &library.warnings {
            warn!("{}", w);
        }
        for c in &library.citations {
            warn!("Please cite: {}", c);
        }

        if self.chains != DEFAULT_CHAINS {
            warn!("Chain filtering with -c is not recommended; filter on the assembled clones instead");
        }
        let chains = Chains::parse(&self.chains)?;

        let mut params = AlignmentParameters::preset(&self.preset)?;
        for (key, value) in &self.overrides {
            params.apply_override(key, value)?;
        }
        if self.no_merge {
            params.merge_reads = false;
        }

        let repertoire = calibrate(&library, &chains, &mut params, self.verbose)?;

        let align_configuration =
            AlignConfiguration::new(params.clone(), library.name.clone(), &config.runtime);

        let source = open_read_source(path_r1, path_r2)?;

        let mut alignment_sink: Option<Box<dyn AlignmentSink>> = if is_dry_run(path_out) {
            info!("Dry run, no alignments will be written");
            None
        } else if detect_fileformat(path_out) == DetectedFileformat::TSV {
            Some(Box::new(TsvAlignmentWriter::create(path_out)?))
        } else {
            let header = VdjcaHeader::new(align_configuration, &repertoire);
            Some(Box::new(VdjcaWriter::create(path_out, &header)?))
        };
        let mut rejected_sink: Option<FastqRejectedWriter> = match &self.path_not_aligned_r1 {
            Some(r1) => Some(FastqRejectedWriter::create(
                r1.as_path(),
                self.path_not_aligned_r2.as_deref(),
            )?),
            None => None,
        };
        let sinks = Sinks::new(
            alignment_sink
                .as_mut()
                .map(|s| &mut **s as &mut dyn AlignmentSink),
            rejected_sink.as_mut().map(|s| s as &mut dyn RejectedSink),
        );

        let report = crate::core::run(
            source,
            params,
            repertoire,
            KmerAligner::new(),
            sinks,
            &config,
        )?;

        self.write_reports(&report)?;
        if self.buffers {
            info!(
                "Buffers: {} batches of {} reads per channel, reorder buffer peak {} batches",
                config.threading.buffer_depth, config.threading.batch_size, report.reorder_buffer_peak
            );
        }

        log::info!("Align has finished succesfully");
        Ok(())
    }

    fn split_paths(&self) -> Result<(&Path, Option<&Path>, &Path)> {
        match self.paths.as_slice() {
            [r1, out] => Ok((r1.as_path(), None, out.as_path())),
            [r1, r2, out] => Ok((r1.as_path(), Some(r2.as_path()), out.as_path())),
            _ => bail!("Expected R1 [R2] OUTPUT"),
        }
    }

    fn check_not_aligned_outputs(&self, paired: bool) -> Result<()> {
        match (&self.path_not_aligned_r1, &self.path_not_aligned_r2) {
            (None, Some(_)) => bail!("--not-aligned-R2 requires --not-aligned-R1"),
            (Some(_), None) if paired => {
                bail!("Paired-end input requires both --not-aligned-R1 and --not-aligned-R2")
            }
            (Some(_), Some(_)) if !paired => {
                bail!("--not-aligned-R2 given, but input is single-end")
            }
            _ => Ok(()),
        }
    }

    fn threading(&self, num_threads_total: usize) -> Threading {
        let mut threading = Threading::new(num_threads_total);
        if let Some(batch_size) = self.batch_size {
            threading.batch_size = batch_size;
        }
        if let Some(buffer_depth) = self.buffer_depth {
            threading.buffer_depth = buffer_depth;
        }
        threading
    }

    fn write_reports(&self, report: &ReportSnapshot) -> Result<()> {
        print!("{}", TextReport(report));
        if let Some(path) = &self.path_report {
            append_text_report(path, report)?;
        }
        if let Some(path) = &self.path_json_report {
            write_json_report(path, report)?;
        }
        Ok(())
    }
}

fn is_dry_run(path: &Path) -> bool {
    path.as_os_str() == DRY_RUN_OUTPUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        align: AlignCMD,
    }

    fn parse(args: &[&str]) -> AlignCMD {
        TestCli::try_parse_from(std::iter::once("align").chain(args.iter().copied()))
            .unwrap()
            .align
    }

    #[test]
    fn test_parse_arguments() {
        let cmd = parse(&[
            "-b", "lib.json", "-t", "4", "-OvParameters.minScore=120", "--not-aligned-R1", "na.fq",
            "r1.fq", "out.vdjca",
        ]);
        let (r1, r2, out) = cmd.split_paths().unwrap();
        assert_eq!(r1, Path::new("r1.fq"));
        assert!(r2.is_none());
        assert_eq!(out, Path::new("out.vdjca"));
        assert_eq!(cmd.overrides, vec![("vParameters.minScore".to_string(), "120".to_string())]);
        assert_eq!(cmd.chains, "ALL");
        assert_eq!(cmd.trimming_window_size, 6);
        assert!(cmd.check_not_aligned_outputs(false).is_ok());
        assert!(cmd.check_not_aligned_outputs(true).is_err());
    }

    #[test]
    fn test_not_aligned_r2_requires_r1() {
        let cmd = parse(&["-b", "lib.json", "--not-aligned-R2", "na2.fq", "r1.fq", "r2.fq", "."]);
        assert!(cmd.check_not_aligned_outputs(true).is_err());
        assert!(is_dry_run(cmd.split_paths().unwrap().2));
    }

    const V: &str = "GATACAGCGTTCTCTTGCAGCTGAAGACCATGCCATGGGCCTCCAGAACAGTGTGGTTGGTATCGACAGAA";
    const J: &str = "TTCTGGAAACACCATATATTTTGGAGAGGGAAGTTGGCTCACTGTTGTAG";

    /// Library and a one-read FASTQ in `dir`
    fn write_inputs(dir: &Path) -> (String, String) {
        let library = dir.join("library.json");
        std::fs::write(
            &library,
            format!(
                r#"{{"name": "mini-trb", "genes": [
                    {{"name": "TRBV2*01", "type": "Variable", "sequence": "{}",
                      "features": {{"VRegionWithP": [0, {}]}}}},
                    {{"name": "TRBJ1-1*01", "type": "Joining", "sequence": "{}",
                      "features": {{"JRegion": [0, {}]}}}}
                ]}}"#,
                V,
                V.len(),
                J,
                J.len()
            ),
        )
        .unwrap();
        let seq = format!("{}GGGACAGG{}", &V[20..], &J[..40]);
        let reads = dir.join("r.fastq");
        std::fs::write(&reads, format!("@r0\n{}\n+\n{}\n", seq, "I".repeat(seq.len()))).unwrap();
        (
            library.display().to_string(),
            reads.display().to_string(),
        )
    }

    fn execute(extra: &[&str], library: &str, reads: &str, out: &Path) -> Result<()> {
        let out = out.display().to_string();
        let mut args = vec!["-t", "1", "-b", library, "-OdParameters=null", "-OcParameters=null"];
        args.extend_from_slice(extra);
        args.push(reads);
        args.push(out.as_str());
        parse(&args).try_execute()
    }

    #[test]
    fn test_invalid_batch_size_creates_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let (library, reads) = write_inputs(dir.path());
        let out = dir.path().join("out.vdjca");
        let not_aligned = dir.path().join("na.fastq");
        let not_aligned_arg = not_aligned.display().to_string();

        let err = execute(
            &["--batch-size", "0", "--not-aligned-R1", not_aligned_arg.as_str()],
            &library,
            &reads,
            &out,
        )
        .unwrap_err();
        assert!(err.to_string().contains("batch size"));
        assert!(!out.exists());
        assert!(!not_aligned.exists());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (library, reads) = write_inputs(dir.path());
        let out = dir.path().join("out.tsv");

        let err = execute(&["-n", "0"], &library, &reads, &out).unwrap_err();
        assert!(err.to_string().contains("--limit must be positive"));
        assert!(!out.exists());
    }

    #[test]
    fn test_execute_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let (library, reads) = write_inputs(dir.path());
        let out = dir.path().join("out.tsv");

        execute(&["-n", "1"], &library, &reads, &out).unwrap();
        let tsv = std::fs::read_to_string(&out).unwrap();
        assert_eq!(tsv.lines().count(), 2);
    }

    #[test]
    fn test_too_few_paths() {
        assert!(TestCli::try_parse_from(["align", "-b", "lib.json", "r1.fq"]).is_err());
    }
}
