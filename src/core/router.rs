use log::trace;

use super::report::RunReport;
use crate::aligner::{AlignmentOutcome, AlignmentParameters, AlignmentRecord, AlignmentResult};
use crate::fileformat::{AlignmentSink, RejectedSink};
use crate::runtime::Error;

/// Where a read ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    AlignmentSink,
    RejectedSink,
    Discarded,
}

/// Output destinations of a run. A missing alignment sink means a dry run.
#[derive(Default)]
pub struct Sinks<'a> {
    pub alignments: Option<&'a mut dyn AlignmentSink>,
    pub rejected: Option<&'a mut dyn RejectedSink>,
}

impl<'a> Sinks<'a> {
    pub fn new(
        alignments: Option<&'a mut dyn AlignmentSink>,
        rejected: Option<&'a mut dyn RejectedSink>,
    ) -> Self {
        Sinks {
            alignments,
            rejected,
        }
    }
}

/// Sends each result, in read ID order, to exactly one destination
pub struct ResultRouter<'a, 'r> {
    sinks: Sinks<'a>,
    params: &'r AlignmentParameters,
    report: &'r RunReport,
    write_all: bool,
    last_id: Option<u64>,
}

impl<'a, 'r> ResultRouter<'a, 'r> {
    pub fn new(
        sinks: Sinks<'a>,
        params: &'r AlignmentParameters,
        report: &'r RunReport,
        write_all: bool,
    ) -> Self {
        ResultRouter {
            sinks,
            params,
            report,
            write_all,
            last_id: None,
        }
    }

    fn write_alignment(&mut self, record: &AlignmentRecord) -> Result<(), Error> {
        if let Some(sink) = self.sinks.alignments.as_mut() {
            sink.write(record)
                .map_err(|e| Error::sink_write("alignment", e))?;
        }
        Ok(())
    }

    pub fn route(&mut self, result: AlignmentResult) -> Result<RouteOutcome, Error> {
        let id = result.read_id();
        debug_assert!(self.last_id.map_or(true, |last| id > last));
        self.last_id = Some(id);

        self.report.on_outcome(&result.outcome);
        let outcome = match result.outcome {
            AlignmentOutcome::Aligned(record) => {
                if record.chimera {
                    self.report.on_chimera();
                }
                self.write_alignment(&record)?;
                RouteOutcome::AlignmentSink
            }
            AlignmentOutcome::NotAligned(_) if self.write_all => {
                let record = AlignmentRecord::placeholder(&result.read, self.params);
                self.write_alignment(&record)?;
                RouteOutcome::AlignmentSink
            }
            AlignmentOutcome::NotAligned(reason) => match self.sinks.rejected.as_mut() {
                Some(sink) => {
                    sink.write(&result.read)
                        .map_err(|e| Error::sink_write("rejected", e))?;
                    RouteOutcome::RejectedSink
                }
                None => {
                    trace!("Read {} discarded: {}", id, reason.description());
                    RouteOutcome::Discarded
                }
            },
        };
        self.report.on_route(outcome);
        Ok(outcome)
    }

    /// Flush both sinks
    pub fn finish(mut self, processed_reads: u64) -> Result<(), Error> {
        if let Some(sink) = self.sinks.alignments.as_mut() {
            sink.finish(processed_reads)
                .map_err(|e| Error::sink_write("alignment", e))?;
        }
        if let Some(sink) = self.sinks.rejected.as_mut() {
            sink.finish().map_err(|e| Error::sink_write("rejected", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::NotAlignedReason;
    use crate::common::{Read, SingleRead};

    struct Rejected(Vec<u64>);

    impl RejectedSink for Rejected {
        fn write(&mut self, read: &Read) -> std::io::Result<()> {
            self.0.push(read.id);
            Ok(())
        }

        fn is_paired(&self) -> bool {
            false
        }
    }

    fn not_aligned(id: u64) -> AlignmentResult {
        AlignmentResult {
            read: Read::single(id, SingleRead::new(None, b"ACGT".to_vec(), b"IIII".to_vec())),
            outcome: AlignmentOutcome::NotAligned(NotAlignedReason::NoHits),
        }
    }

    #[test]
    fn test_route_not_aligned() {
        let params = AlignmentParameters::default();
        let report = RunReport::new(String::new(), vec![], vec![]);
        let mut alignments: Vec<AlignmentRecord> = Vec::new();
        let mut rejected = Rejected(Vec::new());

        let mut router = ResultRouter::new(
            Sinks::new(Some(&mut alignments), Some(&mut rejected)),
            &params,
            &report,
            false,
        );
        assert_eq!(router.route(not_aligned(0)).unwrap(), RouteOutcome::RejectedSink);
        router.finish(1).unwrap();
        assert!(alignments.is_empty());
        assert_eq!(rejected.0, vec![0]);

        let mut router = ResultRouter::new(Sinks::default(), &params, &report, false);
        assert_eq!(router.route(not_aligned(1)).unwrap(), RouteOutcome::Discarded);
    }

    #[test]
    fn test_route_write_all() {
        let params = AlignmentParameters::default();
        let report = RunReport::new(String::new(), vec![], vec![]);
        let mut alignments: Vec<AlignmentRecord> = Vec::new();
        let mut router = ResultRouter::new(
            Sinks::new(Some(&mut alignments), None),
            &params,
            &report,
            true,
        );
        assert_eq!(router.route(not_aligned(4)).unwrap(), RouteOutcome::AlignmentSink);
        drop(router);
        assert_eq!(alignments.len(), 1);
        assert_eq!(alignments[0].read_id, 4);
        assert!(!alignments[0].has_hits());

        let snapshot = report.finalize().unwrap();
        assert_eq!(snapshot.routing.alignment_sink, 1);
        assert_eq!(snapshot.not_aligned(NotAlignedReason::NoHits), 1);
    }
}
