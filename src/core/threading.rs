use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam::channel::{Receiver, Sender};
use log::{debug, info, warn};

use super::constants::PROGRESS_INTERVAL;
use super::report::RunReport;
use super::trim::{trim_read, QualityTrimmerParameters};
use crate::aligner::{
    AlignError, AlignmentEngine, AlignmentOutcome, AlignmentParameters, AlignmentResult,
    NotAlignedReason,
};
use crate::common::Read;
use crate::fileformat::ReadSource;
use crate::repertoire::CalibratedRepertoire;
use crate::runtime::Error;

/// A contiguous range of reads, tagged with its dense batch index
pub type ReadBatch = (u64, Vec<Read>);
pub type ResultBatch = (u64, Vec<AlignmentResult>);

/// Shared between all threads of a run. The first fatal error wins and stops
/// the producer and the workers.
#[derive(Default)]
pub struct RunState {
    abort: AtomicBool,
    error: Mutex<Option<Error>>,
}

impl RunState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, error: Error) {
        if let Ok(mut slot) = self.error.lock() {
            if slot.is_none() {
                *slot = Some(error);
            }
        }
        self.abort();
    }

    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    pub fn take_error(&self) -> Option<Error> {
        self.error.lock().ok().and_then(|mut slot| slot.take())
    }
}

fn log_progress(source: &dyn ReadSource) {
    info!("Alignment: {:.1}%", source.progress().clamp(0.0, 1.0) * 100.0);
}

/// Read, trim and batch the whole input. Runs on its own thread.
pub fn produce_batches<S: ReadSource>(
    mut source: S,
    trimmer: QualityTrimmerParameters,
    batch_size: usize,
    report: &RunReport,
    state: &RunState,
    tx: &Sender<ReadBatch>,
) {
    let mut batch_index = 0u64;
    let mut num_read = 0u64;
    loop {
        if state.is_aborted() {
            debug!("Producer stopping: run aborted");
            return;
        }

        let mut batch: Vec<Read> = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            let mut read = match source.next() {
                Ok(Some(read)) => read,
                Ok(None) => break,
                Err(e) => {
                    state.fail(e);
                    return;
                }
            };
            report.on_input();
            if trimmer.is_enabled() {
                report.on_trimmed(&trim_read(&mut read, &trimmer));
            }
            batch.push(read);

            num_read += 1;
            if num_read % PROGRESS_INTERVAL == 0 {
                log_progress(&source);
            }
        }

        if batch.is_empty() {
            break;
        }
        let full = batch.len() == batch_size;
        if tx.send((batch_index, batch)).is_err() {
            debug!("Producer stopping: workers are gone");
            return;
        }
        batch_index += 1;
        if !full {
            break;
        }
    }
    log_progress(&source);
    debug!("Read {} reads in {} batches", num_read, batch_index);
}

/// Run the engine on one read. Per-read failures become a not aligned
/// outcome; only a fatal engine error stops the run.
pub fn align_read<E: AlignmentEngine + ?Sized>(
    engine: &E,
    read: Read,
    params: &AlignmentParameters,
    repertoire: &CalibratedRepertoire,
) -> Result<AlignmentResult, Error> {
    let aligned = catch_unwind(AssertUnwindSafe(|| engine.align(&read, params, repertoire)));
    let outcome = match aligned {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(AlignError::Recoverable(msg))) => {
            debug!("Read {} failed to align: {}", read.id, msg);
            AlignmentOutcome::NotAligned(NotAlignedReason::AlignmentFailed)
        }
        Ok(Err(AlignError::Fatal(msg))) => return Err(Error::alignment(read.id, msg)),
        Err(_) => {
            warn!("Aligner panicked on read {}", read.id);
            AlignmentOutcome::NotAligned(NotAlignedReason::AlignmentFailed)
        }
    };
    Ok(AlignmentResult { read, outcome }.shift_indels_at_homopolymers(repertoire))
}

/// Worker loop: align batches until the input channel closes
pub fn align_batches<E: AlignmentEngine + ?Sized>(
    engine: &E,
    params: &AlignmentParameters,
    repertoire: &CalibratedRepertoire,
    state: &RunState,
    rx: &Receiver<ReadBatch>,
    tx: &Sender<ResultBatch>,
) {
    while let Ok((batch_index, reads)) = rx.recv() {
        if state.is_aborted() {
            return;
        }
        let mut results = Vec::with_capacity(reads.len());
        for read in reads {
            match align_read(engine, read, params, repertoire) {
                Ok(result) => results.push(result),
                Err(e) => {
                    state.fail(e);
                    return;
                }
            }
        }
        if tx.send((batch_index, results)).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SingleRead;
    use crate::fileformat::VecReadSource;

    struct Failing;

    impl AlignmentEngine for Failing {
        fn align(
            &self,
            read: &Read,
            _params: &AlignmentParameters,
            _repertoire: &CalibratedRepertoire,
        ) -> Result<AlignmentOutcome, AlignError> {
            match read.id {
                0 => Err(AlignError::Recoverable("odd read".to_string())),
                1 => panic!("engine bug"),
                _ => Err(AlignError::Fatal("out of memory".to_string())),
            }
        }
    }

    fn read(id: u64) -> Read {
        Read::single(id, SingleRead::new(None, b"ACGT".to_vec(), b"IIII".to_vec()))
    }

    #[test]
    fn test_engine_failures() {
        let params = AlignmentParameters::default();
        let repertoire = CalibratedRepertoire::new();
        let result = align_read(&Failing, read(0), &params, &repertoire).unwrap();
        assert_eq!(
            result.outcome,
            AlignmentOutcome::NotAligned(NotAlignedReason::AlignmentFailed)
        );
        let result = align_read(&Failing, read(1), &params, &repertoire).unwrap();
        assert_eq!(
            result.outcome,
            AlignmentOutcome::NotAligned(NotAlignedReason::AlignmentFailed)
        );
        let err = align_read(&Failing, read(2), &params, &repertoire).unwrap_err();
        assert!(matches!(err, Error::Alignment { read_id: 2, .. }));
    }

    #[test]
    fn test_batches() {
        let reads = (0..7).map(read).collect();
        let (tx, rx) = crossbeam::channel::unbounded();
        let report = RunReport::new(String::new(), vec![], vec![]);
        let state = RunState::new();
        produce_batches(
            VecReadSource::new(reads),
            QualityTrimmerParameters::default(),
            3,
            &report,
            &state,
            &tx,
        );
        drop(tx);
        let batches: Vec<ReadBatch> = rx.iter().collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].0, 2);
        assert_eq!(batches[2].1[0].id, 6);
        assert_eq!(report.total_reads(), 7);
        assert!(state.take_error().is_none());
    }
}
