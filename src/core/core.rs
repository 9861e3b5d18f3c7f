use std::sync::Arc;

use log::{debug, info, warn};

use super::params::PipelineConfig;
use super::report::{ReportSnapshot, RunReport};
use super::router::{ResultRouter, Sinks};
use super::threading::{align_batches, produce_batches, ReadBatch, ResultBatch, RunState};
use crate::aligner::{AlignmentEngine, AlignmentParameters};
use crate::fileformat::{LimitedSource, ReadSource};
use crate::repertoire::CalibratedRepertoire;
use crate::runtime::Error;
use crate::threading::OrderedReceiver;

/// Align every read of `source` and route the results, in input order, to
/// `sinks`. Blocks until all threads have finished.
pub fn run<S, E>(
    source: S,
    params: AlignmentParameters,
    repertoire: CalibratedRepertoire,
    engine: E,
    sinks: Sinks<'_>,
    config: &PipelineConfig,
) -> Result<ReportSnapshot, Error>
where
    S: ReadSource + 'static,
    E: AlignmentEngine + 'static,
{
    config.validate()?;
    if let Some(rejected) = sinks.rejected.as_ref() {
        if rejected.is_paired() != source.is_paired() {
            return Err(Error::configuration(format!(
                "not aligned reads output is {} but input is {}",
                if rejected.is_paired() { "paired" } else { "single-end" },
                if source.is_paired() { "paired" } else { "single-end" },
            )));
        }
        if config.runtime.write_all {
            warn!("All reads are written to the alignment output; the not aligned reads output will stay empty");
        }
    }

    let source: Box<dyn ReadSource> = match config.runtime.limit {
        Some(limit) => Box::new(LimitedSource::new(source, limit)),
        None => Box::new(source),
    };

    let report = Arc::new(RunReport::new(
        config.io.command_line.clone(),
        config.io.input_files.clone(),
        config.io.output_files.clone(),
    ));
    report.set_excluded_genes(repertoire.excluded_functional, repertoire.excluded_non_functional);

    let params = Arc::new(params);
    let repertoire = Arc::new(repertoire);
    let engine = Arc::new(engine);
    let state = RunState::new();
    let threading = &config.threading;

    info!(
        "Aligning with {} worker threads, batch size {}",
        threading.threads_work, threading.batch_size
    );

    // Limit how many batches can be in the air at the same time, in both directions
    let (tx_reads, rx_reads) = crossbeam::channel::bounded::<ReadBatch>(threading.buffer_depth);
    let (tx_results, rx_results) =
        crossbeam::channel::bounded::<ResultBatch>(threading.buffer_depth);

    let thread_pool = threadpool::ThreadPool::new(threading.threads_work + 1);
    {
        let report = Arc::clone(&report);
        let state = Arc::clone(&state);
        let trimmer = config.runtime.trimmer;
        let batch_size = threading.batch_size;
        thread_pool.execute(move || {
            produce_batches(source, trimmer, batch_size, &report, &state, &tx_reads);
        });
    }
    for tidx in 0..threading.threads_work {
        let rx_reads = rx_reads.clone();
        let tx_results = tx_results.clone();
        let params = Arc::clone(&params);
        let repertoire = Arc::clone(&repertoire);
        let engine = Arc::clone(&engine);
        let state = Arc::clone(&state);
        debug!("Starting worker thread {}", tidx);
        thread_pool.execute(move || {
            align_batches(&*engine, &params, &repertoire, &state, &rx_reads, &tx_results);
        });
    }
    // Only the threads hold channel ends from here on
    drop(rx_reads);
    drop(tx_results);

    let mut ordered =
        OrderedReceiver::new(rx_results, 0u64, |k| k + 1).with_warn_depth(config.runtime.reorder_warn_depth);
    let gauge = ordered.gauge();
    let mut router = ResultRouter::new(sinks, &params, &report, config.runtime.write_all);

    let mut routing_error = None;
    'route: while let Ok(batch) = ordered.recv_ordered() {
        for result in batch {
            if let Err(e) = router.route(result) {
                routing_error = Some(e);
                break 'route;
            }
        }
    }
    let pending = ordered.pending();
    if routing_error.is_some() {
        state.abort();
    }
    // Disconnect the workers before waiting for them
    drop(ordered);
    thread_pool.join();
    report.set_reorder_buffer_peak(gauge.peak());
    debug!("Reorder buffer peak: {} batches", gauge.peak());

    if let Some(e) = routing_error {
        return Err(e);
    }
    if let Some(e) = state.take_error() {
        return Err(e);
    }
    if thread_pool.panic_count() > 0 {
        return Err(Error::source_read(Some("a pipeline thread panicked")));
    }
    if pending > 0 {
        return Err(Error::source_read(Some(format!(
            "{} result batches could not be put back in order",
            pending
        ))));
    }

    router.finish(report.total_reads())?;
    report.finalize()
}
