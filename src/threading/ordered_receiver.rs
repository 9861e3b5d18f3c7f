use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use crossbeam::channel::{Receiver, RecvError};
use log::warn;

struct KVPair<K, V> {
    key: K,
    value: V,
}

impl<K: Ord, V> Ord for KVPair<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
impl<K: Ord, V> PartialOrd for KVPair<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, V> Eq for KVPair<K, V> {}
impl<K: Ord, V> PartialEq for KVPair<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

/// Number of items parked in a reorder buffer, current and peak
#[derive(Debug, Default)]
pub struct BufferGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl BufferGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[inline(always)]
    fn set(&self, depth: usize) {
        self.current.store(depth, AtomicOrdering::Relaxed);
        self.peak.fetch_max(depth, AtomicOrdering::Relaxed);
    }

    pub fn current(&self) -> usize {
        self.current.load(AtomicOrdering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(AtomicOrdering::Relaxed)
    }
}

/// Receives `(key, value)` pairs in any order and hands values out in key
/// order. Keys must be dense: `fn_key_next` applied to the last emitted key
/// gives the next one, and every key is eventually sent exactly once.
pub struct OrderedReceiver<K, V, KF>
where
    K: Ord,
    KF: Fn(&K) -> K,
{
    inner_receiver: Receiver<(K, V)>,
    inner_ordered: BinaryHeap<Reverse<KVPair<K, V>>>,
    key_next: K,
    fn_key_next: KF,
    gauge: Arc<BufferGauge>,
    warn_depth: usize,
    warned: bool,
}

impl<K, V, KF> OrderedReceiver<K, V, KF>
where
    K: Ord,
    KF: Fn(&K) -> K,
{
    pub fn new(rx: Receiver<(K, V)>, key_initial: K, fn_key_next: KF) -> Self {
        Self {
            inner_receiver: rx,
            inner_ordered: BinaryHeap::new(),
            key_next: key_initial,
            fn_key_next,
            gauge: BufferGauge::new(),
            warn_depth: usize::MAX,
            warned: false,
        }
    }

    /// Log a warning whenever the buffer grows beyond `depth`, once per excursion
    pub fn with_warn_depth(mut self, depth: usize) -> Self {
        self.warn_depth = depth;
        self
    }

    pub fn gauge(&self) -> Arc<BufferGauge> {
        Arc::clone(&self.gauge)
    }

    /// Items received but not yet emitted
    pub fn pending(&self) -> usize {
        self.inner_ordered.len()
    }

    #[inline]
    fn pop_next(&mut self) -> Option<V> {
        match self.inner_ordered.peek() {
            Some(Reverse(kv)) if kv.key == self.key_next => {}
            _ => return None,
        }
        let Reverse(kv) = self.inner_ordered.pop()?;
        self.key_next = (self.fn_key_next)(&self.key_next);
        self.update_gauge();
        Some(kv.value)
    }

    fn update_gauge(&mut self) {
        let depth = self.inner_ordered.len();
        self.gauge.set(depth);
        if depth > self.warn_depth {
            if !self.warned {
                warn!(
                    "Reorder buffer holds {} batches waiting for an earlier one",
                    depth
                );
                self.warned = true;
            }
        } else {
            self.warned = false;
        }
    }

    /// Next value in key order. Fails once the channel is disconnected and
    /// the next key is not buffered; anything still pending then has a gap
    /// in front of it.
    #[inline]
    pub fn recv_ordered(&mut self) -> Result<V, RecvError> {
        loop {
            if let Some(value) = self.pop_next() {
                return Ok(value);
            }

            // Next item not ready, try to receive more
            let (key, value) = self.inner_receiver.recv()?;
            self.inner_ordered.push(Reverse(KVPair { key, value }));
            self.update_gauge();
        }
    }
}
