use std::collections::VecDeque;

use crate::common::Read;
use crate::runtime::Error;

/// Finite stream of reads with dense IDs assigned in emission order
pub trait ReadSource: Send {
    fn next(&mut self) -> Result<Option<Read>, Error>;

    /// Fraction of the input consumed, in `[0, 1]`. Advisory.
    fn progress(&self) -> f64;

    fn is_paired(&self) -> bool;
}

impl<S: ReadSource + ?Sized> ReadSource for Box<S> {
    fn next(&mut self) -> Result<Option<Read>, Error> {
        (**self).next()
    }

    fn progress(&self) -> f64 {
        (**self).progress()
    }

    fn is_paired(&self) -> bool {
        (**self).is_paired()
    }
}

/// Stops after `limit` reads
pub struct LimitedSource<S> {
    inner: S,
    limit: u64,
    emitted: u64,
}

impl<S: ReadSource> LimitedSource<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        LimitedSource {
            inner,
            limit,
            emitted: 0,
        }
    }
}

impl<S: ReadSource> ReadSource for LimitedSource<S> {
    fn next(&mut self) -> Result<Option<Read>, Error> {
        if self.emitted >= self.limit {
            return Ok(None);
        }
        let read = self.inner.next()?;
        if read.is_some() {
            self.emitted += 1;
        }
        Ok(read)
    }

    fn progress(&self) -> f64 {
        if self.limit == 0 {
            return 1.0;
        }
        // the input may end before the limit
        (self.emitted as f64 / self.limit as f64).max(self.inner.progress())
    }

    fn is_paired(&self) -> bool {
        self.inner.is_paired()
    }
}

/// In-memory reads. IDs are reassigned in order starting from 0.
pub struct VecReadSource {
    reads: VecDeque<Read>,
    total: usize,
    next_id: u64,
    paired: bool,
}

impl VecReadSource {
    pub fn new(reads: Vec<Read>) -> Self {
        let paired = reads.first().map_or(false, |r| r.is_paired());
        VecReadSource {
            total: reads.len(),
            reads: reads.into(),
            next_id: 0,
            paired,
        }
    }
}

impl ReadSource for VecReadSource {
    fn next(&mut self) -> Result<Option<Read>, Error> {
        let Some(mut read) = self.reads.pop_front() else {
            return Ok(None);
        };
        if read.is_paired() != self.paired {
            return Err(Error::source_read(Some(format!(
                "read {} does not match the layout of the first read",
                self.next_id
            ))));
        }
        read.id = self.next_id;
        self.next_id += 1;
        Ok(Some(read))
    }

    fn progress(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.total - self.reads.len()) as f64 / self.total as f64
        }
    }

    fn is_paired(&self) -> bool {
        self.paired
    }
}
