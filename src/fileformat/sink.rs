use std::io;

use crate::aligner::AlignmentRecord;
use crate::common::Read;

/// Receives alignment records, strictly in read ID order
pub trait AlignmentSink {
    fn write(&mut self, record: &AlignmentRecord) -> io::Result<()>;

    /// Called once after the last record
    fn finish(&mut self, _processed_reads: u64) -> io::Result<()> {
        Ok(())
    }
}

/// Receives reads that did not align
pub trait RejectedSink {
    fn write(&mut self, read: &Read) -> io::Result<()>;

    fn is_paired(&self) -> bool;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AlignmentSink for Vec<AlignmentRecord> {
    fn write(&mut self, record: &AlignmentRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}
