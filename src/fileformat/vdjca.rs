use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read as IoRead, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use super::AlignmentSink;
use crate::aligner::AlignmentRecord;
use crate::core::AlignConfiguration;
use crate::repertoire::{CalibratedRepertoire, GeneType};
use crate::runtime::Error;

pub const VDJCA_MAGIC: &[u8; 8] = b"VDJCA\x00\x00\x01";

/// Everything stored in front of the records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VdjcaHeader {
    pub version: String,
    pub configuration: AlignConfiguration,
    /// Names of the genes used for alignment, per gene type
    pub genes: BTreeMap<GeneType, Vec<String>>,
}

impl VdjcaHeader {
    pub fn new(configuration: AlignConfiguration, repertoire: &CalibratedRepertoire) -> Self {
        let genes = GeneType::ALL
            .iter()
            .map(|gt| {
                (
                    *gt,
                    repertoire
                        .genes(*gt)
                        .iter()
                        .map(|g| g.name.clone())
                        .collect::<Vec<_>>(),
                )
            })
            .filter(|(_, names)| !names.is_empty())
            .collect();
        VdjcaHeader {
            version: env!("CARGO_PKG_VERSION").to_string(),
            configuration,
            genes,
        }
    }
}

/// Frames after the header. Both enums must keep the same variant order.
#[derive(Serialize)]
enum FrameRef<'a> {
    Record(&'a AlignmentRecord),
    Footer { processed_reads: u64 },
}

#[derive(Deserialize)]
enum Frame {
    Record(AlignmentRecord),
    Footer { processed_reads: u64 },
}

fn to_io_error(e: bincode::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// Binary alignment file writer
pub struct VdjcaWriter {
    writer: Option<BufWriter<File>>,
    num_written: u64,
}

impl VdjcaWriter {
    pub fn create<P: AsRef<Path>>(path: P, header: &VdjcaHeader) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::sink_write("alignment", e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(VDJCA_MAGIC)
            .map_err(|e| Error::sink_write("alignment", e))?;
        bincode::serialize_into(&mut writer, header)
            .map_err(|e| Error::sink_write("alignment", to_io_error(e)))?;
        debug!("Created alignment file {}", path.display());
        Ok(VdjcaWriter {
            writer: Some(writer),
            num_written: 0,
        })
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "alignment file already closed"))
    }
}

impl AlignmentSink for VdjcaWriter {
    fn write(&mut self, record: &AlignmentRecord) -> io::Result<()> {
        bincode::serialize_into(self.writer()?, &FrameRef::Record(record)).map_err(to_io_error)?;
        self.num_written += 1;
        Ok(())
    }

    fn finish(&mut self, processed_reads: u64) -> io::Result<()> {
        let mut writer = self.writer()?;
        bincode::serialize_into(&mut writer, &FrameRef::Footer { processed_reads })
            .map_err(to_io_error)?;
        writer.flush()?;
        self.writer = None;
        debug!("Wrote {} alignments", self.num_written);
        Ok(())
    }
}

/// Reads back a file written by `VdjcaWriter`
pub struct VdjcaReader {
    reader: BufReader<File>,
    path: PathBuf,
    header: VdjcaHeader,
    processed_reads: Option<u64>,
}

impl VdjcaReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|_| Error::file_not_found(path))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        reader
            .read_exact(&mut magic)
            .map_err(|_| Error::file_not_valid(path, Some("file is too short")))?;
        if &magic != VDJCA_MAGIC {
            return Err(Error::file_not_valid(path, Some("not an alignment file")));
        }
        let header: VdjcaHeader = bincode::deserialize_from(&mut reader)
            .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;

        Ok(VdjcaReader {
            reader,
            path: path.to_path_buf(),
            header,
            processed_reads: None,
        })
    }

    pub fn header(&self) -> &VdjcaHeader {
        &self.header
    }

    /// Known once all records have been read
    pub fn processed_reads(&self) -> Option<u64> {
        self.processed_reads
    }
}

impl Iterator for VdjcaReader {
    type Item = Result<AlignmentRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.processed_reads.is_some() {
            return None;
        }
        match bincode::deserialize_from(&mut self.reader) {
            Ok(Frame::Record(record)) => Some(Ok(record)),
            Ok(Frame::Footer { processed_reads }) => {
                self.processed_reads = Some(processed_reads);
                None
            }
            Err(e) => {
                // no footer: truncated file
                self.processed_reads = Some(0);
                Some(Err(Error::file_not_valid(&self.path, Some(e.to_string()))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::AlignmentParameters;
    use crate::common::{Read, SingleRead};
    use crate::core::params::Runtime;

    #[test]
    fn test_write_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.vdjca");
        let params = AlignmentParameters::default();
        let configuration = AlignConfiguration::new(params.clone(), "lib", &Runtime::default());
        let header = VdjcaHeader::new(configuration, &CalibratedRepertoire::new());

        let mut writer = VdjcaWriter::create(&path, &header).unwrap();
        for id in 0..3 {
            let read = Read::single(id, SingleRead::new(None, b"ACGT".to_vec(), b"IIII".to_vec()));
            writer.write(&AlignmentRecord::placeholder(&read, &params)).unwrap();
        }
        writer.finish(5).unwrap();

        let mut reader = VdjcaReader::open(&path).unwrap();
        assert_eq!(reader.header(), &header);
        assert_eq!(reader.header().configuration.library_name, "lib");
        let ids: Vec<u64> = reader.by_ref().map(|r| r.unwrap().read_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(reader.processed_reads(), Some(5));
    }

    #[test]
    fn test_not_an_alignment_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.vdjca");
        std::fs::write(&path, b"@r\nACGT\n+\nIIII\n").unwrap();
        assert!(matches!(
            VdjcaReader::open(&path),
            Err(Error::FileNotValid { .. })
        ));
    }
}
