use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use seq_io::fasta::Reader as FastaReader;
use seq_io::fasta::Record as FastaRecord;
use seq_io::fastq::Reader as FastqReader;
use seq_io::fastq::Record as FastqRecord;

use super::detect_fileformat::{detect_fileformat, is_gzip_path, DetectedFileformat};
use super::{ReadSource, RejectedSink};
use crate::common::{Read, SingleRead};
use crate::runtime::Error;

type BoxedReader = Box<dyn io::Read + Send>;

/// Counts the bytes pulled from the underlying (possibly compressed) file
struct CountingReader<R> {
    inner: R,
    consumed: Arc<AtomicU64>,
}

impl<R: io::Read> io::Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Input file progress by compressed bytes consumed over file size
#[derive(Clone)]
struct FileProgress {
    consumed: Arc<AtomicU64>,
    size: u64,
}

impl FileProgress {
    fn fraction(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        (self.consumed.load(Ordering::Relaxed) as f64 / self.size as f64).min(1.0)
    }
}

/// Open a file with transparent decompression
fn open_counted(path: &Path) -> Result<(BoxedReader, FileProgress), Error> {
    let file = File::open(path).map_err(|_| Error::file_not_found(path))?;
    let size = file.metadata()?.len();
    let consumed = Arc::new(AtomicU64::new(0));
    let counting = CountingReader {
        inner: file,
        consumed: Arc::clone(&consumed),
    };
    let (reader, compression) = niffler::send::get_reader(Box::new(counting))
        .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;
    debug!(
        "Opened file {} with compression {:?}",
        path.display(),
        compression
    );
    Ok((reader, FileProgress { consumed, size }))
}

fn description(head: &[u8]) -> Option<String> {
    (!head.is_empty()).then(|| String::from_utf8_lossy(head).into_owned())
}

/// Single or paired FASTQ input
pub struct FastqReadSource {
    r1: FastqReader<BoxedReader>,
    r2: Option<(FastqReader<BoxedReader>, PathBuf)>,
    progress: Vec<FileProgress>,
    path: PathBuf,
    next_id: u64,
}

impl FastqReadSource {
    pub fn open<P: AsRef<Path>>(r1: P, r2: Option<P>) -> Result<Self, Error> {
        let (reader1, progress1) = open_counted(r1.as_ref())?;
        let mut progress = vec![progress1];
        let r2 = match r2 {
            Some(p) => {
                let (reader2, progress2) = open_counted(p.as_ref())?;
                progress.push(progress2);
                Some((FastqReader::new(reader2), p.as_ref().to_path_buf()))
            }
            None => None,
        };
        Ok(FastqReadSource {
            r1: FastqReader::new(reader1),
            r2,
            progress,
            path: r1.as_ref().to_path_buf(),
            next_id: 0,
        })
    }

    fn next_mate(
        reader: &mut FastqReader<BoxedReader>,
        path: &Path,
    ) -> Result<Option<SingleRead>, Error> {
        match reader.next() {
            None => Ok(None),
            Some(Err(e)) => Err(Error::file_not_valid(path, Some(e.to_string()))),
            Some(Ok(record)) => Ok(Some(SingleRead::new(
                description(record.head()),
                record.seq().to_vec(),
                record.qual().to_vec(),
            ))),
        }
    }
}

impl ReadSource for FastqReadSource {
    fn next(&mut self) -> Result<Option<Read>, Error> {
        let mate1 = Self::next_mate(&mut self.r1, &self.path)?;
        let mate2 = match self.r2.as_mut() {
            Some((r2, path_r2)) => Some(Self::next_mate(r2, path_r2.as_path())?),
            None => None,
        };

        let read = match (mate1, mate2) {
            (None, None) | (None, Some(None)) => return Ok(None),
            (Some(m1), None) => Read::single(self.next_id, m1),
            (Some(m1), Some(Some(m2))) => Read::paired(self.next_id, m1, m2),
            (Some(_), Some(None)) | (None, Some(Some(_))) => {
                return Err(Error::source_read(Some(format!(
                    "paired input files have different number of reads (after {} reads)",
                    self.next_id
                ))))
            }
        };
        self.next_id += 1;
        Ok(Some(read))
    }

    fn progress(&self) -> f64 {
        let sum: f64 = self.progress.iter().map(|p| p.fraction()).sum();
        sum / self.progress.len() as f64
    }

    fn is_paired(&self) -> bool {
        self.r2.is_some()
    }
}

/// Single-end FASTA input; qualities are set to the maximum
pub struct FastaReadSource {
    reader: FastaReader<BoxedReader>,
    progress: FileProgress,
    path: PathBuf,
    next_id: u64,
}

const FASTA_QUALITY: u8 = b'I';

impl FastaReadSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let (reader, progress) = open_counted(path.as_ref())?;
        Ok(FastaReadSource {
            reader: FastaReader::new(reader),
            progress,
            path: path.as_ref().to_path_buf(),
            next_id: 0,
        })
    }
}

impl ReadSource for FastaReadSource {
    fn next(&mut self) -> Result<Option<Read>, Error> {
        let record = match self.reader.next() {
            None => return Ok(None),
            Some(Err(e)) => return Err(Error::file_not_valid(&self.path, Some(e.to_string()))),
            Some(Ok(record)) => record,
        };
        let seq = record.full_seq().into_owned();
        let qual = vec![FASTA_QUALITY; seq.len()];
        let read = Read::single(
            self.next_id,
            SingleRead::new(description(record.head()), seq, qual),
        );
        self.next_id += 1;
        Ok(Some(read))
    }

    fn progress(&self) -> f64 {
        self.progress.fraction()
    }

    fn is_paired(&self) -> bool {
        false
    }
}

/// Open R1 (and R2) as a read source, picking the reader from the file name
pub fn open_read_source(
    r1: &Path,
    r2: Option<&Path>,
) -> Result<Box<dyn ReadSource>, Error> {
    match detect_fileformat(r1) {
        DetectedFileformat::FASTQ => Ok(Box::new(FastqReadSource::open(r1, r2)?)),
        DetectedFileformat::FASTA if r2.is_none() => Ok(Box::new(FastaReadSource::open(r1)?)),
        DetectedFileformat::FASTA => Err(Error::configuration(
            "paired-end input is only supported for FASTQ files",
        )),
        _ => Err(Error::file_not_valid(
            r1,
            Some("unknown input file type, expected FASTQ or FASTA"),
        )),
    }
}

////////// Write one FASTQ read
fn write_fastq_read<W: Write>(writer: &mut W, head: &[u8], seq: &[u8], qual: &[u8]) -> io::Result<()> {
    writer.write_all(b"@")?;
    writer.write_all(head)?;
    writer.write_all(b"\n")?;
    writer.write_all(seq)?;
    writer.write_all(b"\n+\n")?;
    writer.write_all(qual)?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn create_fastq_writer(path: &Path) -> io::Result<Box<dyn Write + Send>> {
    let file = File::create(path)?;
    if is_gzip_path(path) {
        Ok(Box::new(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Writes not aligned reads as FASTQ, one file per mate.
/// Files ending in `.gz` are gzip compressed.
pub struct FastqRejectedWriter {
    writers: Vec<Box<dyn Write + Send>>,
}

impl FastqRejectedWriter {
    pub fn create<P: AsRef<Path>>(r1: P, r2: Option<P>) -> Result<Self, Error> {
        let mut writers = vec![create_fastq_writer(r1.as_ref())
            .map_err(|e| Error::sink_write("rejected", e))?];
        if let Some(r2) = r2 {
            writers.push(
                create_fastq_writer(r2.as_ref()).map_err(|e| Error::sink_write("rejected", e))?,
            );
        }
        Ok(FastqRejectedWriter { writers })
    }
}

impl RejectedSink for FastqRejectedWriter {
    fn write(&mut self, read: &Read) -> io::Result<()> {
        if read.mates.len() != self.writers.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("read {} has {} mates", read.id, read.mates.len()),
            ));
        }
        for (writer, mate) in self.writers.iter_mut().zip(read.mates.iter()) {
            let head = match &mate.description {
                Some(d) => d.clone(),
                None => format!("R{}", read.id),
            };
            write_fastq_read(writer, head.as_bytes(), &mate.seq, &mate.qual)?;
        }
        Ok(())
    }

    fn is_paired(&self) -> bool {
        self.writers.len() == 2
    }

    fn finish(&mut self) -> io::Result<()> {
        for writer in self.writers.iter_mut() {
            writer.flush()?;
        }
        // closing the boxed writers finishes the gzip streams
        self.writers.clear();
        Ok(())
    }
}
