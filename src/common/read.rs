use serde::{Deserialize, Serialize};

/// One mate of a read: nucleotides, phred+33 qualities and the header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRead {
    pub description: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

impl SingleRead {
    pub fn new(description: Option<String>, seq: Vec<u8>, qual: Vec<u8>) -> Self {
        debug_assert_eq!(seq.len(), qual.len());
        SingleRead {
            description,
            seq,
            qual,
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Keep only `range` of the sequence and quality.
    pub fn retain_range(&mut self, range: std::ops::Range<usize>) {
        let end = range.end.min(self.seq.len());
        let start = range.start.min(end);
        self.seq.truncate(end);
        self.qual.truncate(end);
        self.seq.drain(..start);
        self.qual.drain(..start);
    }
}

/// A single or paired read. The ID is assigned by the read source in
/// emission order and is dense and strictly increasing within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Read {
    pub id: u64,
    pub mates: Vec<SingleRead>,
}

impl Read {
    pub fn single(id: u64, r1: SingleRead) -> Self {
        Read { id, mates: vec![r1] }
    }

    pub fn paired(id: u64, r1: SingleRead, r2: SingleRead) -> Self {
        Read {
            id,
            mates: vec![r1, r2],
        }
    }

    pub fn is_paired(&self) -> bool {
        self.mates.len() == 2
    }

    pub fn r1(&self) -> &SingleRead {
        &self.mates[0]
    }

    pub fn r2(&self) -> Option<&SingleRead> {
        self.mates.get(1)
    }

    pub fn total_len(&self) -> usize {
        self.mates.iter().map(|m| m.len()).sum()
    }
}

impl std::fmt::Display for Read {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.id)?;
        for mate in &self.mates {
            write!(f, " {}", String::from_utf8_lossy(&mate.seq))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_range() {
        let mut r = SingleRead::new(None, b"ACGTACGT".to_vec(), b"IIII####".to_vec());
        r.retain_range(2..6);
        assert_eq!(r.seq, b"GTAC".to_vec());
        assert_eq!(r.qual, b"II##".to_vec());

        r.retain_range(3..10);
        assert_eq!(r.seq, b"C".to_vec());

        r.retain_range(5..2);
        assert!(r.is_empty());
        assert!(r.qual.is_empty());
    }
}
