pub const PHRED_OFFSET: u8 = 33;

#[inline(always)]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' => b'a',
        _ => b'N',
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Anything but the four definite nucleotides counts as a wildcard
#[inline(always)]
pub fn is_wildcard(base: u8) -> bool {
    !matches!(base, b'A' | b'C' | b'G' | b'T' | b'a' | b'c' | b'g' | b't')
}

pub fn contains_wildcards(seq: &[u8]) -> bool {
    seq.iter().any(|&b| is_wildcard(b))
}

/// 2-bit code for a definite nucleotide
#[inline(always)]
pub fn encode_base(base: u8) -> Option<u64> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// All k-mers of `seq` that contain no wildcard, as (position, code).
pub fn kmers(seq: &[u8], k: usize) -> Vec<(usize, u64)> {
    let mut out = Vec::new();
    if k == 0 || k > 32 || seq.len() < k {
        return out;
    }
    let mask = if k == 32 { u64::MAX } else { (1u64 << (2 * k)) - 1 };
    let mut code = 0u64;
    let mut valid = 0usize;
    for (i, &b) in seq.iter().enumerate() {
        match encode_base(b) {
            Some(c) => {
                code = ((code << 2) | c) & mask;
                valid += 1;
            }
            None => {
                code = 0;
                valid = 0;
            }
        }
        if valid >= k {
            out.push((i + 1 - k, code));
        }
    }
    out
}

#[inline(always)]
pub fn same_base(a: u8, b: u8) -> bool {
    a.eq_ignore_ascii_case(&b) && !is_wildcard(a)
}
