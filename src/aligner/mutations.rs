use serde::{Deserialize, Serialize};

/// Difference between a gene feature (reference) and a read target.
/// Positions are in reference coordinates; an insertion at `pos` goes
/// right before reference base `pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    Substitution { pos: usize, from: u8, to: u8 },
    Deletion { pos: usize, base: u8 },
    Insertion { pos: usize, base: u8 },
}

impl Mutation {
    pub fn pos(&self) -> usize {
        match *self {
            Mutation::Substitution { pos, .. }
            | Mutation::Deletion { pos, .. }
            | Mutation::Insertion { pos, .. } => pos,
        }
    }

    /// Lowest position the next mutation may take
    fn next_free(&self) -> usize {
        match *self {
            Mutation::Substitution { pos, .. } | Mutation::Deletion { pos, .. } => pos + 1,
            Mutation::Insertion { pos, .. } => pos,
        }
    }

    pub fn encode(&self) -> String {
        match *self {
            Mutation::Substitution { pos, from, to } => {
                format!("S{}{}{}", from as char, pos, to as char)
            }
            Mutation::Deletion { pos, base } => format!("D{}{}", base as char, pos),
            Mutation::Insertion { pos, base } => format!("I{}{}", pos, base as char),
        }
    }
}

/// Move every indel to the leftmost equivalent position of the homopolymer
/// run it sits in, without crossing the preceding mutation. Applying it a
/// second time is a no-op. `mutations` must be sorted by position.
pub fn shift_indels_at_homopolymers(reference: &[u8], mutations: &mut [Mutation]) {
    let mut lower = 0usize;
    for m in mutations.iter_mut() {
        match m {
            Mutation::Deletion { pos, base } | Mutation::Insertion { pos, base } => {
                let mut p = (*pos).min(reference.len());
                while p > lower && reference[p - 1].eq_ignore_ascii_case(base) {
                    p -= 1;
                }
                *pos = p;
            }
            Mutation::Substitution { .. } => {}
        }
        lower = lower.max(m.next_free());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Apply sorted `mutations` to `reference`
    fn apply_mutations(reference: &[u8], mutations: &[Mutation]) -> Vec<u8> {
        let mut out = Vec::with_capacity(reference.len());
        let mut cursor = 0;
        for m in mutations {
            let pos = m.pos();
            out.extend_from_slice(&reference[cursor..pos]);
            cursor = pos;
            match *m {
                Mutation::Substitution { to, .. } => {
                    out.push(to);
                    cursor += 1;
                }
                Mutation::Deletion { .. } => cursor += 1,
                Mutation::Insertion { base, .. } => out.push(base),
            }
        }
        out.extend_from_slice(&reference[cursor..]);
        out
    }

    #[test]
    fn test_shift_deletion_left() {
        let reference = b"ACGAAAATC";
        let mut muts = vec![Mutation::Deletion { pos: 6, base: b'A' }];
        let before = apply_mutations(reference, &muts);
        shift_indels_at_homopolymers(reference, &mut muts);
        assert_eq!(muts, vec![Mutation::Deletion { pos: 3, base: b'A' }]);
        assert_eq!(apply_mutations(reference, &muts), before);
    }

    #[test]
    fn test_shift_insertion_left() {
        let reference = b"ACGTTTTC";
        let mut muts = vec![Mutation::Insertion { pos: 7, base: b'T' }];
        let before = apply_mutations(reference, &muts);
        shift_indels_at_homopolymers(reference, &mut muts);
        assert_eq!(muts, vec![Mutation::Insertion { pos: 3, base: b'T' }]);
        assert_eq!(apply_mutations(reference, &muts), before);
    }

    #[test]
    fn test_shift_stops_at_previous_mutation() {
        let reference = b"GAAAAAC";
        let mut muts = vec![
            Mutation::Substitution { pos: 2, from: b'A', to: b'C' },
            Mutation::Deletion { pos: 5, base: b'A' },
        ];
        let before = apply_mutations(reference, &muts);
        shift_indels_at_homopolymers(reference, &mut muts);
        assert_eq!(muts[1], Mutation::Deletion { pos: 3, base: b'A' });
        assert_eq!(apply_mutations(reference, &muts), before);
    }

    #[test]
    fn test_shift_is_idempotent() {
        let reference = b"TTTGGGGCCCAAAAT";
        let mut muts = vec![
            Mutation::Deletion { pos: 2, base: b'T' },
            Mutation::Insertion { pos: 7, base: b'G' },
            Mutation::Substitution { pos: 8, from: b'C', to: b'A' },
            Mutation::Deletion { pos: 13, base: b'A' },
            Mutation::Insertion { pos: 14, base: b'A' },
        ];
        let before = apply_mutations(reference, &muts);
        shift_indels_at_homopolymers(reference, &mut muts);
        let once = muts.clone();
        shift_indels_at_homopolymers(reference, &mut muts);
        assert_eq!(muts, once);
        assert_eq!(apply_mutations(reference, &muts), before);
    }
}
