use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;
use std::fmt;

pub fn kind_to_char(kind: CigarKind) -> char {
    match kind {
        CigarKind::Match => 'M',
        CigarKind::Insertion => 'I',
        CigarKind::Deletion => 'D',
        CigarKind::Skip => 'N',
        CigarKind::SoftClip => 'S',
        CigarKind::HardClip => 'H',
        CigarKind::Pad => 'P',
        CigarKind::SequenceMatch => '=',
        CigarKind::SequenceMismatch => 'X',
    }
}

/// Run-length list of CIGAR operations. Adjacent runs of the same kind are merged on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    pub ops: Vec<(u32, CigarKind)>,
}

impl Cigar {
    pub fn add_operation(&mut self, len: u32, op: CigarKind) {
        if len == 0 {
            return;
        }
        if let Some((prev_len, prev_op)) = self.ops.last_mut()
            && *prev_op == op
        {
            *prev_len += len;
            return;
        }
        self.ops.push((len, op));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Reference bases consumed: M, =, X, D, N and H runs.
    pub fn reference_len(&self) -> u32 {
        self.ops
            .iter()
            .filter(|(_, op)| {
                matches!(
                    op,
                    CigarKind::Match
                        | CigarKind::SequenceMatch
                        | CigarKind::SequenceMismatch
                        | CigarKind::Deletion
                        | CigarKind::Skip
                        | CigarKind::HardClip
                )
            })
            .map(|(len, _)| len)
            .sum()
    }

    /// Query bases consumed: M, =, X, I and S runs.
    pub fn query_len(&self) -> u32 {
        self.ops
            .iter()
            .filter(|(_, op)| {
                matches!(
                    op,
                    CigarKind::Match
                        | CigarKind::SequenceMatch
                        | CigarKind::SequenceMismatch
                        | CigarKind::Insertion
                        | CigarKind::SoftClip
                )
            })
            .map(|(len, _)| len)
            .sum()
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("*");
        }
        for (len, op) in &self.ops {
            write!(f, "{}{}", len, kind_to_char(*op))?;
        }
        Ok(())
    }
}
