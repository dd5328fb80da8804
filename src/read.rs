use std::cell::OnceCell;

/// Complement of a single nucleotide; case is preserved, unknown symbols become `N`.
pub fn complement_base(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        _ => b'N',
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement_base(b)).collect()
}

/// A sequencing read. The reverse complement and reversed quality are computed on first
/// request and cached until one of the setters replaces the underlying data.
#[derive(Debug, Clone, Default)]
pub struct Read {
    name: String,
    sequence: Vec<u8>,
    quality: Vec<u8>,
    rc_sequence: OnceCell<Vec<u8>>,
    rc_quality: OnceCell<Vec<u8>>,
}

impl Read {
    pub fn new(name: impl Into<String>, sequence: impl Into<Vec<u8>>, quality: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
            quality: quality.into(),
            rc_sequence: OnceCell::new(),
            rc_quality: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn quality(&self) -> &[u8] {
        &self.quality
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn rc_sequence(&self) -> &[u8] {
        self.rc_sequence.get_or_init(|| reverse_complement(&self.sequence))
    }

    pub fn rc_quality(&self) -> &[u8] {
        self.rc_quality
            .get_or_init(|| self.quality.iter().rev().copied().collect())
    }

    pub fn set_sequence(&mut self, sequence: impl Into<Vec<u8>>) {
        self.sequence = sequence.into();
        self.rc_sequence = OnceCell::new();
    }

    pub fn set_quality(&mut self, quality: impl Into<Vec<u8>>) {
        self.quality = quality.into();
        self.rc_quality = OnceCell::new();
    }

    /// Swap the read onto the opposite strand in place.
    pub fn reverse_complement(&mut self) {
        let sequence = self.rc_sequence().to_vec();
        let quality = self.rc_quality().to_vec();
        self.set_sequence(sequence);
        self.set_quality(quality);
    }
}

/// One unit of pipeline input. Either mate may be absent.
#[derive(Debug, Clone, Default)]
pub struct ReadPair {
    pub forward: Option<Read>,
    pub reverse: Option<Read>,
}

impl ReadPair {
    pub fn new(forward: Option<Read>, reverse: Option<Read>) -> Self {
        Self { forward, reverse }
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_none() && self.reverse.is_none()
    }
}
