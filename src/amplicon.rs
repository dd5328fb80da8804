use std::cmp::Ordering;
use std::fmt;

/// A stranded interval on a reference sequence. `start` is 0-based, `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomicRegion {
    pub chromosome: String,
    pub start: u32,
    pub end: u32,
    pub forward: bool,
    pub name: Option<String>,
}

impl GenomicRegion {
    pub fn new(chromosome: impl Into<String>, start: u32, end: u32, forward: bool) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            end,
            forward,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn width(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    fn key(&self) -> (&str, u32, u32, bool) {
        (&self.chromosome, self.start, self.end, self.forward)
    }
}

impl fmt::Display for GenomicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strand = if self.forward { '+' } else { '-' };
        write!(f, "{}:{}-{}({})", self.chromosome, self.start, self.end, strand)
    }
}

/// A target region together with its reference sequence.
///
/// Equality and ordering only look at `(chromosome, start, end, strand)`; the name and the
/// sequence do not participate.
#[derive(Debug, Clone)]
pub struct Amplicon {
    pub region: GenomicRegion,
    pub sequence: Vec<u8>,
}

impl Amplicon {
    pub fn new(region: GenomicRegion, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            region,
            sequence: sequence.into(),
        }
    }

    pub fn chromosome(&self) -> &str {
        &self.region.chromosome
    }

    pub fn start(&self) -> u32 {
        self.region.start
    }

    pub fn end(&self) -> u32 {
        self.region.end
    }

    pub fn is_forward(&self) -> bool {
        self.region.forward
    }

    pub fn width(&self) -> u32 {
        self.region.width()
    }

    /// `chr:start-end(+)` descriptor used in the `am` tag.
    pub fn descriptor(&self) -> String {
        self.region.to_string()
    }
}

impl PartialEq for Amplicon {
    fn eq(&self, other: &Self) -> bool {
        self.region.key() == other.region.key()
    }
}

impl Eq for Amplicon {}

impl PartialOrd for Amplicon {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Amplicon {
    fn cmp(&self, other: &Self) -> Ordering {
        self.region.key().cmp(&other.region.key())
    }
}
