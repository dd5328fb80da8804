use std::fmt;

pub const PROGRAM_ID: &str = "nimbus";

/// Text header written ahead of the records.
#[derive(Debug, Clone, Default)]
pub struct SamHeader {
    pub references: Vec<(String, usize)>,
    pub version: String,
}

impl SamHeader {
    pub fn new(references: Vec<(String, usize)>) -> Self {
        Self {
            references,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl fmt::Display for SamHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@HD\tVN:1.3\tSO:unsorted")?;
        for (name, len) in &self.references {
            writeln!(f, "@SQ\tSN:{name}\tLN:{len}")?;
        }
        writeln!(f, "@PG\tID:{PROGRAM_ID}\tPN:{PROGRAM_ID}\tVN:{}", self.version)
    }
}
