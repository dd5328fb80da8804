use crate::read::{Read, ReadPair};
use anyhow::Result;
use needletail::{FastxReader, parse_fastx_file, parse_fastx_reader};
use std::path::Path;

/// A lazy stream of reads; `None` marks end of stream.
pub type ReadSource = Box<dyn Iterator<Item = Read> + Send>;

/// FASTQ (or FASTA) reads from needletail. A malformed record is logged and ends the stream.
pub struct FastqSource {
    reader: Box<dyn FastxReader>,
    label: String,
    finished: bool,
}

impl FastqSource {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = parse_fastx_file(path)
            .map_err(|e| anyhow::anyhow!("failed to open reads {}: {}", path.display(), e))?;
        Ok(Self {
            reader,
            label: path.display().to_string(),
            finished: false,
        })
    }

    pub fn from_reader<R>(reader: R, label: impl Into<String>) -> Result<Self>
    where
        R: std::io::Read + Send + 'static,
    {
        let label = label.into();
        let reader = parse_fastx_reader(reader)
            .map_err(|e| anyhow::anyhow!("failed to open reads {}: {}", label, e))?;
        Ok(Self {
            reader,
            label,
            finished: false,
        })
    }
}

impl Iterator for FastqSource {
    type Item = Read;

    fn next(&mut self) -> Option<Read> {
        if self.finished {
            return None;
        }
        match self.reader.next() {
            Some(Ok(record)) => {
                let name = String::from_utf8_lossy(record.id()).into_owned();
                let sequence = record.seq().into_owned();
                let quality = record.qual().map(<[u8]>::to_vec).unwrap_or_default();
                Some(Read::new(name, sequence, quality))
            }
            Some(Err(e)) => {
                tracing::warn!(source = %self.label, error = %e, "malformed read record, ending stream");
                self.finished = true;
                None
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

/// Reads the forward and reverse streams in lock step.
pub struct PairedReader {
    forward: Option<ReadSource>,
    reverse: Option<ReadSource>,
}

impl PairedReader {
    pub fn new(forward: Option<ReadSource>, reverse: Option<ReadSource>) -> Self {
        Self { forward, reverse }
    }

    pub fn open(forward: &Path, reverse: &Path) -> Result<Self> {
        let forward: ReadSource = Box::new(FastqSource::open(forward)?);
        let reverse: ReadSource = Box::new(FastqSource::open(reverse)?);
        Ok(Self::new(Some(forward), Some(reverse)))
    }

    /// Next pair, or `None` once both streams are exhausted.
    pub fn next_pair(&mut self) -> Option<ReadPair> {
        let forward = self.forward.as_mut().and_then(Iterator::next);
        let reverse = self.reverse.as_mut().and_then(Iterator::next);
        let pair = ReadPair::new(forward, reverse);
        (!pair.is_empty()).then_some(pair)
    }
}

impl Iterator for PairedReader {
    type Item = ReadPair;

    fn next(&mut self) -> Option<ReadPair> {
        self.next_pair()
    }
}
