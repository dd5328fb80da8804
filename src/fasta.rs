use crate::types::HashMap;
use anyhow::Result;
use needletail::parse_fastx_file;
use std::path::Path;

/// Reference sequences in file order, upper-cased.
#[derive(Debug, Default)]
pub struct FastaDb {
    names: Vec<String>,
    seqs: Vec<Vec<u8>>,
    by_name: HashMap<String, usize>,
}

impl FastaDb {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = parse_fastx_file(path)
            .map_err(|e| anyhow::anyhow!("failed to open FASTA {}: {}", path.display(), e))?;
        let mut db = Self::default();

        while let Some(result) = reader.next() {
            let record = result
                .map_err(|e| anyhow::anyhow!("failed to parse FASTA record: {}", e))?;
            let header = String::from_utf8_lossy(record.id());
            let name = header.split_whitespace().next().unwrap_or("").to_string();
            let seq = record.seq().to_ascii_uppercase();
            db.insert(name, seq);
        }

        Ok(db)
    }

    /// Later records with a duplicate name replace the earlier sequence.
    pub fn insert(&mut self, name: String, seq: Vec<u8>) {
        if let Some(&idx) = self.by_name.get(&name) {
            self.seqs[idx] = seq;
            return;
        }
        self.by_name.insert(name.clone(), self.names.len());
        self.names.push(name);
        self.seqs.push(seq);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.by_name.get(name).map(|&idx| self.seqs[idx].as_slice())
    }

    /// 0-based, half-open slice. `None` when the name is unknown or the range runs off the end.
    pub fn get_slice(&self, name: &str, start: u32, end: u32) -> Option<&[u8]> {
        let seq = self.get(name)?;
        let (s, e) = (start as usize, end as usize);
        if s <= e && e <= seq.len() {
            Some(&seq[s..e])
        } else {
            None
        }
    }

    /// `(name, length)` pairs in file order, as used for the `@SQ` header lines.
    pub fn references(&self) -> Vec<(String, usize)> {
        self.names
            .iter()
            .zip(&self.seqs)
            .map(|(name, seq)| (name.clone(), seq.len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
