use crate::amplicon::{Amplicon, GenomicRegion};
use crate::fasta::FastaDb;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Amplicon design resolved against a reference.
#[derive(Debug, Default)]
pub struct Design {
    /// Sorted, duplicate-free amplicons.
    pub amplicons: Vec<Amplicon>,
    /// `(name, length)` for every reference sequence, in FASTA order.
    pub references: Vec<(String, usize)>,
}

impl Design {
    /// Sum of amplicon widths; the database size for mapping quality.
    pub fn total_bases(&self) -> u64 {
        self.amplicons.iter().map(|a| u64::from(a.width())).sum()
    }
}

pub fn load_design(bed: &Path, fasta: &Path) -> Result<Design> {
    let reference = FastaDb::load(fasta)?;
    let file = File::open(bed).with_context(|| format!("failed to open BED {}", bed.display()))?;
    let regions = parse_bed(BufReader::new(file))
        .with_context(|| format!("failed to parse BED {}", bed.display()))?;
    build_design(regions, &reference)
}

/// Parse BED regions. Three columns give a forward region, a fourth column names it and a
/// sixth column of `-` puts it on the reverse strand.
pub fn parse_bed<R: BufRead>(reader: R) -> Result<Vec<GenomicRegion>> {
    let mut regions = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            bail!("line {}: expected at least 3 columns, found {}", lineno + 1, fields.len());
        }
        let start: u32 = fields[1]
            .trim()
            .parse()
            .with_context(|| format!("line {}: invalid start {:?}", lineno + 1, fields[1]))?;
        let end: u32 = fields[2]
            .trim()
            .parse()
            .with_context(|| format!("line {}: invalid end {:?}", lineno + 1, fields[2]))?;
        if end < start {
            bail!("line {}: end {} precedes start {}", lineno + 1, end, start);
        }
        let forward = !(fields.len() >= 6 && fields[5].trim() == "-");
        let mut region = GenomicRegion::new(fields[0], start, end, forward);
        if let Some(name) = fields.get(3).map(|n| n.trim()).filter(|n| !n.is_empty()) {
            region = region.with_name(name);
        }
        regions.push(region);
    }
    Ok(regions)
}

/// Attach reference sequence to every region, then sort and drop duplicates. Regions on a
/// sequence the reference lacks are skipped.
pub fn build_design(regions: Vec<GenomicRegion>, reference: &FastaDb) -> Result<Design> {
    let mut amplicons = Vec::with_capacity(regions.len());
    let mut skipped = 0usize;
    for region in regions {
        let Some(chrom) = reference.get(&region.chromosome) else {
            tracing::warn!(%region, "skipping region on a sequence missing from the reference");
            skipped += 1;
            continue;
        };
        let Some(seq) = reference.get_slice(&region.chromosome, region.start, region.end) else {
            bail!(
                "region {} extends past the end of {} (length {})",
                region,
                region.chromosome,
                chrom.len()
            );
        };
        let seq = seq.to_vec();
        amplicons.push(Amplicon::new(region, seq));
    }
    amplicons.sort();
    amplicons.dedup();
    if skipped > 0 {
        tracing::warn!(skipped, kept = amplicons.len(), "regions dropped from the design");
    }
    Ok(Design {
        amplicons,
        references: reference.references(),
    })
}
