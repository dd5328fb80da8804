use crate::alignment::AlignmentScore;
use crate::amplicon::Amplicon;
use crate::builder::{AlignmentBuilder, AlnSet};
use crate::index::{AmpliconIndex, DEFAULT_SEED_LENGTH};
use crate::read::ReadPair;
use crate::record::SamRecord;
use noodles::sam::alignment::record::Flags;

/// Nucleotide background frequency used when solving for lambda.
const NUCLEOTIDE_FREQUENCY: f64 = 0.25;
const LAMBDA_PRECISION: f64 = 0.001;
/// Karlin–Altschul K.
const KARLIN_K: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct AlignerConfig {
    /// Pairs with this many candidates or more are left unaligned.
    pub max_amplicons: usize,
    pub seed_length: usize,
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_extend: i32,
    pub gap_open: i32,
    /// Distance an alignment edge may sit from an amplicon edge. Negative disables the check.
    pub seed_margin: i32,
    /// Emit a record for every candidate instead of only the best one.
    pub report_secondary: bool,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            max_amplicons: 6000,
            seed_length: DEFAULT_SEED_LENGTH,
            match_score: 2,
            mismatch_score: -1,
            gap_extend: -1,
            gap_open: -1,
            seed_margin: 5,
            report_secondary: false,
        }
    }
}

impl AlignerConfig {
    pub fn scores(&self) -> AlignmentScore {
        AlignmentScore::new(
            self.match_score,
            self.mismatch_score,
            self.gap_extend,
            self.max_amplicons,
        )
    }
}

/// Solve `nf²·4·e^(λ·match) + nf²·12·e^(λ·mismatch) = 1` for λ by bisection on [0, 2].
pub fn solve_lambda(match_score: i32, mismatch_score: i32, precision: f64, nf: f64) -> f64 {
    let (mut low, mut high) = (0.0f64, 2.0f64);
    let mut lambda = 1.0f64;
    let nf2 = nf * nf;
    while high - low > precision {
        let sum = nf2 * 4.0 * (lambda * f64::from(match_score)).exp()
            + nf2 * 12.0 * (lambda * f64::from(mismatch_score)).exp();
        if sum > 1.0 {
            high = lambda;
            lambda = (lambda + low) / 2.0;
        } else {
            low = lambda;
            lambda = (lambda + high) / 2.0;
        }
    }
    lambda
}

/// BLAST-style conversion from raw score to a Phred-scaled mapping quality.
#[derive(Debug, Clone, Copy)]
pub struct MappingQuality {
    pub db_size: f64,
    pub lambda: f64,
    pub k: f64,
}

impl MappingQuality {
    pub fn new(db_size: u64, lambda: f64) -> Self {
        Self {
            db_size: db_size as f64,
            lambda,
            k: KARLIN_K,
        }
    }

    pub fn from_scores(db_size: u64, match_score: i32, mismatch_score: i32) -> Self {
        Self::new(
            db_size,
            solve_lambda(match_score, mismatch_score, LAMBDA_PRECISION, NUCLEOTIDE_FREQUENCY),
        )
    }

    pub fn bit_score(&self, score: i32) -> f64 {
        (self.lambda * f64::from(score) - self.k.ln()) / std::f64::consts::LN_2
    }

    pub fn evalue(&self, bit_score: f64, query_len: u32) -> f64 {
        self.db_size * f64::from(query_len) * 2f64.powf(-bit_score)
    }

    pub fn phred(&self, evalue: f64) -> i64 {
        (-10.0 * evalue.log10()).round() as i64
    }

    /// Score to mapping quality in one step.
    pub fn mapq(&self, score: i32, query_len: u32) -> i64 {
        self.phred(self.evalue(self.bit_score(score), query_len))
    }
}

/// True when `[start, end)` has an edge within `margin` of either amplicon edge.
pub fn near_amplicon_edge(amplicon: &Amplicon, start: i64, end: i64, margin: i64) -> bool {
    let (a_start, a_end) = (i64::from(amplicon.start()), i64::from(amplicon.end()));
    (a_start - start).abs() <= margin
        || (a_end - end).abs() <= margin
        || (a_start - end).abs() <= margin
        || (a_end - start).abs() <= margin
}

fn record_near_edge(amplicon: &Amplicon, record: Option<&SamRecord>, margin: i64) -> bool {
    match record {
        None => true,
        Some(record) => {
            let start = i64::from(record.pos());
            let end = start + i64::from(record.reference_len());
            near_amplicon_edge(amplicon, start, end, margin)
        }
    }
}

/// Whether the candidate's records should be unmapped: true if either mate's alignment sits
/// away from both amplicon edges.
pub fn seed_position_filter(entry: &AlnSet, margin: i64) -> bool {
    let forward_ok = record_near_edge(&entry.amplicon, entry.forward_record.as_ref(), margin);
    let reverse_ok = record_near_edge(&entry.amplicon, entry.reverse_record.as_ref(), margin);
    !forward_ok || !reverse_ok
}

/// Unmap every record of the candidate, keeping the old placement in an `sp` tag.
pub fn unmap_entry(entry: &mut AlnSet) {
    if let Some(record) = &mut entry.forward_record {
        unmap_with_placement(record, Flags::FIRST_SEGMENT);
    }
    if let Some(record) = &mut entry.reverse_record {
        unmap_with_placement(record, Flags::LAST_SEGMENT);
    }
    entry.link_mates();
}

fn unmap_with_placement(record: &mut SamRecord, segment: Flags) {
    let placement = format!("{};{};{}", record.rname(), record.pos(), record.cigar());
    record.unmap();
    record.flags.insert(segment);
    record.add_tag("sp", 'Z', placement);
}

/// Aligns read pairs against the indexed amplicons. Read-only after construction and
/// shared by all workers.
#[derive(Debug)]
pub struct AmpliconAligner<'a> {
    index: &'a AmpliconIndex,
    scores: AlignmentScore,
    gap_open: i32,
    seed_margin: i32,
    report_secondary: bool,
    mapq: MappingQuality,
}

impl<'a> AmpliconAligner<'a> {
    pub fn new(index: &'a AmpliconIndex, config: &AlignerConfig) -> Self {
        let scores = config.scores();
        let mapq = MappingQuality::from_scores(index.db_size(), scores.match_score, scores.mismatch);
        tracing::debug!(
            scores = %scores,
            gap_open = config.gap_open,
            lambda = mapq.lambda,
            db_size = index.db_size(),
            "aligner configured"
        );
        Self {
            index,
            scores,
            gap_open: config.gap_open,
            seed_margin: config.seed_margin,
            report_secondary: config.report_secondary,
            mapq,
        }
    }

    pub fn mapping_quality(&self) -> &MappingQuality {
        &self.mapq
    }

    pub fn index(&self) -> &AmpliconIndex {
        self.index
    }

    pub fn align(&self, pair: ReadPair) -> AlignmentBuilder {
        let candidates = self.index.candidates(&pair);
        let mut builder = AlignmentBuilder::new(pair);

        if candidates.len() < self.scores.max_amplicons {
            for amplicon in candidates {
                builder.add(amplicon);
            }
        }

        builder.align(&self.scores, self.gap_open);

        if self.report_secondary {
            builder.create_records();
        } else if let Some(best) = builder.best() {
            builder.create_record(best);
            if tracing::enabled!(tracing::Level::TRACE)
                && let Some(alignment) = &builder.entries[best].forward_alignment
            {
                tracing::trace!(
                    amplicon = %builder.entries[best].amplicon.descriptor(),
                    score = alignment.score(),
                    "scores:\n{}\ndirections:\n{}",
                    alignment.format_scores(),
                    alignment.format_directions()
                );
            }
        }

        for entry in &mut builder.entries {
            if let (Some(record), Some(alignment)) = (&mut entry.forward_record, &entry.forward_alignment) {
                record.set_mapq(self.mapq.mapq(alignment.score(), record.query_len()));
            }
            if let (Some(record), Some(alignment)) = (&mut entry.reverse_record, &entry.reverse_alignment) {
                record.set_mapq(self.mapq.mapq(alignment.score(), record.query_len()));
            }
        }

        if self.seed_margin >= 0 {
            let margin = i64::from(self.seed_margin);
            for entry in &mut builder.entries {
                if entry.has_records() && seed_position_filter(entry, margin) {
                    unmap_entry(entry);
                }
            }
        }

        builder
    }
}
