use crate::alignment::{Alignment, AlignmentScore, query_end, query_start};
use crate::amplicon::Amplicon;
use crate::read::{Read, ReadPair};
use crate::record::SamRecord;
use crate::types::Path;
use noodles::sam::alignment::record::Flags;
use std::sync::Arc;

/// Placeholder mapping quality until the driver assigns the statistical one.
const PLACEHOLDER_MAPQ: i64 = 150;

/// One candidate amplicon for a read pair, with per-mate alignments, paths and records.
#[derive(Debug, Clone)]
pub struct AlnSet {
    pub amplicon: Arc<Amplicon>,
    pub forward_alignment: Option<Alignment>,
    pub reverse_alignment: Option<Alignment>,
    pub forward_path: Option<Path>,
    pub reverse_path: Option<Path>,
    pub forward_record: Option<SamRecord>,
    pub reverse_record: Option<SamRecord>,
}

impl AlnSet {
    pub fn new(amplicon: Arc<Amplicon>) -> Self {
        Self {
            amplicon,
            forward_alignment: None,
            reverse_alignment: None,
            forward_path: None,
            reverse_path: None,
            forward_record: None,
            reverse_record: None,
        }
    }

    /// Local-align each present mate against the amplicon. Mates are oriented to the amplicon's
    /// strand: the forward mate as-is on a forward amplicon, the reverse mate complemented.
    pub fn align(
        &mut self,
        scores: &AlignmentScore,
        gap_open: i32,
        forward: Option<&Read>,
        reverse: Option<&Read>,
    ) {
        let subject = &self.amplicon.sequence;
        let on_forward = self.amplicon.is_forward();
        if let Some(read) = forward {
            let query = if on_forward { read.sequence() } else { read.rc_sequence() };
            self.forward_alignment = Some(Alignment::smith_waterman(*scores, gap_open, subject, query));
        }
        if let Some(read) = reverse {
            let query = if on_forward { read.rc_sequence() } else { read.sequence() };
            self.reverse_alignment = Some(Alignment::smith_waterman(*scores, gap_open, subject, query));
        }
    }

    /// Combined score used to rank candidates. `None` without a forward alignment.
    pub fn combined_score(&self) -> Option<i32> {
        let forward = self.forward_alignment.as_ref()?.score();
        let reverse = self.reverse_alignment.as_ref().map_or(0, Alignment::score);
        Some(forward + reverse)
    }

    pub fn create_forward_record(&mut self, read: &Read) {
        if let Some(alignment) = &self.forward_alignment {
            let (path, record) = build_record(&self.amplicon, alignment, read, true);
            self.forward_path = Some(path);
            self.forward_record = record;
        }
    }

    pub fn create_reverse_record(&mut self, read: &Read) {
        if let Some(alignment) = &self.reverse_alignment {
            let (path, record) = build_record(&self.amplicon, alignment, read, false);
            self.reverse_path = Some(path);
            self.reverse_record = record;
        }
    }

    /// Records for whichever mates are present; a pair with both records is mate-linked.
    pub fn create_records(&mut self, forward: Option<&Read>, reverse: Option<&Read>) {
        match (forward, reverse) {
            (Some(f), Some(r)) => {
                if self.forward_alignment.is_none() || self.reverse_alignment.is_none() {
                    return;
                }
                self.create_forward_record(f);
                self.create_reverse_record(r);
                self.link_mates();
            }
            (Some(f), None) => self.create_forward_record(f),
            (None, Some(r)) => self.create_reverse_record(r),
            (None, None) => {}
        }
    }

    /// Re-run mate linkage in both directions when both records exist.
    pub fn link_mates(&mut self) {
        if let (Some(f), Some(r)) = (&mut self.forward_record, &mut self.reverse_record) {
            f.mate(r);
            r.mate(f);
        }
    }

    pub fn has_records(&self) -> bool {
        self.forward_record.is_some() || self.reverse_record.is_some()
    }

    /// Forward record first, then reverse.
    pub fn records(&self) -> impl Iterator<Item = &SamRecord> {
        self.forward_record.iter().chain(self.reverse_record.iter())
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut SamRecord> {
        self.forward_record
            .iter_mut()
            .chain(self.reverse_record.iter_mut())
    }
}

/// Turn an optimal path into a placed record. Returns no record for an empty path.
fn build_record(
    amplicon: &Amplicon,
    alignment: &Alignment,
    read: &Read,
    first_mate: bool,
) -> (Path, Option<SamRecord>) {
    let path = alignment.path();
    let Some(&(row, _)) = path.get(query_start(&path)) else {
        return (path, None);
    };

    let pos = row as u32 + amplicon.start();
    let forward = if first_mate {
        amplicon.is_forward()
    } else {
        !amplicon.is_forward()
    };

    let mut record = SamRecord::mapped(read.clone(), amplicon.chromosome(), pos, forward);
    record.set_cigar(alignment.to_cigar(&path));
    record.set_mapq(PLACEHOLDER_MAPQ);
    record.add_tag("am", 'Z', amplicon.descriptor());
    record.add_tag("AS", 'i', alignment.score());
    record.flags.insert(Flags::PROPERLY_SEGMENTED);
    record.flags.insert(if first_mate {
        Flags::FIRST_SEGMENT
    } else {
        Flags::LAST_SEGMENT
    });

    // Reference window spanned by the aligned part of the query.
    let start = row - 1;
    let window: &[u8] = match query_end(&path) {
        Some(end) => {
            let len = (path[end].0 + 1).saturating_sub(start);
            let seq = &amplicon.sequence;
            let from = start.min(seq.len());
            &seq[from..(start + len).min(seq.len())]
        }
        None => &[],
    };
    let nm = Alignment::levenshtein(window, record.sequence()).distance();
    record.add_tag("NM", 'i', nm);

    (path, Some(record))
}

/// All candidates for one read pair.
#[derive(Debug, Clone, Default)]
pub struct AlignmentBuilder {
    pub forward: Option<Read>,
    pub reverse: Option<Read>,
    pub entries: Vec<AlnSet>,
}

impl AlignmentBuilder {
    pub fn new(pair: ReadPair) -> Self {
        Self {
            forward: pair.forward,
            reverse: pair.reverse,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn add(&mut self, amplicon: Arc<Amplicon>) {
        self.entries.push(AlnSet::new(amplicon));
    }

    pub fn align(&mut self, scores: &AlignmentScore, gap_open: i32) {
        let (forward, reverse) = (self.forward.as_ref(), self.reverse.as_ref());
        for entry in &mut self.entries {
            entry.align(scores, gap_open, forward, reverse);
        }
    }

    /// Index of the highest combined score. Earlier candidates win ties.
    pub fn best(&self) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            let Some(score) = entry.combined_score() else {
                continue;
            };
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Build the records of candidate `idx` and tag them with the candidate count.
    pub fn create_record(&mut self, idx: usize) {
        let count = self.entries.len();
        let Some(entry) = self.entries.get_mut(idx) else {
            return;
        };
        entry.create_records(self.forward.as_ref(), self.reverse.as_ref());
        for record in entry.records_mut() {
            record.add_tag("nh", 'i', count);
        }
    }

    pub fn create_records(&mut self) {
        for idx in 0..self.entries.len() {
            self.create_record(idx);
        }
    }

    pub fn has_records(&self) -> bool {
        self.entries.iter().any(AlnSet::has_records)
    }

    /// Every record, candidate by candidate, forward mate first.
    pub fn records(&self) -> impl Iterator<Item = &SamRecord> {
        self.entries.iter().flat_map(AlnSet::records)
    }

    /// Unmapped stand-ins for a pair that produced no records.
    pub fn unmapped_records(&self) -> Vec<SamRecord> {
        let mut forward = self.forward.clone().map(|read| {
            let mut record = SamRecord::unmapped(read);
            record.flags.insert(Flags::SEGMENTED | Flags::FIRST_SEGMENT);
            record
        });
        let mut reverse = self.reverse.clone().map(|read| {
            let mut record = SamRecord::unmapped(read);
            record.flags.insert(Flags::SEGMENTED | Flags::LAST_SEGMENT);
            record
        });
        if let (Some(f), Some(r)) = (&mut forward, &mut reverse) {
            f.mate(r);
            r.mate(f);
        }
        forward.into_iter().chain(reverse).collect()
    }
}
