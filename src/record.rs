//! SAM text records.
//!
//! A record is composed of the read it describes, a flag set, the core alignment fields, the
//! mate fields, and free-form tags. The flag bits are noodles' `Flags`; rendering is plain text.

use crate::cigar::Cigar;
use crate::read::Read;
use noodles::sam::alignment::record::Flags;
use std::cell::OnceCell;
use std::fmt;

pub const UNMAPPED_NAME: &str = "*";
pub const SAME_REFERENCE: &str = "=";

/// Reference name, position, mapping quality and CIGAR. The CIGAR's reference and query
/// lengths are cached and reset whenever the CIGAR is replaced.
#[derive(Debug, Clone)]
pub struct AlignmentCore {
    pub rname: String,
    /// 1-based; 0 when unplaced.
    pub pos: u32,
    mapq: u8,
    cigar: Cigar,
    reference_len: OnceCell<u32>,
    query_len: OnceCell<u32>,
}

impl Default for AlignmentCore {
    fn default() -> Self {
        Self {
            rname: UNMAPPED_NAME.to_string(),
            pos: 0,
            mapq: 0,
            cigar: Cigar::default(),
            reference_len: OnceCell::new(),
            query_len: OnceCell::new(),
        }
    }
}

impl AlignmentCore {
    pub fn mapq(&self) -> u8 {
        self.mapq
    }

    /// Clamps to 0..=255.
    pub fn set_mapq(&mut self, mapq: i64) {
        self.mapq = mapq.clamp(0, i64::from(u8::MAX)) as u8;
    }

    pub fn cigar(&self) -> &Cigar {
        &self.cigar
    }

    pub fn set_cigar(&mut self, cigar: Cigar) {
        self.cigar = cigar;
        self.reference_len = OnceCell::new();
        self.query_len = OnceCell::new();
    }

    pub fn reference_len(&self) -> u32 {
        *self.reference_len.get_or_init(|| self.cigar.reference_len())
    }

    pub fn query_len(&self) -> u32 {
        *self.query_len.get_or_init(|| self.cigar.query_len())
    }
}

#[derive(Debug, Clone)]
pub struct MateInfo {
    pub rnext: String,
    pub pnext: u32,
    pub tlen: i32,
}

impl Default for MateInfo {
    fn default() -> Self {
        Self {
            rnext: UNMAPPED_NAME.to_string(),
            pnext: 0,
            tlen: 0,
        }
    }
}

/// Optional field rendered as `XX:T:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub kind: char,
    pub value: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.kind, self.value)
    }
}

#[derive(Debug, Clone)]
pub struct SamRecord {
    read: Read,
    pub flags: Flags,
    pub core: AlignmentCore,
    pub mate: MateInfo,
    tags: Vec<Tag>,
}

impl SamRecord {
    /// An unplaced record carrying only the unmapped flag.
    pub fn unmapped(read: Read) -> Self {
        Self {
            read,
            flags: Flags::UNMAPPED,
            core: AlignmentCore::default(),
            mate: MateInfo::default(),
            tags: Vec::new(),
        }
    }

    /// A placed record. On the reverse strand the stored sequence and quality are the read's
    /// reverse complement.
    pub fn mapped(mut read: Read, rname: impl Into<String>, pos: u32, forward: bool) -> Self {
        let mut flags = Flags::empty();
        if !forward {
            flags.insert(Flags::REVERSE_COMPLEMENTED);
            read.reverse_complement();
        }
        Self {
            read,
            flags,
            core: AlignmentCore {
                rname: rname.into(),
                pos,
                ..AlignmentCore::default()
            },
            mate: MateInfo::default(),
            tags: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.read.name()
    }

    pub fn sequence(&self) -> &[u8] {
        self.read.sequence()
    }

    pub fn quality(&self) -> &[u8] {
        self.read.quality()
    }

    pub fn rname(&self) -> &str {
        &self.core.rname
    }

    pub fn pos(&self) -> u32 {
        self.core.pos
    }

    pub fn mapq(&self) -> u8 {
        self.core.mapq()
    }

    pub fn set_mapq(&mut self, mapq: i64) {
        self.core.set_mapq(mapq);
    }

    pub fn cigar(&self) -> &Cigar {
        self.core.cigar()
    }

    pub fn set_cigar(&mut self, cigar: Cigar) {
        self.core.set_cigar(cigar);
    }

    pub fn reference_len(&self) -> u32 {
        self.core.reference_len()
    }

    pub fn query_len(&self) -> u32 {
        self.core.query_len()
    }

    pub fn rnext(&self) -> &str {
        &self.mate.rnext
    }

    pub fn pnext(&self) -> u32 {
        self.mate.pnext
    }

    pub fn tlen(&self) -> i32 {
        self.mate.tlen
    }

    pub fn is_unmapped(&self) -> bool {
        self.flags.contains(Flags::UNMAPPED)
    }

    pub fn is_reverse(&self) -> bool {
        self.flags.contains(Flags::REVERSE_COMPLEMENTED)
    }

    pub fn add_tag(&mut self, name: &str, kind: char, value: impl fmt::Display) {
        self.tags.push(Tag {
            name: name.to_string(),
            kind,
            value: value.to_string(),
        });
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Value of the first tag with this name.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }

    /// Link two records of one template: paired flags, mate reference/position and template
    /// length. An unmapped mate is placed at its partner's reference and position.
    pub fn mate(&mut self, other: &mut SamRecord) {
        self.flags.insert(Flags::SEGMENTED);
        other.flags.insert(Flags::SEGMENTED);

        if !self.is_unmapped() && !other.is_unmapped() {
            if self.core.rname == other.core.rname {
                let pos = i64::from(self.core.pos);
                let other_pos = i64::from(other.core.pos);
                let tlen = if pos < other_pos {
                    other_pos - pos + i64::from(other.reference_len())
                } else {
                    -(pos - other_pos + i64::from(self.reference_len()))
                }
                .abs() as i32;

                self.mate.rnext = SAME_REFERENCE.to_string();
                self.mate.pnext = other.core.pos;
                self.mate.tlen = tlen;
                other.mate.rnext = SAME_REFERENCE.to_string();
                other.mate.pnext = self.core.pos;
                other.mate.tlen = tlen;
            } else {
                self.mate.rnext = other.core.rname.clone();
                self.mate.pnext = other.core.pos;
                self.mate.tlen = 0;
                other.mate.rnext = self.core.rname.clone();
                other.mate.pnext = self.core.pos;
                other.mate.tlen = 0;
            }
            if other.is_reverse() {
                self.flags.insert(Flags::MATE_REVERSE_COMPLEMENTED);
            }
            if self.is_reverse() {
                other.flags.insert(Flags::MATE_REVERSE_COMPLEMENTED);
            }
        } else if other.is_unmapped() {
            Self::place_unmapped_mate(self, other);
        } else {
            Self::place_unmapped_mate(other, self);
        }
    }

    fn place_unmapped_mate(anchor: &mut SamRecord, unmapped: &mut SamRecord) {
        anchor.mate.rnext = SAME_REFERENCE.to_string();
        anchor.mate.pnext = anchor.core.pos;
        anchor.mate.tlen = 0;
        anchor.flags.insert(Flags::MATE_UNMAPPED);
        anchor.flags.remove(Flags::MATE_REVERSE_COMPLEMENTED);

        unmapped.core.rname = anchor.core.rname.clone();
        unmapped.core.pos = anchor.core.pos;
        unmapped.mate.rnext = SAME_REFERENCE.to_string();
        unmapped.mate.pnext = anchor.core.pos;
        unmapped.mate.tlen = 0;
    }

    /// Reset to an unmapped record. Tags are kept and the sequence is returned to read
    /// orientation.
    pub fn unmap(&mut self) {
        if self.is_reverse() {
            self.read.reverse_complement();
        }
        self.flags = Flags::UNMAPPED;
        self.core.rname = UNMAPPED_NAME.to_string();
        self.core.pos = 0;
        self.core.set_mapq(0);
        self.core.set_cigar(Cigar::default());
        self.mate = MateInfo::default();
    }
}

fn field_or_star(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    if bytes.is_empty() {
        std::borrow::Cow::Borrowed("*")
    } else {
        String::from_utf8_lossy(bytes)
    }
}

impl fmt::Display for SamRecord {
    /// One SAM line without the trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.name(),
            self.flags.bits(),
            self.core.rname,
            self.core.pos,
            self.core.mapq(),
            self.core.cigar(),
            self.mate.rnext,
            self.mate.pnext,
            self.mate.tlen,
            field_or_star(self.sequence()),
            field_or_star(self.quality()),
        )?;
        for tag in &self.tags {
            write!(f, "\t{tag}")?;
        }
        Ok(())
    }
}
