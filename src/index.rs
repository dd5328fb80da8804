//! K-mer seed index over the amplicon set.
//!
//! Four tries map a fixed-length seed to the amplicons it was taken from. Each tree covers one
//! (orientation, seed window) pair. Trees are keyed by the orientation the amplicon is expected
//! to be sequenced in, so a reverse-strand amplicon stores its reverse-complement seeds in the
//! forward trees and vice versa.

use crate::amplicon::Amplicon;
use crate::read::{ReadPair, reverse_complement};
use crate::types::AmpliconId;
use std::cmp::Ordering;
use std::sync::Arc;

pub const DEFAULT_SEED_LENGTH: usize = 7;

const NO_CHILD: u32 = 0;

fn symbol_index(base: u8) -> Option<usize> {
    match base {
        b'A' => Some(0),
        b'T' => Some(1),
        b'C' => Some(2),
        b'G' => Some(3),
        b'N' => Some(4),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    // Index 0 is the root, which is never anyone's child, so 0 doubles as "no child".
    children: [u32; 5],
    data: Vec<AmpliconId>,
}

/// Arena-backed trie over the alphabet {A,T,C,G,N}.
#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<TrieNode>,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    /// Store `id` under `key`. Keys holding a symbol outside the alphabet are not stored.
    pub fn insert(&mut self, key: &[u8], id: AmpliconId) -> bool {
        let Some(symbols) = key.iter().map(|&b| symbol_index(b)).collect::<Option<Vec<_>>>()
        else {
            return false;
        };
        let mut node = 0usize;
        for sym in symbols {
            let child = self.nodes[node].children[sym];
            node = if child == NO_CHILD {
                let next = self.nodes.len();
                self.nodes.push(TrieNode::default());
                self.nodes[node].children[sym] = next as u32;
                next
            } else {
                child as usize
            };
        }
        self.nodes[node].data.push(id);
        true
    }

    /// Ids stored under exactly `key`, in insertion order.
    pub fn get(&self, key: &[u8]) -> &[AmpliconId] {
        let mut node = 0usize;
        for &base in key {
            let Some(sym) = symbol_index(base) else {
                return &[];
            };
            let child = self.nodes[node].children[sym];
            if child == NO_CHILD {
                return &[];
            }
            node = child as usize;
        }
        &self.nodes[node].data
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Merge two ascending id lists into their sorted union.
fn sorted_union(a: &[AmpliconId], b: &[AmpliconId]) -> Vec<AmpliconId> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Merge two ascending id lists into their sorted intersection.
fn sorted_intersection(a: &[AmpliconId], b: &[AmpliconId]) -> Vec<AmpliconId> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct AmpliconIndex {
    amplicons: Vec<Arc<Amplicon>>,
    seed_length: usize,
    built: bool,
    forward_first: Trie,
    reverse_first: Trie,
    forward_second: Trie,
    reverse_second: Trie,
}

impl AmpliconIndex {
    pub fn new() -> Self {
        Self {
            seed_length: DEFAULT_SEED_LENGTH,
            ..Self::default()
        }
    }

    /// Queue an amplicon for indexing. Has no effect once the index is built.
    pub fn add(&mut self, amplicon: Amplicon) {
        if !self.built {
            self.amplicons.push(Arc::new(amplicon));
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn seed_length(&self) -> usize {
        self.seed_length
    }

    pub fn len(&self) -> usize {
        self.amplicons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplicons.is_empty()
    }

    /// Sorted amplicons; `AmpliconId`s index into this slice.
    pub fn amplicons(&self) -> &[Arc<Amplicon>] {
        &self.amplicons
    }

    pub fn amplicon(&self, id: AmpliconId) -> Option<&Arc<Amplicon>> {
        self.amplicons.get(id as usize)
    }

    /// Total number of reference bases covered by the amplicons.
    pub fn db_size(&self) -> u64 {
        self.amplicons.iter().map(|a| u64::from(a.width())).sum()
    }

    /// Sort the amplicons and fill the four trees. Returns the number of amplicons indexed,
    /// or 0 if the index was already built.
    pub fn build(&mut self, seed_length: usize) -> usize {
        if self.built {
            return 0;
        }
        self.seed_length = seed_length;
        self.amplicons.sort();

        let k = seed_length;
        for (id, amplicon) in self.amplicons.iter().enumerate() {
            let id = id as AmpliconId;
            let seq = &amplicon.sequence;
            let len = seq.len();

            let mut fa = seq.get(..k).map(<[u8]>::to_vec).unwrap_or_default();
            let mut ra = len
                .checked_sub(k)
                .map(|s| reverse_complement(&seq[s..]))
                .unwrap_or_default();
            let (mut fb, mut rb) = if len >= 2 * k {
                (seq[k..2 * k].to_vec(), reverse_complement(&seq[len - 2 * k..len - k]))
            } else {
                (Vec::new(), Vec::new())
            };

            if !amplicon.is_forward() {
                std::mem::swap(&mut fa, &mut ra);
                std::mem::swap(&mut fb, &mut rb);
            }

            if k > 0 && fa.len() == k {
                self.forward_first.insert(&fa, id);
            }
            if k > 0 && ra.len() == k {
                self.reverse_first.insert(&ra, id);
            }
            if k > 0 && fb.len() == k {
                self.forward_second.insert(&fb, id);
            }
            if k > 0 && rb.len() == k {
                self.reverse_second.insert(&rb, id);
            }
        }

        self.built = true;
        tracing::debug!(
            amplicons = self.amplicons.len(),
            seed_length = k,
            nodes = self.forward_first.node_count()
                + self.reverse_first.node_count()
                + self.forward_second.node_count()
                + self.reverse_second.node_count(),
            "amplicon index built"
        );
        self.amplicons.len()
    }

    fn window(seq: &[u8], from: usize, k: usize) -> Option<&[u8]> {
        if k == 0 {
            return None;
        }
        seq.get(from..from + k)
    }

    fn lookup(&self, first: &Trie, second: &Trie, seq: &[u8]) -> Vec<AmpliconId> {
        let k = self.seed_length;
        let a = Self::window(seq, 0, k).map(|key| first.get(key)).unwrap_or(&[]);
        let b = Self::window(seq, k, k).map(|key| second.get(key)).unwrap_or(&[]);
        sorted_union(a, b)
    }

    /// Candidates for a read in the expected forward orientation.
    pub fn forward_candidates(&self, seq: &[u8]) -> Vec<AmpliconId> {
        self.lookup(&self.forward_first, &self.forward_second, seq)
    }

    /// Candidates for a read in the expected reverse orientation.
    pub fn reverse_candidates(&self, seq: &[u8]) -> Vec<AmpliconId> {
        self.lookup(&self.reverse_first, &self.reverse_second, seq)
    }

    /// Candidate ids for a pair: the intersection of both mates' sets, or the forward mate's
    /// set when it is unpaired. A pair without a forward mate has no candidates.
    pub fn candidate_ids(&self, pair: &ReadPair) -> Vec<AmpliconId> {
        match (&pair.forward, &pair.reverse) {
            (Some(f), Some(r)) => sorted_intersection(
                &self.forward_candidates(f.sequence()),
                &self.reverse_candidates(r.sequence()),
            ),
            (Some(f), None) => self.forward_candidates(f.sequence()),
            (None, _) => Vec::new(),
        }
    }

    pub fn candidates(&self, pair: &ReadPair) -> Vec<Arc<Amplicon>> {
        self.candidate_ids(pair)
            .into_iter()
            .filter_map(|id| self.amplicon(id).cloned())
            .collect()
    }
}

