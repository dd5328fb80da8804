//! Dynamic-programming pairwise alignment.
//!
//! All three variants share one fill routine over flat row-major buffers. Row `i` walks the
//! subject (the amplicon) and column `j` walks the query (the read):
//!
//! * a diagonal step consumes both and becomes `M`;
//! * a horizontal step consumes subject only and becomes `D`;
//! * a vertical step consumes query only and becomes `I`.

use crate::cigar::Cigar;
use crate::types::{Coord, Path};
use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;
use std::fmt;
use std::fmt::Write as _;

pub const GAP: u8 = b'-';
pub const WILDCARD: u8 = b'N';

/// Scoring parameters plus the per-read candidate ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentScore {
    pub match_score: i32,
    pub mismatch: i32,
    pub gap: i32,
    pub max_amplicons: usize,
}

impl AlignmentScore {
    pub fn new(match_score: i32, mismatch: i32, gap: i32, max_amplicons: usize) -> Self {
        Self {
            match_score,
            mismatch,
            gap,
            max_amplicons,
        }
    }

    /// Unit costs for edit distance.
    pub fn edit_distance() -> Self {
        Self::new(0, 1, 1, 1)
    }

    pub fn score(&self, reference: u8, query: u8) -> i32 {
        if reference == GAP || query == GAP {
            self.gap
        } else if reference == WILDCARD || query == WILDCARD || reference == query {
            self.match_score
        } else {
            self.mismatch
        }
    }
}

impl Default for AlignmentScore {
    fn default() -> Self {
        Self::new(2, -1, -1, 6000)
    }
}

impl fmt::Display for AlignmentScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "match: {} mismatch: {} gap: {} max amplicons: {}",
            self.match_score, self.mismatch, self.gap, self.max_amplicons
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Direction {
    #[default]
    Bound = 0,
    Diagonal = 1,
    Vertical = 2,
    Horizontal = 3,
}

impl Direction {
    fn symbol(self) -> char {
        match self {
            Direction::Bound => '*',
            Direction::Diagonal => '\\',
            Direction::Vertical => '|',
            Direction::Horizontal => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentKind {
    /// Smith–Waterman
    Local,
    /// Needleman–Wunsch
    Global,
    /// Levenshtein
    EditDistance,
}

/// A filled score/direction matrix for one (subject, query) pair.
#[derive(Debug, Clone)]
pub struct Alignment {
    kind: AlignmentKind,
    scores: AlignmentScore,
    gap_open: i32,
    rows: usize,
    cols: usize,
    matrix: Vec<i32>,
    directions: Vec<Direction>,
    end: Coord,
}

impl Alignment {
    pub fn new(
        kind: AlignmentKind,
        scores: AlignmentScore,
        gap_open: i32,
        subject: &[u8],
        query: &[u8],
    ) -> Self {
        let mut alignment = Self {
            kind,
            scores,
            gap_open,
            rows: 0,
            cols: 0,
            matrix: Vec::new(),
            directions: Vec::new(),
            end: (0, 0),
        };
        alignment.fill_matrix(subject, query);
        alignment
    }

    pub fn smith_waterman(scores: AlignmentScore, gap_open: i32, subject: &[u8], query: &[u8]) -> Self {
        Self::new(AlignmentKind::Local, scores, gap_open, subject, query)
    }

    pub fn needleman_wunsch(scores: AlignmentScore, gap_open: i32, subject: &[u8], query: &[u8]) -> Self {
        Self::new(AlignmentKind::Global, scores, gap_open, subject, query)
    }

    pub fn levenshtein(subject: &[u8], query: &[u8]) -> Self {
        Self::new(AlignmentKind::EditDistance, AlignmentScore::edit_distance(), 0, subject, query)
    }

    pub fn kind(&self) -> AlignmentKind {
        self.kind
    }

    /// `|subject| + 1`
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// `|query| + 1`
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> usize {
        i * self.cols + j
    }

    /// Recompute both matrices for a new pair, replacing the previous buffers.
    pub fn fill_matrix(&mut self, subject: &[u8], query: &[u8]) {
        self.rows = subject.len() + 1;
        self.cols = query.len() + 1;
        self.matrix = vec![0; self.rows * self.cols];
        self.directions = vec![Direction::Bound; self.rows * self.cols];

        match self.kind {
            AlignmentKind::Local => {}
            AlignmentKind::Global => {
                for i in 0..self.rows {
                    let idx = self.at(i, 0);
                    self.matrix[idx] = i as i32 * self.gap_open;
                }
                for j in 0..self.cols {
                    self.matrix[j] = j as i32 * self.gap_open;
                }
            }
            AlignmentKind::EditDistance => {
                for i in 0..self.rows {
                    let idx = self.at(i, 0);
                    self.matrix[idx] = i as i32;
                }
                for j in 0..self.cols {
                    self.matrix[j] = j as i32;
                }
            }
        }

        let mut max_score = 0i32;
        let mut max_at: Coord = (0, 0);

        for i in 1..self.rows {
            let s = subject[i - 1];
            for j in 1..self.cols {
                let q = query[j - 1];
                let up = self.at(i - 1, j);
                let left = self.at(i, j - 1);

                let diagonal = self.matrix[self.at(i - 1, j - 1)] + self.scores.score(s, q);
                let mut horizontal = self.matrix[up] + self.scores.score(GAP, q);
                let mut vertical = self.matrix[left] + self.scores.score(s, GAP);
                if self.kind != AlignmentKind::EditDistance {
                    if self.directions[up] != Direction::Horizontal {
                        horizontal += self.gap_open;
                    }
                    if self.directions[left] != Direction::Vertical {
                        vertical += self.gap_open;
                    }
                }

                let (cell, direction) = match self.kind {
                    AlignmentKind::Local => {
                        let best = diagonal.max(horizontal).max(vertical).max(0);
                        let direction = if diagonal == best {
                            Direction::Diagonal
                        } else if vertical == best {
                            Direction::Vertical
                        } else if horizontal == best {
                            Direction::Horizontal
                        } else {
                            Direction::Bound
                        };
                        (best, direction)
                    }
                    AlignmentKind::Global => {
                        let mut cell = (diagonal, Direction::Diagonal);
                        if vertical > cell.0 {
                            cell = (vertical, Direction::Vertical);
                        }
                        if horizontal > cell.0 {
                            cell = (horizontal, Direction::Horizontal);
                        }
                        cell
                    }
                    AlignmentKind::EditDistance => {
                        let mut cell = (diagonal, Direction::Diagonal);
                        if vertical < cell.0 {
                            cell = (vertical, Direction::Vertical);
                        }
                        if horizontal < cell.0 {
                            cell = (horizontal, Direction::Horizontal);
                        }
                        cell
                    }
                };

                let idx = self.at(i, j);
                self.matrix[idx] = cell;
                self.directions[idx] = direction;

                if cell > max_score {
                    max_score = cell;
                    max_at = (i, j);
                }
            }
        }

        self.end = match self.kind {
            AlignmentKind::Local => max_at,
            AlignmentKind::Global | AlignmentKind::EditDistance => (self.rows - 1, self.cols - 1),
        };
    }

    /// Coordinates of the optimal cell.
    pub fn end_point(&self) -> Coord {
        self.end
    }

    /// Score at the end point.
    pub fn score(&self) -> i32 {
        self.score_at(self.end.0, self.end.1)
    }

    /// Matrix value at `(i, j)`, or -1 outside the matrix.
    pub fn score_at(&self, i: usize, j: usize) -> i32 {
        if i < self.rows && j < self.cols {
            self.matrix[self.at(i, j)]
        } else {
            -1
        }
    }

    pub fn direction_at(&self, i: usize, j: usize) -> Option<Direction> {
        if i < self.rows && j < self.cols {
            self.directions.get(self.at(i, j)).copied()
        } else {
            None
        }
    }

    /// Edit distance between subject and query (bottom-right cell).
    pub fn distance(&self) -> i32 {
        self.score_at(self.rows - 1, self.cols - 1)
    }

    /// Traceback from `(x, y)` to the first bound cell, returned 5' to 3'. The bound cell is
    /// not part of the path.
    pub fn path_from(&self, x: usize, y: usize) -> Path {
        let mut path = Path::new();
        let (mut i, mut j) = (x, y);
        while let Some(direction) = self.direction_at(i, j) {
            match direction {
                Direction::Bound => break,
                Direction::Diagonal => {
                    path.push((i, j));
                    i -= 1;
                    j -= 1;
                }
                Direction::Vertical => {
                    path.push((i, j));
                    j -= 1;
                }
                Direction::Horizontal => {
                    path.push((i, j));
                    i -= 1;
                }
            }
        }
        path.reverse();
        path
    }

    /// Traceback from the end point.
    pub fn path(&self) -> Path {
        self.path_from(self.end.0, self.end.1)
    }

    /// CIGAR for a traceback path. Query bases outside the path become soft clips. Returns an
    /// empty CIGAR for a path that does not fit this matrix.
    pub fn to_cigar(&self, path: &[Coord]) -> Cigar {
        let mut cigar = Cigar::default();
        let (Some(&(_, first_j)), Some(&(_, last_j))) = (path.first(), path.last()) else {
            return cigar;
        };
        if self.directions.is_empty()
            || path
                .iter()
                .any(|&(i, j)| i == 0 || j == 0 || i >= self.rows || j >= self.cols)
        {
            return cigar;
        }

        let query_len = (self.cols - 1) as u32;
        cigar.add_operation(first_j as u32 - 1, CigarKind::SoftClip);
        for &(i, j) in path {
            let op = match self.directions[self.at(i, j)] {
                Direction::Diagonal => CigarKind::Match,
                Direction::Horizontal => CigarKind::Deletion,
                Direction::Vertical => CigarKind::Insertion,
                Direction::Bound => return Cigar::default(),
            };
            cigar.add_operation(1, op);
        }
        cigar.add_operation(query_len - last_j as u32, CigarKind::SoftClip);
        cigar
    }

    /// CIGAR of the optimal path.
    pub fn cigar(&self) -> Cigar {
        self.to_cigar(&self.path())
    }

    pub fn format_scores(&self) -> String {
        let mut out = String::new();
        for i in 0..self.rows {
            let row: Vec<String> = (0..self.cols)
                .map(|j| self.matrix[self.at(i, j)].to_string())
                .collect();
            let _ = writeln!(out, "{}", row.join("\t"));
        }
        out
    }

    pub fn format_directions(&self) -> String {
        let mut out = String::new();
        for i in 0..self.rows {
            let row: String = (0..self.cols)
                .map(|j| self.directions[self.at(i, j)].symbol())
                .collect();
            let _ = writeln!(out, "{row}");
        }
        out
    }
}

/// Index of the first path element that consumes query sequence.
pub fn query_start(path: &[Coord]) -> usize {
    path.iter().take_while(|&&(_, j)| j == 0).count()
}

/// Index of the element just before the trailing run that ends on the last query base.
/// `None` when that run covers the whole path.
pub fn query_end(path: &[Coord]) -> Option<usize> {
    let &(_, last_j) = path.last()?;
    let run = path.iter().rev().take_while(|&&(_, j)| j == last_j).count();
    path.len().checked_sub(run + 1)
}
