use nimbus_rs::alignment::{Direction, query_end, query_start};
use nimbus_rs::{Alignment, AlignmentKind, AlignmentScore};
use proptest::prelude::*;

fn dna(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(prop_oneof![Just(b'A'), Just(b'C'), Just(b'G'), Just(b'T')], len)
}

fn local(subject: &[u8], query: &[u8]) -> Alignment {
    Alignment::smith_waterman(AlignmentScore::default(), -1, subject, query)
}

#[test]
fn identical_sequences_align_end_to_end() {
    let aln = local(b"ACGT", b"ACGT");
    assert_eq!(aln.kind(), AlignmentKind::Local);
    assert_eq!(aln.score(), 8);
    assert_eq!(aln.end_point(), (4, 4));
    assert_eq!(aln.path(), vec![(1, 1), (2, 2), (3, 3), (4, 4)]);
    assert_eq!(aln.cigar().to_string(), "4M");
}

#[test]
fn leading_query_bases_become_soft_clips() {
    let aln = local(b"ACGT", b"TTACGT");
    assert_eq!(aln.score(), 8);
    assert_eq!(aln.end_point(), (4, 6));
    assert_eq!(aln.path(), vec![(1, 3), (2, 4), (3, 5), (4, 6)]);
    assert_eq!(aln.cigar().to_string(), "2S4M");
}

#[test]
fn trailing_query_bases_become_soft_clips() {
    let aln = local(b"ACGT", b"ACGTGG");
    assert_eq!(aln.end_point(), (4, 4));
    assert_eq!(aln.cigar().to_string(), "4M2S");
}

#[test]
fn no_positive_cell_gives_empty_path() {
    let aln = local(b"TTTT", b"AAAA");
    assert_eq!(aln.score(), 0);
    assert_eq!(aln.end_point(), (0, 0));
    assert!(aln.path().is_empty());
    assert!(aln.cigar().is_empty());
    assert_eq!(aln.cigar().to_string(), "*");
}

#[test]
fn subject_only_bases_become_deletions() {
    let aln = local(b"GGCCAATTGGACCTTAAGC", b"GGCCAATTGGCCTTAAGC");
    assert_eq!(aln.score(), 34);
    assert_eq!(aln.end_point(), (19, 18));
    assert_eq!(aln.cigar().to_string(), "10M1D8M");
    assert_eq!(aln.direction_at(11, 10), Some(Direction::Horizontal));
}

#[test]
fn query_only_bases_become_insertions() {
    let aln = local(b"GGCCAATTGGCCTTAAGC", b"GGCCAATTGGACCTTAAGC");
    assert_eq!(aln.score(), 34);
    assert_eq!(aln.end_point(), (18, 19));
    assert_eq!(aln.cigar().to_string(), "10M1I8M");
    assert_eq!(aln.direction_at(10, 11), Some(Direction::Vertical));
}

#[test]
fn gap_open_is_charged_once_per_run() {
    let subject = b"ACGTTGCAAGTTTTGCTTACCGAT";
    let query = b"ACGTTGCAAGGCTTACCGAT";
    // 20 matches, then -1 per gap base and -3 once for opening.
    let aln = Alignment::smith_waterman(AlignmentScore::default(), -3, subject, query);
    assert_eq!(aln.score(), 33);
    assert_eq!(aln.end_point(), (24, 20));
    assert_eq!(aln.cigar().to_string(), "10M4D10M");

    let aln = Alignment::smith_waterman(AlignmentScore::default(), -3, query, subject);
    assert_eq!(aln.score(), 33);
    assert_eq!(aln.cigar().to_string(), "10M4I10M");

    let aln = Alignment::smith_waterman(AlignmentScore::default(), -1, subject, query);
    assert_eq!(aln.score(), 35);
    assert_eq!(aln.cigar().to_string(), "10M4D10M");
}

#[test]
fn local_ties_prefer_diagonal_then_vertical_then_horizontal() {
    let free_gaps = |subject: &[u8], query: &[u8]| {
        Alignment::smith_waterman(AlignmentScore::default(), 0, subject, query)
    };

    // diagonal 2 - 1 and vertical 2 - 1 both give 1
    let aln = free_gaps(b"AA", b"AC");
    assert_eq!(aln.score_at(2, 2), 1);
    assert_eq!(aln.direction_at(2, 2), Some(Direction::Diagonal));

    // vertical and horizontal both give 1, diagonal -1
    let aln = free_gaps(b"AC", b"CA");
    assert_eq!(aln.score_at(2, 2), 1);
    assert_eq!(aln.direction_at(2, 2), Some(Direction::Vertical));

    // horizontal reaches 0 exactly, the others are negative
    let aln = free_gaps(b"ACC", b"AAA");
    assert_eq!(aln.score_at(3, 1), 0);
    assert_eq!(aln.direction_at(3, 1), Some(Direction::Horizontal));

    // vertical reaches 0 exactly with the default gap open
    let aln = local(b"AC", b"AC");
    assert_eq!(aln.score_at(1, 2), 0);
    assert_eq!(aln.direction_at(1, 2), Some(Direction::Vertical));
}

#[test]
fn wildcard_scores_as_match() {
    let scores = AlignmentScore::default();
    assert_eq!(scores.score(b'N', b'C'), 2);
    assert_eq!(scores.score(b'A', b'N'), 2);
    assert_eq!(scores.score(b'A', b'C'), -1);
    assert_eq!(scores.score(b'-', b'C'), -1);
    assert_eq!(scores.score(b'A', b'-'), -1);
}

#[test]
fn global_alignment_ends_bottom_right() {
    let aln = Alignment::needleman_wunsch(AlignmentScore::default(), -1, b"ACGT", b"ACGT");
    assert_eq!(aln.kind(), AlignmentKind::Global);
    assert_eq!(aln.end_point(), (4, 4));
    assert_eq!(aln.score(), 8);
    assert_eq!(aln.score_at(3, 0), -3);
    assert_eq!(aln.score_at(0, 2), -2);
    assert_eq!(aln.cigar().to_string(), "4M");
}

#[test]
fn levenshtein_distances() {
    assert_eq!(Alignment::levenshtein(b"ACGTACGT", b"ACGTCGT").distance(), 1);
    assert_eq!(Alignment::levenshtein(b"AAAA", b"TTTT").distance(), 4);
    assert_eq!(Alignment::levenshtein(b"ACGN", b"ACGT").distance(), 0);
    assert_eq!(Alignment::levenshtein(b"ACGT", b"").distance(), 4);
    assert_eq!(Alignment::levenshtein(b"", b"").distance(), 0);
}

#[test]
fn out_of_range_lookups() {
    let aln = local(b"ACGT", b"ACG");
    assert_eq!(aln.rows(), 5);
    assert_eq!(aln.cols(), 4);
    assert_eq!(aln.score_at(5, 0), -1);
    assert_eq!(aln.score_at(0, 4), -1);
    assert_eq!(aln.direction_at(9, 9), None);
    assert_eq!(aln.direction_at(0, 0), Some(Direction::Bound));
}

#[test]
fn cigar_rejects_paths_outside_the_matrix() {
    let aln = local(b"ACGT", b"ACGT");
    assert!(aln.to_cigar(&[(0, 1), (1, 2)]).is_empty());
    assert!(aln.to_cigar(&[(1, 1), (9, 9)]).is_empty());
    assert!(aln.to_cigar(&[]).is_empty());
}

#[test]
fn refilling_replaces_the_matrix() {
    let mut aln = local(b"ACGT", b"ACGT");
    aln.fill_matrix(b"ACGTACGT", b"TTACGT");
    assert_eq!(aln.rows(), 9);
    assert_eq!(aln.cols(), 7);
    assert_eq!(aln.score(), 10);
    assert_eq!(aln.cigar().to_string(), "1S5M");
}

#[test]
fn debug_dumps_have_one_line_per_row() {
    let aln = local(b"AC", b"AC");
    assert_eq!(aln.format_scores().lines().count(), 3);
    assert_eq!(aln.format_directions().lines().next(), Some("***"));
    assert_eq!(aln.format_directions().lines().nth(2), Some("*-\\"));
}

#[test]
fn query_window_helpers() {
    let path = vec![(1, 0), (2, 1), (3, 2), (4, 3)];
    assert_eq!(query_start(&path), 1);
    assert_eq!(query_end(&path), Some(2));

    // Trailing deletions share the last query column.
    let path = vec![(1, 1), (2, 2), (3, 2), (4, 2)];
    assert_eq!(query_end(&path), Some(0));

    let path = vec![(1, 1), (2, 1)];
    assert_eq!(query_end(&path), None);
    assert_eq!(query_end(&[]), None);
    assert_eq!(query_start(&[]), 0);
}

proptest! {
    #[test]
    fn local_scores_are_never_negative(subject in dna(0..30), query in dna(0..30)) {
        let aln = local(&subject, &query);
        let mut max = 0;
        for i in 0..aln.rows() {
            for j in 0..aln.cols() {
                let cell = aln.score_at(i, j);
                prop_assert!(cell >= 0, "negative cell at ({}, {})", i, j);
                max = max.max(cell);
            }
        }
        prop_assert_eq!(aln.score(), max);
    }

    #[test]
    fn local_cigar_spans_query_and_path(subject in dna(1..30), query in dna(1..30)) {
        let aln = local(&subject, &query);
        let path = aln.path();
        prop_assume!(!path.is_empty());

        let cigar = aln.cigar();
        prop_assert_eq!(cigar.query_len() as usize, query.len());

        let first = path[0].0;
        let last = path[path.len() - 1].0;
        let consumed = cigar.reference_len();
        prop_assert_eq!(consumed as usize, last - first + 1);
    }

    #[test]
    fn levenshtein_identity_and_symmetry(a in dna(0..25), b in dna(0..25)) {
        prop_assert_eq!(Alignment::levenshtein(&a, &a).distance(), 0);
        prop_assert_eq!(Alignment::levenshtein(&a, b"").distance(), a.len() as i32);
        prop_assert_eq!(
            Alignment::levenshtein(&a, &b).distance(),
            Alignment::levenshtein(&b, &a).distance()
        );
    }

    #[test]
    fn global_end_point_is_bottom_right(subject in dna(0..20), query in dna(0..20)) {
        let aln = Alignment::needleman_wunsch(AlignmentScore::default(), -1, &subject, &query);
        prop_assert_eq!(aln.end_point(), (subject.len(), query.len()));
    }
}
