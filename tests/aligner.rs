use nimbus_rs::aligner::{near_amplicon_edge, seed_position_filter, solve_lambda, unmap_entry};
use nimbus_rs::read::reverse_complement;
use nimbus_rs::{
    AlignerConfig, AlignmentBuilder, AlignmentScore, AlnSet, Amplicon, AmpliconAligner,
    AmpliconIndex, Cigar, GenomicRegion, MappingQuality, Read, ReadPair, SamRecord,
};
use noodles::sam::alignment::record::cigar::op::Kind;
use std::sync::Arc;

const AMPLICON: &[u8] = b"ACGTTGCAAGGCTTACCGATGCATCGGATCCTAGGCATGC";

fn amplicon(chrom: &str, start: u32, forward: bool, seq: &[u8]) -> Amplicon {
    Amplicon::new(
        GenomicRegion::new(chrom, start, start + seq.len() as u32, forward),
        seq,
    )
}

fn index_of(amplicons: Vec<Amplicon>, k: usize) -> AmpliconIndex {
    let mut index = AmpliconIndex::new();
    for a in amplicons {
        index.add(a);
    }
    index.build(k);
    index
}

fn read(name: &str, seq: &[u8]) -> Read {
    let quality: Vec<u8> = (0..seq.len()).map(|i| b'A' + (i % 20) as u8).collect();
    Read::new(name, seq, quality)
}

/// Forward mate covers the first 30 bases, reverse mate the last 30.
fn spanning_pair() -> ReadPair {
    ReadPair::new(
        Some(read("pair1", &AMPLICON[..30])),
        Some(read("pair1", &reverse_complement(&AMPLICON[10..]))),
    )
}

fn placed(seq: &[u8], pos: u32) -> SamRecord {
    let mut record = SamRecord::mapped(read("r", seq), "chr1", pos, true);
    let mut cigar = Cigar::default();
    cigar.add_operation(seq.len() as u32, Kind::Match);
    record.set_cigar(cigar);
    record
}

#[test]
fn lambda_solves_the_nucleotide_equation() {
    let lambda = solve_lambda(2, -1, 0.001, 0.25);
    assert!((lambda - 0.264_160_156_25).abs() < 1e-9, "lambda = {lambda}");
    let sum = 0.0625 * 4.0 * (2.0 * lambda).exp() + 0.0625 * 12.0 * (-lambda).exp();
    assert!((sum - 1.0).abs() < 0.01, "sum = {sum}");
}

#[test]
fn mapping_quality_follows_bit_score() {
    let mq = MappingQuality::new(1000, std::f64::consts::LN_2);
    assert!((mq.bit_score(20) - (20.0 + 10f64.log2())).abs() < 1e-9);
    assert_eq!(mq.mapq(20, 100), 20);

    let mq = MappingQuality::from_scores(40, 2, -1);
    assert_eq!(mq.mapq(60, 30), 48);
}

#[test]
fn edge_margin_examples() {
    let amp = amplicon("chr1", 100, true, &[b'A'; 50]);
    assert!(near_amplicon_edge(&amp, 148, 160, 5));
    assert!(near_amplicon_edge(&amp, 97, 130, 5));
    assert!(!near_amplicon_edge(&amp, 200, 210, 5));
    assert!(!near_amplicon_edge(&amp, 120, 130, 5));
}

#[test]
fn seed_filter_keeps_records_touching_an_edge() {
    let mut entry = AlnSet::new(Arc::new(amplicon("chr1", 100, true, &[b'A'; 50])));
    entry.forward_record = Some(placed(&[b'A'; 12], 148));
    assert!(!seed_position_filter(&entry, 5));

    entry.forward_record = Some(placed(&[b'A'; 10], 200));
    assert!(seed_position_filter(&entry, 5));

    unmap_entry(&mut entry);
    let record = entry.forward_record.as_ref().unwrap();
    assert!(record.is_unmapped());
    assert_eq!(record.flags.bits(), 0x4 | 0x40);
    assert_eq!(record.tag("sp"), Some("chr1;200;10M"));
}

#[test]
fn seed_filter_unmaps_both_mates() {
    let mut entry = AlnSet::new(Arc::new(amplicon("chr1", 100, true, &[b'A'; 50])));
    entry.forward_record = Some(placed(&[b'A'; 10], 101));
    entry.reverse_record = Some(placed(&[b'A'; 10], 125));
    entry.link_mates();
    assert!(seed_position_filter(&entry, 5));

    unmap_entry(&mut entry);
    let f = entry.forward_record.as_ref().unwrap();
    let r = entry.reverse_record.as_ref().unwrap();
    assert_eq!(f.flags.bits(), 77);
    assert_eq!(r.flags.bits(), 141);
    assert_eq!(f.tag("sp"), Some("chr1;101;10M"));
    assert_eq!(r.tag("sp"), Some("chr1;125;10M"));
}

#[test]
fn aligns_spanning_pair() {
    let index = index_of(vec![amplicon("chr1", 1000, true, AMPLICON)], 7);
    let aligner = AmpliconAligner::new(&index, &AlignerConfig::default());
    let result = aligner.align(spanning_pair());

    assert_eq!(result.len(), 1);
    let records: Vec<&SamRecord> = result.records().collect();
    assert_eq!(records.len(), 2);

    let (f, r) = (records[0], records[1]);
    assert_eq!(f.flags.bits(), 99);
    assert_eq!(r.flags.bits(), 147);
    assert_eq!((f.pos(), r.pos()), (1001, 1011));
    assert_eq!((f.pnext(), r.pnext()), (1011, 1001));
    assert_eq!((f.tlen(), r.tlen()), (40, 40));
    assert_eq!(f.cigar().to_string(), "30M");
    assert_eq!(r.cigar().to_string(), "30M");
    assert_eq!(f.mapq(), 48);
    assert_eq!(r.sequence(), &AMPLICON[10..]);

    let line = f.to_string();
    let fields: Vec<&str> = line.split('\t').collect();
    assert_eq!(
        &fields[11..],
        &["am:Z:chr1:1000-1040(+)", "AS:i:60", "NM:i:0", "nh:i:1"]
    );
    assert_eq!(r.tag("NM"), Some("0"));
}

#[test]
fn reverse_strand_amplicon_flips_mates() {
    let index = index_of(vec![amplicon("chr1", 1000, false, AMPLICON)], 7);
    let aligner = AmpliconAligner::new(&index, &AlignerConfig::default());
    // Sequenced from the minus strand: the forward mate reads the reverse complement.
    let pair = ReadPair::new(
        Some(read("minus", &reverse_complement(&AMPLICON[10..]))),
        Some(read("minus", &AMPLICON[..30])),
    );
    let result = aligner.align(pair);
    let records: Vec<&SamRecord> = result.records().collect();
    assert_eq!(records.len(), 2);
    assert!(records[0].is_reverse());
    assert!(!records[1].is_reverse());
    assert_eq!(records[0].pos(), 1011);
    assert_eq!(records[1].pos(), 1001);
    assert_eq!(records[0].tlen(), 40);
}

#[test]
fn zero_margin_unmaps_interior_alignments() {
    let index = index_of(vec![amplicon("chr1", 1000, true, AMPLICON)], 7);
    let config = AlignerConfig {
        seed_margin: 0,
        ..AlignerConfig::default()
    };
    let aligner = AmpliconAligner::new(&index, &config);
    let result = aligner.align(spanning_pair());

    let records: Vec<&SamRecord> = result.records().collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].flags.bits(), 77);
    assert_eq!(records[1].flags.bits(), 141);
    assert_eq!(records[0].tag("sp"), Some("chr1;1001;30M"));
    assert_eq!(records[1].tag("sp"), Some("chr1;1011;30M"));
    assert_eq!(records[1].sequence(), reverse_complement(&AMPLICON[10..]).as_slice());

    let disabled = AlignerConfig {
        seed_margin: -1,
        ..config
    };
    let aligner = AmpliconAligner::new(&index, &disabled);
    let result = aligner.align(spanning_pair());
    assert!(result.records().all(|r| !r.is_unmapped()));
}

#[test]
fn candidate_ceiling_leaves_pair_unaligned() {
    let index = index_of(vec![amplicon("chr1", 1000, true, AMPLICON)], 7);
    let config = AlignerConfig {
        max_amplicons: 1,
        ..AlignerConfig::default()
    };
    let aligner = AmpliconAligner::new(&index, &config);
    let result = aligner.align(spanning_pair());
    assert!(result.is_empty());
    assert!(!result.has_records());

    let unmapped = result.unmapped_records();
    assert_eq!(unmapped.len(), 2);
    assert_eq!(unmapped[0].flags.bits(), 77);
    assert_eq!(unmapped[1].flags.bits(), 141);
    assert_eq!(unmapped[0].to_string().split('\t').nth(5), Some("*"));
}

#[test]
fn unpaired_forward_mate_is_aligned_alone() {
    let index = index_of(vec![amplicon("chr1", 1000, true, AMPLICON)], 7);
    let aligner = AmpliconAligner::new(&index, &AlignerConfig::default());
    let result = aligner.align(ReadPair::new(Some(read("solo", &AMPLICON[..30])), None));
    let records: Vec<&SamRecord> = result.records().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pos(), 1001);
    assert_eq!(records[0].flags.bits(), 0x2 | 0x40);
}

#[test]
fn best_candidate_wins_and_ties_go_first() {
    let pair = spanning_pair();
    let mut builder = AlignmentBuilder::new(pair.clone());
    builder.add(Arc::new(amplicon("chr1", 1000, true, AMPLICON)));
    builder.add(Arc::new(amplicon("chr2", 1000, true, AMPLICON)));
    builder.align(&AlignmentScore::default(), -1);
    assert_eq!(builder.best(), Some(0));

    let mut damaged = AMPLICON.to_vec();
    damaged[5] = b'A';
    let mut builder = AlignmentBuilder::new(pair);
    builder.add(Arc::new(amplicon("chr1", 1000, true, &damaged)));
    builder.add(Arc::new(amplicon("chr2", 1000, true, AMPLICON)));
    builder.align(&AlignmentScore::default(), -1);
    assert_eq!(builder.best(), Some(1));

    builder.create_record(1);
    assert!(!builder.entries[0].has_records());
    assert_eq!(builder.entries[1].forward_record.as_ref().unwrap().tag("nh"), Some("2"));
}

#[test]
fn secondary_reports_every_candidate() {
    let index = index_of(
        vec![
            amplicon("chr1", 1000, true, AMPLICON),
            amplicon("chr2", 1000, true, AMPLICON),
        ],
        7,
    );

    let aligner = AmpliconAligner::new(&index, &AlignerConfig::default());
    let result = aligner.align(spanning_pair());
    assert_eq!(result.records().count(), 2);
    assert!(result.records().all(|r| r.rname() == "chr1"));

    let config = AlignerConfig {
        report_secondary: true,
        ..AlignerConfig::default()
    };
    let aligner = AmpliconAligner::new(&index, &config);
    let result = aligner.align(spanning_pair());
    let records: Vec<&SamRecord> = result.records().collect();
    assert_eq!(records.len(), 4);
    assert_eq!(records[2].rname(), "chr2");
    assert!(records.iter().all(|r| r.tag("nh") == Some("2")));
}
