#![allow(unused_imports, unused_mut)]

extern crate rust_htslib;
extern crate whimbrel;

use rust_htslib::bam::record::Cigar;

use whimbrel::model::variant::Variant;
use whimbrel::reads::aligned_read::{cigar_from_raw, AlignedRead, FLAG_SUPPLEMENTARY};
use whimbrel::reads::allele_detector::{merge_pair, AlleleDetector, DEFAULT_QUALITY};
use whimbrel::reads::read::Read;

fn detector() -> AlleleDetector {
    AlleleDetector::new(20)
}

#[test]
fn test_snv_detection_in_match_region() {
    let variants = vec![
        Variant::snv(100, b'A', b'G'),
        Variant::snv(105, b'C', b'T'),
    ];
    let mut read = AlignedRead::new("read1", 60, 98, vec![Cigar::Match(10)], b"AAGATTACCC");
    // offsets: position 100 -> query 2 ('G' = alt), position 105 -> query 7 ('C' = ref)
    read.base_qualities = Some(vec![40; 10]);
    let alleles = detector().detect_alleles(&variants, 0, &read).unwrap();
    assert_eq!(alleles, vec![(100, 1, 40), (105, 0, 40)]);
}

#[test]
fn test_snv_neither_allele_is_skipped() {
    let variants = vec![Variant::snv(100, b'A', b'G')];
    let read = AlignedRead::new("read1", 60, 100, vec![Cigar::Match(1)], b"T");
    let alleles = detector().detect_alleles(&variants, 0, &read).unwrap();
    assert!(alleles.is_empty());
}

#[test]
fn test_missing_base_qualities_use_default() {
    let variants = vec![Variant::snv(100, b'A', b'G')];
    let read = AlignedRead::new("read1", 60, 100, vec![Cigar::Match(1)], b"G");
    let alleles = detector().detect_alleles(&variants, 0, &read).unwrap();
    assert_eq!(alleles, vec![(100, 1, DEFAULT_QUALITY)]);
}

#[test]
fn test_insertion_observed_and_unobserved() {
    let variants = vec![Variant::new(102, b"", b"TT")];

    // insertion present in the read
    let with_insertion =
        AlignedRead::new("read1", 60, 98, vec![Cigar::Match(4), Cigar::Ins(2), Cigar::Match(4)], b"AAGATTACCC");
    let alleles = detector().detect_alleles(&variants, 0, &with_insertion).unwrap();
    assert_eq!(alleles, vec![(102, 1, DEFAULT_QUALITY)]);

    // plain match region: the insertion did not occur
    let without = AlignedRead::new("read2", 60, 98, vec![Cigar::Match(8)], b"AAGAACCC");
    let alleles = detector().detect_alleles(&variants, 0, &without).unwrap();
    assert_eq!(alleles, vec![(102, 0, DEFAULT_QUALITY)]);
}

#[test]
fn test_deletion_observed_and_unobserved() {
    let variants = vec![Variant::new(200, b"AC", b"")];

    let with_deletion = AlignedRead::new(
        "read1",
        60,
        198,
        vec![Cigar::Match(2), Cigar::Del(2), Cigar::Match(2)],
        b"GGTT",
    );
    let alleles = detector().detect_alleles(&variants, 0, &with_deletion).unwrap();
    assert_eq!(alleles, vec![(200, 1, DEFAULT_QUALITY)]);

    let without = AlignedRead::new("read2", 60, 198, vec![Cigar::Match(6)], b"GGACTT");
    let alleles = detector().detect_alleles(&variants, 0, &without).unwrap();
    assert_eq!(alleles, vec![(200, 0, DEFAULT_QUALITY)]);
}

#[test]
fn test_deletion_overlapping_variant_is_skipped() {
    // the deletion at 200 spans positions 200..203 and swallows the SNV at 201
    let variants = vec![Variant::new(200, b"ACG", b""), Variant::snv(201, b'C', b'T')];
    let read = AlignedRead::new("read1", 60, 198, vec![Cigar::Match(8)], b"GGACGTTA");
    let alleles = detector().detect_alleles(&variants, 0, &read).unwrap();
    assert!(alleles.is_empty());
}

#[test]
fn test_reference_skip_and_clips_advance_cursors() {
    let variants = vec![Variant::snv(100, b'A', b'G'), Variant::snv(210, b'C', b'T')];
    let read = AlignedRead::new(
        "read1",
        60,
        100,
        vec![
            Cigar::SoftClip(3),
            Cigar::Match(5),
            Cigar::RefSkip(100),
            Cigar::Match(5),
            Cigar::HardClip(10),
        ],
        b"NNNGAAAATTTTC",
    );
    // query: soft clip 3, match 100..105 starts at query 3 ('G'), skip to 205,
    // match 205..210 ends before 210? no: covers 205..209; move variant
    let alleles = detector().detect_alleles(&variants, 0, &read).unwrap();
    assert_eq!(alleles, vec![(100, 1, DEFAULT_QUALITY)]);
}

#[test]
fn test_position_emitted_at_most_once() {
    // an insertion variant colliding with an SNV position: the first call wins
    let variants = vec![Variant::snv(100, b'A', b'G')];
    let read = AlignedRead::new("read1", 60, 96, vec![Cigar::Match(8)], b"AAAAGAAA");
    let alleles = detector().detect_alleles(&variants, 0, &read).unwrap();
    assert_eq!(alleles.len(), 1);
}

#[test]
fn test_unknown_operator_code_rejected() {
    assert!(cigar_from_raw(&[(0, 5)]).is_ok());
    assert!(cigar_from_raw(&[(11, 5)]).is_err());
}

#[test]
fn test_read_filters_applied_in_build() {
    let variants = vec![Variant::snv(100, b'A', b'G'), Variant::snv(110, b'C', b'T')];
    let mut accepted = AlignedRead::new("keep", 60, 95, vec![Cigar::Match(20)], b"AAAAAGAAAAAAAAATAAAA");
    let mut low_mapq = accepted.clone();
    low_mapq.name = "lowmapq".into();
    low_mapq.mapq = 5;
    let mut supplementary = accepted.clone();
    supplementary.name = "supp".into();
    supplementary.flags = FLAG_SUPPLEMENTARY;

    let read_set = detector()
        .build_read_set(&variants, &[accepted, low_mapq, supplementary], 0, 0)
        .unwrap();
    assert_eq!(read_set.len(), 1);
    assert_eq!(read_set.get(0).name, "keep");
    assert_eq!(read_set.get(0).len(), 2);
}

#[test]
fn test_name_seen_three_times_rejected() {
    let variants = vec![Variant::snv(100, b'A', b'G')];
    let alignment = AlignedRead::new("dup", 60, 100, vec![Cigar::Match(1)], b"G");
    let result = detector().build_read_set(
        &variants,
        &[alignment.clone(), alignment.clone(), alignment],
        0,
        0,
    );
    assert!(result.is_err());
}

#[test]
fn test_pair_merge_agreement_sums_quality() {
    let mut read1 = Read::new("frag", 60, 0, 0);
    read1.add_variant(100, 0, 20);
    read1.add_variant(200, 1, 30);
    let mut read2 = Read::new("frag", 60, 0, 0);
    read2.add_variant(200, 1, 25);
    read2.add_variant(300, 0, 15);

    let merged = merge_pair(&read1, &read2);
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.variant(0).position, 100);
    assert_eq!(merged.variant(1).allele, 1);
    assert_eq!(merged.variant(1).quality, 55);
    assert_eq!(merged.variant(2).position, 300);
    assert_eq!(merged.mapqs().len(), 2);
}

#[test]
fn test_pair_merge_conflict_keeps_higher_quality() {
    let mut read1 = Read::new("frag", 60, 0, 0);
    read1.add_variant(100, 0, 10);
    let mut read2 = Read::new("frag", 60, 0, 0);
    read2.add_variant(100, 1, 50);

    let merged = merge_pair(&read1, &read2);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.variant(0).allele, 1);
    assert_eq!(merged.variant(0).quality, 50);
}

#[test]
fn test_merge_then_detect_round_trip() {
    // a fragment split into two mates re-detects the original allele list
    let variants = vec![
        Variant::snv(100, b'A', b'G'),
        Variant::snv(110, b'C', b'T'),
        Variant::snv(120, b'A', b'C'),
    ];
    let mut mate1 = AlignedRead::new("frag", 60, 98, vec![Cigar::Match(15)], b"AAGAAAAAAAAATAA");
    let mut mate2 = AlignedRead::new("frag", 60, 115, vec![Cigar::Match(10)], b"AAAAACAAAA");
    let read_set = detector()
        .build_read_set(&variants, &[mate1, mate2], 0, 0)
        .unwrap();
    assert_eq!(read_set.len(), 1);
    let merged = read_set.get(0);
    let observed: Vec<(i64, u8)> = merged.iter().map(|v| (v.position, v.allele)).collect();
    assert_eq!(observed, vec![(100, 1), (110, 1), (120, 1)]);
}
