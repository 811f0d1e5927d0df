#![allow(unused_imports, unused_mut)]

#[macro_use]
extern crate approx;
extern crate whimbrel;

use whimbrel::compare::{
    compare_block, compare_variant_tables, complement, compute_matching_genotype_pos,
    compute_switch_errors_poly, compute_switch_flips, compute_switch_flips_poly, hamming,
    switch_encoding,
};
use whimbrel::error::PhasingError;
use whimbrel::model::genotype::Genotype;
use whimbrel::model::variant::{Phase, Variant, VariantTable};

fn phasing(bits: &str) -> Vec<u8> {
    bits.bytes().map(|b| b - b'0').collect()
}

#[test]
fn test_complement_and_hamming() {
    assert_eq!(complement(&phasing("01100")), phasing("10011"));
    assert_eq!(hamming(&phasing("0101"), &phasing("0101")), 0);
    assert_eq!(hamming(&phasing("0101"), &phasing("1010")), 4);
    // hamming(a, b) + hamming(complement(a), b) covers every position
    let a = phasing("011010");
    let b = phasing("110001");
    assert_eq!(hamming(&a, &b) + hamming(&complement(&a), &b), a.len());
}

#[test]
fn test_switch_encoding() {
    assert_eq!(switch_encoding(&phasing("0001011")), phasing("001110"));
    assert_eq!(switch_encoding(&phasing("0101")), phasing("111"));
    assert_eq!(switch_encoding(&phasing("0110")), phasing("101"));
    // one entry shorter than the input, always
    for p in ["01", "0110", "000111000"] {
        assert_eq!(switch_encoding(&phasing(p)).len(), p.len() - 1);
    }
}

#[test]
fn test_diploid_switch_error() {
    let p0 = phasing("0101");
    let p1 = phasing("0110");
    let switches = hamming(&switch_encoding(&p0), &switch_encoding(&p1));
    assert_eq!(switches, 1);
    let switch_flips = compute_switch_flips(&p0, &p1);
    assert_relative_eq!(switch_flips.switches, 1.0);
    assert_relative_eq!(switch_flips.flips, 0.0);
}

#[test]
fn test_switch_flip_runs_decompose() {
    // two adjacent switch disagreements collapse into one flip
    let p0 = phasing("00000");
    let p1 = phasing("00100");
    let result = compute_switch_flips(&p0, &p1);
    assert_relative_eq!(result.switches, 0.0);
    assert_relative_eq!(result.flips, 1.0);

    // a run of three gives one flip plus one switch
    let p0 = phasing("000000");
    let p1 = phasing("001011");
    let s0 = switch_encoding(&p0);
    let s1 = switch_encoding(&p1);
    assert_eq!(hamming(&s0, &s1), 3);
    let result = compute_switch_flips(&p0, &p1);
    assert_relative_eq!(result.switches, 1.0);
    assert_relative_eq!(result.flips, 1.0);
}

#[test]
fn test_compare_block_diploid() {
    let phasing0 = vec![phasing("0101"), phasing("1010")];
    let phasing1 = vec![phasing("0110"), phasing("1001")];
    let errors = compare_block(&phasing0, &phasing1);
    assert_relative_eq!(errors.switches, 1.0);
    assert_relative_eq!(errors.switch_flips.switches, 1.0);
    assert_relative_eq!(errors.switch_flips.flips, 0.0);
    assert_relative_eq!(errors.hamming, 2.0);
    assert_eq!(errors.diff_genotypes, 0);
}

#[test]
fn test_compare_block_identity_is_zero() {
    let phasing0 = vec![phasing("010011"), phasing("101100")];
    let errors = compare_block(&phasing0, &phasing0);
    assert_relative_eq!(errors.switches, 0.0);
    assert_relative_eq!(errors.hamming, 0.0);
    assert_relative_eq!(errors.switch_flips.switches, 0.0);
    assert_relative_eq!(errors.switch_flips.flips, 0.0);
}

#[test]
fn test_compare_block_complement_is_zero_error() {
    // relabelling the haplotypes is not an error
    let phasing0 = vec![phasing("0101"), phasing("1010")];
    let phasing1 = vec![phasing("1010"), phasing("0101")];
    let errors = compare_block(&phasing0, &phasing1);
    assert_relative_eq!(errors.switches, 0.0);
    assert_relative_eq!(errors.hamming, 0.0);
}

#[test]
fn test_matching_genotype_positions() {
    let phasing0 = vec![phasing("0011"), phasing("0110")];
    let phasing1 = vec![phasing("0011"), phasing("1110")];
    // column 0: {0,0} vs {0,1} differ; columns 1..3 agree
    assert_eq!(compute_matching_genotype_pos(&phasing0, &phasing1), vec![1, 2, 3]);
}

#[test]
fn test_polyploid_single_column_label_swap() {
    // tetraploid, four columns; phasing1 swaps labels 2 and 3 at column 2
    let phasing0 = vec![
        phasing("0000"),
        phasing("1111"),
        phasing("0101"),
        phasing("1010"),
    ];
    let mut phasing1 = phasing0.clone();
    phasing1[2][2] = phasing0[3][2];
    phasing1[3][2] = phasing0[2][2];

    let matching = compute_matching_genotype_pos(&phasing0, &phasing1);
    assert_eq!(matching.len(), 4);

    // under pure switch counting the swap costs one (ploidy-averaged) switch
    let switches = compute_switch_errors_poly(&phasing0, &phasing1, &matching);
    assert_relative_eq!(switches, 1.0);

    // with both costs at one, two flips are cheaper than four switches
    let both = compute_switch_flips_poly(&phasing0, &phasing1, 1.0, 1.0);
    assert_relative_eq!(both.switches, 0.0);
    assert_relative_eq!(both.flips, 0.5);
}

#[test]
fn test_polyploid_identity() {
    let phasing0 = vec![phasing("0011"), phasing("1100"), phasing("0101")];
    let result = compute_switch_flips_poly(&phasing0, &phasing0, 1.0, 1.0);
    assert_relative_eq!(result.switches, 0.0);
    assert_relative_eq!(result.flips, 0.0);
}

fn phased_table(sample: &str, positions: &[i64], haplotype0: &[u8], block_id: i64) -> VariantTable {
    let mut table = VariantTable::new("chr1", &[sample]);
    for (i, &position) in positions.iter().enumerate() {
        table
            .add_variant(
                Variant::snv(position, b'A', b'G'),
                vec![Genotype::diploid(0, 1)],
                vec![None],
            )
            .unwrap();
        table.set_phase(
            0,
            i,
            Phase::new(block_id, vec![haplotype0[i], 1 - haplotype0[i]]),
        );
    }
    table
}

#[test]
fn test_compare_variant_tables_end_to_end() {
    let positions = vec![100, 200, 300, 400];
    let table0 = phased_table("sampleA", &positions, &phasing("0101"), 100);
    let table1 = phased_table("sampleA", &positions, &phasing("0110"), 100);

    let results = compare_variant_tables(&table0, &table1, "sampleA", 2).unwrap();
    assert_eq!(results.intersection_blocks, 1);
    assert_eq!(results.covered_variants, 4);
    assert_eq!(results.all_assessed_pairs, 3);
    assert_relative_eq!(results.all_switches, 1.0);
    assert_relative_eq!(results.all_switch_flips.switches, 1.0);
    assert_relative_eq!(results.all_switch_flips.flips, 0.0);
    assert_eq!(results.blockwise_diff_genotypes, 0);
}

#[test]
fn test_compare_is_commutative_and_reflexive() {
    let positions = vec![100, 200, 300, 400, 500];
    let table0 = phased_table("sampleA", &positions, &phasing("01011"), 100);
    let table1 = phased_table("sampleA", &positions, &phasing("01101"), 100);

    let forward = compare_variant_tables(&table0, &table1, "sampleA", 2).unwrap();
    let backward = compare_variant_tables(&table1, &table0, "sampleA", 2).unwrap();
    assert_relative_eq!(forward.all_switches, backward.all_switches);

    let same = compare_variant_tables(&table0, &table0, "sampleA", 2).unwrap();
    assert_relative_eq!(same.all_switches, 0.0);
    assert_relative_eq!(same.blockwise_hamming, 0.0);
    assert_eq!(same.blockwise_diff_genotypes, 0);
}

#[test]
fn test_compare_errors() {
    let table0 = phased_table("sampleA", &[100, 200], &phasing("01"), 100);
    let mut other_chromosome = phased_table("sampleA", &[100, 200], &phasing("01"), 100);
    other_chromosome.chromosome = "chr2".to_owned();
    match compare_variant_tables(&table0, &other_chromosome, "sampleA", 2) {
        Err(PhasingError::ChromosomeMismatch { .. }) => {}
        other => panic!("expected ChromosomeMismatch, got {:?}", other),
    }

    let table1 = phased_table("sampleB", &[100, 200], &phasing("01"), 100);
    match compare_variant_tables(&table0, &table1, "sampleA", 2) {
        Err(PhasingError::NoCommonSample) => {}
        other => panic!("expected NoCommonSample, got {:?}", other),
    }

    match compare_variant_tables(&table0, &table0, "sampleA", 3) {
        Err(PhasingError::PloidyError { .. }) => {}
        other => panic!("expected PloidyError, got {:?}", other),
    }
}

#[test]
fn test_unphased_variants_split_joint_blocks() {
    let positions = vec![100, 200, 300, 400];
    let table0 = phased_table("sampleA", &positions, &phasing("0101"), 100);
    // second table phases the variants in two separate blocks
    let mut table1 = VariantTable::new("chr1", &["sampleA"]);
    for (i, &position) in positions.iter().enumerate() {
        table1
            .add_variant(
                Variant::snv(position, b'A', b'G'),
                vec![Genotype::diploid(0, 1)],
                vec![None],
            )
            .unwrap();
        let block_id = if i < 2 { 100 } else { 300 };
        let allele = [0u8, 1, 0, 1][i];
        table1.set_phase(0, i, Phase::new(block_id, vec![allele, 1 - allele]));
    }

    let results = compare_variant_tables(&table0, &table1, "sampleA", 2).unwrap();
    assert_eq!(results.intersection_blocks, 2);
    assert_eq!(results.covered_variants, 4);
    assert_eq!(results.all_assessed_pairs, 2);
    assert_relative_eq!(results.all_switches, 0.0);
}
