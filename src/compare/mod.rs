use std::collections::HashMap;
use std::ops::AddAssign;

use hashlink::LinkedHashMap;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde_derive::Serialize;

use crate::error::PhasingError;
use crate::model::genotype::Genotype;
use crate::model::variant::{Phase, VariantTable};

/// Switch/flip decomposition of the disagreement between two phasings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SwitchFlips {
    pub switches: f64,
    pub flips: f64,
}

impl AddAssign for SwitchFlips {
    fn add_assign(&mut self, other: SwitchFlips) {
        self.switches += other.switches;
        self.flips += other.flips;
    }
}

/// All error measures for one joint block.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PhasingErrors {
    pub switches: f64,
    pub hamming: f64,
    pub switch_flips: SwitchFlips,
    pub diff_genotypes: usize,
}

impl AddAssign for PhasingErrors {
    fn add_assign(&mut self, other: PhasingErrors) {
        self.switches += other.switches;
        self.hamming += other.hamming;
        self.switch_flips += other.switch_flips;
        self.diff_genotypes += other.diff_genotypes;
    }
}

/// Aggregate comparison of two phasings of one sample: totals over all joint
/// blocks plus the single largest joint block.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PairwiseComparisonResults {
    pub intersection_blocks: usize,
    pub covered_variants: usize,
    pub all_assessed_pairs: usize,
    pub all_switches: f64,
    pub all_switch_flips: SwitchFlips,
    pub blockwise_hamming: f64,
    pub blockwise_diff_genotypes: usize,
    pub largest_block_assessed_pairs: usize,
    pub largest_block_errors: PhasingErrors,
}

pub fn complement(phasing: &[u8]) -> Vec<u8> {
    phasing.iter().map(|&a| 1 - a).collect()
}

pub fn hamming(a: &[u8], b: &[u8]) -> usize {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count()
}

/// `switch_encoding(p)[i]` is 1 where `p` changes between positions i and
/// i+1; one entry shorter than the phasing itself.
pub fn switch_encoding(phasing: &[u8]) -> Vec<u8> {
    phasing
        .windows(2)
        .map(|w| if w[0] == w[1] { 0 } else { 1 })
        .collect()
}

/// Group consecutive switch-encoding disagreements: every complete pair is a
/// flip, a leftover single is a switch.
pub fn compute_switch_flips(phasing0: &[u8], phasing1: &[u8]) -> SwitchFlips {
    assert_eq!(phasing0.len(), phasing1.len());
    let s0 = switch_encoding(phasing0);
    let s1 = switch_encoding(phasing1);
    let mut result = SwitchFlips::default();
    let mut run = 0usize;
    for i in 0..s0.len() {
        if s0[i] != s1[i] {
            run += 1;
        }
        if i + 1 == s0.len() || s0[i] == s1[i] {
            result.flips += (run / 2) as f64;
            result.switches += (run % 2) as f64;
            run = 0;
        }
    }
    result
}

/// Positions where the two phasings imply the same genotype multiset.
pub fn compute_matching_genotype_pos(phasing0: &[Vec<u8>], phasing1: &[Vec<u8>]) -> Vec<usize> {
    assert_eq!(phasing0.len(), phasing1.len());
    let num_vars = phasing0[0].len();
    (0..num_vars)
        .filter(|&i| {
            let g0 = Genotype::new(phasing0.iter().map(|hap| hap[i]).collect());
            let g1 = Genotype::new(phasing1.iter().map(|hap| hap[i]).collect());
            g0 == g1
        })
        .collect()
}

fn poly_num_switches(perm0: &[usize], perm1: &[usize]) -> usize {
    perm0
        .iter()
        .zip(perm1.iter())
        .filter(|(a, b)| a != b)
        .count()
}

/// Pure switch error between two polyploid phasings: the flip cost is pushed
/// high enough that the optimum never flips, and genotype-mismatch columns
/// are excluded up front.
pub fn compute_switch_errors_poly(
    phasing0: &[Vec<u8>],
    phasing1: &[Vec<u8>],
    matching_pos: &[usize],
) -> f64 {
    let num_vars = phasing0[0].len();
    let ploidy = phasing0.len();
    let restrict = |phasing: &[Vec<u8>]| -> Vec<Vec<u8>> {
        phasing
            .iter()
            .map(|hap| matching_pos.iter().map(|&i| hap[i]).collect())
            .collect()
    };
    let vector_error = compute_switch_flips_poly(
        &restrict(phasing0),
        &restrict(phasing1),
        1.0,
        (2 * num_vars * ploidy + 1) as f64,
    );
    assert_eq!(vector_error.flips, 0.0);
    vector_error.switches
}

/// Permutation DP over joint columns: rows are the ploidy! ways of aligning
/// the two label sets, edges pay `switch_cost` per changed label, columns pay
/// `flip_cost` per disagreeing haplotype. Only entries within the best
/// column score plus the switch distance are retained, which cannot lose the
/// optimum. Counts are averaged over the ploidy.
pub fn compute_switch_flips_poly(
    phasing0: &[Vec<u8>],
    phasing1: &[Vec<u8>],
    switch_cost: f64,
    flip_cost: f64,
) -> SwitchFlips {
    assert_eq!(phasing0.len(), phasing1.len());
    let ploidy = phasing0.len();
    if ploidy == 0 {
        return SwitchFlips::default();
    }
    let num_pos = phasing0[0].len();
    if num_pos == 0 {
        return SwitchFlips::default();
    }
    for hap in phasing0.iter().chain(phasing1.iter()) {
        assert_eq!(hap.len(), num_pos, "phasing haplotype lengths differ");
    }
    if ploidy > 6 {
        warn!("computing vector error with more than 6 haplotypes; this may take very long");
    }

    let perms: Vec<Vec<usize>> = (0..ploidy).permutations(ploidy).collect();

    let flips_in_column = |perm: &[usize], column: usize| -> usize {
        (0..ploidy)
            .filter(|&k| phasing1[k][column] != phasing0[perm[k]][column])
            .count()
    };

    // per column: perm index -> (score, raw switches, raw flips, predecessor)
    let mut table: Vec<HashMap<usize, (f64, usize, usize, usize)>> = Vec::with_capacity(num_pos);

    let mut first = HashMap::new();
    let mut best_score = f64::INFINITY;
    let mut best_perm = 0;
    let scores: Vec<f64> = perms
        .iter()
        .map(|perm| flips_in_column(perm, 0) as f64 * flip_cost)
        .collect();
    for (i, &score) in scores.iter().enumerate() {
        if score < best_score {
            best_score = score;
            best_perm = i;
        }
    }
    for (i, &score) in scores.iter().enumerate() {
        let margin = best_score + poly_num_switches(&perms[best_perm], &perms[i]) as f64 * switch_cost;
        if i == best_perm || score < margin {
            first.insert(i, (score, 0, flips_in_column(&perms[i], 0), usize::MAX));
        }
    }
    table.push(first);

    for column in 1..num_pos {
        let mut current: Vec<(usize, (f64, usize, usize, usize))> = Vec::new();
        let mut best_score = f64::INFINITY;
        let mut best_perm = 0;
        for (i, perm) in perms.iter().enumerate() {
            let flips = flips_in_column(perm, column);
            let previous = &table[column - 1];
            let chosen = previous
                .iter()
                .min_by_key(|(&pred, &(score, _, _, _))| {
                    (
                        OrderedFloat(
                            score + switch_cost * poly_num_switches(perm, &perms[pred]) as f64,
                        ),
                        pred,
                    )
                })
                .map(|(&pred, _)| pred)
                .expect("previous column never empties");
            let (_, pred_switches, pred_flips, _) = previous[&chosen];
            let switches = pred_switches + poly_num_switches(perm, &perms[chosen]);
            let flips_total = pred_flips + flips;
            let score = switch_cost * switches as f64 + flip_cost * flips_total as f64;
            if score < best_score {
                best_score = score;
                best_perm = i;
            }
            current.push((i, (score, switches, flips_total, chosen)));
        }
        let mut kept = HashMap::new();
        for (i, entry) in current {
            let margin =
                best_score + poly_num_switches(&perms[best_perm], &perms[i]) as f64 * switch_cost;
            if i == best_perm || entry.0 < margin {
                kept.insert(i, entry);
            }
        }
        table.push(kept);
    }

    let (_, &(_, switches, flips, _)) = table[num_pos - 1]
        .iter()
        .min_by_key(|(&perm, &(score, _, _, _))| (OrderedFloat(score), perm))
        .expect("final column never empties");

    SwitchFlips {
        switches: switches as f64 / ploidy as f64,
        flips: flips as f64 / ploidy as f64,
    }
}

/// Compare one joint block. Rows are haplotype allele sequences over the
/// block's variants.
pub fn compare_block(phasing0: &[Vec<u8>], phasing1: &[Vec<u8>]) -> PhasingErrors {
    assert_eq!(phasing0.len(), phasing1.len());
    let ploidy = phasing0.len();

    // hamming distance minimised over row permutations, averaged per ploidy
    let minimum_hamming: f64 = (0..ploidy)
        .permutations(ploidy)
        .map(|perm| {
            let total: usize = (0..ploidy)
                .map(|k| hamming(&phasing1[k], &phasing0[perm[k]]))
                .sum();
            OrderedFloat(total as f64 / ploidy as f64)
        })
        .min()
        .unwrap()
        .0;

    let matching_pos = compute_matching_genotype_pos(phasing0, phasing1);

    let (switches, switch_flips) = if ploidy == 2 {
        (
            hamming(
                &switch_encoding(&phasing0[0]),
                &switch_encoding(&phasing1[0]),
            ) as f64,
            compute_switch_flips(&phasing0[0], &phasing1[0]),
        )
    } else {
        (
            compute_switch_errors_poly(phasing0, phasing1, &matching_pos),
            compute_switch_flips_poly(phasing0, phasing1, 1.0, 1.0),
        )
    };

    PhasingErrors {
        switches,
        hamming: minimum_hamming,
        switch_flips,
        diff_genotypes: phasing0[0].len() - matching_pos.len(),
    }
}

/// Compare the phases of one sample between two variant tables of the same
/// chromosome, over the heterozygous variants common to both.
pub fn compare_variant_tables(
    table0: &VariantTable,
    table1: &VariantTable,
    sample: &str,
    ploidy: usize,
) -> Result<PairwiseComparisonResults, PhasingError> {
    if table0.chromosome != table1.chromosome {
        return Err(PhasingError::ChromosomeMismatch {
            chromosome_a: table0.chromosome.clone(),
            chromosome_b: table1.chromosome.clone(),
        });
    }
    let sample0 = table0.sample_index(sample);
    let sample1 = table1.sample_index(sample);
    let (sample0, sample1) = match (sample0, sample1) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(PhasingError::NoCommonSample),
    };

    for (table, sample_index) in [(table0, sample0), (table1, sample1)] {
        for phase in table.phases_of(sample_index).iter().flatten() {
            if phase.haplotype.len() != ploidy {
                return Err(PhasingError::PloidyError {
                    sample: sample.to_owned(),
                    observed: phase.haplotype.len(),
                    declared: ploidy,
                });
            }
        }
    }

    // common heterozygous variants, in position order
    let het_positions = |table: &VariantTable, sample_index: usize| -> Vec<i64> {
        table
            .variants()
            .iter()
            .zip(table.genotypes_of(sample_index).iter())
            .filter(|(_, genotype)| genotype.is_heterozygous())
            .map(|(variant, _)| variant.position)
            .collect()
    };
    let het0 = het_positions(table0, sample0);
    let het1: std::collections::HashSet<i64> = het_positions(table1, sample1).into_iter().collect();
    let common: Vec<i64> = het0.into_iter().filter(|p| het1.contains(p)).collect();

    fn phase_at(table: &VariantTable, sample_index: usize, position: i64) -> Option<&Phase> {
        table
            .variants()
            .iter()
            .position(|v| v.position == position)
            .and_then(|i| table.phases_of(sample_index)[i].as_ref())
    }

    // joint blocks: variants phased in both tables, keyed by the block pair
    let mut block_intersection: LinkedHashMap<(i64, i64), Vec<i64>> = LinkedHashMap::new();
    for &position in &common {
        if let (Some(p0), Some(p1)) = (
            phase_at(table0, sample0, position),
            phase_at(table1, sample1, position),
        ) {
            block_intersection
                .entry((p0.block_id, p1.block_id))
                .or_insert_with(Vec::new)
                .push(position);
        }
    }

    let mut results = PairwiseComparisonResults::default();
    let mut total_errors = PhasingErrors::default();
    let mut longest: usize = 0;

    for block in block_intersection.values() {
        if block.len() < 2 {
            continue;
        }
        let gather = |table: &VariantTable, sample_index: usize| -> Vec<Vec<u8>> {
            (0..ploidy)
                .map(|haplotype| {
                    block
                        .iter()
                        .map(|&position| {
                            phase_at(table, sample_index, position).unwrap().haplotype[haplotype]
                        })
                        .collect()
                })
                .collect()
        };
        let phasing0 = gather(table0, sample0);
        let phasing1 = gather(table1, sample1);
        let errors = compare_block(&phasing0, &phasing1);

        results.intersection_blocks += 1;
        results.covered_variants += block.len();
        results.all_assessed_pairs += block.len() - 1;
        total_errors += errors.clone();

        if block.len() > longest {
            longest = block.len();
            results.largest_block_assessed_pairs = block.len() - 1;
            results.largest_block_errors = errors;
        }
    }

    results.all_switches = total_errors.switches;
    results.all_switch_flips = total_errors.switch_flips;
    results.blockwise_hamming = total_errors.hamming;
    results.blockwise_diff_genotypes = total_errors.diff_genotypes;
    Ok(results)
}
