use std::collections::BTreeMap;

use itertools::Itertools;

use crate::reads::read::{Read, ReadSet};
use crate::selection::component_finder::ComponentFinder;

/// Error-aware merging of overlapping fragments into superreads. Two reads
/// merge when the likelihood ratio of "same haplotype" against "different
/// haplotypes" clears `positive_threshold`; a ratio below the reciprocal of
/// `negative_threshold` forbids any transitive merge through either read.
pub struct ReadMerger {
    error_rate: f64,
    max_error_rate: f64,
    positive_threshold: f64,
    negative_threshold: f64,
}

impl Default for ReadMerger {
    fn default() -> ReadMerger {
        ReadMerger {
            error_rate: 0.15,
            max_error_rate: 0.25,
            positive_threshold: 1e6,
            negative_threshold: 1e3,
        }
    }
}

impl ReadMerger {
    pub fn new(
        error_rate: f64,
        max_error_rate: f64,
        positive_threshold: f64,
        negative_threshold: f64,
    ) -> ReadMerger {
        ReadMerger {
            error_rate,
            max_error_rate,
            positive_threshold,
            negative_threshold,
        }
    }

    /// Cluster compatible reads and collapse every cluster into one read.
    /// Reads without a confident partner pass through unchanged.
    pub fn merge(&self, read_set: &ReadSet) -> ReadSet {
        let n = read_set.len();
        if n < 2 {
            return read_set.clone();
        }

        let mut finder = ComponentFinder::new((0..n as i64).collect::<Vec<_>>().as_slice());
        let mut forbidden = vec![false; n];

        // Mismatch probability when both observations sample the same
        // haplotype, against the coin flip of unrelated haplotypes.
        let p_mismatch_same = 2.0 * self.error_rate * (1.0 - self.error_rate);

        for (i, k) in (0..n).tuple_combinations::<(usize, usize)>() {
            let (agree, disagree) = overlap_counts(read_set.get(i), read_set.get(k));
            let shared = agree + disagree;
            if shared < 2 {
                continue;
            }
            let log_ratio = agree as f64 * ((1.0 - p_mismatch_same) / 0.5).ln()
                + disagree as f64 * (p_mismatch_same / 0.5).ln();
            if log_ratio <= -self.negative_threshold.ln() {
                forbidden[i] = true;
                forbidden[k] = true;
            } else if log_ratio >= self.positive_threshold.ln()
                && (disagree as f64) <= self.max_error_rate * shared as f64
                && !forbidden[i]
                && !forbidden[k]
            {
                finder.merge(i as i64, k as i64);
            }
        }

        let mut clusters: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for i in 0..n {
            clusters.entry(finder.find(i as i64)).or_default().push(i);
        }

        let mut merged = ReadSet::new();
        for (_, members) in clusters {
            if members.len() == 1 {
                merged.add(read_set.get(members[0]).clone());
            } else {
                debug!("merging {} overlapping fragments into a superread", members.len());
                merged.add(collapse(read_set, &members));
            }
        }
        merged.sort();
        merged
    }
}

fn overlap_counts(a: &Read, b: &Read) -> (usize, usize) {
    let mut agree = 0;
    let mut disagree = 0;
    for v in a.iter() {
        if let Some(other) = b.allele_at(v.position) {
            if other.allele == v.allele {
                agree += 1;
            } else {
                disagree += 1;
            }
        }
    }
    (agree, disagree)
}

/// Collapse a cluster into a single read. Agreeing observations sum their
/// qualities; conflicts resolve in favour of the highest total quality per
/// allele.
fn collapse(read_set: &ReadSet, members: &[usize]) -> Read {
    let first = read_set.get(members[0]);
    let mut result = Read::new(
        &first.name.to_string(),
        first.mapqs()[0],
        first.source_id,
        first.sample_id,
    );
    for &m in &members[1..] {
        for &mapq in read_set.get(m).mapqs() {
            result.add_mapq(mapq);
        }
    }

    // position -> per-allele accumulated quality
    let mut support: BTreeMap<i64, BTreeMap<u8, i32>> = BTreeMap::new();
    for &m in members {
        for v in read_set.get(m).iter() {
            *support
                .entry(v.position)
                .or_default()
                .entry(v.allele)
                .or_insert(0) += v.quality;
        }
    }
    for (position, alleles) in support {
        let (&best_allele, &best_quality) = alleles
            .iter()
            .max_by_key(|&(&allele, &quality)| (quality, std::cmp::Reverse(allele)))
            .unwrap();
        let opposition: i32 = alleles
            .iter()
            .filter(|(allele, _)| **allele != best_allele)
            .map(|(_, quality)| *quality)
            .sum();
        result.add_variant(position, best_allele, (best_quality - opposition).max(1));
    }
    result
}
