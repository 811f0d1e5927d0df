use std::collections::HashMap;

use crate::model::variant::VariantTable;
use crate::reads::read::{Read, ReadSet};

/// Haplotype assignment for one read, handed to external sinks (BAM tag
/// writers, split tools). `haplotype` is `None` when the read is uninformative
/// or ties between haplotypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTag {
    pub haplotype: Option<u8>,
    pub phase_set: Option<i64>,
    pub score: u32,
}

impl ReadTag {
    pub fn untagged() -> ReadTag {
        ReadTag {
            haplotype: None,
            phase_set: None,
            score: 0,
        }
    }
}

/// Score one read against the phased haplotypes of a sample. The read is
/// compared within the phase set it overlaps most; the haplotype with the
/// smallest mismatch cost wins, and the score is its margin over the runner
/// up.
pub fn tag_read(read: &Read, table: &VariantTable, table_sample: usize, ploidy: usize) -> ReadTag {
    // phase-set id -> per-haplotype mismatch cost and covered count
    let mut costs: HashMap<i64, (Vec<u32>, usize)> = HashMap::new();
    for (variant, phase) in table
        .variants()
        .iter()
        .zip(table.phases_of(table_sample).iter())
    {
        let phase = match phase {
            Some(phase) => phase,
            None => continue,
        };
        let observation = match read.allele_at(variant.position) {
            Some(observation) => observation,
            None => continue,
        };
        let entry = costs
            .entry(phase.block_id)
            .or_insert_with(|| (vec![0; ploidy], 0));
        entry.1 += 1;
        for haplotype in 0..ploidy {
            if phase.haplotype[haplotype] != observation.allele {
                entry.0[haplotype] =
                    entry.0[haplotype].saturating_add(observation.quality.max(0) as u32);
            }
        }
    }

    // the block the read overlaps most; ties resolve to the smaller id
    let block = costs
        .iter()
        .max_by_key(|(block_id, (_, covered))| (*covered, std::cmp::Reverse(**block_id)))
        .map(|(block_id, _)| *block_id);
    let block_id = match block {
        Some(block_id) => block_id,
        None => return ReadTag::untagged(),
    };

    let haplotype_costs = &costs[&block_id].0;
    let mut order: Vec<usize> = (0..ploidy).collect();
    order.sort_by_key(|&h| (haplotype_costs[h], h));
    let best = order[0];
    let runner_up = order[1];
    if haplotype_costs[best] == haplotype_costs[runner_up] {
        return ReadTag::untagged();
    }
    ReadTag {
        haplotype: Some(best as u8),
        phase_set: Some(block_id),
        score: haplotype_costs[runner_up] - haplotype_costs[best],
    }
}

/// Tag every read of a set; order matches the read set.
pub fn tag_reads(
    read_set: &ReadSet,
    table: &VariantTable,
    table_sample: usize,
    ploidy: usize,
) -> Vec<ReadTag> {
    read_set
        .iter()
        .map(|read| tag_read(read, table, table_sample, ploidy))
        .collect()
}
