use std::collections::HashMap;

use hashlink::LinkedHashMap;

use crate::model::variant::{Phase, PhasedBlock, VariantTable};
use crate::phasing::DpResult;
use crate::reads::read::ReadSet;
use crate::selection::component_finder::ComponentFinder;

/// Groups phased variants into blocks and writes phases back into the
/// variant table. Blocks are connected components over the positions carried
/// by the selected reads, plus any extra merges (phased-block constraints,
/// genetic-haplotyping master edges); the block id is the component's
/// leftmost position.
pub struct BlockAssembler {}

impl BlockAssembler {
    /// Map each phaseable position to its block id. Positions covered by no
    /// selected read and no extra merge are absent: they stay unphased.
    pub fn compute_components(
        positions: &[i64],
        selected_reads: &ReadSet,
        extra_merges: &[(i64, i64)],
    ) -> HashMap<i64, i64> {
        let mut finder = ComponentFinder::new(positions);
        let mut phaseable: Vec<i64> = Vec::new();

        for read in selected_reads.iter() {
            let covered: Vec<i64> = read
                .iter()
                .map(|v| v.position)
                .filter(|p| finder.contains(*p))
                .collect();
            for &position in &covered {
                phaseable.push(position);
            }
            for &position in covered.iter().skip(1) {
                finder.merge(covered[0], position);
            }
        }
        for &(a, b) in extra_merges {
            if finder.contains(a) && finder.contains(b) {
                finder.merge(a, b);
                phaseable.push(a);
                phaseable.push(b);
            }
        }

        phaseable.sort_unstable();
        phaseable.dedup();
        phaseable
            .into_iter()
            .map(|position| (position, finder.find(position)))
            .collect()
    }

    /// Write the DP's haplotype tuples into the table for one sample. Only
    /// heterozygous variants inside a component receive a phase. Returns the
    /// number of variants phased.
    pub fn assign_phases(
        table: &mut VariantTable,
        table_sample: usize,
        dp_result: &DpResult,
        dp_sample: usize,
        components: &HashMap<i64, i64>,
    ) -> usize {
        let variant_index_of: HashMap<i64, usize> = table
            .variants()
            .iter()
            .enumerate()
            .map(|(i, v)| (v.position, i))
            .collect();
        let mut phased = 0;
        for (column, &position) in dp_result.positions.iter().enumerate() {
            let block_id = match components.get(&position) {
                Some(&block_id) => block_id,
                None => continue,
            };
            let genotype = &dp_result.genotypes[dp_sample][column];
            if genotype.is_homozygous() {
                continue;
            }
            let variant_index = variant_index_of[&position];
            let tuple = dp_result.haplotypes[dp_sample][column].clone();
            table.set_phase(table_sample, variant_index, Phase::new(block_id, tuple));
            phased += 1;
        }
        phased
    }

    /// Collect the phased blocks of one sample in variant order, singletons
    /// included.
    pub fn build_blocks(table: &VariantTable, table_sample: usize) -> Vec<PhasedBlock> {
        let mut blocks: LinkedHashMap<i64, PhasedBlock> = LinkedHashMap::new();
        for (variant, phase) in table
            .variants()
            .iter()
            .zip(table.phases_of(table_sample).iter())
        {
            let phase = match phase {
                Some(phase) => phase,
                None => continue,
            };
            match blocks.get_mut(&phase.block_id) {
                Some(block) => block.push(variant, phase.clone()),
                None => {
                    blocks.insert(
                        phase.block_id,
                        PhasedBlock::new(&table.chromosome, variant, phase.clone()),
                    );
                }
            }
        }
        blocks.into_iter().map(|(_, block)| block).collect()
    }
}
