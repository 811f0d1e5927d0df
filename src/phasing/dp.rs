use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::PhasingError;
use crate::model::genotype::Genotype;
use crate::pedigree::Pedigree;
use crate::phasing::pedigree_partitions::PedigreePartitions;
use crate::phasing::{add_costs, Cost, DpResult, DpStage, HaplotypeDp, INFINITE_COST};
use crate::reads::read::ReadSet;

/// Per-sample, per-column genotype alternatives: cost of phasing the column
/// with the given alt-allele count, or `None` when that genotype is not
/// allowed. Index 0/1/2 = hom-ref / het / hom-alt.
pub type AllowedGenotypes = Vec<Vec<[Option<Cost>; 3]>>;

/// One DP state: which haplotype each active read sits on, which grandparental
/// haplotypes each trio transmits, and the cheapest way to reach that
/// configuration.
#[derive(Debug, Clone, Copy)]
struct DpEntry {
    bipartition: u32,
    transmission: u16,
    /// allele chosen for each haplotype class, one bit per class
    assignment: u32,
    cost: Cost,
    predecessor: Option<u32>,
}

/// The diploid phasing DP. Columns are variant positions; a state is a
/// bipartition of the reads straddling the column plus a transmission vector
/// over the pedigree's trios. Costs accumulate read/haplotype mismatches,
/// genotype priors, and recombination charges on transmission-bit flips.
pub struct PedigreeDpTable {
    stage: DpStage,
    read_set: ReadSet,
    pedigree: Pedigree,
    positions: Vec<i64>,
    allowed: AllowedGenotypes,
    recombination_costs: Vec<Cost>,
    cancel: Option<Arc<AtomicBool>>,
    // built by build_tables
    partitions: Vec<PedigreePartitions>,
    transmission_count: usize,
    active: Vec<Vec<usize>>,
    observations: Vec<Vec<Option<(u8, Cost)>>>,
    // forward tables
    columns: Vec<Vec<DpEntry>>,
    result: Option<DpResult>,
}

impl PedigreeDpTable {
    pub fn new(
        read_set: ReadSet,
        pedigree: Pedigree,
        positions: Vec<i64>,
        allowed: AllowedGenotypes,
        recombination_costs: Vec<Cost>,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<PedigreeDpTable, PhasingError> {
        for (i, pair) in positions.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(PhasingError::invalid_input(
                    i + 1,
                    "DP column positions not strictly increasing",
                ));
            }
        }
        if recombination_costs.len() != positions.len() {
            return Err(PhasingError::invalid_input(
                0,
                "recombination cost map does not match the column count",
            ));
        }
        if allowed.len() != pedigree.sample_count() {
            return Err(PhasingError::invalid_input(
                0,
                "genotype priors do not match the pedigree sample count",
            ));
        }
        for per_sample in &allowed {
            if per_sample.len() != positions.len() {
                return Err(PhasingError::invalid_input(
                    0,
                    "genotype priors do not match the column count",
                ));
            }
        }
        for read in read_set.iter() {
            if read.sample_id >= pedigree.sample_count() {
                return Err(PhasingError::invalid_input(
                    0,
                    format!("read {} names an unknown sample", read.name),
                ));
            }
            for variant in read.iter() {
                if positions.binary_search(&variant.position).is_err() {
                    return Err(PhasingError::invalid_input(
                        0,
                        format!(
                            "read {} covers position {} outside the DP columns",
                            read.name, variant.position
                        ),
                    ));
                }
            }
        }
        Ok(PedigreeDpTable {
            stage: DpStage::Initialised,
            read_set,
            pedigree,
            positions,
            allowed,
            recombination_costs,
            cancel,
            partitions: Vec::new(),
            transmission_count: 0,
            active: Vec::new(),
            observations: Vec::new(),
            columns: Vec::new(),
            result: None,
        })
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    fn release_tables(&mut self) {
        self.columns = Vec::new();
        self.observations = Vec::new();
        self.active = Vec::new();
    }

    /// Minimal column cost over all allele-per-class assignments consistent
    /// with the allowed genotypes, given a bipartition and transmission.
    fn column_cost(&self, column: usize, bipartition: u32, transmission: usize) -> Option<(Cost, u32)> {
        let partitions = &self.partitions[transmission];
        let class_count = partitions.count();
        let mut best: Option<(Cost, u32)> = None;

        'assignments: for assignment in 0u32..(1 << class_count) {
            let mut cost: Cost = 0;
            for sample in 0..self.pedigree.sample_count() {
                let alt_count = ((assignment >> partitions.partition(sample, 0)) & 1)
                    + ((assignment >> partitions.partition(sample, 1)) & 1);
                match self.allowed[sample][column][alt_count as usize] {
                    Some(prior) => cost = add_costs(cost, prior),
                    None => continue 'assignments,
                }
            }
            for (slot, &read_index) in self.active[column].iter().enumerate() {
                if let Some((allele, quality)) = self.observations[column][slot] {
                    let side = ((bipartition >> slot) & 1) as usize;
                    let class = partitions.partition(self.read_set.get(read_index).sample_id, side);
                    let implied = ((assignment >> class) & 1) as u8;
                    if implied != allele {
                        cost = add_costs(cost, quality);
                    }
                }
            }
            if best.map_or(true, |(b, _)| cost < b) {
                best = Some((cost, assignment));
            }
        }
        best.filter(|&(cost, _)| cost < INFINITE_COST)
    }

    /// Drop transmission entries that a cheaper sibling state dominates: the
    /// sibling can always re-enact this state's future by paying the flip
    /// costs up front, so nothing optimal is lost.
    fn prune_column(entries: &mut Vec<DpEntry>, next_recombination: Cost) {
        if entries.is_empty() {
            return;
        }
        let mut groups: HashMap<u32, Vec<usize>> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            groups.entry(entry.bipartition).or_default().push(i);
        }
        let mut keep = vec![true; entries.len()];
        for group in groups.values() {
            for &candidate in group {
                for &other in group {
                    if candidate == other || !keep[other] {
                        continue;
                    }
                    let distance = (entries[candidate].transmission
                        ^ entries[other].transmission)
                        .count_ones();
                    let bound = add_costs(
                        entries[other].cost,
                        next_recombination.saturating_mul(distance),
                    );
                    if bound < entries[candidate].cost {
                        keep[candidate] = false;
                        break;
                    }
                }
            }
        }
        let mut index = 0;
        entries.retain(|_| {
            index += 1;
            keep[index - 1]
        });
    }
}

impl HaplotypeDp for PedigreeDpTable {
    fn build_tables(&mut self) -> Result<(), PhasingError> {
        assert_eq!(self.stage, DpStage::Initialised, "DP stage out of order");

        self.transmission_count = 1 << self.pedigree.transmission_bit_count();
        if self.transmission_count > u16::MAX as usize {
            return Err(PhasingError::unsupported(
                "too many trios for the transmission vector",
            ));
        }
        self.partitions = (0..self.transmission_count)
            .map(|t| PedigreePartitions::new(&self.pedigree, t))
            .collect();
        if self.partitions[0].count() > 24 {
            return Err(PhasingError::unsupported(
                "too many founder haplotypes for the allele assignment enumeration",
            ));
        }

        let column_count = self.positions.len();
        self.active = vec![Vec::new(); column_count];
        for (read_index, read) in self.read_set.iter().enumerate() {
            let first = self
                .positions
                .binary_search(&read.first_position())
                .expect("validated in new");
            let last = self
                .positions
                .binary_search(&read.last_position())
                .expect("validated in new");
            for column in first..=last {
                self.active[column].push(read_index);
            }
        }
        for (column, active) in self.active.iter().enumerate() {
            if active.len() > 31 {
                return Err(PhasingError::unsupported(format!(
                    "{} reads straddle column {}; raise the selection cap's effectiveness",
                    active.len(),
                    column
                )));
            }
        }

        self.observations = Vec::with_capacity(column_count);
        for column in 0..column_count {
            let mut row = Vec::with_capacity(self.active[column].len());
            for &read_index in &self.active[column] {
                let observation = self
                    .read_set
                    .get(read_index)
                    .allele_at(self.positions[column]);
                match observation {
                    Some(v) if v.allele > 1 => {
                        return Err(PhasingError::invalid_input(
                            column,
                            "only biallelic variants are phaseable",
                        ));
                    }
                    Some(v) => row.push(Some((v.allele, v.quality.max(0) as Cost))),
                    None => row.push(None),
                }
            }
            self.observations.push(row);
        }

        debug!(
            "DP over {} columns, {} transmission vectors, {} haplotype classes",
            column_count,
            self.transmission_count,
            self.partitions[0].count()
        );
        self.stage = DpStage::BuiltTables;
        Ok(())
    }

    fn run_forward(&mut self) -> Result<(), PhasingError> {
        assert_eq!(self.stage, DpStage::BuiltTables, "DP stage out of order");

        self.columns = Vec::with_capacity(self.positions.len());
        for column in 0..self.positions.len() {
            if self.cancelled() {
                self.release_tables();
                return Err(PhasingError::Cancelled);
            }

            let active = &self.active[column];
            let state_count = 1u32 << active.len();
            let mut entries: Vec<DpEntry> = Vec::new();

            if column == 0 {
                for bipartition in 0..state_count {
                    for transmission in 0..self.transmission_count {
                        if let Some((cost, assignment)) =
                            self.column_cost(column, bipartition, transmission)
                        {
                            entries.push(DpEntry {
                                bipartition,
                                transmission: transmission as u16,
                                assignment,
                                cost,
                                predecessor: None,
                            });
                        }
                    }
                }
            } else {
                // Reads active in both columns must stay on their haplotype;
                // project the previous states onto those reads and join.
                let previous_active = &self.active[column - 1];
                let shared: Vec<(usize, usize)> = active
                    .iter()
                    .enumerate()
                    .filter_map(|(new_slot, read_index)| {
                        previous_active
                            .iter()
                            .position(|p| p == read_index)
                            .map(|old_slot| (old_slot, new_slot))
                    })
                    .collect();

                let project_old = |mask: u32| -> u32 {
                    shared
                        .iter()
                        .enumerate()
                        .fold(0u32, |key, (bit, &(old_slot, _))| {
                            key | (((mask >> old_slot) & 1) << bit)
                        })
                };
                let project_new = |mask: u32| -> u32 {
                    shared
                        .iter()
                        .enumerate()
                        .fold(0u32, |key, (bit, &(_, new_slot))| {
                            key | (((mask >> new_slot) & 1) << bit)
                        })
                };

                let mut projected: HashMap<(u32, u16), (Cost, u32)> = HashMap::new();
                for (index, entry) in self.columns[column - 1].iter().enumerate() {
                    let key = (project_old(entry.bipartition), entry.transmission);
                    let candidate = (entry.cost, index as u32);
                    projected
                        .entry(key)
                        .and_modify(|existing| {
                            if candidate.0 < existing.0 {
                                *existing = candidate;
                            }
                        })
                        .or_insert(candidate);
                }

                let recombination = self.recombination_costs[column];
                for bipartition in 0..state_count {
                    let key = project_new(bipartition);
                    for transmission in 0..self.transmission_count {
                        let column_term =
                            match self.column_cost(column, bipartition, transmission) {
                                Some(term) => term,
                                None => continue,
                            };
                        let mut best: Option<(Cost, u32)> = None;
                        for previous_transmission in 0..self.transmission_count {
                            if let Some(&(cost, index)) =
                                projected.get(&(key, previous_transmission as u16))
                            {
                                let flips = (previous_transmission ^ transmission).count_ones();
                                let reached =
                                    add_costs(cost, recombination.saturating_mul(flips));
                                if best.map_or(true, |(b, _)| reached < b) {
                                    best = Some((reached, index));
                                }
                            }
                        }
                        if let Some((reached, predecessor)) = best {
                            entries.push(DpEntry {
                                bipartition,
                                transmission: transmission as u16,
                                assignment: column_term.1,
                                cost: add_costs(reached, column_term.0),
                                predecessor: Some(predecessor),
                            });
                        }
                    }
                }
            }

            if entries.is_empty() {
                self.release_tables();
                return Err(PhasingError::invalid_input(
                    column,
                    "no feasible phasing state at this variant",
                ));
            }
            if column + 1 < self.positions.len() {
                Self::prune_column(&mut entries, self.recombination_costs[column + 1]);
            }
            self.columns.push(entries);
        }

        self.stage = DpStage::RanForward;
        Ok(())
    }

    fn backtrace(&mut self) -> Result<(), PhasingError> {
        assert_eq!(self.stage, DpStage::RanForward, "DP stage out of order");

        let sample_count = self.pedigree.sample_count();
        let column_count = self.positions.len();
        let mut haplotypes = vec![vec![Vec::new(); column_count]; sample_count];
        let mut genotypes = vec![Vec::with_capacity(column_count); sample_count];
        let mut transmission = vec![0usize; column_count];
        let mut read_sides = vec![0u8; self.read_set.len()];
        let mut optimal_cost = 0;

        if column_count > 0 {
            let terminal = self
                .columns
                .last()
                .unwrap()
                .iter()
                .enumerate()
                .min_by_key(|(index, entry)| (entry.cost, *index))
                .map(|(index, _)| index)
                .unwrap();
            optimal_cost = self.columns[column_count - 1][terminal].cost;

            let mut chosen: Vec<DpEntry> = Vec::with_capacity(column_count);
            let mut cursor = terminal as u32;
            for column in (0..column_count).rev() {
                let entry = self.columns[column][cursor as usize];
                chosen.push(entry);
                if let Some(previous) = entry.predecessor {
                    cursor = previous;
                }
            }
            chosen.reverse();

            for (column, entry) in chosen.iter().enumerate() {
                transmission[column] = entry.transmission as usize;
                let partitions = &self.partitions[entry.transmission as usize];
                for sample in 0..sample_count {
                    let tuple: Vec<u8> = (0..2)
                        .map(|haplotype| {
                            ((entry.assignment >> partitions.partition(sample, haplotype)) & 1)
                                as u8
                        })
                        .collect();
                    genotypes[sample].push(Genotype::from_haplotype_tuple(&tuple));
                    haplotypes[sample][column] = tuple;
                }
                for (slot, &read_index) in self.active[column].iter().enumerate() {
                    read_sides[read_index] = ((entry.bipartition >> slot) & 1) as u8;
                }
            }
        }

        self.result = Some(DpResult {
            positions: self.positions.clone(),
            haplotypes,
            genotypes,
            transmission,
            read_sides,
            optimal_cost,
        });
        self.stage = DpStage::Backtraced;
        Ok(())
    }

    fn emit(&mut self) -> Result<DpResult, PhasingError> {
        assert_eq!(self.stage, DpStage::Backtraced, "DP stage out of order");
        self.release_tables();
        self.stage = DpStage::Emitted;
        Ok(self.result.take().expect("backtrace stores a result"))
    }
}
