use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::PhasingError;
use crate::model::genotype::Genotype;
use crate::phasing::{add_costs, Cost, DpResult, DpStage, HaplotypeDp, INFINITE_COST};
use crate::reads::read::ReadSet;

/// Per-column genotype alternatives for the one phased sample: cost per
/// alt-allele count (0..=ploidy), `None` when disallowed.
pub type AllowedPolyploidGenotypes = Vec<Vec<Option<Cost>>>;

#[derive(Debug, Clone)]
struct PolyEntry {
    /// haplotype label per active read, canonical over free labels
    labels: Vec<u8>,
    /// allele per haplotype, one bit each
    assignment: u32,
    cost: Cost,
    predecessor: Option<u32>,
}

/// The polyploid analogue of the bipartition DP: states are labelled
/// set-partitions of the active reads into at most `ploidy` haplotypes.
/// There is no pedigree dimension; transitions only enforce that straddling
/// reads keep their haplotype label.
pub struct PolyploidDpTable {
    stage: DpStage,
    read_set: ReadSet,
    ploidy: usize,
    positions: Vec<i64>,
    allowed: AllowedPolyploidGenotypes,
    cancel: Option<Arc<AtomicBool>>,
    active: Vec<Vec<usize>>,
    observations: Vec<Vec<Option<(u8, Cost)>>>,
    columns: Vec<Vec<PolyEntry>>,
    result: Option<DpResult>,
}

impl PolyploidDpTable {
    pub fn new(
        read_set: ReadSet,
        ploidy: usize,
        positions: Vec<i64>,
        allowed: AllowedPolyploidGenotypes,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<PolyploidDpTable, PhasingError> {
        if ploidy < 2 || ploidy > 8 {
            return Err(PhasingError::unsupported(format!(
                "polyploid DP supports ploidy 2..=8, got {}",
                ploidy
            )));
        }
        for (i, pair) in positions.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(PhasingError::invalid_input(
                    i + 1,
                    "DP column positions not strictly increasing",
                ));
            }
        }
        if allowed.len() != positions.len() {
            return Err(PhasingError::invalid_input(
                0,
                "genotype priors do not match the column count",
            ));
        }
        for (column, row) in allowed.iter().enumerate() {
            if row.len() != ploidy + 1 {
                return Err(PhasingError::invalid_input(
                    column,
                    "genotype priors do not match the ploidy",
                ));
            }
        }
        for read in read_set.iter() {
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
        Ok(PolyploidDpTable {
            stage: DpStage::Initialised,
            read_set,
            ploidy,
            positions,
            allowed,
            cancel,
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

    /// Cheapest allele-per-haplotype assignment for a labelling, respecting
    /// the allowed genotype multisets.
    fn column_cost(&self, column: usize, labels: &[u8]) -> Option<(Cost, u32)> {
        let mut best: Option<(Cost, u32)> = None;
        for assignment in 0u32..(1 << self.ploidy) {
            let alt_count = assignment.count_ones() as usize;
            let prior = match self.allowed[column][alt_count] {
                Some(prior) => prior,
                None => continue,
            };
            let mut cost = prior;
            for (slot, label) in labels.iter().enumerate() {
                if let Some((allele, quality)) = self.observations[column][slot] {
                    let implied = ((assignment >> label) & 1) as u8;
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

    /// All canonical ways to label the slots left open by `template`.
    /// Labels already pinned (shared reads) may be reused freely; the
    /// remaining labels are interchangeable, so they are introduced in
    /// ascending order only.
    fn canonical_extensions(&self, template: &[Option<u8>]) -> Vec<Vec<u8>> {
        let mut pinned: Vec<u8> = template.iter().filter_map(|l| *l).collect();
        pinned.sort_unstable();
        pinned.dedup();
        let free: Vec<u8> = (0..self.ploidy as u8)
            .filter(|l| !pinned.contains(l))
            .collect();

        let mut results = Vec::new();
        let mut current: Vec<u8> = Vec::with_capacity(template.len());
        self.extend_slot(template, 0, &pinned, &free, 0, &mut current, &mut results);
        results
    }

    fn extend_slot(
        &self,
        template: &[Option<u8>],
        slot: usize,
        pinned: &[u8],
        free: &[u8],
        free_used: usize,
        current: &mut Vec<u8>,
        results: &mut Vec<Vec<u8>>,
    ) {
        if slot == template.len() {
            results.push(current.clone());
            return;
        }
        match template[slot] {
            Some(label) => {
                current.push(label);
                self.extend_slot(template, slot + 1, pinned, free, free_used, current, results);
                current.pop();
            }
            None => {
                for &label in pinned {
                    current.push(label);
                    self.extend_slot(template, slot + 1, pinned, free, free_used, current, results);
                    current.pop();
                }
                for (i, &label) in free.iter().enumerate().take(free_used + 1) {
                    let next_free_used = free_used.max(i + 1);
                    current.push(label);
                    self.extend_slot(
                        template,
                        slot + 1,
                        pinned,
                        free,
                        next_free_used,
                        current,
                        results,
                    );
                    current.pop();
                }
            }
        }
    }
}

impl HaplotypeDp for PolyploidDpTable {
    fn build_tables(&mut self) -> Result<(), PhasingError> {
        assert_eq!(self.stage, DpStage::Initialised, "DP stage out of order");

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
            if active.len() > 20 {
                return Err(PhasingError::unsupported(format!(
                    "{} reads straddle column {}; the set-partition space is too large",
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

            let mut entries: Vec<PolyEntry> = Vec::new();
            if column == 0 {
                let template = vec![None; self.active[0].len()];
                for labels in self.canonical_extensions(&template) {
                    if let Some((cost, assignment)) = self.column_cost(0, &labels) {
                        entries.push(PolyEntry {
                            labels,
                            assignment,
                            cost,
                            predecessor: None,
                        });
                    }
                }
            } else {
                let previous_active = &self.active[column - 1];
                let active = &self.active[column];
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

                // collapse predecessors to their pinned-label projection
                let mut projected: HashMap<Vec<u8>, (Cost, u32)> = HashMap::new();
                for (index, entry) in self.columns[column - 1].iter().enumerate() {
                    let key: Vec<u8> = shared
                        .iter()
                        .map(|&(old_slot, _)| entry.labels[old_slot])
                        .collect();
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

                let mut keys: Vec<&Vec<u8>> = projected.keys().collect();
                keys.sort();
                for key in keys {
                    let &(previous_cost, predecessor) = &projected[key];
                    let mut template: Vec<Option<u8>> = vec![None; active.len()];
                    for (bit, &(_, new_slot)) in shared.iter().enumerate() {
                        template[new_slot] = Some(key[bit]);
                    }
                    for labels in self.canonical_extensions(&template) {
                        if let Some((cost, assignment)) = self.column_cost(column, &labels) {
                            entries.push(PolyEntry {
                                labels,
                                assignment,
                                cost: add_costs(previous_cost, cost),
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
            self.columns.push(entries);
        }

        self.stage = DpStage::RanForward;
        Ok(())
    }

    fn backtrace(&mut self) -> Result<(), PhasingError> {
        assert_eq!(self.stage, DpStage::RanForward, "DP stage out of order");

        let column_count = self.positions.len();
        let mut haplotypes = vec![vec![Vec::new(); column_count]];
        let mut genotypes = vec![Vec::with_capacity(column_count)];
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

            let mut cursor = terminal as u32;
            let mut chosen: Vec<PolyEntry> = Vec::with_capacity(column_count);
            for column in (0..column_count).rev() {
                let entry = self.columns[column][cursor as usize].clone();
                if let Some(previous) = entry.predecessor {
                    cursor = previous;
                }
                chosen.push(entry);
            }
            chosen.reverse();

            for (column, entry) in chosen.iter().enumerate() {
                let tuple: Vec<u8> = (0..self.ploidy)
                    .map(|haplotype| ((entry.assignment >> haplotype) & 1) as u8)
                    .collect();
                genotypes[0].push(Genotype::from_haplotype_tuple(&tuple));
                haplotypes[0][column] = tuple;
                for (slot, &read_index) in self.active[column].iter().enumerate() {
                    read_sides[read_index] = entry.labels[slot];
                }
            }
        }

        self.result = Some(DpResult {
            positions: self.positions.clone(),
            haplotypes,
            genotypes,
            transmission: Vec::new(),
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
