use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bstr::ByteSlice;
use rayon::prelude::*;

use crate::config::{Algorithm, EngineConfig, RecombinationModel};
use crate::error::PhasingError;
use crate::model::variant::{PhasedBlock, VariantTable};
use crate::pedigree::genetic_map::GeneticMap;
use crate::pedigree::recombination::{
    find_recombination_events, recombination_cost_map, uniform_recombination_map,
    RecombinationEvent,
};
use crate::pedigree::Pedigree;
use crate::phasing::block_assembler::BlockAssembler;
use crate::phasing::dp::PedigreeDpTable;
use crate::phasing::polyploid::PolyploidDpTable;
use crate::phasing::{add_costs, Cost, DpTable, HaplotypeDp};
use crate::reads::aligned_read::AlignedRead;
use crate::reads::merge::ReadMerger;
use crate::reads::read::{Read, ReadSet};
use crate::selection::read_selector::ReadSelector;
use crate::utils::position_index::PositionIndex;

/// Quality attached to synthetic constraint reads; high enough that the DP
/// never contradicts a supplied phase.
pub const CONSTRAINT_QUALITY: i32 = 10_000;

/// Cost of switching a sample to a genotype other than its input call when
/// `distrust_genotypes` is set but no likelihoods were supplied.
const GENOTYPE_CHANGE_COST: Cost = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintRelation {
    Cis,
    Trans,
}

/// A supplied-phase constraint: the relative orientation of two already
/// phased variants is fixed before the DP runs.
#[derive(Debug, Clone)]
pub struct BlockConstraint {
    pub position_a: i64,
    pub position_b: i64,
    pub relation: ConstraintRelation,
}

/// Everything one chromosome run produces besides the phases written into
/// the variant table.
#[derive(Debug, Clone, Default)]
pub struct PhasingResult {
    pub blocks: HashMap<String, Vec<PhasedBlock>>,
    pub recombination_events: Vec<RecombinationEvent>,
    pub selected_reads: HashMap<String, Vec<usize>>,
    pub phased_variant_count: usize,
    pub optimal_cost: Cost,
}

/// One group of samples phased by a single DP run: the whole pedigree when
/// one is given, otherwise each sample on its own.
struct PhasingUnit {
    pedigree: Pedigree,
    /// dp sample index -> table sample index
    table_samples: Vec<usize>,
}

/// Drives the whole pipeline for one chromosome: column selection, read
/// restriction, coverage-capped selection, the DP, block assembly, and
/// recombination reporting. Chromosomes are independent; `phase_tables` runs
/// them in parallel.
pub struct PhasingEngine {
    config: EngineConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl PhasingEngine {
    pub fn new(config: EngineConfig) -> Result<PhasingEngine, PhasingError> {
        config.validate()?;
        Ok(PhasingEngine {
            config,
            cancel: None,
        })
    }

    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> PhasingEngine {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Which sample an alignment belongs to: its read group, unless read
    /// groups are ignored and everything maps to the single target sample.
    pub fn sample_for_alignment<'a>(
        &self,
        alignment: &'a AlignedRead,
        target_sample: &'a str,
    ) -> Option<&'a str> {
        if self.config.ignore_read_groups {
            return Some(target_sample);
        }
        alignment
            .read_group
            .as_ref()
            .and_then(|read_group| read_group.to_str().ok())
    }

    /// Whether an alignment participates in haplotype tagging. Supplementary
    /// alignments are eligible only when `tag_supplementary` is set.
    pub fn tag_eligible(&self, alignment: &AlignedRead) -> bool {
        if alignment.is_supplementary() {
            return self.config.tag_supplementary
                && !alignment.is_secondary()
                && !alignment.is_unmapped()
                && !alignment.cigar.is_empty()
                && alignment.mapq >= self.config.mapq_threshold;
        }
        alignment.is_accepted(self.config.mapq_threshold)
    }

    /// Phase several chromosomes; each entry pairs a variant table with the
    /// per-sample read sets of that chromosome.
    pub fn phase_tables(
        &self,
        jobs: &mut [(VariantTable, HashMap<String, ReadSet>)],
        pedigree: Option<&Pedigree>,
        genetic_map: Option<&GeneticMap>,
    ) -> Result<Vec<PhasingResult>, PhasingError> {
        jobs.par_iter_mut()
            .map(|(table, read_sets)| {
                self.phase_chromosome(table, read_sets, pedigree, genetic_map, &[])
            })
            .collect()
    }

    /// Phase one chromosome in place. `read_sets` maps sample names to the
    /// allele-detected reads of this chromosome; missing samples phase from
    /// genetics alone (or not at all).
    pub fn phase_chromosome(
        &self,
        table: &mut VariantTable,
        read_sets: &HashMap<String, ReadSet>,
        pedigree: Option<&Pedigree>,
        genetic_map: Option<&GeneticMap>,
        constraints: &[BlockConstraint],
    ) -> Result<PhasingResult, PhasingError> {
        table.check_ploidy(self.config.ploidy as usize)?;

        let units = self.build_units(table, pedigree)?;
        let mut result = PhasingResult::default();
        for unit in units {
            self.phase_unit(table, read_sets, &unit, genetic_map, constraints, &mut result)?;
        }
        info!(
            "chromosome {}: phased {} variants in {} block(s)",
            table.chromosome,
            result.phased_variant_count,
            result.blocks.values().map(|b| b.len()).sum::<usize>()
        );
        Ok(result)
    }

    fn build_units(
        &self,
        table: &VariantTable,
        pedigree: Option<&Pedigree>,
    ) -> Result<Vec<PhasingUnit>, PhasingError> {
        if let Some(pedigree) = pedigree {
            let mut table_samples = Vec::with_capacity(pedigree.sample_count());
            for sample in pedigree.samples() {
                let index = table.sample_index(sample).ok_or_else(|| {
                    PhasingError::invalid_input(
                        0,
                        format!("pedigree sample {} is not in the variant table", sample),
                    )
                })?;
                table_samples.push(index);
            }
            if pedigree.trios().is_empty() {
                // no trios: just a sample list, each phases on its own
                return Ok(table_samples
                    .into_iter()
                    .map(|table_sample| {
                        let name = &table.sample_names()[table_sample];
                        let mut single = Pedigree::new();
                        single.add_sample(name);
                        PhasingUnit {
                            pedigree: single,
                            table_samples: vec![table_sample],
                        }
                    })
                    .collect());
            }
            if self.config.algorithm == Algorithm::HapChat {
                return Err(PhasingError::unsupported(
                    "hapchat mode cannot do pedigree phasing",
                ));
            }
            if self.config.ploidy != 2 {
                return Err(PhasingError::unsupported(
                    "pedigree phasing supports diploid samples only",
                ));
            }
            return Ok(vec![PhasingUnit {
                pedigree: pedigree.clone(),
                table_samples,
            }]);
        }

        let requested: Vec<&String> = match &self.config.samples {
            Some(names) => table
                .sample_names()
                .iter()
                .filter(|s| names.contains(s.as_str()))
                .collect(),
            None => table.sample_names().iter().collect(),
        };
        if requested.is_empty() {
            return Err(PhasingError::NoCommonSample);
        }
        Ok(requested
            .into_iter()
            .map(|name| {
                let mut pedigree = Pedigree::new();
                pedigree.add_sample(name);
                PhasingUnit {
                    pedigree,
                    table_samples: vec![table.sample_index(name).unwrap()],
                }
            })
            .collect())
    }

    /// Column positions for one unit: region- and indel-filtered variants
    /// that are heterozygous in at least one unit sample (or all of them
    /// under `include_homozygous`).
    fn select_columns(&self, table: &VariantTable, unit: &PhasingUnit) -> Vec<(usize, i64)> {
        table
            .variants()
            .iter()
            .enumerate()
            .filter(|(_, variant)| {
                if let Some(regions) = &self.config.regions {
                    if !regions
                        .iter()
                        .any(|r| r.contains(&table.chromosome, variant.position))
                    {
                        return false;
                    }
                }
                if !self.config.indels && !variant.is_snv() {
                    return false;
                }
                true
            })
            .filter(|(variant_index, _)| {
                if self.config.include_homozygous && self.config.algorithm == Algorithm::Default {
                    return true;
                }
                unit.table_samples
                    .iter()
                    .any(|&s| table.genotypes_of(s)[*variant_index].is_heterozygous())
            })
            .map(|(variant_index, variant)| (variant_index, variant.position))
            .collect()
    }

    fn resolve_recombination_costs(
        &self,
        genetic_map: Option<&GeneticMap>,
        positions: &[i64],
    ) -> Result<Vec<Cost>, PhasingError> {
        if let Some(map) = genetic_map {
            return Ok(recombination_cost_map(map, positions));
        }
        match &self.config.recombination {
            RecombinationModel::ConstantRate(rate) => {
                Ok(uniform_recombination_map(*rate, positions))
            }
            RecombinationModel::GeneticMapPath(path) => {
                let map = GeneticMap::from_path(path)?;
                Ok(recombination_cost_map(&map, positions))
            }
        }
    }

    /// Genotype alternatives per unit sample and column, phred costs.
    fn allowed_genotypes(
        &self,
        table: &VariantTable,
        unit: &PhasingUnit,
        columns: &[(usize, i64)],
        ploidy: usize,
    ) -> Vec<Vec<Vec<Option<Cost>>>> {
        unit.table_samples
            .iter()
            .map(|&table_sample| {
                columns
                    .iter()
                    .map(|&(variant_index, _)| {
                        let observed = &table.genotypes_of(table_sample)[variant_index];
                        let mut row: Vec<Option<Cost>> = vec![None; ploidy + 1];
                        if self.config.algorithm == Algorithm::HapChat {
                            // hapchat assumes every covered site is het
                            row[1] = Some(0);
                            return row;
                        }
                        if self.config.distrust_genotypes {
                            let likelihoods =
                                table.likelihoods_of(table_sample)[variant_index].as_ref();
                            match likelihoods {
                                Some(gl) if gl.genotype_count() == ploidy + 1 => {
                                    for (alt, cost) in gl.as_costs().into_iter().enumerate() {
                                        row[alt] = Some(cost);
                                    }
                                }
                                _ => {
                                    for alt in 0..=ploidy {
                                        row[alt] = Some(GENOTYPE_CHANGE_COST);
                                    }
                                    row[observed.alt_count()] = Some(0);
                                }
                            }
                        } else {
                            row[observed.alt_count()] = Some(0);
                        }
                        row
                    })
                    .collect()
            })
            .collect()
    }

    fn phase_unit(
        &self,
        table: &mut VariantTable,
        read_sets: &HashMap<String, ReadSet>,
        unit: &PhasingUnit,
        genetic_map: Option<&GeneticMap>,
        constraints: &[BlockConstraint],
        result: &mut PhasingResult,
    ) -> Result<(), PhasingError> {
        let ploidy = self.config.ploidy as usize;
        let columns = self.select_columns(table, unit);
        for &table_sample in &unit.table_samples {
            table.clear_phases(table_sample);
        }
        if columns.is_empty() {
            for &table_sample in &unit.table_samples {
                let name = table.sample_names()[table_sample].clone();
                result.blocks.entry(name.clone()).or_default();
                result.selected_reads.entry(name).or_default();
            }
            return Ok(());
        }

        let positions: Vec<i64> = columns.iter().map(|&(_, p)| p).collect();
        let index = PositionIndex::new(&positions)?;
        let keep: BTreeSet<i64> = positions.iter().copied().collect();

        // restrict, select and pool the reads of every unit sample
        let mut pooled = ReadSet::new();
        let selector = ReadSelector::new(self.config.coverage_cap as usize);
        for (dp_sample, &table_sample) in unit.table_samples.iter().enumerate() {
            let name = &table.sample_names()[table_sample];
            let mut restricted = read_sets.get(name).cloned().unwrap_or_default();
            if self.config.read_merging {
                restricted = ReadMerger::default().merge(&restricted);
            }
            for read_index in 0..restricted.len() {
                let read = restricted.get_mut(read_index);
                read.sample_id = dp_sample;
                read.retain_positions(&keep);
            }
            let selected = selector.select(&restricted, &index);
            debug!(
                "sample {}: selected {} of {} reads",
                name,
                selected.len(),
                restricted.len()
            );
            for &read_index in &selected {
                pooled.add(restricted.get(read_index).clone());
            }
            result
                .selected_reads
                .insert(name.clone(), selected);
        }

        // supplied phases enter as maximal-quality reads, outside the cap
        let mut constraint_merges: Vec<(i64, i64)> = Vec::new();
        for constraint in constraints {
            let (low, high) = if constraint.position_a <= constraint.position_b {
                (constraint.position_a, constraint.position_b)
            } else {
                (constraint.position_b, constraint.position_a)
            };
            if index.index_of(low).is_none() || index.index_of(high).is_none() {
                continue;
            }
            constraint_merges.push((low, high));
            for dp_sample in 0..unit.pedigree.sample_count() {
                let mut read = Read::new(
                    &format!("phase-constraint-{}-{}", low, high),
                    60,
                    usize::MAX,
                    dp_sample,
                );
                read.add_variant(low, 0, CONSTRAINT_QUALITY);
                let other_allele = match constraint.relation {
                    ConstraintRelation::Cis => 0,
                    ConstraintRelation::Trans => 1,
                };
                read.add_variant(high, other_allele, CONSTRAINT_QUALITY);
                pooled.add(read);
            }
        }

        let recombination_costs = self.resolve_recombination_costs(genetic_map, &positions)?;
        let allowed = self.allowed_genotypes(table, unit, &columns, ploidy);

        let mut dp_table = if ploidy == 2 {
            let allowed_diploid = allowed
                .into_iter()
                .map(|per_sample| {
                    per_sample
                        .into_iter()
                        .map(|row| [row[0], row[1], row[2]])
                        .collect()
                })
                .collect();
            DpTable::Diploid(PedigreeDpTable::new(
                pooled.clone(),
                unit.pedigree.clone(),
                positions.clone(),
                allowed_diploid,
                recombination_costs.clone(),
                self.cancel.clone(),
            )?)
        } else {
            DpTable::Polyploid(PolyploidDpTable::new(
                pooled.clone(),
                ploidy,
                positions.clone(),
                allowed.into_iter().next().unwrap(),
                self.cancel.clone(),
            )?)
        };
        let dp_result = dp_table.run()?;

        // under distrust the DP may re-type genotypes
        if self.config.distrust_genotypes {
            for (dp_sample, &table_sample) in unit.table_samples.iter().enumerate() {
                for (column, &(variant_index, _)) in columns.iter().enumerate() {
                    let chosen = &dp_result.genotypes[dp_sample][column];
                    if chosen != &table.genotypes_of(table_sample)[variant_index] {
                        table.set_genotype(table_sample, variant_index, chosen.clone());
                    }
                }
            }
        }

        // genetic haplotyping: inheritance-informative positions join one
        // master block even where no read connects them
        let mut extra_merges = constraint_merges;
        if self.config.genetic_haplotyping && !unit.pedigree.trios().is_empty() {
            let master: Vec<i64> = columns
                .iter()
                .enumerate()
                .filter(|&(column, _)| {
                    unit.pedigree.trios().iter().any(|trio| {
                        let genotype = |dp_sample: usize| &dp_result.genotypes[dp_sample][column];
                        let members =
                            [genotype(trio.child), genotype(trio.father), genotype(trio.mother)];
                        members.iter().any(|g| g.is_heterozygous())
                            && !members.iter().all(|g| g.is_heterozygous())
                    })
                })
                .map(|(column, _)| positions[column])
                .collect();
            for pair in master.windows(2) {
                extra_merges.push((pair[0], pair[1]));
            }
        }

        let components = BlockAssembler::compute_components(&positions, &pooled, &extra_merges);

        let mut phased = 0;
        for (dp_sample, &table_sample) in unit.table_samples.iter().enumerate() {
            phased +=
                BlockAssembler::assign_phases(table, table_sample, &dp_result, dp_sample, &components);
            let name = table.sample_names()[table_sample].clone();
            let blocks = BlockAssembler::build_blocks(table, table_sample);
            result.blocks.insert(name, blocks);
        }
        result.phased_variant_count += phased;
        result.optimal_cost = add_costs(result.optimal_cost, dp_result.optimal_cost);

        if !unit.pedigree.trios().is_empty() {
            result.recombination_events.extend(find_recombination_events(
                &dp_result.transmission,
                &unit.pedigree,
                &positions,
                &recombination_costs,
            ));
        }
        Ok(())
    }
}
