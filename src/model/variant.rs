use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use hashlink::LinkedHashMap;

use crate::error::PhasingError;
use crate::model::genotype::{Genotype, GenotypeLikelihoods};

/// A candidate variant: position plus reference and alternative allele bytes.
/// Either allele may be empty (insertion/deletion). Within one chromosome,
/// identity is the position alone.
#[derive(Debug, Clone)]
pub struct Variant {
    pub position: i64,
    pub reference_allele: Vec<u8>,
    pub alternative_allele: Vec<u8>,
}

impl Variant {
    pub fn new(position: i64, reference_allele: &[u8], alternative_allele: &[u8]) -> Variant {
        Variant {
            position,
            reference_allele: reference_allele.to_vec(),
            alternative_allele: alternative_allele.to_vec(),
        }
    }

    pub fn snv(position: i64, reference_base: u8, alternative_base: u8) -> Variant {
        Variant::new(position, &[reference_base], &[alternative_base])
    }

    pub fn is_snv(&self) -> bool {
        self.reference_allele.len() == 1 && self.alternative_allele.len() == 1
    }

    pub fn is_insertion(&self) -> bool {
        self.reference_allele.is_empty() && !self.alternative_allele.is_empty()
    }

    pub fn is_deletion(&self) -> bool {
        !self.reference_allele.is_empty() && self.alternative_allele.is_empty()
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for Variant {}

impl Hash for Variant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position.hash(state);
    }
}

impl Ord for Variant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position.cmp(&other.position)
    }
}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Assignment of a variant's alleles to specific haplotypes within a block.
/// `haplotype[k]` is the allele carried by haplotype k; its multiset must
/// equal the sample's genotype at the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub block_id: i64,
    pub haplotype: Vec<u8>,
}

impl Phase {
    pub fn new(block_id: i64, haplotype: Vec<u8>) -> Phase {
        Phase { block_id, haplotype }
    }

    pub fn genotype(&self) -> Genotype {
        Genotype::from_haplotype_tuple(&self.haplotype)
    }
}

/// All variants of one chromosome together with per-sample genotypes,
/// optional genotype likelihoods, and per-sample phases. Constructed once per
/// chromosome; the phase columns are the only part mutated by the engine.
#[derive(Debug, Clone)]
pub struct VariantTable {
    pub chromosome: String,
    samples: Vec<String>,
    variants: Vec<Variant>,
    genotypes: Vec<Vec<Genotype>>,
    likelihoods: Vec<Vec<Option<GenotypeLikelihoods>>>,
    phases: Vec<Vec<Option<Phase>>>,
}

impl VariantTable {
    pub fn new(chromosome: &str, samples: &[&str]) -> VariantTable {
        VariantTable {
            chromosome: chromosome.to_owned(),
            samples: samples.iter().map(|s| (*s).to_owned()).collect(),
            variants: Vec::new(),
            genotypes: vec![Vec::new(); samples.len()],
            likelihoods: vec![Vec::new(); samples.len()],
            phases: vec![Vec::new(); samples.len()],
        }
    }

    /// Append a variant with one genotype (and optional likelihoods) per
    /// sample. Positions must arrive strictly increasing.
    pub fn add_variant(
        &mut self,
        variant: Variant,
        genotypes: Vec<Genotype>,
        likelihoods: Vec<Option<GenotypeLikelihoods>>,
    ) -> Result<(), PhasingError> {
        if genotypes.len() != self.samples.len() || likelihoods.len() != self.samples.len() {
            return Err(PhasingError::invalid_input(
                self.variants.len(),
                "genotype columns do not match the sample list",
            ));
        }
        if let Some(last) = self.variants.last() {
            if last.position >= variant.position {
                return Err(PhasingError::invalid_input(
                    self.variants.len(),
                    format!(
                        "variant positions not strictly increasing: {} after {}",
                        variant.position, last.position
                    ),
                ));
            }
        }
        self.variants.push(variant);
        for (sample_index, (genotype, likelihood)) in
            genotypes.into_iter().zip(likelihoods.into_iter()).enumerate()
        {
            self.genotypes[sample_index].push(genotype);
            self.likelihoods[sample_index].push(likelihood);
            self.phases[sample_index].push(None);
        }
        Ok(())
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn sample_names(&self) -> &[String] {
        &self.samples
    }

    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == sample)
    }

    pub fn genotypes_of(&self, sample_index: usize) -> &[Genotype] {
        &self.genotypes[sample_index]
    }

    pub fn likelihoods_of(&self, sample_index: usize) -> &[Option<GenotypeLikelihoods>] {
        &self.likelihoods[sample_index]
    }

    pub fn phases_of(&self, sample_index: usize) -> &[Option<Phase>] {
        &self.phases[sample_index]
    }

    pub fn set_phase(&mut self, sample_index: usize, variant_index: usize, phase: Phase) {
        assert_eq!(
            phase.genotype(),
            self.genotypes[sample_index][variant_index],
            "phase haplotype tuple must spell the genotype"
        );
        self.phases[sample_index][variant_index] = Some(phase);
    }

    pub fn clear_phases(&mut self, sample_index: usize) {
        for phase in self.phases[sample_index].iter_mut() {
            *phase = None;
        }
    }

    /// Replace a genotype; used by `distrust_genotypes` re-typing when the DP
    /// selects a different genotype than the input call.
    pub fn set_genotype(&mut self, sample_index: usize, variant_index: usize, genotype: Genotype) {
        self.genotypes[sample_index][variant_index] = genotype;
    }

    pub fn check_ploidy(&self, declared: usize) -> Result<(), PhasingError> {
        for (sample_index, sample) in self.samples.iter().enumerate() {
            for genotype in &self.genotypes[sample_index] {
                genotype.check_ploidy(sample, declared)?;
            }
        }
        Ok(())
    }
}

/// A maximal set of variants phased relative to each other, as produced by
/// the block assembler.
#[derive(Debug, Clone)]
pub struct PhasedBlock {
    pub chromosome: String,
    pub leftmost_variant: Variant,
    pub rightmost_variant: Variant,
    pub mapping: LinkedHashMap<i64, Phase>,
    snv_count: usize,
}

impl PhasedBlock {
    pub fn new(chromosome: &str, first_variant: &Variant, first_phase: Phase) -> PhasedBlock {
        let mut mapping = LinkedHashMap::new();
        let snv_count = if first_variant.is_snv() { 1 } else { 0 };
        mapping.insert(first_variant.position, first_phase);
        PhasedBlock {
            chromosome: chromosome.to_owned(),
            leftmost_variant: first_variant.clone(),
            rightmost_variant: first_variant.clone(),
            mapping,
            snv_count,
        }
    }

    /// Variants must be added in position order within the block.
    pub fn push(&mut self, variant: &Variant, phase: Phase) {
        assert!(variant.position > self.rightmost_variant.position);
        self.rightmost_variant = variant.clone();
        if variant.is_snv() {
            self.snv_count += 1;
        }
        self.mapping.insert(variant.position, phase);
    }

    pub fn block_id(&self) -> i64 {
        self.leftmost_variant.position
    }

    pub fn span(&self) -> i64 {
        self.rightmost_variant.position - self.leftmost_variant.position
    }

    pub fn variant_count(&self) -> usize {
        self.mapping.len()
    }

    pub fn snv_count(&self) -> usize {
        self.snv_count
    }
}
