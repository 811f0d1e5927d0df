use std::collections::HashSet;
use std::path::PathBuf;

use strum_macros::{Display, EnumString};

use crate::error::PhasingError;

/// Which column DP runs inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Algorithm {
    /// Full pedigree-aware DP with genotype priors.
    Default,
    /// Restricted DP that assumes every covered site is heterozygous and
    /// refuses pedigrees.
    HapChat,
}

/// Source of the per-column recombination costs.
#[derive(Debug, Clone, PartialEq)]
pub enum RecombinationModel {
    /// Constant rate in cM/Mb applied to physical distances.
    ConstantRate(f64),
    /// Genetic map file with `position centiMorgan` rows.
    GeneticMapPath(PathBuf),
}

impl Default for RecombinationModel {
    fn default() -> RecombinationModel {
        RecombinationModel::ConstantRate(1.26)
    }
}

/// A half-open target region on a chromosome, end-exclusive when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chromosome: String,
    pub start: i64,
    pub end: Option<i64>,
}

impl Region {
    pub fn contains(&self, chromosome: &str, position: i64) -> bool {
        self.chromosome == chromosome
            && position >= self.start
            && self.end.map_or(true, |e| position < e)
    }
}

/// All engine options, passed explicitly; there is no global mutable state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ploidy: u8,
    pub coverage_cap: u16,
    pub distrust_genotypes: bool,
    pub include_homozygous: bool,
    pub algorithm: Algorithm,
    pub recombination: RecombinationModel,
    pub genetic_haplotyping: bool,
    pub indels: bool,
    pub ignore_read_groups: bool,
    pub samples: Option<HashSet<String>>,
    pub regions: Option<Vec<Region>>,
    pub tag_supplementary: bool,
    pub read_merging: bool,
    pub mapq_threshold: u8,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            ploidy: 2,
            coverage_cap: 15,
            distrust_genotypes: false,
            include_homozygous: false,
            algorithm: Algorithm::Default,
            recombination: RecombinationModel::default(),
            genetic_haplotyping: true,
            indels: false,
            ignore_read_groups: false,
            samples: None,
            regions: None,
            tag_supplementary: false,
            read_merging: false,
            mapq_threshold: 20,
        }
    }
}

impl EngineConfig {
    /// Reject option combinations that no mode supports before any table is
    /// built.
    pub fn validate(&self) -> Result<(), PhasingError> {
        if self.ploidy < 2 {
            return Err(PhasingError::unsupported(format!(
                "ploidy must be at least 2, got {}",
                self.ploidy
            )));
        }
        if self.algorithm == Algorithm::HapChat && self.ploidy > 2 {
            return Err(PhasingError::unsupported(
                "hapchat mode supports diploid samples only",
            ));
        }
        if self.algorithm == Algorithm::HapChat && self.distrust_genotypes {
            return Err(PhasingError::unsupported(
                "hapchat mode does not propagate genotype priors",
            ));
        }
        Ok(())
    }
}
