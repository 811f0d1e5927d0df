pub mod block_assembler;
pub mod dp;
pub mod engine;
pub mod pedigree_partitions;
pub mod polyploid;
pub mod tagging;

use crate::error::PhasingError;
use crate::model::genotype::Genotype;

/// Phred-scaled DP costs; additions saturate here.
pub type Cost = u32;
pub const INFINITE_COST: Cost = u32::MAX;

pub fn add_costs(a: Cost, b: Cost) -> Cost {
    a.saturating_add(b)
}

/// Lifecycle of one DP run. Every stage must be passed exactly once, in
/// order; skipping a stage is a caller bug and asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DpStage {
    Initialised,
    BuiltTables,
    RanForward,
    Backtraced,
    Emitted,
}

/// Everything a DP run hands back: per-sample, per-column haplotype tuples,
/// the chosen genotypes, the transmission backtrace and the final read
/// partitioning.
#[derive(Debug, Clone)]
pub struct DpResult {
    pub positions: Vec<i64>,
    /// sample -> column -> haplotype tuple (one allele per haplotype)
    pub haplotypes: Vec<Vec<Vec<u8>>>,
    /// sample -> column -> genotype the DP settled on
    pub genotypes: Vec<Vec<Genotype>>,
    /// transmission vector per column; empty when no pedigree is in play
    pub transmission: Vec<usize>,
    /// haplotype label each read ended up on
    pub read_sides: Vec<u8>,
    pub optimal_cost: Cost,
}

/// Common surface of the two DP variants; the engine drives whichever the
/// ploidy selects through this trait.
pub trait HaplotypeDp {
    fn build_tables(&mut self) -> Result<(), PhasingError>;
    fn run_forward(&mut self) -> Result<(), PhasingError>;
    fn backtrace(&mut self) -> Result<(), PhasingError>;
    fn emit(&mut self) -> Result<DpResult, PhasingError>;

    fn run(&mut self) -> Result<DpResult, PhasingError> {
        self.build_tables()?;
        self.run_forward()?;
        self.backtrace()?;
        self.emit()
    }
}

/// Tagged union over the per-ploidy DP implementations.
pub enum DpTable {
    Diploid(dp::PedigreeDpTable),
    Polyploid(polyploid::PolyploidDpTable),
}

impl HaplotypeDp for DpTable {
    fn build_tables(&mut self) -> Result<(), PhasingError> {
        match self {
            DpTable::Diploid(table) => table.build_tables(),
            DpTable::Polyploid(table) => table.build_tables(),
        }
    }

    fn run_forward(&mut self) -> Result<(), PhasingError> {
        match self {
            DpTable::Diploid(table) => table.run_forward(),
            DpTable::Polyploid(table) => table.run_forward(),
        }
    }

    fn backtrace(&mut self) -> Result<(), PhasingError> {
        match self {
            DpTable::Diploid(table) => table.backtrace(),
            DpTable::Polyploid(table) => table.backtrace(),
        }
    }

    fn emit(&mut self) -> Result<DpResult, PhasingError> {
        match self {
            DpTable::Diploid(table) => table.emit(),
            DpTable::Polyploid(table) => table.emit(),
        }
    }
}
