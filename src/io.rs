use crate::error::PhasingError;
use crate::model::variant::VariantTable;
use crate::reads::aligned_read::AlignedRead;

/// Source of per-chromosome variant tables. Implemented by external format
/// readers (VCF/BCF); the engine only consumes the abstract tables.
pub trait VariantTableProvider {
    /// Next chromosome's table, or `None` when exhausted. Implementations
    /// must deliver variants in strictly increasing position order.
    fn next_table(&mut self) -> Result<Option<VariantTable>, PhasingError>;

    /// Sample names available from this source.
    fn samples(&self) -> Vec<String>;
}

/// Source of aligned reads. Implemented by external alignment readers;
/// compressed formats that cannot decode without a reference sequence must
/// return [`PhasingError::ReferenceRequired`] instead of guessing.
pub trait AlignedReadProvider {
    /// All reads mapped to the chromosome, sorted by position. A chromosome
    /// unknown to the source yields an empty list, not an error.
    fn fetch(&mut self, chromosome: &str) -> Result<Vec<AlignedRead>, PhasingError>;
}
