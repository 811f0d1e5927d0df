pub mod genotype;
pub mod variant;
