pub mod aligned_read;
pub mod allele_detector;
pub mod merge;
pub mod read;
