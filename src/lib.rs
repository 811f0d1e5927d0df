//! Read-based haplotype phasing for diploid and polyploid samples.
//!
//! Given candidate variants and aligned reads, the engine assigns each
//! heterozygous variant to a haplotype so that the haplotypes are maximally
//! consistent with the reads, optionally constrained by a pedigree and a
//! genetic recombination map. File formats stay outside: callers feed
//! [`model::variant::VariantTable`]s and [`reads::aligned_read::AlignedRead`]s
//! through the traits in [`io`] and take phased tables back.

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

pub mod compare;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod pedigree;
pub mod phasing;
pub mod reads;
pub mod selection;
pub mod utils;
