use crate::error::PhasingError;
use crate::utils::phred;

/// A genotype is a multiset of allele indices of size ploidy. Stored sorted so
/// multiset equality is plain `Vec` equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Genotype {
    alleles: Vec<u8>,
}

impl Genotype {
    pub fn new(mut alleles: Vec<u8>) -> Genotype {
        alleles.sort_unstable();
        Genotype { alleles }
    }

    pub fn diploid(a: u8, b: u8) -> Genotype {
        Genotype::new(vec![a, b])
    }

    /// Genotype implied by a haplotype tuple (one allele per haplotype).
    pub fn from_haplotype_tuple(haplotypes: &[u8]) -> Genotype {
        Genotype::new(haplotypes.to_vec())
    }

    pub fn ploidy(&self) -> usize {
        self.alleles.len()
    }

    pub fn alleles(&self) -> &[u8] {
        &self.alleles
    }

    pub fn is_homozygous(&self) -> bool {
        self.alleles.windows(2).all(|w| w[0] == w[1])
    }

    pub fn is_heterozygous(&self) -> bool {
        !self.is_homozygous()
    }

    /// Number of alternative alleles; for biallelic variants this is the
    /// canonical likelihood index (0/0 -> 0, 0/1 -> 1, 1/1 -> 2, ...).
    pub fn alt_count(&self) -> usize {
        self.alleles.iter().filter(|&&a| a != 0).count()
    }

    /// All biallelic genotypes of the given ploidy, ordered by alt count.
    pub fn all_biallelic(ploidy: usize) -> Vec<Genotype> {
        (0..=ploidy)
            .map(|alt| {
                let mut alleles = vec![0u8; ploidy - alt];
                alleles.extend(std::iter::repeat(1u8).take(alt));
                Genotype::new(alleles)
            })
            .collect()
    }

    pub fn check_ploidy(&self, sample: &str, declared: usize) -> Result<(), PhasingError> {
        if self.ploidy() != declared {
            return Err(PhasingError::PloidyError {
                sample: sample.to_owned(),
                observed: self.ploidy(),
                declared,
            });
        }
        Ok(())
    }
}

/// Per-variant, per-sample genotype likelihoods in log10 space, indexed by
/// alt-allele count for biallelic variants.
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeLikelihoods {
    log10_likelihoods: Vec<f64>,
}

impl GenotypeLikelihoods {
    pub fn new(log10_likelihoods: Vec<f64>) -> GenotypeLikelihoods {
        GenotypeLikelihoods { log10_likelihoods }
    }

    pub fn genotype_count(&self) -> usize {
        self.log10_likelihoods.len()
    }

    pub fn log10(&self) -> &[f64] {
        &self.log10_likelihoods
    }

    /// Phred-scaled cost per genotype, cheapest genotype at 0.
    pub fn as_costs(&self) -> Vec<u32> {
        phred::log10_likelihoods_to_costs(&self.log10_likelihoods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiset_equality() {
        assert_eq!(Genotype::diploid(0, 1), Genotype::diploid(1, 0));
        assert_ne!(Genotype::diploid(0, 0), Genotype::diploid(0, 1));
    }

    #[test]
    fn test_homozygosity() {
        assert!(Genotype::diploid(1, 1).is_homozygous());
        assert!(Genotype::diploid(0, 1).is_heterozygous());
        assert!(Genotype::new(vec![0, 0, 1, 1]).is_heterozygous());
    }

    #[test]
    fn test_all_biallelic() {
        let genotypes = Genotype::all_biallelic(2);
        assert_eq!(genotypes.len(), 3);
        assert_eq!(genotypes[1], Genotype::diploid(0, 1));
        assert_eq!(genotypes[2].alt_count(), 2);
    }
}
