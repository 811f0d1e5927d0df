use crate::pedigree::Pedigree;

/// For one transmission vector, maps every (sample, haplotype) slot to a
/// shared haplotype class. Each founder contributes two fresh classes; a
/// child's paternal slot aliases whichever of the father's classes the trio's
/// father bit selects, and likewise for the maternal slot. The DP assigns one
/// allele per class and scores all samples against it.
#[derive(Debug, Clone)]
pub struct PedigreePartitions {
    count: usize,
    partition_of: Vec<[usize; 2]>,
}

impl PedigreePartitions {
    pub fn new(pedigree: &Pedigree, transmission: usize) -> PedigreePartitions {
        let sample_count = pedigree.sample_count();
        let mut partition_of = vec![[usize::MAX; 2]; sample_count];
        let mut next = 0;
        for sample in pedigree.topological_order() {
            let trio = pedigree
                .trios()
                .iter()
                .enumerate()
                .find(|(_, t)| t.child == sample);
            match trio {
                Some((trio_index, trio)) => {
                    let father_bit = (transmission >> (2 * trio_index)) & 1;
                    let mother_bit = (transmission >> (2 * trio_index + 1)) & 1;
                    partition_of[sample][0] = partition_of[trio.father][father_bit];
                    partition_of[sample][1] = partition_of[trio.mother][mother_bit];
                }
                None => {
                    partition_of[sample] = [next, next + 1];
                    next += 2;
                }
            }
        }
        PedigreePartitions { count: next, partition_of }
    }

    /// Number of distinct haplotype classes: twice the founder count.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn partition(&self, sample: usize, haplotype: usize) -> usize {
        self.partition_of[sample][haplotype]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_sample() {
        let mut pedigree = Pedigree::new();
        pedigree.add_sample("only");
        let partitions = PedigreePartitions::new(&pedigree, 0);
        assert_eq!(partitions.count(), 2);
        assert_eq!(partitions.partition(0, 0), 0);
        assert_eq!(partitions.partition(0, 1), 1);
    }

    #[test]
    fn test_trio_inheritance() {
        let mut pedigree = Pedigree::new();
        let child = pedigree.add_sample("child");
        let father = pedigree.add_sample("father");
        let mother = pedigree.add_sample("mother");
        pedigree.add_trio("child", "father", "mother").unwrap();

        // transmission 0b00: child inherits father's slot 0, mother's slot 0
        let partitions = PedigreePartitions::new(&pedigree, 0b00);
        assert_eq!(partitions.count(), 4);
        assert_eq!(
            partitions.partition(child, 0),
            partitions.partition(father, 0)
        );
        assert_eq!(
            partitions.partition(child, 1),
            partitions.partition(mother, 0)
        );

        // flipping the mother bit reroutes only the maternal slot
        let partitions = PedigreePartitions::new(&pedigree, 0b10);
        assert_eq!(
            partitions.partition(child, 0),
            partitions.partition(father, 0)
        );
        assert_eq!(
            partitions.partition(child, 1),
            partitions.partition(mother, 1)
        );
    }
}
