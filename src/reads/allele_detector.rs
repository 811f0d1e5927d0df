use std::collections::HashSet;

use hashlink::LinkedHashMap;
use rust_htslib::bam::record::Cigar;

use crate::error::PhasingError;
use crate::model::variant::Variant;
use crate::reads::aligned_read::AlignedRead;
use crate::reads::read::{Read, ReadSet};

/// Base quality assumed when the input carries none, and for indel alleles
/// whose support spans several bases.
pub const DEFAULT_QUALITY: i32 = 30;

/// Re-discovers variant alleles inside aligned reads. A VCF knows where the
/// variants are, an alignment knows what the read looks like; this walks the
/// alignment operations over the sorted variant list and emits the allele each
/// read supports at each covered position.
pub struct AlleleDetector {
    mapq_threshold: u8,
}

impl AlleleDetector {
    pub fn new(mapq_threshold: u8) -> AlleleDetector {
        AlleleDetector { mapq_threshold }
    }

    /// Build a `ReadSet` for one chromosome: filter alignments, detect
    /// alleles, group by read name and merge mates. Names seen more than
    /// twice are an input error.
    pub fn build_read_set(
        &self,
        variants: &[Variant],
        alignments: &[AlignedRead],
        sample_id: usize,
        source_id: usize,
    ) -> Result<ReadSet, PhasingError> {
        for (i, pair) in variants.windows(2).enumerate() {
            if pair[0].position >= pair[1].position {
                return Err(PhasingError::invalid_input(
                    i + 1,
                    format!("variant position {} occurs out of order", pair[1].position),
                ));
            }
        }

        // Read-name order of first appearance keeps the output deterministic.
        let mut grouped: LinkedHashMap<Vec<u8>, Vec<Read>> = LinkedHashMap::new();
        for alignment in alignments {
            if !alignment.is_accepted(self.mapq_threshold) {
                continue;
            }
            // First variant not strictly left of this alignment.
            let j = variants.partition_point(|v| v.position < alignment.pos);
            let mut read = Read::new(
                &alignment.name.to_string(),
                alignment.mapq,
                source_id,
                sample_id,
            );
            for observation in self.detect_alleles(variants, j, alignment)? {
                read.add_variant(observation.0, observation.1, observation.2);
            }
            if !read.is_empty() {
                grouped
                    .entry(alignment.name.to_vec())
                    .or_insert_with(Vec::new)
                    .push(read);
            }
        }

        let mut read_set = ReadSet::new();
        for (name, mut mates) in grouped {
            match mates.len() {
                1 => read_set.add(mates.pop().unwrap()),
                2 => {
                    let second = mates.pop().unwrap();
                    let first = mates.pop().unwrap();
                    read_set.add(merge_pair(&first, &second));
                }
                n => {
                    return Err(PhasingError::invalid_input(
                        0,
                        format!(
                            "read name {:?} occurs {} times in the input",
                            String::from_utf8_lossy(&name),
                            n
                        ),
                    ));
                }
            }
        }
        read_set.sort();
        Ok(read_set)
    }

    /// Walk one alignment against the variant list starting at variant index
    /// `j` and yield `(position, allele, quality)` triples. Each position is
    /// emitted at most once per read; the first call wins.
    pub fn detect_alleles(
        &self,
        variants: &[Variant],
        start_index: usize,
        alignment: &AlignedRead,
    ) -> Result<Vec<(i64, u8, i32)>, PhasingError> {
        let mut ref_pos = alignment.pos;
        let mut query_pos: usize = 0;
        let mut j = start_index;
        let n = variants.len();
        let mut seen: HashSet<i64> = HashSet::new();
        let mut emitted: Vec<(i64, u8, i32)> = Vec::new();

        let mut emit = |seen: &mut HashSet<i64>, position: i64, allele: u8, quality: i32| {
            if seen.insert(position) {
                emitted.push((position, allele, quality));
            } else {
                debug!(
                    "two variant calls at position {}; keeping the first",
                    position
                );
            }
        };

        for op in &alignment.cigar {
            while j < n && variants[j].position < ref_pos {
                j += 1;
            }
            match *op {
                Cigar::Match(length) | Cigar::Equal(length) | Cigar::Diff(length) => {
                    let region_end = ref_pos + length as i64;
                    while j < n && variants[j].position < region_end {
                        let variant = &variants[j];
                        if variant.is_snv() {
                            let offset = (variant.position - ref_pos) as usize;
                            let base = alignment.sequence[query_pos + offset];
                            let allele = if base == variant.reference_allele[0] {
                                Some(0)
                            } else if base == variant.alternative_allele[0] {
                                Some(1)
                            } else {
                                None
                            };
                            if let Some(allele) = allele {
                                let quality = alignment
                                    .base_qualities
                                    .as_ref()
                                    .map(|quals| quals[query_pos + offset] as i32)
                                    .unwrap_or(DEFAULT_QUALITY);
                                emit(&mut seen, variant.position, allele, quality);
                            }
                        } else if variant.is_insertion() {
                            // Inside a match region the insertion did not
                            // happen: the read supports the reference.
                            emit(&mut seen, variant.position, 0, DEFAULT_QUALITY);
                        } else if variant.is_deletion() {
                            let deletion_end =
                                variant.position + variant.reference_allele.len() as i64;
                            if !(j + 1 < n && variants[j + 1].position < deletion_end) {
                                emit(&mut seen, variant.position, 0, DEFAULT_QUALITY);
                            } else {
                                info!(
                                    "skipped a deletion overlapping another variant at position {}",
                                    variant.position
                                );
                                while j + 1 < n && variants[j + 1].position < deletion_end {
                                    j += 1;
                                }
                            }
                        } else {
                            return Err(PhasingError::invalid_input(
                                j,
                                format!(
                                    "variant at position {} is neither SNV, insertion nor deletion",
                                    variant.position
                                ),
                            ));
                        }
                        j += 1;
                    }
                    query_pos += length as usize;
                    ref_pos += length as i64;
                }
                Cigar::Ins(length) => {
                    if j < n
                        && variants[j].position == ref_pos
                        && variants[j].is_insertion()
                        && variants[j].alternative_allele
                            == alignment.sequence[query_pos..query_pos + length as usize]
                    {
                        emit(&mut seen, variants[j].position, 1, DEFAULT_QUALITY);
                        j += 1;
                    }
                    query_pos += length as usize;
                }
                Cigar::Del(length) => {
                    // Only the deletion length is checked; the deleted
                    // sequence itself is not available without the reference.
                    if j < n
                        && variants[j].position == ref_pos
                        && variants[j].is_deletion()
                        && variants[j].reference_allele.len() == length as usize
                    {
                        let deletion_end =
                            variants[j].position + variants[j].reference_allele.len() as i64;
                        if !(j + 1 < n && variants[j + 1].position < deletion_end) {
                            emit(&mut seen, variants[j].position, 1, DEFAULT_QUALITY);
                        } else {
                            info!(
                                "skipped a deletion overlapping another variant at position {}",
                                variants[j].position
                            );
                            while j + 1 < n && variants[j + 1].position < deletion_end {
                                j += 1;
                            }
                        }
                        j += 1;
                    }
                    ref_pos += length as i64;
                }
                Cigar::RefSkip(length) => {
                    ref_pos += length as i64;
                }
                Cigar::SoftClip(length) => {
                    query_pos += length as usize;
                }
                Cigar::HardClip(_) | Cigar::Pad(_) => {}
            }
        }
        Ok(emitted)
    }
}

/// Merge the two mates of a fragment into one read. Position-unique entries
/// carry through; on position ties agreeing alleles merge with summed
/// quality, disagreeing ones keep the higher-quality call.
pub fn merge_pair(read1: &Read, read2: &Read) -> Read {
    let mut result = Read::new(
        &read1.name.to_string(),
        read1.mapqs()[0],
        read1.source_id,
        read1.sample_id,
    );
    result.add_mapq(read2.mapqs()[0]);

    let mut i1 = 0;
    let mut i2 = 0;
    while i1 < read1.len() || i2 < read2.len() {
        if i1 == read1.len() {
            let v = read2.variant(i2);
            result.add_variant(v.position, v.allele, v.quality);
            i2 += 1;
        } else if i2 == read2.len() {
            let v = read1.variant(i1);
            result.add_variant(v.position, v.allele, v.quality);
            i1 += 1;
        } else {
            let v1 = read1.variant(i1);
            let v2 = read2.variant(i2);
            if v2.position < v1.position {
                result.add_variant(v2.position, v2.allele, v2.quality);
                i2 += 1;
            } else if v2.position > v1.position {
                result.add_variant(v1.position, v1.allele, v1.quality);
                i1 += 1;
            } else if v1.allele == v2.allele {
                result.add_variant(v1.position, v1.allele, v1.quality + v2.quality);
                i1 += 1;
                i2 += 1;
            } else {
                if v1.quality >= v2.quality {
                    result.add_variant(v1.position, v1.allele, v1.quality);
                } else {
                    result.add_variant(v2.position, v2.allele, v2.quality);
                }
                i1 += 1;
                i2 += 1;
            }
        }
    }
    result
}
