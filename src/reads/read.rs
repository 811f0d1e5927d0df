use std::collections::BTreeSet;

use bstr::BString;

/// One allele observation inside a read: which allele the read supports at a
/// variant position and how confidently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadVariant {
    pub position: i64,
    pub allele: u8,
    pub quality: i32,
}

/// A read reduced to its variant observations: a sparse list of
/// `(position, allele, quality)` sorted by position, plus the header fields
/// the DP and the selector need.
#[derive(Debug, Clone)]
pub struct Read {
    pub name: BString,
    mapqs: Vec<u8>,
    pub source_id: usize,
    pub sample_id: usize,
    variants: Vec<ReadVariant>,
}

impl Read {
    pub fn new(name: &str, mapq: u8, source_id: usize, sample_id: usize) -> Read {
        Read {
            name: BString::from(name),
            mapqs: vec![mapq],
            source_id,
            sample_id,
            variants: Vec::new(),
        }
    }

    /// Positions must be added strictly increasing; violations are a bug in
    /// the caller, not recoverable input.
    pub fn add_variant(&mut self, position: i64, allele: u8, quality: i32) {
        if let Some(last) = self.variants.last() {
            assert!(
                last.position < position,
                "read {} alleles out of order: {} after {}",
                self.name,
                position,
                last.position
            );
        }
        self.variants.push(ReadVariant {
            position,
            allele,
            quality,
        });
    }

    pub fn add_mapq(&mut self, mapq: u8) {
        self.mapqs.push(mapq);
    }

    pub fn mapqs(&self) -> &[u8] {
        &self.mapqs
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn first_position(&self) -> i64 {
        self.variants.first().expect("empty read").position
    }

    pub fn last_position(&self) -> i64 {
        self.variants.last().expect("empty read").position
    }

    pub fn variant(&self, index: usize) -> &ReadVariant {
        &self.variants[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReadVariant> {
        self.variants.iter()
    }

    pub fn allele_at(&self, position: i64) -> Option<&ReadVariant> {
        self.variants
            .binary_search_by_key(&position, |v| v.position)
            .ok()
            .map(|i| &self.variants[i])
    }

    pub fn covers(&self, position: i64) -> bool {
        self.allele_at(position).is_some()
    }

    /// Drop observations at positions outside `keep`; used to restrict reads
    /// to the DP columns before selection.
    pub fn retain_positions(&mut self, keep: &BTreeSet<i64>) {
        self.variants.retain(|v| keep.contains(&v.position));
    }
}

/// Ordered, owning collection of reads. Selection never moves reads around;
/// it works with index subsets into this container.
#[derive(Debug, Clone, Default)]
pub struct ReadSet {
    reads: Vec<Read>,
}

impl ReadSet {
    pub fn new() -> ReadSet {
        ReadSet { reads: Vec::new() }
    }

    pub fn add(&mut self, read: Read) {
        self.reads.push(read);
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    pub fn get(&self, index: usize) -> &Read {
        &self.reads[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Read {
        &mut self.reads[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Read> {
        self.reads.iter()
    }

    /// All distinct variant positions covered by any read, sorted.
    pub fn positions(&self) -> Vec<i64> {
        let set: BTreeSet<i64> = self
            .reads
            .iter()
            .flat_map(|read| read.iter().map(|v| v.position))
            .collect();
        set.into_iter().collect()
    }

    /// Stable sort by (first position, name) so downstream index-based tie
    /// breaking is reproducible across runs.
    pub fn sort(&mut self) {
        self.reads.sort_by(|a, b| {
            let ka = (a.first_position(), &a.name);
            let kb = (b.first_position(), &b.name);
            ka.cmp(&kb)
        });
    }

    pub fn subset(&self, indices: &[usize]) -> ReadSet {
        ReadSet {
            reads: indices.iter().map(|&i| self.reads[i].clone()).collect(),
        }
    }
}

impl std::iter::FromIterator<Read> for ReadSet {
    fn from_iter<T: IntoIterator<Item = Read>>(iter: T) -> ReadSet {
        ReadSet {
            reads: iter.into_iter().collect(),
        }
    }
}
