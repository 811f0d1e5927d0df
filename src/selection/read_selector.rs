use std::collections::{BTreeSet, HashSet};

use multimap::MultiMap;

use crate::reads::read::{Read, ReadSet};
use crate::selection::component_finder::ComponentFinder;
use crate::selection::coverage_monitor::CoverageMonitor;
use crate::selection::priority_queue::PriorityQueue;
use crate::utils::position_index::PositionIndex;

/// Greedy selection of an informative subset of reads under a per-column
/// coverage cap, followed by a bridging pass that spends leftover coverage on
/// reads connecting otherwise separate blocks.
pub struct ReadSelector {
    max_coverage: usize,
    bridging: bool,
}

impl ReadSelector {
    pub fn new(max_coverage: usize) -> ReadSelector {
        ReadSelector {
            max_coverage,
            bridging: true,
        }
    }

    pub fn with_bridging(max_coverage: usize, bridging: bool) -> ReadSelector {
        ReadSelector {
            max_coverage,
            bridging,
        }
    }

    /// Indices of the selected reads, ascending. Only informative reads
    /// (two or more indexed positions) are considered at all.
    pub fn select(&self, read_set: &ReadSet, index: &PositionIndex) -> Vec<usize> {
        if index.is_empty() {
            return Vec::new();
        }

        // column index -> indices of reads covering it
        let mut position_reads: MultiMap<usize, usize> = MultiMap::new();
        for (read_index, read) in read_set.iter().enumerate() {
            for variant in read.iter() {
                if let Some(column) = index.index_of(variant.position) {
                    position_reads.insert(column, read_index);
                }
            }
        }

        let mut undecided: BTreeSet<usize> = (0..read_set.len())
            .filter(|&i| covered_columns(read_set.get(i), index).len() >= 2)
            .collect();
        let mut selected: BTreeSet<usize> = BTreeSet::new();
        let mut coverage = CoverageMonitor::new(index.len());
        let positions: Vec<i64> = index.iter().collect();
        let mut components = ComponentFinder::new(&positions);

        while !undecided.is_empty() {
            let mut queue = build_queue(read_set, &undecided, index);
            let (in_slice, violating) =
                self.select_slice(&mut queue, &mut coverage, read_set, index, &position_reads);
            for &read_index in &in_slice {
                selected.insert(read_index);
                undecided.remove(&read_index);
                merge_read_positions(read_set.get(read_index), index, &mut components);
            }
            for &read_index in &violating {
                undecided.remove(&read_index);
            }

            if self.bridging {
                let mut queue = build_queue(read_set, &undecided, index);
                while let Some((_, read_index)) = queue.pop() {
                    let read = read_set.get(read_index);
                    let (begin, end) = column_range(read, index);
                    if coverage.max_in_range(begin, end) >= self.max_coverage as u32 {
                        undecided.remove(&read_index);
                        continue;
                    }
                    let blocks: HashSet<i64> = read
                        .iter()
                        .filter(|v| index.index_of(v.position).is_some())
                        .map(|v| components.find(v.position))
                        .collect();
                    if blocks.len() < 2 {
                        // not a bridge; the next slice decides its fate
                        continue;
                    }
                    coverage.add(begin, end);
                    selected.insert(read_index);
                    undecided.remove(&read_index);
                    merge_read_positions(read, index, &mut components);
                }
            }
        }

        debug!(
            "selected {} of {} reads under coverage cap {}",
            selected.len(),
            read_set.len(),
            self.max_coverage
        );
        selected.into_iter().collect()
    }

    /// One greedy slice: pop reads best-first, drop coverage violators, admit
    /// reads that still cover something new, and discount the scores of
    /// queued reads made redundant by each admission.
    fn select_slice(
        &self,
        queue: &mut PriorityQueue,
        coverage: &mut CoverageMonitor,
        read_set: &ReadSet,
        index: &PositionIndex,
        position_reads: &MultiMap<usize, usize>,
    ) -> (BTreeSet<usize>, BTreeSet<usize>) {
        let mut covered_positions: HashSet<i64> = HashSet::new();
        let mut in_slice: BTreeSet<usize> = BTreeSet::new();
        let mut violating: BTreeSet<usize> = BTreeSet::new();

        while let Some((_, read_index)) = queue.pop() {
            let read = read_set.get(read_index);
            let covers_new = read
                .iter()
                .any(|v| index.index_of(v.position).is_some() && !covered_positions.contains(&v.position));
            let (begin, end) = column_range(read, index);
            if coverage.max_in_range(begin, end) >= self.max_coverage as u32 {
                violating.insert(read_index);
            } else if covers_new {
                coverage.add(begin, end);
                in_slice.insert(read_index);
                for variant in read.iter() {
                    let column = match index.index_of(variant.position) {
                        Some(column) => column,
                        None => continue,
                    };
                    covered_positions.insert(variant.position);
                    if let Some(sharing) = position_reads.get_vec(&column) {
                        for &other in sharing {
                            if in_slice.contains(&other) {
                                continue;
                            }
                            if let Some(score) = queue.score_of(other) {
                                queue.change_score(other, score - 1);
                            }
                        }
                    }
                }
            }
        }
        (in_slice, violating)
    }
}

/// Columns of the position index this read covers, ascending.
fn covered_columns(read: &Read, index: &PositionIndex) -> Vec<usize> {
    read.iter()
        .filter_map(|v| index.index_of(v.position))
        .collect()
}

fn column_range(read: &Read, index: &PositionIndex) -> (usize, usize) {
    let columns = covered_columns(read, index);
    (columns[0], *columns.last().unwrap())
}

/// Score = covered columns minus the physically-spanned-but-unsequenced gap
/// (paired-end reads pay for the columns their insert jumps over).
fn read_score(read: &Read, index: &PositionIndex) -> i64 {
    let columns = covered_columns(read, index);
    let covered = columns.len() as i64;
    let span = (*columns.last().unwrap() - columns[0] + 1) as i64;
    covered - (span - covered)
}

fn build_queue(read_set: &ReadSet, read_indices: &BTreeSet<usize>, index: &PositionIndex) -> PriorityQueue {
    let mut queue = PriorityQueue::new();
    for &read_index in read_indices {
        queue.push(read_score(read_set.get(read_index), index), read_index);
    }
    queue
}

fn merge_read_positions(read: &Read, index: &PositionIndex, components: &mut ComponentFinder) {
    let positions: Vec<i64> = read
        .iter()
        .map(|v| v.position)
        .filter(|&p| index.index_of(p).is_some())
        .collect();
    for &position in &positions[1..] {
        components.merge(positions[0], position);
    }
}
