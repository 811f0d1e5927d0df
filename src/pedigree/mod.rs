pub mod genetic_map;
pub mod recombination;

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::PhasingError;

/// One parent/parent/child relationship. Indices refer to the pedigree's
/// sample registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trio {
    pub child: usize,
    pub father: usize,
    pub mother: usize,
}

/// A pedigree over the phased samples: an arena of sample nodes with
/// parent→child edges, plus the trio list the DP enumerates transmission
/// bits over. Cycles and repeated child entries are rejected.
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    graph: DiGraph<String, ()>,
    order: Vec<NodeIndex>,
    index_of: HashMap<String, usize>,
    trios: Vec<Trio>,
}

impl Pedigree {
    pub fn new() -> Pedigree {
        Pedigree::default()
    }

    /// Register a sample; registering a name twice returns the existing
    /// index.
    pub fn add_sample(&mut self, name: &str) -> usize {
        if let Some(&index) = self.index_of.get(name) {
            return index;
        }
        let node = self.graph.add_node(name.to_owned());
        self.order.push(node);
        let index = self.order.len() - 1;
        self.index_of.insert(name.to_owned(), index);
        index
    }

    pub fn add_trio(&mut self, child: &str, father: &str, mother: &str) -> Result<(), PhasingError> {
        let child_index = self
            .sample_index(child)
            .ok_or_else(|| PhasingError::invalid_input(0, format!("unknown sample {}", child)))?;
        let father_index = self
            .sample_index(father)
            .ok_or_else(|| PhasingError::invalid_input(0, format!("unknown sample {}", father)))?;
        let mother_index = self
            .sample_index(mother)
            .ok_or_else(|| PhasingError::invalid_input(0, format!("unknown sample {}", mother)))?;
        if self.trios.iter().any(|t| t.child == child_index) {
            return Err(PhasingError::invalid_input(
                0,
                format!("sample {} is the child of more than one trio", child),
            ));
        }
        self.graph
            .add_edge(self.order[father_index], self.order[child_index], ());
        self.graph
            .add_edge(self.order[mother_index], self.order[child_index], ());
        self.trios.push(Trio {
            child: child_index,
            father: father_index,
            mother: mother_index,
        });
        if toposort(&self.graph, None).is_err() {
            return Err(PhasingError::invalid_input(
                0,
                format!("pedigree is cyclic at sample {}", child),
            ));
        }
        Ok(())
    }

    pub fn sample_count(&self) -> usize {
        self.order.len()
    }

    pub fn sample_name(&self, index: usize) -> &str {
        &self.graph[self.order[index]]
    }

    pub fn sample_index(&self, name: &str) -> Option<usize> {
        self.index_of.get(name).copied()
    }

    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(move |&node| self.graph[node].as_str())
    }

    pub fn trios(&self) -> &[Trio] {
        &self.trios
    }

    /// A founder has no parents inside this pedigree.
    pub fn is_founder(&self, index: usize) -> bool {
        !self.trios.iter().any(|t| t.child == index)
    }

    pub fn founder_count(&self) -> usize {
        (0..self.sample_count()).filter(|&i| self.is_founder(i)).count()
    }

    /// Sample indices ordered parents-before-children; the partition
    /// computation walks this.
    pub fn topological_order(&self) -> Vec<usize> {
        let sorted = toposort(&self.graph, None).expect("pedigree cycles are rejected on insert");
        let node_to_index: HashMap<NodeIndex, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, &node)| (node, i))
            .collect();
        sorted.into_iter().map(|node| node_to_index[&node]).collect()
    }

    /// Number of transmission bits the DP enumerates: two per trio.
    pub fn transmission_bit_count(&self) -> usize {
        2 * self.trios.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trio_registration() {
        let mut pedigree = Pedigree::new();
        pedigree.add_sample("child");
        pedigree.add_sample("father");
        pedigree.add_sample("mother");
        pedigree.add_trio("child", "father", "mother").unwrap();
        assert_eq!(pedigree.trios().len(), 1);
        assert!(pedigree.is_founder(1));
        assert!(pedigree.is_founder(2));
        assert!(!pedigree.is_founder(0));
        assert_eq!(pedigree.founder_count(), 2);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut pedigree = Pedigree::new();
        pedigree.add_sample("a");
        pedigree.add_sample("b");
        pedigree.add_sample("c");
        pedigree.add_trio("a", "b", "c").unwrap();
        assert!(pedigree.add_trio("b", "a", "c").is_err());
    }

    #[test]
    fn test_topological_order_parents_first() {
        let mut pedigree = Pedigree::new();
        pedigree.add_sample("grandchild");
        pedigree.add_sample("child");
        pedigree.add_sample("a");
        pedigree.add_sample("b");
        pedigree.add_sample("c");
        pedigree.add_trio("child", "a", "b").unwrap();
        pedigree.add_trio("grandchild", "child", "c").unwrap();
        let order = pedigree.topological_order();
        let pos = |i: usize| order.iter().position(|&x| x == i).unwrap();
        assert!(pos(2) < pos(1));
        assert!(pos(3) < pos(1));
        assert!(pos(1) < pos(0));
        assert!(pos(4) < pos(0));
    }
}
