use std::collections::HashMap;

/// Disjoint sets over variant positions, used to track which positions end up
/// in the same haplotype block. Union-by-rank with path compression; the
/// representative of a set is always its smallest position so block ids are
/// stable.
#[derive(Debug, Clone)]
pub struct ComponentFinder {
    index: HashMap<i64, usize>,
    keys: Vec<i64>,
    parent: Vec<usize>,
    rank: Vec<u32>,
}

impl ComponentFinder {
    pub fn new(positions: &[i64]) -> ComponentFinder {
        let mut index = HashMap::with_capacity(positions.len());
        let mut keys = Vec::with_capacity(positions.len());
        for (i, &pos) in positions.iter().enumerate() {
            index.insert(pos, i);
            keys.push(pos);
        }
        let n = positions.len();
        ComponentFinder {
            index,
            keys,
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn contains(&self, position: i64) -> bool {
        self.index.contains_key(&position)
    }

    fn find_root(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            // halve the path on the way up
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    /// Representative position of the set containing `position`.
    pub fn find(&mut self, position: i64) -> i64 {
        let node = *self.index.get(&position).expect("unknown position");
        let root = self.find_root(node);
        self.keys[root]
    }

    pub fn merge(&mut self, a: i64, b: i64) {
        let node_a = *self.index.get(&a).expect("unknown position");
        let node_b = *self.index.get(&b).expect("unknown position");
        let mut root_a = self.find_root(node_a);
        let mut root_b = self.find_root(node_b);
        if root_a == root_b {
            return;
        }
        if self.rank[root_a] < self.rank[root_b] {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        if self.rank[root_a] == self.rank[root_b] {
            self.rank[root_a] += 1;
        }
        self.parent[root_b] = root_a;
        // keep the smallest position as the set's key
        if self.keys[root_b] < self.keys[root_a] {
            self.keys[root_a] = self.keys[root_b];
        }
    }

    pub fn same_component(&mut self, a: i64, b: i64) -> bool {
        self.find(a) == self.find(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_find() {
        let mut finder = ComponentFinder::new(&[100, 200, 300, 400]);
        assert_eq!(finder.find(300), 300);
        finder.merge(200, 300);
        assert_eq!(finder.find(300), 200);
        assert_eq!(finder.find(200), 200);
        finder.merge(300, 100);
        assert_eq!(finder.find(300), 100);
        assert!(!finder.same_component(100, 400));
        assert!(finder.same_component(100, 200));
    }

    #[test]
    fn test_representative_is_smallest() {
        let mut finder = ComponentFinder::new(&[10, 20, 30]);
        finder.merge(30, 20);
        finder.merge(20, 10);
        assert_eq!(finder.find(30), 10);
        assert_eq!(finder.find(20), 10);
    }
}
