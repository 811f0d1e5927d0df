use indexmap::IndexSet;

use crate::error::PhasingError;

/// Bijection between variant positions and the dense column indices used by
/// the DP and the coverage monitor.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    positions: IndexSet<i64>,
}

impl PositionIndex {
    /// Build from a strictly increasing position list.
    pub fn new(positions: &[i64]) -> Result<PositionIndex, PhasingError> {
        let mut set = IndexSet::with_capacity(positions.len());
        for (i, &pos) in positions.iter().enumerate() {
            if i > 0 && positions[i - 1] >= pos {
                return Err(PhasingError::invalid_input(
                    i,
                    format!("positions not strictly increasing: {} after {}", pos, positions[i - 1]),
                ));
            }
            set.insert(pos);
        }
        Ok(PositionIndex { positions: set })
    }

    pub fn index_of(&self, position: i64) -> Option<usize> {
        self.positions.get_index_of(&position)
    }

    pub fn position_of(&self, index: usize) -> i64 {
        *self
            .positions
            .get_index(index)
            .expect("column index out of range")
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.positions.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let index = PositionIndex::new(&[100, 200, 350]).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.index_of(200), Some(1));
        assert_eq!(index.index_of(150), None);
        assert_eq!(index.position_of(2), 350);
    }

    #[test]
    fn test_rejects_unsorted() {
        assert!(PositionIndex::new(&[100, 100]).is_err());
        assert!(PositionIndex::new(&[200, 100]).is_err());
    }
}
