use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::PhasingError;

/// One row of a genetic map: physical position and its genetic coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapEntry {
    pub position: i64,
    pub centimorgan: f64,
}

/// Piecewise-linear map from base-pair positions to centiMorgan coordinates.
/// Outside the mapped interval the genetic coordinate is clamped to the
/// nearest end.
#[derive(Debug, Clone)]
pub struct GeneticMap {
    entries: Vec<MapEntry>,
}

impl GeneticMap {
    pub fn new(entries: Vec<MapEntry>) -> Result<GeneticMap, PhasingError> {
        if entries.is_empty() {
            return Err(PhasingError::invalid_input(0, "genetic map is empty"));
        }
        for (i, pair) in entries.windows(2).enumerate() {
            if pair[0].position >= pair[1].position {
                return Err(PhasingError::invalid_input(
                    i + 1,
                    "genetic map positions not strictly increasing",
                ));
            }
            if pair[0].centimorgan > pair[1].centimorgan {
                return Err(PhasingError::invalid_input(
                    i + 1,
                    "genetic map centiMorgan values decrease",
                ));
            }
        }
        Ok(GeneticMap { entries })
    }

    /// Load whitespace-separated `position centiMorgan` rows; lines starting
    /// with `#` are comments.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<GeneticMap, PhasingError> {
        let file = File::open(path.as_ref()).map_err(|e| {
            PhasingError::invalid_input(
                0,
                format!("cannot open genetic map {}: {}", path.as_ref().display(), e),
            )
        })?;
        let mut entries = Vec::new();
        for (line_number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                PhasingError::invalid_input(line_number, format!("genetic map read error: {}", e))
            })?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let entry = match (fields.next(), fields.next()) {
                (Some(position), Some(centimorgan)) => {
                    match (position.parse::<i64>(), centimorgan.parse::<f64>()) {
                        (Ok(position), Ok(centimorgan)) => MapEntry {
                            position,
                            centimorgan,
                        },
                        _ => {
                            return Err(PhasingError::invalid_input(
                                line_number,
                                format!("malformed genetic map line: {:?}", line),
                            ))
                        }
                    }
                }
                _ => {
                    return Err(PhasingError::invalid_input(
                        line_number,
                        format!("malformed genetic map line: {:?}", line),
                    ))
                }
            };
            entries.push(entry);
        }
        info!("loaded genetic map with {} entries", entries.len());
        GeneticMap::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Genetic coordinate of a physical position, linearly interpolated.
    pub fn centimorgan_at(&self, position: i64) -> f64 {
        let first = self.entries.first().unwrap();
        let last = self.entries.last().unwrap();
        if position <= first.position {
            return first.centimorgan;
        }
        if position >= last.position {
            return last.centimorgan;
        }
        let right = self
            .entries
            .partition_point(|e| e.position < position);
        let hi = self.entries[right];
        let lo = self.entries[right - 1];
        if hi.position == position {
            return hi.centimorgan;
        }
        let fraction = (position - lo.position) as f64 / (hi.position - lo.position) as f64;
        lo.centimorgan + fraction * (hi.centimorgan - lo.centimorgan)
    }

    /// Genetic distance between two physical positions, in centiMorgan.
    pub fn distance(&self, position_a: i64, position_b: i64) -> f64 {
        (self.centimorgan_at(position_b) - self.centimorgan_at(position_a)).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> GeneticMap {
        GeneticMap::new(vec![
            MapEntry {
                position: 1000,
                centimorgan: 0.0,
            },
            MapEntry {
                position: 2000,
                centimorgan: 1.0,
            },
            MapEntry {
                position: 4000,
                centimorgan: 1.5,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_interpolation() {
        let m = map();
        assert!((m.centimorgan_at(1500) - 0.5).abs() < 1e-9);
        assert!((m.centimorgan_at(2000) - 1.0).abs() < 1e-9);
        assert!((m.centimorgan_at(3000) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_clamping() {
        let m = map();
        assert!((m.centimorgan_at(10) - 0.0).abs() < 1e-9);
        assert!((m.centimorgan_at(100_000) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_decreasing() {
        assert!(GeneticMap::new(vec![
            MapEntry {
                position: 10,
                centimorgan: 1.0
            },
            MapEntry {
                position: 20,
                centimorgan: 0.5
            },
        ])
        .is_err());
    }
}
