use serde_derive::Serialize;

use crate::pedigree::genetic_map::GeneticMap;
use crate::pedigree::{Pedigree, Trio};

/// Ceiling for per-column recombination costs. Zero genetic distance would
/// make a crossover infinitely expensive; clamping keeps degenerate maps
/// phaseable.
pub const MAX_RECOMB_COST: u32 = 15_000;

/// Haldane map function: centiMorgan distance to crossover probability, then
/// phred-scaled.
fn centimorgan_to_phred(distance: f64) -> f64 {
    assert!(distance >= 0.0);
    let probability = (1.0 - (-2.0 * distance / 100.0).exp()) / 2.0;
    -10.0 * probability.log10()
}

fn clamp_cost(phred: f64) -> u32 {
    if !phred.is_finite() || phred >= MAX_RECOMB_COST as f64 {
        MAX_RECOMB_COST
    } else {
        phred.round() as u32
    }
}

/// Per-column crossover costs from a genetic map. `costs[0]` is unused and
/// zero; `costs[i]` prices a crossover between columns i-1 and i.
pub fn recombination_cost_map(map: &GeneticMap, positions: &[i64]) -> Vec<u32> {
    let mut costs = Vec::with_capacity(positions.len());
    costs.push(0);
    for pair in positions.windows(2) {
        costs.push(recombination_cost(map, pair[0], pair[1]));
    }
    costs
}

/// Phred cost of a single crossover between two positions under a genetic
/// map.
pub fn recombination_cost(map: &GeneticMap, position_a: i64, position_b: i64) -> u32 {
    let distance = map.distance(position_a, position_b);
    if distance <= 0.0 {
        MAX_RECOMB_COST
    } else {
        clamp_cost(centimorgan_to_phred(distance))
    }
}

/// Per-column crossover costs from a constant rate in cM/Mb.
pub fn uniform_recombination_map(rate_cm_per_mb: f64, positions: &[i64]) -> Vec<u32> {
    let mut costs = Vec::with_capacity(positions.len());
    costs.push(0);
    for pair in positions.windows(2) {
        let distance = rate_cm_per_mb * (pair[1] - pair[0]) as f64 / 1_000_000.0;
        if distance <= 0.0 {
            costs.push(MAX_RECOMB_COST);
        } else {
            costs.push(clamp_cost(centimorgan_to_phred(distance)));
        }
    }
    costs
}

/// An inferred crossover in one meiosis, located between two adjacent
/// phased columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecombinationEvent {
    pub child: String,
    pub position1: i64,
    pub position2: i64,
    pub transmitted_hap_father1: u8,
    pub transmitted_hap_father2: u8,
    pub transmitted_hap_mother1: u8,
    pub transmitted_hap_mother2: u8,
    pub recombination_cost: u32,
}

fn trio_bits(transmission: usize, trio_index: usize) -> (u8, u8) {
    (
        ((transmission >> (2 * trio_index)) & 1) as u8,
        ((transmission >> (2 * trio_index + 1)) & 1) as u8,
    )
}

/// Scan a backtraced per-column transmission vector for bit changes and emit
/// one event per meiosis whose inheritance flipped.
pub fn find_recombination_events(
    transmission: &[usize],
    pedigree: &Pedigree,
    positions: &[i64],
    recombination_costs: &[u32],
) -> Vec<RecombinationEvent> {
    assert_eq!(transmission.len(), positions.len());
    assert_eq!(recombination_costs.len(), positions.len());
    let mut events = Vec::new();
    for i in 1..transmission.len() {
        if transmission[i] == transmission[i - 1] {
            continue;
        }
        for (trio_index, trio) in pedigree.trios().iter().enumerate() {
            let (father_before, mother_before) = trio_bits(transmission[i - 1], trio_index);
            let (father_after, mother_after) = trio_bits(transmission[i], trio_index);
            if father_before == father_after && mother_before == mother_after {
                continue;
            }
            let Trio { child, .. } = *trio;
            events.push(RecombinationEvent {
                child: pedigree.sample_name(child).to_owned(),
                position1: positions[i - 1],
                position2: positions[i],
                transmitted_hap_father1: father_before,
                transmitted_hap_father2: father_after,
                transmitted_hap_mother1: mother_before,
                transmitted_hap_mother2: mother_after,
                recombination_cost: recombination_costs[i],
            });
        }
    }
    events
}
