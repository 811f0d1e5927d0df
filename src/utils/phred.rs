use bio::stats::LogProb;

lazy_static! {
    /// Error probability for each phred quality, precomputed once.
    static ref QUAL_TO_ERROR_PROB: Vec<f64> = (0..256u32)
        .map(|q| 10f64.powf(-(q as f64) / 10.0))
        .collect();
}

/// Phred-scaled integer costs saturate here; effectively "impossible".
pub const MAX_PHRED_COST: u32 = 1 << 24;

pub fn qual_to_error_prob(qual: u8) -> f64 {
    QUAL_TO_ERROR_PROB[qual as usize]
}

/// Turn log10 genotype likelihoods into phred-scaled costs relative to the
/// most likely genotype, i.e. the cheapest genotype has cost 0.
pub fn log10_likelihoods_to_costs(log10_likelihoods: &[f64]) -> Vec<u32> {
    assert!(!log10_likelihoods.is_empty());
    let probs: Vec<LogProb> = log10_likelihoods
        .iter()
        .map(|ll| LogProb(ll * std::f64::consts::LN_10))
        .collect();
    let norm = LogProb::ln_sum_exp(&probs);
    probs
        .iter()
        .map(|p| {
            let log10_posterior = (*p - norm).0 / std::f64::consts::LN_10;
            let phred = -10.0 * log10_posterior;
            if !phred.is_finite() || phred >= MAX_PHRED_COST as f64 {
                MAX_PHRED_COST
            } else {
                phred.round() as u32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qual_to_error_prob() {
        assert!((qual_to_error_prob(10) - 0.1).abs() < 1e-12);
        assert!((qual_to_error_prob(30) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_likelihoods_to_costs() {
        // equally likely genotypes cost the same
        let costs = log10_likelihoods_to_costs(&[-1.0, -1.0]);
        assert_eq!(costs[0], costs[1]);
        // a 10x less likely genotype costs ~10 phred more
        let costs = log10_likelihoods_to_costs(&[0.0, -1.0]);
        assert!(costs[0] < costs[1]);
        assert_eq!(costs[1] - costs[0], 10);
    }
}
