use std::time::Instant;

use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::simulation::{hq_percent, Simulation, TerminationReason};

pub const DEFAULT_TRIALS: usize = 200;

/// Summary of a set of samples, nearest-rank percentiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub median: u32,
    pub p10: u32,
    pub p25: u32,
    pub p75: u32,
    pub p90: u32,
}

impl Distribution {
    pub fn from_samples(mut samples: Vec<u32>) -> Distribution {
        if samples.is_empty() {
            return Distribution::default();
        }
        samples.sort_unstable();
        let total: u64 = samples.iter().map(|&v| v as u64).sum();
        Distribution {
            min: samples[0],
            max: samples[samples.len() - 1],
            mean: total as f64 / samples.len() as f64,
            median: percentile(&samples, 50.),
            p10: percentile(&samples, 10.),
            p25: percentile(&samples, 25.),
            p75: percentile(&samples, 75.),
            p90: percentile(&samples, 90.),
        }
    }
}

fn percentile(sorted: &[u32], p: f64) -> u32 {
    let rank = (p / 100. * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReliabilityReport {
    pub trials: usize,
    pub successes: usize,
    pub success_rate: f64,
    /// Final quality over every trial, failed ones included.
    pub quality: Distribution,
    pub hq_percent: Distribution,
    /// How many trials ended for each reason, in first-seen order.
    pub terminations: Vec<(TerminationReason, usize)>,
}

#[derive(Debug, Clone, Copy)]
struct Trial {
    success: bool,
    quality: u32,
    reason: TerminationReason,
}

impl SimulationReliabilityReport {
    fn from_trials(trials: &[Trial], max_quality: u32) -> SimulationReliabilityReport {
        let successes = trials.iter().filter(|t| t.success).count();
        let mut terminations: Vec<(TerminationReason, usize)> = Vec::new();
        for trial in trials {
            match terminations.iter_mut().find(|(reason, _)| *reason == trial.reason) {
                Some((_, count)) => *count += 1,
                None => terminations.push((trial.reason, 1)),
            }
        }
        SimulationReliabilityReport {
            trials: trials.len(),
            successes,
            success_rate: if trials.is_empty() {
                0.
            } else {
                successes as f64 / trials.len() as f64
            },
            quality: Distribution::from_samples(trials.iter().map(|t| t.quality).collect()),
            hq_percent: Distribution::from_samples(
                trials.iter().map(|t| hq_percent(t.quality, max_quality) as u32).collect(),
            ),
            terminations,
        }
    }
}

impl Simulation {
    /// Report over the configured number of trials.
    pub fn get_reliability_report(&self) -> SimulationReliabilityReport {
        self.reliability_report(self.options().trials)
    }

    /// Runs `trials` independent crafts of the same rotation. Trial `i` draws
    /// from stream `i` of a generator seeded once per report, so a fixed seed
    /// gives the same report whatever the thread count.
    pub fn reliability_report(&self, trials: usize) -> SimulationReliabilityReport {
        let start = Instant::now();
        let seed = self.options().seed.unwrap_or_else(rand::random);
        let results: Vec<Trial> = (0..trials)
            .into_par_iter()
            .map(|trial| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(trial as u64);
                let mut state = self.initial_state();
                let result = self.play(&mut state, &mut rng, false);
                Trial {
                    success: result.success,
                    quality: result.state.quality,
                    reason: result.reason,
                }
            })
            .collect();
        let report = SimulationReliabilityReport::from_trials(&results, self.recipe().quality);
        info!(
            "{} trials, {:.1}% success, median quality {} ({}ms)",
            report.trials,
            report.success_rate * 100.,
            report.quality.median,
            start.elapsed().as_millis()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_nearest_rank() {
        let dist = Distribution::from_samples((1..=10).rev().collect());
        assert_eq!(dist.min, 1);
        assert_eq!(dist.max, 10);
        assert_eq!(dist.median, 5);
        assert_eq!(dist.p10, 1);
        assert_eq!(dist.p25, 3);
        assert_eq!(dist.p75, 8);
        assert_eq!(dist.p90, 9);
        assert!((dist.mean - 5.5).abs() < 1e-9);
    }

    #[test]
    fn empty_samples() {
        assert_eq!(Distribution::from_samples(Vec::new()), Distribution::default());
    }

    #[test]
    fn counts_terminations() {
        let trials = [
            Trial { success: true, quality: 100, reason: TerminationReason::Completed },
            Trial { success: false, quality: 50, reason: TerminationReason::RotationExhausted },
            Trial { success: true, quality: 200, reason: TerminationReason::Completed },
        ];
        let report = SimulationReliabilityReport::from_trials(&trials, 200);
        assert_eq!(report.successes, 2);
        assert!((report.success_rate - 2. / 3.).abs() < 1e-9);
        assert_eq!(report.terminations, vec![
            (TerminationReason::Completed, 2),
            (TerminationReason::RotationExhausted, 1),
        ]);
        assert_eq!(report.quality.min, 50);
        assert_eq!(report.hq_percent.max, 100);
    }
}
