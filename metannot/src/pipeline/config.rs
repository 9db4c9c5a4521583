//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use metcore::algorithm::network::NetworkParams;
use metcore::algorithm::propagation::PropagationParams;
use metcore::annotate::scoring::ScoringParams;
use metcore::chemistry::adduct::Polarity;

use crate::error::MetannotError;

/// Full parameter set of one annotation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub polarity: Polarity,
    /// Precursor mass tolerance for adduct matching, in ppm.
    pub tolerance_ppm: f64,
    pub network: NetworkParams,
    pub propagation: PropagationParams,
    pub scoring: ScoringParams,
    /// Attempts per taxon lineage fetch.
    pub retry_attempts: u32,
    /// Rayon worker threads, 0 keeps the default pool size.
    pub num_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            polarity: Polarity::Positive,
            tolerance_ppm: 10.0,
            network: NetworkParams::default(),
            propagation: PropagationParams::default(),
            scoring: ScoringParams::default(),
            retry_attempts: 3,
            num_threads: 0,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), MetannotError> {
        if !(self.tolerance_ppm > 0.0 && self.tolerance_ppm.is_finite()) {
            return Err(MetannotError::Config(
                "tolerance_ppm must be a positive finite number".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(MetannotError::Config("retry_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
