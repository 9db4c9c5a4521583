use serde::{Deserialize, Serialize};

use crate::chemistry::adduct::Polarity;
use crate::data::spectrum::MzSpectrum;
use crate::error::MetcoreError;

/// One detected feature of a sample: a precursor ion together with its
/// fragmentation spectrum. Immutable once a sample is loaded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feature {
    pub feature_id: u32,
    /// Precursor m/z of the feature.
    pub mz: f64,
    /// Retention time in seconds.
    pub rt: f64,
    pub intensity: f64,
    pub polarity: Polarity,
    pub spectrum: MzSpectrum,
}

impl Feature {
    pub fn new(
        feature_id: u32,
        mz: f64,
        rt: f64,
        intensity: f64,
        polarity: Polarity,
        spectrum: MzSpectrum,
    ) -> Self {
        Feature { feature_id, mz, rt, intensity, polarity, spectrum }
    }

    /// Check the feature for data anomalies that exclude it from annotation.
    ///
    /// Rejected are features with an empty peak list, a non-finite or
    /// non-positive precursor m/z, and fragment peaks above the precursor
    /// (plus an isolation guard), which indicates mismatching spectrum
    /// metadata.
    pub fn validate(&self) -> Result<(), MetcoreError> {
        if self.spectrum.is_empty() {
            return Err(MetcoreError::InvalidFeature {
                feature_id: self.feature_id,
                reason: "empty peak list".to_string(),
            });
        }
        if !self.mz.is_finite() || self.mz <= 0.0 {
            return Err(MetcoreError::InvalidFeature {
                feature_id: self.feature_id,
                reason: format!("precursor m/z {} is not a valid mass", self.mz),
            });
        }
        // Isolation windows are about 1 m/z wide, fragments further above the
        // precursor cannot come from it.
        let guard = self.mz + 1.5;
        if let Some(&highest) = self.spectrum.mz.last() {
            if highest > guard {
                return Err(MetcoreError::InvalidFeature {
                    feature_id: self.feature_id,
                    reason: format!(
                        "fragment m/z {} above precursor m/z {}",
                        highest, self.mz
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_with(mz: f64, spectrum: MzSpectrum) -> Feature {
        Feature::new(1, mz, 120.0, 1e5, Polarity::Positive, spectrum)
    }

    #[test]
    fn test_valid_feature_passes() {
        let spectrum = MzSpectrum::new(vec![85.02, 127.03, 163.06], vec![10.0, 40.0, 100.0]);
        assert!(feature_with(181.07, spectrum).validate().is_ok());
    }

    #[test]
    fn test_empty_peak_list_rejected() {
        let feature = feature_with(181.07, MzSpectrum::new(Vec::new(), Vec::new()));
        assert!(matches!(
            feature.validate(),
            Err(MetcoreError::InvalidFeature { feature_id: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_precursor_rejected() {
        let spectrum = MzSpectrum::new(vec![85.02], vec![10.0]);
        assert!(feature_with(f64::NAN, spectrum.clone()).validate().is_err());
        assert!(feature_with(-5.0, spectrum).validate().is_err());
    }

    #[test]
    fn test_fragment_above_precursor_rejected() {
        let spectrum = MzSpectrum::new(vec![85.02, 400.0], vec![10.0, 5.0]);
        assert!(feature_with(181.07, spectrum).validate().is_err());
    }
}
