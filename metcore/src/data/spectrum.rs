use serde::{Deserialize, Serialize};

/// Represents a mass spectrum with associated m/z values and intensities.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MzSpectrum {
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl MzSpectrum {
    /// Constructs a new `MzSpectrum`, sorted by m/z.
    ///
    /// # Arguments
    ///
    /// * `mz` - A vector of m/z values.
    /// * `intensity` - A vector of intensity values corresponding to the m/z values.
    ///
    /// # Panics
    ///
    /// Panics if the lengths of `mz` and `intensity` are not the same. Callers
    /// ingesting untrusted peak lists must check lengths beforehand.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use metcore::data::spectrum::MzSpectrum;
    /// let spectrum = MzSpectrum::new(vec![200.0, 100.0], vec![20.0, 10.0]);
    /// assert_eq!(spectrum.mz, vec![100.0, 200.0]);
    /// assert_eq!(spectrum.intensity, vec![10.0, 20.0]);
    /// ```
    pub fn new(mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        assert_eq!(mz.len(), intensity.len(), "mz and intensity vectors must have the same length");
        // make sure mz and intensity are sorted by mz
        let mut mz_intensity: Vec<(f64, f64)> = mz.iter().zip(intensity.iter()).map(|(m, i)| (*m, *i)).collect();
        mz_intensity.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        MzSpectrum {
            mz: mz_intensity.iter().map(|(m, _)| *m).collect(),
            intensity: mz_intensity.iter().map(|(_, i)| *i).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// The (m/z, intensity) pair of the most intense peak, if any.
    pub fn base_peak(&self) -> Option<(f64, f64)> {
        self.intensity
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, &intensity)| (self.mz[idx], intensity))
    }

    /// A copy with intensities scaled so the base peak has intensity 1.0.
    /// Spectra without signal are returned unchanged.
    pub fn normalized(&self) -> Self {
        match self.base_peak() {
            Some((_, max)) if max > 0.0 => MzSpectrum {
                mz: self.mz.clone(),
                intensity: self.intensity.iter().map(|i| i / max).collect(),
            },
            _ => self.clone(),
        }
    }
}
