//! Sample-side input documents.
//!
//! Feature tables, pairwise similarity scores, and spectral library matches
//! arrive as JSON exported by upstream processing; vendor raw formats are out
//! of scope here.

use std::fs::File;
use std::io::BufReader;

use serde::{Deserialize, Serialize};

use metcore::chemistry::adduct::Polarity;
use metcore::data::feature::Feature;
use metcore::data::spectrum::MzSpectrum;

use crate::error::MetannotError;

/// One feature row of a sample document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub feature_id: u32,
    /// Precursor m/z.
    pub mz: f64,
    /// Retention time in seconds.
    pub rt: f64,
    pub intensity: f64,
    pub peaks_mz: Vec<f64>,
    pub peaks_intensity: Vec<f64>,
}

impl FeatureRecord {
    /// Convert into a core feature, rejecting inconsistent peak arrays.
    ///
    /// Peak intensities are scaled to the base peak on the way in, so
    /// downstream pair scoring sees spectra on the same footing.
    pub fn to_feature(&self, polarity: Polarity) -> Result<Feature, MetannotError> {
        if self.peaks_mz.len() != self.peaks_intensity.len() {
            return Err(MetannotError::Sample(format!(
                "feature {}: {} m/z values against {} intensities",
                self.feature_id,
                self.peaks_mz.len(),
                self.peaks_intensity.len()
            )));
        }
        let spectrum = MzSpectrum::new(self.peaks_mz.clone(), self.peaks_intensity.clone()).normalized();
        let feature = Feature::new(self.feature_id, self.mz, self.rt, self.intensity, polarity, spectrum);
        feature.validate()?;
        Ok(feature)
    }
}

/// A sample's feature table plus acquisition metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleDocument {
    pub sample_name: String,
    /// Ionization polarity the sample was acquired in, "pos" or "neg".
    pub polarity: String,
    /// Source organism of the sample, when known.
    pub organism: Option<String>,
    pub features: Vec<FeatureRecord>,
}

/// One precomputed pairwise similarity entry, keyed by feature ids.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub feature_a: u32,
    pub feature_b: u32,
    pub score: f64,
    pub matched_peaks: usize,
}

/// One spectral library match, keyed by feature id and structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralMatchRecord {
    pub feature_id: u32,
    pub short_inchikey: String,
    pub cosine: f64,
    pub matched_peaks: usize,
}

pub fn read_sample(path: &str) -> Result<SampleDocument, MetannotError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_scores(path: &str) -> Result<Vec<ScoreRecord>, MetannotError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_spectral_matches(path: &str) -> Result<Vec<SpectralMatchRecord>, MetannotError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
