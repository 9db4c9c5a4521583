//! Candidate evidence units consumed by the annotation scorer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a feature's winning annotation came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum EvidenceSource {
    /// Spectral library match (MS2).
    #[serde(rename = "ISDB")]
    Isdb,
    /// Precursor-mass adduct match only.
    #[serde(rename = "MS1")]
    Ms1,
    /// No candidate of either kind.
    #[serde(rename = "none")]
    None,
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceSource::Isdb => write!(f, "ISDB"),
            EvidenceSource::Ms1 => write!(f, "MS1"),
            EvidenceSource::None => write!(f, "none"),
        }
    }
}

/// Spectral library match for one feature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ms2Candidate {
    /// Index into the run's reference chemical list.
    pub chemical: usize,
    /// Modified cosine between query and library spectrum, in [0, 1].
    pub cosine: f64,
    pub matched_peaks: usize,
}

/// Precursor-mass adduct match for one feature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ms1Candidate {
    /// Index into the run's reference chemical list.
    pub chemical: usize,
    /// Adduct notation the precursor matched under, e.g. "[M+Na]+".
    pub adduct: String,
    pub adduct_mz: f64,
}

/// All candidate evidence collected for one feature before scoring.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeatureEvidence {
    pub ms2: Vec<Ms2Candidate>,
    pub ms1: Vec<Ms1Candidate>,
}

impl FeatureEvidence {
    pub fn is_empty(&self) -> bool {
        self.ms2.is_empty() && self.ms1.is_empty()
    }
}

/// One row of the final per-feature ranking, rank 1 = best.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankedAnnotation {
    pub feature_id: u32,
    /// Short InChIKey of the annotated structure, absent without evidence.
    pub reference_structure_id: Option<String>,
    pub combined_score: f64,
    pub evidence_source: EvidenceSource,
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_source_display() {
        assert_eq!(EvidenceSource::Isdb.to_string(), "ISDB");
        assert_eq!(EvidenceSource::Ms1.to_string(), "MS1");
        assert_eq!(EvidenceSource::None.to_string(), "none");
    }

    #[test]
    fn test_empty_evidence() {
        let evidence = FeatureEvidence::default();
        assert!(evidence.is_empty());
    }
}
