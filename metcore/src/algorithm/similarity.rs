use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::spectrum::MzSpectrum;

/// One scored spectrum pair, upper triangle only (`a < b`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub a: usize,
    pub b: usize,
    pub score: f64,
    pub matched_peaks: usize,
}

/// Black-box pairwise spectral similarity.
///
/// The annotation pipeline never computes similarity itself; it consumes
/// whatever implementation is plugged in here. The provided batched form
/// scores every pair of a collection in parallel over read-only input and
/// keeps a sparse upper triangle.
pub trait PairwiseScorer: Sync {
    /// Score a spectrum pair, returning a similarity in [0, 1] together with
    /// the number of matched fragment peaks.
    fn pair(&self, a: &MzSpectrum, b: &MzSpectrum, tolerance: f64) -> (f64, usize);

    /// Score every pair of the collection, dropping pairs below `min_score`.
    fn score_collection(
        &self,
        spectra: &[MzSpectrum],
        tolerance: f64,
        min_score: f64,
    ) -> Vec<SimilarityEdge> {
        let pairs: Vec<(usize, usize)> = (0..spectra.len()).tuple_combinations().collect();

        let mut edges: Vec<SimilarityEdge> = pairs
            .into_par_iter()
            .filter_map(|(a, b)| {
                let (score, matched_peaks) = self.pair(&spectra[a], &spectra[b], tolerance);
                if score >= min_score {
                    Some(SimilarityEdge { a, b, score, matched_peaks })
                } else {
                    None
                }
            })
            .collect();

        edges.sort_by(|x, y| (x.a, x.b).cmp(&(y.a, y.b)));
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fraction of shared unit-binned peaks, a stand-in for a real scorer.
    struct SharedPeakScorer;

    impl PairwiseScorer for SharedPeakScorer {
        fn pair(&self, a: &MzSpectrum, b: &MzSpectrum, _tolerance: f64) -> (f64, usize) {
            let bins_a: Vec<i64> = a.mz.iter().map(|m| m.round() as i64).collect();
            let shared = b.mz.iter().filter(|m| bins_a.contains(&(m.round() as i64))).count();
            let denom = a.len().max(b.len()).max(1);
            (shared as f64 / denom as f64, shared)
        }
    }

    fn spectrum(mz: Vec<f64>) -> MzSpectrum {
        let intensity = vec![1.0; mz.len()];
        MzSpectrum::new(mz, intensity)
    }

    #[test]
    fn test_score_collection_keeps_upper_triangle() {
        let spectra = vec![
            spectrum(vec![100.0, 120.0, 140.0]),
            spectrum(vec![100.0, 120.0, 160.0]),
            spectrum(vec![500.0, 520.0, 540.0]),
        ];
        let edges = SharedPeakScorer.score_collection(&spectra, 0.01, 0.5);

        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].a, edges[0].b), (0, 1));
        assert!((edges[0].score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(edges[0].matched_peaks, 2);
    }

    #[test]
    fn test_score_collection_threshold_keeps_sparse() {
        let spectra = vec![
            spectrum(vec![100.0, 120.0]),
            spectrum(vec![100.0, 300.0]),
            spectrum(vec![100.0, 400.0]),
        ];
        // every pair shares exactly one of two peaks -> score 0.5
        assert_eq!(SharedPeakScorer.score_collection(&spectra, 0.01, 0.6).len(), 0);
        assert_eq!(SharedPeakScorer.score_collection(&spectra, 0.01, 0.5).len(), 3);
    }
}
