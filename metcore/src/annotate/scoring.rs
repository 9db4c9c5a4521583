//! Annotation scoring.
//!
//! Fuses spectral, taxonomic, and class-consistency evidence per feature into
//! a ranked annotation list. Each feature is scored independently of all
//! others, so the collection form runs on rayon worker threads.

use std::cmp::Reverse;
use std::collections::HashSet;

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::annotate::candidate::{EvidenceSource, FeatureEvidence, RankedAnnotation};
use crate::data::chemical::{ClassVocabulary, HasClassVectors, ReferenceChemical, CLASS_LEVELS};
use crate::data::taxonomy::{TaxonLineage, TaxonRank};
use crate::error::MetcoreError;

/// Lower bound for the class divergence so the combined ratio stays finite.
const DIVERGENCE_FLOOR: f64 = 1e-6;

/// Whether class-consistency reweighting participates in the combined score.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivergenceMode {
    Enabled,
    Disabled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoringParams {
    pub divergence: DivergenceMode,
    /// Ranked records kept per feature.
    pub top_k: usize,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self { divergence: DivergenceMode::Disabled, top_k: 5 }
    }
}

/// One feature's propagated class distributions, split by evidence source.
///
/// Rows are in vocabulary order per class level; an empty row means the level
/// carries no propagated information and is skipped by the divergence term.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassProfile {
    pub ms1: [Vec<f64>; CLASS_LEVELS.len()],
    pub ms2: [Vec<f64>; CLASS_LEVELS.len()],
}

/// Per-feature scoring input assembled by the pipeline.
#[derive(Clone, Debug)]
pub struct ScoringTask {
    pub feature_id: u32,
    pub evidence: FeatureEvidence,
    pub profile: ClassProfile,
}

struct Scored {
    value: f64,
    cosine: f64,
    source: EvidenceSource,
    chemical: usize,
}

fn source_order(source: EvidenceSource) -> u8 {
    match source {
        EvidenceSource::Isdb => 0,
        EvidenceSource::Ms1 => 1,
        EvidenceSource::None => 2,
    }
}

pub struct AnnotationScorer;

impl AnnotationScorer {
    /// Taxonomical similarity between a candidate's source organism and the
    /// sample organism.
    ///
    /// The deepest shared rank sets the score: a species match counts 8, each
    /// rank above one less, no shared rank 0; the result is normalized to
    /// [0, 1] by the rank count.
    ///
    /// # Examples
    ///
    /// ```
    /// use metcore::annotate::scoring::AnnotationScorer;
    /// use metcore::data::taxonomy::TaxonLineage;
    ///
    /// let organism = TaxonLineage { domain: Some("Eukaryota".to_string()), ..Default::default() };
    /// let candidate = TaxonLineage { domain: Some("Eukaryota".to_string()), ..Default::default() };
    /// assert_eq!(AnnotationScorer::taxonomic_score(&candidate, &organism), 0.125);
    /// ```
    pub fn taxonomic_score(candidate: &TaxonLineage, organism: &TaxonLineage) -> f64 {
        match candidate.deepest_shared_rank(organism) {
            Some(rank) => rank.depth() as f64 / TaxonRank::Species.depth() as f64,
            None => 0.0,
        }
    }

    /// Rank all candidates of one feature.
    ///
    /// MS2 candidates are ordered by combined score × cosine, MS1 candidates
    /// by combined score alone; both pools compete on those values directly.
    /// Ties fall back to cosine, then MS2 before MS1, then the lower chemical
    /// index. Without any candidate a single "none" record is returned.
    pub fn score_feature(
        feature_id: u32,
        evidence: &FeatureEvidence,
        chemicals: &[ReferenceChemical],
        profile: &ClassProfile,
        vocabulary: &ClassVocabulary,
        organism: Option<&TaxonLineage>,
        params: &ScoringParams,
    ) -> Result<Vec<RankedAnnotation>, MetcoreError> {
        if params.top_k == 0 {
            return Err(MetcoreError::Config("top_k must be at least 1".to_string()));
        }
        if evidence.is_empty() {
            return Ok(vec![RankedAnnotation {
                feature_id,
                reference_structure_id: None,
                combined_score: 0.0,
                evidence_source: EvidenceSource::None,
                rank: 1,
            }]);
        }

        let lookup = |index: usize| -> Result<&ReferenceChemical, MetcoreError> {
            chemicals.get(index).ok_or_else(|| {
                MetcoreError::Config(format!(
                    "candidate references chemical index {} outside the reference list of {}",
                    index,
                    chemicals.len()
                ))
            })
        };

        let mut scored = Vec::with_capacity(evidence.ms2.len() + evidence.ms1.len());
        for candidate in &evidence.ms2 {
            let chemical = lookup(candidate.chemical)?;
            let combined =
                Self::combined_score(chemical, organism, &profile.ms2, vocabulary, params.divergence);
            scored.push(Scored {
                value: combined * candidate.cosine,
                cosine: candidate.cosine,
                source: EvidenceSource::Isdb,
                chemical: candidate.chemical,
            });
        }
        for candidate in &evidence.ms1 {
            let chemical = lookup(candidate.chemical)?;
            let combined =
                Self::combined_score(chemical, organism, &profile.ms1, vocabulary, params.divergence);
            scored.push(Scored {
                value: combined,
                cosine: 0.0,
                source: EvidenceSource::Ms1,
                chemical: candidate.chemical,
            });
        }

        scored.sort_by_key(|s| {
            (
                Reverse(OrderedFloat(s.value)),
                Reverse(OrderedFloat(s.cosine)),
                source_order(s.source),
                s.chemical,
            )
        });

        // one record per structure, best occurrence wins; the same structure
        // can appear under several organism rows
        let mut seen: HashSet<&str> = HashSet::new();
        let mut records = Vec::new();
        for s in scored {
            if !seen.insert(chemicals[s.chemical].short_inchikey.as_str()) {
                continue;
            }
            records.push(RankedAnnotation {
                feature_id,
                reference_structure_id: Some(chemicals[s.chemical].short_inchikey.clone()),
                combined_score: s.value,
                evidence_source: s.source,
                rank: records.len() as u32 + 1,
            });
            if records.len() == params.top_k {
                break;
            }
        }
        Ok(records)
    }

    /// Score a whole sample's features in parallel, record order following
    /// task order.
    pub fn score_collection(
        tasks: &[ScoringTask],
        chemicals: &[ReferenceChemical],
        vocabulary: &ClassVocabulary,
        organism: Option<&TaxonLineage>,
        params: &ScoringParams,
    ) -> Result<Vec<RankedAnnotation>, MetcoreError> {
        let nested: Vec<Vec<RankedAnnotation>> = tasks
            .par_iter()
            .map(|task| {
                Self::score_feature(
                    task.feature_id,
                    &task.evidence,
                    chemicals,
                    &task.profile,
                    vocabulary,
                    organism,
                    params,
                )
            })
            .collect::<Result<_, _>>()?;
        Ok(nested.into_iter().flatten().collect())
    }

    fn combined_score(
        chemical: &ReferenceChemical,
        organism: Option<&TaxonLineage>,
        propagated: &[Vec<f64>; CLASS_LEVELS.len()],
        vocabulary: &ClassVocabulary,
        mode: DivergenceMode,
    ) -> f64 {
        let taxonomic = organism
            .map(|lineage| Self::taxonomic_score(&chemical.lineage, lineage))
            .unwrap_or(0.0);
        taxonomic / Self::class_divergence(chemical, propagated, vocabulary, mode)
    }

    /// Mean Jensen-Shannon divergence between the candidate's one-hot class
    /// vectors and the feature's propagated distributions, over the levels
    /// where both sides carry information. Neutral (1.0) when disabled or no
    /// level is comparable.
    fn class_divergence(
        chemical: &ReferenceChemical,
        propagated: &[Vec<f64>; CLASS_LEVELS.len()],
        vocabulary: &ClassVocabulary,
        mode: DivergenceMode,
    ) -> f64 {
        if mode == DivergenceMode::Disabled {
            return 1.0;
        }
        let mut total = 0.0;
        let mut counted = 0usize;
        for (index, level) in CLASS_LEVELS.iter().enumerate() {
            let one_hot = match vocabulary.one_hot(*level, chemical.class_label(*level)) {
                Some(v) => v,
                None => continue,
            };
            let row = &propagated[index];
            if row.len() != one_hot.len() || row.iter().sum::<f64>() <= 0.0 {
                continue;
            }
            total += jensen_shannon(&one_hot, row);
            counted += 1;
        }
        if counted == 0 {
            1.0
        } else {
            (total / counted as f64).max(DIVERGENCE_FLOOR)
        }
    }
}

fn jensen_shannon(p: &[f64], q: &[f64]) -> f64 {
    let mut divergence = 0.0;
    for (&pi, &qi) in p.iter().zip(q) {
        let mid = 0.5 * (pi + qi);
        if pi > 0.0 {
            divergence += 0.5 * pi * (pi / mid).ln();
        }
        if qi > 0.0 {
            divergence += 0.5 * qi * (qi / mid).ln();
        }
    }
    divergence
}
