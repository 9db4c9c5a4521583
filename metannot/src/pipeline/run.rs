//! The per-sample annotation pipeline.
//!
//! Order of operations: feature intake, similarity network, component
//! labeling, candidate collection, organism resolution, class label
//! propagation per level and evidence source, then scoring. Malformed input
//! rows are logged and skipped, they never abort the sample.

use std::collections::HashMap;
use std::str::FromStr;

use log::{info, warn};

use metcore::algorithm::component::ComponentLabeler;
use metcore::algorithm::network::{NetworkBuilder, SimilarityGraph};
use metcore::algorithm::propagation::{seed_matrix, LabelPropagator};
use metcore::algorithm::similarity::SimilarityEdge;
use metcore::annotate::candidate::{FeatureEvidence, Ms1Candidate, Ms2Candidate};
use metcore::annotate::scoring::{AnnotationScorer, ClassProfile, ScoringTask};
use metcore::chemistry::adduct::Polarity;
use metcore::chemistry::catalog::AdductCatalog;
use metcore::data::chemical::{HasClassVectors, CLASS_LEVELS};
use metcore::data::feature::Feature;

use crate::data::reference::ReferenceStore;
use crate::data::sample::{SampleDocument, ScoreRecord, SpectralMatchRecord};
use crate::error::MetannotError;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::report::{FeatureComponent, SampleReport};
use crate::taxa::resolver::{resolve_organism, TaxonResolver};

/// Reusable annotation state for one polarity: the reference store, the
/// adduct catalog derived from it, and the run configuration. One instance
/// annotates any number of samples.
pub struct AnnotationPipeline {
    store: ReferenceStore,
    catalog: AdductCatalog,
    config: PipelineConfig,
}

impl AnnotationPipeline {
    pub fn new(
        store: ReferenceStore,
        catalog: AdductCatalog,
        config: PipelineConfig,
    ) -> Result<AnnotationPipeline, MetannotError> {
        config.validate()?;
        if store.is_empty() {
            return Err(MetannotError::Config("reference store holds no chemicals".to_string()));
        }
        if catalog.polarity != config.polarity {
            return Err(MetannotError::Config(format!(
                "adduct catalog was built for {} mode, run configured for {}",
                catalog.polarity, config.polarity
            )));
        }
        Ok(AnnotationPipeline { store, catalog, config })
    }

    /// Annotate one sample against the reference store.
    ///
    /// `scores` holds pairwise spectral similarities keyed by feature id,
    /// `matches` the spectral library hits. Entries naming unknown feature
    /// ids or unknown structures are dropped with a warning.
    pub fn annotate_sample(
        &self,
        sample: &SampleDocument,
        scores: &[ScoreRecord],
        matches: &[SpectralMatchRecord],
        resolver: &dyn TaxonResolver,
    ) -> Result<SampleReport, MetannotError> {
        let polarity = Polarity::from_str(&sample.polarity)?;
        if polarity != self.config.polarity {
            return Err(MetannotError::Config(format!(
                "sample {} was acquired in {} mode, run configured for {}",
                sample.sample_name, polarity, self.config.polarity
            )));
        }

        let (features, node_of) = self.collect_features(sample, polarity);
        info!(
            "sample {}: {} of {} features pass intake",
            sample.sample_name,
            features.len(),
            sample.features.len()
        );

        let node_ids: Vec<u32> = features.iter().map(|f| f.feature_id).collect();
        let edges = self.collect_edges(scores, &node_of);
        let mut graph = NetworkBuilder::from_edges(node_ids, &edges, &self.config.network)?;
        let component_count = ComponentLabeler::assign(&mut graph);
        info!(
            "similarity network: {} edges, {} components",
            graph.edge_count(),
            component_count
        );

        let evidence = self.collect_evidence(&features, matches, &node_of);
        info!(
            "candidates: {} features with MS2 evidence, {} with MS1 evidence",
            evidence.iter().filter(|e| !e.ms2.is_empty()).count(),
            evidence.iter().filter(|e| !e.ms1.is_empty()).count()
        );

        let organism = match sample.organism.as_deref() {
            Some(name) => {
                let resolved = resolve_organism(resolver, name, self.config.retry_attempts)?;
                if let Some(taxon) = &resolved {
                    info!(
                        "resolved organism '{}' to {} ({})",
                        name, taxon.matched_name, taxon.identifier
                    );
                }
                resolved
            }
            None => {
                info!(
                    "sample {} carries no organism, taxonomic reweighting disabled",
                    sample.sample_name
                );
                None
            }
        };

        let tasks = self.build_tasks(&graph, &features, evidence)?;
        let annotations = AnnotationScorer::score_collection(
            &tasks,
            self.store.chemicals(),
            self.store.vocabulary(),
            organism.as_ref().map(|taxon| &taxon.lineage),
            &self.config.scoring,
        )?;

        let components = graph
            .node_ids
            .iter()
            .zip(&graph.component_ids)
            .map(|(&feature_id, &component_id)| FeatureComponent { feature_id, component_id })
            .collect();

        Ok(SampleReport {
            sample_name: sample.sample_name.clone(),
            polarity: polarity.to_string(),
            organism,
            components,
            annotations,
        })
    }

    /// Convert raw feature records, skipping malformed rows and duplicate
    /// ids. Returns the surviving features in input order plus the feature
    /// id to node index map.
    fn collect_features(
        &self,
        sample: &SampleDocument,
        polarity: Polarity,
    ) -> (Vec<Feature>, HashMap<u32, usize>) {
        let mut features: Vec<Feature> = Vec::with_capacity(sample.features.len());
        let mut node_of: HashMap<u32, usize> = HashMap::new();
        for record in &sample.features {
            if node_of.contains_key(&record.feature_id) {
                warn!("skipping duplicate feature id {}", record.feature_id);
                continue;
            }
            match record.to_feature(polarity) {
                Ok(feature) => {
                    node_of.insert(feature.feature_id, features.len());
                    features.push(feature);
                }
                Err(error) => warn!("skipping feature {}: {}", record.feature_id, error),
            }
        }
        (features, node_of)
    }

    fn collect_edges(
        &self,
        scores: &[ScoreRecord],
        node_of: &HashMap<u32, usize>,
    ) -> Vec<SimilarityEdge> {
        let mut edges = Vec::with_capacity(scores.len());
        for record in scores {
            match (node_of.get(&record.feature_a), node_of.get(&record.feature_b)) {
                (Some(&a), Some(&b)) => edges.push(SimilarityEdge {
                    a,
                    b,
                    score: record.score,
                    matched_peaks: record.matched_peaks,
                }),
                _ => warn!(
                    "dropping similarity entry {} - {}: unknown or excluded feature",
                    record.feature_a, record.feature_b
                ),
            }
        }
        edges
    }

    /// Gather MS2 library hits and MS1 adduct hits per node.
    ///
    /// A structure expands to one candidate per reference row it appears in,
    /// so every source organism pairing competes in scoring.
    fn collect_evidence(
        &self,
        features: &[Feature],
        matches: &[SpectralMatchRecord],
        node_of: &HashMap<u32, usize>,
    ) -> Vec<FeatureEvidence> {
        let mut evidence: Vec<FeatureEvidence> = vec![FeatureEvidence::default(); features.len()];

        for record in matches {
            let node = match node_of.get(&record.feature_id) {
                Some(&node) => node,
                None => {
                    warn!("dropping library match for unknown feature {}", record.feature_id);
                    continue;
                }
            };
            let indices = self.store.structure_indices(&record.short_inchikey);
            if indices.is_empty() {
                warn!(
                    "library match for feature {} names unknown structure {}",
                    record.feature_id, record.short_inchikey
                );
                continue;
            }
            for &chemical in indices {
                evidence[node].ms2.push(Ms2Candidate {
                    chemical,
                    cosine: record.cosine,
                    matched_peaks: record.matched_peaks,
                });
            }
        }

        // precursor adduct matches against the catalog
        for (node, feature) in features.iter().enumerate() {
            for entry in self.catalog.query(feature.mz, self.config.tolerance_ppm) {
                let recipe = self.catalog.recipe_of(entry);
                let group = self.catalog.group_of(entry);
                for structure in &group.structure_ids {
                    for &chemical in self.store.structure_indices(structure) {
                        evidence[node].ms1.push(Ms1Candidate {
                            chemical,
                            adduct: recipe.to_string(),
                            adduct_mz: entry.adduct_mz,
                        });
                    }
                }
            }
        }
        evidence
    }

    /// Propagate class seeds over the network and assemble one scoring task
    /// per node.
    ///
    /// Each class level gets two seed matrices, MS2 contributions weighted by
    /// cosine and MS1 contributions with unit weight, propagated
    /// independently.
    fn build_tasks(
        &self,
        graph: &SimilarityGraph,
        features: &[Feature],
        evidence: Vec<FeatureEvidence>,
    ) -> Result<Vec<ScoringTask>, MetannotError> {
        let n = features.len();
        let chemicals = self.store.chemicals();
        let vocabulary = self.store.vocabulary();

        let mut ms1_levels: Vec<Vec<Vec<f64>>> = Vec::with_capacity(CLASS_LEVELS.len());
        let mut ms2_levels: Vec<Vec<Vec<f64>>> = Vec::with_capacity(CLASS_LEVELS.len());
        for level in CLASS_LEVELS {
            let classes = vocabulary.size(level);
            let mut ms1_contributions: Vec<(usize, usize, f64)> = Vec::new();
            let mut ms2_contributions: Vec<(usize, usize, f64)> = Vec::new();
            for (node, feature_evidence) in evidence.iter().enumerate() {
                for candidate in &feature_evidence.ms2 {
                    if let Some(class) = chemicals[candidate.chemical]
                        .class_label(level)
                        .and_then(|label| vocabulary.index_of(level, label))
                    {
                        ms2_contributions.push((node, class, candidate.cosine));
                    }
                }
                for candidate in &feature_evidence.ms1 {
                    if let Some(class) = chemicals[candidate.chemical]
                        .class_label(level)
                        .and_then(|label| vocabulary.index_of(level, label))
                    {
                        ms1_contributions.push((node, class, 1.0));
                    }
                }
            }

            let seeds = seed_matrix(n, classes, &ms1_contributions)?;
            let propagated = LabelPropagator::propagate(graph, &seeds, &self.config.propagation)?;
            ms1_levels.push(propagated.row_iter().map(|row| row.iter().copied().collect()).collect());

            let seeds = seed_matrix(n, classes, &ms2_contributions)?;
            let propagated = LabelPropagator::propagate(graph, &seeds, &self.config.propagation)?;
            ms2_levels.push(propagated.row_iter().map(|row| row.iter().copied().collect()).collect());
        }

        let tasks = evidence
            .into_iter()
            .enumerate()
            .map(|(node, feature_evidence)| {
                let profile = ClassProfile {
                    ms1: [
                        ms1_levels[0][node].clone(),
                        ms1_levels[1][node].clone(),
                        ms1_levels[2][node].clone(),
                    ],
                    ms2: [
                        ms2_levels[0][node].clone(),
                        ms2_levels[1][node].clone(),
                        ms2_levels[2][node].clone(),
                    ],
                };
                ScoringTask {
                    feature_id: features[node].feature_id,
                    evidence: feature_evidence,
                    profile,
                }
            })
            .collect();
        Ok(tasks)
    }
}
