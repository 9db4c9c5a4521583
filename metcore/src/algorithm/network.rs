//! Similarity network construction.
//!
//! Builds a pruned molecular network from pairwise spectral similarity:
//! per-node top-n neighbor lists, mutual or single link retention, and a hard
//! per-node link cap.

use std::collections::HashMap;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithm::similarity::{PairwiseScorer, SimilarityEdge};
use crate::data::spectrum::MzSpectrum;
use crate::error::MetcoreError;

/// How an edge qualifies for retention after the top-n neighbor cull.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMethod {
    /// Keep an edge only if each endpoint lists the other among its top-n.
    Mutual,
    /// Keep an edge if either endpoint lists the other.
    Single,
}

impl FromStr for LinkMethod {
    type Err = MetcoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mutual" => Ok(LinkMethod::Mutual),
            "single" => Ok(LinkMethod::Single),
            _ => Err(MetcoreError::Config(format!(
                "unknown link method '{}', expected 'mutual' or 'single'",
                s
            ))),
        }
    }
}

/// Network construction parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Minimum similarity for an edge to be considered at all.
    pub score_cutoff: f64,
    /// Neighbor list length per node before link retention.
    pub top_n: usize,
    /// Maximum retained links per node, must not exceed top_n.
    pub max_links: usize,
    pub link_method: LinkMethod,
    /// Fragment mass tolerance handed to the pairwise scorer.
    pub tolerance: f64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            score_cutoff: 0.7,
            top_n: 15,
            max_links: 10,
            link_method: LinkMethod::Mutual,
            tolerance: 0.02,
        }
    }
}

/// The pruned similarity network over a sample's features.
///
/// The node set is exactly the sample's feature-id set, order preserved.
/// Component ids stay -1 until a labeling pass assigns them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarityGraph {
    /// Feature id of every node, in sample order.
    pub node_ids: Vec<u32>,
    /// Retained neighbors per node as (node index, similarity weight).
    pub adjacency: Vec<Vec<(usize, f64)>>,
    /// Connected-component id per node, -1 for unclustered singletons.
    pub component_ids: Vec<i32>,
}

impl SimilarityGraph {
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|n| n.len()).sum::<usize>() / 2
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }
}

pub struct NetworkBuilder;

impl NetworkBuilder {
    /// Score all spectrum pairs with the given scorer, then build the network.
    pub fn from_spectra(
        node_ids: Vec<u32>,
        spectra: &[MzSpectrum],
        scorer: &impl PairwiseScorer,
        params: &NetworkParams,
    ) -> Result<SimilarityGraph, MetcoreError> {
        Self::validate(params)?;
        let edges = scorer.score_collection(spectra, params.tolerance, params.score_cutoff);
        Self::from_edges(node_ids, &edges, params)
    }

    /// Build the network from an existing sparse pair list.
    ///
    /// Duplicate entries for the same unordered pair keep their best score;
    /// self pairs carry no information and are dropped.
    pub fn from_edges(
        node_ids: Vec<u32>,
        edges: &[SimilarityEdge],
        params: &NetworkParams,
    ) -> Result<SimilarityGraph, MetcoreError> {
        Self::validate(params)?;
        let n = node_ids.len();

        let mut best: HashMap<(usize, usize), SimilarityEdge> = HashMap::new();
        for edge in edges {
            if edge.a == edge.b {
                continue;
            }
            let (a, b) = (edge.a.min(edge.b), edge.a.max(edge.b));
            if b >= n {
                return Err(MetcoreError::Config(format!(
                    "edge ({}, {}) references a node outside the {}-node sample",
                    edge.a, edge.b, n
                )));
            }
            let canonical = SimilarityEdge { a, b, ..*edge };
            best.entry((a, b))
                .and_modify(|current| {
                    if canonical.score > current.score {
                        *current = canonical;
                    }
                })
                .or_insert(canonical);
        }

        // per-node neighbor lists above the cutoff
        let mut neighbor_lists: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for edge in best.values() {
            if edge.score >= params.score_cutoff {
                neighbor_lists[edge.a].push((edge.b, edge.score));
                neighbor_lists[edge.b].push((edge.a, edge.score));
            }
        }

        // top-n cull, ties broken by neighbor index for reproducibility
        let top_n = params.top_n;
        neighbor_lists.par_iter_mut().for_each(|list| {
            list.sort_by(|x, y| y.1.total_cmp(&x.1).then(x.0.cmp(&y.0)));
            if list.len() > top_n {
                list.truncate(top_n);
            }
        });

        let listed = |u: usize, v: usize| neighbor_lists[u].iter().any(|&(w, _)| w == v);
        let mut retained: Vec<SimilarityEdge> = best
            .values()
            .filter(|e| e.score >= params.score_cutoff)
            .filter(|e| match params.link_method {
                LinkMethod::Mutual => listed(e.a, e.b) && listed(e.b, e.a),
                LinkMethod::Single => listed(e.a, e.b) || listed(e.b, e.a),
            })
            .copied()
            .collect();

        // best-first cap at max_links per node, deterministic across runs
        retained.sort_by(|x, y| y.score.total_cmp(&x.score).then((x.a, x.b).cmp(&(y.a, y.b))));
        let mut degree = vec![0usize; n];
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for edge in retained {
            if degree[edge.a] < params.max_links && degree[edge.b] < params.max_links {
                adjacency[edge.a].push((edge.b, edge.score));
                adjacency[edge.b].push((edge.a, edge.score));
                degree[edge.a] += 1;
                degree[edge.b] += 1;
            }
        }
        for list in adjacency.iter_mut() {
            list.sort_by(|x, y| x.0.cmp(&y.0));
        }

        Ok(SimilarityGraph {
            node_ids,
            adjacency,
            component_ids: vec![-1; n],
        })
    }

    fn validate(params: &NetworkParams) -> Result<(), MetcoreError> {
        if params.max_links == 0 {
            return Err(MetcoreError::Config("max_links must be at least 1".to_string()));
        }
        if params.top_n < params.max_links {
            return Err(MetcoreError::Config(format!(
                "top_n ({}) must be at least max_links ({})",
                params.top_n, params.max_links
            )));
        }
        if !params.score_cutoff.is_finite() {
            return Err(MetcoreError::Config("score_cutoff must be finite".to_string()));
        }
        Ok(())
    }
}
