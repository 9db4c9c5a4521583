//! Label propagation over the similarity network.
//!
//! Diffuses per-node chemical-class probability vectors so features without
//! direct evidence inherit an estimate from their network neighborhood. One
//! matrix per class level and evidence source, rows in node order, columns in
//! vocabulary order.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::algorithm::network::SimilarityGraph;
use crate::error::MetcoreError;

/// What to do with rows that carry no probability mass.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputationPolicy {
    /// Spread mass uniformly over all classes.
    Uniform,
    /// Leave the row all-zero.
    Zero,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropagationParams {
    /// Stop once the Frobenius norm of the sweep delta falls below this.
    pub convergence: f64,
    /// Hard sweep cap for graphs that oscillate instead of converging.
    pub max_iterations: usize,
    pub imputation: ImputationPolicy,
}

impl Default for PropagationParams {
    fn default() -> Self {
        Self {
            convergence: 1e-5,
            max_iterations: 1000,
            imputation: ImputationPolicy::Uniform,
        }
    }
}

/// Sum weighted class contributions into an `n_nodes` × `n_classes` seed
/// matrix.
///
/// Contributions are (node, class, weight) triples; rows stay unnormalized
/// here, [`LabelPropagator::propagate`] normalizes on entry.
pub fn seed_matrix(
    n_nodes: usize,
    n_classes: usize,
    contributions: &[(usize, usize, f64)],
) -> Result<DMatrix<f64>, MetcoreError> {
    let mut matrix = DMatrix::zeros(n_nodes, n_classes);
    for &(node, class, weight) in contributions {
        if node >= n_nodes || class >= n_classes {
            return Err(MetcoreError::Propagation(format!(
                "seed contribution ({}, {}) outside a {}x{} matrix",
                node, class, n_nodes, n_classes
            )));
        }
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(MetcoreError::Propagation(format!("invalid seed weight {}", weight)));
        }
        matrix[(node, class)] += weight;
    }
    Ok(matrix)
}

pub struct LabelPropagator;

impl LabelPropagator {
    /// Run synchronous (Jacobi) propagation sweeps until convergence or the
    /// iteration cap.
    ///
    /// Every sweep replaces each row with the weight-scaled sum of its
    /// neighbors' rows from the previous sweep, then re-normalizes. Rows
    /// therefore sum to 1 after every sweep, or stay all-zero under the
    /// [`ImputationPolicy::Zero`] policy. Hitting the cap is reported via
    /// `log::warn` and the last iterate is returned as-is.
    pub fn propagate(
        graph: &SimilarityGraph,
        seeds: &DMatrix<f64>,
        params: &PropagationParams,
    ) -> Result<DMatrix<f64>, MetcoreError> {
        let n = graph.node_count();
        let classes = seeds.ncols();
        if seeds.nrows() != n {
            return Err(MetcoreError::Propagation(format!(
                "seed matrix has {} rows for a {}-node graph",
                seeds.nrows(),
                n
            )));
        }
        if !(params.convergence > 0.0 && params.convergence.is_finite()) {
            return Err(MetcoreError::Propagation(
                "convergence threshold must be a positive finite number".to_string(),
            ));
        }
        if params.max_iterations == 0 {
            return Err(MetcoreError::Propagation("max_iterations must be at least 1".to_string()));
        }
        for (row, values) in seeds.row_iter().enumerate() {
            for &value in values.iter() {
                if !value.is_finite() || value < 0.0 {
                    return Err(MetcoreError::Propagation(format!(
                        "seed row {} contains an invalid probability {}",
                        row, value
                    )));
                }
            }
        }

        let mut current = Self::normalized_rows(seeds.clone_owned(), params.imputation);
        if n == 0 || classes == 0 {
            return Ok(current);
        }

        let mut converged = false;
        for _ in 0..params.max_iterations {
            let mut next = DMatrix::<f64>::zeros(n, classes);
            for node in 0..n {
                for &(neighbor, weight) in graph.neighbors(node) {
                    for class in 0..classes {
                        next[(node, class)] += current[(neighbor, class)] * weight;
                    }
                }
            }
            let next = Self::normalized_rows(next, params.imputation);
            let delta = (&next - &current).norm();
            current = next;
            if delta < params.convergence {
                converged = true;
                break;
            }
        }
        if !converged {
            log::warn!(
                "label propagation stopped after {} sweeps without convergence",
                params.max_iterations
            );
        }
        Ok(current)
    }

    fn normalized_rows(mut matrix: DMatrix<f64>, imputation: ImputationPolicy) -> DMatrix<f64> {
        let classes = matrix.ncols();
        for mut row in matrix.row_iter_mut() {
            let sum: f64 = row.iter().sum();
            if sum > 0.0 {
                row /= sum;
            } else if imputation == ImputationPolicy::Uniform && classes > 0 {
                row.fill(1.0 / classes as f64);
            }
        }
        matrix
    }
}
