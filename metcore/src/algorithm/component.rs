//! Connected-component labeling over the similarity network.
//!
//! Components are numbered 1..K from largest to smallest so ids are stable
//! across runs; nodes without any retained link stay at -1.

use std::collections::VecDeque;

use crate::algorithm::network::SimilarityGraph;

pub struct ComponentLabeler;

impl ComponentLabeler {
    /// Assign component ids in place and return the number of components.
    ///
    /// Equal-sized components are ordered by their lowest member node index,
    /// so the numbering does not depend on traversal order.
    pub fn assign(graph: &mut SimilarityGraph) -> usize {
        let n = graph.node_count();
        let mut visited = vec![false; n];
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut members = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                members.push(node);
                for &(next, _) in graph.neighbors(node) {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            // single nodes stay unclustered
            if members.len() > 1 {
                members.sort_unstable();
                clusters.push(members);
            }
        }

        clusters.sort_by(|x, y| y.len().cmp(&x.len()).then(x[0].cmp(&y[0])));

        graph.component_ids = vec![-1; n];
        for (index, members) in clusters.iter().enumerate() {
            for &node in members {
                graph.component_ids[node] = index as i32 + 1;
            }
        }
        clusters.len()
    }
}
