// ditteau-core/src/domain/graph/dag.rs

use crate::domain::error::ConfigError;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

pub struct GraphSolver;

impl GraphSolver {
    /// Topological sort with layers over a `node -> parents` map.
    /// Layer 0 holds nodes without parents; layer N depends only on layers 0..N-1.
    /// Parents that are not themselves keys of the map are ignored.
    pub fn layers(parents: &BTreeMap<String, Vec<String>>) -> Result<Vec<Vec<String>>, ConfigError> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();

        for name in parents.keys() {
            in_degree.insert(name, 0);
            children.insert(name, Vec::new());
        }

        for (name, deps) in parents {
            // A role listed twice as parent counts once
            let unique: BTreeSet<&String> = deps.iter().collect();
            for dep in unique {
                if parents.contains_key(dep) {
                    children.entry(dep).or_default().push(name);
                    *in_degree.entry(name).or_insert(0) += 1;
                }
            }
        }

        // Kahn's algorithm, layer by layer. Sorted seeds keep the output stable.
        let mut layers: Vec<Vec<String>> = Vec::new();
        let mut queue: VecDeque<&str> = parents
            .keys()
            .map(String::as_str)
            .filter(|n| in_degree.get(n) == Some(&0))
            .collect();

        let mut total_resolved = 0;

        while !queue.is_empty() {
            let mut current_layer = Vec::new();
            let layer_size = queue.len();

            for _ in 0..layer_size {
                if let Some(current) = queue.pop_front() {
                    current_layer.push(current.to_string());
                    total_resolved += 1;

                    if let Some(next) = children.get(current) {
                        for child in next {
                            if let Some(degree) = in_degree.get_mut(child) {
                                *degree -= 1;
                                if *degree == 0 {
                                    queue.push_back(child);
                                }
                            }
                        }
                    }
                }
            }
            current_layer.sort();
            layers.push(current_layer);
        }

        if total_resolved != parents.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(n, _)| *n)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            return Err(ConfigError::CyclicRoleHierarchy(stuck.join(", ")));
        }

        Ok(layers)
    }
}
