//! Install ordering
//!
//! Orders a batch so that every package comes after the packages it
//! depends on within the batch. A dependency cycle confined to the batch is
//! broken by taking the earliest remaining package and logging a warning.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use plinth_core::PackageDefinition;
use tracing::warn;

/// Topological orderer for one batch
#[derive(Debug)]
pub struct InstallOrderer {
    /// Edges point from dependent to dependency
    graph: StableDiGraph<PackageDefinition, ()>,
}

impl InstallOrderer {
    pub fn new(batch: Vec<PackageDefinition>) -> Self {
        let mut graph = StableDiGraph::with_capacity(batch.len(), batch.len());
        let mut by_name: HashMap<String, NodeIndex> = HashMap::new();

        let nodes: Vec<NodeIndex> = batch
            .into_iter()
            .map(|def| {
                let name = def.name().to_string();
                let node = graph.add_node(def);
                by_name.entry(name).or_insert(node);
                node
            })
            .collect();

        for node in nodes {
            let targets: Vec<NodeIndex> = graph[node]
                .dependencies
                .iter()
                .filter_map(|dep| by_name.get(&dep.name).copied())
                .filter(|target| *target != node)
                .collect();
            for target in targets {
                graph.update_edge(node, target, ());
            }
        }

        Self { graph }
    }

    /// Consume the orderer and return the install order
    pub fn order(mut self) -> Vec<PackageDefinition> {
        let mut ordered = Vec::with_capacity(self.graph.node_count());

        while self.graph.node_count() > 0 {
            let ready = self.graph.node_indices().find(|node| {
                self.graph
                    .neighbors_directed(*node, Direction::Outgoing)
                    .next()
                    .is_none()
            });

            let next = match ready {
                Some(node) => node,
                None => {
                    let remaining: Vec<String> = self
                        .graph
                        .node_weights()
                        .map(|def| def.identity.to_string())
                        .collect();
                    warn!(
                        packages = %remaining.join(", "),
                        "dependency cycle in install batch, order within the cycle is arbitrary"
                    );
                    match self.cycle_entry() {
                        Some(node) => node,
                        None => break,
                    }
                },
            };

            if let Some(def) = self.graph.remove_node(next) {
                ordered.push(def);
            }
        }

        ordered
    }

    /// Earliest batch member of a cycle nothing else in the batch is waiting on
    fn cycle_entry(&self) -> Option<NodeIndex> {
        // tarjan_scc yields components in reverse topological order,
        // so the first one has no edges into the rest of the batch
        tarjan_scc(&self.graph)
            .into_iter()
            .next()
            .and_then(|component| component.into_iter().min())
    }

    /// Order for removal: dependents before their dependencies
    pub fn order_for_removal(self) -> Vec<PackageDefinition> {
        let mut ordered = self.order();
        ordered.reverse();
        ordered
    }
}
