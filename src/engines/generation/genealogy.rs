//! Ancestry of every candidate evaluated during an evolutionary run.
//!
//! An append-only arena: ids are positions, assigned in insertion order, and
//! a node may only name parents that were inserted before it. Edges
//! therefore always point from a smaller id to a larger one and the graph
//! cannot contain a cycle.

use crate::error::{NeurofitError, Result};
use crate::types::{Candidate, Evaluation, FitnessVector, ParamMap, Rheobase};
use serde::{Deserialize, Serialize};
use std::ops::Index;

pub type CandidateId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Initial,
    Crossover,
    Mutation,
}

impl Origin {
    pub fn parent_count(&self) -> usize {
        match self {
            Origin::Initial => 0,
            Origin::Mutation => 1,
            Origin::Crossover => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenealogyNode {
    pub id: CandidateId,
    pub generation: usize,
    pub origin: Origin,
    pub parents: Vec<CandidateId>,
    pub candidate: Candidate,
    pub fitness: FitnessVector,
    pub rheobase: Option<Rheobase>,
}

/// Flattened node for export; `summed` is `None` for invalid candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: CandidateId,
    pub generation: usize,
    pub origin: Origin,
    pub summed: Option<f64>,
    pub params: ParamMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genealogy {
    nodes: Vec<GenealogyNode>,
}

impl Genealogy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        generation: usize,
        origin: Origin,
        parents: Vec<CandidateId>,
        candidate: Candidate,
        evaluation: Evaluation,
    ) -> Result<CandidateId> {
        let id = self.nodes.len();
        check_node(id, origin, &parents)?;
        self.nodes.push(GenealogyNode {
            id,
            generation,
            origin,
            parents,
            candidate,
            fitness: evaluation.fitness,
            rheobase: evaluation.rheobase,
        });
        Ok(id)
    }

    pub fn get(&self, id: CandidateId) -> Option<&GenealogyNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[GenealogyNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn generation(&self, generation: usize) -> impl Iterator<Item = &GenealogyNode> {
        self.nodes.iter().filter(move |n| n.generation == generation)
    }

    /// `(parent, child)` pairs in child order.
    pub fn edges(&self) -> Vec<(CandidateId, CandidateId)> {
        self.nodes
            .iter()
            .flat_map(|n| n.parents.iter().map(move |&p| (p, n.id)))
            .collect()
    }

    pub fn children(&self, id: CandidateId) -> Vec<CandidateId> {
        self.nodes
            .iter()
            .filter(|n| n.parents.contains(&id))
            .map(|n| n.id)
            .collect()
    }

    pub fn summaries(&self) -> Vec<NodeSummary> {
        self.nodes
            .iter()
            .map(|n| NodeSummary {
                id: n.id,
                generation: n.generation,
                origin: n.origin,
                summed: n.fitness.is_valid().then_some(n.fitness.objective),
                params: n.candidate.params.clone(),
            })
            .collect()
    }

    /// Re-checks every node; useful after deserialising an arena.
    pub fn validate(&self) -> Result<()> {
        for (position, node) in self.nodes.iter().enumerate() {
            if node.id != position {
                return Err(NeurofitError::Lineage(format!(
                    "node at position {} carries id {}",
                    position, node.id
                )));
            }
            check_node(node.id, node.origin, &node.parents)?;
        }
        Ok(())
    }
}

impl Index<CandidateId> for Genealogy {
    type Output = GenealogyNode;

    fn index(&self, id: CandidateId) -> &GenealogyNode {
        &self.nodes[id]
    }
}

fn check_node(id: CandidateId, origin: Origin, parents: &[CandidateId]) -> Result<()> {
    if parents.len() != origin.parent_count() {
        return Err(NeurofitError::Lineage(format!(
            "candidate {} from {:?} has {} parents",
            id,
            origin,
            parents.len()
        )));
    }
    if let Some(&parent) = parents.iter().find(|&&p| p >= id) {
        return Err(NeurofitError::Lineage(format!(
            "candidate {} names parent {} that was not recorded before it",
            id, parent
        )));
    }
    if parents.len() == 2 && parents[0] == parents[1] {
        return Err(NeurofitError::Lineage(format!(
            "candidate {} was crossed with itself ({})",
            id, parents[0]
        )));
    }
    Ok(())
}
