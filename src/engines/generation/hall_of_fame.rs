use super::genealogy::{CandidateId, GenealogyNode};
use crate::types::{Candidate, Fingerprint, FitnessVector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EliteCandidate {
    pub id: CandidateId,
    pub generation: usize,
    pub candidate: Candidate,
    pub fitness: FitnessVector,
    pub fingerprint: Fingerprint, // For deduplication
}

impl EliteCandidate {
    pub fn from_node(node: &GenealogyNode) -> Self {
        Self {
            id: node.id,
            generation: node.generation,
            candidate: node.candidate.clone(),
            fitness: node.fitness.clone(),
            fingerprint: node.candidate.fingerprint(),
        }
    }
}

/// Best distinct parameter sets seen over a whole run, by summed objective.
pub struct HallOfFame {
    candidates: Vec<EliteCandidate>,
    max_size: usize,
    /// Every fingerprint ever admitted, including evicted ones.
    seen: HashSet<Fingerprint>,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            candidates: Vec::new(),
            max_size,
            seen: HashSet::new(),
        }
    }

    /// Invalid candidates and parameter sets admitted before (even if since
    /// evicted) are rejected.
    pub fn try_add(&mut self, elite: EliteCandidate) -> bool {
        if self.max_size == 0 || !elite.fitness.is_valid() {
            return false;
        }
        if self.seen.contains(&elite.fingerprint) {
            return false;
        }

        self.seen.insert(elite.fingerprint);
        self.candidates.push(elite);

        // Earlier ids win ties.
        self.candidates
            .sort_by(|a, b| a.fitness.cmp_objective(&b.fitness).then(a.id.cmp(&b.id)));

        self.candidates.truncate(self.max_size);
        true
    }

    pub fn get_all(&self) -> &[EliteCandidate] {
        &self.candidates
    }

    pub fn get_top_n(&self, n: usize) -> &[EliteCandidate] {
        &self.candidates[..n.min(self.candidates.len())]
    }

    pub fn best(&self) -> Option<&EliteCandidate> {
        self.candidates.first()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
