//! Output of the Relationship Detector (C3): `Relationship`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Explicit,
    Naming,
    Inclusion,
}

impl RelationshipType {
    /// Confidence bound implied by the evidence kind alone — the monotone
    /// cardinality invariant of spec §8 requires explicit >= naming >=
    /// any inclusion-observed confidence.
    pub fn bound(&self) -> f64 {
        match self {
            RelationshipType::Explicit => 1.0,
            RelationshipType::Naming => 0.85,
            RelationshipType::Inclusion => 0.90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    pub confidence: f64,
    pub evidence: String,
}

impl Relationship {
    /// A stable dedup key independent of discovery order.
    pub fn dedup_key(&self) -> (String, String, String, String) {
        (
            self.source_table.clone(),
            self.source_column.clone(),
            self.target_table.clone(),
            self.target_column.clone(),
        )
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_table == self.target_table
    }
}

/// The relationship set plus the two derived views spec §6 persists
/// alongside it: relationships grouped by source table, and a summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipSet {
    pub relationships: Vec<Relationship>,
    pub edges_by_source: std::collections::BTreeMap<String, Vec<Relationship>>,
    pub summary: RelationshipSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSummary {
    pub total: usize,
    pub explicit: usize,
    pub naming: usize,
    pub inclusion: usize,
}

impl RelationshipSet {
    pub fn from_relationships(mut relationships: Vec<Relationship>) -> Self {
        // Stable, deterministic ordering for byte-equal idempotence.
        relationships.sort_by(|a, b| a.dedup_key().cmp(&b.dedup_key()));

        let mut edges_by_source: std::collections::BTreeMap<String, Vec<Relationship>> =
            std::collections::BTreeMap::new();
        let mut summary = RelationshipSummary::default();

        for r in &relationships {
            summary.total += 1;
            match r.kind {
                RelationshipType::Explicit => summary.explicit += 1,
                RelationshipType::Naming => summary.naming += 1,
                RelationshipType::Inclusion => summary.inclusion += 1,
            }
            edges_by_source
                .entry(r.source_table.clone())
                .or_default()
                .push(r.clone());
        }

        Self {
            relationships,
            edges_by_source,
            summary,
        }
    }
}
