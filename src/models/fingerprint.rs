//! Output of the Fingerprinter (C4): `Fingerprint`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Hub,
    Dimension,
    Detail,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    LowRisk,
    HighRisk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub role: Role,
    pub risk_profile: RiskProfile,
    pub redline_comments: Vec<String>,
    pub cluster_id: String,
    pub has_temporal: bool,
    pub has_geospatial: bool,
}

/// `{table -> Fingerprint}`, ordered for determinism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintMap {
    pub tables: BTreeMap<String, Fingerprint>,
}
