//! Fingerprinter (C4): per-table role, risk profile, temporal/geospatial
//! flags, and connected-component cluster ids (spec §4.4).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::models::{Fingerprint, FingerprintMap, RawSchema, RelationshipSet, Role, RiskProfile};

const RISK_KEYWORDS: &[&str] = &[
    "redline", "osha", "violation", "critical", "danger", "incident", "safety",
];
const TEMPORAL_KEYWORDS: &[&str] = &["date", "time", "timestamp", "created", "modified", "updated"];
const GEOSPATIAL_KEYWORDS: &[&str] = &[
    "location", "geo", "latitude", "longitude", "coords", "address",
];

/// Derive a `Fingerprint` per table from structure and the detected
/// relationship set.
pub fn fingerprint(schema: &RawSchema, relationships: &RelationshipSet) -> FingerprintMap {
    let degrees = table_degrees(schema, relationships);
    let clusters = cluster_tables(schema, relationships);

    let mut tables = BTreeMap::new();
    for (table_name, table) in &schema.tables {
        let (incoming, outgoing) = degrees.get(table_name).copied().unwrap_or((0, 0));
        let role = derive_role(table_name, incoming, outgoing);

        let mut redline_comments = Vec::new();
        for column in &table.columns {
            if let Some(comment) = &column.comment {
                if contains_keyword(comment, RISK_KEYWORDS) {
                    redline_comments.push(comment.clone());
                }
            }
        }
        let risk_profile = if redline_comments.is_empty() {
            RiskProfile::LowRisk
        } else {
            RiskProfile::HighRisk
        };

        let has_temporal = table
            .columns
            .iter()
            .any(|c| contains_keyword(&c.name, TEMPORAL_KEYWORDS));
        let has_geospatial = table
            .columns
            .iter()
            .any(|c| contains_keyword(&c.name, GEOSPATIAL_KEYWORDS));

        tables.insert(
            table_name.clone(),
            Fingerprint {
                role,
                risk_profile,
                redline_comments,
                cluster_id: clusters
                    .get(table_name)
                    .cloned()
                    .unwrap_or_else(|| format!("orphan:{table_name}")),
                has_temporal,
                has_geospatial,
            },
        );
    }

    FingerprintMap { tables }
}

fn contains_keyword(haystack: &str, keywords: &[&str]) -> bool {
    let lowered = haystack.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

/// `(incoming, outgoing)` edge counts per table over the directed
/// relationship set.
fn table_degrees(
    schema: &RawSchema,
    relationships: &RelationshipSet,
) -> BTreeMap<String, (usize, usize)> {
    let mut degrees: BTreeMap<String, (usize, usize)> =
        schema.tables.keys().map(|t| (t.clone(), (0, 0))).collect();
    for r in &relationships.relationships {
        degrees.entry(r.source_table.clone()).or_insert((0, 0)).0 += 1;
        degrees.entry(r.target_table.clone()).or_insert((0, 0)).1 += 1;
    }
    degrees
}

/// Role rule applied in order (spec §4.4); the richer internal "fact"
/// category collapses into hub/dimension per table name before return so
/// the external contract stays four-valued.
fn derive_role(table_name: &str, incoming: usize, outgoing: usize) -> Role {
    let name_has_incident = table_name.to_lowercase().contains("incident");
    let ends_with_details = table_name.to_lowercase().ends_with("_details");

    match (incoming, outgoing) {
        (0, 0) => Role::Unknown,
        (0, out) if out > 0 && name_has_incident => Role::Hub,
        (0, out) if out > 0 => Role::Dimension,
        (inc, 0) if inc > 0 => Role::Detail,
        (inc, out) if inc > 0 && out > 0 && ends_with_details => Role::Detail,
        (inc, out) if inc > 0 && out > 0 => {
            if name_has_incident {
                Role::Hub
            } else {
                Role::Dimension
            }
        }
        _ => Role::Unknown,
    }
}

/// Partition tables into connected components of the undirected
/// projection of `relationships`, via BFS with an explicit visited set
/// (spec §9: no recursion on the edge graph). Unreachable tables get a
/// distinct singleton cluster id of the form `orphan:<table>`.
fn cluster_tables(schema: &RawSchema, relationships: &RelationshipSet) -> BTreeMap<String, String> {
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> =
        schema.tables.keys().map(|t| (t.as_str(), BTreeSet::new())).collect();
    for r in &relationships.relationships {
        adjacency
            .entry(r.source_table.as_str())
            .or_default()
            .insert(r.target_table.as_str());
        adjacency
            .entry(r.target_table.as_str())
            .or_default()
            .insert(r.source_table.as_str());
    }

    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut assignment: BTreeMap<String, String> = BTreeMap::new();

    for start in schema.tables.keys() {
        if visited.contains(start.as_str()) {
            continue;
        }
        let neighbors = adjacency.get(start.as_str()).cloned().unwrap_or_default();
        if neighbors.is_empty() {
            visited.insert(start.as_str());
            assignment.insert(start.clone(), format!("orphan:{start}"));
            continue;
        }

        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.as_str());
        visited.insert(start.as_str());

        while let Some(node) = queue.pop_front() {
            component.push(node);
            if let Some(neigh) = adjacency.get(node) {
                for &next in neigh {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        component.sort_unstable();
        let cluster_id = format!("cluster:{}", component.first().copied().unwrap_or(start));
        for table in component {
            assignment.insert(table.to_string(), cluster_id.clone());
        }
    }

    assignment
}
