//! Relationship Detector (C3): fuses explicit FK evidence, naming
//! heuristics, and value-inclusion evidence into one ranked set (spec §4.3).

use std::collections::BTreeMap;

use regex::Regex;

use crate::db::RelationalDatabase;
use crate::error::StrataError;
use crate::models::{ProfileMap, RawSchema, Relationship, RelationshipSet, RelationshipType};

const INCLUSION_DISTINCT_CEILING: u64 = 1000;
const INCLUSION_THRESHOLD: f64 = 0.90;
const PK_SAMPLE_CEILING: usize = 1000;

fn naming_suffixes() -> &'static [(Regex, &'static str)] {
    static RES: std::sync::OnceLock<[(Regex, &'static str); 3]> = std::sync::OnceLock::new();
    RES.get_or_init(|| {
        [
            (Regex::new(r"^(?P<name>.+)_id$").unwrap(), "_id"),
            (Regex::new(r"^(?P<name>.+)Id$").unwrap(), "Id"),
            (Regex::new(r"^(?P<name>.+)_code$").unwrap(), "_code"),
        ]
    })
}

/// Detect relationships. `db` is used only for the value-inclusion pass;
/// explicit and naming evidence come entirely from `schema`/`profiles`.
pub async fn detect(
    db: &dyn RelationalDatabase,
    schema: &RawSchema,
    profiles: &ProfileMap,
) -> Result<RelationshipSet, StrataError> {
    let mut candidates: Vec<Relationship> = Vec::new();

    candidates.extend(explicit_relationships(schema));
    candidates.extend(naming_relationships(schema, profiles));
    candidates.extend(inclusion_relationships(db, schema, profiles).await?);

    candidates.retain(|r| !r.is_self_loop());

    let mut best: BTreeMap<(String, String, String, String), Relationship> = BTreeMap::new();
    for r in candidates {
        let key = r.dedup_key();
        match best.get(&key) {
            Some(existing) if existing.confidence >= r.confidence => {}
            _ => {
                best.insert(key, r);
            }
        }
    }

    Ok(RelationshipSet::from_relationships(best.into_values().collect()))
}

fn explicit_relationships(schema: &RawSchema) -> Vec<Relationship> {
    let mut out = Vec::new();
    for (table_name, table) in &schema.tables {
        for fk in &table.explicit_foreign_keys {
            for (src_col, tgt_col) in fk.columns.iter().zip(fk.referred_columns.iter()) {
                out.push(Relationship {
                    source_table: table_name.clone(),
                    source_column: src_col.clone(),
                    target_table: fk.referred_table.clone(),
                    target_column: tgt_col.clone(),
                    kind: RelationshipType::Explicit,
                    confidence: RelationshipType::Explicit.bound(),
                    evidence: "foreign_key_constraint".to_string(),
                });
            }
        }
    }
    out
}

/// A primary key column is "id-like" when named id/key/code, or when its
/// distinct/row_count ratio exceeds 0.95 (spec §4.3).
fn is_id_like_pk(table_name: &str, schema: &RawSchema, profiles: &ProfileMap) -> Option<String> {
    let table = schema.tables.get(table_name)?;
    if table.primary_key.len() != 1 {
        return None;
    }
    let pk_col = &table.primary_key[0];
    let lowered = pk_col.to_lowercase();
    if matches!(lowered.as_str(), "id" | "key" | "code") {
        return Some(pk_col.clone());
    }
    let profile = profiles.tables.get(table_name)?.get(pk_col)?;
    if table.row_count > 0 && profile.distinct_count as f64 / table.row_count as f64 > 0.95 {
        return Some(pk_col.clone());
    }
    None
}

fn naming_relationships(schema: &RawSchema, profiles: &ProfileMap) -> Vec<Relationship> {
    let mut out = Vec::new();
    for (table_name, table) in &schema.tables {
        for column in &table.columns {
            for (re, suffix) in naming_suffixes().iter() {
                let Some(captures) = re.captures(&column.name) else {
                    continue;
                };
                let candidate_table = captures.name("name").unwrap().as_str();
                if !schema.tables.contains_key(candidate_table) || candidate_table == table_name.as_str() {
                    continue;
                }
                let Some(pk_col) = is_id_like_pk(candidate_table, schema, profiles) else {
                    continue;
                };
                out.push(Relationship {
                    source_table: table_name.clone(),
                    source_column: column.name.clone(),
                    target_table: candidate_table.to_string(),
                    target_column: pk_col,
                    kind: RelationshipType::Naming,
                    confidence: RelationshipType::Naming.bound(),
                    evidence: format!("naming_pattern_{suffix}"),
                });
            }
        }
    }
    out
}

async fn distinct_values(
    db: &dyn RelationalDatabase,
    table: &str,
    column: &str,
) -> Result<Vec<String>, StrataError> {
    let batches = db.stream_table(table, 50_000).await?;
    let Some(first) = batches.first() else {
        return Ok(Vec::new());
    };
    let Some(idx) = first.columns.iter().position(|c| c == column) else {
        return Ok(Vec::new());
    };
    let mut seen = std::collections::BTreeSet::new();
    for batch in &batches {
        for row in &batch.rows {
            if let Some(cell) = row.get(idx) {
                if let Some(text) = cell.as_text() {
                    seen.insert(text);
                }
            }
        }
    }
    Ok(seen.into_iter().collect())
}

async fn inclusion_relationships(
    db: &dyn RelationalDatabase,
    schema: &RawSchema,
    profiles: &ProfileMap,
) -> Result<Vec<Relationship>, StrataError> {
    let mut out = Vec::new();

    let mut fk_candidates: Vec<(&str, &str)> = Vec::new();
    for (table_name, columns) in &profiles.tables {
        for (column_name, profile) in columns {
            if profile.distinct_count > 0 && profile.distinct_count < INCLUSION_DISTINCT_CEILING {
                fk_candidates.push((table_name.as_str(), column_name.as_str()));
            }
        }
    }

    let mut pk_candidates: Vec<(&str, &str)> = Vec::new();
    for (table_name, table) in &schema.tables {
        if table.primary_key.len() == 1 {
            pk_candidates.push((table_name.as_str(), table.primary_key[0].as_str()));
        }
    }

    for &(fk_table, fk_column) in &fk_candidates {
        let fk_values = distinct_values(db, fk_table, fk_column).await?;
        if fk_values.is_empty() {
            continue;
        }
        let fk_set: std::collections::BTreeSet<&str> = fk_values.iter().map(|s| s.as_str()).collect();

        for &(pk_table, pk_column) in &pk_candidates {
            if pk_table == fk_table {
                continue;
            }
            let mut pk_values = distinct_values(db, pk_table, pk_column).await?;
            pk_values.truncate(PK_SAMPLE_CEILING);
            let pk_set: std::collections::BTreeSet<&str> = pk_values.iter().map(|s| s.as_str()).collect();

            let overlap = fk_set.intersection(&pk_set).count();
            let ratio = overlap as f64 / fk_set.len() as f64;
            if ratio >= INCLUSION_THRESHOLD {
                out.push(Relationship {
                    source_table: fk_table.to_string(),
                    source_column: fk_column.to_string(),
                    target_table: pk_table.to_string(),
                    target_column: pk_column.to_string(),
                    kind: RelationshipType::Inclusion,
                    confidence: ratio.min(1.0),
                    evidence: format!("value_overlap_{:.0}pct", ratio * 100.0),
                });
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests_support::FakeDatabase;
    use crate::pipeline::{metadata_reader, profiler};
    use std::sync::Arc;

    #[tokio::test]
    async fn explicit_fk_is_detected_with_full_confidence() {
        let fake = FakeDatabase::incident_fixture();
        let schema = metadata_reader::extract(&fake).await.unwrap();
        let db: Arc<dyn RelationalDatabase> = Arc::new(fake);
        let profiles = profiler::profile(Arc::clone(&db), &schema).await.unwrap();
        let set = detect(db.as_ref(), &schema, &profiles).await.unwrap();

        let explicit = set
            .relationships
            .iter()
            .find(|r| r.kind == RelationshipType::Explicit)
            .unwrap();
        assert_eq!(explicit.source_table, "incident_details");
        assert_eq!(explicit.target_table, "incidents");
        assert_eq!(explicit.confidence, 1.0);
    }

    #[tokio::test]
    async fn inclusion_relationship_detected_between_incidents_and_employees() {
        let fake = FakeDatabase::incident_fixture();
        let schema = metadata_reader::extract(&fake).await.unwrap();
        let db: Arc<dyn RelationalDatabase> = Arc::new(fake);
        let profiles = profiler::profile(Arc::clone(&db), &schema).await.unwrap();
        let set = detect(db.as_ref(), &schema, &profiles).await.unwrap();

        let inclusion = set.relationships.iter().find(|r| {
            r.kind == RelationshipType::Inclusion
                && r.source_table == "incidents"
                && r.target_table == "employees"
        });
        assert!(inclusion.is_some());
        assert!(inclusion.unwrap().confidence >= 0.90);
    }

    #[tokio::test]
    async fn no_self_loops_are_ever_emitted() {
        let fake = FakeDatabase::incident_fixture();
        let schema = metadata_reader::extract(&fake).await.unwrap();
        let db: Arc<dyn RelationalDatabase> = Arc::new(fake);
        let profiles = profiler::profile(Arc::clone(&db), &schema).await.unwrap();
        let set = detect(db.as_ref(), &schema, &profiles).await.unwrap();
        assert!(set.relationships.iter().all(|r| !r.is_self_loop()));
    }
}
