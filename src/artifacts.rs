//! Per-client artifact persistence (spec §6): atomic write-temp-then-rename
//! for every stage-boundary document, so a crash mid-write never leaves a
//! torn file for the next phase to read.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StrataError;

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn client_dir(&self, client_id: &str) -> PathBuf {
        self.root.join(client_id)
    }

    fn path(&self, client_id: &str, file_name: &str) -> PathBuf {
        self.client_dir(client_id).join(file_name)
    }

    /// Serialize `value` as pretty JSON and atomically replace `file_name`
    /// under the client's artifact directory.
    pub fn write_json<T: Serialize>(
        &self,
        client_id: &str,
        file_name: &str,
        value: &T,
    ) -> Result<(), StrataError> {
        let dir = self.client_dir(client_id);
        std::fs::create_dir_all(&dir)?;
        let final_path = dir.join(file_name);
        let tmp_path = dir.join(format!("{file_name}.tmp"));

        let contents = serde_json::to_vec_pretty(value)?;
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    pub fn read_json<T: DeserializeOwned>(
        &self,
        client_id: &str,
        file_name: &str,
    ) -> Result<Option<T>, StrataError> {
        let path = self.path(client_id, file_name);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Atomically replace an arbitrary byte blob (used for the portable
    /// graph dump, whose extension depends on the format in use).
    pub fn write_bytes(
        &self,
        client_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(), StrataError> {
        let dir = self.client_dir(client_id);
        std::fs::create_dir_all(&dir)?;
        let final_path = dir.join(file_name);
        let tmp_path = dir.join(format!("{file_name}.tmp"));
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    pub fn artifact_path(&self, client_id: &str, file_name: &str) -> PathBuf {
        self.path(client_id, file_name)
    }
}

pub mod names {
    pub const SCHEMA_GRAPH: &str = "01_schema_graph.json";
    pub const DATA_PROFILE: &str = "02_data_profile.json";
    pub const RELATIONSHIPS: &str = "03_relationships_complete.json";
    pub const FINGERPRINTS: &str = "04_fingerprints.json";
    pub const SEMANTIC_LAYER: &str = "semantic_layer_complete.json";
    pub const KNOWLEDGE_GRAPH_SUMMARY: &str = "knowledge_graph_summary.json";

    pub fn knowledge_graph_portable(ext: &str) -> String {
        format!("knowledge_graph_enhanced.{ext}")
    }
}

/// Artifact root priority: explicit path (`--artifacts-dir`) > `./artifacts`
/// if it already exists > `~/.strata/artifacts`. Mirrors the teacher's
/// `explicit > env > ./local (if exists) > ~/home` chain in `init.rs`,
/// minus the env var this crate doesn't define for artifact storage.
pub fn artifacts_root_from_settings(root: Option<&Path>) -> PathBuf {
    root.map(Path::to_path_buf).unwrap_or_else(|| {
        let local = Path::new("./artifacts");
        if local.exists() && local.is_dir() {
            return local.to_path_buf();
        }
        dirs::home_dir()
            .map(|h| h.join(".strata").join("artifacts"))
            .unwrap_or_else(|| local.to_path_buf())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let sample = Sample { value: 42 };
        store.write_json("client1", names::SCHEMA_GRAPH, &sample).unwrap();

        let read_back: Option<Sample> = store.read_json("client1", names::SCHEMA_GRAPH).unwrap();
        assert_eq!(read_back, Some(sample));
    }

    #[test]
    fn rewrite_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store
            .write_json("client1", names::SCHEMA_GRAPH, &Sample { value: 1 })
            .unwrap();
        store
            .write_json("client1", names::SCHEMA_GRAPH, &Sample { value: 2 })
            .unwrap();

        let tmp_path = store.client_dir("client1").join(format!("{}.tmp", names::SCHEMA_GRAPH));
        assert!(!tmp_path.exists());
    }

    #[test]
    fn missing_artifact_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let read_back: Option<Sample> = store.read_json("client1", names::SCHEMA_GRAPH).unwrap();
        assert!(read_back.is_none());
    }
}
