use crate::error::{NeurofitError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Run artifacts on disk, one directory per run id, one JSON file per
/// artifact.
pub struct RunArchive {
    root: PathBuf,
}

impl RunArchive {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }

    /// Writes through a temporary file so readers never see a partial
    /// artifact.
    pub fn save<T: Serialize>(&self, run_id: &str, artifact: &str, value: &T) -> Result<PathBuf> {
        validate_name(run_id)?;
        validate_name(artifact)?;

        let dir = self.run_dir(run_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", artifact));
        let tmp = dir.join(format!(".{}.json.tmp", artifact));
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, &path)?;

        log::info!("Saved {} for run {} to {}", artifact, run_id, path.display());
        Ok(path)
    }

    pub fn load<T: DeserializeOwned>(&self, run_id: &str, artifact: &str) -> Result<T> {
        validate_name(run_id)?;
        validate_name(artifact)?;
        let path = self.run_dir(run_id).join(format!("{}.json", artifact));
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn list_runs(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut runs: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        runs.sort();
        Ok(runs)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(NeurofitError::Configuration(format!(
            "'{}' is not a valid run or artifact name",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_save_load_list() {
        let dir = tempfile::tempdir().unwrap();
        let archive = RunArchive::new(dir.path());

        let mut value = BTreeMap::new();
        value.insert("elapsed_s".to_string(), 1.5);
        archive.save("run-2", "ga", &value).unwrap();
        archive.save("run-1", "grid", &value).unwrap();

        let loaded: BTreeMap<String, f64> = archive.load("run-2", "ga").unwrap();
        assert_eq!(loaded, value);
        assert_eq!(archive.list_runs().unwrap(), vec!["run-1", "run-2"]);
    }

    #[test]
    fn test_rejects_path_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let archive = RunArchive::new(dir.path());
        assert!(archive.save("../x", "ga", &1).is_err());
        assert!(archive.save("run", "a/b", &1).is_err());
    }
}
