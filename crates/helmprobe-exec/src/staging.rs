//! Temporary files handed to, or saved from, the helm process
//!
//! Files are named `helm-values-<run>-<index>-<random>.yaml` and
//! `helm-output-<run>-<random>.yaml`, where `<run>` is fixed when the stager is
//! created. They are kept on disk after the run for inspection.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ExecError, Result};

#[derive(Debug, Clone)]
pub struct Stager {
    dir: PathBuf,
    run_stamp: String,
}

impl Stager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            run_stamp: chrono::Local::now().format("%Y%m%dT%H%M%S%3f").to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Timestamp shared by every file this stager writes
    pub fn run_stamp(&self) -> &str {
        &self.run_stamp
    }

    /// Write each overlay to its own file, returning paths in overlay order
    pub fn stage_values<S: AsRef<str>>(&self, overlays: &[S]) -> Result<Vec<PathBuf>> {
        overlays
            .iter()
            .enumerate()
            .map(|(index, yaml)| {
                self.write(&format!("helm-values-{}-{}-", self.run_stamp, index), yaml.as_ref())
            })
            .collect()
    }

    /// Save the stdout of a run that should have failed
    pub fn persist_output(&self, stdout: &str) -> Result<PathBuf> {
        self.write(&format!("helm-output-{}-", self.run_stamp), stdout)
    }

    fn write(&self, prefix: &str, content: &str) -> Result<PathBuf> {
        let staging_error = |source| ExecError::Staging {
            path: self.dir.join(prefix),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(staging_error)?;
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".yaml")
            .tempfile_in(&self.dir)
            .map_err(staging_error)?;
        file.write_all(content.as_bytes()).map_err(staging_error)?;

        let (_, path) = file.keep().map_err(|e| staging_error(e.error))?;
        tracing::debug!("staged {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_are_staged_in_order() {
        let dir = TempDir::new().unwrap();
        let stager = Stager::new(dir.path());
        let paths = stager.stage_values(&["a: 1\n", "b: 2\n"]).unwrap();

        assert_eq!(paths.len(), 2);
        assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), "a: 1\n");
        assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), "b: 2\n");

        let name = |p: &PathBuf| p.file_name().unwrap().to_string_lossy().to_string();
        let stamp = stager.run_stamp();
        assert!(name(&paths[0]).starts_with(&format!("helm-values-{}-0-", stamp)));
        assert!(name(&paths[1]).starts_with(&format!("helm-values-{}-1-", stamp)));
        assert!(name(&paths[0]).ends_with(".yaml"));
    }

    #[test]
    fn test_repeated_staging_never_collides() {
        let dir = TempDir::new().unwrap();
        let stager = Stager::new(dir.path());
        let first = stager.stage_values(&["x: 1"]).unwrap();
        let second = stager.stage_values(&["x: 2"]).unwrap();
        assert_ne!(first[0], second[0]);
        assert!(first[0].is_file() && second[0].is_file());
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let stager = Stager::new(dir.path().join("nested/staging"));
        let path = stager.persist_output("---\nkind: ConfigMap\n").unwrap();
        assert!(path.starts_with(dir.path().join("nested/staging")));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "---\nkind: ConfigMap\n");
    }
}
