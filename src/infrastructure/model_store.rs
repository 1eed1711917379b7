//! On-disk layout of a saved predictor.
//!
//! A predictor is stored as a pair: a JSON manifest (configuration, scaler,
//! training provenance, reference to the model file) and a bincode model
//! file sitting next to it. Every training run gets its own model file; the
//! manifest rename is the commit point that switches readers to it. The
//! previous run's model file is removed after the commit, the new one is
//! removed if the commit fails.

use crate::domain::errors::PredictorError;
use crate::domain::ml::{MinMaxScaler, ScalerFit, TrainingMeta};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorManifest {
    pub look_back: usize,
    pub forecast_steps: usize,
    #[serde(default)]
    pub scaler_fit: ScalerFit,
    pub scaler: MinMaxScaler,
    /// Relative paths are resolved against the manifest's directory
    pub model_path: PathBuf,
    pub model_name: String,
    pub training: TrainingMeta,
}

/// `models/forex_predictor.json` + `stamp` -> `models/forex_predictor.<stamp>.model.bin`
pub fn model_path_for(config_path: &Path, stamp: &str) -> PathBuf {
    let stem = config_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "predictor".to_string());
    config_path.with_file_name(format!("{}.{}.model.bin", stem, stamp))
}

pub fn relative_model_path(model_path: &Path) -> PathBuf {
    model_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| model_path.to_path_buf())
}

pub fn resolve_model_path(config_path: &Path, stored: &Path) -> PathBuf {
    if stored.is_absolute() {
        return stored.to_path_buf();
    }
    match config_path.parent() {
        Some(dir) => dir.join(stored),
        None => stored.to_path_buf(),
    }
}

/// Model file the manifest at `config_path` currently points at
pub fn saved_model_path(config_path: &Path) -> Result<PathBuf, PredictorError> {
    let manifest = read_manifest(config_path)?;
    Ok(resolve_model_path(config_path, &manifest.model_path))
}

pub fn write_artifacts<M: Serialize>(
    config_path: &Path,
    model_path: &Path,
    manifest: &PredictorManifest,
    model: &M,
) -> Result<(), PredictorError> {
    for dir in [config_path.parent(), model_path.parent()]
        .into_iter()
        .flatten()
        .filter(|d| !d.as_os_str().is_empty())
    {
        fs::create_dir_all(dir).map_err(|e| PredictorError::persistence(dir, e))?;
    }

    let model_bytes =
        bincode::serialize(model).map_err(|e| PredictorError::persistence(model_path, e))?;
    let manifest_json = serde_json::to_string_pretty(manifest)
        .map_err(|e| PredictorError::persistence(config_path, e))?;

    let previous = saved_model_path(config_path).ok();
    let replaces_previous = previous.as_deref() != Some(model_path);

    write_atomic(model_path, &model_bytes)?;
    if let Err(e) = write_atomic(config_path, manifest_json.as_bytes()) {
        if replaces_previous {
            remove_stale(model_path);
        }
        return Err(e);
    }

    if let Some(previous) = previous.filter(|_| replaces_previous) {
        remove_stale(&previous);
    }
    Ok(())
}

pub fn read_manifest(config_path: &Path) -> Result<PredictorManifest, PredictorError> {
    let content = fs::read_to_string(config_path)
        .map_err(|e| PredictorError::persistence(config_path, e))?;
    serde_json::from_str(&content).map_err(|e| PredictorError::persistence(config_path, e))
}

pub fn read_model<M: DeserializeOwned>(model_path: &Path) -> Result<M, PredictorError> {
    let bytes = fs::read(model_path).map_err(|e| PredictorError::persistence(model_path, e))?;
    bincode::deserialize(&bytes).map_err(|e| PredictorError::persistence(model_path, e))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PredictorError> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes).map_err(|e| PredictorError::persistence(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| PredictorError::persistence(path, e))?;
    debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

fn remove_stale(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove stale model file {:?}: {}", path, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn manifest(model_path: &Path) -> PredictorManifest {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&[1.0712345678901234, 1.0934]);
        PredictorManifest {
            look_back: 30,
            forecast_steps: 1,
            scaler_fit: ScalerFit::FullSeries,
            scaler,
            model_path: relative_model_path(model_path),
            model_name: "Stacked LSTM".to_string(),
            training: TrainingMeta {
                trained_rows: 120,
                epochs: 12,
                final_loss: Some(0.0031),
                trained_at: Utc::now(),
            },
        }
    }

    fn model_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(".model.bin"))
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_model_path_derivation() {
        let path = model_path_for(Path::new("models/forex_predictor.json"), "run1");
        assert_eq!(path, PathBuf::from("models/forex_predictor.run1.model.bin"));
    }

    #[test]
    fn test_relative_model_path_resolves_next_to_manifest() {
        let resolved = resolve_model_path(
            Path::new("/srv/models/forex_predictor.json"),
            Path::new("forex_predictor.run1.model.bin"),
        );
        assert_eq!(
            resolved,
            PathBuf::from("/srv/models/forex_predictor.run1.model.bin")
        );
    }

    #[test]
    fn test_write_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested/deeper/forex_predictor.json");
        let model_path = model_path_for(&config_path, "run1");

        write_artifacts(&config_path, &model_path, &manifest(&model_path), &vec![1.5f64, 2.5])
            .unwrap();

        assert!(config_path.exists());
        assert!(model_path.exists());
        assert!(!config_path.with_extension("tmp").exists());
        assert_eq!(saved_model_path(&config_path).unwrap(), model_path);
    }

    #[test]
    fn test_manifest_preserves_scaler_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("forex_predictor.json");
        let model_path = model_path_for(&config_path, "run1");
        let original = manifest(&model_path);

        write_artifacts(&config_path, &model_path, &original, &0u8).unwrap();
        let restored = read_manifest(&config_path).unwrap();

        assert_eq!(restored.scaler, original.scaler);
        assert_eq!(restored.training, original.training);
    }

    #[test]
    fn test_new_run_replaces_previous_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("forex_predictor.json");
        let first = model_path_for(&config_path, "run1");
        let second = model_path_for(&config_path, "run2");

        write_artifacts(&config_path, &first, &manifest(&first), &1u32).unwrap();
        write_artifacts(&config_path, &second, &manifest(&second), &2u32).unwrap();

        assert_eq!(model_files(dir.path()), vec![second.clone()]);
        assert_eq!(read_model::<u32>(&saved_model_path(&config_path).unwrap()).unwrap(), 2);
    }

    #[test]
    fn test_failed_manifest_write_keeps_previous_pair() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("forex_predictor.json");
        let first = model_path_for(&config_path, "run1");
        write_artifacts(&config_path, &first, &manifest(&first), &1u32).unwrap();
        let manifest_before = fs::read_to_string(&config_path).unwrap();

        // The manifest's temp path is taken by a directory, so its write fails
        fs::create_dir(config_path.with_extension("tmp")).unwrap();
        let second = model_path_for(&config_path, "run2");
        let result = write_artifacts(&config_path, &second, &manifest(&second), &2u32);

        assert!(matches!(result, Err(PredictorError::Persistence { .. })));
        assert_eq!(fs::read_to_string(&config_path).unwrap(), manifest_before);
        assert_eq!(model_files(dir.path()), vec![first.clone()]);
        assert_eq!(read_model::<u32>(&first).unwrap(), 1);
    }

    #[test]
    fn test_rewriting_same_run_keeps_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("forex_predictor.json");
        let model_path = model_path_for(&config_path, "run1");

        write_artifacts(&config_path, &model_path, &manifest(&model_path), &1u32).unwrap();
        write_artifacts(&config_path, &model_path, &manifest(&model_path), &1u32).unwrap();

        assert!(model_path.exists());
    }

    #[test]
    fn test_missing_model_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Vec<f64>, _> = read_model(&dir.path().join("absent.model.bin"));
        assert!(matches!(result, Err(PredictorError::Persistence { .. })));
    }

    #[test]
    fn test_corrupt_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("forex_predictor.json");
        fs::write(&config_path, "{ not json").unwrap();

        assert!(matches!(
            read_manifest(&config_path),
            Err(PredictorError::Persistence { .. })
        ));
    }
}
