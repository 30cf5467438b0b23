//! Save slots on disk: one pretty-printed JSON file per slot.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::campaign::Campaign;

/// Full save data written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub campaign: Campaign,
    pub seed: u64,
    pub timestamp: u64,
    pub slot_name: String,
}

/// Lightweight metadata for listing saves without keeping full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub slot_name: String,
    pub timestamp: u64,
    pub months_passed: u32,
    pub funds: i64,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save data: {0}")]
    Serde(#[from] serde_json::Error),
}

fn save_path(dir: &Path, slot: &str) -> PathBuf {
    dir.join(format!("{slot}.json"))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn save_to_file(dir: &Path, slot: &str, data: &SaveData) -> Result<(), PersistenceError> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let path = save_path(dir, slot);
    let json = serde_json::to_string_pretty(data)?;
    fs::write(&path, json).map_err(io_error(&path))?;
    tracing::info!(target: "geoscape::persistence", slot, "save.written");
    Ok(())
}

pub fn load_from_file(dir: &Path, slot: &str) -> Result<SaveData, PersistenceError> {
    let path = save_path(dir, slot);
    let json = fs::read_to_string(&path).map_err(io_error(&path))?;
    Ok(serde_json::from_str(&json)?)
}

/// Readable saves in `dir`, newest first. Unreadable files are skipped.
pub fn list_saves(dir: &Path) -> Vec<SaveMetadata> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut saves = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        let Some(data) = fs::read_to_string(&path)
            .ok()
            .and_then(|json| serde_json::from_str::<SaveData>(&json).ok())
        else {
            tracing::warn!(target: "geoscape::persistence", path = %path.display(), "save.unreadable");
            continue;
        };
        saves.push(SaveMetadata {
            slot_name: data.slot_name,
            timestamp: data.timestamp,
            months_passed: data.campaign.months_passed,
            funds: data.campaign.funds,
        });
    }
    saves.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    saves
}

pub fn delete_save(dir: &Path, slot: &str) -> Result<(), PersistenceError> {
    let path = save_path(dir, slot);
    if path.exists() {
        fs::remove_file(&path).map_err(io_error(&path))?;
    }
    Ok(())
}
