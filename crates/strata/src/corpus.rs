//! Corpus files on disk
//!
//! A corpus is a JSON array of documents. Writes go through a sibling
//! temporary file and a rename so an interrupted run never leaves a
//! truncated corpus behind.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use strata_core::{Document, RawDocument};

use crate::error::{Result, StrataError};

pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let documents: Vec<Document> = load_array(path)?;
    info!(path = %path.display(), documents = documents.len(), "loaded corpus");
    Ok(documents)
}

pub fn load_raw_documents(path: &Path) -> Result<Vec<RawDocument>> {
    let documents: Vec<RawDocument> = load_array(path)?;
    info!(path = %path.display(), documents = documents.len(), "loaded raw transcripts");
    Ok(documents)
}

fn load_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = fs::read_to_string(path).map_err(|err| StrataError::io(path, err))?;
    serde_json::from_str(&text).map_err(|err| StrataError::json(path, err))
}

/// Write `documents` as pretty JSON, replacing `path` atomically
pub fn save_documents<T: Serialize>(path: &Path, documents: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(documents).map_err(|err| StrataError::json(path, err))?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| StrataError::io(parent, err))?;
    }
    let temp = temp_path(path);
    fs::write(&temp, json).map_err(|err| StrataError::io(&temp, err))?;
    fs::rename(&temp, path).map_err(|err| StrataError::io(path, err))?;
    debug!(path = %path.display(), documents = documents.len(), "saved corpus");
    Ok(())
}

/// Copy `path` to `<path>.bak` if it exists; returns the backup location
pub fn backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    let backup = PathBuf::from(name);
    fs::copy(path, &backup).map_err(|err| StrataError::io(&backup, err))?;
    info!(backup = %backup.display(), "backed up corpus");
    Ok(Some(backup))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
