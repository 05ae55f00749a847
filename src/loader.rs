//! Coordinate file loading.
//!
//! The file is a JSON export from the embedding pipeline: either an array of
//! entries or an object whose values are entries. Each entry looks like
//!
//! ```text
//! { "path": "sounds/kick_01.wav", "point": [0.12, 0.87, 0.45] }
//! ```
//!
//! Parsing is lenient. Entries that are empty or do not have this shape are
//! skipped and counted; only a missing, unreadable or non-JSON file fails
//! the whole load.

use glam::Vec3;
use log::{info, debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio::AudioBank;
use crate::model::{Catalog, ClipRecord};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not find file {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

/// A well-formed entry, before its audio is registered.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipEntry {
    pub path: String,
    pub position: Vec3,
}

#[derive(Deserialize)]
struct RawEntry {
    path: String,
    point: Vec<f64>,
}

impl RawEntry {
    fn into_entry(self) -> Option<ClipEntry> {
        if self.point.len() < 3 {
            return None;
        }
        let position = Vec3::new(
            self.point[0] as f32,
            self.point[1] as f32,
            self.point[2] as f32,
        );
        if !position.is_finite() {
            return None;
        }
        Some(ClipEntry { path: self.path, position })
    }
}

fn is_empty_entry(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Parse the text of a coordinate file. Returns the good entries in file
/// order plus how many were skipped.
pub fn parse_entries(text: &str) -> Result<(Vec<ClipEntry>, usize), String> {
    let root: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;

    let items: Vec<Value> = match root {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        other => {
            return Err(format!(
                "expected an array or object of entries, found {}",
                json_kind(&other)
            ))
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for (i, item) in items.into_iter().enumerate() {
        if is_empty_entry(&item) {
            skipped += 1;
            continue;
        }
        match serde_json::from_value::<RawEntry>(item).ok().and_then(RawEntry::into_entry) {
            Some(entry) => entries.push(entry),
            None => {
                debug!("[LOADER] Skipping malformed entry #{}", i);
                skipped += 1;
            }
        }
    }
    Ok((entries, skipped))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Sample paths in the file are relative to the file itself.
pub fn resolve_clip_path(source: &Path, clip: &str) -> PathBuf {
    let clip_path = Path::new(clip);
    if clip_path.is_absolute() {
        return clip_path.to_path_buf();
    }
    match source.parent() {
        Some(dir) => dir.join(clip_path),
        None => clip_path.to_path_buf(),
    }
}

/// Read `source` and build a fresh catalog, registering every clip with
/// `audio`. The bank is only cleared once the file has parsed, so a failed
/// load leaves the previous catalog playable.
pub fn load(source: &Path, audio: &mut dyn AudioBank) -> Result<Catalog, LoadError> {
    if !source.exists() {
        warn!("[LOADER] Coordinate file not found: {}", source.display());
        return Err(LoadError::FileNotFound(source.to_path_buf()));
    }

    let text = std::fs::read_to_string(source).map_err(|e| LoadError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;

    let (entries, skipped) = parse_entries(&text).map_err(|reason| LoadError::Parse {
        path: source.to_path_buf(),
        reason,
    })?;

    audio.clear();

    let records: Vec<ClipRecord> = entries
        .into_iter()
        .map(|entry| {
            let voice = audio.load(&resolve_clip_path(source, &entry.path));
            ClipRecord::new(entry.path, entry.position, voice)
        })
        .collect();

    if skipped > 0 {
        warn!("[LOADER] Skipped {} malformed entries in {}", skipped, source.display());
    }
    info!("[LOADER] Loaded {} clips from {}", records.len(), source.display());

    Ok(Catalog::new(source, records, skipped))
}
