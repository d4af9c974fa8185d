//! JSON artifact files: atomic writes and optional loads.

use crate::error::MlError;
use std::path::Path;

/// Serialize `data` as pretty JSON and write it to `path` atomically.
///
/// The bytes go to a `.tmp` sibling first and are renamed into place, so a
/// reader never sees a half-written artifact. Parent directories are created.
pub fn atomic_write_json<T: serde::Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), MlError> {
    let json = serde_json::to_string_pretty(data)?;
    atomic_write(path, json.as_bytes())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), MlError> {
    let fail = |e: std::io::Error| MlError::persistence(format!("{}: {e}", path.display()));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(fail)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data).map_err(fail)?;
    std::fs::rename(&tmp, path).map_err(fail)?;
    Ok(())
}

/// Load JSON from `path`; `Ok(None)` when the file does not exist.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, MlError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)
        .map_err(|e| MlError::persistence(format!("{} is not valid JSON: {e}", path.display())))?;
    Ok(Some(value))
}
