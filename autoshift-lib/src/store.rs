//! Reading and writing `shiftcodes.json`.

use std::path::Path;

use autoshift_core::ShiftCodeFile;

use crate::error::StoreError;

/// Load the record file. A missing file is [`StoreError::NotFound`].
pub fn load(path: &Path) -> Result<ShiftCodeFile, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| StoreError::json(path, e))
}

/// Load the record file, starting from an empty set when it does not exist yet.
pub fn load_or_default(path: &Path) -> Result<ShiftCodeFile, StoreError> {
    match load(path) {
        Err(StoreError::NotFound { .. }) => {
            log::info!("{} does not exist yet, starting with an empty set", path.display());
            Ok(ShiftCodeFile::default())
        }
        other => other,
    }
}

/// Serialized file content: pretty-printed JSON with a trailing newline.
pub fn to_json(file: &ShiftCodeFile) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(file)?;
    json.push('\n');
    Ok(json)
}

/// Write the record file atomically, creating parent directories as needed.
pub fn save(path: &Path, file: &ShiftCodeFile) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = to_json(file).map_err(|e| StoreError::json(path, e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}
