use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{AppError, ResultExt};

/// Only `.csv` paths are accepted as stage inputs.
pub fn ensure_csv_path(path: &Path) -> Result<(), AppError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "{} is not a .csv file",
            path.display()
        )))
    }
}

pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    reader
        .deserialize()
        .enumerate()
        .map(|(idx, row)| {
            row.with_context(|| format!("Malformed row {} in {}", idx + 1, path.display()))
        })
        .collect()
}

/// Write `rows` under an explicit header line, creating parent directories.
/// The header is written even when there are no rows.
pub fn write_rows<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
