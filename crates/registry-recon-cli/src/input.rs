//! JSON-lines input rows.

use std::io::BufRead;

use serde_json::Value;

use registry_recon::InputRow;

use crate::error::{CliError, CliResult};

/// Read one JSON object per line. Blank lines are skipped.
pub fn read_rows(reader: impl BufRead) -> CliResult<Vec<InputRow>> {
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line).map_err(|e| CliError::InvalidRow {
            line: index + 1,
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(row) => rows.push(row),
            other => {
                return Err(CliError::InvalidRow {
                    line: index + 1,
                    reason: format!("expected a JSON object, got {other}"),
                })
            }
        }
    }
    Ok(rows)
}
