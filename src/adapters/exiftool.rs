//! ExifTool adapter: metadata extraction from files.
//!
//! `exiftool -j` emits a JSON array with one object per input file; with a
//! single input we unwrap the first element as the payload.

use async_trait::async_trait;
use serde_json::json;

use super::{require_binary, run_command, AdapterError, ToolAdapter};
use crate::core::{Target, ToolKind};
use crate::validators;

pub struct ExifToolAdapter {
    binary: String,
}

impl ExifToolAdapter {
    pub fn new() -> Self {
        Self {
            binary: "exiftool".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for ExifToolAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_metadata(stdout: &str) -> Result<serde_json::Value, AdapterError> {
    let parsed: serde_json::Value = serde_json::from_str(stdout)
        .map_err(|e| AdapterError::transient(format!("exiftool produced invalid JSON: {e}")))?;
    match parsed {
        serde_json::Value::Array(mut items) if !items.is_empty() => Ok(items.remove(0)),
        _ => Err(AdapterError::transient(
            "exiftool produced no metadata object",
        )),
    }
}

#[async_trait]
impl ToolAdapter for ExifToolAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::ExifTool
    }

    fn accepts(&self, target: &Target) -> bool {
        matches!(target, Target::File(_))
    }

    async fn invoke(&self, target: &Target) -> Result<serde_json::Value, AdapterError> {
        let Target::File(path) = target else {
            return Err(AdapterError::permanent(format!(
                "exiftool expects a file target, got {}",
                target.kind_str()
            )));
        };
        validators::validate_file(path).map_err(|e| AdapterError::permanent(e.to_string()))?;
        require_binary(&self.binary)?;

        let path_str = path.to_string_lossy();
        // -g groups tags by family, -a keeps duplicates, -u includes
        // unknown tags; matches what the upstream tool recommends for
        // forensic dumps.
        let stdout = run_command(&self.binary, &["-j", "-g", "-a", "-u", path_str.as_ref()])
            .await?;

        let metadata = parse_metadata(&stdout)?;
        Ok(json!({
            "file": path.display().to_string(),
            "metadata": metadata,
        }))
    }
}
