//! PhoneInfoga adapter: phone number reconnaissance.
//!
//! Runs the upstream docker image (`sundowndev/phoneinfoga`), the same
//! distribution channel the tool's own docs recommend. The scanner's
//! `key: value` output lines are folded into a JSON payload.

use async_trait::async_trait;
use serde_json::json;

use super::{require_binary, run_command, AdapterError, ToolAdapter};
use crate::core::{Target, ToolKind};
use crate::validators;

const DOCKER_IMAGE: &str = "sundowndev/phoneinfoga";

pub struct PhoneInfogaAdapter {
    docker_binary: String,
}

impl PhoneInfogaAdapter {
    pub fn new() -> Self {
        Self {
            docker_binary: "docker".to_string(),
        }
    }

    pub fn with_docker(binary: impl Into<String>) -> Self {
        Self {
            docker_binary: binary.into(),
        }
    }
}

impl Default for PhoneInfogaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold `key: value` scanner lines into a JSON object. Lines that do not
/// match are kept verbatim under "notes".
fn parse_scan(stdout: &str) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    let mut notes = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) if !value.trim().is_empty() => {
                let key = key.trim().to_lowercase().replace(' ', "_");
                fields.insert(key, json!(value.trim()));
            }
            _ => notes.push(line.to_string()),
        }
    }
    if !notes.is_empty() {
        fields.insert("notes".to_string(), json!(notes));
    }
    serde_json::Value::Object(fields)
}

#[async_trait]
impl ToolAdapter for PhoneInfogaAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::PhoneInfoga
    }

    fn accepts(&self, target: &Target) -> bool {
        matches!(target, Target::Phone(_))
    }

    async fn invoke(&self, target: &Target) -> Result<serde_json::Value, AdapterError> {
        let Target::Phone(phone) = target else {
            return Err(AdapterError::permanent(format!(
                "phoneinfoga expects a phone target, got {}",
                target.kind_str()
            )));
        };
        validators::validate_phone(phone).map_err(|e| AdapterError::permanent(e.to_string()))?;
        require_binary(&self.docker_binary)?;

        let stdout = run_command(
            &self.docker_binary,
            &["run", "--rm", DOCKER_IMAGE, "scan", "-n", phone.as_str()],
        )
        .await?;

        Ok(json!({
            "phone": phone,
            "scan": parse_scan(&stdout),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_only_phones() {
        let adapter = PhoneInfogaAdapter::new();
        assert!(adapter.accepts(&Target::Phone("+48123456789".into())));
        assert!(!adapter.accepts(&Target::Email("a@b.com".into())));
    }

    #[test]
    fn test_parse_scan_fields_and_notes() {
        let stdout = "\
Country: Poland
Carrier: Orange
Local format: 123 456 789

Running scan...
";
        let parsed = parse_scan(stdout);
        assert_eq!(parsed["country"], "Poland");
        assert_eq!(parsed["carrier"], "Orange");
        assert_eq!(parsed["local_format"], "123 456 789");
        assert_eq!(parsed["notes"][0], "Running scan...");
    }

    #[tokio::test]
    async fn test_invalid_phone_is_permanent() {
        let adapter = PhoneInfogaAdapter::with_docker("no-such-docker");
        let err = adapter.invoke(&Target::Phone("123".into())).await.unwrap_err();
        assert_eq!(err.kind, crate::core::ErrorKind::Permanent);
    }
}
