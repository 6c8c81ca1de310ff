//! Holehe adapter: checks which services an email is registered on.
//!
//! Holehe prints one line per probed service; `[+]` marks a hit, `[x]`
//! marks a rate-limited probe. Rate-limited lines are reported in the
//! payload so the caller can see partial coverage.

use async_trait::async_trait;
use serde_json::json;

use super::{require_binary, run_command, AdapterError, ToolAdapter};
use crate::core::{Target, ToolKind};
use crate::validators;

pub struct HoleheAdapter {
    binary: String,
}

impl HoleheAdapter {
    pub fn new() -> Self {
        Self {
            binary: "holehe".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for HoleheAdapter {
    fn default() -> Self {
        Self::new()
    }
}

struct ParsedOutput {
    used: Vec<String>,
    rate_limited: Vec<String>,
}

fn parse_services(stdout: &str) -> ParsedOutput {
    let mut used = Vec::new();
    let mut rate_limited = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(service) = line.strip_prefix("[+]") {
            used.push(service.trim().to_string());
        } else if let Some(service) = line.strip_prefix("[x]") {
            rate_limited.push(service.trim().to_string());
        }
    }
    ParsedOutput { used, rate_limited }
}

#[async_trait]
impl ToolAdapter for HoleheAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Holehe
    }

    fn accepts(&self, target: &Target) -> bool {
        matches!(target, Target::Email(_))
    }

    async fn invoke(&self, target: &Target) -> Result<serde_json::Value, AdapterError> {
        let Target::Email(email) = target else {
            return Err(AdapterError::permanent(format!(
                "holehe expects an email target, got {}",
                target.kind_str()
            )));
        };
        validators::validate_email(email).map_err(|e| AdapterError::permanent(e.to_string()))?;
        require_binary(&self.binary)?;

        let stdout = run_command(&self.binary, &[email.as_str(), "--no-clear"]).await?;

        let parsed = parse_services(&stdout);
        Ok(json!({
            "email": email,
            "found_count": parsed.used.len(),
            "used_on": parsed.used,
            "rate_limited": parsed.rate_limited,
        }))
    }
}
