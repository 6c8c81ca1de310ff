//! Sherlock adapter: hunts a username across social networks.
//!
//! Wraps the `sherlock` CLI. Found profiles are printed one per line as
//! `[+] Site: https://...`; we parse those into a structured payload.

use async_trait::async_trait;
use serde_json::json;

use super::{require_binary, run_command, AdapterError, ToolAdapter};
use crate::core::{Target, ToolKind};
use crate::validators;

pub struct SherlockAdapter {
    binary: String,
}

impl SherlockAdapter {
    pub fn new() -> Self {
        Self {
            binary: "sherlock".to_string(),
        }
    }

    /// Use a different binary name or path (tests, local installs).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for SherlockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `[+] Site: url` lines from sherlock output.
fn parse_found(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("[+]")?.trim();
            let (site, url) = rest.split_once(':')?;
            Some(json!({
                "site": site.trim(),
                "url": url.trim(),
            }))
        })
        .collect()
}

#[async_trait]
impl ToolAdapter for SherlockAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Sherlock
    }

    fn accepts(&self, target: &Target) -> bool {
        matches!(target, Target::Username(_))
    }

    async fn invoke(&self, target: &Target) -> Result<serde_json::Value, AdapterError> {
        let Target::Username(username) = target else {
            return Err(AdapterError::permanent(format!(
                "sherlock expects a username target, got {}",
                target.kind_str()
            )));
        };
        validators::validate_username(username)
            .map_err(|e| AdapterError::permanent(e.to_string()))?;
        require_binary(&self.binary)?;

        let stdout = run_command(
            &self.binary,
            &[username.as_str(), "--print-found", "--no-color", "--nsfw"],
        )
        .await?;

        let profiles = parse_found(&stdout);
        Ok(json!({
            "username": username,
            "found_count": profiles.len(),
            "profiles": profiles,
        }))
    }
}
