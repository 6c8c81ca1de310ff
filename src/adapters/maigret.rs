//! Maigret adapter: username search with site metadata.
//!
//! Maigret covers a wider site list than sherlock and both run for the
//! same username target, so reports can cross-check the two.

use async_trait::async_trait;
use serde_json::json;

use super::{require_binary, run_command, AdapterError, ToolAdapter};
use crate::core::{Target, ToolKind};
use crate::validators;

pub struct MaigretAdapter {
    binary: String,
}

impl MaigretAdapter {
    pub fn new() -> Self {
        Self {
            binary: "maigret".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for MaigretAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_claimed(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("[+]")?.trim();
            match rest.split_once(':') {
                Some((site, url)) => Some(json!({
                    "site": site.trim(),
                    "url": url.trim(),
                })),
                None => Some(json!({ "site": rest })),
            }
        })
        .collect()
}

#[async_trait]
impl ToolAdapter for MaigretAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Maigret
    }

    fn accepts(&self, target: &Target) -> bool {
        matches!(target, Target::Username(_))
    }

    async fn invoke(&self, target: &Target) -> Result<serde_json::Value, AdapterError> {
        let Target::Username(username) = target else {
            return Err(AdapterError::permanent(format!(
                "maigret expects a username target, got {}",
                target.kind_str()
            )));
        };
        validators::validate_username(username)
            .map_err(|e| AdapterError::permanent(e.to_string()))?;
        require_binary(&self.binary)?;

        let stdout = run_command(
            &self.binary,
            &[username.as_str(), "--no-color", "--no-progressbar"],
        )
        .await?;

        let sites = parse_claimed(&stdout);
        Ok(json!({
            "username": username,
            "found_count": sites.len(),
            "sites": sites,
        }))
    }
}
