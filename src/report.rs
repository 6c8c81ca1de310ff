//! Report generation: renders a finished batch to html, json, or txt.

use chrono::Local;
use serde_json::json;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::{JobResult, ResultSet};
use crate::orchestration::MetricsSnapshot;
use crate::{klog, Error, Result};

pub const REPORT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Json,
    Txt,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
            ReportFormat::Txt => "txt",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            "txt" | "text" => Ok(ReportFormat::Txt),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Render the batch into `output_dir` and return the report path.
    /// The directory is created if missing; the filename is timestamped
    /// so repeated runs never clobber each other.
    pub fn write(
        &self,
        results: &ResultSet,
        metrics: &MetricsSnapshot,
        format: ReportFormat,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .output_dir
            .join(format!("report_{stamp}.{}", format.extension()));

        let content = match format {
            ReportFormat::Html => render_html(results, metrics),
            ReportFormat::Json => render_json(results, metrics)?,
            ReportFormat::Txt => render_txt(results, metrics),
        };
        fs::write(&path, content)?;

        klog!("report written: {}", path.display());
        Ok(path)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn render_json(results: &ResultSet, metrics: &MetricsSnapshot) -> Result<String> {
    let report = json!({
        "metadata": {
            "generator": "kombajn",
            "version": REPORT_VERSION,
            "timestamp": timestamp(),
            "result_count": results.len(),
            "success_count": results.success_count(),
        },
        "metrics": metrics,
        "results": results,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

fn render_txt(results: &ResultSet, metrics: &MetricsSnapshot) -> String {
    let mut out = String::new();
    out.push_str("=== kombajn report ===\n\n");
    out.push_str(&format!("Generated: {}\n", timestamp()));
    out.push_str(&format!("Version: {REPORT_VERSION}\n"));
    out.push_str(&format!(
        "Jobs: {} ({} succeeded)\n\n",
        results.len(),
        results.success_count()
    ));

    for result in results {
        out.push_str(&format!(
            "--- {} - {} ---\n",
            result.tool,
            result.target.value()
        ));
        out.push_str(&format!("Status: {}\n", result.outcome.kind_str()));
        out.push_str(&format!(
            "Attempts: {}, total {} ms\n",
            result.total_attempts,
            result.total_duration.as_millis()
        ));
        if let Some(message) = result.outcome.message() {
            out.push_str(&format!("Error: {message}\n"));
        }
        if let crate::core::Outcome::Success { data, .. } = &result.outcome {
            out.push_str("Data:\n");
            write_data_summary(&mut out, data, 1);
        }
        out.push('\n');
    }

    out.push_str("--- per-tool metrics ---\n");
    let mut names: Vec<&String> = metrics.tools.keys().collect();
    names.sort();
    for name in names {
        let stats = &metrics.tools[name];
        out.push_str(&format!(
            "{name}: {} attempts, {} ok, {} retries, avg {} ms\n",
            stats.attempts,
            stats.successes,
            stats.retries,
            stats.average_duration().as_millis()
        ));
    }
    out
}

/// Flattened payload summary for the text report. Lists are truncated
/// to their first five items to keep the report skimmable.
fn write_data_summary(out: &mut String, data: &serde_json::Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match data {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                match value {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_)
                        if !is_empty_container(value) =>
                    {
                        out.push_str(&format!("{pad}{key}:\n"));
                        write_data_summary(out, value, indent + 1);
                    }
                    _ => out.push_str(&format!("{pad}{key}: {value}\n")),
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter().take(5) {
                if item.is_object() {
                    write_data_summary(out, item, indent);
                } else {
                    out.push_str(&format!("{pad}- {item}\n"));
                }
            }
            if items.len() > 5 {
                out.push_str(&format!("{pad}... ({} more items)\n", items.len() - 5));
            }
        }
        other => out.push_str(&format!("{pad}{other}\n")),
    }
}

fn is_empty_container(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_html(results: &ResultSet, metrics: &MetricsSnapshot) -> String {
    let mut sections = String::new();
    for result in results {
        sections.push_str(&render_html_section(result));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>kombajn report</title>
<meta charset="UTF-8">
<style>
body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; color: #333; }}
h1 {{ color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; }}
.metadata {{ margin-bottom: 20px; color: #7f8c8d; font-size: 0.9em; background: #f8f9fa; padding: 15px; border-radius: 5px; }}
.tool-section {{ margin-bottom: 30px; border: 1px solid #ddd; padding: 15px; border-radius: 5px; }}
.tool-header {{ background: #f5f5f5; padding: 10px; margin: -15px -15px 15px; border-bottom: 1px solid #ddd; display: flex; justify-content: space-between; }}
.success {{ color: #27ae60; font-weight: bold; }}
.error {{ color: #e74c3c; font-weight: bold; }}
.result-data {{ max-height: 400px; overflow: auto; background: #f8f9fa; padding: 10px; font-family: monospace; font-size: 0.9em; }}
.result-data pre {{ margin: 0; white-space: pre-wrap; }}
footer {{ margin-top: 30px; text-align: center; font-size: 0.8em; color: #7f8c8d; }}
</style>
</head>
<body>
<h1>kombajn report</h1>
<div class="metadata">
<p><strong>Generated:</strong> {timestamp}</p>
<p><strong>Jobs:</strong> {total} ({ok} succeeded)</p>
<p><strong>Attempts:</strong> {attempts}</p>
</div>
{sections}
<footer><p>kombajn v{version}</p></footer>
</body>
</html>
"#,
        timestamp = timestamp(),
        total = results.len(),
        ok = results.success_count(),
        attempts = metrics.total_attempts(),
        sections = sections,
        version = REPORT_VERSION,
    )
}

fn render_html_section(result: &JobResult) -> String {
    let title = html_escape(&format!("{} - {}", result.tool, result.target.value()));
    let (badge_class, badge) = if result.outcome.is_success() {
        ("success", "&#10003; success".to_string())
    } else {
        ("error", format!("&#10007; {}", result.outcome.kind_str()))
    };

    let body = match &result.outcome {
        crate::core::Outcome::Success { data, .. } => {
            let pretty =
                serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
            format!(
                "<div class=\"result-data\"><pre>{}</pre></div>",
                html_escape(&pretty)
            )
        }
        other => match other.message() {
            Some(message) => format!(
                "<p class=\"error\">{}</p>",
                html_escape(&message)
            ),
            None => String::new(),
        },
    };

    format!(
        r#"<div class="tool-section">
<div class="tool-header"><h2>{title}</h2><span class="{badge_class}">{badge}</span></div>
<p>Attempts: {attempts}, total {ms} ms</p>
{body}
</div>
"#,
        title = title,
        badge_class = badge_class,
        badge = badge,
        attempts = result.total_attempts,
        ms = result.total_duration.as_millis(),
        body = body,
    )
}
