//! `shelfshare health` command handler

use std::io::Write;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use shelfshare_core::config::ShelfShareConfig;
use shelfshare_favorites::{FavoritesConfig, HttpRemoteStore, RemoteStore};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `health` command.
///
/// # Errors
///
/// `CliError::RemoteUnavailable` (exit code 3) after rendering the report
/// when the Remote Store does not answer with a 2xx.
pub async fn execute(config: &ShelfShareConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let store = HttpRemoteStore::new(&FavoritesConfig::from_core(config))?;

    let started = Instant::now();
    let result = store.ping().await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let report = HealthReport {
        base_url: store.base_url().to_string(),
        reachable: result.is_ok(),
        latency_ms,
        error: result.as_ref().err().map(ToString::to_string),
    };

    match &result {
        Ok(()) => info!(base_url = %report.base_url, latency_ms, "remote store reachable"),
        Err(e) => warn!(base_url = %report.base_url, error = %e, "remote store unreachable"),
    }

    writer.render(&report)?;

    match result {
        Ok(()) => Ok(()),
        Err(e) => Err(CliError::RemoteUnavailable(e.to_string())),
    }
}

#[derive(Serialize)]
pub struct HealthReport {
    pub base_url: String,
    pub reachable: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Render for HealthReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.reachable {
            writeln!(
                w,
                "Remote Store: {} ({}ms)",
                "reachable".green().bold(),
                self.latency_ms
            )?;
        } else {
            writeln!(w, "Remote Store: {}", "unreachable".red().bold())?;
        }
        writeln!(w, "  URL: {}", self.base_url)?;
        if let Some(error) = &self.error {
            writeln!(w, "  Error: {}", error.red())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_text(report: &HealthReport) -> String {
        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_health_report_reachable() {
        let report = HealthReport {
            base_url: "http://localhost:5000/api".to_owned(),
            reachable: true,
            latency_ms: 12,
            error: None,
        };

        let output = render_text(&report);
        assert!(output.contains("reachable"));
        assert!(output.contains("12ms"));
        assert!(!output.contains("Error:"));
    }

    #[test]
    fn test_health_report_unreachable() {
        let report = HealthReport {
            base_url: "http://localhost:5000/api".to_owned(),
            reachable: false,
            latency_ms: 3,
            error: Some("remote store unreachable: connection refused".to_owned()),
        };

        let output = render_text(&report);
        assert!(output.contains("unreachable"));
        assert!(output.contains("connection refused"));

        let json = serde_json::to_value(&report).expect("should serialize");
        assert_eq!(json["reachable"].as_bool(), Some(false));
        assert!(json["error"].as_str().is_some());
    }
}
