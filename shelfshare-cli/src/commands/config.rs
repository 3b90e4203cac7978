//! `shelfshare config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use shelfshare_core::config::ShelfShareConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const SECTIONS: [&str; 3] = ["general", "remote", "cache"];

/// Execute the `config` command against an already attempted load.
pub fn execute(
    args: ConfigArgs,
    config_path: &Path,
    loaded: Result<ShelfShareConfig, CliError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, loaded, writer),
        ConfigAction::Show { section } => execute_show(config_path, loaded?, section, writer),
    }
}

/// Reports whether the configuration loads and validates.
///
/// # Errors
///
/// `CliError::Config` after rendering the report when the configuration is
/// invalid.
fn execute_validate(
    config_path: &Path,
    loaded: Result<ShelfShareConfig, CliError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: loaded.is_ok(),
        errors: loaded.err().map(|e| e.to_string()).into_iter().collect(),
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Displays the effective configuration, optionally one section.
///
/// Credentials embedded in `remote.base_url` are redacted.
fn execute_show(
    config_path: &Path,
    mut config: ShelfShareConfig,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    config.remote.base_url = redact_url(&config.remote.base_url);

    let (config_json, config_toml) = match section.as_deref() {
        None => section_view(&config)?,
        Some("general") => section_view(&config.general)?,
        Some("remote") => section_view(&config.remote)?,
        Some("cache") => section_view(&config.cache)?,
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    let report = ConfigReport {
        source: config_path.display().to_string(),
        section,
        config: config_json,
        config_toml,
    };

    writer.render(&report)?;

    Ok(())
}

fn section_view<T: Serialize>(value: &T) -> Result<(serde_json::Value, String), CliError> {
    let json = serde_json::to_value(value)?;
    let toml = toml::to_string_pretty(value)
        .unwrap_or_else(|e| format!("(serialization error: {})", e));
    Ok((json, toml))
}

/// Replaces `user:password@` in a URL with `***REDACTED***@`.
fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_owned();
    };
    let scheme = &url[..scheme_end + 3];
    let rest = &url[scheme_end + 3..];

    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at_pos) => format!("{}***REDACTED***{}", scheme, &rest[at_pos..]),
        None => url.to_owned(),
    }
}

/// Configuration display report.
///
/// JSON output carries the structured config; text output prints TOML.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    /// `None` = full config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
