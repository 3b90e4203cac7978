//! `shelfshare favorites` command handler
//!
//! Each invocation is one session: log in as `--user` (which loads the
//! favorites, falling back to the local cache), run the action, log out.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use shelfshare_core::config::ShelfShareConfig;
use shelfshare_core::types::{ItemId, SyncStatus};
use shelfshare_favorites::{
    ConfiguredCache, FavoritesConfig, FavoritesError, FavoritesSession, HttpRemoteStore, LoadOutcome,
    MutationOutcome,
};

use crate::cli::{FavoritesAction, FavoritesArgs, ItemTarget};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

type Session = FavoritesSession<HttpRemoteStore, ConfiguredCache>;

/// Execute the `favorites` command.
///
/// A Remote Store outage is not an error here: mutations are applied to the
/// local cache and the output reports `offline-pending`.
pub async fn execute(
    args: FavoritesArgs,
    config: &ShelfShareConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut session = open_session(config)?;

    match args.action {
        FavoritesAction::Load { user } => {
            let outcome = session.login(&user).await?;
            writer.render(&outcome)?;
        }
        FavoritesAction::Toggle(target) => {
            let report = mutate(&mut session, target, Mutation::Toggle).await?;
            writer.render(&report)?;
        }
        FavoritesAction::Add(target) => {
            let report = mutate(&mut session, target, Mutation::Add).await?;
            writer.render(&report)?;
        }
        FavoritesAction::Remove(target) => {
            let report = mutate(&mut session, target, Mutation::Remove).await?;
            writer.render(&report)?;
        }
        FavoritesAction::Check(target) => {
            ItemId::new(target.item.as_str()).map_err(FavoritesError::from)?;
            let loaded = session.login(&target.user).await?;
            let report = CheckReport {
                user: target.user.clone(),
                favorite: session.is_favorite(&target.item),
                item: target.item,
                status: loaded.status,
                warning: loaded.warning,
            };
            writer.render(&report)?;
        }
    }

    session.logout();
    Ok(())
}

fn open_session(config: &ShelfShareConfig) -> Result<Session, CliError> {
    let favorites_config = FavoritesConfig::from_core(config);
    let remote = HttpRemoteStore::new(&favorites_config)?;
    let cache = ConfiguredCache::from_config(&favorites_config);
    debug!(
        base_url = %remote.base_url(),
        cache = cache.kind(),
        "favorites session configured"
    );
    Ok(FavoritesSession::new(Arc::new(remote), Arc::new(cache)))
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Toggle,
    Add,
    Remove,
}

/// Logs in as `target.user` and runs one mutation.
async fn mutate(
    session: &mut Session,
    target: ItemTarget,
    mutation: Mutation,
) -> Result<MutationReport, CliError> {
    session.login(&target.user).await?;
    let outcome = match mutation {
        Mutation::Toggle => session.toggle(&target.item).await?,
        Mutation::Add => session.add(&target.item).await?,
        Mutation::Remove => session.remove(&target.item).await?,
    };
    info!(
        user = %target.user,
        item = %outcome.item,
        action = %outcome.action,
        status = %outcome.status,
        "favorites updated"
    );
    Ok(MutationReport {
        user: target.user,
        outcome,
    })
}

fn render_status(status: SyncStatus) -> colored::ColoredString {
    use colored::Colorize;

    match status {
        SyncStatus::Synced => status.as_str().green(),
        SyncStatus::OfflinePending => status.as_str().yellow(),
        SyncStatus::Error => status.as_str().red(),
    }
}

impl Render for LoadOutcome {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Favorites for {} [{}]",
            self.user.as_str().bold(),
            render_status(self.status)
        )?;
        if let Some(warning) = &self.warning {
            writeln!(w, "  Warning: {}", warning.yellow())?;
        }
        if self.items.is_empty() {
            writeln!(w, "  (none)")?;
        }
        for item in &self.items {
            writeln!(w, "  - {}", item)?;
        }

        Ok(())
    }
}

/// Mutation result with the user it was applied for.
#[derive(Serialize)]
pub struct MutationReport {
    pub user: String,
    #[serde(flatten)]
    pub outcome: MutationOutcome,
}

impl Render for MutationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let membership = if self.outcome.favorite {
            "favorite".green()
        } else {
            "not favorite".normal()
        };
        writeln!(
            w,
            "{} {} for {} ({}) [{}]",
            self.outcome.item.as_str().bold(),
            self.outcome.action,
            self.user,
            membership,
            render_status(self.outcome.status)
        )?;
        if let Some(error) = &self.outcome.remote_error {
            writeln!(w, "  Saved locally only: {}", error.yellow())?;
        }

        Ok(())
    }
}

#[derive(Serialize)]
pub struct CheckReport {
    pub user: String,
    pub item: String,
    pub favorite: bool,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let answer = if self.favorite { "yes".green() } else { "no".normal() };
        writeln!(
            w,
            "{} is a favorite of {}: {} [{}]",
            self.item,
            self.user,
            answer,
            render_status(self.status)
        )?;
        if let Some(warning) = &self.warning {
            writeln!(w, "  Warning: {}", warning.yellow())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfshare_core::types::{ToggleAction, UserId};

    fn render_text<T: Render>(report: &T) -> String {
        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    fn outcome(remote_error: Option<&str>) -> MutationOutcome {
        MutationOutcome {
            item: ItemId::new("book-42").expect("valid id"),
            action: ToggleAction::Added,
            favorite: true,
            status: if remote_error.is_some() {
                SyncStatus::OfflinePending
            } else {
                SyncStatus::Synced
            },
            remote_error: remote_error.map(str::to_owned),
        }
    }

    #[test]
    fn test_load_outcome_render_text() {
        let loaded = LoadOutcome {
            user: UserId::new("u2").expect("valid id"),
            items: vec![ItemId::new("book-7").expect("valid id")],
            status: SyncStatus::OfflinePending,
            warning: Some("favorites served from local cache".to_owned()),
        };

        let output = render_text(&loaded);
        assert!(output.contains("u2"));
        assert!(output.contains("- book-7"));
        assert!(output.contains("offline-pending"));
        assert!(output.contains("Warning"));
    }

    #[test]
    fn test_load_outcome_render_text_empty() {
        let loaded = LoadOutcome {
            user: UserId::new("u1").expect("valid id"),
            items: Vec::new(),
            status: SyncStatus::Synced,
            warning: None,
        };

        let output = render_text(&loaded);
        assert!(output.contains("(none)"));
        assert!(!output.contains("Warning"));
    }

    #[test]
    fn test_mutation_report_json_is_flat() {
        let report = MutationReport {
            user: "u1".to_owned(),
            outcome: outcome(None),
        };

        let json = serde_json::to_value(&report).expect("should serialize");
        assert_eq!(json["user"].as_str(), Some("u1"));
        assert_eq!(json["item"].as_str(), Some("book-42"));
        assert_eq!(json["action"].as_str(), Some("added"));
        assert_eq!(json["status"].as_str(), Some("synced"));
        assert!(json.get("remote_error").is_none());
    }

    #[test]
    fn test_mutation_report_degraded_text() {
        let report = MutationReport {
            user: "u1".to_owned(),
            outcome: outcome(Some("remote store unreachable: connection refused")),
        };

        let output = render_text(&report);
        assert!(output.contains("book-42"));
        assert!(output.contains("added"));
        assert!(output.contains("Saved locally only"));
        assert!(output.contains("connection refused"));
    }

    #[test]
    fn test_check_report_render() {
        let report = CheckReport {
            user: "u1".to_owned(),
            item: "book-42".to_owned(),
            favorite: false,
            status: SyncStatus::Synced,
            warning: None,
        };

        let output = render_text(&report);
        assert!(output.contains("book-42 is a favorite of u1: no"));

        let json = serde_json::to_value(&report).expect("should serialize");
        assert_eq!(json["favorite"].as_bool(), Some(false));
    }
}
