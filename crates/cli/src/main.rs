use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::Settings;

/// Library catalog server
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (local, staging, production)
    #[arg(long = "env", global = true, value_name = "NAME")]
    environment: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations and serve HTTP until interrupted (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_with(cli.config_dir.as_deref(), cli.environment.as_deref())
        .context("failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => shelf_app::app::run(settings).await,
        Command::Migrate => {
            let applied = shelf_app::app::migrate(settings).await?;
            tracing::info!(applied, "migrate finished");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from(["shelf", "migrate", "--env", "staging", "--config-dir", "cfg"]);

        assert!(matches!(cli.command, Some(Command::Migrate)));
        assert_eq!(cli.environment.as_deref(), Some("staging"));
        assert_eq!(cli.config_dir, Some(PathBuf::from("cfg")));
    }
}
