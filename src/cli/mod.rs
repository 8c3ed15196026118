pub mod daemon_path;
pub mod process;
pub mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{restart_daemon, start_companion, stop_companion, stop_daemon};
use report::{process_report_command, ReportCommand};
use tracing::{level_filters::LevelFilter, warn};

use crate::{
    config::{ConfigArgs, TrackerConfig},
    daemon::start_daemon,
    utils::logging::{enable_logging, CLI_PREFIX, DAEMON_PREFIX},
};

#[derive(Parser, Debug)]
#[command(name = "focus-tracker", version, long_about = None)]
#[command(about = "Tracks time spent in desktop applications and websites", long_about = None)]
pub(crate) struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application, replacing a running one")]
    Start {
        #[command(flatten)]
        config: ConfigArgs,
    },
    #[command(about = "Display the usage report of a single day")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[command(flatten)]
        config: ConfigArgs,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    match args.commands {
        Commands::Start { config } => {
            let resolved = TrackerConfig::resolve(config.clone())?;
            enable_logging(CLI_PREFIX, &resolved.app_dir, logging_level, args.log)?;
            restart_daemon(&config)?;
            if let Some(companion) = &resolved.companion {
                if let Err(e) = start_companion(companion) {
                    warn!("Couldn't start {companion}: {e:?}");
                }
            }
            Ok(())
        }
        Commands::Stop { config } => {
            let resolved = TrackerConfig::resolve(config)?;
            enable_logging(CLI_PREFIX, &resolved.app_dir, logging_level, args.log)?;
            stop_daemon()?;
            if let Some(companion) = &resolved.companion {
                stop_companion(companion);
            }
            Ok(())
        }
        Commands::Serve { config } => {
            let resolved = TrackerConfig::resolve(config)?;
            enable_logging(DAEMON_PREFIX, &resolved.app_dir, logging_level, true)?;
            start_daemon(resolved).await
        }
        Commands::Report { command } => {
            let resolved = TrackerConfig::resolve(command.config.clone())?;
            enable_logging(CLI_PREFIX, &resolved.app_dir, logging_level, args.log)?;
            process_report_command(command, &resolved).await
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Args, Commands};

    #[test]
    fn subcommands_parse() {
        let args = Args::try_parse_from(["focus-tracker", "start", "--interval", "5"]).unwrap();
        assert!(matches!(args.commands, Commands::Start { config } if config.polling_seconds == 5));

        let args =
            Args::try_parse_from(["focus-tracker", "--log", "report", "-d", "yesterday", "-t", "3"])
                .unwrap();
        assert!(args.log);
        assert!(matches!(args.commands, Commands::Report { .. }));

        assert!(Args::try_parse_from(["focus-tracker", "timeline"]).is_err());
    }
}
