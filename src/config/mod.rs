//! Runtime configuration. Every value can come from a command line flag or an environment
//! variable, flags take precedence.

pub mod aliases;

use std::{
    net::SocketAddr,
    path::{absolute, PathBuf},
    time::Duration,
};

use anyhow::Result;

use crate::utils::dir::create_application_default_path;

pub const DEFAULT_POLLING_SECONDS: u64 = 10;
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
const ALIAS_FILE_NAME: &str = "aliases.json";

#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    #[arg(
        long,
        env = "FOCUS_TRACKER_DB_PATH",
        help = "Path to the usage database. Without it the tracker runs in dry mode and stores nothing"
    )]
    pub db: Option<PathBuf>,
    #[arg(
        long = "interval",
        env = "FOCUS_TRACKER_POLL_SECONDS",
        default_value_t = DEFAULT_POLLING_SECONDS,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between two foreground application checks"
    )]
    pub polling_seconds: u64,
    #[arg(
        long,
        env = "FOCUS_TRACKER_ALIASES",
        help = "JSON file mapping raw names to display names. Defaults to aliases.json in the application directory"
    )]
    pub aliases: Option<PathBuf>,
    #[arg(
        long,
        env = "FOCUS_TRACKER_LISTEN",
        default_value = DEFAULT_LISTEN,
        help = "Address the browser extension submits usage to"
    )]
    pub listen: SocketAddr,
    #[arg(
        long,
        env = "FOCUS_TRACKER_COMPANION",
        help = "Desktop application started and stopped together with the tracker"
    )]
    pub companion: Option<String>,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
}

impl ConfigArgs {
    /// Re-encodes explicitly passed values so that a spawned daemon sees the same configuration.
    pub fn to_command_args(&self) -> Vec<String> {
        let mut args = vec![
            "--interval".to_string(),
            self.polling_seconds.to_string(),
            "--listen".to_string(),
            self.listen.to_string(),
        ];
        let paths = [
            ("--db", &self.db),
            ("--aliases", &self.aliases),
            ("--dir", &self.dir),
        ];
        for (flag, value) in paths {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.to_string_lossy().into_owned());
            }
        }
        if let Some(companion) = &self.companion {
            args.push("--companion".to_string());
            args.push(companion.clone());
        }
        args
    }
}

/// Fully resolved configuration, constructed once and handed to the components that need it.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub app_dir: PathBuf,
    pub db_path: Option<PathBuf>,
    pub polling_interval: Duration,
    pub alias_path: PathBuf,
    pub listen: SocketAddr,
    pub companion: Option<String>,
}

impl TrackerConfig {
    pub fn resolve(args: ConfigArgs) -> Result<Self> {
        // Paths are made absolute since the daemon changes its working directory.
        let app_dir = match args.dir {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                absolute(dir)?
            }
            None => create_application_default_path()?,
        };
        let alias_path = match args.aliases {
            Some(path) => absolute(path)?,
            None => app_dir.join(ALIAS_FILE_NAME),
        };
        let db_path = args
            .db
            .filter(|v| !v.as_os_str().is_empty())
            .map(absolute)
            .transpose()?;

        Ok(Self {
            db_path,
            polling_interval: Duration::from_secs(args.polling_seconds),
            alias_path,
            listen: args.listen,
            companion: args.companion.filter(|v| !v.trim().is_empty()),
            app_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use clap::Parser;
    use tempfile::tempdir;

    use super::{ConfigArgs, TrackerConfig};

    #[derive(Parser)]
    struct TestArgs {
        #[command(flatten)]
        config: ConfigArgs,
    }

    const CONFIG_ENV: [&str; 5] = [
        "FOCUS_TRACKER_DB_PATH",
        "FOCUS_TRACKER_POLL_SECONDS",
        "FOCUS_TRACKER_ALIASES",
        "FOCUS_TRACKER_LISTEN",
        "FOCUS_TRACKER_COMPANION",
    ];

    /// Parses only the given arguments, ignoring whatever the developer has exported.
    fn parse_isolated(args: &[&str]) -> Result<TestArgs, clap::Error> {
        for var in CONFIG_ENV {
            std::env::remove_var(var);
        }
        TestArgs::try_parse_from(args.iter().copied())
    }

    #[test]
    fn defaults_are_applied() -> Result<()> {
        let dir = tempdir()?;
        let dir_arg = dir.path().to_string_lossy().into_owned();
        let args = parse_isolated(&["test", "--dir", &dir_arg])?;
        let config = TrackerConfig::resolve(args.config)?;

        assert_eq!(config.polling_interval, Duration::from_secs(10));
        assert_eq!(config.alias_path, dir.path().join("aliases.json"));
        assert_eq!(config.listen.to_string(), "127.0.0.1:8080");
        assert!(config.db_path.is_none());
        assert!(config.companion.is_none());
        Ok(())
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(parse_isolated(&["test", "--interval", "0"]).is_err());
    }

    #[test]
    fn command_args_round_trip() -> Result<()> {
        let args = TestArgs::try_parse_from([
            "test",
            "--db",
            "/tmp/usage.db",
            "--interval",
            "30",
            "--companion",
            "Docker",
        ])?;
        let mut forwarded = vec!["test".to_string()];
        forwarded.extend(args.config.to_command_args());
        let parsed = TestArgs::try_parse_from(forwarded)?;

        assert_eq!(parsed.config.db, args.config.db);
        assert_eq!(parsed.config.polling_seconds, 30);
        assert_eq!(parsed.config.companion.as_deref(), Some("Docker"));
        Ok(())
    }
}
