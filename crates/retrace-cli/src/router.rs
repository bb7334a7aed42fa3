// Command routing and dispatch

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::*;
use crate::error::CliResult;

/// Retrace - session file-mutation recorder with cascading undo/redo
#[derive(Parser, Debug)]
#[command(name = "retrace")]
#[command(bin_name = "retrace")]
#[command(about = "Record file mutations and undo or redo them with cascade semantics")]
#[command(
    long_about = "Retrace: a session recorder for file mutations.\n\nEvery change under a watched tree is captured into an append-only\noperation log. Any recorded operation can be undone or redone; later\ndependent operations cascade along with it, and pre-mutation backups\nare snapshotted before each destructive apply.\n\n🚀 Quick Start:\n  • retrace watch           Start recording changes\n  • retrace history         List recorded operations\n  • retrace preview 3       See what undoing #3 would touch\n  • retrace undo 3          Undo it (and everything after it)\n  • retrace redo 3          Bring it back"
)]
#[command(version)]
#[command(author = "Retrace Contributors")]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimize output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Operation log path
    #[arg(long, global = true, default_value = ".retrace/operations.log")]
    pub log: PathBuf,

    /// Backup snapshot directory
    #[arg(long, global = true, default_value = ".retrace/backups")]
    pub backups: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Undo a recorded operation
    #[command(about = "Undo an operation and every active operation recorded after it")]
    Undo {
        /// Operation id, or 1-based position among active operations
        #[arg(value_name = "ID|INDEX")]
        target: String,
    },

    /// Redo an undone operation
    #[command(about = "Redo an operation and every undone operation recorded after it")]
    Redo {
        /// Operation id, or 1-based position among undone operations
        #[arg(value_name = "ID|INDEX")]
        target: String,
    },

    /// Preview an undo or redo without applying it
    #[command(about = "Show the cascade an undo or redo would process, without mutating files")]
    Preview {
        /// Operation id, or 1-based position in the filtered view
        #[arg(value_name = "ID|INDEX")]
        target: String,

        /// Preview a redo instead of an undo
        #[arg(long)]
        redo: bool,
    },

    /// Watch a directory tree and record changes
    #[command(about = "Monitor the filesystem and append captured operations to the log")]
    Watch {
        /// Directory to watch (default: current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        root: PathBuf,

        /// Config file with watch defaults (default: ./retrace.toml,
        /// then the user config directory)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Glob pattern to ignore (repeatable; overrides config/defaults)
        #[arg(long = "ignore", value_name = "GLOB")]
        ignore: Vec<String>,

        /// File extension to capture (repeatable; default: all)
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,

        /// Largest file size to diff, in bytes
        #[arg(long, value_name = "BYTES")]
        max_file_size: Option<u64>,

        /// Debounce window in milliseconds
        #[arg(long, value_name = "MS")]
        settle_ms: Option<u64>,

        /// Print a status line every N seconds
        #[arg(long, value_name = "SECS")]
        status_interval: Option<u64>,
    },

    /// List recorded operations
    #[command(about = "List the operation log in chronological order")]
    History {
        /// Show only the most recent N records
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Edit the operation log
    #[command(about = "Log maintenance: remove records or compact the store")]
    Log {
        #[command(subcommand)]
        action: LogSubcommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum LogSubcommand {
    /// Remove one record by id
    #[command(about = "Remove one record from the log by id")]
    Rm {
        /// Operation id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Rewrite the log in chronological order
    #[command(about = "Rewrite the log sorted by timestamp and sequence")]
    Compact,
}

/// Parses arguments and dispatches to command handlers
pub struct CommandRouter;

impl CommandRouter {
    /// Parse CLI arguments and route to the appropriate handler
    pub async fn route() -> CliResult<()> {
        let cli = Cli::parse();
        crate::logging::init_logging(cli.verbose, cli.quiet);
        Self::execute(&cli).await
    }

    /// Execute a parsed command
    pub async fn execute(cli: &Cli) -> CliResult<()> {
        tracing::debug!("Dispatching {:?}", cli.command);
        match &cli.command {
            Commands::Undo { target } => {
                let cmd = UndoCommand::new(cli.log.clone(), cli.backups.clone(), target.clone());
                cmd.execute().await
            }
            Commands::Redo { target } => {
                let cmd = RedoCommand::new(cli.log.clone(), cli.backups.clone(), target.clone());
                cmd.execute().await
            }
            Commands::Preview { target, redo } => {
                let cmd = PreviewCommand::new(
                    cli.log.clone(),
                    cli.backups.clone(),
                    target.clone(),
                    *redo,
                );
                cmd.execute().await
            }
            Commands::Watch {
                root,
                config,
                ignore,
                extensions,
                max_file_size,
                settle_ms,
                status_interval,
            } => {
                let cmd = WatchCommand {
                    log_path: cli.log.clone(),
                    root: root.clone(),
                    config_path: config
                        .clone()
                        .unwrap_or_else(crate::config::default_config_path),
                    ignore: ignore.clone(),
                    extensions: extensions.clone(),
                    max_file_size: *max_file_size,
                    settle_ms: *settle_ms,
                    status_interval: *status_interval,
                };
                cmd.execute().await
            }
            Commands::History { limit } => {
                let cmd = HistoryCommand::new(cli.log.clone(), *limit);
                cmd.execute().await
            }
            Commands::Log { action } => match action {
                LogSubcommand::Rm { id } => {
                    let cmd = LogRmCommand::new(cli.log.clone(), id.clone());
                    cmd.execute().await
                }
                LogSubcommand::Compact => {
                    let cmd = LogCompactCommand::new(cli.log.clone());
                    cmd.execute().await
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_parses_target_and_globals() {
        let cli = Cli::try_parse_from(["retrace", "undo", "3", "--log", "/tmp/ops.log"]).unwrap();
        assert_eq!(cli.log, PathBuf::from("/tmp/ops.log"));
        match cli.command {
            Commands::Undo { target } => assert_eq!(target, "3"),
            other => panic!("expected undo, got {:?}", other),
        }
    }

    #[test]
    fn test_preview_redo_flag() {
        let cli = Cli::try_parse_from(["retrace", "preview", "abc", "--redo"]).unwrap();
        match cli.command {
            Commands::Preview { target, redo } => {
                assert_eq!(target, "abc");
                assert!(redo);
            }
            other => panic!("expected preview, got {:?}", other),
        }
    }

    #[test]
    fn test_watch_collects_repeated_filters() {
        let cli = Cli::try_parse_from([
            "retrace", "watch", "src", "--ignore", "dist/**", "--ignore", "*.lock", "--ext", "rs",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch {
                root,
                ignore,
                extensions,
                ..
            } => {
                assert_eq!(root, PathBuf::from("src"));
                assert_eq!(ignore.len(), 2);
                assert_eq!(extensions, vec!["rs".to_string()]);
            }
            other => panic!("expected watch, got {:?}", other),
        }
    }

    #[test]
    fn test_log_subcommands_parse() {
        let cli = Cli::try_parse_from(["retrace", "log", "rm", "some-id"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Log {
                action: LogSubcommand::Rm { .. }
            }
        ));

        let cli = Cli::try_parse_from(["retrace", "log", "compact"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Log {
                action: LogSubcommand::Compact
            }
        ));
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["retrace"]).is_err());
    }
}
