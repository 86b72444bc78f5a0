use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use swiftbackup::clock::{Clock, TimeMode};
use swiftbackup::config::{self, Config};
use swiftbackup::lifecycle::{run_action, Action};
use swiftbackup::models::{RunOptions, Target};

#[derive(Parser)]
#[command(
    name = "swiftbackup",
    version,
    about = "Rotating hard-link snapshot backups with generational retention",
    long_about = "swiftbackup creates space-efficient snapshot backups with rsync \
                  and hard links, and rotates them with hourly/daily/weekly/monthly/\
                  yearly retention buckets."
)]
struct Cli {
    /// Read configuration from this file
    #[arg(
        short,
        long,
        global = true,
        env = "SWIFTBACKUP_CONFIG",
        default_value = config::DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    /// Make a new snapshot even when one already exists for the current
    /// time interval
    #[arg(short, long, global = true)]
    force: bool,

    /// Print what would be done but do not transfer data or rotate snapshots
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Use UTC instead of local time
    #[arg(long, global = true)]
    utc: bool,

    /// Print debug info about which external commands are being executed
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new snapshot for each target
    Sync {
        /// Rotate snapshots after the sync
        #[arg(short, long)]
        rotate: bool,

        /// Target names, or "all" for every configured target
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Remove snapshots that fall outside the retention policy
    Rotate {
        /// Target names, or "all" for every configured target
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Show every snapshot and which retention buckets keep it
    Status {
        /// Target names; defaults to every configured target
        targets: Vec<String>,
    },

    /// Print the default configuration file to stdout
    WriteConfig,
}

fn main() -> ExitCode {
    // Exit 1 for usage errors; clap's own default of 2 is reserved for
    // configuration errors here. Help and version output stay 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    init_logging(cli.debug);
    ExitCode::from(run(cli))
}

fn run(cli: Cli) -> u8 {
    if matches!(cli.command, Commands::WriteConfig) {
        print!("{}", config::default_template());
        return 0;
    }

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return 2;
        }
    };

    let (action, rotate_after_sync, names) = match cli.command {
        Commands::Sync { rotate, targets } => (Action::Sync, rotate, targets),
        Commands::Rotate { targets } => (Action::Rotate, false, targets),
        Commands::Status { targets } => (Action::Status, false, targets),
        Commands::WriteConfig => unreachable!("handled above"),
    };

    let targets = match resolve_targets(&config, &names, action) {
        Ok(targets) => targets,
        Err(message) => {
            eprintln!("{}", message);
            return 1;
        }
    };

    let options = RunOptions {
        dry_run: cli.dry_run,
        force: cli.force,
        rotate_after_sync,
        clock: Clock::new(if cli.utc { TimeMode::Utc } else { TimeMode::Local }),
    };

    if run_action(action, &options, &targets).is_empty() {
        0
    } else {
        3
    }
}

/// Expand "all" and reject unknown names, preserving the given order
fn resolve_targets(
    config: &Config,
    names: &[String],
    action: Action,
) -> Result<Vec<Target>, String> {
    let mut targets: Vec<Target> = Vec::new();
    for name in names {
        if name == "all" {
            targets = config.all();
        } else if let Some(target) = config.get(name) {
            if !targets.iter().any(|t| t.name == target.name) {
                targets.push(target.clone());
            }
        } else {
            return Err(format!(
                "unknown target: {}\navailable targets: {}",
                name,
                config.names().join(", ")
            ));
        }
    }

    if targets.is_empty() {
        if action == Action::Status {
            targets = config.all();
        } else {
            return Err("target is required for this action".into());
        }
    }
    Ok(targets)
}

/// Initialize logging with tracing; `--debug` lowers the default filter
fn init_logging(debug: bool) {
    let default = if debug {
        "swiftbackup=debug"
    } else {
        "swiftbackup=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
