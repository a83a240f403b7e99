//! CLI entry point for pgmigrate.
//! Provides clap-based command routing, logging setup, and exit code mapping
//! based on error type.

mod output;

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use pgmigrate_core::error::PgMigrateError;
use pgmigrate_core::render;
use pgmigrate_core::{ApplyOptions, CliOverrides, LineConfirm, PgMigrate, PgMigrateConfig};

/// Top-level CLI definition with global flags and subcommand dispatch.
#[derive(Parser)]
#[command(
    name = "pgmigrate",
    about = "Declarative PostgreSQL schema management",
    long_about = "Declarative PostgreSQL schema management.\n\n\
        Define the desired schema in YAML and pgmigrate shows, then applies, the \
        difference against the live database. Requires the pg_migrate extension.",
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_HASH"), " ", env!("BUILD_TIME"), ")"
    ),
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// PostgreSQL connection URL (overrides DATABASE_URL)
    #[arg(long, value_name = "URL", global = true)]
    database_url: Option<String>,

    /// SSL/TLS mode: disable, prefer, require
    #[arg(long, value_name = "MODE", global = true)]
    ssl_mode: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    connect_timeout: Option<u32>,

    /// Statement timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS", global = true)]
    statement_timeout: Option<u32>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose/debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// All available pgmigrate subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create a template schema definition file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show what would change, without changing anything
    Plan {
        /// Schema definition file (default: schema.yaml)
        file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Apply schema changes to the database
    #[command(
        long_about = "Apply safe changes from the schema definition to the database.\n\n\
            Destructive changes (DROP operations) require --allow-destructive. Breaking \
            changes are never applied; use pgmigrate.dba_migrate() in psql for those."
    )]
    Apply {
        /// Schema definition file (default: schema.yaml)
        file: Option<PathBuf>,

        /// Include destructive changes (DROP TABLE, DROP COLUMN)
        #[arg(long)]
        allow_destructive: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },

    /// Export live schemas as a schema definition
    Dump {
        /// Schemas to export
        #[arg(required = true, value_name = "SCHEMA")]
        schemas: Vec<String>,

        /// Output file (- for stdout)
        #[arg(short, long, default_value = "-")]
        output: String,
    },

    /// Show the migration history
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, value_name = "N")]
        limit: Option<u32>,
    },

    /// Show CLI and extension versions
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let filter = if cli.json {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or(filter))
        .format_target(false)
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli).await {
        print_error(&e);
        process::exit(exit_code(&e));
    }
}

/// Map error types to differentiated exit codes.
fn exit_code(error: &PgMigrateError) -> i32 {
    match error {
        PgMigrateError::ConfigError(_) => 2,
        PgMigrateError::ConnectionFailed(_) | PgMigrateError::TlsSetup(_) => 3,
        PgMigrateError::ExtensionMissing | PgMigrateError::ExtensionCheckFailed(_) => 4,
        PgMigrateError::LoadFailed(_) | PgMigrateError::ReadFailed { .. } => 5,
        PgMigrateError::PlanFailed(_) => 6,
        PgMigrateError::ApplyFailed(_) => 7,
        PgMigrateError::BreakingChangesPresent { .. } => 8,
        PgMigrateError::HistoryFailed(_) => 9,
        PgMigrateError::DumpFailed(_) => 10,
        _ => 1,
    }
}

fn read_definition(path: &Path) -> Result<String, PgMigrateError> {
    std::fs::read_to_string(path).map_err(|source| PgMigrateError::ReadFailed {
        path: path.display().to_string(),
        source,
    })
}

/// Build configuration and dispatch the chosen subcommand.
async fn run(cli: Cli) -> Result<(), PgMigrateError> {
    let json_output = cli.json;

    let overrides = CliOverrides {
        url: cli.database_url,
        ssl_mode: cli.ssl_mode,
        connect_timeout: cli.connect_timeout,
        statement_timeout: cli.statement_timeout,
    };
    let config = PgMigrateConfig::load(cli.config.as_deref(), &overrides);

    // Version reports whatever it can and never fails.
    if let Commands::Version = cli.command {
        let extension = match config {
            Ok(config) => extension_status(config).await,
            Err(e) => {
                log::debug!("Skipping extension lookup; error={}", e);
                "(unable to connect)".to_string()
            }
        };
        output::print_version(env!("CARGO_PKG_VERSION"), env!("GIT_HASH"), &extension);
        return Ok(());
    }

    let config = config?;

    match cli.command {
        Commands::Init { force } => {
            let path = config.schema.file.clone();
            PgMigrate::init(&path, force)?;
            if json_output {
                println!(
                    "{}",
                    serde_json::json!({ "created": path.display().to_string() })
                );
            } else {
                output::print_init_next_steps(&path.display().to_string());
            }
        }

        Commands::Plan { file, output } => {
            let file = file.unwrap_or_else(|| config.schema.file.clone());
            let definition = read_definition(&file)?;
            let pm = PgMigrate::new(config).await?;
            let plan = pm.plan(&definition).await?;

            if json_output || output == OutputFormat::Json {
                println!("{}", render::plan_json(&plan)?);
            } else {
                print!("{}", render::plan_text(&plan));
            }
        }

        Commands::Apply {
            file,
            allow_destructive,
            auto_approve,
        } => {
            let file = file.unwrap_or_else(|| config.schema.file.clone());
            let definition = read_definition(&file)?;
            let pm = PgMigrate::new(config).await?;

            let options = ApplyOptions {
                allow_destructive,
                auto_approve,
            };
            let stdin = io::stdin();
            let mut confirm = LineConfirm::new(stdin.lock(), io::stdout());

            let outcome = pm
                .apply(&definition, &options, &mut confirm, output::print_review)
                .await?;
            output::print_outcome(&outcome);
        }

        Commands::Dump {
            schemas,
            output: target,
        } => {
            let pm = PgMigrate::new(config).await?;
            let definition = pm.dump(&schemas).await?;

            if target == "-" {
                print!("{}", definition);
            } else {
                std::fs::write(&target, &definition).map_err(|source| {
                    PgMigrateError::WriteFailed {
                        path: target.clone(),
                        source,
                    }
                })?;
                output::print_success(&format!("Schema written to {}", target));
            }
        }

        Commands::History { limit } => {
            let pm = PgMigrate::new(config).await?;
            let entries = pm.history(limit).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                output::print_history_table(&entries);
            }
        }

        Commands::Version => {}
    }

    Ok(())
}

/// Extension line of the version report.
async fn extension_status(config: PgMigrateConfig) -> String {
    let pm = match PgMigrate::new(config).await {
        Ok(pm) => pm,
        Err(e) => {
            log::debug!("Version lookup could not connect; error={}", e);
            return "(unable to connect)".to_string();
        }
    };
    match pm.extension_version().await {
        Ok(Some(version)) => version,
        Ok(None) => "not installed".to_string(),
        Err(e) => {
            log::debug!("Version lookup failed; error={}", e);
            "not installed".to_string()
        }
    }
}

/// Print a formatted error message with actionable hints to stderr.
fn print_error(error: &PgMigrateError) {
    eprintln!("{} {}", "ERROR:".red().bold(), error);

    let hint = match error {
        PgMigrateError::ConfigError(_) => Some(
            "Hint: Set DATABASE_URL, pass --database-url, or check your pgmigrate.toml.",
        ),
        PgMigrateError::ConnectionFailed(_) | PgMigrateError::TlsSetup(_) => Some(
            "Hint: Verify the database is running and the connection details are correct.",
        ),
        PgMigrateError::ExtensionMissing => {
            Some("Hint: Connect with psql and run: CREATE EXTENSION pg_migrate;")
        }
        PgMigrateError::LoadFailed(_) => {
            Some("Hint: Check the schema definition file for errors.")
        }
        PgMigrateError::BreakingChangesPresent { .. } => {
            Some("Hint: Use pgmigrate.dba_migrate() in psql to apply breaking changes manually.")
        }
        PgMigrateError::ApplyFailed(_) => Some(
            "Hint: Run 'pgmigrate history' to see what was recorded, then 'pgmigrate plan' to see what remains.",
        ),
        PgMigrateError::InitTargetExists { .. } => Some(
            "Hint: Pass --force to overwrite, or use 'pgmigrate dump' to start from the live schema.",
        ),
        _ => None,
    };

    if let Some(hint) = hint {
        eprintln!("{}", hint.dimmed());
    }
}
