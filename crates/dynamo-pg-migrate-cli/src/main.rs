//! dynamo-pg-migrate CLI - idempotent DynamoDB to PostgreSQL record migration.

use clap::{Parser, Subcommand};
use dynamo_pg_migrate::error::{EXIT_CANCELLED, EXIT_MIGRATION_FAILED};
use dynamo_pg_migrate::{Config, MigrateError, Orchestrator, RecordKindName, RunStatus};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "dynamo-pg-migrate")]
#[command(about = "Idempotent DynamoDB to PostgreSQL record migration")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Timeout in seconds for graceful shutdown (default: 60)
    #[arg(long, default_value = "60")]
    shutdown_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate every configured record kind
    Run {
        /// Only migrate this record kind (async-operations, providers); repeatable
        #[arg(long, value_parser = parse_kind)]
        only: Vec<RecordKindName>,

        /// Override the number of items per DynamoDB Scan page
        #[arg(long)]
        page_size: Option<i32>,
    },

    /// Check access to the source tables and the target database
    HealthCheck,
}

fn parse_kind(s: &str) -> Result<RecordKindName, String> {
    s.parse().map_err(|e: MigrateError| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    // Validated after the run overrides are applied.
    let mut config = Config::load_unvalidated(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run { only, page_size } => {
            // Apply overrides
            if !only.is_empty() {
                config.migration.record_kinds = only;
            }
            if page_size.is_some() {
                config.source.page_size = page_size;
            }
            config.validate()?;

            let cancel_token = setup_signal_handler(cli.shutdown_timeout)?;
            let orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.run(&cancel_token).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nMigration {:?}", result.status);
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                for table in &result.tables {
                    println!(
                        "  {} ({}): {:?}, {}",
                        table.name, table.source_table, table.status, table.summary
                    );
                    if let Some(ref err) = table.error {
                        println!("    Error: {}", err);
                    }
                }
                println!("  Total: {}", result.totals);
            }

            Ok(if result.is_success() {
                ExitCode::SUCCESS
            } else if result.status == RunStatus::Cancelled {
                ExitCode::from(EXIT_CANCELLED)
            } else {
                ExitCode::from(EXIT_MIGRATION_FAILED)
            })
        }

        Commands::HealthCheck => {
            config.validate()?;
            let orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.health_check().await;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("Health Check Results:");
                for table in &result.source_tables {
                    let items = table
                        .item_count
                        .map(|n| format!(", ~{} items", n))
                        .unwrap_or_default();
                    println!(
                        "  Source table {}: {} ({}ms{})",
                        table.table,
                        if table.reachable { "OK" } else { "FAILED" },
                        table.latency_ms,
                        items
                    );
                    if let Some(ref err) = table.error {
                        println!("    Error: {}", err);
                    }
                }
                println!(
                    "  Target (PostgreSQL): {} ({}ms)",
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::Config("Health check failed".to_string()));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so --output-json keeps stdout machine-readable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the returned token on SIGINT or SIGTERM.
///
/// The run stops between records. If it has not finished `shutdown_timeout`
/// seconds after the signal, the process exits.
#[cfg(unix)]
fn setup_signal_handler(shutdown_timeout: u64) -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        eprintln!(
            "\nReceived {}. Shutting down gracefully (timeout: {}s)...",
            name, shutdown_timeout
        );
        token.cancel();
        force_exit_after(shutdown_timeout).await;
    });

    Ok(cancel_token)
}

/// Windows only delivers Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler(shutdown_timeout: u64) -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("\nReceived Ctrl-C. Shutting down gracefully...");
        token.cancel();
        force_exit_after(shutdown_timeout).await;
    });

    Ok(cancel_token)
}

async fn force_exit_after(shutdown_timeout: u64) {
    tokio::time::sleep(Duration::from_secs(shutdown_timeout)).await;
    warn!("Shutdown timeout of {}s exceeded, exiting", shutdown_timeout);
    std::process::exit(i32::from(EXIT_CANCELLED));
}
