//! wp-cms-migrate CLI - WordPress dump to CMS migration.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use wp_cms_migrate::{
    inspect, Config, DestinationStore, Dump, MemoryStore, MigrateError, MigrationResult,
    Orchestrator, PgStore, SAMPLE_CONFIG,
};

#[derive(Parser)]
#[command(name = "wp-cms-migrate")]
#[command(about = "Migrate a WordPress SQL dump into the CMS database")]
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

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the migration
    Run {
        /// Override the dump file from the configuration
        #[arg(long)]
        dump: Option<PathBuf>,

        /// Dry run: migrate into an in-memory store instead of the target
        #[arg(long)]
        dry_run: bool,
    },

    /// Summarize the dump without migrating anything
    Inspect {
        /// Override the dump file from the configuration
        #[arg(long)]
        dump: Option<PathBuf>,
    },

    /// Test the target database connection
    HealthCheck,

    /// Write a starter configuration file
    Init {
        /// Output path for configuration file [default: config.yaml]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    // Handle init command separately (doesn't need existing config)
    if let Commands::Init { output, force } = cli.command {
        let output_path = output.unwrap_or_else(|| PathBuf::from("config.yaml"));
        return write_sample_config(&output_path, force);
    }

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Init { .. } => unreachable!(), // Handled above
        Commands::Run { dump, dry_run } => {
            if let Some(path) = dump {
                config.dump.path = path;
            }

            let store: Arc<dyn DestinationStore> = if dry_run {
                info!("Dry run: records are written to an in-memory store");
                Arc::new(MemoryStore::new())
            } else {
                Arc::new(PgStore::connect(&config.target).await?)
            };

            let result = Orchestrator::new(config, store).run().await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                let status_msg = if dry_run {
                    "Dry run completed!"
                } else {
                    "Migration completed!"
                };
                println!("\n{}", status_msg);
                print_summary(&result);
            }
        }

        Commands::Inspect { dump } => {
            let path = dump.unwrap_or_else(|| config.dump.path.clone());
            let dump = Dump::read(&path)?;
            let summary = inspect(&dump, &config.dump.table_prefix)?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                println!("Dump: {} ({} bytes)", summary.path, summary.bytes);
                println!("\nTables:");
                for (table, count) in &summary.tables {
                    println!("  {:<28} {:>8} rows", table, count);
                }
                println!("\nPosts by type and status:");
                for (post_type, statuses) in &summary.posts {
                    for (status, count) in statuses {
                        println!("  {:<20} {:<12} {:>8}", post_type, status, count);
                    }
                }
                println!("\nTaxonomies:");
                for (taxonomy, count) in &summary.taxonomies {
                    println!("  {:<20} {:>8}", taxonomy, count);
                }
            }
        }

        Commands::HealthCheck => {
            let result = PgStore::health_check(&config.target).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Target (PostgreSQL): {} ({}ms)",
                    if result.connected { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref version) = result.server_version {
                    println!("    Server version: {}", version);
                }
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
            }

            if !result.connected {
                return Err(MigrateError::pool(
                    "Health check failed",
                    format!("{}:{}", config.target.host, config.target.port),
                ));
            }
        }
    }

    Ok(())
}

fn print_summary(result: &MigrationResult) {
    println!("  Run ID: {}", result.run_id);
    println!("  Backend: {}", result.backend);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!(
        "  Admin account: {}",
        if result.admin_created { "created" } else { "already present" }
    );
    println!("  Settings: {}", result.settings_written);
    for phase in &result.phases {
        println!(
            "  {:<12} {} migrated, {} skipped, {} slugs renamed",
            phase.phase.as_str(),
            phase.migrated,
            phase.skipped,
            phase.renamed_slugs
        );
    }
    println!(
        "  Total: {} migrated, {} skipped",
        result.rows_migrated, result.rows_skipped
    );
}

fn write_sample_config(path: &Path, force: bool) -> Result<(), MigrateError> {
    if path.exists() && !force {
        return Err(MigrateError::Config(format!(
            "{:?} already exists; use --force to overwrite",
            path
        )));
    }
    std::fs::write(path, SAMPLE_CONFIG)?;
    println!("Wrote configuration to {:?}", path);
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Unknown verbosity '{}'", other)),
    };

    // Logs go to stderr so --output-json leaves stdout parseable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format '{}'", other)),
    }

    Ok(())
}
