mod cmd_analyze;
mod cmd_cache;
mod cmd_models;
mod cmd_report;
mod cmd_serve;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Settings;

#[derive(Parser)]
#[command(name = "pulso", version, about = "Sales-meeting transcript analysis")]
struct Cli {
    /// Config file (default: ./pulso.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve {
        /// Clients CSV to serve
        #[arg(long)]
        csv: PathBuf,
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port
        #[arg(long, default_value = "3000")]
        port: u16,
        /// Default model for analysis
        #[arg(long)]
        model: Option<String>,
    },
    /// Analyze every transcript in a CSV, printing progress as NDJSON
    Analyze {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        model: Option<String>,
        /// Transcripts per model request
        #[arg(long)]
        batch_size: Option<usize>,
        /// Keep successful batches when some fail; prints a JSON report
        #[arg(long)]
        partial: bool,
    },
    /// Analyze a single transcript
    AnalyzeOne {
        /// Client id
        #[arg(long)]
        id: String,
        /// Transcript text
        #[arg(long)]
        transcript: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// List known models
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dashboard metrics for a CSV (cached analysis included)
    Metrics {
        #[arg(long)]
        csv: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Per-seller performance for a CSV
    Sellers {
        #[arg(long)]
        csv: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the analysis cache
    Cache {
        #[command(subcommand)]
        cmd: cmd_cache::CacheCmd,
    },
}

/// Logs go to stderr so NDJSON on stdout stays clean. `RUST_LOG` overrides.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.cmd {
        Command::Serve {
            csv,
            bind,
            port,
            model,
        } => cmd_serve::execute(&settings.with_overrides(model, None), &csv, &bind, port),
        Command::Analyze {
            csv,
            model,
            batch_size,
            partial,
        } => cmd_analyze::execute(&settings.with_overrides(model, batch_size), &csv, partial),
        Command::AnalyzeOne {
            id,
            transcript,
            model,
        } => cmd_analyze::execute_one(&settings.with_overrides(model, None), &id, &transcript),
        Command::Models { json } => cmd_models::execute(&settings, json),
        Command::Metrics { csv, json } => cmd_report::metrics(&settings, &csv, json),
        Command::Sellers { csv, json } => cmd_report::sellers(&settings, &csv, json),
        Command::Cache { cmd } => cmd_cache::run(cmd, &settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "pulso",
            "analyze",
            "--csv",
            "clients.csv",
            "--batch-size",
            "4",
            "--partial",
        ])
        .unwrap();
        match cli.cmd {
            Command::Analyze {
                batch_size,
                partial,
                ..
            } => {
                assert_eq!(batch_size, Some(4));
                assert!(partial);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli =
            Cli::try_parse_from(["pulso", "models", "--config", "custom.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.json")));
    }
}
