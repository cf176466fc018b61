use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gasp")]
#[command(about = "Sync spreadsheet-declared ad campaigns to Ad Manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate rows, then create every missing order, line item, creative and association
    Sync {
        /// Layered config paths in merge order (base -> env -> local)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Directory holding order.csv, lineitem.csv, creative.csv (overrides rows.dir)
        #[arg(long)]
        rows: Option<String>,

        /// Also write the run report as JSON to this path
        #[arg(long)]
        report: Option<String>,
    },

    /// Validate the row sheets only; no remote calls
    Check {
        /// Directory holding order.csv, lineitem.csv, creative.csv
        #[arg(long)]
        rows: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Sync {
            config_paths,
            rows,
            report,
        } => {
            commands::sync::run_sync(config_paths, rows, report).await?;
        }

        Commands::Check { rows } => {
            commands::check_rows(&rows)?;
        }
    }

    Ok(())
}
