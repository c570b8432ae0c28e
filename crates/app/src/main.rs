use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use tally_core::{Classification, Money, Report};
use tally_import::load_statement_file;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use render::RenderOptions;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Categorize bank statement expenses by keyword")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print category totals and large uncategorized transactions
    Report {
        /// Statement export (UTF-8)
        statement: PathBuf,

        /// Only keep rows in this currency
        #[arg(long)]
        currency: Option<String>,

        /// List unknown transactions above this amount
        #[arg(long)]
        threshold: Option<Money>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show how descriptions would be categorized
    Classify {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Write a default config file with the bundled category rules
    InitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Report {
            statement,
            currency,
            threshold,
            format,
        } => {
            let mut cfg = config::load_config(cli.config.as_deref())?;
            cfg.apply_overrides(currency, threshold);
            let rules = cfg.rules()?;
            tracing::debug!(categories = rules.len(), "rules ready");

            let transactions = load_statement_file(&statement, &cfg.statement)
                .with_context(|| format!("loading {}", statement.display()))?;
            tracing::info!(
                count = transactions.len(),
                path = %statement.display(),
                "loaded transactions"
            );

            let report = Report::build(&transactions, &rules);
            let options = RenderOptions {
                threshold: cfg.report.threshold,
                symbol: cfg.report.symbol.clone(),
                precision: cfg.report.precision,
            };

            let stdout = io::stdout();
            let mut out = stdout.lock();
            match format {
                Format::Text => render::render_text(&report, &options, &mut out)?,
                Format::Json => render::render_json(&report, &options, &mut out)?,
            }
            out.flush()?;
        }

        Command::Classify { text } => {
            let cfg = config::load_config(cli.config.as_deref())?;
            let rules = cfg.rules()?;
            for line in &text {
                match rules.explain(line) {
                    Classification::Category(name) => println!("{line}: {name}"),
                    Classification::Unmatched => println!("{line}: unknown (no keyword matched)"),
                    Classification::Ambiguous(names) => {
                        println!("{line}: unknown (ambiguous: {})", names.join(", "))
                    }
                }
            }
        }

        Command::InitConfig => {
            let path = config::init_config(cli.config.as_deref())?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
