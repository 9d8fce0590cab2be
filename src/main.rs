use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use extvet::{
    checker::default_checker,
    config::Config,
    ledger::{JsonLedgerStore, RevenueCalculator, TransactionFilter, TransactionStore},
    model::{DateRange, NewPurchase, ScanResult},
    output::{
        compatibility_table, format_scan_results, json, revenue_report_table, split_table,
        system_info_table, transactions_table, OutputFormat,
    },
    scanner::SecurityScanner,
};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const REJECTED: u8 = 2;
}

#[derive(Parser)]
#[command(name = "extvet")]
#[command(
    author,
    version,
    about = "Vet marketplace extensions and keep the revenue ledger"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the security checks against extracted extension packages
    Scan {
        /// Package directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format (table, json, sarif, text)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exit with code 2 if any package fails the scan
        #[arg(long)]
        fail_on_issues: bool,
    },

    /// Check a manifest's version constraints against the environment
    Check {
        /// Manifest file or package directory
        manifest: PathBuf,

        /// Lock file listing installed packages
        #[arg(long)]
        lock: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the detected environment versions
    SystemInfo {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Split an amount into platform fee and seller revenue
    #[command(allow_negative_numbers = true)]
    Split {
        amount: Decimal,

        /// Platform fee percentage (defaults to the configured value)
        #[arg(long)]
        fee: Option<Decimal>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Record purchases and refunds, and report revenue
    Ledger {
        /// Ledger file (defaults to the configured ledger path)
        #[arg(long, global = true)]
        ledger: Option<PathBuf>,

        /// Print JSON instead of tables
        #[arg(long, global = true)]
        json: bool,

        #[command(subcommand)]
        action: LedgerAction,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Subcommand)]
enum LedgerAction {
    /// Record a completed purchase
    Purchase {
        #[arg(long)]
        extension: String,
        #[arg(long)]
        buyer: String,
        #[arg(long)]
        seller: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "card")]
        payment_method: String,
    },

    /// Refund a completed purchase
    Refund {
        id: Uuid,
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Revenue report for a seller, an extension or the whole platform
    Report {
        #[arg(long, conflicts_with = "extension")]
        seller: Option<String>,
        #[arg(long)]
        extension: Option<String>,
        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Seller revenue awaiting payout
    Payouts { seller: String },

    /// List ledger rows
    List {
        #[arg(long)]
        seller: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config file");
            Config::default()
        }
    };

    match cli.command {
        Commands::Scan {
            paths,
            format,
            output,
            fail_on_issues,
        } => {
            let format = format.unwrap_or_else(|| config.default_format.clone());
            run_scan(&config, paths, &format, output, fail_on_issues).await
        }
        Commands::Check {
            manifest,
            lock,
            json,
        } => {
            let mut environment = config.environment.clone();
            if lock.is_some() {
                environment.lock_file = lock;
            }
            let checker = default_checker(&environment);
            let outcome = checker.validate_package_requirements(&manifest);
            let compatible = outcome.as_ref().map(|r| r.compatible).unwrap_or(false);

            let code = emit(json, outcome, compatibility_table)?;
            Ok(if code == exit_codes::SUCCESS && !compatible {
                exit_codes::REJECTED
            } else {
                code
            })
        }
        Commands::SystemInfo { json } => {
            let info = default_checker(&config.environment).system_info();
            emit(json, Ok::<_, anyhow::Error>(info), system_info_table)
        }
        Commands::Split { amount, fee, json } => {
            let calc = RevenueCalculator::new(
                extvet::ledger::MemoryTransactionStore::new(),
                &config.revenue,
            );
            emit(json, calc.calculate_revenue_split(amount, fee), split_table)
        }
        Commands::Ledger {
            ledger,
            json,
            action,
        } => {
            let path = ledger.unwrap_or_else(|| config.ledger_path.clone());
            let store = JsonLedgerStore::open(&path)
                .await
                .with_context(|| format!("Failed to open ledger {}", path.display()))?;
            let calc = RevenueCalculator::new(store, &config.revenue);
            run_ledger(&calc, action, json).await
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

/// Prints `outcome` as a JSON envelope or with `render`. In JSON mode an
/// error is part of the output and only affects the exit code.
fn emit<T, E, F>(json: bool, outcome: Result<T, E>, render: F) -> Result<u8>
where
    T: Serialize,
    E: Display,
    F: FnOnce(&T) -> String,
{
    if json {
        let failed = outcome.is_err();
        println!("{}", json::to_pretty(&json::envelope(&outcome))?);
        return Ok(if failed {
            exit_codes::ERROR
        } else {
            exit_codes::SUCCESS
        });
    }

    match outcome {
        Ok(value) => {
            println!("{}", render(&value));
            Ok(exit_codes::SUCCESS)
        }
        Err(e) => Err(anyhow::anyhow!("{}", e)),
    }
}

async fn run_scan(
    config: &Config,
    paths: Vec<PathBuf>,
    format: &str,
    output_file: Option<PathBuf>,
    fail_on_issues: bool,
) -> Result<u8> {
    let format = OutputFormat::from_str(format).map_err(|e| anyhow::anyhow!(e))?;
    let is_interactive = format == OutputFormat::Table && output_file.is_none();
    let scanner = Arc::new(SecurityScanner::new(config.scanner.clone())?);

    let results = scan_concurrent(scanner, paths, is_interactive).await?;
    let rendered = format_scan_results(&results, format)?;

    if let Some(path) = output_file {
        std::fs::write(&path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Results written to: {}", path.display());
    } else {
        println!("{}", rendered);
    }

    let any_failed = results.iter().any(|r| !r.passed);
    Ok(if fail_on_issues && any_failed {
        exit_codes::REJECTED
    } else {
        exit_codes::SUCCESS
    })
}

/// Scans every package on the blocking pool and collects results in input
/// order. The first package that cannot be scanned at all aborts the run.
async fn scan_concurrent(
    scanner: Arc<SecurityScanner>,
    paths: Vec<PathBuf>,
    is_interactive: bool,
) -> Result<Vec<ScanResult>> {
    let progress = if is_interactive {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} Scanning packages...")?
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(Arc::new(pb))
    } else {
        None
    };

    let tasks: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let scanner = Arc::clone(&scanner);
            let pb = progress.clone();
            tokio::task::spawn_blocking(move || {
                let result = scanner
                    .scan(&path)
                    .with_context(|| format!("Failed to scan {}", path.display()));
                if let Some(ref pb) = pb {
                    pb.inc(1);
                }
                result
            })
        })
        .collect();

    let joined = join_all(tasks).await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    joined
        .into_iter()
        .map(|task| task.context("Scan task panicked")?)
        .collect()
}

async fn run_ledger(
    calc: &RevenueCalculator<JsonLedgerStore>,
    action: LedgerAction,
    json: bool,
) -> Result<u8> {
    match action {
        LedgerAction::Purchase {
            extension,
            buyer,
            seller,
            amount,
            payment_method,
        } => {
            let outcome = calc
                .record_purchase(NewPurchase {
                    extension_id: extension,
                    buyer_id: buyer,
                    seller_id: seller,
                    amount,
                    payment_method,
                })
                .await;
            emit(json, outcome, |tx| transactions_table(std::slice::from_ref(tx)))
        }
        LedgerAction::Refund { id, reason } => {
            let outcome = calc.process_refund(id, &reason).await;
            emit(json, outcome, |tx| transactions_table(std::slice::from_ref(tx)))
        }
        LedgerAction::Report {
            seller,
            extension,
            from,
            to,
        } => {
            let range = DateRange::new(from.and_then(start_of_day), to.and_then(end_of_day));
            let outcome = match (seller, extension) {
                (Some(seller), _) => calc.generate_seller_report(&seller, range).await,
                (None, Some(extension)) => calc.generate_extension_report(&extension, range).await,
                (None, None) => calc.generate_platform_report(range).await,
            };
            emit(json, outcome, revenue_report_table)
        }
        LedgerAction::Payouts { seller } => {
            let outcome = calc
                .calculate_pending_payouts(&seller)
                .await
                .map(|pending| PendingPayout { seller, pending });
            emit(json, outcome, |p| {
                format!("Pending payout for {}: {}", p.seller, p.pending)
            })
        }
        LedgerAction::List { seller } => {
            let filter = seller.map(TransactionFilter::seller).unwrap_or_default();
            let outcome = calc.store().query(&filter).await;
            emit(json, outcome, |rows| transactions_table(rows))
        }
    }
}

#[derive(Serialize)]
struct PendingPayout {
    seller: String,
    pending: Decimal,
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_milli_opt(23, 59, 59, 999).map(|dt| dt.and_utc())
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'extvet config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
