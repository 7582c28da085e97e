// src/main.rs
use anyhow::{anyhow, Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::{fs::File, io, path::PathBuf, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod attendance;
mod auth;
mod config;
mod error;
mod model;
mod pay_accrual;
mod payroll;
mod report;
mod routes;
mod store;

#[cfg(test)]
mod pay_accrual_tests;
#[cfg(test)]
mod store_tests;

use attendance::parse_date;
use config::Config;
use model::{ExtraWorkDay, Month, PayRate};
use pay_accrual::{calculate_weekly_pay, WeekAttendanceSummary};
use payroll::PayrollService;
use store::PayrollStore;

#[derive(Parser, Debug)]
#[command(name = "paydesk")]
#[command(about = "Attendance tracking and weekly pay accrual backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON data file (overrides DATA_FILE)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Print the monthly report as CSV
    MonthlyReport {
        /// Month as YYYY-MM
        #[arg(long)]
        month: String,

        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run the weekly pay calculation on the given attendance
    Quote {
        #[arg(long)]
        cash: Decimal,

        #[arg(long)]
        account: Decimal,

        #[arg(long, default_value_t = 0)]
        full_days: u32,

        #[arg(long, default_value_t = 0)]
        half_days: u32,

        #[arg(long, default_value_t = 0)]
        absent_days: u32,

        /// Full day with extra work, as DATE=HOURS (repeatable)
        #[arg(long = "extra")]
        extra: Vec<String>,

        /// Present days earlier in the month
        #[arg(long, default_value_t = Decimal::ZERO)]
        days_before: Decimal,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to read configuration from environment")?;
    if let Some(path) = cli.data_file {
        config.data_file = Some(path);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::MonthlyReport { month, output } => monthly_report(config, &month, output),
        Commands::Quote {
            cash,
            account,
            full_days,
            half_days,
            absent_days,
            extra,
            days_before,
        } => {
            let summary = WeekAttendanceSummary {
                full_days_with_extra_work: extra
                    .iter()
                    .map(|entry| parse_extra_work(entry))
                    .collect::<Result<Vec<_>>>()?,
                full_days_without_extra_work: full_days,
                half_days,
                days_absent: absent_days,
                pay_rate: PayRate::new(cash, account),
            };
            let result = calculate_weekly_pay(&summary, days_before);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

fn parse_extra_work(entry: &str) -> Result<ExtraWorkDay> {
    let (date, hours) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected DATE=HOURS, got '{}'", entry))?;
    Ok(ExtraWorkDay {
        date: parse_date(date)?,
        extra_work_hours: hours
            .parse()
            .with_context(|| format!("Invalid extra work hours in '{}'", entry))?,
    })
}

fn monthly_report(config: Config, month: &str, output: Option<PathBuf>) -> Result<()> {
    let month: Month = month.parse()?;
    let store = Arc::new(PayrollStore::open(config.data_file).context("Failed to open data file")?);
    let report = PayrollService::new(store).monthly_report(month)?;
    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            report::write_monthly_csv(&report, file)?;
            info!("Wrote monthly report for {} to {}", month, path.display());
        }
        None => report::write_monthly_csv(&report, io::stdout().lock())?,
    }
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    if config.uses_default_credentials() {
        warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set; using the default admin credentials");
    }
    let addr = config.socket_addr()?;
    let tls_paths = config.tls_paths();

    let store = Arc::new(
        PayrollStore::open(config.data_file.clone()).context("Failed to open data file")?,
    );
    match store.data_file() {
        Some(path) => info!("Persisting payroll data to {}", path.display()),
        None => warn!("No DATA_FILE configured; payroll data will be lost on shutdown"),
    }
    let state = routes::AppState::new(config, store);
    let app = routes::build_router(state)?;

    match tls_paths {
        Some((cert_path, key_path)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to load TLS cert/key from {} and {}",
                        cert_path.display(),
                        key_path.display()
                    )
                })?;
            info!("Starting server on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
