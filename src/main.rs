use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod columns;
mod config;
mod dates;
mod error;
mod metrics;
mod models;
mod pipeline;
mod report;
mod transform;
mod workbook;

use config::{DateOrder, Settings};
use pipeline::ResultSlot;
use report::OutputFormat;
use workbook::FileFormat;

#[derive(Parser)]
#[command(name = "request-turnaround-sla")]
#[command(about = "Turnaround and SLA metrics for service-request exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute agent and team metrics from a workbook or CSV export
    Analyze {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        /// Write the report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Maximum agents listed in the markdown table
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Check the sheet and required headers without computing metrics
    Check {
        #[arg(long)]
        file: PathBuf,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// List the required header labels
    Columns,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Name of the sheet holding the requests
    #[arg(long, env = "SLA_SHEET_NAME", default_value = config::DEFAULT_SHEET_NAME)]
    sheet: String,
    #[arg(long, env = "SLA_HANDLING_MINUTES", default_value_t = config::DEFAULT_HANDLING_SLA_MINUTES)]
    handling_sla_minutes: u32,
    #[arg(long, env = "SLA_WAITING_MINUTES", default_value_t = config::DEFAULT_WAITING_SLA_MINUTES)]
    waiting_sla_minutes: u32,
    #[arg(long, env = "SLA_PEAK_HOURS", default_value_t = config::DEFAULT_PEAK_HOURS)]
    peak_hours: usize,
    /// Field order for dates like 03/04/2024
    #[arg(long, env = "SLA_DATE_ORDER", value_enum, default_value_t = DateOrder::Dmy)]
    date_order: DateOrder,
}

impl From<SettingsArgs> for Settings {
    fn from(args: SettingsArgs) -> Self {
        Settings {
            sheet_name: args.sheet,
            handling_sla_minutes: args.handling_sla_minutes,
            waiting_sla_minutes: args.waiting_sla_minutes,
            peak_hours: args.peak_hours,
            date_order: args.date_order,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            format,
            out,
            limit,
            settings,
        } => {
            let settings = Settings::from(settings);
            let mut slot = ResultSlot::default();
            let token = slot.begin_run();
            let result = pipeline::run_file(&file, &settings).await;
            slot.complete(token, result);
            let analysis = match slot.current() {
                Some(Ok(analysis)) => analysis,
                Some(Err(err)) => return Err(err.clone().into()),
                None => anyhow::bail!("pipeline produced no result"),
            };

            let source = file.display().to_string();
            let rendered = report::render(format, &source, analysis, &settings, limit)?;
            match out {
                Some(out) => {
                    tokio::fs::write(&out, rendered)
                        .await
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    info!(path = %out.display(), "report written");
                    println!("Report written to {}.", out.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Check { file, settings } => {
            let settings = Settings::from(settings);
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let format = FileFormat::detect(Some(file.as_path()), &bytes);
            let sheet = workbook::read_sheet(bytes, format, &settings.sheet_name)?;
            let missing = columns::missing_columns(&sheet.headers);

            println!("{} data rows in {}.", sheet.rows.len(), file.display());
            if missing.is_empty() {
                println!("All required columns present.");
            } else {
                println!("Missing columns: {}", missing.join(", "));
            }
        }
        Commands::Columns => {
            println!("Sheet: {}", config::DEFAULT_SHEET_NAME);
            for (field, label) in columns::REQUIRED_COLUMNS {
                println!("- {label} ({field})");
            }
        }
    }

    Ok(())
}
