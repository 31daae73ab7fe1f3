use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use retail_etl::app::etl_use_case::{EtlSources, EtlUseCase, RunSummary, TableStatus};
use retail_etl::config::Config;
use retail_etl::infra::http_client::build_client;
use retail_etl::infra::object_store::{parse_csv_rows, write_csv};
use retail_etl::infra::{
    HttpObjectStore, LopdfTableReader, ReqwestStoreApi, SqliteSource, SqliteWarehouse,
};
use retail_etl::observability::{self, metrics};

#[derive(Parser)]
#[command(name = "retail_etl")]
#[command(about = "Extract, clean and load retail data into the sales warehouse")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run table pipelines against the configured sources and warehouse
    Run {
        /// Specific tables to run (comma-separated). Defaults to all, in run order.
        #[arg(long)]
        tables: Option<String>,
    },
    /// Print the configured table plans
    List {
        /// List the tables in the source database instead
        #[arg(long)]
        source: bool,
    },
    /// Clean a local CSV snapshot with one table's plan, without touching any source
    CleanFile {
        #[arg(long)]
        table: String,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn use_case(config: &Config) -> anyhow::Result<EtlUseCase> {
    let store_client = build_client(config.store_api.timeout_seconds)?;
    let object_client = build_client(config.object_store.timeout_seconds)?;
    let sources = EtlSources {
        relational: Box::new(SqliteSource::new(&config.source_db.path)),
        pdf: Box::new(LopdfTableReader::new(object_client.clone())),
        store_api: Box::new(ReqwestStoreApi::new(store_client, &config.store_api)),
        object_store: Box::new(HttpObjectStore::new(object_client, &config.object_store)),
    };
    let warehouse = SqliteWarehouse::new(&config.warehouse.path, config.warehouse.write_index);
    Ok(EtlUseCase::new(sources, Box::new(warehouse)))
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 ETL run {}", summary.run_id);
    for outcome in &summary.outcomes {
        match (&outcome.status, &outcome.report) {
            (TableStatus::Loaded, Some(report)) => println!(
                "   ✅ {} → {}: {} rows in, {} rows out, {} flagged ({:.2}s)",
                outcome.plan,
                outcome.destination,
                report.rows_in,
                report.rows_out,
                report.flagged().count(),
                outcome.duration_secs
            ),
            _ => println!(
                "   ❌ {} → {}: {}",
                outcome.plan,
                outcome.destination,
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let _log_guard = observability::init_logging(&config.logging.dir);
    match &config.loaded_from {
        Some(path) => info!(path = %path.display(), overrides = config.tables.len(), "Loaded config"),
        None => info!(path = %cli.config.display(), "No config file found, using defaults"),
    }

    match cli.command {
        Commands::Run { tables } => {
            if let Err(e) = metrics::init() {
                warn!(error = %e, "Continuing without a metrics recorder");
            }

            let plans = match tables {
                Some(list) => {
                    let names: Vec<String> = list.split(',').map(|s| s.trim().to_string()).collect();
                    config.select_plans(&names)?
                }
                None => config.plans()?,
            };

            println!("🚀 Running {} table pipeline(s)...", plans.len());
            let etl = use_case(&config)?;
            let summary = etl.run_all(&plans).await;
            print_summary(&summary);

            if let Err(e) = metrics::push_all_metrics(&summary.run_id.to_string()).await {
                warn!(error = %e, "Failed to push metrics");
            }

            if !summary.all_loaded() {
                let failed: Vec<&str> = summary.failed().map(|o| o.plan.as_str()).collect();
                error!(?failed, "ETL run finished with failures");
                anyhow::bail!("{} table(s) failed: {}", failed.len(), failed.join(", "));
            }
            info!("ETL run completed successfully");
        }
        Commands::List { source: true } => {
            let source = SqliteSource::new(&config.source_db.path);
            println!("📋 Tables in {}:", config.source_db.path);
            for table in source.list_tables().await? {
                println!("   - {}", table);
            }
        }
        Commands::List { source: false } => {
            for plan in config.plans()? {
                println!("{} ({:?}) → {}", plan.name, plan.source, plan.destination);
                for step in &plan.steps {
                    println!("   - {}", step.label());
                }
            }
        }
        Commands::CleanFile { table, input, output } => {
            let plan = config
                .select_plans(&[table.clone()])?
                .into_iter()
                .next()
                .context("no plan selected")?;
            let bytes = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let raw = parse_csv_rows(&plan.name, &bytes)?;
            let (cleaned, report) = plan.clean(raw)?;

            let file = std::fs::File::create(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            write_csv(&cleaned, file)?;
            println!(
                "🔨 Cleaned {} with plan '{}': {} rows in, {} rows out → {}",
                input.display(),
                plan.name,
                report.rows_in,
                report.rows_out,
                output.display()
            );
        }
    }
    Ok(())
}
