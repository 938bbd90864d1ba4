mod models;
mod load;
mod prompts;
mod generate;
mod stats;
mod out_models;
mod render;
mod session;
mod orchestrator;
mod viz_export;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use generate::{load_generator, resolve_llm_settings, LazyGenerator};
use load::Dataset;
use models::{RiskTier, StrategyKind};
use orchestrator::{outreach_request, run_console, run_dashboard, run_outreach};
use out_models::{SortKey, TableQuery};
use prompts::outreach_prompt;

/// Partner Guard - churn-risk triage and AI-drafted partner outreach
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Churn dashboard CSV produced by the churn predictor
    #[arg(short, long, env = "PARTNER_GUARD_DATA", default_value = "churn_dashboard.csv", global = true)]
    data: PathBuf,

    /// Path to awful_aj config file (overrides AJ_CONFIG environment variable)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Simulated revenue at risk per HIGH-risk partner
    #[arg(long, value_parser = stats::parse_revenue, default_value_t = stats::DEFAULT_REVENUE_PER_PARTNER, global = true)]
    revenue_per_partner: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Top-level metric cards
    Summary {
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Filterable, sortable partner table (defaults to the triage board)
    Table {
        /// Risk tiers to keep (repeatable); default HIGH and MEDIUM
        #[arg(long = "tier", value_parser = parse_tier)]
        tiers: Vec<RiskTier>,
        /// Keep every risk tier
        #[arg(long, conflicts_with = "tiers")]
        all: bool,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        partner_tier: Option<String>,
        #[arg(long, value_enum, default_value_t = SortKey::Churn)]
        sort: SortKey,
        /// Ascending order (default is descending)
        #[arg(long)]
        asc: bool,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// List partner ids
    Partners,
    /// Deep dive on one partner
    Show { partner_id: String },
    /// Mean churn probability by region and partner tier
    Heatmap {
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Draft an email, call script or incentive offer for one partner
    Outreach {
        partner_id: String,
        #[arg(short, long, value_enum, default_value_t = StrategyKind::Email)]
        strategy: StrategyKind,
        /// Print the prompt instead of calling the model
        #[arg(long)]
        dry_run: bool,
    },
    /// Write dashboard.html and chart JSONs
    Dashboard {
        /// Output directory for generated files
        #[arg(short, long, default_value = "out")]
        output_dir: PathBuf,
    },
    /// Interactive session: select a partner, pick a strategy, generate
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Format {
    Table,
    Json,
}

fn parse_tier(s: &str) -> Result<RiskTier, String> {
    s.parse()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing (stderr, so rendered output stays clean)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    let args = Args::parse();
    debug!("Starting partner_guard - data={}", args.data.display());

    // Loaded once; every consumer borrows it
    let dataset = Dataset::load(&args.data)?;
    let records = dataset.records();
    let revenue = args.revenue_per_partner;

    match args.command {
        Command::Summary { format } => {
            let m = stats::summary_metrics(records, revenue);
            match format {
                Format::Table => print!("{}", render::render_summary(&m)),
                Format::Json => print_json(&m)?,
            }
        }
        Command::Table { tiers, all, region, partner_tier, sort, asc, limit, format } => {
            let q = TableQuery {
                tiers: if all {
                    Vec::new()
                } else if tiers.is_empty() {
                    TableQuery::triage().tiers
                } else {
                    tiers
                },
                region,
                partner_tier,
                sort,
                descending: !asc,
                limit,
            };
            let rows = stats::query_table(records, &q);
            match format {
                Format::Table => print!("{}", render::render_table(&rows)),
                Format::Json => print_json(&rows)?,
            }
        }
        Command::Partners => print!("{}", render::render_partner_ids(&dataset.partner_ids())),
        Command::Show { partner_id } => {
            let record = dataset
                .find_partner(&partner_id)
                .ok_or_else(|| anyhow::anyhow!("Partner {:?} not found", partner_id))?;
            print!("{}", render::render_partner(record));
        }
        Command::Heatmap { format } => {
            let grid = stats::heatmap(records);
            match format {
                Format::Table => print!("{}", render::render_heatmap_text(&grid)),
                Format::Json => print_json(&grid)?,
            }
        }
        Command::Outreach { partner_id, strategy, dry_run } => {
            let req = outreach_request(&dataset, &partner_id, strategy)?;
            if dry_run {
                println!("{}", outreach_prompt(&req));
            } else {
                let settings = resolve_llm_settings(args.config.as_deref())?;
                let generator = load_generator(&settings).await?;
                print!("{}", run_outreach(&req, &generator).await);
            }
        }
        Command::Dashboard { output_dir } => {
            let dir = run_dashboard(&dataset, revenue, &output_dir)?;
            println!("Dashboard written to {}", dir.join("dashboard.html").display());
        }
        Command::Console => {
            // awful_aj config is located on the first `generate`, not here
            let generator = LazyGenerator::new(args.config);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            run_console(&dataset, revenue, &generator, stdin, &mut stdout).await?;
        }
    }

    info!("Done");
    Ok(())
}
