use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use dealer_lead_insights::compose::ViewComposer;
use dealer_lead_insights::config::{ComposerConfig, FilterScope, ViewShape};
use dealer_lead_insights::dates::DateRangeSelection;
use dealer_lead_insights::filters::{CategoricalFilter, FilterState};
use dealer_lead_insights::models::Dimension;
use dealer_lead_insights::store::RecordStore;
use dealer_lead_insights::{canonical, db, loader, report};

#[derive(Parser)]
#[command(name = "lead-insights")]
#[command(about = "Filter and summarize digital dealer leads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Import leads from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Resolve filters and render every view
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the values a dimension picker offers under the current filters
    Values {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        dimension: Dimension,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Args)]
struct FilterArgs {
    /// Lead CSV; Postgres (DATABASE_URL) is used when omitted
    #[arg(long)]
    csv: Option<PathBuf>,
    /// `custom`, `last-7`, `last-30` or `last-90`
    #[arg(long, default_value = "custom")]
    range: String,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    region: Vec<String>,
    #[arg(long)]
    location: Vec<String>,
    #[arg(long)]
    dealer: Vec<String>,
    #[arg(long)]
    week: Vec<String>,
    /// Explicitly select nothing for a dimension
    #[arg(long)]
    empty: Vec<Dimension>,
    /// JSON file with views, scopes and cascade parents
    #[arg(long)]
    config: Option<PathBuf>,
    /// `global` or the name of the only view the region filter applies to
    #[arg(long)]
    region_scope: Option<String>,
    #[arg(long)]
    top_dealers: Option<usize>,
}

impl FilterArgs {
    fn composer(&self) -> anyhow::Result<ViewComposer> {
        let mut config = match &self.config {
            Some(path) => ComposerConfig::from_path(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => ComposerConfig::default(),
        };

        if let Some(scope) = &self.region_scope {
            config.set_scope(Dimension::Region, FilterScope::parse(scope))?;
        }
        if let Some(limit) = self.top_dealers {
            if let Some(view) = config.view_mut("dealers") {
                if let ViewShape::Ranking { top_k, .. } = &mut view.shape {
                    *top_k = Some(limit);
                }
            }
        }

        Ok(ViewComposer::new(config))
    }

    fn state(&self, store: &RecordStore) -> anyhow::Result<FilterState> {
        let date_range = match self.range.trim() {
            "custom" => match (self.from, self.to) {
                (Some(start), end) => DateRangeSelection::Custom { start, end },
                (None, Some(end)) => {
                    let start = store.date_bounds().map_or(end, |(min, _)| min);
                    DateRangeSelection::between(start, end)
                }
                (None, None) => match store.date_bounds() {
                    Some((min, max)) => DateRangeSelection::between(min, max),
                    None => DateRangeSelection::everything(),
                },
            },
            preset => preset.parse()?,
        };

        let mut state = FilterState::new(date_range);
        let selections = [
            (Dimension::Region, &self.region),
            (Dimension::Location, &self.location),
            (Dimension::Dealer, &self.dealer),
            (Dimension::WeekLabel, &self.week),
        ];
        for (dimension, values) in selections {
            if values.is_empty() {
                continue;
            }
            let values = values.iter().map(|value| match dimension {
                Dimension::Location => canonical::canonicalize(value),
                _ => value.trim().to_string(),
            });
            state.set(dimension, CategoricalFilter::explicit(values));
        }
        for dimension in self.empty.iter() {
            state.set(*dimension, CategoricalFilter::explicit(Vec::<String>::new()));
        }

        Ok(state)
    }
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_store(csv: Option<&Path>) -> anyhow::Result<RecordStore> {
    match csv {
        Some(path) => loader::load_store(path)
            .with_context(|| format!("failed to load leads from {}", path.display())),
        None => {
            let pool = connect().await?;
            let leads = db::fetch_leads(&pool).await?;
            Ok(RecordStore::new(leads)?)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} leads from {}.", csv.display());
        }
        Commands::Report {
            filters,
            format,
            out,
        } => {
            let store = load_store(filters.csv.as_deref()).await?;
            let composer = filters.composer()?;
            let state = filters.state(&store)?;
            let resolution = composer.resolve(&store, &state)?;

            let rendered = match format {
                OutputFormat::Markdown => report::build_report(&resolution),
                OutputFormat::Json => report::build_json(&resolution)?,
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Values { filters, dimension } => {
            let store = load_store(filters.csv.as_deref()).await?;
            let composer = filters.composer()?;
            let state = filters.state(&store)?;
            let values = composer.universe(&store, &state, dimension)?;

            if values.is_empty() {
                println!("No {dimension} values reachable under the current filters.");
                return Ok(());
            }
            for value in values {
                if value.is_empty() {
                    println!("(blank)");
                } else {
                    println!("{value}");
                }
            }
        }
    }

    Ok(())
}
