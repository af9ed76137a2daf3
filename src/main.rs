// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Args, Parser, Subcommand};
use search_mirror::utils::logging::{format_success, format_warning};
use search_mirror::{
    Config, GeoFilter, MemoryEngine, RecordType, ResultMapper, SchemaMapper, SearchBackend,
    SearchParams, SqlSelect,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "search_mirror")]
#[command(version = "0.1.0")]
#[command(about = "Mirror relational records into a search engine and query them back", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the engine mapping derived for a record type
    Schema { table: String },

    /// Print the query body for a search without contacting the engine
    Query {
        table: String,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Create the engine index of every configured record type
    Ensure,

    /// Run a search and list ranked hits
    Search {
        table: String,

        #[command(flatten)]
        search: SearchArgs,

        /// Also print the store query restricted to the hits
        #[arg(long)]
        sql: bool,
    },

    /// Refresh an index so recent writes become searchable
    Commit { table: String },

    /// Delete the engine index of a record type
    Drop {
        table: String,

        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Query text; omit for a match-all or geo-only search
    text: Option<String>,

    /// Fields to search instead of the record type's searchable fields
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,

    /// Match any term instead of all terms
    #[arg(long)]
    or: bool,

    #[arg(short, long)]
    limit: Option<usize>,

    /// Keep engine rank order in the store query
    #[arg(long)]
    rank: bool,

    /// Geohash of the point to filter around
    #[arg(long, requires = "geo_field")]
    geohash: Option<String>,

    #[arg(long)]
    geo_field: Option<String>,

    /// Radius such as 5km; the configured default applies when omitted
    #[arg(long, requires = "geohash")]
    distance: Option<String>,
}

impl SearchArgs {
    fn params(&self) -> SearchParams {
        let mut params = SearchParams {
            text: self.text.clone(),
            fields: self.fields.clone(),
            limit: self.limit,
            rank_order: self.rank,
            ..SearchParams::default()
        };
        if self.or {
            params = params.or();
        }
        if let (Some(geohash), Some(field)) = (&self.geohash, &self.geo_field) {
            let mut filter = GeoFilter::geohash(field, geohash);
            if let Some(distance) = &self.distance {
                filter = filter.within(distance);
            }
            params = params.geo(filter);
        }
        params
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    search_mirror::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::default_config()
    };

    match cli.command {
        Commands::Schema { table } => cmd_schema(&config, &table)?,
        Commands::Query { table, search } => cmd_query(&config, &table, &search).await?,
        Commands::Ensure => cmd_ensure(&config).await?,
        Commands::Search { table, search, sql } => {
            cmd_search(&config, &table, &search, sql).await?
        }
        Commands::Commit { table } => cmd_commit(&config, &table).await?,
        Commands::Drop { table, confirm } => cmd_drop(&config, &table, confirm).await?,
    }

    Ok(())
}

fn record_type<'a>(config: &'a Config, table: &str) -> Result<&'a RecordType> {
    config
        .record_type(table)
        .ok_or_else(|| anyhow!("Record type '{}' is not configured", table))
}

async fn connect(config: &Config) -> Result<SearchBackend> {
    SearchBackend::connect(config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.engine.url))
}

fn cmd_schema(config: &Config, table: &str) -> Result<()> {
    let record_type = record_type(config, table)?;
    let primary_key = record_type
        .primary_key
        .as_deref()
        .unwrap_or(&config.search.primary_key);

    let properties = SchemaMapper::new(record_type, primary_key).fields();
    println!("{}", serde_json::to_string_pretty(&properties)?);
    Ok(())
}

async fn cmd_query(config: &Config, table: &str, search: &SearchArgs) -> Result<()> {
    let record_type = record_type(config, table)?;

    // Offline: the in-memory engine only backs index resolution
    let backend = SearchBackend::new(Arc::new(MemoryEngine::new()), &config.search);
    let body = backend
        .translate(record_type, &search.params())
        .await
        .context("Failed to build query")?;

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn cmd_ensure(config: &Config) -> Result<()> {
    if config.record_types.is_empty() {
        println!("{}", format_warning("No record types configured"));
        return Ok(());
    }

    let backend = connect(config).await?;
    let mut failed = 0;

    for record_type in &config.record_types {
        match backend.index(record_type).await {
            Ok(index) => println!(
                "{}",
                format_success(&format!("{} -> {}", record_type.table, index.name()))
            ),
            Err(e) => {
                error!("Failed to ensure index for {}: {}", record_type.table, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{} indexes could not be created", failed));
    }
    Ok(())
}

async fn cmd_search(config: &Config, table: &str, search: &SearchArgs, sql: bool) -> Result<()> {
    let record_type = record_type(config, table)?;
    let backend = connect(config).await?;
    let params = search.params();

    let start_time = Instant::now();
    let hits = backend
        .search_hits(record_type, &params)
        .await
        .context("Search failed")?;
    info!(
        "Search finished in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    if hits.is_empty() {
        println!("{}", format_warning("No hits"));
    }
    for hit in &hits {
        println!("{}", hit.format_summary());
    }

    if sql {
        let index = backend.index(record_type).await?;
        let query = ResultMapper::apply(
            SqlSelect::from_table(&record_type.table),
            index.primary_key(),
            index.key_type(),
            &hits,
            params.rank_order,
        );
        println!("{}", query.to_sql_inline());
    }

    Ok(())
}

async fn cmd_commit(config: &Config, table: &str) -> Result<()> {
    let record_type = record_type(config, table)?;
    let backend = connect(config).await?;

    backend
        .commit(record_type)
        .await
        .with_context(|| format!("Failed to refresh index for {}", table))?;

    println!("{}", format_success(&format!("Committed {}", table)));
    Ok(())
}

async fn cmd_drop(config: &Config, table: &str, confirm: bool) -> Result<()> {
    if !confirm {
        error!("This will delete the index and its documents. Use --confirm to proceed");
        return Ok(());
    }

    let record_type = record_type(config, table)?;
    let backend = connect(config).await?;

    warn!("Dropping index for {} - all documents will be lost", table);
    backend
        .drop_index(record_type)
        .await
        .with_context(|| format!("Failed to drop index for {}", table))?;

    println!("{}", format_success(&format!("Dropped index for {}", table)));
    Ok(())
}
