//! Patrimônio CLI - analyze asset inventory CSV exports
//!
//! # Main Commands
//!
//! ```bash
//! patrimonio serve                        # Start HTTP server (port 3000)
//! patrimonio load data/                   # Load sources, print a summary
//! patrimonio metrics data/ --region "2.01 SANTOS"
//! patrimonio export data/ --xlsx out.xlsx --similarity-min 70
//! ```
//!
//! # Data Preparation
//!
//! ```bash
//! patrimonio consolidate data/ -o patrimonio_completo.csv
//! patrimonio demo -o demo.csv
//! ```

use clap::{Args, Parser, Subcommand};
use patrimonio::{
    aggregate, consolidate_folder, details, export_file_name, filter, ingest_and_normalize,
    AppConfig, FilterPredicates, LoadOutcome, SourceDescriptor,
};
use patrimonio::export::{export_csv_with_limit, export_spreadsheet_with_limit};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "patrimonio")]
#[command(about = "Analyze asset inventory CSV exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by the query commands
#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Exact region
    #[arg(long)]
    region: Option<String>,

    /// Decision label (RECLASSIFICAR, AVALIAR, MANTER, OUTROS, "Sem Categoria")
    #[arg(long)]
    decision: Option<String>,

    /// Earliest incorporation year (inclusive)
    #[arg(long)]
    year_min: Option<i16>,

    /// Latest incorporation year (inclusive)
    #[arg(long)]
    year_max: Option<i16>,

    /// Minimum similarity percentage (inclusive)
    #[arg(long)]
    similarity_min: Option<f64>,
}

impl From<FilterArgs> for FilterPredicates {
    fn from(args: FilterArgs) -> Self {
        Self {
            region: args.region,
            decision: args.decision,
            year_min: args.year_min,
            year_max: args.year_max,
            similarity_min: args.similarity_min,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load sources and print a per-source summary
    Load {
        /// Files, folders or http(s) URLs
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Print the filtered records as JSON
    Filter {
        #[arg(required = true)]
        sources: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print metrics of the filtered view as JSON
    Metrics {
        #[arg(required = true)]
        sources: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Include the detail analytics
        #[arg(long)]
        details: bool,
    },

    /// Export the filtered view as CSV and/or xlsx
    Export {
        #[arg(required = true)]
        sources: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// CSV output path
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Spreadsheet output path
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },

    /// Merge every CSV of a folder into one file
    Consolidate {
        /// Folder containing the CSV files
        #[arg(default_value = "data")]
        folder: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "patrimonio_completo.csv")]
        output: PathBuf,
    },

    /// Write the demonstration dataset as CSV
    Demo {
        /// Output file
        #[arg(short, long, default_value = "demo.csv")]
        output: PathBuf,

        /// Number of rows
        #[arg(short = 'n', long, default_value_t = patrimonio::demo::DEMO_ROWS)]
        rows: usize,

        /// Random seed
        #[arg(long, default_value_t = patrimonio::demo::DEMO_SEED)]
        seed: u64,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides PATRIMONIO_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Commands {
    /// Only these commands read `PATRIMONIO_*` settings.
    fn needs_config(&self) -> bool {
        matches!(self, Commands::Export { .. } | Commands::Serve { .. })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = if cli.command.needs_config() {
        match AppConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                std::process::exit(2);
            }
        }
    } else {
        AppConfig::default()
    };

    let result = match cli.command {
        Commands::Load { sources } => cmd_load(&sources).await,

        Commands::Filter {
            sources,
            filters,
            output,
        } => cmd_filter(&sources, filters.into(), output.as_deref()).await,

        Commands::Metrics {
            sources,
            filters,
            details: with_details,
        } => cmd_metrics(&sources, filters.into(), with_details).await,

        Commands::Export {
            sources,
            filters,
            csv,
            xlsx,
        } => {
            cmd_export(
                &sources,
                filters.into(),
                csv.as_deref(),
                xlsx.as_deref(),
                config.export_row_limit,
            )
            .await
        }

        Commands::Consolidate { folder, output } => cmd_consolidate(&folder, &output),

        Commands::Demo { output, rows, seed } => cmd_demo(&output, rows, seed),

        Commands::Serve { port } => {
            let config = AppConfig {
                port: port.unwrap_or(config.port),
                ..config
            };
            patrimonio::server::start_server(config).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn load(sources: &[String]) -> Result<LoadOutcome, Box<dyn std::error::Error>> {
    let descriptors: Vec<SourceDescriptor> =
        sources.iter().map(|s| SourceDescriptor::from_arg(s)).collect();
    Ok(ingest_and_normalize(&descriptors).await?)
}

async fn cmd_load(sources: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load(sources).await?;

    eprintln!("\n📊 SUMMARY");
    eprintln!("{}", "=".repeat(60));
    for batch in &loaded.sources {
        eprintln!(
            "   {:<30} {:>8} rows  ({})",
            batch.source, batch.row_count, batch.encoding
        );
        if !batch.dropped_columns.is_empty() {
            eprintln!("      dropped: {}", batch.dropped_columns.join(", "));
        }
    }
    for failure in &loaded.failures {
        eprintln!("   ❌ {}: {}", failure.source, failure.message);
    }
    eprintln!("{}", "=".repeat(60));
    eprintln!("   Total records: {}", loaded.records.len());
    eprintln!("   Dataset id:    {}", loaded.records.id());

    Ok(())
}

async fn cmd_filter(
    sources: &[String],
    predicates: FilterPredicates,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load(sources).await?;
    let view = filter(&loaded.records, &predicates);
    eprintln!("🔎 {} of {} records match", view.len(), loaded.records.len());

    let json = serde_json::to_string_pretty(&view)?;
    write_output(&json, output)
}

async fn cmd_metrics(
    sources: &[String],
    predicates: FilterPredicates,
    with_details: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load(sources).await?;
    let view = filter(&loaded.records, &predicates);

    let json = if with_details {
        serde_json::to_string_pretty(&serde_json::json!({
            "metrics": aggregate(&view),
            "details": details(&view),
        }))?
    } else {
        serde_json::to_string_pretty(&aggregate(&view))?
    };
    println!("{}", json);
    Ok(())
}

async fn cmd_export(
    sources: &[String],
    predicates: FilterPredicates,
    csv: Option<&Path>,
    xlsx: Option<&Path>,
    row_limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load(sources).await?;
    let view = filter(&loaded.records, &predicates);
    eprintln!("📦 Exporting {} records", view.len());

    // Neither path given: CSV with the timestamped default name
    let default_csv = (csv.is_none() && xlsx.is_none())
        .then(|| PathBuf::from(export_file_name("csv", &chrono::Local::now())));

    if let Some(path) = csv.or(default_csv.as_deref()) {
        fs::write(path, export_csv_with_limit(&view, row_limit)?)?;
        eprintln!("💾 CSV written to: {}", path.display());
    }
    if let Some(path) = xlsx {
        fs::write(path, export_spreadsheet_with_limit(&view, row_limit)?)?;
        eprintln!("💾 Spreadsheet written to: {}", path.display());
    }
    Ok(())
}

fn cmd_consolidate(folder: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📂 Consolidating: {}", folder.display());
    let report = consolidate_folder(folder, output)?;

    let size_mb = fs::metadata(output)?.len() as f64 / 1024.0 / 1024.0;
    eprintln!("{}", "=".repeat(50));
    eprintln!("✅ CONSOLIDAÇÃO CONCLUÍDA!");
    eprintln!("📊 Total de registros: {}", report.total_rows);
    eprintln!("📋 Colunas: {}", report.columns.len());
    eprintln!("💾 Tamanho do arquivo: {:.2} MB", size_mb);
    eprintln!("📁 Arquivo salvo: {}", output.display());
    if !report.failures.is_empty() {
        eprintln!("⚠️  {} arquivo(s) ignorado(s)", report.failures.len());
    }
    eprintln!("{}", "=".repeat(50));
    Ok(())
}

fn cmd_demo(output: &Path, rows: usize, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    let generated = patrimonio::demo::generate_rows(rows, seed);
    fs::write(output, patrimonio::demo::rows_to_csv(&generated)?)?;
    eprintln!("🎲 {} demo rows written to: {}", generated.len(), output.display());
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
