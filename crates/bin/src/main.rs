//! Procura CLI binary.
//!
//! Reads a canonical transaction table, runs the feature engine and writes
//! the enriched and auxiliary tables.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use procura::data::canonical::read_canonical_csv;
use procura::output::{
    BenchmarkRecord, ConcentrationRecord, DemandRecord, EnrichedRecord, ExportFormat, Exporter,
    PriorityRecord,
};
use procura::{EngineConfig, EngineOutput, FeatureEngine, Partitioning};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(name = "procura")]
#[command(about = "Procura: benchmark and risk features for procurement records", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log engine stages and counts
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a canonical table and write every output table
    Enrich {
        #[command(flatten)]
        run: RunArgs,

        /// Output directory
        #[arg(short, long, default_value = "procura-out")]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,
    },

    /// Enrich a canonical table and print the run summary
    Summary {
        #[command(flatten)]
        run: RunArgs,

        /// Number of radar rows to list
        #[arg(long, default_value = "10")]
        top: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Canonical transaction CSV
    input: PathBuf,

    /// Field delimiter of the input (and of CSV output)
    #[arg(short, long, default_value = ";")]
    delimiter: char,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Partitioning for large inputs
    #[arg(long, value_enum, default_value = "whole")]
    partition: PartitionMode,

    /// Number of product-key ranges with `--partition products`
    #[arg(long, default_value = "8")]
    buckets: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PartitionMode {
    /// Single pass over all records
    Whole,
    /// One partition per purchase year
    Year,
    /// Contiguous product-key ranges
    Products,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Enrich {
            run,
            output,
            format,
        } => {
            let delimiter = u8::try_from(run.delimiter)?;
            let result = run_engine(&run)?;
            let format = match format {
                OutputFormat::Csv => ExportFormat::Delimited(delimiter),
                OutputFormat::Json => ExportFormat::PrettyJson,
            };
            write_tables(&result, &output, format)?;
        }
        Commands::Summary { run, top, json } => {
            let result = run_engine(&run)?;
            let summary = result.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary.to_ascii_table());
                print_radar(&result, top);
            }
        }
        Commands::Config => {
            println!("{}", EngineConfig::default().to_json_string()?);
        }
    }

    Ok(())
}

fn run_engine(args: &RunArgs) -> Result<EngineOutput, Box<dyn std::error::Error>> {
    let delimiter = u8::try_from(args.delimiter)?;
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = FeatureEngine::new(config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {elapsed} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Reading {}...", args.input.display()));

    let transactions = match read_canonical_csv(&args.input, delimiter) {
        Ok(txs) => txs,
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    pb.set_message(format!("Enriching {} transactions...", transactions.len()));
    let result = match args.partition {
        PartitionMode::Whole => engine.run(&transactions),
        PartitionMode::Year => engine.run_partitioned(&transactions, Partitioning::Year),
        PartitionMode::Products => {
            engine.run_partitioned(&transactions, Partitioning::ProductBuckets(args.buckets))
        }
    };

    match result {
        Ok(output) => {
            pb.finish_with_message(format!(
                "Enriched {} transactions ({} scored)",
                output.enriched.len(),
                output.tables.prices.scored_count()
            ));
            Ok(output)
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            Err(e.into())
        }
    }
}

fn write_tables(
    result: &EngineOutput,
    dir: &Path,
    format: ExportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let path = |name: &str| dir.join(format!("{}.{}", name, format.extension()));
    let tables = &result.tables;

    let enriched: Vec<EnrichedRecord> = result.enriched.iter().map(EnrichedRecord::from).collect();
    enriched.export_to_file(&path("enriched"), format)?;

    let benchmarks: Vec<BenchmarkRecord> =
        tables.benchmarks.iter().map(BenchmarkRecord::from).collect();
    benchmarks.export_to_file(&path("benchmarks"), format)?;

    let demand: Vec<DemandRecord> = tables.demand.iter().map(DemandRecord::from).collect();
    demand.export_to_file(&path("demand"), format)?;

    let concentration: Vec<ConcentrationRecord> = tables
        .concentration
        .iter()
        .map(ConcentrationRecord::from)
        .collect();
    concentration.export_to_file(&path("concentration"), format)?;

    let priority: Vec<PriorityRecord> = tables.priority.iter().map(PriorityRecord::from).collect();
    priority.export_to_file(&path("priority"), format)?;

    result.radar().export_to_file(&path("radar"), format)?;
    result
        .summary()
        .export_to_file(&dir.join("summary.json"), ExportFormat::PrettyJson)?;

    println!("Wrote 7 tables to {}", dir.display());
    Ok(())
}

fn print_radar(result: &EngineOutput, top: usize) {
    let radar = result.radar();
    if radar.is_empty() || top == 0 {
        return;
    }

    println!("\nOpportunity Radar (top {} by value gap):", top.min(radar.len()));
    println!("{}", "-".repeat(60));
    println!(
        "  {:<14} {:<10} {:>10} {:>10} {:>12}",
        "Product", "Tier", "Paid", "Benchmark", "Value gap"
    );
    for entry in radar.top(top) {
        println!(
            "  {:<14} {:<10} {:>10.2} {:>10.2} {:>12.2}",
            entry.product_key, entry.tier, entry.paid_price, entry.benchmark_price, entry.value_gap
        );
    }
    println!(
        "\nTotal overspend across {} rows: {:.2}",
        radar.len(),
        radar.total_overspend()
    );
}
