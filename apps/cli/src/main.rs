//! Sieve CLI
//!
//! Compiles a search intent into an Elasticsearch request body, or maps a raw
//! backend response back into a typed search response.
//!
//! Usage:
//!   sieve compile --config sieve.yaml --request intent.json [--pretty]
//!   sieve map-response --config sieve.yaml --request intent.json --response raw.json
//!   sieve sorting-options --config sieve.yaml --catalog b2c_fr --container product

mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sieve_search::{Config, RequestBuilder, SearchIntent, SearchResponse, SortOrderBuilder};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(name = "sieve")]
#[clap(about = "Compile search intents into Elasticsearch requests")]
struct Args {
    /// Configuration file (YAML, TOML or JSON); SIEVE_* variables override it
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[clap(long, global = true)]
    pretty: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the target index and search body for an intent
    Compile {
        /// Search intent JSON file
        #[clap(short, long)]
        request: PathBuf,
    },
    /// Map a raw backend response for an intent to a typed response
    MapResponse {
        /// Search intent JSON file the response was produced for
        #[clap(short, long)]
        request: PathBuf,

        /// Raw backend response JSON file
        #[clap(long)]
        response: PathBuf,
    },
    /// List the sort choices of a container, default first
    SortingOptions {
        #[clap(long)]
        catalog: String,

        #[clap(long)]
        container: String,
    },
}

#[derive(Serialize)]
struct CompileOutput {
    index: String,
    body: JsonValue,
}

fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        catalogs = config.catalogs.len(),
        containers = config.containers.len(),
        "Configuration loaded"
    );

    let builder = RequestBuilder::from_config(&config).context("Failed to build compiler")?;

    match args.command {
        Command::Compile { request } => {
            let intent: SearchIntent = read_json(&request)?;
            let compiled = builder
                .create(&intent)
                .with_context(|| format!("Failed to compile {}", request.display()))?;
            let output = CompileOutput {
                index: compiled.index_name.clone(),
                body: compiled.to_search_body(builder.registry())?,
            };
            print_json(&output, args.pretty)
        }
        Command::MapResponse { request, response } => {
            let intent: SearchIntent = read_json(&request)?;
            let raw: JsonValue = read_json(&response)?;
            let compiled = builder
                .create(&intent)
                .with_context(|| format!("Failed to compile {}", request.display()))?;
            let container = builder.resolve(&intent.catalog, &intent.container)?;
            let mapped = SearchResponse::from_backend(&raw, &compiled, &container)
                .with_context(|| format!("Failed to map {}", response.display()))?;
            print_json(&mapped, args.pretty)
        }
        Command::SortingOptions { catalog, container } => {
            let container = builder.resolve(&catalog, &container)?;
            let options = SortOrderBuilder::new(&config.search.identifier_field)
                .sorting_options(&container);
            print_json(&options, args.pretty)
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
