//! Provider Schema CLI
//!
//! Command-line interface for normalizing provider schema documents.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use provider_schema::{load_document_auto, ProviderSchema, Schema};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "provider-schema")]
#[command(about = "Normalize Terraform provider schemas into a canonical tree")]
#[command(version)]
struct Cli {
    /// Log conversion details to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a provider document into the canonical schema
    Convert {
        /// Provider document: file path or URL (http:// or https://)
        source: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the implied type of one schema in transport JSON
    ImpliedType {
        /// Provider document: file path or URL (http:// or https://)
        source: String,

        /// Resource type name
        #[arg(long, conflicts_with_all = ["data_source", "provider"])]
        resource: Option<String>,

        /// Data source type name
        #[arg(long, conflicts_with_all = ["resource", "provider"])]
        data_source: Option<String>,

        /// Use the provider's own schema
        #[arg(
            long,
            conflicts_with_all = ["resource", "data_source"],
            required_unless_present_any = ["resource", "data_source"]
        )]
        provider: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Convert {
            source,
            output,
            pretty,
        } => run_convert(&source, output, pretty),

        Commands::ImpliedType {
            source,
            resource,
            data_source,
            provider: _,
            pretty,
        } => {
            let target = match (resource, data_source) {
                (Some(name), _) => Target::Resource(name),
                (None, Some(name)) => Target::DataSource(name),
                (None, None) => Target::Provider,
            };
            run_implied_type(&source, target, pretty)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(source: &str) -> Result<ProviderSchema, u8> {
    let document = load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    document.convert().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, u8> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        1
    })
}

fn run_convert(source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let schema = load(source)?;
    let json_output = to_json(&schema, pretty)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

enum Target {
    Provider,
    Resource(String),
    DataSource(String),
}

fn select<'a>(schema: &'a ProviderSchema, target: &Target) -> Result<&'a Schema, u8> {
    let found = match target {
        Target::Provider => Some(&schema.provider),
        Target::Resource(name) => schema.resource(name),
        Target::DataSource(name) => schema.data_source(name),
    };
    found.ok_or_else(|| {
        match target {
            Target::Resource(name) => eprintln!("Error: no resource named {}", name),
            Target::DataSource(name) => eprintln!("Error: no data source named {}", name),
            Target::Provider => {}
        }
        2
    })
}

fn run_implied_type(source: &str, target: Target, pretty: bool) -> Result<(), u8> {
    let schema = load(source)?;
    let selected = select(&schema, &target)?;

    let ty = selected.block.implied_type().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    println!("{}", to_json(&ty.to_json(), pretty)?);
    Ok(())
}
