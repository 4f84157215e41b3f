use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use component_meta_core::analyzer::adapter::AnalyzeRequest;
use component_meta_core::analyzer::extract::analyze_sfc;
use component_meta_core::discovery::discover;
use component_meta_core::error::AnalyzerError;
use component_meta_core::{ComponentMetaParser, EngineError, EngineOptions};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "component metadata engine", long_about = None)]
struct Cli {
    /// JSON options file (camelCase engine options)
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    /// Log at info level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and analyze components, print the queryable record set
    Scan(ScanArgs),
    /// Print one component record
    Query(QueryArgs),
    /// Print the generated module
    Module(ScanArgs),
    /// Analyze one request read as JSON from STDIN with the built-in analyzer
    Analyze,
}

#[derive(Args, Debug, Default)]
struct ScanArgs {
    /// Component directory, repeatable; overrides `componentDirs` from the options
    #[arg(long = "dir")]
    dirs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Display name, kebab-case name or `<name>.json`
    name: Option<String>,
    #[command(flatten)]
    scan: ScanArgs,
}

#[derive(Serialize)]
struct ErrorOut {
    error: String,
}

fn print_error(message: impl ToString) -> ! {
    let out = ErrorOut { error: message.to_string() };
    println!("{}", serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string()));
    std::process::exit(1);
}

fn setup_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_options(path: Option<&PathBuf>) -> Result<EngineOptions, EngineError> {
    match path {
        Some(path) => Ok(EngineOptions::load(path)?),
        None => Ok(EngineOptions::default()),
    }
}

async fn scan(options: EngineOptions, args: ScanArgs) -> Result<ComponentMetaParser, EngineError> {
    let dirs = if args.dirs.is_empty() {
        options.component_dirs.clone()
    } else {
        args.dirs
    };
    let descriptors = discover(&dirs);
    info!(dirs = dirs.len(), components = descriptors.len(), "discovered components");

    let parser = ComponentMetaParser::from_options(options)?;
    parser.stub_output().await?;
    parser.sync_components(&descriptors).await?;
    parser.parse_all().await?;
    Ok(parser)
}

fn read_stdin() -> String {
    let mut buf = String::new();
    if io::stdin().read_to_string(&mut buf).is_err() {
        eprintln!("component-meta: failed to read from STDIN");
        std::process::exit(2);
    }
    buf
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let options = match load_options(cli.options.as_ref()) {
        Ok(options) => options,
        Err(err) => print_error(err),
    };

    match cli.command {
        Commands::Scan(args) => {
            let parser = scan(options, args).await.unwrap_or_else(|e| print_error(e));
            let set = parser.queryable();
            match serde_json::to_string_pretty(&set) {
                Ok(json) => println!("{}", json),
                Err(err) => print_error(err),
            }
        }
        Commands::Query(args) => {
            let parser = scan(options, args.scan).await.unwrap_or_else(|e| print_error(e));
            match parser.query_json(args.name.as_deref()) {
                Ok(json) => println!("{}", json),
                Err(err) => print_error(err),
            }
        }
        Commands::Module(args) => {
            let parser = scan(options, args).await.unwrap_or_else(|e| print_error(e));
            match parser.to_module() {
                Ok(module) => print!("{}", module),
                Err(err) => print_error(err),
            }
        }
        Commands::Analyze => {
            let request: AnalyzeRequest = match serde_json::from_str(&read_stdin()) {
                Ok(request) => request,
                Err(err) => print_error(format!("invalid analyze request: {}", err)),
            };
            // Error objects on stdout are what the command analyzer reads back
            match analyze_sfc(&request) {
                Ok(raw) => println!("{}", raw),
                Err(AnalyzerError::Parse(reason)) => print_error(reason),
                Err(err) => print_error(err),
            }
        }
    }
}
