//! Engram MCP Server
//!
//! A Model Context Protocol server giving AI assistants persistent,
//! searchable memory backed by the engram-core pipeline engine:
//!
//! - Significance-gated placement: factual knowledge lives in the semantic
//!   indexes, significant experiences become permanent records, routine ones
//!   pass through a bounded recency cache
//! - Hybrid retrieval: concurrent keyword + vector search with reranking
//! - Graph-augmented retrieval: typed relationships expand the seed results
//! - Batch re-analysis jobs over stored records
//!
//! Classification and significance judgments come from an Ollama-compatible
//! chat endpoint; embeddings are generated locally.

mod analyzer;
mod protocol;
mod server;
#[cfg(test)]
mod testutil;
mod tools;

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engram_core::{EngineConfig, LocalEmbedder, MemoryEngine};

use crate::analyzer::OllamaAnalyzer;
use crate::protocol::stdio::StdioTransport;
use crate::server::McpServer;

struct Args {
    data_dir: Option<PathBuf>,
    ollama_url: String,
    model: String,
}

/// Parse command-line arguments. Exits on --help / --version / bad input.
fn parse_args() -> Args {
    let mut args = Args {
        data_dir: None,
        ollama_url: analyzer::DEFAULT_BASE_URL.to_string(),
        model: analyzer::DEFAULT_MODEL.to_string(),
    };

    let argv: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--help" | "-h" => {
                println!("Engram MCP Server v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Persistent memory server using the Model Context Protocol.");
                println!();
                println!("USAGE:");
                println!("    engram-mcp [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!("    --data-dir <PATH>       Custom data directory");
                println!("    --ollama-url <URL>      Analyzer endpoint (default {})", analyzer::DEFAULT_BASE_URL);
                println!("    --model <NAME>          Analyzer model (default {})", analyzer::DEFAULT_MODEL);
                println!();
                println!("ENVIRONMENT:");
                println!("    RUST_LOG                Log level filter (e.g. debug, info, warn)");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("engram-mcp {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--data-dir" => {
                i += 1;
                args.data_dir = Some(PathBuf::from(required_value(&argv, i, "--data-dir")));
            }
            "--ollama-url" => {
                i += 1;
                args.ollama_url = required_value(&argv, i, "--ollama-url").to_string();
            }
            "--model" => {
                i += 1;
                args.model = required_value(&argv, i, "--model").to_string();
            }
            arg => {
                eprintln!("error: unknown argument '{}'", arg);
                eprintln!("Try 'engram-mcp --help' for more information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    args
}

fn required_value<'a>(argv: &'a [String], index: usize, flag: &str) -> &'a str {
    match argv.get(index) {
        Some(value) => value,
        None => {
            eprintln!("error: {flag} requires an argument");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let args = parse_args();

    // Logs go to stderr; stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    info!("engram-mcp v{} starting", env!("CARGO_PKG_VERSION"));

    let analyzer = Arc::new(OllamaAnalyzer::new(args.ollama_url, args.model));
    let embedder = Arc::new(LocalEmbedder::new());

    let engine = match MemoryEngine::open(
        args.data_dir,
        EngineConfig::default(),
        analyzer,
        embedder,
    ) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("failed to open memory engine: {e}");
            std::process::exit(1);
        }
    };

    let server = McpServer::new(engine);
    if let Err(e) = StdioTransport::new().run(server).await {
        eprintln!("transport error: {e}");
        std::process::exit(1);
    }
}
