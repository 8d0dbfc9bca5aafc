//! tsemit CLI: replay a result fixture through the negotiated encoder.

mod fixture;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use fixture::Fixture;
use tsemit_core::config::EmitConfig;
use tsemit_exec::{spawn_producer, EmitRequest, Encoder, SendError};

#[derive(Parser)]
#[command(name = "tsemit")]
#[command(about = "Format time-series query results as JSON, CSV or MessagePack", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a result fixture to stdout
    Emit {
        /// Path to the fixture JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Accept header value (application/json, text/csv, application/x-msgpack)
        #[arg(long)]
        accept: Option<String>,

        /// Stream one document per chunk instead of one buffered document
        #[arg(long)]
        chunked: bool,

        /// Rows per chunk (chunked mode)
        #[arg(long)]
        chunk_size: Option<String>,

        /// Rewrite timestamps into an epoch unit (u, ms, s, m, h; anything else is ns)
        #[arg(long)]
        epoch: Option<String>,

        /// Indent JSON output
        #[arg(long)]
        pretty: bool,

        /// Row cap for buffered responses (overrides config, 0 = unlimited)
        #[arg(long)]
        max_row_limit: Option<usize>,
    },

    /// Parse a fixture file without encoding it
    Validate {
        /// Path to the fixture JSON file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Emit {
            input,
            accept,
            chunked,
            chunk_size,
            epoch,
            pretty,
            max_row_limit,
        } => {
            let req = build_request(accept, chunked, chunk_size, epoch, pretty);
            if let Err(e) = emit_fixture(&input, req, max_row_limit) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { input } => match load_fixture(&input) {
            Ok(f) => println!("✓ Fixture is valid ({} statements)", f.statements.len()),
            Err(e) => {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
        },
    }
}

/// Logs go to stderr; stdout carries the encoded response.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn build_request(
    accept: Option<String>,
    chunked: bool,
    chunk_size: Option<String>,
    epoch: Option<String>,
    pretty: bool,
) -> EmitRequest {
    let mut req = EmitRequest::new();
    if let Some(accept) = accept {
        req = req.with_accept(accept);
    }
    if chunked {
        req = req.with_param("chunked", "true");
    }
    if let Some(size) = chunk_size {
        req = req.with_param("chunk_size", size);
    }
    if let Some(epoch) = epoch {
        req = req.with_param("epoch", epoch);
    }
    if pretty {
        req = req.with_param("pretty", "true");
    }
    req
}

fn load_fixture(path: &PathBuf) -> Result<Fixture, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(Fixture::from_json(&text)?)
}

fn apply_overrides(cfg: &mut EmitConfig, max_row_limit: Option<usize>) {
    if let Some(limit) = max_row_limit {
        cfg.max_row_limit = limit;
    }
}

fn emit_fixture(
    path: &PathBuf,
    req: EmitRequest,
    max_row_limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let fixture = load_fixture(path)?;

    let mut config = EmitConfig::from_env();
    apply_overrides(&mut config, max_row_limit);
    config.validate()?;
    debug!(?config, "emit configuration");

    let mut encoder = Encoder::negotiate(&req, &config);
    let (results, producer) =
        spawn_producer(config.channel_capacity, move |tx| fixture.produce(tx));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stats = encoder.encode(&mut out, results)?;
    out.flush()?;

    match producer.join() {
        Ok(Ok(())) | Ok(Err(SendError::Cancelled)) | Ok(Err(SendError::Abandoned)) => {}
        Err(_) => return Err("fixture producer panicked".into()),
    }

    info!(
        content_type = encoder.content_type(),
        statements = stats.statements,
        frames = stats.frames,
        rows = stats.rows,
        bytes = stats.bytes,
        truncated = stats.truncated,
        "response encoded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_request_params() {
        let req = build_request(
            Some("text/csv".into()),
            true,
            Some("50".into()),
            Some("ms".into()),
            false,
        );
        assert_eq!(req.accept(), Some("text/csv"));
        assert_eq!(req.param("chunked"), Some("true"));
        assert_eq!(req.param("chunk_size"), Some("50"));
        assert_eq!(req.param("epoch"), Some("ms"));
        assert_eq!(req.param("pretty"), None);
    }

    #[test]
    fn cli_row_limit_overrides_config() {
        let mut config = EmitConfig {
            max_row_limit: 10,
            ..Default::default()
        };
        apply_overrides(&mut config, None);
        assert_eq!(config.max_row_limit, 10);
        apply_overrides(&mut config, Some(0));
        assert_eq!(config.max_row_limit, 0);
    }
}
