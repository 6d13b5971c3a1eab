use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use stern_gerlach::request::{ErrorResponse, MeasurementRequest, Reply};
use stern_gerlach::SimulationError;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Run a sequential Stern-Gerlach measurement request and print the per-analyzer tallies.
#[derive(Parser, Debug)]
#[command(name = "sgsim", author, version)]
struct Cli {
    /// JSON request file, read from stdin when omitted or `-`.
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// Override the request's seed for a reproducible run.
    #[arg(long, env = "SGSIM_SEED")]
    seed: Option<u64>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn init_tracing() {
    // SGSIM_LOG wins over RUST_LOG.
    let filter = EnvFilter::try_from_env("SGSIM_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn read_body(path: Option<&PathBuf>) -> Result<String> {
    let mut body = String::new();
    match path {
        Some(path) if path.as_os_str() != "-" => {
            body = std::fs::read_to_string(path)
                .with_context(|| format!("reading request from {}", path.display()))?;
        }
        _ => {
            std::io::stdin()
                .read_to_string(&mut body)
                .context("reading request from stdin")?;
        }
    }
    Ok(body)
}

fn respond(cli: &Cli, body: &str) -> Reply {
    let mut request: MeasurementRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(err) => {
            return Reply::Error(ErrorResponse {
                error: SimulationError::invalid_request(err.to_string()).to_string(),
            })
        }
    };
    if let Some(seed) = cli.seed {
        request.seed = Some(seed);
    }
    info!(
        atoms = request.atoms,
        analyzers = request.analyzers.len(),
        "running request"
    );
    request.run().into()
}

fn print(reply: &Reply, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(reply)?
    } else {
        serde_json::to_string(reply)?
    };
    println!("{}", out);
    Ok(())
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let body = read_body(cli.request.as_ref())?;
    let reply = respond(&cli, &body);
    print(&reply, cli.pretty)?;

    match &reply {
        Reply::Results(_) => Ok(ExitCode::SUCCESS),
        Reply::Error(e) => {
            error!(error = %e.error, "request failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
