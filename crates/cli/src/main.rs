//! `soapcall` entry point.
//!
//! This binary is the composition root of the workspace:
//!
//! 1. **Parse arguments and configuration** (`--config` TOML file, optional).
//! 2. **Wire observability**: `tracing-subscriber` with an `EnvFilter` and
//!    either a human-readable or a JSON formatting layer.
//! 3. **Construct infrastructure**: `HttpTransport` and `DescriptionLoader`,
//!    injected into a `SoapClient`.
//! 4. **Perform one call** and print the response body to stdout.
//!
//! Exit codes: `0` on success, `1` on any error, `2` when the service
//! answered with a SOAP fault.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use client::{ClientConfig, SoapClient};
use protocol::{ParamValue, SoapError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use transport::{DescriptionLoader, HttpTransport};

/// Invoke an operation of a SOAP service described by a WSDL document.
#[derive(Parser, Debug)]
#[command(name = "soapcall")]
#[command(version, about, long_about = None)]
struct Cli {
    /// WSDL location: http(s) URL, file:// URL, or a local path
    #[arg(long)]
    wsdl: String,

    /// Operation to invoke
    operation: String,

    /// Body parameter as name=value; repeat for more, order is kept
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Body parameters as a JSON object (replaces --param)
    #[arg(long, value_name = "JSON", conflicts_with = "params")]
    params_json: Option<String>,

    /// Client configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Construct a SOAPAction when the description declares none
    #[arg(long)]
    auto_action: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let fault = err
                .downcast_ref::<SoapError>()
                .is_some_and(SoapError::is_fault);
            eprintln!("error: {err:#}");
            if fault {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    config.auto_action |= cli.auto_action;
    tracing::debug!(?config, "configuration loaded");

    let params = match &cli.params_json {
        Some(json) => json_params(json)?,
        None => pair_params(&cli.params)?,
    };

    let client = SoapClient::builder(
        cli.wsdl.as_str(),
        Arc::new(DescriptionLoader::new()),
        Arc::new(HttpTransport::new()),
    )
    .config(config)
    .build();

    let response = client.call(&cli.operation, params).await?;
    println!("{}", response.body.trim());
    Ok(())
}

fn pair_params(raw: &[String]) -> Result<ParamValue> {
    let mut pairs = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some((name, value)) = entry.split_once('=') else {
            bail!("parameter '{entry}' is not of the form NAME=VALUE");
        };
        if name.is_empty() {
            bail!("parameter '{entry}' has an empty name");
        }
        pairs.push((name.to_owned(), ParamValue::text(value)));
    }
    Ok(ParamValue::Pairs(pairs))
}

fn json_params(json: &str) -> Result<ParamValue> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("--params-json is not valid JSON")?;
    if !value.is_object() {
        bail!("--params-json must be a JSON object");
    }
    Ok(value.into())
}
