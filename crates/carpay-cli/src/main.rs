use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use carpay_api::RestApi;
use carpay_config::{
    report_unused_keys, resolve_secrets, EngineSettings, LoadedConfig, UnusedKeyPolicy,
};
use carpay_echo::{chronological, latest_first, merge, MessageRecord};
use carpay_gateway::PayOsGateway;
use carpay_ledger::{derive_status, GatewayClient, PaymentLine};
use carpay_reconcile::Reconciler;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carpay")]
#[command(about = "Car rental payment reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> site...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Validate layered config: schema, unused keys, gateway secrets
    CheckConfig {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Fail on unused keys instead of warning
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Derive booking status from a JSON array of payment lines (no I/O)
    Derive {
        /// Path to the lines file; `-` reads stdin
        #[arg(long)]
        lines: String,
    },

    /// Merge a server message listing with a client view, dropping pending
    /// echoes the server already carries (no I/O beyond the two files)
    EchoMerge {
        /// JSON array of confirmed server records
        #[arg(long)]
        server: String,

        /// JSON array of the client's current records, pending echoes included
        #[arg(long)]
        client: String,

        /// Newest first, as in the support inbox
        #[arg(long, default_value_t = false)]
        latest_first: bool,

        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Reconcile bookings against the payment gateway and print the reports
    Reconcile {
        /// Booking id; repeat for several bookings
        #[arg(long = "booking-id", required = true)]
        booking_ids: Vec<String>,

        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Ask the gateway for one order's status (read-only)
    GatewayStatus {
        #[arg(long)]
        order_code: i64,

        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev-time convenience only; real deployments set the env directly.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = load(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::CheckConfig {
            config_paths,
            strict,
        } => {
            let loaded = load(&config_paths)?;
            let policy = if strict {
                UnusedKeyPolicy::Fail
            } else {
                UnusedKeyPolicy::Warn
            };
            let report = report_unused_keys(&loaded.config_json, policy)?;
            for pointer in &report.unused_leaf_pointers {
                eprintln!("unused_key={pointer}");
            }
            EngineSettings::from_config_json(&loaded.config_json)?;
            let secrets = resolve_secrets(&loaded.config_json);
            println!("config_hash={}", loaded.config_hash);
            println!("unused_keys={}", report.unused_leaf_pointers.len());
            println!("gateway_credentials={}", secrets.has_gateway_credentials());
        }

        Commands::Derive { lines } => {
            let raw = if lines == "-" {
                std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
            } else {
                fs::read_to_string(&lines)
                    .with_context(|| format!("failed to read lines file: {lines}"))?
            };
            let lines: Vec<PaymentLine> =
                serde_json::from_str(&raw).context("lines must be a JSON array of payment lines")?;
            let derived = derive_status(&lines);
            println!("{}", serde_json::to_string_pretty(&derived)?);
        }

        Commands::EchoMerge {
            server,
            client,
            latest_first: newest_first,
            config_paths,
        } => {
            let (_, settings) = load_settings(&config_paths)?;
            let server: Vec<MessageRecord> = read_records(&server)?;
            let client: Vec<MessageRecord> = read_records(&client)?;
            let policy = if newest_first {
                latest_first()
            } else {
                chronological()
            }
            .with_window_secs(settings.echo.window_secs);
            let merged = merge(&server, &client, &policy);
            println!("{}", serde_json::to_string_pretty(&merged)?);
        }

        Commands::Reconcile {
            booking_ids,
            config_paths,
        } => {
            let (loaded, settings) = load_settings(&config_paths)?;
            let reconciler = build_reconciler(&loaded, &settings)?;
            info!(
                bookings = booking_ids.len(),
                config_hash = %loaded.config_hash,
                "cli: reconcile starting"
            );

            let results = reconciler
                .reconcile_many(&booking_ids, settings.reconcile.max_concurrency)
                .await;

            let mut failed = 0usize;
            for (booking_id, result) in results {
                match result {
                    Ok(report) => println!("{}", serde_json::to_string(&report)?),
                    Err(e) => {
                        failed += 1;
                        eprintln!("booking_id={booking_id} error={e}");
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} bookings could not be reconciled", booking_ids.len());
            }
        }

        Commands::GatewayStatus {
            order_code,
            config_paths,
        } => {
            let (loaded, settings) = load_settings(&config_paths)?;
            let gateway = build_gateway(&loaded, &settings)?;
            let status = gateway
                .get_status(order_code)
                .await
                .with_context(|| format!("gateway lookup failed for order {order_code}"))?;
            println!("order_code={order_code}");
            println!("status={status}");
        }
    }

    Ok(())
}

fn init_tracing() {
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    carpay_config::load_layered_yaml(&path_refs)
}

fn load_settings(paths: &[String]) -> Result<(LoadedConfig, EngineSettings)> {
    let loaded = load(paths)?;
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "cli: config has unused keys");
    }
    let settings = EngineSettings::from_config_json(&loaded.config_json)?;
    Ok((loaded, settings))
}

fn read_records(path: &str) -> Result<Vec<MessageRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read records file: {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("{path} must be a JSON array of messages"))
}

fn build_gateway(loaded: &LoadedConfig, settings: &EngineSettings) -> Result<PayOsGateway> {
    let creds = resolve_secrets(&loaded.config_json).require_gateway()?;
    PayOsGateway::new_with_base_url(
        creds.client_id,
        creds.api_key,
        settings.gateway.base_url.clone(),
        Duration::from_millis(settings.gateway.timeout_ms),
    )
}

fn build_reconciler(loaded: &LoadedConfig, settings: &EngineSettings) -> Result<Reconciler> {
    let Some(base_url) = settings.api.base_url.as_deref() else {
        bail!("CONFIG_INVALID: api.base_url is required to reach the booking system");
    };
    let api = Arc::new(RestApi::new(
        base_url,
        Duration::from_millis(settings.api.timeout_ms),
    )?);
    let gateway = Arc::new(build_gateway(loaded, settings)?);
    Ok(Reconciler::new(api.clone(), api, gateway))
}
