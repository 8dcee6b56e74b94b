// Copyright 2026 Inscriptor Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Parser, Subcommand};
use inscriptor::adapter::AdapterRegistry;
use inscriptor::browser::chromium::ChromiumEngine;
use inscriptor::config::Config;
use inscriptor::email::parse_emails;
use inscriptor::events::EventBus;
use inscriptor::interpreter::Interpreter;
use inscriptor::proxy::ProxyPool;
use inscriptor::rest;
use inscriptor::session::SessionManager;
use inscriptor::task::{Orchestrator, SubscribeRequest};
use std::sync::Arc;
use std::time::Duration;

/// How many task errors the CLI prints before summarizing the rest.
const ERROR_DISPLAY_CAP: usize = 5;

#[derive(Parser)]
#[command(
    name = "inscriptor",
    about = "Inscriptor — batch newsletter-signup automation",
    version,
    after_help = "Run 'inscriptor <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Listen port (overrides INSCRIPTOR_HTTP_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// List the supported sites and their domain patterns
    Sites,
    /// Run one subscription batch and wait for it to finish
    Run {
        /// Target site URL (must match a supported site)
        url: String,
        /// Email addresses, comma- or newline-separated
        emails: String,
        /// Show the browser window instead of running headless
        #[arg(long)]
        headful: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_orchestrator(config: &Config) -> Result<Arc<Orchestrator>> {
    let events = Arc::new(EventBus::default());
    let registry = Arc::new(AdapterRegistry::builtin());
    let pool = Arc::new(match &config.proxy_file {
        Some(path) => ProxyPool::load(path),
        None => ProxyPool::empty(),
    });
    let engine = Arc::new(ChromiumEngine::new()?);
    let sessions = Arc::new(SessionManager::new(engine, pool, Arc::clone(&events)));
    let interpreter = Interpreter::new(Arc::clone(&events));
    Ok(Arc::new(Orchestrator::new(
        registry,
        sessions,
        interpreter,
        Arc::clone(&events),
        config.clone(),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::from_env();

    match cli.command {
        Commands::Serve { port } => {
            let orchestrator = build_orchestrator(&config)?;
            let port = port.unwrap_or(config.http_port);
            rest::start(port, orchestrator).await
        }
        Commands::Sites => {
            let registry = AdapterRegistry::builtin();
            for (name, patterns) in registry.site_details() {
                println!("{name}: {}", patterns.join(", "));
            }
            Ok(())
        }
        Commands::Run {
            url,
            emails,
            headful,
        } => {
            let parsed = parse_emails(&emails);
            if parsed.is_empty() {
                anyhow::bail!("no valid email addresses in input");
            }

            let orchestrator = build_orchestrator(&config)?;
            let task_id = orchestrator
                .submit(SubscribeRequest {
                    url,
                    emails: parsed,
                    headless: Some(!headful),
                })
                .await?;
            println!("task {task_id} submitted");

            let snapshot = orchestrator
                .wait_for(&task_id, Duration::from_secs(1))
                .await?;
            println!(
                "done: {} total, {} succeeded, {} failed",
                snapshot.total, snapshot.success, snapshot.failed
            );
            for error in snapshot.errors.iter().take(ERROR_DISPLAY_CAP) {
                println!("  {error}");
            }
            if snapshot.errors.len() > ERROR_DISPLAY_CAP {
                println!("  +{} more", snapshot.errors.len() - ERROR_DISPLAY_CAP);
            }
            Ok(())
        }
    }
}
