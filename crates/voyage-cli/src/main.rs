//! Voyage CLI - daily reward-API automation over a list of accounts
//!
//! Usage:
//!   voyage                         Ask for chat count and proxy use, then run
//!   voyage -n 5 --no-proxy         Run non-interactively
//!   voyage --init-config           Write a default voyage.toml and exit

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use voyage_agent::{GeminiGenerator, HttpVoyageApi, ResilientClient, RetryPolicy};
use voyage_core::accounts::{
    assign_proxies, load_accounts, load_proxies, DEFAULT_ACCOUNTS_FILE, DEFAULT_PROXIES_FILE,
};
use voyage_core::config::DEFAULT_CONFIG_FILE;
use voyage_core::{ChatCount, OutputArbiter, ProxyAssignment, Tone, VoyageConfig, MAX_CHAT_COUNT};
use voyage_orchestrator::{AccountPipeline, CycleController, PipelineSettings, ScheduleSettings};

#[derive(Parser)]
#[command(name = "voyage")]
#[command(author, version, about = "Daily reward-API automation for a list of accounts")]
struct Cli {
    /// Account list (JSON array of {"bearer", "geminiApiKey"})
    #[arg(long, value_name = "FILE", default_value = DEFAULT_ACCOUNTS_FILE)]
    accounts: PathBuf,

    /// Proxy list, one URI per line
    #[arg(long, value_name = "FILE", default_value = DEFAULT_PROXIES_FILE)]
    proxies: PathBuf,

    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Chats per account (1-20); asked interactively when omitted
    #[arg(short = 'n', long)]
    chats: Option<ChatCount>,

    /// Route traffic through the proxy list
    #[arg(long, conflicts_with = "no_proxy")]
    proxy: bool,

    /// Do not use proxies
    #[arg(long)]
    no_proxy: bool,

    /// Print replies at once instead of typing them out
    #[arg(long)]
    no_type: bool,

    /// Write the default configuration to --config and exit
    #[arg(long)]
    init_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout belongs to the output arbiter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if cli.init_config {
        VoyageConfig::write_default(&cli.config)
            .with_context(|| format!("Failed to write {}", cli.config.display()))?;
        println!("Wrote default configuration to {}", cli.config.display());
        return Ok(());
    }

    let config = VoyageConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    let output = OutputArbiter::stdout();
    output.header("Voyage Auto Bot");

    let accounts = load_accounts(&cli.accounts)
        .with_context(|| format!("Failed to load accounts from {}", cli.accounts.display()))?;
    output.line(
        Tone::Success,
        format!("Loaded {} accounts from {}", accounts.len(), cli.accounts.display()),
    );

    let chat_count = match cli.chats {
        Some(count) => count,
        None => ask_chat_count()?,
    };
    let use_proxy = if cli.proxy {
        true
    } else if cli.no_proxy {
        false
    } else {
        ask_yes_no("Use proxy? (y/n): ")?
    };

    let proxies = if use_proxy {
        proxies_or_warn(&cli.proxies, &output)
    } else {
        output.line(Tone::Muted, "Running without proxy");
        Vec::new()
    };
    let slots = assign_proxies(accounts, &proxies);

    let api = Arc::new(HttpVoyageApi::new(config.api.base_url.clone()));
    let generator = Arc::new(GeminiGenerator::from_config(&config.generator));
    let client = ResilientClient::new(RetryPolicy::from(&config.retry), output.clone());
    let settings = PipelineSettings::from_config(&config, chat_count, !cli.no_type);
    let pipeline = AccountPipeline::new(api, generator, client, settings);
    let controller = Arc::new(
        CycleController::new(slots, pipeline, ScheduleSettings::from_config(&config))
            .context("Failed to start cycle controller")?,
    );

    info!(
        "Starting with {} accounts, {} chats each",
        controller.slots().len(),
        chat_count
    );

    tokio::select! {
        _ = controller.clone().run_forever() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            output.line(Tone::Warning, "\nStopping Voyage");
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}

/// Load proxies, continuing without them when the list is missing or empty
fn proxies_or_warn(path: &Path, output: &OutputArbiter) -> Vec<ProxyAssignment> {
    match load_proxies(path) {
        Ok(proxies) if !proxies.is_empty() => {
            output.line(
                Tone::Success,
                format!("Loaded {} proxies from {}", proxies.len(), path.display()),
            );
            proxies
        }
        Ok(_) => {
            warn!("Proxy list {:?} is empty", path);
            output.line(
                Tone::Warning,
                format!("{} is empty, continuing without proxy", path.display()),
            );
            Vec::new()
        }
        Err(e) => {
            warn!("Could not read proxy list {:?}: {}", path, e);
            output.line(
                Tone::Warning,
                format!("{} not found, continuing without proxy", path.display()),
            );
            Vec::new()
        }
    }
}

fn read_answer(question: &str) -> Result<String> {
    print!("{}", question);
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("stdin closed while waiting for an answer");
    }
    Ok(line.trim().to_string())
}

fn ask_chat_count() -> Result<ChatCount> {
    loop {
        let answer = read_answer(&format!(
            "How many chats per account? (1-{}): ",
            MAX_CHAT_COUNT
        ))?;
        match answer.parse::<ChatCount>() {
            Ok(count) => return Ok(count),
            Err(e) => println!("{}", e),
        }
    }
}

fn ask_yes_no(question: &str) -> Result<bool> {
    loop {
        match read_answer(question)?.to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Please answer y or n."),
        }
    }
}
