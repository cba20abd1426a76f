//! slt-ctl: Smart Lower Thirds operator CLI
//!
//! Connects to obs-websocket, waits for identification, runs one action
//! against the lower-thirds vendor, then disconnects. Status and protocol
//! log lines go to stderr; results go to stdout.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use slt_client::{
    ClientConfig, ClientEvent, ConnectionManager, LowerThird, LowerThirdsApi, RequestResponse,
    ENV_PASSWORD, ENV_URL,
};

/// slt-ctl: Smart Lower Thirds operator CLI
#[derive(Parser, Debug)]
#[command(name = "slt-ctl")]
#[command(about = "List and toggle Smart Lower Thirds over obs-websocket")]
struct Args {
    /// obs-websocket URL
    #[arg(long, env = ENV_URL)]
    url: Option<String>,

    /// obs-websocket password (empty disables authentication)
    #[arg(long, env = ENV_PASSWORD, hide_env_values = true)]
    password: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// How long to wait for identification, in milliseconds
    #[arg(long, default_value = "5000")]
    ready_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// List lower thirds
    List,
    /// Toggle visibility of one lower third
    Toggle { id: String },
    /// Show one lower third
    Show { id: String },
    /// Hide one lower third
    Hide { id: String },
    /// Stream status, log and item events until Ctrl+C
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let (client, events) = ConnectionManager::with_websocket(config);
    let printer = tokio::spawn(print_events(events));

    client
        .connect_configured()
        .await
        .context("Invalid obs-websocket address")?;

    let ready_timeout = Duration::from_millis(args.ready_timeout_ms);
    let result = match client.wait_until_ready(ready_timeout).await {
        Ok(()) => run(&client, &args.command).await,
        Err(e) => Err(e).context("Could not reach OBS"),
    };

    client.disconnect().await;
    drop(client);
    if let Err(e) = printer.await {
        debug!(error = %e, "Event printer ended abnormally");
    }

    result
}

/// Defaults and environment, then command-line flags on top.
fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env();

    if let Some(url) = &args.url {
        config.address = url.clone();
    }
    if let Some(password) = &args.password {
        config.password = Some(password.clone());
    }
    if let Some(ms) = args.timeout_ms {
        config.request_timeout = Duration::from_millis(ms);
    }
    // Only `watch` relies on the automatic listing.
    config.list_on_identify = matches!(args.command, Command::Watch);

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run(client: &ConnectionManager, command: &Command) -> Result<()> {
    match command {
        Command::List => {
            let items = client.list_lower_thirds().await?;
            print_items(&items);
        }
        Command::Toggle { id } => report(id, "toggled", client.toggle_visible(id).await?),
        Command::Show { id } => report(id, "shown", client.set_visible(id, true).await?),
        Command::Hide { id } => report(id, "hidden", client.set_visible(id, false).await?),
        Command::Watch => {
            info!("Watching; press Ctrl+C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl+C")?;
        }
    }
    Ok(())
}

fn report(id: &str, verb: &str, response: RequestResponse) {
    if response.response_data.is_null() {
        println!("{id}: {verb}");
    } else {
        println!("{id}: {verb} {}", response.response_data);
    }
}

async fn print_events(mut events: mpsc::Receiver<ClientEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::Status(status) => eprintln!("[status] {status}"),
            ClientEvent::Notice(text) => eprintln!("[notice] {text}"),
            ClientEvent::Log(line) => eprintln!("[log] {line}"),
            ClientEvent::Items(items) => print_items(&items),
        }
    }
}

fn print_items(items: &[LowerThird]) {
    if items.is_empty() {
        println!("No lower thirds.");
        return;
    }

    println!(
        "{:<24} {:<24} {:<8} {:>7} {:>7} {:<12} {}",
        "TITLE", "SUBTITLE", "STATE", "REPEAT", "SHOWN", "HOTKEY", "ID"
    );
    for item in items {
        println!(
            "{:<24} {:<24} {:<8} {:>6}s {:>6}s {:<12} {}",
            truncate(item.display_title(), 24),
            truncate(&item.subtitle, 24),
            if item.is_visible { "Visible" } else { "Hidden" },
            item.repeat_every_sec,
            item.repeat_visible_sec,
            item.hotkey.as_deref().unwrap_or("-"),
            item.id,
        );
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
