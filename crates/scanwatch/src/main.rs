//! scanwatch entrypoint: follow a scan's progress stream in the terminal.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{error, info};

use scanwatch_core::{Config, DisplayMode, ProgressClient, RenderLayout, RenderSink, RenderState};

mod app;
mod plain;
mod replay;
#[path = "runtime_config.rs"]
mod runtime_config;
mod session;
#[path = "shutdown_signal.rs"]
mod shutdown_signal;
mod terminal;
mod transport;
mod tui;
mod ui;

use crate::app::App;
use crate::plain::PlainSink;
use crate::replay::ReplayChannel;
use crate::runtime_config::{display_mode, init_tracing, load_config};
use crate::session::{Session, SessionEnd};
use crate::shutdown_signal::shutdown_signal;
use crate::transport::{AnyChannel, WsChannel};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Site origin the scan page was served from, e.g. https://scanner.example
    #[arg(long)]
    origin: Option<String>,

    /// Print one line per update instead of the full-screen view
    #[arg(long)]
    plain: bool,

    /// Read frames from a JSON-lines file instead of connecting
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Delay between replayed frames (ms)
    #[arg(long, default_value_t = 0)]
    replay_delay_ms: u64,

    /// Leave the full-screen view as soon as the stream ends
    #[arg(long)]
    exit_on_close: bool,

    /// Validate configuration and exit
    #[arg(long)]
    check: bool,

    /// Scan to follow; falls back to connection.scan_id from the config
    scan_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    let mode = display_mode(&args, &config);

    if args.check {
        let page = config
            .page_context(args.scan_id.as_deref())
            .context("resolve scan page")?;
        println!("Config OK (origin {})", page.origin);
        return Ok(());
    }

    init_tracing(&config, mode)?;

    let page = config
        .page_context(args.scan_id.as_deref())
        .context("resolve scan page")?;
    let layout = RenderLayout::from(&config.display);

    let end = match mode {
        DisplayMode::Plain => {
            let sink = PlainSink::new(layout, io::stdout());
            let Some(client) = ProgressClient::attach(&page, sink)? else {
                return no_scan();
            };
            let channel = open_channel(&args, &config, &client).await?;
            let mut session = Session::new(client, channel);
            session.run_until(shutdown_signal()).await
        }
        DisplayMode::Tui => {
            let Some(client) = ProgressClient::attach(&page, RenderState::new(layout))? else {
                return no_scan();
            };
            let channel = open_channel(&args, &config, &client).await?;
            let app = App::new(
                client.scan_id(),
                client.endpoint().as_str(),
                source_label(&args),
                args.exit_on_close,
            );
            tui::run(Session::new(client, channel), app).await?
        }
    };

    report_end(end)
}

fn no_scan() -> Result<()> {
    info!("no scan id given; nothing to watch");
    eprintln!("No scan id: pass SCAN_ID or set connection.scan_id in the config.");
    Ok(())
}

fn source_label(args: &Args) -> &'static str {
    if args.replay.is_some() {
        "replay"
    } else {
        "live"
    }
}

async fn open_channel<S: RenderSink>(
    args: &Args,
    config: &Config,
    client: &ProgressClient<S>,
) -> Result<AnyChannel> {
    if let Some(path) = args.replay.as_ref() {
        let delay = Duration::from_millis(args.replay_delay_ms);
        let channel = ReplayChannel::open(path, delay)?;
        info!(path = %path.display(), frames = channel.remaining(), "replaying scan frames");
        return Ok(AnyChannel::Replay(channel));
    }

    let endpoint = client.endpoint();
    info!(scan_id = %client.scan_id(), endpoint = %endpoint, "connecting to scan stream");
    let channel = WsChannel::connect(endpoint, config.connection.connect_timeout())
        .await
        .map_err(|err| {
            error!(error = %err, "scan stream unavailable");
            err
        })?;
    Ok(AnyChannel::Ws(channel))
}

fn report_end(end: SessionEnd) -> Result<()> {
    if end.is_success() {
        info!(end = end.label(), "done");
        Ok(())
    } else {
        Err(anyhow!("scan stream {}", end.label()))
    }
}
