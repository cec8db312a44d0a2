//! CLI definition and session start-up.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::binance_adapter::BinanceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_store_adapter::FileStore;
use crate::adapters::text_canvas::TextCanvas;
use crate::adapters::tui;
use crate::app::AppContext;
use crate::domain::chart::ChartRenderer;
use crate::domain::config::AppConfig;
use crate::domain::error::SpotsimError;
use crate::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "spotsim", version, about = "Terminal spot trading simulator")]
pub struct Cli {
    /// INI file with session settings; built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory holding data.json and the candle files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the configuration and print the effective settings
    CheckConfig,
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match resolve_config(cli.config.as_ref(), cli.data_dir) {
        Ok(config) => config,
        Err(code) => return code,
    };
    match cli.command {
        Some(Command::CheckConfig) => run_check_config(&config),
        None => run_session(config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SpotsimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Read and validate the settings, then apply command-line overrides.
pub fn resolve_config(
    path: Option<&PathBuf>,
    data_dir: Option<PathBuf>,
) -> Result<AppConfig, ExitCode> {
    let adapter = match path {
        Some(path) => load_config(path)?,
        None => FileConfigAdapter::empty(),
    };
    let mut config = AppConfig::from_port(&adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

fn run_check_config(config: &AppConfig) -> ExitCode {
    println!("Configuration OK");
    println!("  data dir:        {}", config.data_dir.display());
    println!("  log file:        {}", config.log_path().display());
    println!("  symbols:         {}", config.symbols.join(", "));
    println!("  quote balance:   {}", config.quote_balance);
    println!(
        "  chart:           {} candles of {}, rebuilt every {}s",
        config.chart.fullscreen_candles,
        config.chart.timeframe,
        config.chart.refresh_interval.as_secs()
    );
    println!(
        "  poller:          every {}s, {} attempts, backoff {}ms..{}ms",
        config.poller.pass_interval.as_secs(),
        config.poller.max_attempts,
        config.poller.backoff_base.as_millis(),
        config.poller.backoff_cap.as_millis()
    );
    println!("  gateway:         {}", config.gateway.base_url);
    ExitCode::SUCCESS
}

fn run_session(config: AppConfig) -> ExitCode {
    // The terminal belongs to the UI, so a logging failure is only a warning.
    if let Err(e) = init_logging(&config.log_path(), &config.logging.level) {
        eprintln!("warning: logging disabled: {e}");
    }
    tracing::info!(
        data_dir = %config.data_dir.display(),
        symbols = ?config.symbols,
        "starting session"
    );

    let gateway = match BinanceAdapter::new(&config.gateway) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = FileStore::new(config.data_dir.clone());
    let renderer = ChartRenderer::new(Box::new(TextCanvas::new()));
    let mut ctx = AppContext::new(config, gateway, Box::new(store), renderer);

    ctx.load();
    if let Err(e) = ctx.start_poller() {
        tracing::error!(error = %e, "failed to start price poller");
        ctx.board().set_status(format!("Error start poller: {e}"));
    }

    let result = tui::run(&mut ctx);
    ctx.persist();
    ctx.shutdown();

    match result {
        Ok(()) => {
            tracing::info!("session ended");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "session aborted");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
