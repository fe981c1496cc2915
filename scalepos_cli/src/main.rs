//! `scalepos`: run the weighing station from a terminal.

mod cli;
mod commands;
mod display;
mod error_fmt;
mod peripherals;

use std::path::Path;

use clap::Parser;
use crossbeam_channel as xch;
use eyre::WrapErr;
use scalepos_config::{Config, Logging};
use scalepos_core::error::PosError;
use scalepos_core::{PricingEngine, Station};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::display::{ConsoleDisplay, JsonDisplay};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let mut cfg = load_config(cli.config.as_deref(), cli.pricing.as_deref())?;
    if let Commands::Run {
        endpoint: Some(url),
        ..
    } = &cli.cmd
    {
        cfg.classifier.endpoint = url.clone();
    }
    cfg.validate()
        .map_err(|e| PosError::Config(e.to_string()))?;

    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    match cli.cmd {
        Commands::SelfCheck => {
            let _hw = peripherals::build(&cfg, false)?;
            let pricing = PricingEngine::from(&cfg);
            tracing::info!(table = ?pricing.table(), "pricing loaded");
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "status": "ok", "priced_labels": cfg.pricing.len() })
                );
            } else {
                println!("ok");
            }
            Ok(())
        }
        Commands::Price { label, grams } => {
            if !grams.is_finite() || grams < 0.0 {
                eyre::bail!("--grams must be a finite weight >= 0, got {grams}");
            }
            let pricing = PricingEngine::from(&cfg);
            let price = pricing.price(&label, grams);
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "label": label, "grams": grams, "price": price, "currency": cfg.checkout.currency })
                );
            } else {
                println!("{price:.2} {}", cfg.checkout.currency);
            }
            Ok(())
        }
        Commands::Run {
            max_ticks,
            endpoint,
        } => run(&cfg, cli.json, max_ticks, endpoint.is_some()),
    }
}

fn run(cfg: &Config, json: bool, max_ticks: Option<u64>, explicit_endpoint: bool) -> eyre::Result<()> {
    let hw = peripherals::build(cfg, explicit_endpoint)?;

    let (tx, rx) = xch::unbounded();
    commands::spawn_stdin_reader(tx.clone());
    commands::install_ctrlc(tx);

    let builder = Station::builder()
        .with_config(cfg)
        .with_sensor(hw.sensor)
        .with_imager(hw.imager)
        .with_classifier(hw.classifier)
        .with_commands(rx)
        .with_settle_timeout(std::time::Duration::from_millis(
            cfg.classifier.timeout_ms.saturating_add(5_000),
        ));
    let builder = if json {
        builder.with_sink(JsonDisplay::new(std::io::stdout()))
    } else {
        builder.with_sink(ConsoleDisplay::new(std::io::stdout()))
    };
    let mut station = builder.try_build().wrap_err("assemble station")?;

    if !json {
        println!("Ready. Commands: d=delete last, c=clear, x=checkout, r=rescan, q=quit");
    }
    let summary = station.run(max_ticks);
    let totals = station.ledger().totals();
    tracing::info!(ticks = summary.ticks, items = summary.items, "station stopped");

    if json {
        println!(
            "{}",
            serde_json::json!({
                "event": "summary",
                "ticks": summary.ticks,
                "items": totals.item_count,
                "total_weight_g": totals.total_weight_grams(),
                "total_price": totals.total_price(),
                "settled": summary.settled,
            })
        );
    } else {
        println!(
            "Stopped after {} ticks: {} items, {:.2} g, {:.2} {}",
            summary.ticks,
            totals.item_count,
            totals.total_weight_grams(),
            totals.total_price(),
            cfg.checkout.currency
        );
    }
    Ok(())
}

fn load_config(path: Option<&Path>, pricing_csv: Option<&Path>) -> eyre::Result<Config> {
    let mut cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| PosError::Config(format!("read {}: {e}", p.display())))?;
            scalepos_config::load_toml(&text)
                .map_err(|e| PosError::Config(format!("parse {}: {e}", p.display())))?
        }
        None => Config::default(),
    };
    if let Some(csv) = pricing_csv {
        let rows = scalepos_config::load_pricing_csv(csv)
            .map_err(|e| PosError::Config(e.to_string()))?;
        cfg.merge_pricing(rows);
    }
    Ok(cfg)
}

/// Console logs go to stderr so stdout carries only the display.
fn init_tracing(json: bool, level: &str, logging: &Logging) -> eyre::Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = &logging.file {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| PosError::Config(format!("logging.file {file:?} has no file name")))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::new(logging.level.as_deref().unwrap_or("info"));
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}
