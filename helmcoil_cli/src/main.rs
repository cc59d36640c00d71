#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `helmcoil` command-line entry point.

mod cli;
mod commands;
mod error_fmt;
mod logging;
mod startup;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, DEFAULT_CONFIG, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn load_config(path: &Path) -> eyre::Result<helmcoil_config::Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        return Ok(helmcoil_config::Config::default());
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = helmcoil_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))?;
    cfg.validate()
        .map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    Ok(cfg)
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;
    let cfg = load_config(&cli.config)?;

    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    logging::init_tracing(cli.json, level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), backend = ?cfg.instruments.backend, "config loaded");

    let abort = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&abort);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "Ctrl-C handler not installed; sweeps cannot be interrupted");
    }

    commands::run(&cli.cmd, &cfg, cli.json, abort)
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}
