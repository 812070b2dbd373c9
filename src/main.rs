//! `tailplot [--live] [--config FILE] PATH...`
//!
//! Plots delimited text files. With `--live` the files are re-polled and
//! appended rows stream into the plots.

use std::path::PathBuf;

use tailplot::config::TailPlotConfig;
use tailplot::logging;
use tracing::{error, warn};

fn usage() -> ! {
    eprintln!("usage: tailplot [--live] [--config FILE] PATH...");
    std::process::exit(2);
}

fn main() -> eframe::Result<()> {
    logging::init_tracing();

    let mut live = false;
    let mut config_path: Option<PathBuf> = None;
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--live" => live = true,
            "--config" => match args.next() {
                Some(p) => config_path = Some(PathBuf::from(p)),
                None => usage(),
            },
            "-h" | "--help" => usage(),
            _ => paths.push(PathBuf::from(arg)),
        }
    }

    let loaded = match &config_path {
        Some(p) => TailPlotConfig::load(p),
        None => TailPlotConfig::load_from_default_path(),
    };
    let mut cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) if config_path.is_some() => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
        Err(e) => {
            warn!(error = %e, "no usable default config, using defaults");
            TailPlotConfig::default()
        }
    };
    if live {
        cfg.live = true;
    }

    tailplot::run_tailplot(paths, cfg)
}
