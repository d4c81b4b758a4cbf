#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod audio;
mod cli;
mod error_fmt;
mod logging;
mod probe;
mod run;
mod setup;
mod sync;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use serde_json::json;
use tracing::{info, warn};
use waterer_config::{Config, load_config, load_plants, load_pump_data};
use waterer_core::WaterError;

use crate::cli::{Cli, Commands, JSON_MODE, json_mode};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if json_mode() {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    color_eyre::install()?;

    // Setup may run before any config exists.
    let cfg = match &cli.cmd {
        Commands::Setup { .. } if !cli.config.exists() => Config::default(),
        _ => load_config(&cli.config)?,
    };

    let level = logging::effective_level(cli.log_level.as_deref(), &cfg.logging)?;
    logging::init(level, cli.json, &cfg.logging)?;
    info!(config = %cli.config.display(), "configuration loaded");

    match cli.cmd {
        Commands::Run { max_scans, no_sync } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::Relaxed);
            })
            .wrap_err("install Ctrl-C handler")?;

            let summary = run::run(&cfg, max_scans, no_sync, shutdown)?;
            if cli.json {
                println!(
                    "{}",
                    json!({ "decisions": summary.decisions, "watered": summary.watered })
                );
            } else {
                println!(
                    "{} scan(s), {} watered",
                    summary.decisions, summary.watered
                );
            }
        }
        Commands::Setup { token, no_sounds } => {
            let mut cfg = cfg;
            setup::write_config(&mut cfg, &token, &cli.config)?;
            println!("wrote {}", cli.config.display());
            if no_sounds {
                info!("sound rendering skipped");
            } else {
                let n = setup::render_sounds(&cfg)?;
                println!("rendered {n} sound files into {}", cfg.paths.sounds_path().display());
            }
        }
        Commands::ProbePump { address } => {
            for reply in probe::run(&cfg, address)? {
                println!("{}", reply.describe());
            }
        }
        Commands::CheckConfig => check_config(&cfg, &cli.config)?,
    }
    Ok(())
}

fn check_config(cfg: &Config, path: &Path) -> Result<()> {
    println!("config ok: {}", path.display());
    let devices = run::device_paths(cfg);
    println!(
        "devices: barcode={} pump={} scale={}",
        devices.barcode.display(),
        devices.pump.display(),
        devices.scale.display()
    );

    let plants_path = cfg.paths.plants_path();
    let (plants, dialect) = load_plants(&plants_path)
        .map_err(|e| WaterError::DatasetLoad(format!("{e:#}")))
        .wrap_err_with(|| format!("plant dataset {}", plants_path.display()))?;
    println!("plants: {} ({dialect:?})", plants.len());

    let pump_data_path = cfg.paths.pump_data_path();
    if pump_data_path.exists() {
        let data = load_pump_data(&pump_data_path)
            .map_err(|e| WaterError::InvalidCalibration(format!("{e:#}")))?;
        println!(
            "pump data: motor speed {}, {} g per revolution",
            data.motor_speed, data.water_per_1_revolution
        );
    } else {
        warn!(path = %pump_data_path.display(), "no pump data file, using [calibration]");
        println!(
            "pump data: none, using motor speed {}, {} g per revolution",
            cfg.calibration.motor_speed, cfg.calibration.water_per_1_revolution
        );
    }
    Ok(())
}
