//! Tracing setup: console layer plus an optional rotating file layer.

use std::path::Path;
use std::str::FromStr;

use eyre::{Result, WrapErr, eyre};
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};
use waterer_config::Logging;

use crate::cli::FILE_GUARD;

/// `--log-level` wins over `[logging].level`; `RUST_LOG` wins over both.
pub fn effective_level(flag: Option<&str>, cfg: &Logging) -> Result<LevelFilter> {
    let raw = flag.or(cfg.level.as_deref()).unwrap_or("info");
    LevelFilter::from_str(raw).map_err(|_| eyre!("invalid log level {raw:?}"))
}

fn file_appender(path: &Path, rotation: Option<&str>) -> Result<rolling::RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre!("log file path {path:?} has no file name"))?;
    std::fs::create_dir_all(dir).wrap_err_with(|| format!("create log directory {dir:?}"))?;
    Ok(match rotation.unwrap_or("never") {
        "daily" => rolling::daily(dir, name),
        "hourly" => rolling::hourly(dir, name),
        _ => rolling::never(dir, name),
    })
}

pub fn init(level: LevelFilter, json: bool, cfg: &Logging) -> Result<()> {
    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match cfg.file.as_deref() {
        Some(path) => {
            let appender = file_appender(Path::new(path), cfg.rotation.as_deref())?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre!("install tracing subscriber: {e}"))?;

    if let Some(path) = &cfg.file {
        info!(path = %path, "logging to file");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_config_level() {
        let cfg = Logging {
            level: Some("warn".into()),
            ..Logging::default()
        };
        assert_eq!(effective_level(Some("debug"), &cfg).unwrap(), LevelFilter::DEBUG);
        assert_eq!(effective_level(None, &cfg).unwrap(), LevelFilter::WARN);
        assert_eq!(
            effective_level(None, &Logging::default()).unwrap(),
            LevelFilter::INFO
        );
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(effective_level(Some("loud"), &Logging::default()).is_err());
    }
}
