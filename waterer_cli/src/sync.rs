//! Startup exchange with the remote data folder.
//!
//! Downloads the pump calibration and the plant dataset, then uploads the
//! watering log. Every step is best-effort: failures are announced and the
//! run continues with whatever is on disk.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use tracing::{info, warn};
use waterer_config::Config;
use waterer_traits::{Announcer, Cue};

/// A place data files are fetched from and pushed to, by name.
pub trait RemoteStore {
    fn download(&self, name: &Path, dest: &Path) -> Result<()>;
    fn upload(&self, src: &Path, name: &Path) -> Result<()>;
}

/// Remote folder mirrored into a local directory (e.g. a synced mount).
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RemoteStore for DirectoryStore {
    fn download(&self, name: &Path, dest: &Path) -> Result<()> {
        let src = self.root.join(name);
        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir).wrap_err_with(|| format!("create {dir:?}"))?;
        }
        fs::copy(&src, dest).wrap_err_with(|| format!("download {src:?}"))?;
        Ok(())
    }

    fn upload(&self, src: &Path, name: &Path) -> Result<()> {
        let dest = self.root.join(name);
        fs::copy(src, &dest).wrap_err_with(|| format!("upload {src:?} to {dest:?}"))?;
        Ok(())
    }
}

/// Which sync steps succeeded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub pump_data: bool,
    pub dataset: bool,
    pub log_uploaded: bool,
}

fn file_name(p: &Path) -> &Path {
    p.file_name().map_or(p, Path::new)
}

pub fn startup_sync(
    cfg: &Config,
    store: &dyn RemoteStore,
    announcer: &dyn Announcer,
) -> SyncReport {
    let mut report = SyncReport::default();

    match store.download(file_name(&cfg.paths.pump_data), &cfg.paths.pump_data_path()) {
        Ok(()) => report.pump_data = true,
        Err(e) => {
            warn!(error = %e, "pump data download failed");
            announcer.play(Cue::CalibrationDownloadFailed);
        }
    }

    match store.download(file_name(&cfg.paths.plants), &cfg.paths.plants_path()) {
        Ok(()) => {
            report.dataset = true;
            announcer.play(Cue::DatasetDownloaded);
        }
        Err(e) => {
            warn!(error = %e, "plant dataset download failed");
            announcer.play(Cue::DatasetDownloadFailed);
        }
    }

    let log = cfg.paths.watering_log_path();
    match store.upload(&log, file_name(&cfg.paths.watering_log)) {
        Ok(()) => {
            report.log_uploaded = true;
            announcer.play(Cue::LogUploaded);
        }
        Err(e) => {
            warn!(error = %e, "watering log upload failed");
            announcer.play(Cue::LogUploadFailed);
        }
    }

    info!(?report, "startup sync finished");
    report
}

/// Sync against `[sync].remote_dir`, or skip when it is not configured.
pub fn sync_if_configured(cfg: &Config, announcer: &dyn Announcer) -> Option<SyncReport> {
    let Some(dir) = cfg.sync.remote_dir.as_ref() else {
        info!("no remote folder configured, skipping sync");
        return None;
    };
    if cfg.sync.token.is_none() {
        warn!("sync token missing; run `waterer setup --token ...`");
    }
    let store = DirectoryStore::new(cfg.paths.resolve(dir));
    Some(startup_sync(cfg, &store, announcer))
}
