//! `waterer setup`: persist the config with the sync token and render the
//! prompt sound files.

use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use tracing::info;
use waterer_config::Config;
use waterer_traits::Cue;

use crate::audio::synthesize;

pub fn write_config(cfg: &mut Config, token: &str, path: &Path) -> Result<()> {
    cfg.sync.token = Some(token.to_string());
    cfg.validate()?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).wrap_err_with(|| format!("create {dir:?}"))?;
    }
    fs::write(path, cfg.to_toml_string()?).wrap_err_with(|| format!("write {path:?}"))?;
    info!(path = %path.display(), "config written");
    Ok(())
}

/// Render every cue into the sounds directory. Returns how many were written.
pub fn render_sounds(cfg: &Config) -> Result<usize> {
    let dir = cfg.paths.sounds_path();
    fs::create_dir_all(&dir).wrap_err_with(|| format!("create {dir:?}"))?;
    for cue in Cue::ALL {
        let out = dir.join(cue.file_name());
        synthesize(&cfg.audio, cue.text(), &out)
            .wrap_err_with(|| format!("render {:?}", cue.file_name()))?;
        info!(?cue, file = %out.display(), "sound rendered");
    }
    Ok(Cue::ALL.len())
}
