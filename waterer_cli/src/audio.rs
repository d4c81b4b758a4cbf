//! Audible prompts through external programs (a sound player and a speech
//! synthesizer). Playback failures are logged and never stop the station.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use eyre::{Result, WrapErr, bail};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use waterer_config::Audio;
use waterer_traits::{Announcer, Cue};

/// Plays pre-rendered cue files and speaks free text via the synthesizer.
pub struct CommandAnnouncer {
    audio: Audio,
    sounds_dir: PathBuf,
}

impl CommandAnnouncer {
    pub fn new(audio: Audio, sounds_dir: PathBuf) -> Self {
        Self { audio, sounds_dir }
    }

    fn play_file(&self, file: &Path) -> Result<()> {
        let status = Command::new(&self.audio.player)
            .args(&self.audio.player_args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .wrap_err_with(|| format!("start {:?}", self.audio.player))?;
        if !status.success() {
            bail!("{:?} exited with {status}", self.audio.player);
        }
        Ok(())
    }

    /// Render into a private scratch file that is removed once played.
    fn speak(&self, text: &str) -> Result<()> {
        let wav = speech_file()?;
        synthesize(&self.audio, text, wav.path())?;
        self.play_file(wav.path())
    }
}

fn speech_file() -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix("waterer-speech-")
        .suffix(".wav")
        .tempfile()
        .wrap_err("create speech scratch file")
}

impl Announcer for CommandAnnouncer {
    fn play(&self, cue: Cue) {
        let file = self.sounds_dir.join(cue.file_name());
        debug!(?cue, file = %file.display(), "play cue");
        if let Err(e) = self.play_file(&file) {
            warn!(?cue, error = %e, "cue playback failed");
        }
    }

    fn say(&self, text: &str) {
        info!(text, "announce");
        if let Err(e) = self.speak(text) {
            warn!(error = %e, "speech failed");
        }
    }
}

/// Logs prompts instead of playing them (`[audio] enabled = false`).
#[derive(Debug, Default)]
pub struct SilentAnnouncer;

impl Announcer for SilentAnnouncer {
    fn play(&self, cue: Cue) {
        info!(?cue, "cue");
    }

    fn say(&self, text: &str) {
        info!(text, "announce");
    }
}

pub fn announcer_for(audio: &Audio, sounds_dir: PathBuf) -> Box<dyn Announcer> {
    if audio.enabled {
        Box::new(CommandAnnouncer::new(audio.clone(), sounds_dir))
    } else {
        Box::new(SilentAnnouncer)
    }
}

/// Render `text` to a wav file with the configured synthesizer voice.
pub fn synthesize(audio: &Audio, text: &str, out: &Path) -> Result<()> {
    let status = Command::new(&audio.synthesizer)
        .arg("-voice")
        .arg(&audio.voice)
        .arg("-t")
        .arg(text)
        .arg("-o")
        .arg(out)
        .stdin(Stdio::null())
        .status()
        .wrap_err_with(|| format!("start {:?}", audio.synthesizer))?;
    if !status.success() {
        bail!("{:?} exited with {status}", audio.synthesizer);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_player_is_not_fatal() {
        let audio = Audio {
            player: PathBuf::from("/nonexistent/player"),
            synthesizer: PathBuf::from("/nonexistent/flite"),
            ..Audio::default()
        };
        let scratch = tempfile::tempdir().unwrap();
        let announcer = CommandAnnouncer::new(audio.clone(), scratch.path().to_path_buf());
        announcer.play(Cue::Welcome);
        announcer.say("hello");
        assert!(synthesize(&audio, "hello", &scratch.path().join("x.wav")).is_err());
    }

    #[test]
    fn speech_files_are_private_and_removed() {
        let a = speech_file().unwrap();
        let b = speech_file().unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.path().extension().unwrap(), "wav");
        let path = a.path().to_path_buf();
        drop(a);
        assert!(!path.exists());
    }
}
