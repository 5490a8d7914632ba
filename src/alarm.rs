//! Fire-and-forget alarm playback.
//!
//! Every trigger gets its own detached thread. Nothing waits for playback,
//! nothing cancels it, and a second trigger while the first sound is still
//! playing simply overlaps it. Threads are not joined at shutdown, so a
//! sound in flight when the process exits is cut off.

use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, warn};

#[cfg(feature = "audio")]
use crate::error::Error;
use crate::error::Result;

/// Starts playback of an audio file without blocking the caller.
pub trait AlarmPlayer {
    fn play(&self, sound: &Path);
}

/// Plays each request on a new detached thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadedPlayer;

impl ThreadedPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl AlarmPlayer for ThreadedPlayer {
    fn play(&self, sound: &Path) {
        let sound: PathBuf = sound.to_path_buf();
        let spawned = thread::Builder::new()
            .name("alarm-playback".into())
            .spawn(move || {
                debug!(sound = %sound.display(), "alarm playback started");
                match play_to_end(&sound) {
                    Ok(()) => debug!(sound = %sound.display(), "alarm playback finished"),
                    Err(e) => warn!(sound = %sound.display(), error = %e, "alarm playback failed"),
                }
            });

        // Dropping the handle detaches the thread
        if let Err(e) = spawned {
            warn!(error = %e, "could not spawn alarm playback thread");
        }
    }
}

/// Discards every request. Used when no alarm sounds are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlayer;

impl AlarmPlayer for NullPlayer {
    fn play(&self, sound: &Path) {
        debug!(sound = %sound.display(), "playback disabled");
    }
}

#[cfg(feature = "audio")]
fn play_to_end(sound: &Path) -> Result<()> {
    use std::fs::File;
    use std::io::BufReader;

    let source = rodio::Decoder::new(BufReader::new(File::open(sound)?))
        .map_err(|e| Error::Alarm(format!("cannot decode {}: {e}", sound.display())))?;
    let (_stream, handle) =
        rodio::OutputStream::try_default().map_err(|e| Error::Alarm(e.to_string()))?;
    let sink = rodio::Sink::try_new(&handle).map_err(|e| Error::Alarm(e.to_string()))?;

    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

#[cfg(not(feature = "audio"))]
fn play_to_end(sound: &Path) -> Result<()> {
    debug!(sound = %sound.display(), "built without the `audio` feature, alarm is silent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[cfg(feature = "audio")]
    #[test]
    fn missing_file_is_reported_before_opening_a_device() {
        let err = play_to_end(Path::new("/nonexistent/alarm.wav")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[cfg(feature = "audio")]
    #[test]
    fn undecodable_file_is_an_alarm_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarm.wav");
        std::fs::write(&path, b"not audio at all").unwrap();

        let err = play_to_end(&path).unwrap_err();
        assert!(matches!(err, Error::Alarm(_)));
    }

    #[cfg(not(feature = "audio"))]
    #[test]
    fn silent_build_never_fails() {
        assert!(play_to_end(Path::new("/nonexistent/alarm.wav")).is_ok());
    }

    #[test]
    fn play_returns_immediately() {
        let player = ThreadedPlayer::new();
        let start = Instant::now();
        for _ in 0..3 {
            player.play(Path::new("/nonexistent/alarm.wav"));
        }
        NullPlayer.play(Path::new("/nonexistent/alarm.wav"));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
