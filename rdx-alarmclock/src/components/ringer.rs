//! Audible playback for a ringing alarm.
//!
//! A [`Ringer`] plays the configured clip when the crate is built with the
//! `audio` feature and the clip exists. Otherwise it falls back to a bell
//! repeated at a fixed interval. Either way it rings until dropped or stopped.

use crate::error::ResourceMissing;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The action repeated by the bell fallback.
pub type BellAction = Arc<dyn Fn() + Send + Sync>;

/// Writes the ASCII bell to stdout.
pub fn terminal_bell() -> BellAction {
    Arc::new(|| {
        let mut stdout = std::io::stdout();
        stdout.write_all(b"\x07").ok();
        stdout.flush().ok();
    })
}

/// Checks that a sound clip exists on disk.
pub fn resolve_clip(path: &Path) -> Result<PathBuf, ResourceMissing> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(ResourceMissing {
            path: path.to_path_buf(),
        })
    }
}

enum Playback {
    Bell(JoinHandle<()>),
    #[cfg(feature = "audio")]
    Clip(std::sync::mpsc::Sender<()>),
}

/// An alarm that is currently making noise.
///
/// Must be created inside a Tokio runtime.
pub struct Ringer {
    playback: Option<Playback>,
}

impl Ringer {
    /// Starts ringing with the clip at `sound`, or the terminal bell.
    pub fn start(sound: Option<&Path>, beep_interval: Duration) -> Self {
        Self::start_with_bell(sound, beep_interval, terminal_bell())
    }

    /// Like [`Ringer::start`], with a custom bell action for the fallback.
    pub fn start_with_bell(sound: Option<&Path>, beep_interval: Duration, bell: BellAction) -> Self {
        match sound.map(resolve_clip) {
            Some(Ok(path)) => {
                #[cfg(feature = "audio")]
                match clip::play(&path) {
                    Ok(stop_tx) => {
                        return Self {
                            playback: Some(Playback::Clip(stop_tx)),
                        }
                    }
                    Err(reason) => warn!(
                        "Could not play {}: {}. Using the bell instead.",
                        path.display(),
                        reason
                    ),
                };
                #[cfg(not(feature = "audio"))]
                debug!(
                    "Built without the audio feature; ringing the bell instead of {}.",
                    path.display()
                );
            }
            Some(Err(missing)) => warn!("{}. Using the bell instead.", missing),
            None => debug!("No alarm sound configured; ringing the bell."),
        }
        Self::bell(beep_interval, bell)
    }

    fn bell(beep_interval: Duration, bell: BellAction) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(beep_interval);
            loop {
                interval.tick().await;
                bell();
            }
        });
        Self {
            playback: Some(Playback::Bell(handle)),
        }
    }

    /// `true` when the clip is playing rather than the bell.
    pub fn is_playing_clip(&self) -> bool {
        match &self.playback {
            #[cfg(feature = "audio")]
            Some(Playback::Clip(_)) => true,
            _ => false,
        }
    }

    /// Silences the alarm. Safe to call more than once.
    pub fn stop(&mut self) {
        match self.playback.take() {
            Some(Playback::Bell(handle)) => handle.abort(),
            #[cfg(feature = "audio")]
            Some(Playback::Clip(stop_tx)) => {
                stop_tx.send(()).ok();
            }
            None => {}
        }
    }
}

impl Drop for Ringer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Ringer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ringer")
            .field("active", &self.playback.is_some())
            .field("clip", &self.is_playing_clip())
            .finish()
    }
}

#[cfg(feature = "audio")]
mod clip {
    use rodio::{Decoder, OutputStream, Sink, Source};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;
    use std::sync::mpsc;

    /// Plays `path` on repeat on its own thread until the returned sender fires
    /// or is dropped. The output stream is not `Send`, so it lives on that thread.
    pub(super) fn play(path: &Path) -> Result<mpsc::Sender<()>, String> {
        let path = path.to_path_buf();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        std::thread::spawn(move || {
            let setup = || -> Result<(OutputStream, Sink), String> {
                let (stream, handle) = OutputStream::try_default().map_err(|e| e.to_string())?;
                let sink = Sink::try_new(&handle).map_err(|e| e.to_string())?;
                let file = File::open(&path).map_err(|e| e.to_string())?;
                let source = Decoder::new(BufReader::new(file)).map_err(|e| e.to_string())?;
                sink.append(source.repeat_infinite());
                Ok((stream, sink))
            };
            match setup() {
                Ok((_stream, sink)) => {
                    ready_tx.send(Ok(())).ok();
                    // Returns on an explicit stop and when the sender is dropped.
                    stop_rx.recv().ok();
                    sink.stop();
                }
                Err(reason) => {
                    ready_tx.send(Err(reason)).ok();
                }
            }
        });

        ready_rx
            .recv()
            .map_err(|_| "audio thread exited before starting".to_string())??;
        Ok(stop_tx)
    }
}
