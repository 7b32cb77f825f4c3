//! rodio-backed implementation of the playable audio resource.
//!
//! Tracks live as `.ogg` files under the media root, laid out
//! `<game>/<weather>/<song>.ogg` for hourly tracks and
//! `kk/<version>/<song>.ogg` for the special program. The interstitial is
//! synthesized from sine segments instead of decoded from disk.
//!
//! rodio has no completion callback, so a watcher task polls the sink and
//! reports the natural end; a generation counter keeps watchers of
//! superseded sources from signalling into the current one.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rodio::source::{SineWave, Source, Zero};
use rodio::{Decoder, OutputStreamHandle, Sink};
use tracing::{debug, warn};

use crate::audio::{AudioSink, SinkEvent, SinkEventSender, TrackSource};
use crate::error::Error;
use crate::playback::towntune::PerformedTune;
use crate::Result;

/// Amplitude of the synthesized interstitial tones.
const TONE_AMPLITUDE: f32 = 0.35;

/// How often the end-watcher polls the sink.
const ENDED_POLL: Duration = Duration::from_millis(250);

pub struct RodioSink {
    handle: OutputStreamHandle,
    media_root: PathBuf,
    events: SinkEventSender,
    sink: Option<Arc<Sink>>,
    volume: f32,
    looping: bool,
    generation: Arc<AtomicU64>,
    watcher_generation: u64,
}

impl RodioSink {
    pub fn new(handle: OutputStreamHandle, media_root: PathBuf, events: SinkEventSender) -> Self {
        Self {
            handle,
            media_root,
            events,
            sink: None,
            volume: 1.0,
            looping: false,
            generation: Arc::new(AtomicU64::new(0)),
            watcher_generation: 0,
        }
    }

    fn append_file(&self, sink: &Sink, path: &Path) -> Result<()> {
        let file = File::open(path)
            .map_err(|e| Error::TrackLoad(format!("{}: {}", path.display(), e)))?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| Error::TrackLoad(format!("{}: {}", path.display(), e)))?;
        if self.looping {
            sink.append(decoder.repeat_infinite());
        } else {
            sink.append(decoder);
        }
        Ok(())
    }

    fn append_tune(&self, sink: &Sink, tune: &PerformedTune) {
        for segment in &tune.segments {
            match segment.frequency {
                Some(frequency) => sink.append(
                    SineWave::new(frequency)
                        .take_duration(segment.duration)
                        .amplify(TONE_AMPLITUDE),
                ),
                None => sink.append(Zero::<f32>::new(1, 44100).take_duration(segment.duration)),
            }
        }
        // Ring-out tail after the last step
        sink.append(Zero::<f32>::new(1, 44100).take_duration(tune.tail()));
    }

    /// Watches for the natural end of the loaded source. Exits silently if
    /// a newer source supersedes this one.
    fn watch_for_end(&mut self, sink: Arc<Sink>) {
        let current = self.generation.load(Ordering::SeqCst);
        if self.watcher_generation == current {
            return; // already watching this source
        }
        self.watcher_generation = current;

        let events = self.events.clone();
        let generation = Arc::clone(&self.generation);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(ENDED_POLL).await;
                if generation.load(Ordering::SeqCst) != current {
                    return;
                }
                if sink.is_paused() {
                    continue;
                }
                if sink.empty() {
                    let _ = events.send(SinkEvent::Ended);
                    return;
                }
            }
        });
    }
}

impl AudioSink for RodioSink {
    fn load(&mut self, source: &TrackSource) -> Result<()> {
        // Invalidate any watcher of the previous source
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(old) = self.sink.take() {
            old.stop();
        }

        let sink =
            Sink::try_new(&self.handle).map_err(|e| Error::AudioOutput(e.to_string()))?;
        sink.pause();
        sink.set_volume(self.volume);

        match source {
            TrackSource::TownTune { tune } => self.append_tune(&sink, tune),
            other => {
                // track_path is total for non-tune sources
                if let Some(path) = track_path(&self.media_root, other) {
                    debug!(path = %path.display(), "loading track");
                    self.append_file(&sink, &path)?;
                }
            }
        }

        self.sink = Some(Arc::new(sink));
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let Some(sink) = self.sink.clone() else {
            return Ok(());
        };
        sink.play();
        if !self.looping {
            self.watch_for_end(Arc::clone(&sink));
        }
        let _ = self.events.send(SinkEvent::Started);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn is_paused(&self) -> bool {
        match &self.sink {
            Some(sink) => sink.is_paused() || sink.empty(),
            None => true,
        }
    }

    fn seek(&mut self, position: Duration) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.try_seek(position) {
                warn!("seek to {:?} failed: {}", position, e);
            }
        }
    }

    fn position(&self) -> Duration {
        self.sink
            .as_ref()
            .map(|sink| sink.get_pos())
            .unwrap_or_default()
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }
}

/// Media path for a decodable source; `None` for the synthesized
/// interstitial.
fn track_path(media_root: &Path, source: &TrackSource) -> Option<PathBuf> {
    match source {
        TrackSource::Hourly {
            game,
            weather,
            song,
        } => Some(
            media_root
                .join(game.to_string())
                .join(weather.to_string())
                .join(format!("{}.ogg", song)),
        ),
        TrackSource::Special { version, song } => Some(
            media_root
                .join("kk")
                .join(version.to_string())
                .join(format!("{}.ogg", song)),
        ),
        TrackSource::TownTune { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_common::music::{Game, KkPerformance, Weather};

    #[test]
    fn test_track_paths() {
        let root = PathBuf::from("/media");

        let hourly = TrackSource::Hourly {
            game: Game::NewHorizons,
            weather: Weather::Raining,
            song: "3pm".to_string(),
        };
        assert_eq!(
            track_path(&root, &hourly),
            Some(PathBuf::from("/media/new-horizons/raining/3pm.ogg"))
        );

        let special = TrackSource::Special {
            version: KkPerformance::Aircheck,
            song: "CF - Stale Cupcakes".to_string(),
        };
        assert_eq!(
            track_path(&root, &special),
            Some(PathBuf::from("/media/kk/aircheck/CF - Stale Cupcakes.ogg"))
        );

        let tune = TrackSource::TownTune {
            tune: crate::playback::towntune::TownTune::default()
                .perform(66.0, &mut rand::rngs::mock::StepRng::new(0, 1)),
        };
        assert_eq!(track_path(&root, &tune), None);
    }
}
