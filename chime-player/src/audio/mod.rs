//! The playable audio resource boundary.
//!
//! The engine owns exactly one [`AudioSink`] and is the only component that
//! touches it; everyone else observes playback through events. The trait
//! keeps the decode/output machinery swappable: production uses the
//! rodio-backed [`output::RodioSink`], tests use a scripted fake.

pub mod output;

#[cfg(test)]
pub mod testing;

use std::time::Duration;

use tokio::sync::mpsc;

use chime_common::music::{Game, KkPerformance, Weather};

use crate::playback::towntune::PerformedTune;
use crate::Result;

/// What the sink should play next.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSource {
    /// An hourly ambient track. `song` is the track's file stem, normally
    /// the formatted hour ("3pm"), or a calendar event name.
    Hourly {
        game: Game,
        weather: Weather,
        song: String,
    },

    /// A special-program track, one concrete recording version. `song` is
    /// the catalog identifier (`"<source> - <title>"`).
    Special {
        version: KkPerformance,
        song: String,
    },

    /// The synthesized interstitial jingle, pitches already resolved.
    TownTune { tune: PerformedTune },
}

/// Asynchronous signals from the sink back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// The loaded source began producing audio.
    Started,
    /// The source played to its natural end (never fires while native
    /// looping is enabled).
    Ended,
    /// Loading or playback failed; the sink is idle.
    Error(String),
}

/// Sender half for sink signals; handed to the sink at construction.
pub type SinkEventSender = mpsc::UnboundedSender<SinkEvent>;

/// The one playable audio resource.
///
/// Mutating methods are synchronous; completion signals arrive on the
/// [`SinkEvent`] channel. Offsets are measured from the start of the
/// currently loaded source.
pub trait AudioSink: Send {
    /// Replaces the current source. Stops any previous source; playback
    /// starts on the next [`play`](AudioSink::play).
    fn load(&mut self, source: &TrackSource) -> Result<()>;

    /// Starts or resumes playback of the loaded source.
    fn play(&mut self) -> Result<()>;

    /// Pauses playback, preserving the current offset.
    fn pause(&mut self);

    /// True when no audio is being produced (paused or nothing loaded).
    fn is_paused(&self) -> bool;

    /// Seeks the current source to `position`.
    fn seek(&mut self, position: Duration);

    /// Current playback offset within the source.
    fn position(&self) -> Duration;

    /// Sets the effective output volume in `[0, 1]`.
    fn set_volume(&mut self, volume: f32);

    /// Current effective output volume.
    fn volume(&self) -> f32;

    /// Enables or disables native end-of-track looping for sources loaded
    /// afterwards.
    fn set_looping(&mut self, looping: bool);
}
