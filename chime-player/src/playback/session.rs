//! Playback session state.
//!
//! A session is created on every transition decision and superseded, not
//! destroyed, by the next one. Timer state (the loop deadline, the fade
//! ramp) lives beside it in the engine and is cancelled before a new
//! session arms its own.

use chime_common::music::{Game, Weather};

use crate::playback::loops::LoopWindow;

/// The hourly track a transition is heading towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingHourly {
    pub hour: u32,
    pub weather: Weather,
    pub game: Game,
}

/// What the audio resource is currently dedicated to.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentTrack {
    /// An hourly ambient track. `started` flips once the resource has
    /// actually begun producing audio for this session.
    Hourly {
        game: Game,
        weather: Weather,
        hour: u32,
        window: Option<LoopWindow>,
        started: bool,
    },

    /// The interstitial jingle; `follow` is the hourly track that starts
    /// once the jingle completes.
    TownTune { follow: PendingHourly },

    /// The special program; each natural end triggers the next selection.
    Special,
}

/// What to do once a fade-out ramp reaches silence.
#[derive(Debug, Clone, PartialEq)]
pub enum AfterFade {
    /// Nothing; stay silent (user pause).
    Silence,

    /// Start an hourly track; `hour_change` keeps the interstitial
    /// eligibility decision at fade-completion time.
    Hourly {
        next: PendingHourly,
        hour_change: bool,
    },

    /// Select and play the next special track.
    NextSpecial,
}

/// An in-flight fade-out ramp. The sink's volume is lowered by `step`
/// every tick; on reaching silence the sink is paused, its volume restored
/// to `restore`, and `after` runs.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeOut {
    pub step: f32,
    pub restore: f32,
    pub after: AfterFade,
}
