//! Event types and the event bus for the chime workspace.
//!
//! # Architecture
//!
//! chime uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many event fan-out
//! - **Command channels** (tokio::mpsc): request → single handler
//! - **Shared state** (Arc<RwLock<T>>): read-heavy access
//!
//! Every externally visible transition travels as a [`ChimeEvent`], a closed
//! enum with one variant per event tag and a fixed payload shape per tag.
//! Subscribers each hold their own receiver and run in their own task, so a
//! failing subscriber can neither block nor kill its siblings; a publish from
//! inside a handler enqueues rather than nests.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::music::{Game, KkVersion, TabAudioPolicy, Weather};

/// Chime event types.
///
/// Broadcast via [`EventBus`]; serializable so external observers can be
/// bolted on without touching the payload contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChimeEvent {
    /// A new hourly track should play.
    ///
    /// Published on activation, on every true hour boundary outside the
    /// special-track window, and when leaving that window.
    ///
    /// `hour_change` distinguishes a wall-clock hour boundary (long fade,
    /// interstitial eligible) from a mid-hour activation.
    HourMusic {
        hour: u32,
        weather: Weather,
        game: Game,
        hour_change: bool,
    },

    /// The selected game changed mid-hour (settings edit). Same payload as
    /// an hourly change without the boundary semantics.
    GameChange { hour: u32, weather: Weather, game: Game },

    /// The effective weather changed mid-hour (live poll or settings edit).
    WeatherChange { hour: u32, weather: Weather, game: Game },

    /// The special-track window opened (or its configuration changed while
    /// open); playback switches to the special program.
    KkStart { version: KkVersion },

    /// A concrete special track was chosen and started. Consumed by the
    /// notification layer.
    KkMusic { title: String },

    /// Stop producing audio. `tab_audio_paused` is true when the pause was
    /// forced by a competing audible source rather than by the user.
    Pause { tab_audio_paused: bool },

    /// Playback resumed after a ducking pause; lets observers reconcile.
    Unpause,

    /// Competing host audio flipped (`audible` is `Some`), or the ducking
    /// policy changed while a source is audible (`audible` is `None`) and
    /// the engine must reconcile its ducked state with the new policy.
    TabAudio {
        audible: Option<bool>,
        policy: TabAudioPolicy,
        reduce_percent: u8,
    },

    /// Master volume changed. Level is the nominal volume in `[0, 1]`.
    Volume { level: f32 },

    /// The playable resource failed to load or play; the engine is idle.
    MusicFailed,
}

impl ChimeEvent {
    /// Stable tag name of this event, mostly for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            ChimeEvent::HourMusic { .. } => "hourMusic",
            ChimeEvent::GameChange { .. } => "gameChange",
            ChimeEvent::WeatherChange { .. } => "weatherChange",
            ChimeEvent::KkStart { .. } => "kkStart",
            ChimeEvent::KkMusic { .. } => "kkMusic",
            ChimeEvent::Pause { .. } => "pause",
            ChimeEvent::Unpause => "unpause",
            ChimeEvent::TabAudio { .. } => "tabAudio",
            ChimeEvent::Volume { .. } => "volume",
            ChimeEvent::MusicFailed => "musicFailed",
        }
    }
}

/// Event bus connecting all chime components.
///
/// Thin wrapper over `tokio::sync::broadcast`. Subscriptions live for the
/// process lifetime; there is no removal API.
pub struct EventBus {
    tx: broadcast::Sender<ChimeEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    ///
    /// Returns a receiver that sees every event emitted after subscription,
    /// in emission order.
    pub fn subscribe(&self) -> broadcast::Receiver<ChimeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if no subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ChimeEvent,
    ) -> Result<usize, broadcast::error::SendError<ChimeEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening.
    pub fn emit_lossy(&self, event: ChimeEvent) {
        let _ = self.tx.send(event);
    }

    /// Channel capacity this bus was built with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
