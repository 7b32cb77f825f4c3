//! Configuration snapshot and the shared context object.
//!
//! A [`Settings`] value is an immutable-per-cycle snapshot of everything the
//! user can configure. It is loaded wholesale (TOML file, every field
//! optional with the stock default) and replaced wholesale whenever the
//! backing store changes; components never see a half-updated snapshot.
//!
//! [`SharedSettings`] is the context object handed to each component at
//! construction. The Coordinator is its sole writer.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::music::{Game, KkVersion, TabAudioPolicy, Weather};

/// Game selection: a specific game, or a fresh uniform draw each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GameChoice {
    Game(Game),
    Random,
}

impl TryFrom<String> for GameChoice {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value == "game-random" {
            return Ok(GameChoice::Random);
        }
        serde_json::from_value(serde_json::Value::String(value.clone()))
            .map(GameChoice::Game)
            .map_err(|_| format!("unknown game choice: {}", value))
    }
}

impl From<GameChoice> for String {
    fn from(choice: GameChoice) -> Self {
        match choice {
            GameChoice::Game(game) => game.to_string(),
            GameChoice::Random => "game-random".to_string(),
        }
    }
}

/// Weather selection: a fixed variant, a fresh uniform draw, or the live
/// feed from the weather poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WeatherChoice {
    Weather(Weather),
    Random,
    Live,
}

impl TryFrom<String> for WeatherChoice {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "weather-random" => return Ok(WeatherChoice::Random),
            "live" => return Ok(WeatherChoice::Live),
            _ => {}
        }
        serde_json::from_value(serde_json::Value::String(value.clone()))
            .map(WeatherChoice::Weather)
            .map_err(|_| format!("unknown weather choice: {}", value))
    }
}

impl From<WeatherChoice> for String {
    fn from(choice: WeatherChoice) -> Self {
        match choice {
            WeatherChoice::Weather(weather) => weather.to_string(),
            WeatherChoice::Random => "weather-random".to_string(),
            WeatherChoice::Live => "live".to_string(),
        }
    }
}

/// User configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master volume, nominal, in `[0, 1]`.
    pub volume: f32,

    /// Which game's soundtrack to play.
    pub game: GameChoice,

    /// Which weather variant to play.
    pub weather: WeatherChoice,

    /// Play the special program during its weekly window.
    pub enable_kk: bool,

    /// Play the special program at all times, window or not.
    pub always_kk: bool,

    /// Recording version of the special program.
    pub kk_version: KkVersion,

    /// Restrict special-track selection to `kk_selected_songs`.
    pub kk_selected_songs_enable: bool,

    /// User-curated subset of the special-track catalog.
    pub kk_selected_songs: Vec<String>,

    /// Master pause flag: while set, nothing plays and only `pause` and
    /// `volume` events pass through.
    pub paused: bool,

    /// Play the interstitial jingle at true hour boundaries.
    pub enable_town_tune: bool,

    /// Interstitial volume, nominal, in `[0, 1]`.
    pub town_tune_volume: f32,

    /// Substitute the calendar-event track name when an event is ongoing.
    pub enable_event_music: bool,

    /// Postal code for the weather endpoint (primary location key).
    pub zip_code: String,

    /// Country code for the weather endpoint (secondary location key).
    pub country_code: String,

    /// What to do while another source on the host is audible.
    pub tab_audio: TabAudioPolicy,

    /// Volume reduction under the `reduce` policy, in percent.
    pub tab_audio_reduce_percent: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: 0.5,
            game: GameChoice::Game(Game::NewHorizons),
            weather: WeatherChoice::Weather(Weather::Sunny),
            enable_kk: true,
            always_kk: false,
            kk_version: KkVersion::Live,
            kk_selected_songs_enable: false,
            kk_selected_songs: Vec::new(),
            paused: false,
            enable_town_tune: true,
            town_tune_volume: 0.75,
            enable_event_music: false,
            zip_code: "98052".to_string(),
            country_code: "us".to_string(),
            tab_audio: TabAudioPolicy::Pause,
            tab_audio_reduce_percent: 80,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file. Missing fields take their defaults;
    /// a missing file is not an error and yields the full default snapshot.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Settings(format!("{}: {}", path.display(), e)))
    }
}

/// Shared, replace-wholesale settings snapshot.
///
/// Cheap to clone; all clones observe the same snapshot.
#[derive(Clone)]
pub struct SharedSettings {
    inner: Arc<RwLock<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Current snapshot, by value.
    pub async fn snapshot(&self) -> Settings {
        self.inner.read().await.clone()
    }

    /// Replaces the snapshot wholesale, returning the superseded one so the
    /// caller can diff.
    pub async fn replace(&self, settings: Settings) -> Settings {
        let mut guard = self.inner.write().await;
        std::mem::replace(&mut *guard, settings)
    }
}
