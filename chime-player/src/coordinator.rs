//! The coordinator: owns the configuration snapshot, folds time keeper
//! ticks, weather changes, audibility flips, and settings edits into
//! semantic events, and is the sole externally-driven writer to the bus.
//!
//! The "suppress everything but `pause` and `volume` while paused" rule
//! lives here, in [`Notifier`], at the publish call site; the bus itself
//! stays a generic primitive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};
use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info};

use chime_common::music::{Game, Weather, ALL_GAMES, ALL_WEATHERS};
use chime_common::settings::{GameChoice, WeatherChoice};
use chime_common::{ChimeEvent, EventBus, Settings, SharedSettings};

use crate::tabaudio::TabAudioHandle;
use crate::timekeeper::HourTick;
use crate::weather::WeatherHandle;

/// Publishing wrapper enforcing the paused-suppression rule.
///
/// While the paused flag is set, every event except `pause` and `volume`
/// is dropped at the call site.
#[derive(Clone)]
pub struct Notifier {
    bus: Arc<EventBus>,
    paused: Arc<AtomicBool>,
}

impl Notifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Publishes `event` unless suppressed by the paused flag.
    pub fn notify(&self, event: ChimeEvent) {
        let exempt = matches!(
            event,
            ChimeEvent::Pause { .. } | ChimeEvent::Volume { .. }
        );
        if self.paused.load(Ordering::SeqCst) && !exempt {
            debug!(tag = event.tag(), "suppressed while paused");
            return;
        }
        debug!(tag = event.tag(), "notify");
        self.bus.emit_lossy(event);
    }
}

/// True inside the weekly special-track window (Saturday from 8pm).
pub fn is_kk_window(day: Weekday, hour: u32) -> bool {
    day == Weekday::Sat && hour >= 20
}

/// Input channels feeding the coordinator.
pub struct CoordinatorInputs {
    pub hour_rx: mpsc::UnboundedReceiver<HourTick>,
    pub weather_rx: mpsc::UnboundedReceiver<()>,
    pub tab_rx: mpsc::UnboundedReceiver<bool>,
    pub settings_rx: mpsc::UnboundedReceiver<Settings>,
}

pub struct Coordinator {
    settings: SharedSettings,
    notifier: Notifier,
    weather: WeatherHandle,
    tab: TabAudioHandle,
    inputs: CoordinatorInputs,
    rng: StdRng,

    current_hour: u32,
    current_day: Weekday,
    kk_window: bool,
    startup: bool,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: SharedSettings,
        notifier: Notifier,
        weather: WeatherHandle,
        tab: TabAudioHandle,
        inputs: CoordinatorInputs,
        now: DateTime<Local>,
        rng: StdRng,
    ) -> Self {
        let current_hour = now.hour();
        let current_day = now.weekday();
        Self {
            settings,
            notifier,
            weather,
            tab,
            inputs,
            rng,
            current_hour,
            current_day,
            kk_window: is_kk_window(current_day, current_hour),
            startup: true,
        }
    }

    /// Activates and then processes inputs until every channel closes.
    pub async fn run(mut self) {
        self.activate().await;
        loop {
            tokio::select! {
                Some(tick) = self.inputs.hour_rx.recv() => self.on_hour(tick).await,
                Some(()) = self.inputs.weather_rx.recv() => self.on_weather_changed().await,
                Some(audible) = self.inputs.tab_rx.recv() => self.on_tab_audio(audible).await,
                Some(next) = self.inputs.settings_rx.recv() => self.on_settings(next).await,
                else => break,
            }
        }
    }

    /// Pushes the current configuration out as events: volume first, then
    /// either the special program or the hourly track for the current hour.
    async fn activate(&mut self) {
        let s = self.settings.snapshot().await;
        info!("activating");
        self.notifier.set_paused(s.paused);
        self.kk_window = is_kk_window(self.current_day, self.current_hour);

        self.notifier.notify(ChimeEvent::Volume { level: s.volume });

        if self.is_kk(&s) {
            self.notifier.notify(ChimeEvent::KkStart {
                version: s.kk_version,
            });
        } else if let Some((game, weather)) = self.derive(&s).await {
            self.notifier.notify(ChimeEvent::HourMusic {
                hour: self.current_hour,
                weather,
                game,
                hour_change: false,
            });
        }

        // Reconcile competing-audio state that may have flipped while we
        // were inactive
        self.tab.recheck();
    }

    fn is_kk(&self, s: &Settings) -> bool {
        s.always_kk || (s.enable_kk && self.kk_window)
    }

    /// Resolves the configured (game, weather) pair for this cycle.
    ///
    /// Returns `None` when live weather is selected but no sample has been
    /// observed yet. Raining is coerced to snowing for the original game,
    /// which has no rain variant.
    async fn derive(&mut self, s: &Settings) -> Option<(Game, Weather)> {
        let game = match s.game {
            GameChoice::Game(game) => game,
            GameChoice::Random => ALL_GAMES[self.rng.gen_range(0..ALL_GAMES.len())],
        };

        let weather = match s.weather {
            WeatherChoice::Weather(weather) => weather,
            WeatherChoice::Random => ALL_WEATHERS[self.rng.gen_range(0..ALL_WEATHERS.len())],
            WeatherChoice::Live => live_category(self.weather.current().await.as_deref()?),
        };

        let weather = if weather == Weather::Raining && game == Game::AnimalCrossing {
            Weather::Snowing
        } else {
            weather
        };

        Some((game, weather))
    }

    async fn on_hour(&mut self, tick: HourTick) {
        self.current_day = tick.day;
        self.current_hour = tick.hour;

        let s = self.settings.snapshot().await;
        let was_kk = self.is_kk(&s);
        self.kk_window = is_kk_window(tick.day, tick.hour);

        if self.is_kk(&s) && !was_kk {
            self.notifier.notify(ChimeEvent::KkStart {
                version: s.kk_version,
            });
        } else if !self.is_kk(&s) {
            if let Some((game, weather)) = self.derive(&s).await {
                self.notifier.notify(ChimeEvent::HourMusic {
                    hour: tick.hour,
                    weather,
                    game,
                    hour_change: true,
                });
            }
        }
    }

    async fn on_weather_changed(&mut self) {
        let s = self.settings.snapshot().await;
        if self.is_kk(&s) || s.weather != WeatherChoice::Live {
            return;
        }
        if let Some((game, weather)) = self.derive(&s).await {
            if self.startup {
                // First observation doubles as the activation that live
                // weather had to defer
                self.startup = false;
                self.notifier.notify(ChimeEvent::HourMusic {
                    hour: self.current_hour,
                    weather,
                    game,
                    hour_change: false,
                });
            } else {
                self.notifier.notify(ChimeEvent::WeatherChange {
                    hour: self.current_hour,
                    weather,
                    game,
                });
            }
        }
    }

    async fn on_tab_audio(&mut self, audible: bool) {
        let s = self.settings.snapshot().await;
        self.notifier.notify(ChimeEvent::TabAudio {
            audible: Some(audible),
            policy: s.tab_audio,
            reduce_percent: s.tab_audio_reduce_percent,
        });
    }

    /// Applies a wholesale settings replacement, translating the diff into
    /// events and component updates.
    async fn on_settings(&mut self, next: Settings) {
        let old = self.settings.replace(next.clone()).await;
        if old == next {
            return;
        }
        debug!("settings changed");

        let was_kk = self.is_kk(&old);
        let now_kk = self.is_kk(&next);
        self.notifier.set_paused(next.paused);

        if old.zip_code != next.zip_code {
            self.weather.set_postal(next.zip_code.clone());
        }
        if old.country_code != next.country_code {
            self.weather.set_region(next.country_code.clone());
        }
        if old.volume != next.volume {
            self.notifier.notify(ChimeEvent::Volume { level: next.volume });
        }

        if (old.game != next.game || old.weather != next.weather) && !now_kk {
            if let Some((game, weather)) = self.derive(&next).await {
                self.notifier.notify(ChimeEvent::GameChange {
                    hour: self.current_hour,
                    weather,
                    game,
                });
            }
        }

        let kk_selection_changed = old.kk_selected_songs_enable != next.kk_selected_songs_enable
            || old.kk_selected_songs != next.kk_selected_songs;
        if (now_kk && !was_kk)
            || (now_kk && old.kk_version != next.kk_version)
            || (now_kk && kk_selection_changed)
        {
            self.notifier.notify(ChimeEvent::KkStart {
                version: next.kk_version,
            });
        }
        if was_kk && !now_kk {
            if let Some((game, weather)) = self.derive(&next).await {
                self.notifier.notify(ChimeEvent::HourMusic {
                    hour: self.current_hour,
                    weather,
                    game,
                    hour_change: false,
                });
            }
        }

        if old.tab_audio != next.tab_audio
            || old.tab_audio_reduce_percent != next.tab_audio_reduce_percent
        {
            self.notifier.notify(ChimeEvent::TabAudio {
                audible: None,
                policy: next.tab_audio,
                reduce_percent: next.tab_audio_reduce_percent,
            });
        }

        if old.paused != next.paused {
            if next.paused {
                self.notifier.notify(ChimeEvent::Pause {
                    tab_audio_paused: false,
                });
            } else {
                self.activate().await;
            }
        }
    }
}

/// Maps the raw endpoint category onto a playable weather variant.
fn live_category(raw: &str) -> Weather {
    match raw {
        "Rain" => Weather::Raining,
        "Snow" => Weather::Snowing,
        _ => Weather::Sunny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_common::music::{KkVersion, TabAudioPolicy};
    use chrono::TimeZone;
    use rand::SeedableRng;
    use tokio::sync::broadcast::error::TryRecvError;

    fn local(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, 30, 0).unwrap()
    }

    struct Fixture {
        coordinator: Coordinator,
        bus_rx: tokio::sync::broadcast::Receiver<ChimeEvent>,
        weather_value: std::sync::Arc<tokio::sync::RwLock<Option<String>>>,
    }

    fn fixture(settings: Settings, now: DateTime<Local>) -> Fixture {
        let bus = Arc::new(EventBus::new(64));
        let bus_rx = bus.subscribe();
        let notifier = Notifier::new(Arc::clone(&bus));
        let (weather, weather_value) = WeatherHandle::detached();
        let (tab, _tab_task) = crate::tabaudio::spawn(
            crate::tabaudio::NullProbe,
            mpsc::unbounded_channel().0,
        );
        let inputs = CoordinatorInputs {
            hour_rx: mpsc::unbounded_channel().1,
            weather_rx: mpsc::unbounded_channel().1,
            tab_rx: mpsc::unbounded_channel().1,
            settings_rx: mpsc::unbounded_channel().1,
        };
        let coordinator = Coordinator::new(
            SharedSettings::new(settings),
            notifier,
            weather,
            tab,
            inputs,
            now,
            StdRng::seed_from_u64(11),
        );
        Fixture {
            coordinator,
            bus_rx,
            weather_value,
        }
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<ChimeEvent>) -> Vec<ChimeEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(ev) => events.push(ev),
                Err(TryRecvError::Empty) => return events,
                Err(e) => panic!("bus receiver broken: {e}"),
            }
        }
    }

    #[tokio::test]
    async fn test_activation_publishes_volume_then_hour_music() {
        // A Thursday afternoon, outside the special window
        let mut fx = fixture(Settings::default(), local(2026, 8, 6, 15));
        fx.coordinator.activate().await;

        let events = drain(&mut fx.bus_rx);
        assert!(matches!(events[0], ChimeEvent::Volume { level } if level == 0.5));
        match &events[1] {
            ChimeEvent::HourMusic {
                hour,
                weather,
                game,
                hour_change,
            } => {
                assert_eq!(*hour, 15);
                assert_eq!(*weather, Weather::Sunny);
                assert_eq!(*game, Game::NewHorizons);
                assert!(!hour_change);
            }
            other => panic!("expected hourMusic, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_activation_inside_kk_window() {
        // Saturday 9pm
        let mut fx = fixture(Settings::default(), local(2026, 8, 8, 21));
        fx.coordinator.activate().await;

        let events = drain(&mut fx.bus_rx);
        assert!(matches!(events[0], ChimeEvent::Volume { .. }));
        assert!(matches!(
            events[1],
            ChimeEvent::KkStart {
                version: KkVersion::Live
            }
        ));
    }

    #[tokio::test]
    async fn test_paused_activation_only_passes_volume() {
        let settings = Settings {
            paused: true,
            ..Settings::default()
        };
        let mut fx = fixture(settings, local(2026, 8, 6, 15));
        fx.coordinator.activate().await;

        let events = drain(&mut fx.bus_rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ChimeEvent::Volume { .. }));
    }

    #[tokio::test]
    async fn test_rain_is_coerced_to_snow_for_the_original_game() {
        let settings = Settings {
            game: GameChoice::Game(Game::AnimalCrossing),
            weather: WeatherChoice::Weather(Weather::Raining),
            ..Settings::default()
        };
        let mut fx = fixture(settings, local(2026, 8, 6, 15));
        fx.coordinator.activate().await;

        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[1],
            ChimeEvent::HourMusic {
                weather: Weather::Snowing,
                game: Game::AnimalCrossing,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_live_weather_defers_until_first_sample() {
        let settings = Settings {
            weather: WeatherChoice::Live,
            ..Settings::default()
        };
        let mut fx = fixture(settings, local(2026, 8, 6, 15));
        fx.coordinator.activate().await;

        // No weather sample yet: only volume goes out
        let events = drain(&mut fx.bus_rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ChimeEvent::Volume { .. }));

        // First sample lands: the deferred activation publishes hourMusic,
        // not weatherChange
        *fx.weather_value.write().await = Some("Rain".to_string());
        fx.coordinator.on_weather_changed().await;
        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[0],
            ChimeEvent::HourMusic {
                weather: Weather::Raining,
                hour_change: false,
                ..
            }
        ));

        // Subsequent changes are weatherChange
        *fx.weather_value.write().await = Some("Snow".to_string());
        fx.coordinator.on_weather_changed().await;
        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[0],
            ChimeEvent::WeatherChange {
                weather: Weather::Snowing,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_weather_callback_ignored_when_not_live() {
        let mut fx = fixture(Settings::default(), local(2026, 8, 6, 15));
        fx.coordinator.activate().await;
        drain(&mut fx.bus_rx);

        *fx.weather_value.write().await = Some("Rain".to_string());
        fx.coordinator.on_weather_changed().await;
        assert!(drain(&mut fx.bus_rx).is_empty());
    }

    #[tokio::test]
    async fn test_hour_tick_publishes_boundary_hour_music() {
        let mut fx = fixture(Settings::default(), local(2026, 8, 6, 15));
        fx.coordinator
            .on_hour(HourTick {
                day: Weekday::Thu,
                hour: 16,
            })
            .await;

        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[0],
            ChimeEvent::HourMusic {
                hour: 16,
                hour_change: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_hour_tick_entering_and_leaving_kk_window() {
        // Saturday 7pm → 8pm enters the window
        let mut fx = fixture(Settings::default(), local(2026, 8, 8, 19));
        fx.coordinator
            .on_hour(HourTick {
                day: Weekday::Sat,
                hour: 20,
            })
            .await;
        let events = drain(&mut fx.bus_rx);
        assert!(matches!(events[0], ChimeEvent::KkStart { .. }));

        // Saturday 11pm → Sunday midnight leaves it
        fx.coordinator
            .on_hour(HourTick {
                day: Weekday::Sun,
                hour: 0,
            })
            .await;
        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[0],
            ChimeEvent::HourMusic {
                hour: 0,
                hour_change: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_tab_flip_carries_current_policy() {
        let settings = Settings {
            tab_audio: TabAudioPolicy::Reduce,
            tab_audio_reduce_percent: 25,
            ..Settings::default()
        };
        let mut fx = fixture(settings, local(2026, 8, 6, 15));
        fx.coordinator.on_tab_audio(true).await;

        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[0],
            ChimeEvent::TabAudio {
                audible: Some(true),
                policy: TabAudioPolicy::Reduce,
                reduce_percent: 25,
            }
        ));
    }

    #[tokio::test]
    async fn test_settings_diff_volume_and_game() {
        let mut fx = fixture(Settings::default(), local(2026, 8, 6, 15));

        let next = Settings {
            volume: 0.9,
            game: GameChoice::Game(Game::NewLeaf),
            ..Settings::default()
        };
        fx.coordinator.on_settings(next).await;

        let events = drain(&mut fx.bus_rx);
        assert!(matches!(events[0], ChimeEvent::Volume { level } if level == 0.9));
        assert!(matches!(
            events[1],
            ChimeEvent::GameChange {
                game: Game::NewLeaf,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_settings_diff_policy_change_publishes_reconciliation() {
        let mut fx = fixture(Settings::default(), local(2026, 8, 6, 15));

        let next = Settings {
            tab_audio: TabAudioPolicy::Reduce,
            tab_audio_reduce_percent: 25,
            ..Settings::default()
        };
        fx.coordinator.on_settings(next).await;

        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[0],
            ChimeEvent::TabAudio {
                audible: None,
                policy: TabAudioPolicy::Reduce,
                reduce_percent: 25,
            }
        ));
    }

    #[tokio::test]
    async fn test_settings_pause_toggle() {
        let mut fx = fixture(Settings::default(), local(2026, 8, 6, 15));

        let paused = Settings {
            paused: true,
            ..Settings::default()
        };
        fx.coordinator.on_settings(paused.clone()).await;
        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[0],
            ChimeEvent::Pause {
                tab_audio_paused: false
            }
        ));

        // Unpausing re-activates
        fx.coordinator.on_settings(Settings::default()).await;
        let events = drain(&mut fx.bus_rx);
        assert!(matches!(events[0], ChimeEvent::Volume { .. }));
        assert!(matches!(events[1], ChimeEvent::HourMusic { .. }));
    }

    #[tokio::test]
    async fn test_settings_kk_version_change_inside_window() {
        // Saturday 9pm, already in the window
        let mut fx = fixture(Settings::default(), local(2026, 8, 8, 21));

        let next = Settings {
            kk_version: KkVersion::Both,
            ..Settings::default()
        };
        fx.coordinator.on_settings(next).await;
        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[0],
            ChimeEvent::KkStart {
                version: KkVersion::Both
            }
        ));
    }

    #[tokio::test]
    async fn test_settings_leaving_always_kk_restores_hourly() {
        let settings = Settings {
            always_kk: true,
            ..Settings::default()
        };
        let mut fx = fixture(settings, local(2026, 8, 6, 15));

        fx.coordinator.on_settings(Settings::default()).await;
        let events = drain(&mut fx.bus_rx);
        assert!(matches!(
            events[0],
            ChimeEvent::HourMusic {
                hour_change: false,
                ..
            }
        ));
    }
}
