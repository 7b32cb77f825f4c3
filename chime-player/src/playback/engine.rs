//! The playback state machine.
//!
//! Owns the single playable audio resource and reacts to bus events:
//! hourly transitions (with fade-out and the optional interstitial at true
//! hour boundaries), the direct mid-hour weather swap, the special program,
//! loop-point scheduling, ducking against competing host audio, and volume.
//!
//! All timers of a session (the loop deadline and the fade ramp) are owned
//! state of this one task and polled from one `select!` loop; every
//! transition cancels both before arming its own, so a superseded session
//! can never fire into the new one.

use std::time::Duration;

use rand::rngs::StdRng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, warn};

use chime_common::music::{format_hour, Game, KkVersion, TabAudioPolicy, Weather};
use chime_common::settings::Settings;
use chime_common::{ChimeEvent, SharedSettings};

use crate::audio::{AudioSink, SinkEvent, TrackSource};
use crate::coordinator::Notifier;
use crate::error::Error;
use crate::playback::catalog;
use crate::playback::loops::loop_window;
use crate::playback::session::{AfterFade, CurrentTrack, FadeOut, PendingHourly};
use crate::playback::towntune::{TownTune, TUNE_BPM};
use crate::timekeeper::calendar_event;

/// Fade-out length at a true hour boundary.
pub const HOUR_FADE: Duration = Duration::from_millis(3000);
/// Fade-out length for mid-hour program switches.
pub const SWITCH_FADE: Duration = Duration::from_millis(500);
/// Fade-out length when pausing.
pub const PAUSE_FADE: Duration = Duration::from_millis(300);
/// Cadence of the fade ramp.
pub const FADE_TICK: Duration = Duration::from_millis(100);

pub struct PlaybackEngine<S: AudioSink> {
    sink: S,
    sink_rx: mpsc::UnboundedReceiver<SinkEvent>,
    bus_rx: broadcast::Receiver<ChimeEvent>,
    notifier: Notifier,
    settings: SharedSettings,
    rng: StdRng,

    current: Option<CurrentTrack>,
    previous_game: Option<Game>,
    previous_weather: Option<Weather>,
    kk_version: KkVersion,
    paused_during_town_tune: bool,

    fade: Option<FadeOut>,
    next_fade_tick: Option<Instant>,
    loop_deadline: Option<Instant>,

    /// Nominal master volume, from `volume` events.
    volume: f32,
    tab_audible: bool,
    tab_audio_paused: bool,
    reduced_volume: bool,
    reduce_percent: u8,
}

impl<S: AudioSink> PlaybackEngine<S> {
    pub fn new(
        sink: S,
        sink_rx: mpsc::UnboundedReceiver<SinkEvent>,
        bus_rx: broadcast::Receiver<ChimeEvent>,
        notifier: Notifier,
        settings: SharedSettings,
        initial: &Settings,
        rng: StdRng,
    ) -> Self {
        Self {
            sink,
            sink_rx,
            bus_rx,
            notifier,
            settings,
            rng,
            current: None,
            previous_game: None,
            previous_weather: None,
            kk_version: initial.kk_version,
            paused_during_town_tune: false,
            fade: None,
            next_fade_tick: None,
            loop_deadline: None,
            volume: initial.volume,
            tab_audible: false,
            tab_audio_paused: false,
            reduced_volume: false,
            reduce_percent: initial.tab_audio_reduce_percent,
        }
    }

    /// Runs until the bus closes.
    pub async fn run(mut self) {
        let far = Duration::from_secs(24 * 60 * 60);
        loop {
            let loop_at = self.loop_deadline.unwrap_or_else(|| Instant::now() + far);
            let fade_at = self.next_fade_tick.unwrap_or_else(|| Instant::now() + far);
            tokio::select! {
                event = self.bus_rx.recv() => match event {
                    Ok(event) => self.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "event bus lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
                Some(event) = self.sink_rx.recv() => self.handle_sink_event(event).await,
                _ = tokio::time::sleep_until(loop_at), if self.loop_deadline.is_some() => {
                    self.fire_loop();
                }
                _ = tokio::time::sleep_until(fade_at), if self.next_fade_tick.is_some() => {
                    self.step_fade().await;
                }
            }
        }
    }

    pub(crate) async fn handle_event(&mut self, event: ChimeEvent) {
        match event {
            ChimeEvent::HourMusic {
                hour,
                weather,
                game,
                hour_change,
            } => self.on_hourly(hour, weather, game, hour_change).await,
            ChimeEvent::GameChange {
                hour,
                weather,
                game,
            }
            | ChimeEvent::WeatherChange {
                hour,
                weather,
                game,
            } => self.on_hourly(hour, weather, game, false).await,
            ChimeEvent::KkStart { version } => self.on_kk_start(version).await,
            ChimeEvent::Pause { .. } => self.on_pause().await,
            ChimeEvent::Volume { level } => {
                self.volume = level;
                self.apply_volume().await;
            }
            ChimeEvent::TabAudio {
                audible,
                policy,
                reduce_percent,
            } => self.on_tab_audio(audible, policy, reduce_percent).await,
            // Produced here or consumed elsewhere
            ChimeEvent::Unpause | ChimeEvent::KkMusic { .. } | ChimeEvent::MusicFailed => {}
        }
    }

    /// Classifies an incoming (hour, weather, game, hour_change) tuple and
    /// performs the matching transition.
    async fn on_hourly(&mut self, hour: u32, weather: Weather, game: Game, hour_change: bool) {
        self.clear_timers();
        self.sink.set_looping(true);

        let weather_changed = self.previous_weather.is_some_and(|w| w != weather);
        let same_game = self.previous_game == Some(game);
        let hourly_in_progress = matches!(
            self.current,
            Some(CurrentTrack::Hourly { .. }) | Some(CurrentTrack::TownTune { .. })
        );

        if weather_changed && same_game && !hour_change {
            // Weather flipped mid-hour: swap the source directly, keeping
            // the elapsed offset. No fade, no interstitial.
            self.previous_weather = Some(weather);
            self.previous_game = Some(game);
            self.play_hour_song(game, weather, hour, true).await;
            return;
        }

        if !hour_change && same_game && !weather_changed && hourly_in_progress {
            // Nothing materially changed
            return;
        }

        self.previous_weather = Some(weather);
        self.previous_game = Some(game);

        let fade = if hour_change { HOUR_FADE } else { SWITCH_FADE };
        self.begin_fade(
            fade,
            AfterFade::Hourly {
                next: PendingHourly {
                    hour,
                    weather,
                    game,
                },
                hour_change,
            },
        )
        .await;
    }

    /// Loads and starts the hourly track for (game, weather, hour).
    ///
    /// With `resume` set the elapsed offset of the previous source is
    /// carried over (the mid-hour weather swap); otherwise playback starts
    /// at offset zero.
    async fn play_hour_song(&mut self, game: Game, weather: Weather, hour: u32, resume: bool) {
        self.sink.set_looping(true);
        let offset = if resume {
            self.sink.position()
        } else {
            Duration::ZERO
        };

        let s = self.settings.snapshot().await;
        let song = match ongoing_event(&s) {
            Some(event) => event.to_string(),
            None => format_hour(hour),
        };

        let window = loop_window(game, weather, hour);
        self.paused_during_town_tune = false;
        self.current = Some(CurrentTrack::Hourly {
            game,
            weather,
            hour,
            window,
            started: false,
        });

        let source = TrackSource::Hourly {
            game,
            weather,
            song,
        };
        if let Err(e) = self.sink.load(&source) {
            self.report_failure(e);
            return;
        }
        self.apply_volume().await;

        if self.tab_audio_paused {
            // Stay silent; the quiet edge starts this session
            self.notifier.notify(ChimeEvent::Pause {
                tab_audio_paused: true,
            });
            return;
        }

        self.sink.seek(offset);
        if let Err(e) = self.sink.play() {
            self.report_failure(e);
        }
    }

    async fn on_kk_start(&mut self, version: KkVersion) {
        debug!(?version, "entering special program");
        self.clear_timers();
        self.sink.set_looping(false);
        self.kk_version = version;
        self.begin_fade(SWITCH_FADE, AfterFade::NextSpecial).await;
    }

    /// Selects and plays the next special track; re-entered on every
    /// natural "ended" while the special program is active.
    async fn play_next_special(&mut self) {
        let s = self.settings.snapshot().await;
        let version = catalog::choose_performance(self.kk_version, &mut self.rng);
        let song = catalog::choose_song(
            s.kk_selected_songs_enable,
            &s.kk_selected_songs,
            &mut self.rng,
        );
        let title = catalog::format_title(&song, version);

        self.paused_during_town_tune = false;
        self.current = Some(CurrentTrack::Special);
        self.sink.set_looping(false);

        let source = TrackSource::Special { version, song };
        if let Err(e) = self.sink.load(&source) {
            self.report_failure(e);
            return;
        }
        self.apply_volume().await;
        if let Err(e) = self.sink.play() {
            self.report_failure(e);
            return;
        }
        self.notifier.notify(ChimeEvent::KkMusic { title });
    }

    /// Starts the interstitial; `follow` plays once it completes.
    async fn start_town_tune(&mut self, follow: PendingHourly) {
        debug!("playing interstitial");
        self.sink.set_looping(false);
        let tune = TownTune::default().perform(TUNE_BPM, &mut self.rng);

        self.paused_during_town_tune = false;
        self.current = Some(CurrentTrack::TownTune { follow });

        if let Err(e) = self.sink.load(&TrackSource::TownTune { tune }) {
            self.report_failure(e);
            return;
        }
        self.apply_volume().await;
        if let Err(e) = self.sink.play() {
            self.report_failure(e);
        }
    }

    async fn on_pause(&mut self) {
        self.clear_timers();
        if matches!(self.current, Some(CurrentTrack::TownTune { .. })) {
            self.paused_during_town_tune = true;
        }
        self.begin_fade(PAUSE_FADE, AfterFade::Silence).await;
    }

    async fn on_tab_audio(
        &mut self,
        audible: Option<bool>,
        policy: TabAudioPolicy,
        reduce_percent: u8,
    ) {
        match audible {
            Some(audible) => {
                self.tab_audible = audible;
                match policy {
                    TabAudioPolicy::Pause => {
                        if audible {
                            self.sink.pause();
                            self.tab_audio_paused = true;
                        } else if self.tab_audio_paused && self.sink.is_paused() {
                            // Resume from the preserved offset. An in-flight
                            // interstitial resumes itself; the hourly restart
                            // stays deferred to its completion.
                            if let Err(e) = self.sink.play() {
                                self.report_failure(e);
                                return;
                            }
                            self.tab_audio_paused = false;
                            self.notifier.notify(ChimeEvent::Unpause);
                        }
                    }
                    TabAudioPolicy::Reduce => {
                        if audible {
                            self.reduce_percent = reduce_percent;
                            self.reduced_volume = true;
                        } else {
                            self.reduced_volume = false;
                        }
                        self.apply_volume().await;
                    }
                    TabAudioPolicy::Nothing => {}
                }
            }
            None => self.reconcile_policy(policy, reduce_percent).await,
        }
    }

    /// The ducking policy changed while a competing source is audible:
    /// unwind the old policy's state, then re-publish with the concrete
    /// flag so the new policy applies through the normal path.
    async fn reconcile_policy(&mut self, policy: TabAudioPolicy, reduce_percent: u8) {
        if !self.tab_audible {
            return;
        }

        let republish = ChimeEvent::TabAudio {
            audible: Some(true),
            policy,
            reduce_percent,
        };

        if self.tab_audio_paused && policy != TabAudioPolicy::Pause {
            if self.sink.is_paused() {
                if let Err(e) = self.sink.play() {
                    self.report_failure(e);
                    return;
                }
            }
            self.tab_audio_paused = false;
            self.notifier.notify(ChimeEvent::Unpause);
            self.notifier.notify(republish);
        } else if self.reduced_volume && policy != TabAudioPolicy::Reduce {
            self.reduced_volume = false;
            self.apply_volume().await;
            self.notifier.notify(republish);
        } else if policy == TabAudioPolicy::Pause && !self.tab_audio_paused {
            self.notifier.notify(republish);
        } else if policy == TabAudioPolicy::Reduce && !self.reduced_volume {
            self.notifier.notify(republish);
        }
    }

    async fn handle_sink_event(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::Started => {
                let window = match &mut self.current {
                    Some(CurrentTrack::Hourly {
                        window, started, ..
                    }) => {
                        *started = true;
                        *window
                    }
                    _ => None,
                };
                if let Some(window) = window {
                    let delay = window.remaining_from(self.sink.position());
                    debug!(?delay, "arming loop point");
                    self.loop_deadline = Some(Instant::now() + delay);
                }
            }
            SinkEvent::Ended => match self.current.clone() {
                Some(CurrentTrack::Special) => self.play_next_special().await,
                Some(CurrentTrack::TownTune { follow }) => {
                    if self.paused_during_town_tune {
                        self.paused_during_town_tune = false;
                    } else {
                        self.play_hour_song(follow.game, follow.weather, follow.hour, false)
                            .await;
                    }
                }
                _ => {}
            },
            SinkEvent::Error(message) => {
                self.report_failure(Error::Playback(message));
            }
        }
    }

    /// Seeks back to the window start and re-arms for one full span.
    fn fire_loop(&mut self) {
        self.loop_deadline = None;
        if let Some(CurrentTrack::Hourly {
            window: Some(window),
            ..
        }) = &self.current
        {
            let window = *window;
            debug!(from = ?self.sink.position(), to = window.start, "looping");
            self.sink.seek(window.start_offset());
            self.loop_deadline = Some(Instant::now() + window.span());
        }
    }

    /// Begins a fade-out ramp; if nothing is playing the follow-up runs
    /// immediately.
    async fn begin_fade(&mut self, duration: Duration, after: AfterFade) {
        if self.sink.is_paused() {
            self.after_fade(after).await;
            return;
        }
        let restore = self.sink.volume();
        let steps = (duration.as_millis() / FADE_TICK.as_millis()).max(1) as f32;
        self.fade = Some(FadeOut {
            step: restore / steps,
            restore,
            after,
        });
        self.next_fade_tick = Some(Instant::now() + FADE_TICK);
    }

    /// One 100 ms fade tick: lower the volume by one step, or finish by
    /// pausing the sink, restoring its volume, and running the follow-up.
    pub(crate) async fn step_fade(&mut self) {
        let (step, finished) = match &self.fade {
            Some(fade) => (fade.step, self.sink.volume() <= fade.step),
            None => {
                self.next_fade_tick = None;
                return;
            }
        };

        if !finished {
            let volume = self.sink.volume();
            self.sink.set_volume(volume - step);
            self.next_fade_tick = Some(Instant::now() + FADE_TICK);
            return;
        }

        self.next_fade_tick = None;
        if let Some(FadeOut { restore, after, .. }) = self.fade.take() {
            self.sink.pause();
            self.sink.set_volume(restore);
            self.after_fade(after).await;
        }
    }

    async fn after_fade(&mut self, after: AfterFade) {
        match after {
            AfterFade::Silence => {}
            AfterFade::Hourly { next, hour_change } => {
                // Interstitial eligibility is decided now, not at the
                // transition, so ducking during the fade is respected
                let s = self.settings.snapshot().await;
                if hour_change && s.enable_town_tune && !self.tab_audio_paused {
                    self.start_town_tune(next).await;
                } else {
                    self.play_hour_song(next.game, next.weather, next.hour, false)
                        .await;
                }
            }
            AfterFade::NextSpecial => self.play_next_special().await,
        }
    }

    /// Effective volume = nominal (or interstitial) volume times the
    /// ducking attenuation, clamped to [0, 1].
    async fn apply_volume(&mut self) {
        let nominal = if matches!(self.current, Some(CurrentTrack::TownTune { .. })) {
            self.settings.snapshot().await.town_tune_volume
        } else {
            self.volume
        };
        let mut volume = nominal;
        if self.reduced_volume {
            volume *= 1.0 - self.reduce_percent as f32 / 100.0;
        }
        self.sink.set_volume(volume.clamp(0.0, 1.0));
    }

    /// Cancels the loop deadline and any in-flight fade (restoring the
    /// faded volume). Every transition calls this before arming its own
    /// timers.
    fn clear_timers(&mut self) {
        self.loop_deadline = None;
        self.next_fade_tick = None;
        if let Some(FadeOut { restore, .. }) = self.fade.take() {
            self.sink.set_volume(restore);
        }
    }

    fn report_failure(&mut self, error: Error) {
        warn!("playback failed: {}", error);
        self.clear_timers();
        self.current = None;
        self.notifier.notify(ChimeEvent::MusicFailed);
    }
}

/// The calendar-event track name, when event music is enabled and an event
/// is ongoing.
fn ongoing_event(s: &Settings) -> Option<&'static str> {
    use chrono::Datelike;

    if !s.enable_event_music {
        return None;
    }
    let now = chrono::Local::now();
    calendar_event(now.month(), now.day())
}
