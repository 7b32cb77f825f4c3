//! Scripted sink for engine tests: records every call, lets tests set the
//! playback offset and fail loads on demand.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio::{AudioSink, TrackSource};
use crate::error::Error;
use crate::Result;

#[derive(Debug, Default)]
pub struct FakeSinkState {
    pub loaded: Option<TrackSource>,
    pub loads: Vec<TrackSource>,
    pub seeks: Vec<Duration>,
    pub paused: bool,
    pub position: Duration,
    pub volume: f32,
    pub looping: bool,
    pub play_count: usize,
    pub fail_next_load: bool,
}

/// Shared view onto a [`FakeSink`]'s recorded state.
#[derive(Clone)]
pub struct FakeHandle(Arc<Mutex<FakeSinkState>>);

impl FakeHandle {
    pub fn with<T>(&self, f: impl FnOnce(&mut FakeSinkState) -> T) -> T {
        let mut guard = self.0.lock().expect("fake sink poisoned");
        f(&mut guard)
    }

    pub fn set_position(&self, position: Duration) {
        self.with(|s| s.position = position);
    }

    pub fn volume(&self) -> f32 {
        self.with(|s| s.volume)
    }

    pub fn is_paused(&self) -> bool {
        self.with(|s| s.paused)
    }

    pub fn loaded(&self) -> Option<TrackSource> {
        self.with(|s| s.loaded.clone())
    }
}

pub struct FakeSink {
    state: Arc<Mutex<FakeSinkState>>,
}

impl FakeSink {
    pub fn new() -> (Self, FakeHandle) {
        let state = Arc::new(Mutex::new(FakeSinkState {
            paused: true,
            volume: 1.0,
            ..FakeSinkState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            FakeHandle(state),
        )
    }

    fn with<T>(&self, f: impl FnOnce(&mut FakeSinkState) -> T) -> T {
        let mut guard = self.state.lock().expect("fake sink poisoned");
        f(&mut guard)
    }
}

impl AudioSink for FakeSink {
    fn load(&mut self, source: &TrackSource) -> Result<()> {
        self.with(|s| {
            if s.fail_next_load {
                s.fail_next_load = false;
                return Err(Error::TrackLoad("scripted load failure".into()));
            }
            s.loaded = Some(source.clone());
            s.loads.push(source.clone());
            s.paused = true;
            s.position = Duration::ZERO;
            Ok(())
        })
    }

    fn play(&mut self) -> Result<()> {
        self.with(|s| {
            if s.loaded.is_some() {
                s.paused = false;
                s.play_count += 1;
            }
            Ok(())
        })
    }

    fn pause(&mut self) {
        self.with(|s| s.paused = true);
    }

    fn is_paused(&self) -> bool {
        self.with(|s| s.paused)
    }

    fn seek(&mut self, position: Duration) {
        self.with(|s| {
            s.seeks.push(position);
            s.position = position;
        });
    }

    fn position(&self) -> Duration {
        self.with(|s| s.position)
    }

    fn set_volume(&mut self, volume: f32) {
        self.with(|s| s.volume = volume);
    }

    fn volume(&self) -> f32 {
        self.with(|s| s.volume)
    }

    fn set_looping(&mut self, looping: bool) {
        self.with(|s| s.looping = looping);
    }
}
