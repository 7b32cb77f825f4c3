//! # Chime Player Library
//!
//! Playback orchestration engine: selects and plays one ambient track at a
//! time from mutually exclusive programs (hourly track, special weekly
//! program, interstitial jingle) based on wall-clock time, a polled weather
//! signal, competing host audio, and user configuration.
//!
//! **Architecture:** independent timer/IO components (time keeper, weather
//! poller, audibility monitor) feed the Coordinator, which folds them with
//! the configuration snapshot into semantic events on the EventBus; the
//! playback engine consumes those events and exclusively owns the single
//! playable audio resource.

pub mod audio;
pub mod coordinator;
pub mod error;
pub mod playback;
pub mod tabaudio;
pub mod timekeeper;
pub mod weather;

pub use error::{Error, Result};
