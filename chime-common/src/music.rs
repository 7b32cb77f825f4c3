//! Music vocabulary shared by every component: the games an hourly track can
//! come from, the weather variants, special-track versions, and the ducking
//! policy for competing host audio.
//!
//! `Display` implementations produce the slug form used in media paths
//! (`new-horizons`, `raining`, ...), which is also the serde representation.

use serde::{Deserialize, Serialize};

/// Game whose soundtrack provides the hourly tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Game {
    AnimalCrossing,
    WildWorld,
    NewLeaf,
    NewHorizons,
}

/// All games, in catalog order. Used for uniform random selection.
pub const ALL_GAMES: [Game; 4] = [
    Game::AnimalCrossing,
    Game::WildWorld,
    Game::NewLeaf,
    Game::NewHorizons,
];

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slug = match self {
            Game::AnimalCrossing => "animal-crossing",
            Game::WildWorld => "wild-world",
            Game::NewLeaf => "new-leaf",
            Game::NewHorizons => "new-horizons",
        };
        write!(f, "{}", slug)
    }
}

/// Weather variant of an hourly track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Sunny,
    Raining,
    Snowing,
}

/// All weather variants, used for uniform random selection.
pub const ALL_WEATHERS: [Weather; 3] = [Weather::Sunny, Weather::Raining, Weather::Snowing];

impl std::fmt::Display for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slug = match self {
            Weather::Sunny => "sunny",
            Weather::Raining => "raining",
            Weather::Snowing => "snowing",
        };
        write!(f, "{}", slug)
    }
}

/// Recording version of the special ("K.K.") program.
///
/// `Both` means each selection flips a fair coin between the two concrete
/// versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KkVersion {
    Live,
    Aircheck,
    Both,
}

/// A concrete version chosen for one special-track performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KkPerformance {
    Live,
    Aircheck,
}

impl std::fmt::Display for KkPerformance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KkPerformance::Live => write!(f, "live"),
            KkPerformance::Aircheck => write!(f, "aircheck"),
        }
    }
}

impl KkPerformance {
    /// Capitalized form for human-facing titles ("Live Version").
    pub fn title_case(&self) -> &'static str {
        match self {
            KkPerformance::Live => "Live",
            KkPerformance::Aircheck => "Aircheck",
        }
    }
}

/// What playback does while another source on the host is audible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabAudioPolicy {
    /// Pause playback, resume when the competing source goes quiet.
    Pause,
    /// Attenuate volume by the configured percentage.
    Reduce,
    /// Keep playing at full volume.
    Nothing,
}

/// Formats an hour of day the way track files are named: `0` is `12am`,
/// `12` is `12pm`, everything else `Nam`/`Npm`.
pub fn format_hour(hour: u32) -> String {
    match hour {
        0 => "12am".to_string(),
        12 => "12pm".to_string(),
        h if h < 13 => format!("{}am", h),
        h => format!("{}pm", h - 12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hour() {
        assert_eq!(format_hour(0), "12am");
        assert_eq!(format_hour(1), "1am");
        assert_eq!(format_hour(11), "11am");
        assert_eq!(format_hour(12), "12pm");
        assert_eq!(format_hour(13), "1pm");
        assert_eq!(format_hour(23), "11pm");
    }

    #[test]
    fn test_game_slugs() {
        assert_eq!(Game::AnimalCrossing.to_string(), "animal-crossing");
        assert_eq!(Game::NewHorizons.to_string(), "new-horizons");
    }

    #[test]
    fn test_serde_slugs_round_trip() {
        let json = serde_json::to_string(&Game::WildWorld).unwrap();
        assert_eq!(json, "\"wild-world\"");
        let back: Game = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Game::WildWorld);

        let json = serde_json::to_string(&Weather::Raining).unwrap();
        assert_eq!(json, "\"raining\"");
    }
}
