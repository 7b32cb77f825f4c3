//! Authored loop windows for hourly tracks, keyed by game, weather, and
//! hour of day.
//!
//! A track plays from its beginning until the window's `end` offset, then
//! jumps back to `start` and repeats that span indefinitely. Absence of a
//! window at any level means the whole track loops natively. Windows are
//! authored data; `0 <= start < end <= track length` is assumed, not
//! checked.

use std::time::Duration;

use chime_common::music::{Game, Weather};

/// One loop window, offsets in seconds from the start of the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopWindow {
    pub start: f64,
    pub end: f64,
}

impl LoopWindow {
    /// Loop start as a seekable offset.
    pub fn start_offset(&self) -> Duration {
        Duration::from_secs_f64(self.start)
    }

    /// Length of one full loop pass, `end - start`.
    pub fn span(&self) -> Duration {
        Duration::from_secs_f64(self.end - self.start)
    }

    /// Time remaining until the window's end when playback is at
    /// `position`. Zero if the position is already past the end.
    pub fn remaining_from(&self, position: Duration) -> Duration {
        Duration::from_secs_f64((self.end - position.as_secs_f64()).max(0.0))
    }
}

const fn lw(start: f64, end: f64) -> LoopWindow {
    LoopWindow { start, end }
}

/// Looks up the authored loop window for a track, hour 0-23.
pub fn loop_window(game: Game, weather: Weather, hour: u32) -> Option<LoopWindow> {
    let table: &[LoopWindow; 24] = match (game, weather) {
        (Game::AnimalCrossing, Weather::Sunny) => &AC_SUNNY,
        (Game::AnimalCrossing, Weather::Snowing) => &AC_SNOWING,
        (Game::AnimalCrossing, Weather::Raining) => return None,
        (Game::WildWorld, Weather::Sunny) => &WW_SUNNY,
        (Game::WildWorld, Weather::Snowing) => &WW_SNOWING,
        (Game::WildWorld, Weather::Raining) => &WW_RAINING,
        (Game::NewLeaf, Weather::Sunny) => &NL_SUNNY,
        (Game::NewLeaf, Weather::Snowing) => &NL_SNOWING,
        (Game::NewLeaf, Weather::Raining) => &NL_RAINING,
        (Game::NewHorizons, Weather::Sunny) => &NH_SUNNY,
        (Game::NewHorizons, Weather::Raining) => &NH_RAINING,
        (Game::NewHorizons, Weather::Snowing) => &NH_SNOWING,
    };
    table.get(hour as usize).copied()
}

#[rustfmt::skip]
const AC_SUNNY: [LoopWindow; 24] = [
    lw(0.000, 125.628), lw(3.925, 133.740), lw(0.000, 175.674), lw(0.416, 177.770),
    lw(0.000, 138.628), lw(0.000, 186.119), lw(0.396, 165.777), lw(0.000, 137.524),
    lw(0.000, 142.308), lw(2.700, 130.613), lw(0.000, 116.657), lw(0.000, 142.220),
    lw(0.000, 109.480), lw(0.000, 144.945), lw(0.000, 130.274), lw(0.940,  82.985),
    lw(0.000, 130.280), lw(10.460, 136.090), lw(0.000, 134.920), lw(0.000, 127.740),
    lw(0.000, 120.780), lw(0.000, 153.528), lw(1.240, 101.750), lw(0.000,  80.386),
];

// The original game has no separate snow mix; values match the sunny table.
#[rustfmt::skip]
const AC_SNOWING: [LoopWindow; 24] = [
    lw(0.000, 125.628), lw(3.925, 133.740), lw(0.000, 175.674), lw(0.416, 177.770),
    lw(0.000, 138.628), lw(0.000, 186.119), lw(0.396, 165.777), lw(0.000, 137.524),
    lw(0.000, 142.308), lw(2.700, 130.613), lw(0.000, 116.657), lw(0.000, 142.220),
    lw(0.000, 109.480), lw(0.000, 144.945), lw(0.000, 130.274), lw(0.940,  82.985),
    lw(0.000, 130.280), lw(10.460, 136.090), lw(0.000, 134.920), lw(0.000, 127.740),
    lw(0.000, 120.780), lw(0.000, 153.528), lw(1.240, 101.750), lw(0.000,  80.386),
];

#[rustfmt::skip]
const WW_SUNNY: [LoopWindow; 24] = [
    lw(10.370, 108.830), lw(12.970, 103.780), lw(7.800, 144.785), lw(12.118,  92.120),
    lw(4.405,  51.225), lw(0.000, 147.695), lw(0.610,  78.985), lw(4.670,  84.670),
    lw(0.000,  53.335), lw(0.490,  68.495), lw(3.540,  81.380), lw(0.620, 102.765),
    lw(0.000, 170.660), lw(5.615, 101.630), lw(13.330, 119.985), lw(0.000,  73.132),
    lw(8.620, 100.520), lw(0.000,  79.990), lw(1.850, 109.850), lw(1.300,  91.300),
    lw(1.885, 149.620), lw(1.840,  97.860), lw(0.000, 181.600), lw(0.000, 151.590),
];

#[rustfmt::skip]
const WW_SNOWING: [LoopWindow; 24] = [
    lw(10.370, 108.830), lw(12.970, 103.780), lw(7.800, 144.785), lw(12.118,  92.120),
    lw(4.405,  51.225), lw(0.000, 147.695), lw(0.610,  78.985), lw(4.670,  84.670),
    lw(0.000,  53.335), lw(0.490,  68.495), lw(3.540,  81.380), lw(0.620, 102.765),
    lw(0.000, 170.695), lw(5.990, 101.997), lw(13.330, 119.985), lw(0.000,  73.132),
    lw(8.620, 100.520), lw(0.000,  79.990), lw(1.850, 109.850), lw(1.300,  91.300),
    lw(1.885, 149.620), lw(1.840,  97.860), lw(0.000, 181.600), lw(0.000, 151.590),
];

#[rustfmt::skip]
const WW_RAINING: [LoopWindow; 24] = [
    lw(10.370, 108.830), lw(12.970, 103.780), lw(7.800, 144.775), lw(12.118,  92.120),
    lw(4.405,  51.225), lw(0.000, 147.685), lw(0.610,  78.985), lw(4.670,  84.650),
    lw(0.000,  53.335), lw(0.490,  68.495), lw(3.540,  81.380), lw(0.620, 102.765),
    lw(0.000, 170.660), lw(5.615, 101.630), lw(13.330, 119.985), lw(0.000,  73.132),
    lw(8.620, 100.520), lw(0.000,  79.990), lw(1.850, 109.850), lw(1.300,  91.300),
    lw(1.885, 149.620), lw(1.840,  97.860), lw(0.000, 181.600), lw(0.000, 151.590),
];

#[rustfmt::skip]
const NL_SUNNY: [LoopWindow; 24] = [
    lw(0.000,  78.980), lw(0.000, 114.630), lw(0.000, 167.000), lw(0.000,  82.000),
    lw(4.370, 109.080), lw(0.000, 108.000), lw(3.090,  77.660), lw(8.100,  97.440),
    lw(0.020,  86.410), lw(0.010,  57.630), lw(2.875,  82.045), lw(0.000,  83.990),
    lw(0.790,  86.510), lw(7.100,  87.110), lw(8.830,  93.550), lw(0.000,  59.885),
    lw(2.690,  92.670), lw(9.405, 142.970), lw(0.000,  89.665), lw(7.075,  91.780),
    lw(2.165,  85.670), lw(3.040,  99.015), lw(0.000,  73.440), lw(0.000, 124.005),
];

#[rustfmt::skip]
const NL_SNOWING: [LoopWindow; 24] = [
    lw(0.000,  78.980), lw(0.000, 114.660), lw(0.000, 167.000), lw(0.000,  82.000),
    lw(4.370, 109.080), lw(0.000, 108.000), lw(3.090,  77.660), lw(8.100,  97.440),
    lw(0.020,  86.410), lw(0.010,  57.630), lw(7.770,  86.900), lw(0.000,  83.990),
    lw(0.790,  86.510), lw(7.100,  87.110), lw(0.000,  80.810), lw(0.000,  59.885),
    lw(2.690,  92.670), lw(9.395, 142.970), lw(0.000,  89.665), lw(7.075,  91.780),
    lw(2.165,  85.670), lw(8.290,  93.630), lw(0.000,  73.440), lw(0.000, 124.100),
];

#[rustfmt::skip]
const NL_RAINING: [LoopWindow; 24] = [
    lw(0.000,  78.980), lw(0.000, 114.630), lw(0.000, 167.000), lw(0.000,  82.000),
    lw(4.370, 109.080), lw(0.000, 108.000), lw(3.090,  77.660), lw(4.500,  93.850),
    lw(0.020,  86.410), lw(0.010,  57.630), lw(7.770,  86.900), lw(0.000,  83.990),
    lw(0.790,  86.510), lw(7.100,  87.110), lw(0.000,  80.810), lw(0.000,  59.885),
    lw(2.690,  92.670), lw(9.395, 142.970), lw(0.000,  89.665), lw(7.115,  91.780),
    lw(2.165,  85.670), lw(8.290,  93.630), lw(0.000,  73.440), lw(0.000, 124.005),
];

#[rustfmt::skip]
const NH_SUNNY: [LoopWindow; 24] = [
    lw(10.209,  79.976), lw(11.490,  95.490), lw(7.044, 109.397), lw(10.417,  60.943),
    lw(17.152,  72.010), lw(24.000, 120.000), lw(14.583,  76.204), lw(8.560,  83.560),
    lw(8.547,  79.261), lw(2.489,  61.273), lw(12.642,  81.975), lw(10.159,  89.543),
    lw(7.861,  73.079), lw(15.332,  70.717), lw(8.368,  92.089), lw(9.271,  66.113),
    lw(25.654,  76.180), lw(11.498, 110.129), lw(14.169,  68.300), lw(12.978, 116.762),
    lw(7.084,  61.084), lw(11.875,  68.173), lw(3.503,  70.174), lw(10.211,  82.211),
];

#[rustfmt::skip]
const NH_RAINING: [LoopWindow; 24] = [
    lw(10.209,  79.976), lw(11.466,  95.466), lw(7.044, 109.397), lw(10.417,  60.943),
    lw(17.151,  72.008), lw(24.000, 120.000), lw(14.583,  76.205), lw(8.560,  83.560),
    lw(8.547,  79.261), lw(2.489,  61.273), lw(12.643,  81.977), lw(10.421,  89.811),
    lw(7.861,  73.079), lw(15.332,  70.716), lw(8.368,  92.089), lw(9.268,  66.110),
    lw(25.651,  76.177), lw(11.498, 110.129), lw(14.167,  68.297), lw(12.978, 116.762),
    lw(9.167,  63.167), lw(14.446,  70.742), lw(6.690,  73.356), lw(10.208,  82.208),
];

#[rustfmt::skip]
const NH_SNOWING: [LoopWindow; 24] = [
    lw(10.209,  79.976), lw(16.002, 100.002), lw(7.044, 109.397), lw(10.417,  60.943),
    lw(17.168,  72.025), lw(24.000, 120.000), lw(14.581,  76.203), lw(8.560,  83.560),
    lw(8.547,  79.261), lw(2.489,  61.273), lw(12.648,  81.981), lw(10.424,  89.808),
    lw(7.861,  73.079), lw(15.332,  70.716), lw(8.368,  92.089), lw(9.271,  66.113),
    lw(28.429,  78.955), lw(11.498, 110.129), lw(14.167,  68.297), lw(12.978, 116.762),
    lw(9.167,  63.167), lw(14.452,  70.748), lw(16.852,  83.519), lw(10.208,  82.208),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_window() {
        let w = loop_window(Game::NewHorizons, Weather::Sunny, 0).unwrap();
        assert_eq!(w.start, 10.209);
        assert_eq!(w.end, 79.976);
    }

    #[test]
    fn test_span_and_remaining() {
        let w = loop_window(Game::NewHorizons, Weather::Sunny, 0).unwrap();
        assert!((w.span().as_secs_f64() - 69.767).abs() < 1e-9);

        let remaining = w.remaining_from(Duration::from_secs_f64(70.0));
        assert!((remaining.as_secs_f64() - 9.976).abs() < 1e-9);

        // Past the end clamps to zero
        assert_eq!(
            w.remaining_from(Duration::from_secs_f64(100.0)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_absent_variant_means_native_looping() {
        assert!(loop_window(Game::AnimalCrossing, Weather::Raining, 0).is_none());
    }

    #[test]
    fn test_out_of_range_hour() {
        assert!(loop_window(Game::NewLeaf, Weather::Sunny, 24).is_none());
    }

    #[test]
    fn test_every_window_is_ordered() {
        for game in chime_common::music::ALL_GAMES {
            for weather in chime_common::music::ALL_WEATHERS {
                for hour in 0..24 {
                    if let Some(w) = loop_window(game, weather, hour) {
                        assert!(
                            w.start < w.end,
                            "window out of order for {game}/{weather}/{hour}"
                        );
                    }
                }
            }
        }
    }
}
