//! The special-track catalog and its selection rules.
//!
//! Track identifiers follow the `"<source> - <title>"` display convention.
//! Selection is uniform-random: over the user's curated subset when that
//! subset is enabled and non-empty, otherwise over the full catalog. With
//! the version mode set to `both`, each draw flips a fair coin between the
//! two concrete recording versions.

use rand::Rng;

use chime_common::music::{KkPerformance, KkVersion};

/// The full special-track catalog, in fixed order.
pub const KK_SONGS: [&str; 95] = [
    "AC - Aloha K.K.",
    "AC - Cafe K.K.",
    "AC - Comrade K.K.",
    "AC - DJ K.K.",
    "AC - Go K.K. Rider!",
    "AC - I Love You",
    "AC - Imperial K.K.",
    "AC - K.K. Aria",
    "AC - K.K. Ballad",
    "AC - K.K. Blues",
    "AC - K.K. Bossa",
    "AC - K.K. Calypso",
    "AC - K.K. Casbah",
    "AC - K.K. Chorale",
    "AC - K.K. Condor",
    "AC - K.K. Country",
    "AC - K.K. Cruisin'",
    "AC - K.K. D & B",
    "AC - K.K. Dirge",
    "AC - K.K. Etude",
    "AC - K.K. Faire",
    "AC - K.K. Folk",
    "AC - K.K. Fusion",
    "AC - K.K. Gumbo",
    "AC - K.K. Jazz",
    "AC - K.K. Lament",
    "AC - K.K. Love Song",
    "AC - K.K. Lullaby",
    "AC - K.K. Mambo",
    "AC - K.K. March",
    "AC - K.K. Parade",
    "AC - K.K. Ragtime",
    "AC - K.K. Reggae",
    "AC - K.K. Rock",
    "AC - K.K. Safari",
    "AC - K.K. Salsa",
    "AC - K.K. Samba",
    "AC - K.K. Ska",
    "AC - K.K. Song",
    "AC - K.K. Soul",
    "AC - K.K. Steppe",
    "AC - K.K. Swing",
    "AC - K.K. Tango",
    "AC - K.K. Technopop",
    "AC - K.K. Waltz",
    "AC - K.K. Western",
    "AC - Lucky K.K.",
    "AC - Mr. K.K.",
    "AC - Only Me",
    "AC - Rockin' K.K.",
    "AC - Senor K.K.",
    "AC - Soulful K.K.",
    "AC - Surfin' K.K.",
    "AC - The K. Funk",
    "AC - Two Days Ago",
    "CF - Agent K.K.",
    "CF - Forest Life",
    "CF - K.K. Dixie",
    "CF - K.K. House",
    "CF - K.K. Marathon",
    "CF - K.K. Metal",
    "CF - K.K. Rally",
    "CF - K.K. Rockabilly",
    "CF - K.K. Sonata",
    "CF - King K.K.",
    "CF - Marine Song 2001",
    "CF - Mountain Song",
    "CF - My Place",
    "CF - Neapolitan",
    "CF - Pondering",
    "CF - Spring Blossoms",
    "CF - Stale Cupcakes",
    "CF - Steep Hill",
    "CF - To the Edge",
    "CF - Wandering",
    "NL - Bubblegum K.K.",
    "NL - Hypno K.K.",
    "NL - K.K. Adventure",
    "NL - K.K. Bazaar",
    "NL - K.K. Birthday",
    "NL - K.K. Disco",
    "NL - K.K. Flamenco",
    "NL - K.K. Groove",
    "NL - K.K. Island",
    "NL - K.K. Jongara",
    "NL - K.K. Milonga",
    "NL - K.K. Moody",
    "NL - K.K. Oasis",
    "NL - K.K. Stroll",
    "NL - K.K. Synth",
    "NL - Space K.K.",
    "NH - Animal City",
    "NH - Drivin'",
    "NH - Farewell",
    "NH - Welcome Horizons",
];

/// Picks the concrete recording version for one performance.
pub fn choose_performance<R: Rng>(version: KkVersion, rng: &mut R) -> KkPerformance {
    match version {
        KkVersion::Live => KkPerformance::Live,
        KkVersion::Aircheck => KkPerformance::Aircheck,
        KkVersion::Both => {
            if rng.gen_range(0..2) == 0 {
                KkPerformance::Live
            } else {
                KkPerformance::Aircheck
            }
        }
    }
}

/// Picks the next special track.
///
/// Draws uniformly from `curated` when `curated_enabled` and the subset is
/// non-empty, otherwise uniformly from the full catalog.
pub fn choose_song<R: Rng>(curated_enabled: bool, curated: &[String], rng: &mut R) -> String {
    if curated_enabled && !curated.is_empty() {
        curated[rng.gen_range(0..curated.len())].clone()
    } else {
        KK_SONGS[rng.gen_range(0..KK_SONGS.len())].to_string()
    }
}

/// Human-facing title for a performance: the part after the source prefix,
/// annotated with the version ("Stale Cupcakes (Live Version)").
pub fn format_title(song: &str, version: KkPerformance) -> String {
    let title = song.split(" - ").nth(1).unwrap_or(song);
    format!("{} ({} Version)", title, version.title_case())
}
