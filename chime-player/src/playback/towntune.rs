//! The interstitial jingle ("town tune") played once at true hour
//! boundaries, modeled as a 16-step monophonic tune.
//!
//! A step is either a pitched note, a rest, a sustain (extends the previous
//! note), or a wildcard resolved to a uniformly random pitch per
//! performance. Resolution produces a flat segment list the sink can
//! synthesize directly.

use std::time::Duration;

use rand::Rng;

/// Beats per minute when the tune plays at the hour.
pub const TUNE_BPM: f64 = 66.0;

/// Concrete pitches a tune step can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pitch {
    G1,
    A1,
    B1,
    C2,
    D2,
    E2,
    F2,
    G2,
    A2,
    B2,
    C3,
    D3,
    E3,
}

/// All pitches, used when resolving the wildcard step.
pub const ALL_PITCHES: [Pitch; 13] = [
    Pitch::G1,
    Pitch::A1,
    Pitch::B1,
    Pitch::C2,
    Pitch::D2,
    Pitch::E2,
    Pitch::F2,
    Pitch::G2,
    Pitch::A2,
    Pitch::B2,
    Pitch::C3,
    Pitch::D3,
    Pitch::E3,
];

impl Pitch {
    /// Fundamental frequency in Hz.
    pub fn frequency(&self) -> f32 {
        match self {
            Pitch::G1 => 392.0,
            Pitch::A1 => 440.0,
            Pitch::B1 => 494.0,
            Pitch::C2 => 523.0,
            Pitch::D2 => 587.0,
            Pitch::E2 => 659.0,
            Pitch::F2 => 698.0,
            Pitch::G2 => 784.0,
            Pitch::A2 => 880.0,
            Pitch::B2 => 988.0,
            Pitch::C3 => 1046.0,
            Pitch::D3 => 1174.0,
            Pitch::E3 => 1318.0,
        }
    }
}

/// One step of an authored tune.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneStep {
    /// Silence for one step.
    Rest,
    /// Extends the previous note by one step.
    Sustain,
    /// A concrete note.
    Note(Pitch),
    /// Resolved to a uniformly random pitch at performance time.
    Random,
}

/// An authored tune: a fixed sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TownTune {
    steps: Vec<TuneStep>,
}

/// One synthesizable segment: a tone (or silence) for a duration.
#[derive(Debug, Clone, PartialEq)]
pub struct TuneSegment {
    /// Tone frequency, or `None` for silence.
    pub frequency: Option<f32>,
    pub duration: Duration,
}

/// A tune with every wildcard resolved, ready for the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformedTune {
    pub segments: Vec<TuneSegment>,
    step: Duration,
}

impl Default for TownTune {
    fn default() -> Self {
        use TuneStep::{Note, Random, Rest, Sustain};
        Self {
            steps: vec![
                Note(Pitch::C3),
                Note(Pitch::E3),
                Note(Pitch::C3),
                Note(Pitch::G2),
                Note(Pitch::F2),
                Note(Pitch::G2),
                Note(Pitch::B2),
                Note(Pitch::D3),
                Note(Pitch::C3),
                Rest,
                Random,
                Rest,
                Note(Pitch::C3),
                Sustain,
                Sustain,
                Rest,
            ],
        }
    }
}

impl TownTune {
    /// Duration of one step at the given tempo.
    pub fn step_duration(bpm: f64) -> Duration {
        Duration::from_secs_f64(60.0 / bpm)
    }

    /// Resolves wildcards and folds sustain steps into their notes,
    /// producing the flat segment list a sink can render.
    pub fn perform<R: Rng>(&self, bpm: f64, rng: &mut R) -> PerformedTune {
        let step = Self::step_duration(bpm);
        let mut segments: Vec<TuneSegment> = Vec::new();

        let mut i = 0;
        while i < self.steps.len() {
            let frequency = match self.steps[i] {
                TuneStep::Rest => None,
                // A sustain with no note in flight is silence
                TuneStep::Sustain => None,
                TuneStep::Note(pitch) => Some(pitch.frequency()),
                TuneStep::Random => {
                    let pick = rng.gen_range(0..ALL_PITCHES.len());
                    Some(ALL_PITCHES[pick].frequency())
                }
            };

            // Count trailing sustains; they extend this segment
            let mut held = 1u32;
            if frequency.is_some() {
                while i + (held as usize) < self.steps.len()
                    && self.steps[i + held as usize] == TuneStep::Sustain
                {
                    held += 1;
                }
            }

            segments.push(TuneSegment {
                frequency,
                duration: step * held,
            });
            i += held as usize;
        }

        PerformedTune { segments, step }
    }
}

impl PerformedTune {
    /// Ring-out tail after the last step.
    pub fn tail(&self) -> Duration {
        self.step * 2
    }

    /// Total performance length: the tune body plus the ring-out tail.
    pub fn duration(&self) -> Duration {
        let body: Duration = self.segments.iter().map(|s| s.duration).sum();
        body + self.tail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_step_duration_at_tune_bpm() {
        let step = TownTune::step_duration(TUNE_BPM);
        assert!((step.as_secs_f64() - 60.0 / 66.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_tune_performance_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let tune = TownTune::default();
        let performed = tune.perform(TUNE_BPM, &mut rng);

        // 16 steps fold into 14 segments: the two sustains merge into the
        // preceding C3.
        assert_eq!(performed.segments.len(), 14);

        let step = TownTune::step_duration(TUNE_BPM);
        let held = &performed.segments[12];
        assert_eq!(held.frequency, Some(Pitch::C3.frequency()));
        assert_eq!(held.duration, step * 3);

        // Body is the full 16 steps, tail adds two more
        assert_eq!(performed.duration(), step * 18);
    }

    #[test]
    fn test_wildcard_resolves_to_catalog_pitch() {
        let tune = TownTune::default();
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let performed = tune.perform(TUNE_BPM, &mut rng);
            let wildcard = performed.segments[10]
                .frequency
                .expect("wildcard resolves to a tone");
            assert!(ALL_PITCHES.iter().any(|p| p.frequency() == wildcard));
        }
    }

    #[test]
    fn test_leading_sustain_is_silence() {
        let tune = TownTune {
            steps: vec![TuneStep::Sustain, TuneStep::Note(Pitch::A2)],
        };
        let mut rng = StdRng::seed_from_u64(0);
        let performed = tune.perform(TUNE_BPM, &mut rng);
        assert_eq!(performed.segments[0].frequency, None);
        assert_eq!(performed.segments[1].frequency, Some(Pitch::A2.frequency()));
    }
}
