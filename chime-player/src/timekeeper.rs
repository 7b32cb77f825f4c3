//! Wall-clock keeper: samples local time once a second, reports hour
//! boundary crossings, and classifies calendar events.

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// How often the wall clock is resampled.
pub const SAMPLE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// An hour boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourTick {
    pub day: Weekday,
    pub hour: u32,
}

/// Tracks the last-sampled wall-clock fields and detects hour changes.
#[derive(Debug)]
pub struct TimeKeeper {
    hour: u32,
    day: Weekday,
    month: u32,
    day_of_month: u32,
}

impl TimeKeeper {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            hour: now.hour(),
            day: now.weekday(),
            month: now.month(),
            day_of_month: now.day(),
        }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    /// Folds in a fresh sample. Returns the tick exactly once per hour
    /// crossing, with the stored fields already updated.
    pub fn observe(&mut self, now: DateTime<Local>) -> Option<HourTick> {
        self.day = now.weekday();
        self.month = now.month();
        self.day_of_month = now.day();

        if now.hour() != self.hour {
            self.hour = now.hour();
            return Some(HourTick {
                day: self.day,
                hour: self.hour,
            });
        }
        None
    }

    /// Classifies the current sample against the calendar-event table.
    pub fn event(&self) -> Option<&'static str> {
        calendar_event(self.month, self.day_of_month)
    }

    /// Spawns the 1 s sampling loop. Hour crossings are delivered on
    /// `tick_tx`; the task ends when the receiver is dropped.
    pub fn spawn(mut self, tick_tx: mpsc::UnboundedSender<HourTick>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SAMPLE_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Some(tick) = self.observe(Local::now()) {
                    debug!(hour = tick.hour, "hour boundary crossed");
                    if tick_tx.send(tick).is_err() {
                        return;
                    }
                }
            }
        })
    }
}

/// Returns the name of the ongoing calendar event, or `None`.
///
/// The list is evaluated in order and the first match wins, so a named
/// holiday must precede any broader seasonal window that contains it
/// (Christmas and New Year's Eve both sit inside Winter).
///
/// `month` is 1-based, `day_of_month` 1-based, as chrono reports them.
pub fn calendar_event(month: u32, day_of_month: u32) -> Option<&'static str> {
    let events: [(&'static str, bool); 4] = [
        ("Halloween", month == 10 && day_of_month == 31),
        ("Christmas", month == 12 && (24..=25).contains(&day_of_month)),
        ("NewYearsEve", month == 12 && day_of_month == 31),
        ("Winter", month == 12 || month <= 2),
    ];

    events
        .iter()
        .find(|(_, ongoing)| *ongoing)
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_no_tick_within_same_hour() {
        let mut tk = TimeKeeper::new(local(2026, 8, 6, 14, 0));
        assert_eq!(tk.observe(local(2026, 8, 6, 14, 59)), None);
        assert_eq!(tk.hour(), 14);
    }

    #[test]
    fn test_tick_on_hour_crossing() {
        let mut tk = TimeKeeper::new(local(2026, 8, 6, 14, 59));
        let tick = tk.observe(local(2026, 8, 6, 15, 0)).unwrap();
        assert_eq!(tick.hour, 15);
        assert_eq!(tick.day, Weekday::Thu);
        assert_eq!(tk.hour(), 15);

        // Only once per crossing
        assert_eq!(tk.observe(local(2026, 8, 6, 15, 30)), None);
    }

    #[test]
    fn test_tick_across_midnight_updates_day() {
        let mut tk = TimeKeeper::new(local(2026, 8, 8, 23, 59));
        let tick = tk.observe(local(2026, 8, 9, 0, 0)).unwrap();
        assert_eq!(tick.hour, 0);
        assert_eq!(tick.day, Weekday::Sun);
    }

    #[test]
    fn test_calendar_event_priority() {
        assert_eq!(calendar_event(10, 31), Some("Halloween"));
        // Named holidays win over the Winter window they sit inside
        assert_eq!(calendar_event(12, 24), Some("Christmas"));
        assert_eq!(calendar_event(12, 25), Some("Christmas"));
        assert_eq!(calendar_event(12, 31), Some("NewYearsEve"));
        assert_eq!(calendar_event(12, 10), Some("Winter"));
        assert_eq!(calendar_event(1, 15), Some("Winter"));
        assert_eq!(calendar_event(2, 28), Some("Winter"));
    }

    #[test]
    fn test_calendar_event_none() {
        assert_eq!(calendar_event(7, 4), None);
        assert_eq!(calendar_event(10, 30), None);
        assert_eq!(calendar_event(3, 1), None);
    }
}
