//! Competing-audio monitor: polls whether any other source on the host is
//! currently audible and reports flips of that aggregate flag.
//!
//! How audibility is detected is host-specific and injected as a probe;
//! the monitor only supplies the cadence and the debounce.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Poll cadence for the audibility probe.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Answers "is any unmuted competing source audible right now?".
pub trait AudibilityProbe: Send + 'static {
    fn competing_audible(&mut self) -> bool;
}

/// Probe for hosts with no competing-audio signal: never audible.
pub struct NullProbe;

impl AudibilityProbe for NullProbe {
    fn competing_audible(&mut self) -> bool {
        false
    }
}

/// Control handle for a spawned monitor.
#[derive(Clone)]
pub struct TabAudioHandle {
    force_tx: mpsc::UnboundedSender<()>,
}

impl TabAudioHandle {
    /// Forces a re-emit of the current state, bypassing the flip check.
    /// Used to reconcile after the consumer was inactive.
    pub fn recheck(&self) {
        let _ = self.force_tx.send(());
    }
}

/// Spawns the monitor loop. Flips (and forced re-emits) are delivered on
/// `flips_tx`; the task ends when the receiver is dropped.
pub fn spawn<P: AudibilityProbe>(
    mut probe: P,
    flips_tx: mpsc::UnboundedSender<bool>,
) -> (TabAudioHandle, JoinHandle<()>) {
    let (force_tx, mut force_rx) = mpsc::unbounded_channel();
    let handle = TabAudioHandle { force_tx };

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut audible = false;

        loop {
            let force = tokio::select! {
                _ = interval.tick() => false,
                cmd = force_rx.recv() => match cmd {
                    Some(()) => true,
                    None => return,
                },
            };

            let now_audible = probe.competing_audible();
            if now_audible != audible || force {
                debug!(audible = now_audible, force, "competing audio state");
                audible = now_audible;
                if flips_tx.send(now_audible).is_err() {
                    return;
                }
            }
        }
    });

    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct SharedProbe(Arc<AtomicBool>);

    impl AudibilityProbe for SharedProbe {
        fn competing_audible(&mut self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_only_flips() {
        let state = Arc::new(AtomicBool::new(false));
        let (flips_tx, mut flips_rx) = mpsc::unbounded_channel();
        let (_handle, _task) = spawn(SharedProbe(Arc::clone(&state)), flips_tx);

        // Initial quiet state matches the assumed baseline: nothing reported
        for _ in 0..3 {
            tokio::time::advance(POLL_INTERVAL).await;
            settle().await;
        }
        assert!(flips_rx.try_recv().is_err());

        state.store(true, Ordering::SeqCst);
        tokio::time::advance(POLL_INTERVAL).await;
        settle().await;
        assert_eq!(flips_rx.try_recv().unwrap(), true);

        // Steady audible state: no further reports
        tokio::time::advance(POLL_INTERVAL).await;
        settle().await;
        assert!(flips_rx.try_recv().is_err());

        state.store(false, Ordering::SeqCst);
        tokio::time::advance(POLL_INTERVAL).await;
        settle().await;
        assert_eq!(flips_rx.try_recv().unwrap(), false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recheck_bypasses_flip_check() {
        let state = Arc::new(AtomicBool::new(false));
        let (flips_tx, mut flips_rx) = mpsc::unbounded_channel();
        let (handle, _task) = spawn(SharedProbe(Arc::clone(&state)), flips_tx);

        tokio::time::advance(POLL_INTERVAL).await;
        settle().await;
        assert!(flips_rx.try_recv().is_err());

        handle.recheck();
        settle().await;
        assert_eq!(flips_rx.try_recv().unwrap(), false);
    }
}
