//! Session timers
//!
//! Each timer is a spawned loop that reports fires over a channel until its
//! [`CancellationToken`] is cancelled. Fires carry the generation the timer
//! was started with; the session ignores fires whose generation is no longer
//! current, so a fire already queued when the timer was cancelled is harmless.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Periodic checkpoint while playing
    Checkpoint,

    /// One-shot stop after a long pause
    Inactivity,
}

/// A timer went off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Handle to a running timer; dropping it cancels the timer
#[derive(Debug)]
pub struct Timer {
    generation: u64,
    token: CancellationToken,
}

impl Timer {
    /// Fire every `period`, first after one `period`
    pub fn periodic(
        kind: TimerKind,
        generation: u64,
        period: Duration,
        tx: mpsc::Sender<TimerFired>,
    ) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        if tx.send(TimerFired { kind, generation }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { generation, token }
    }

    /// Fire once after `delay`
    pub fn once(
        kind: TimerKind,
        generation: u64,
        delay: Duration,
        tx: mpsc::Sender<TimerFired>,
    ) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = tx.send(TimerFired { kind, generation }).await;
                }
            }
        });

        Self { generation, token }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
