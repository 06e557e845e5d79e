//! Simulated audio engine
//!
//! Keeps a wall-clock position instead of decoding anything and reports the
//! end of a track when its duration has elapsed. Tracks without a known
//! duration play for a fixed fallback length.

use async_trait::async_trait;
use reprise_core::Track;
use reprise_playback::{AudioEngine, EngineEvents, PlaybackError, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Inner {
    track: Option<Track>,
    offset_ms: u64,
    started: Option<Instant>,
    volume: f32,
    end_timer: Option<CancellationToken>,
    events: Option<EngineEvents>,
}

impl Inner {
    fn position_ms(&self, length_ms: u64) -> u64 {
        let running = self
            .started
            .map_or(0, |started| started.elapsed().as_millis() as u64);
        (self.offset_ms + running).min(length_ms)
    }

    fn cancel_end_timer(&mut self) {
        if let Some(token) = self.end_timer.take() {
            token.cancel();
        }
    }
}

pub struct SimulatedEngine {
    inner: Mutex<Inner>,
    fallback_duration: Duration,
}

impl SimulatedEngine {
    pub fn new(fallback_duration: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                volume: 1.0,
                ..Inner::default()
            }),
            fallback_duration,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn length_ms(&self, track: Option<&Track>) -> u64 {
        match track {
            Some(track) if track.duration_ms > 0 => track.duration_ms,
            _ => self.fallback_duration.as_millis() as u64,
        }
    }

    /// Arm the end-of-track report for the remainder of the loaded track
    fn schedule_end(&self, inner: &mut Inner) {
        inner.cancel_end_timer();
        let Some(events) = inner.events.clone() else {
            return;
        };

        let length_ms = self.length_ms(inner.track.as_ref());
        let remaining = Duration::from_millis(length_ms.saturating_sub(inner.offset_ms));
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(remaining) => events.track_ended(),
            }
        });
        inner.end_timer = Some(token);
    }
}

#[async_trait]
impl AudioEngine for SimulatedEngine {
    async fn load(&self, track: &Track) -> Result<()> {
        let mut inner = self.lock();
        inner.cancel_end_timer();
        inner.track = Some(track.clone());
        inner.offset_ms = 0;
        inner.started = None;
        tracing::debug!("Simulated engine loaded {}", track.id);
        Ok(())
    }

    fn play(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.track.is_none() {
            return Err(PlaybackError::audio("nothing loaded"));
        }
        if inner.started.is_none() {
            inner.started = Some(Instant::now());
            self.schedule_end(&mut inner);
        }
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        let mut inner = self.lock();
        let length_ms = self.length_ms(inner.track.as_ref());
        inner.offset_ms = inner.position_ms(length_ms);
        inner.started = None;
        inner.cancel_end_timer();
        Ok(())
    }

    fn seek(&self, position_ms: u64) -> Result<()> {
        let mut inner = self.lock();
        if inner.track.is_none() {
            return Err(PlaybackError::audio("nothing loaded"));
        }
        inner.offset_ms = position_ms;
        if inner.started.is_some() {
            inner.started = Some(Instant::now());
            self.schedule_end(&mut inner);
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.cancel_end_timer();
        inner.track = None;
        inner.offset_ms = 0;
        inner.started = None;
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        let inner = self.lock();
        inner.position_ms(self.length_ms(inner.track.as_ref()))
    }

    fn set_volume(&self, volume: f32) {
        tracing::debug!("Simulated engine volume {:.2}", volume);
        self.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn attach(&self, events: EngineEvents) {
        self.lock().events = Some(events);
    }
}
