use std::future::pending;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Cancelable periodic timer driving the HIT reports. The interval is owned
/// here and only ever touched from the reporter actor task, so stopping it is
/// deterministic: once `stop` returns, no tick can fire.
#[derive(Debug)]
pub struct Heartbeat {
    period: Duration,
    interval: Option<Interval>,
}

impl Heartbeat {
    /// `period` must be strictly positive; config enforces this before
    /// construction.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Schedules the interval if it is not already running. The first tick
    /// fires one full period after start, never immediately.
    pub fn start(&mut self) {
        if self.interval.is_some() {
            return;
        }
        tracing::debug!(period_secs = self.period.as_secs(), "heartbeat started");
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    /// Cancels the interval. Idempotent.
    pub fn stop(&mut self) {
        if self.interval.take().is_some() {
            tracing::debug!("heartbeat stopped");
        }
    }

    /// Discards the current interval so the next [`Heartbeat::start`]
    /// schedules from a clean origin instead of resuming a stale phase. Ticks
    /// resume on the next play, not here.
    pub fn reset(&mut self) {
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    /// Completes on the next tick; pends forever while stopped, which makes it
    /// safe to park in a `select!` branch.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => pending::<()>().await,
        }
    }
}
