use crate::background::BackgroundProcess;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What a health-check tick found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthcheckTick {
    /// A drain holds the lock; nothing to do.
    Active,
    /// Queue empty, schedule disarmed.
    Disarmed,
    /// Unlocked with work queued: a trigger went missing, re-dispatched.
    Redispatched,
}

/// Recurring safety net for lost triggers.
///
/// Armed whenever a dispatch goes out, disarmed when the queue drains dry.
/// Arming is idempotent; while a ticker is alive further calls are no-ops,
/// so overlapping dispatches never stack tickers.
pub struct HealthcheckSchedule {
    tick_interval: Duration,
    armed: Mutex<Option<CancellationToken>>,
}

impl HealthcheckSchedule {
    pub fn new(tick_interval: Duration) -> Self {
        HealthcheckSchedule {
            tick_interval,
            armed: Mutex::new(None),
        }
    }

    pub fn arm(&self, process: Arc<BackgroundProcess>) {
        let mut armed = self.armed.lock().unwrap();
        if let Some(token) = armed.as_ref() {
            if !token.is_cancelled() {
                return;
            }
        }
        let token = CancellationToken::new();
        *armed = Some(token.clone());
        let tick_interval = self.tick_interval;
        tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            // the first tick fires immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match process.healthcheck_tick().await {
                            Ok(HealthcheckTick::Disarmed) => break,
                            Ok(tick) => {
                                debug!("Health check for {}: {tick:?}", process.process_id());
                            }
                            Err(err) => {
                                warn!("Health check for {} failed: {err:?}", process.process_id());
                            }
                        }
                    }
                }
            }
        });
    }

    pub fn disarm(&self) {
        if let Some(token) = self.armed.lock().unwrap().take() {
            token.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}
