//! Stochastic flare alert.
//!
//! Two states. Every check draws a uniform number; a draw above the threshold
//! moves `Idle` to `Active`, and `Active` falls back to `Idle` exactly
//! `duration` after it was entered. Checks made while `Active` are still
//! drawn and counted but never re-arm or extend the pending expiry. A check
//! landing on the expiry instant sees `Idle` and reports
//! [`Transition::Rearmed`] if it activates again.
//!
//! [`AlertMachine`] is the pure transition logic, driven by explicit
//! instants. [`AlertEngine`] runs it on a tokio task and publishes each
//! change through a watch channel.

use std::time::Duration;

use log::{debug, info};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::DashboardConfig;
use crate::random::RandomSource;
use crate::scheduler::Shutdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    #[default]
    Idle,
    Active,
}

impl AlertState {
    pub fn is_active(self) -> bool {
        self == AlertState::Active
    }
}

/// What a single check or expiry poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Activated,
    Expired,
    /// The pending alert expired at this instant and the same check
    /// activated a new one.
    Rearmed,
}

/// Published alert status.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AlertStatus {
    pub state: AlertState,
    /// Number of `Idle -> Active` transitions so far.
    pub activations: u64,
    /// Number of checks drawn so far.
    pub checks: u64,
    pub last_draw: Option<f64>,
}

// ---------------------------------------------------------------------------
// AlertMachine
// ---------------------------------------------------------------------------

/// Pure alert state machine. Holds at most one pending expiry.
#[derive(Debug, Clone)]
pub struct AlertMachine {
    threshold: f64,
    duration: Duration,
    expires_at: Option<Instant>,
    status: AlertStatus,
}

impl AlertMachine {
    pub fn new(threshold: f64, duration: Duration) -> Self {
        Self {
            threshold,
            duration,
            expires_at: None,
            status: AlertStatus::default(),
        }
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn state(&self) -> AlertState {
        self.status.state
    }

    /// Instant at which the active alert lapses, if one is active.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Periodic check with a fresh draw in `[0, 1)`.
    pub fn on_check(&mut self, now: Instant, draw: f64) -> Transition {
        // Lapse first so a check landing on the expiry instant sees Idle.
        let expired = self.poll_expiry(now) == Transition::Expired;
        self.status.checks += 1;
        self.status.last_draw = Some(draw);

        if self.status.state.is_active() || draw <= self.threshold {
            return if expired {
                Transition::Expired
            } else {
                Transition::None
            };
        }
        self.status.state = AlertState::Active;
        self.status.activations += 1;
        self.expires_at = Some(now + self.duration);
        if expired {
            Transition::Rearmed
        } else {
            Transition::Activated
        }
    }

    /// Move back to `Idle` if the pending expiry has been reached.
    pub fn poll_expiry(&mut self, now: Instant) -> Transition {
        match self.expires_at {
            Some(at) if now >= at => {
                self.expires_at = None;
                self.status.state = AlertState::Idle;
                Transition::Expired
            }
            _ => Transition::None,
        }
    }
}

// ---------------------------------------------------------------------------
// AlertEngine
// ---------------------------------------------------------------------------

/// Running alert task. Dropping the handle stops it.
pub struct AlertEngine {
    shutdown: Shutdown,
    status: watch::Receiver<AlertStatus>,
    task: Option<JoinHandle<()>>,
}

impl AlertEngine {
    /// Start checking every `alert_check_interval`; the first check happens
    /// one interval after start.
    pub fn spawn(config: &DashboardConfig, mut rng: Box<dyn RandomSource>) -> Self {
        let period = config.alert_check_interval.max(Duration::from_millis(1));
        let mut machine = AlertMachine::new(config.alert_threshold, config.alert_duration);
        let (tx, status) = watch::channel(machine.status());
        let shutdown = Shutdown::new();
        let token = shutdown.clone();

        debug!(
            "alert: checking every {period:?}, threshold {}, duration {:?}",
            config.alert_threshold, config.alert_duration
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let expiry = machine.expires_at();
                let transition = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep_until(expiry.unwrap_or_else(Instant::now)),
                        if expiry.is_some() =>
                    {
                        machine.poll_expiry(Instant::now())
                    }
                    _ = ticker.tick() => {
                        let draw = rng.uniform();
                        machine.on_check(Instant::now(), draw)
                    }
                };

                match transition {
                    Transition::Activated => info!(
                        "alert: ACTIVE (draw {:.3})",
                        machine.status().last_draw.unwrap_or_default()
                    ),
                    Transition::Expired => info!("alert: cleared"),
                    Transition::Rearmed => info!(
                        "alert: cleared and ACTIVE again (draw {:.3})",
                        machine.status().last_draw.unwrap_or_default()
                    ),
                    Transition::None => {}
                }
                tx.send_replace(machine.status());
            }
            debug!("alert: stopped");
        });

        Self {
            shutdown,
            status,
            task: Some(task),
        }
    }

    pub fn status(&self) -> AlertStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AlertStatus> {
        self.status.clone()
    }

    /// Stop checking. Idempotent.
    pub fn teardown(&self) {
        self.shutdown.trigger();
    }

    pub async fn join(mut self) {
        self.teardown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for AlertEngine {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Scripted;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn machine_starts_idle() {
        let m = AlertMachine::new(0.8, secs(3.0));
        assert_eq!(m.state(), AlertState::Idle);
        assert_eq!(m.expires_at(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn machine_threshold_is_strict() {
        let t0 = Instant::now();
        let mut m = AlertMachine::new(0.8, secs(3.0));
        assert_eq!(m.on_check(t0, 0.8), Transition::None);
        assert_eq!(m.on_check(t0, 0.80001), Transition::Activated);
    }

    #[tokio::test(start_paused = true)]
    async fn machine_expires_exactly_after_duration() {
        let t0 = Instant::now();
        let mut m = AlertMachine::new(0.8, secs(3.0));
        assert_eq!(m.on_check(t0, 0.9), Transition::Activated);
        assert_eq!(m.expires_at(), Some(t0 + secs(3.0)));
        assert_eq!(m.poll_expiry(t0 + secs(2.999)), Transition::None);
        assert!(m.state().is_active());
        assert_eq!(m.poll_expiry(t0 + secs(3.0)), Transition::Expired);
        assert_eq!(m.state(), AlertState::Idle);
        assert_eq!(m.expires_at(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn checks_while_active_do_not_extend() {
        let t0 = Instant::now();
        let mut m = AlertMachine::new(0.8, secs(3.0));
        m.on_check(t0, 0.95);
        assert_eq!(m.on_check(t0 + secs(1.0), 0.99), Transition::None);
        assert_eq!(m.on_check(t0 + secs(2.0), 0.99), Transition::None);
        assert_eq!(m.expires_at(), Some(t0 + secs(3.0)));
        assert_eq!(m.status().activations, 1);
        assert_eq!(m.status().checks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn check_on_expiry_instant_can_rearm() {
        let t0 = Instant::now();
        let mut m = AlertMachine::new(0.8, secs(3.0));
        m.on_check(t0, 0.9);
        assert_eq!(m.on_check(t0 + secs(3.0), 0.9), Transition::Rearmed);
        assert_eq!(m.status().activations, 2);
        assert_eq!(m.expires_at(), Some(t0 + secs(6.0)));
        assert_eq!(m.on_check(t0 + secs(6.0), 0.1), Transition::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn every_activation_reports_one_expiry() {
        let t0 = Instant::now();
        let mut m = AlertMachine::new(0.8, secs(3.0));
        let mut expiries = 0;
        for i in 0..5 {
            match m.on_check(t0 + secs(3.0 * i as f64), 0.9) {
                Transition::Expired | Transition::Rearmed => expiries += 1,
                _ => {}
            }
        }
        if m.poll_expiry(t0 + secs(15.0)) == Transition::Expired {
            expiries += 1;
        }
        assert_eq!(m.status().activations, 5);
        assert_eq!(expiries, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn engine_activates_at_first_check_and_clears_three_seconds_later() {
        let config = DashboardConfig::default();
        let engine = AlertEngine::spawn(&config, Box::new(Scripted::constant(0.9)));

        tokio::time::sleep(secs(14.9)).await;
        assert_eq!(engine.status().state, AlertState::Idle);
        assert_eq!(engine.status().checks, 0);

        tokio::time::sleep(secs(0.2)).await; // t = 15.1
        assert_eq!(engine.status().state, AlertState::Active);
        assert_eq!(engine.status().activations, 1);

        tokio::time::sleep(secs(2.8)).await; // t = 17.9
        assert!(engine.status().state.is_active());

        tokio::time::sleep(secs(0.2)).await; // t = 18.1
        assert_eq!(engine.status().state, AlertState::Idle);
        assert_eq!(engine.status().activations, 1);
        engine.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn engine_never_rearms_while_active() {
        let config = DashboardConfig {
            alert_check_interval: secs(1.0),
            ..Default::default()
        };
        let engine = AlertEngine::spawn(&config, Box::new(Scripted::constant(0.9)));

        // Activated at t=1; checks at 2 and 3 fall inside the window.
        tokio::time::sleep(secs(3.5)).await;
        let s = engine.status();
        assert!(s.state.is_active());
        assert_eq!(s.activations, 1);
        assert_eq!(s.checks, 3);

        // Expired at t=4, and the check at t=4 starts a fresh activation.
        tokio::time::sleep(secs(1.0)).await;
        assert_eq!(engine.status().activations, 2);
        engine.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn low_draws_keep_engine_idle() {
        let config = DashboardConfig {
            alert_check_interval: secs(1.0),
            ..Default::default()
        };
        let engine = AlertEngine::spawn(&config, Box::new(Scripted::new(vec![0.1, 0.5, 0.8])));
        tokio::time::sleep(secs(10.5)).await;
        let s = engine.status();
        assert_eq!(s.state, AlertState::Idle);
        assert_eq!(s.activations, 0);
        assert_eq!(s.checks, 10);
        engine.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_checks() {
        let config = DashboardConfig {
            alert_check_interval: secs(1.0),
            ..Default::default()
        };
        let engine = AlertEngine::spawn(&config, Box::new(Scripted::constant(0.1)));
        tokio::time::sleep(secs(2.5)).await;
        engine.teardown();
        engine.teardown();
        tokio::time::sleep(secs(10.0)).await;
        assert_eq!(engine.status().checks, 2);
    }
}
