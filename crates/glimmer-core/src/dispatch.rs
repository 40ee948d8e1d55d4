// ── Command admission controller ──
//
// Single-flight gatekeeper between arbitrarily-paced intent producers and
// a strip that must never see overlapping commands and may hang. Policy:
//
// - color intents are admitted only when the gate is free; otherwise they
//   are dropped, never queued (freshness over completeness);
// - every admitted color command races a fixed timeout; a late resolution
//   keeps running detached and its result is discarded;
// - a staleness watchdog force-opens the gate if an in-flight marker
//   outlives its threshold, so one stuck call cannot wedge the pipeline;
// - power/brightness intents bypass the gate and dispatch directly; they
//   may interleave with an in-flight color command on the same link.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::device::Strip;
use crate::error::CoreError;
use crate::model::{Intent, Outcome, Rgb};

/// Tunables for the admission gate.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Race window for one admitted color command.
    pub command_timeout: Duration,
    /// Age past which an in-flight marker is considered stuck and is
    /// force-cleared before the next admission decision.
    pub staleness_threshold: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(500),
            staleness_threshold: Duration::from_millis(1000),
        }
    }
}

/// Gate state. Touched only by the dispatcher's own transitions; the lock
/// is never held across an await point.
#[derive(Debug, Default)]
struct DispatchState {
    in_flight: bool,
    last_dispatch: Option<Instant>,
}

/// The single-flight dispatcher for one connected strip.
///
/// Cheaply cloneable; one instance per strip connection, injected into
/// every producer (HTTP handlers, the sample forwarder, the CLI).
pub struct Dispatcher<S: Strip> {
    strip: Arc<S>,
    config: DispatchConfig,
    state: Arc<Mutex<DispatchState>>,
}

impl<S: Strip> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            strip: Arc::clone(&self.strip),
            config: self.config,
            state: Arc::clone(&self.state),
        }
    }
}

/// Clears the in-flight marker on drop, so every exit path from an
/// admitted dispatch — success, failure, timeout, cancellation — releases
/// the gate.
struct GateRelease {
    state: Arc<Mutex<DispatchState>>,
}

impl Drop for GateRelease {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.in_flight = false;
        }
    }
}

impl<S: Strip> Dispatcher<S> {
    pub fn new(strip: S, config: DispatchConfig) -> Self {
        Self {
            strip: Arc::new(strip),
            config,
            state: Arc::new(Mutex::new(DispatchState::default())),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Submit one intent.
    ///
    /// Power and brightness are rare, human-initiated, and not
    /// rate-limited: they are awaited directly and their outcome is
    /// reported synchronously. Color goes through admission.
    pub async fn submit(&self, intent: Intent) -> Result<Outcome, CoreError> {
        match intent {
            Intent::SetColor(color) => self.dispatch_color(color).await,
            Intent::SetPower { on } => {
                self.strip.set_power(on).await?;
                Ok(Outcome::Delivered)
            }
            Intent::SetBrightness { level } => {
                self.strip.set_brightness(level.min(100)).await?;
                Ok(Outcome::Delivered)
            }
        }
    }

    async fn dispatch_color(&self, color: Rgb) -> Result<Outcome, CoreError> {
        let now = Instant::now();

        // Admission decision under the lock; no await while held.
        {
            let mut state = self.state.lock().expect("dispatch state lock poisoned");
            if state.in_flight {
                let stuck = state
                    .last_dispatch
                    .is_none_or(|t| now.duration_since(t) > self.config.staleness_threshold);
                if stuck {
                    warn!(
                        threshold_ms = millis(self.config.staleness_threshold),
                        "in-flight command outlived staleness threshold; forcing gate open"
                    );
                    state.in_flight = false;
                } else {
                    trace!("color intent dropped; dispatch in progress");
                    return Ok(Outcome::Skipped);
                }
            }
            state.in_flight = true;
            state.last_dispatch = Some(now);
        }

        let _gate = GateRelease {
            state: Arc::clone(&self.state),
        };

        // The strip call runs detached so that a timeout only stops us
        // listening — the write itself may still complete on the link,
        // and its late result is discarded.
        let strip = Arc::clone(&self.strip);
        let call = tokio::spawn(async move { strip.set_color(color).await });

        match tokio::time::timeout(self.config.command_timeout, call).await {
            Ok(Ok(Ok(()))) => {
                trace!(%color, "color delivered");
                Ok(Outcome::Delivered)
            }
            Ok(Ok(Err(err))) => {
                debug!(error = %err, "color command failed");
                Err(err)
            }
            Ok(Err(join_err)) => Err(CoreError::Internal(format!(
                "color dispatch task failed: {join_err}"
            ))),
            Err(_) => {
                let timeout_ms = millis(self.config.command_timeout);
                warn!(timeout_ms, "color command timed out; gate released");
                Err(CoreError::CommandTimeout { timeout_ms })
            }
        }
    }

    #[cfg(test)]
    fn last_dispatch(&self) -> Option<Instant> {
        self.state
            .lock()
            .expect("dispatch state lock poisoned")
            .last_dispatch
    }

    #[cfg(test)]
    fn in_flight(&self) -> bool {
        self.state
            .lock()
            .expect("dispatch state lock poisoned")
            .in_flight
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::future::join_all;

    use super::*;

    /// What one scripted color call should do.
    #[derive(Debug, Clone, Copy)]
    enum Behavior {
        Respond(Duration),
        Fail(Duration),
        Hang,
    }

    /// Scripted strip: each color call pops the next behavior (the last
    /// one repeats). Tracks call counts and peak concurrency.
    struct FakeStrip {
        script: Mutex<VecDeque<Behavior>>,
        color_calls: AtomicUsize,
        power_calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl FakeStrip {
        fn scripted(script: impl IntoIterator<Item = Behavior>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                color_calls: AtomicUsize::new(0),
                power_calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            })
        }

        fn next_behavior(&self) -> Behavior {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                *script.front().expect("script must not be empty")
            }
        }
    }

    impl Strip for FakeStrip {
        fn set_color(&self, _color: Rgb) -> impl Future<Output = Result<(), CoreError>> + Send {
            async move {
                self.color_calls.fetch_add(1, Ordering::SeqCst);
                let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_active.fetch_max(active, Ordering::SeqCst);

                let result = match self.next_behavior() {
                    Behavior::Respond(delay) => {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    }
                    Behavior::Fail(delay) => {
                        tokio::time::sleep(delay).await;
                        Err(CoreError::Internal("injected strip failure".into()))
                    }
                    Behavior::Hang => {
                        std::future::pending::<()>().await;
                        unreachable!("pending future resolved")
                    }
                };

                self.active.fetch_sub(1, Ordering::SeqCst);
                result
            }
        }

        fn set_power(&self, _on: bool) -> impl Future<Output = Result<(), CoreError>> + Send {
            self.power_calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(()) }
        }

        fn set_brightness(&self, _level: u8) -> impl Future<Output = Result<(), CoreError>> + Send {
            async move { Ok(()) }
        }
    }

    fn config(timeout_ms: u64, staleness_ms: u64) -> DispatchConfig {
        DispatchConfig {
            command_timeout: Duration::from_millis(timeout_ms),
            staleness_threshold: Duration::from_millis(staleness_ms),
        }
    }

    fn color_intent() -> Intent {
        Intent::SetColor(Rgb::new(10, 20, 30))
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_color_submissions_admit_exactly_one() {
        let strip = FakeStrip::scripted([Behavior::Respond(Duration::from_millis(100))]);
        let dispatcher = Dispatcher::new(Arc::clone(&strip), config(500, 1000));

        let submissions = (0..5).map(|_| dispatcher.submit(color_intent()));
        let outcomes = join_all(submissions).await;

        let delivered = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(Outcome::Delivered)))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(Outcome::Skipped)))
            .count();

        assert_eq!(delivered, 1);
        assert_eq!(skipped, 4);
        assert_eq!(strip.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(strip.color_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_gate_drops_color_without_touching_state_or_strip() {
        let strip = FakeStrip::scripted([Behavior::Respond(Duration::from_millis(300))]);
        let dispatcher = Dispatcher::new(Arc::clone(&strip), config(500, 1000));

        let background = dispatcher.clone();
        let first = tokio::spawn(async move { background.submit(color_intent()).await });

        // Let the first submission enter its race.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let stamped = dispatcher.last_dispatch();
        assert!(dispatcher.in_flight());

        let second = dispatcher.submit(color_intent()).await;
        assert!(matches!(second, Ok(Outcome::Skipped)));
        assert_eq!(dispatcher.last_dispatch(), stamped, "skip must not re-stamp");
        assert_eq!(strip.color_calls.load(Ordering::SeqCst), 1);

        assert!(matches!(first.await.unwrap(), Ok(Outcome::Delivered)));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_at_race_window_and_late_result_is_discarded() {
        let strip = FakeStrip::scripted([
            Behavior::Respond(Duration::from_millis(600)),
            Behavior::Respond(Duration::ZERO),
        ]);
        let dispatcher = Dispatcher::new(Arc::clone(&strip), config(500, 1000));

        let started = Instant::now();
        let outcome = dispatcher.submit(color_intent()).await;
        let elapsed = started.elapsed();

        assert!(matches!(
            outcome,
            Err(CoreError::CommandTimeout { timeout_ms: 500 })
        ));
        assert!(
            elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(600),
            "timeout should fire at the race window, elapsed {elapsed:?}"
        );
        assert!(!dispatcher.in_flight(), "gate must be released on timeout");

        // Let the detached call resolve late; it must not flip any state.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!dispatcher.in_flight());

        // And a fresh submission is admitted immediately.
        let next = dispatcher.submit(color_intent()).await;
        assert!(matches!(next, Ok(Outcome::Delivered)));
        assert_eq!(strip.color_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn staleness_watchdog_reopens_a_stuck_gate() {
        // Timeout far beyond the staleness threshold so the watchdog is
        // the recovery path under test.
        let strip = FakeStrip::scripted([Behavior::Hang, Behavior::Respond(Duration::ZERO)]);
        let dispatcher = Dispatcher::new(Arc::clone(&strip), config(10_000, 1000));

        let background = dispatcher.clone();
        let stuck = tokio::spawn(async move { background.submit(color_intent()).await });

        // Past the staleness threshold the next submission force-resets
        // the gate and is admitted.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let outcome = dispatcher.submit(color_intent()).await;
        assert!(matches!(outcome, Ok(Outcome::Delivered)));
        assert_eq!(strip.color_calls.load(Ordering::SeqCst), 2);

        stuck.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn strip_failure_releases_the_gate() {
        let strip = FakeStrip::scripted([
            Behavior::Fail(Duration::from_millis(50)),
            Behavior::Respond(Duration::ZERO),
        ]);
        let dispatcher = Dispatcher::new(Arc::clone(&strip), config(500, 1000));

        let outcome = dispatcher.submit(color_intent()).await;
        assert!(matches!(outcome, Err(CoreError::Internal(_))));
        assert!(!dispatcher.in_flight());

        let next = dispatcher.submit(color_intent()).await;
        assert!(matches!(next, Ok(Outcome::Delivered)));
    }

    #[tokio::test(start_paused = true)]
    async fn power_bypasses_the_color_gate() {
        let strip = FakeStrip::scripted([Behavior::Hang]);
        let dispatcher = Dispatcher::new(Arc::clone(&strip), config(10_000, 10_000));

        let background = dispatcher.clone();
        let stuck = tokio::spawn(async move { background.submit(color_intent()).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(dispatcher.in_flight());

        let outcome = dispatcher.submit(Intent::SetPower { on: false }).await;
        assert!(matches!(outcome, Ok(Outcome::Delivered)));
        assert_eq!(strip.power_calls.load(Ordering::SeqCst), 1);

        stuck.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn brightness_is_clamped_to_percentage() {
        struct LevelCapture(AtomicUsize);
        impl Strip for LevelCapture {
            fn set_color(&self, _c: Rgb) -> impl Future<Output = Result<(), CoreError>> + Send {
                async move { Ok(()) }
            }
            fn set_power(&self, _on: bool) -> impl Future<Output = Result<(), CoreError>> + Send {
                async move { Ok(()) }
            }
            fn set_brightness(
                &self,
                level: u8,
            ) -> impl Future<Output = Result<(), CoreError>> + Send {
                self.0.store(usize::from(level), Ordering::SeqCst);
                async move { Ok(()) }
            }
        }

        let strip = Arc::new(LevelCapture(AtomicUsize::new(0)));
        let dispatcher = Dispatcher::new(Arc::clone(&strip), DispatchConfig::default());

        dispatcher
            .submit(Intent::SetBrightness { level: 250 })
            .await
            .unwrap();
        assert_eq!(strip.0.load(Ordering::SeqCst), 100);
    }
}
