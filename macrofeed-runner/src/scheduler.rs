//! Run scheduler: alternate between running a pass and sleeping.
//!
//! ```text
//!            ┌──────────────┐  pass done   ┌──────────────┐
//!  start ──▶ │ RunningPass  │ ───────────▶ │ IdleWait(d)  │
//!            └──────────────┘ ◀─────────── └──────────────┘
//!                   │           slept d
//!                   │ pass limit reached
//!                   ▼
//!               Stopped
//! ```
//!
//! Sleeping goes through `Sleeper` and jitter through a seeded `StdRng`, so
//! the state machine can be driven in tests without waiting on real time.

use crate::context::RunContext;
use crate::pass::{run_pass, PassOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    RunningPass,
    IdleWait(Duration),
    Stopped,
}

/// Blocks the scheduler between passes.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Idle delay: `base` plus a uniform offset in `[-jitter, +jitter]` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterPolicy {
    base_secs: u64,
    jitter_secs: u64,
}

impl JitterPolicy {
    pub fn new(base_secs: u64, jitter_secs: u64) -> Self {
        Self {
            base_secs,
            jitter_secs,
        }
    }

    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.jitter_secs == 0 {
            return Duration::from_secs(self.base_secs);
        }
        let jitter = self.jitter_secs as i64;
        let offset = rng.gen_range(-jitter..=jitter);
        let secs = (self.base_secs as i64).saturating_add(offset).max(0);
        Duration::from_secs(secs as u64)
    }

    /// Smallest and largest delay this policy can produce.
    pub fn bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.base_secs.saturating_sub(self.jitter_secs)),
            Duration::from_secs(self.base_secs.saturating_add(self.jitter_secs)),
        )
    }
}

pub struct Scheduler<'a, S: Sleeper> {
    ctx: &'a RunContext,
    sleeper: S,
    rng: StdRng,
    jitter: JitterPolicy,
    max_passes: Option<u64>,
    state: SchedulerState,
    passes_run: u64,
    last_outcome: Option<PassOutcome>,
}

impl<'a, S: Sleeper> Scheduler<'a, S> {
    pub fn new(ctx: &'a RunContext, sleeper: S) -> Self {
        let rng = match ctx.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            ctx,
            sleeper,
            rng,
            jitter: JitterPolicy::new(ctx.config.interval_secs, ctx.config.jitter_secs),
            max_passes: ctx.config.max_passes(),
            state: SchedulerState::RunningPass,
            passes_run: 0,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn passes_run(&self) -> u64 {
        self.passes_run
    }

    pub fn last_outcome(&self) -> Option<&PassOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Perform one transition and return the new state.
    pub fn step(&mut self) -> SchedulerState {
        let next = match self.state {
            SchedulerState::RunningPass => {
                self.passes_run += 1;
                let outcome = run_pass(self.ctx, self.passes_run);
                if let PassOutcome::Completed(report) = &outcome {
                    info!(
                        pass = report.pass,
                        categories = report.categories.len(),
                        built = report.built_categories().len(),
                        failed_entries = report.failed_entries(),
                        "pass complete"
                    );
                }
                self.last_outcome = Some(outcome);

                if self.max_passes.is_some_and(|max| self.passes_run >= max) {
                    info!(passes = self.passes_run, "pass limit reached, stopping");
                    SchedulerState::Stopped
                } else {
                    let delay = self.jitter.next_delay(&mut self.rng);
                    info!(sleep_secs = delay.as_secs(), "sleeping until next pass");
                    SchedulerState::IdleWait(delay)
                }
            }
            SchedulerState::IdleWait(delay) => {
                self.sleeper.sleep(delay);
                SchedulerState::RunningPass
            }
            SchedulerState::Stopped => SchedulerState::Stopped,
        };
        self.state = next;
        next
    }

    /// Step until `Stopped`. Without a pass limit this never returns.
    pub fn run(&mut self) -> u64 {
        while self.step() != SchedulerState::Stopped {}
        self.passes_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_jitter_is_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        let policy = JitterPolicy::new(100, 0);
        assert_eq!(policy.next_delay(&mut rng), Duration::from_secs(100));
    }

    #[test]
    fn delays_stay_within_bounds_and_vary() {
        let mut rng = StdRng::seed_from_u64(42);
        let policy = JitterPolicy::new(21_600, 900);
        let (lo, hi) = policy.bounds();
        assert_eq!(lo, Duration::from_secs(20_700));
        assert_eq!(hi, Duration::from_secs(22_500));

        let delays: Vec<Duration> = (0..200).map(|_| policy.next_delay(&mut rng)).collect();
        assert!(delays.iter().all(|d| *d >= lo && *d <= hi));
        assert!(delays.iter().any(|d| *d != delays[0]));
    }

    #[test]
    fn same_seed_same_delays() {
        let policy = JitterPolicy::new(600, 60);
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        for _ in 0..10 {
            assert_eq!(policy.next_delay(&mut a), policy.next_delay(&mut b));
        }
    }

    #[test]
    fn jitter_larger_than_base_clamps_at_zero() {
        let policy = JitterPolicy::new(1, 5);
        assert_eq!(policy.bounds().0, Duration::ZERO);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert!(policy.next_delay(&mut rng) <= Duration::from_secs(6));
        }
    }
}
