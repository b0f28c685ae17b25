/// Failure gate for the semantic collaborator

use crate::error::{MemoryError, Result};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    /// Calls are refused until the cooldown has passed.
    Open,
    /// Cooldown over; the next call is a trial.
    HalfOpen,
}

#[derive(Debug, Default)]
struct Tally {
    consecutive_failures: u32,
    tripped_at: Option<Instant>,
}

/// Skips a collaborator after `failure_threshold` failures in a row and
/// lets one call through once `cooldown` has elapsed. A successful call
/// resets everything; a failed trial call trips the gate again.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    cooldown: Duration,
    tally: Mutex<Tally>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            cooldown,
            tally: Mutex::new(Tally::default()),
        }
    }

    fn tally(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> CircuitState {
        match self.tally().tripped_at {
            None => CircuitState::Closed,
            Some(at) if at.elapsed() >= self.cooldown => CircuitState::HalfOpen,
            Some(_) => CircuitState::Open,
        }
    }

    pub fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(at) = self.tally().tripped_at {
            let waited = at.elapsed();
            if waited < self.cooldown {
                return Err(MemoryError::CircuitOpen(format!(
                    "{} skipped for another {:?}",
                    self.name,
                    self.cooldown - waited
                )));
            }
        }

        let outcome = f();

        let mut tally = self.tally();
        match &outcome {
            Ok(_) => *tally = Tally::default(),
            Err(e) => {
                tally.consecutive_failures += 1;
                let retrying = tally.tripped_at.is_some();
                if retrying || tally.consecutive_failures >= self.failure_threshold {
                    if !retrying {
                        tracing::warn!(collaborator = %self.name, error = %e, "Disabling collaborator after repeated failures");
                    }
                    tally.tripped_at = Some(Instant::now());
                }
            }
        }
        outcome
    }
}
