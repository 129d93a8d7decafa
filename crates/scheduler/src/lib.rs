use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::trace;
use waveconfig::WaveAttributes;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("delay of {0}ms is not a finite, non-negative duration")]
    InvalidDelay(f64),
    #[error("deadline {0:?} after now cannot be represented")]
    DeadlineOverflow(Duration),
}

#[derive(Debug, Clone, Copy)]
struct PendingTask {
    due: Instant,
    seq: u64,
}

/// One-shot deferred tasks keyed by `K`.
///
/// Scheduling a key that is already pending replaces the earlier task, so a
/// key never fires more than once per schedule call. Fired tasks are removed.
#[derive(Debug)]
pub struct Scheduler<K> {
    pending: HashMap<K, PendingTask>,
    next_seq: u64,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K> Scheduler<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(
        &mut self,
        key: K,
        now: Instant,
        delay: Duration,
    ) -> Result<Instant, SchedulerError> {
        let due = now
            .checked_add(delay)
            .ok_or(SchedulerError::DeadlineOverflow(delay))?;
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        if self.pending.insert(key.clone(), PendingTask { due, seq }).is_some() {
            trace!(?key, "replaced pending task");
        }
        Ok(due)
    }

    pub fn schedule_ms(
        &mut self,
        key: K,
        now: Instant,
        delay_ms: f64,
    ) -> Result<Instant, SchedulerError> {
        let delay = millis_to_duration(delay_ms)?;
        self.schedule(key, now, delay)
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn due_at(&self, key: &K) -> Option<Instant> {
        self.pending.get(key).map(|task| task.due)
    }

    /// Earliest deadline, for hosts that want to sleep until the next start.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.values().map(|task| task.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns every task due at or before `now` with its
    /// deadline, earliest first.
    pub fn tick(&mut self, now: Instant) -> Vec<(K, Instant)> {
        let mut fired: Vec<(K, PendingTask)> = self
            .pending
            .iter()
            .filter(|(_, task)| task.due <= now)
            .map(|(key, task)| (key.clone(), *task))
            .collect();
        if fired.is_empty() {
            return Vec::new();
        }
        fired.sort_by(|a, b| a.1.due.cmp(&b.1.due).then(a.1.seq.cmp(&b.1.seq)));
        for (key, _) in &fired {
            self.pending.remove(key);
        }
        fired.into_iter().map(|(key, task)| (key, task.due)).collect()
    }
}

fn millis_to_duration(delay_ms: f64) -> Result<Duration, SchedulerError> {
    if !delay_ms.is_finite() || delay_ms < 0.0 {
        return Err(SchedulerError::InvalidDelay(delay_ms));
    }
    Duration::try_from_secs_f64(delay_ms / 1000.0).map_err(|_| SchedulerError::InvalidDelay(delay_ms))
}

/// Start delay of layer `index` out of `size`, in milliseconds.
///
/// `((size - index) / size) * period`: index 0 waits a full period, the last
/// layer waits `period / size`.
pub fn stagger_delay_ms(index: usize, size: usize, period_ms: f64) -> f64 {
    if size == 0 || index >= size {
        return 0.0;
    }
    ((size - index) as f64 / size as f64) * period_ms
}

/// Start delay for layer `index` out of `size`, using that layer's attributes.
pub fn stagger_delay(
    index: usize,
    size: usize,
    attributes: &WaveAttributes,
) -> Result<Duration, SchedulerError> {
    millis_to_duration(stagger_delay_ms(index, size, attributes.period_ms()))
}
