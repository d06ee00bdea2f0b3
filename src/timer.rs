//! Timers for the event loop. Nothing in here sleeps or spawns; the loop asks
//! for the next deadline, waits until then, and pops whatever is due. That
//! keeps every timer observable and lets tests drive time by hand.

use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

/// Shortest period a repeating timer can have. Anything shorter would never
/// move its deadline past the current instant.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Timer<T> {
    payload: T,
    deadline: Instant,
    /// Repeating timers are rescheduled by this much every time they fire
    period: Option<Duration>,
}

/// Queue of pending timers, each carrying a payload that says what to do
/// when it fires
#[derive(Debug)]
pub struct Timers<T> {
    next_id: u64,
    timers: BTreeMap<TimerId, Timer<T>>,
}

impl<T: Copy> Timers<T> {
    /// Fire once, `delay` after `now`
    pub fn once(
        &mut self,
        payload: T,
        now: Instant,
        delay: Duration,
    ) -> TimerId {
        self.insert(Timer {
            payload,
            deadline: now + delay,
            period: None,
        })
    }

    /// Fire every `period`, starting one period after `now`. Periods under a
    /// millisecond are rounded up to one.
    pub fn every(
        &mut self,
        payload: T,
        now: Instant,
        period: Duration,
    ) -> TimerId {
        let period = period.max(MIN_PERIOD);
        self.insert(Timer {
            payload,
            deadline: now + period,
            period: Some(period),
        })
    }

    /// Cancel a timer. Return whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Number of pending timers carrying `payload`
    #[cfg(test)]
    pub fn count(&self, payload: T) -> usize
    where
        T: PartialEq,
    {
        self.timers
            .values()
            .filter(|timer| timer.payload == payload)
            .count()
    }

    /// When the loop next needs to wake up, if ever
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|timer| timer.deadline).min()
    }

    /// Take the earliest timer that is due at `now`. Ties go to the timer
    /// created first. Repeating timers stay in the queue with their next
    /// deadline, which is always after `now`; ticks missed while the loop was
    /// busy are skipped rather than fired in a burst.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, T)> {
        let (&id, _) = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .min_by_key(|(id, timer)| (timer.deadline, **id))?;
        let timer = self.timers.get_mut(&id)?;
        let payload = timer.payload;
        match timer.period {
            Some(period) => {
                timer.deadline += period;
                if timer.deadline <= now {
                    timer.deadline = now + period;
                }
            }
            None => {
                self.timers.remove(&id);
            }
        }
        Some((id, payload))
    }

    fn insert(&mut self, timer: Timer<T>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(id, timer);
        id
    }
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            timers: BTreeMap::new(),
        }
    }
}

/// Owner of the one polling timer. Starting always cancels the old timer
/// first, so there is never more than one poll alive.
#[derive(Debug, Default)]
pub struct PollHandle(Option<TimerId>);

impl PollHandle {
    pub fn start<T: Copy>(
        &mut self,
        timers: &mut Timers<T>,
        payload: T,
        now: Instant,
        period: Duration,
    ) -> TimerId {
        self.stop(timers);
        let id = timers.every(payload, now, period);
        self.0 = Some(id);
        id
    }

    /// Cancel the poll. Safe to call when nothing is running. Return whether
    /// a timer was actually cancelled.
    pub fn stop<T: Copy>(&mut self, timers: &mut Timers<T>) -> bool {
        match self.0.take() {
            Some(id) => timers.cancel(id),
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.0.is_some()
    }

    pub fn id(&self) -> Option<TimerId> {
        self.0
    }
}
