//! Event queue and simulation clock for the dock simulator

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Sub};

/// Virtual time, in hours since the start of the run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(transparent)]
pub struct SimTime(f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);

    /// Builds a time point. Negative and non-finite values are clamped to zero.
    pub fn from_hours(hours: f64) -> Self {
        if hours.is_finite() && hours > 0.0 {
            SimTime(hours)
        } else {
            SimTime::ZERO
        }
    }

    pub fn as_hours(self) -> f64 {
        self.0
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}
impl Eq for SimTime {}
impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl Hash for SimTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;
    fn add(self, hours: f64) -> SimTime {
        SimTime::from_hours(self.0 + hours)
    }
}

impl Sub for SimTime {
    type Output = f64;
    fn sub(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Handle for a scheduled event. Ordering is (time, insertion sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId {
    time: SimTime,
    seq: u64,
}

impl EventId {
    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Pending timed events. Equal-time events pop in the order they were pushed.
#[derive(Debug)]
pub struct SimEventQueue<T> {
    queue: BTreeMap<EventId, T>,
    next_seq: u64,
}

impl<T> Default for SimEventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SimEventQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, at: SimTime, payload: T) -> EventId {
        let id = EventId {
            time: at,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.queue.insert(id, payload);
        id
    }

    /// Removes a pending event. Returns `None` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: EventId) -> Option<T> {
        self.queue.remove(&id)
    }

    pub fn pop(&mut self) -> Option<(EventId, T)> {
        self.queue.pop_first()
    }

    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.keys().next().map(|id| id.time)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.queue.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Simulation clock
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    current_time: SimTime,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            current_time: SimTime::ZERO,
        }
    }

    pub fn now(&self) -> SimTime {
        self.current_time
    }

    /// Moves the clock forward. Time never runs backwards.
    pub fn advance_to(&mut self, t: SimTime) {
        if t > self.current_time {
            self.current_time = t;
        }
    }
}
