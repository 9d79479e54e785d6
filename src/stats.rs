//! Statistics over the train event stream.
//!
//! [`DockStats`] integrates dock occupancy and queue length over simulated
//! time and keeps per-train wait figures. [`ReplicationSummary`] combines
//! the per-run averages of independent replications.

use crate::config::{PreEntryWait, StatsConfig};
use crate::dock::events::{DockEvent, DockEventKind, EventSink, HogLocation, TrainId};
use crate::simulator::event_queue::SimTime;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DockState {
    Idle,
    Busy,
    /// Held by a train without a crew: hogged out in service, or reserved
    /// by a train whose replacement crew has not arrived yet.
    Hogged,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    total: f64,
    max: f64,
    count: u64,
}

impl Tally {
    fn add(&mut self, value: f64) {
        self.total += value;
        self.max = self.max.max(value);
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }

    fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    arrival: SimTime,
    in_queue: bool,
}

#[derive(Debug, Clone)]
pub struct DockStats {
    policy: PreEntryWait,
    state: DockState,
    state_since: SimTime,
    idle: f64,
    busy: f64,
    hogged: f64,
    queue_len: u32,
    max_queue_len: u32,
    queue_area: f64,
    queue_since: SimTime,
    trains: HashMap<TrainId, InFlight>,
    time_in_system: Tally,
    time_in_queue: Tally,
    hog_histogram: Vec<u64>,
    last_event: SimTime,
}

impl Default for DockStats {
    fn default() -> Self {
        Self::new(&StatsConfig::default())
    }
}

impl DockStats {
    pub fn new(config: &StatsConfig) -> Self {
        Self {
            policy: config.pre_entry_wait,
            state: DockState::Idle,
            state_since: SimTime::ZERO,
            idle: 0.0,
            busy: 0.0,
            hogged: 0.0,
            queue_len: 0,
            max_queue_len: 0,
            queue_area: 0.0,
            queue_since: SimTime::ZERO,
            trains: HashMap::new(),
            time_in_system: Tally::default(),
            time_in_queue: Tally::default(),
            hog_histogram: vec![0; config.histogram_buckets.max(1)],
            last_event: SimTime::ZERO,
        }
    }

    pub fn dock_state(&self) -> DockState {
        self.state
    }

    pub fn queue_len(&self) -> u32 {
        self.queue_len
    }

    fn set_state(&mut self, now: SimTime, next: DockState) {
        let span = now - self.state_since;
        match self.state {
            DockState::Idle => self.idle += span,
            DockState::Busy => self.busy += span,
            DockState::Hogged => self.hogged += span,
        }
        self.state = next;
        self.state_since = now;
    }

    fn set_queue_len(&mut self, now: SimTime, len: u32) {
        self.queue_area += f64::from(self.queue_len) * (now - self.queue_since);
        self.queue_since = now;
        self.queue_len = len;
        self.max_queue_len = self.max_queue_len.max(len);
    }

    fn leave_queue(&mut self, now: SimTime, train: TrainId) {
        let Some(entry) = self.trains.get_mut(&train) else {
            return;
        };
        if !entry.in_queue {
            return;
        }
        entry.in_queue = false;
        let waited = now - entry.arrival;
        self.time_in_queue.add(waited);
        self.set_queue_len(now, self.queue_len.saturating_sub(1));
    }

    pub fn summary(&self) -> RunSummary {
        let run_length = self.last_event.as_hours();
        let share = |part: f64| (run_length > 0.0).then(|| part / run_length * 100.0);
        RunSummary {
            trains_served: self.time_in_system.count,
            run_length,
            avg_time_in_system: self.time_in_system.mean(),
            max_time_in_system: self.time_in_system.max(),
            idle_time: self.idle,
            busy_time: self.busy,
            hogged_time: self.hogged,
            idle_pct: share(self.idle),
            busy_pct: share(self.busy),
            hogged_pct: share(self.hogged),
            avg_time_in_queue: self.time_in_queue.mean(),
            max_time_in_queue: self.time_in_queue.max(),
            max_queue_length: self.max_queue_len,
            avg_queue_length: (run_length > 0.0).then(|| self.queue_area / run_length),
            hog_out_histogram: self.hog_histogram.clone(),
        }
    }
}

impl EventSink for DockStats {
    fn record(&mut self, event: &DockEvent) {
        let now = event.time;
        self.last_event = now;
        match event.kind {
            DockEventKind::Arrival { .. } => {
                self.trains.insert(
                    event.train,
                    InFlight {
                        arrival: now,
                        in_queue: true,
                    },
                );
                self.set_queue_len(now, self.queue_len + 1);
            }
            DockEventKind::HogQueued { .. } => {}
            DockEventKind::DockReserved { .. } => {
                self.set_state(now, DockState::Hogged);
                if self.policy == PreEntryWait::Dock {
                    self.leave_queue(now, event.train);
                }
            }
            DockEventKind::Unhogged { location: HogLocation::Queue } => {}
            DockEventKind::DockEntry { .. } => {
                self.set_state(now, DockState::Busy);
                self.leave_queue(now, event.train);
            }
            DockEventKind::HogService { .. } => self.set_state(now, DockState::Hogged),
            DockEventKind::Unhogged { location: HogLocation::Service } => self.set_state(now, DockState::Busy),
            DockEventKind::Departure { hog_out_count } => {
                self.set_state(now, DockState::Idle);
                if let Some(entry) = self.trains.remove(&event.train) {
                    self.time_in_system.add(now - entry.arrival);
                }
                let last = self.hog_histogram.len() - 1;
                self.hog_histogram[(hog_out_count as usize).min(last)] += 1;
            }
        }
        // keep both integrals closed at the latest event
        self.set_state(now, self.state);
        self.set_queue_len(now, self.queue_len);
    }
}

/// End-of-run figures. Averages are `None` when there is nothing to average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub trains_served: u64,
    pub run_length: f64,
    pub avg_time_in_system: Option<f64>,
    pub max_time_in_system: Option<f64>,
    pub idle_time: f64,
    pub busy_time: f64,
    pub hogged_time: f64,
    pub idle_pct: Option<f64>,
    pub busy_pct: Option<f64>,
    pub hogged_pct: Option<f64>,
    pub avg_time_in_queue: Option<f64>,
    pub max_time_in_queue: Option<f64>,
    pub max_queue_length: u32,
    pub avg_queue_length: Option<f64>,
    pub hog_out_histogram: Vec<u64>,
}

struct Hours(Option<f64>);

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(h) => write!(f, "{:.6}h", h),
            None => write!(f, "no data"),
        }
    }
}

struct Percent(Option<f64>);

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(p) => write!(f, "{:.2}%", p),
            None => write!(f, "no data"),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics")?;
        writeln!(f, "----------")?;
        writeln!(f, "Total number of trains served: {}", self.trains_served)?;
        writeln!(f, "Average time-in-system per train: {}", Hours(self.avg_time_in_system))?;
        writeln!(f, "Maximum time-in-system per train: {}", Hours(self.max_time_in_system))?;
        writeln!(f, "Dock idle percentage: {}", Percent(self.idle_pct))?;
        writeln!(f, "Dock busy percentage: {}", Percent(self.busy_pct))?;
        writeln!(f, "Dock hogged-out percentage: {}", Percent(self.hogged_pct))?;
        writeln!(f, "Average time-in-queue over trains: {}", Hours(self.avg_time_in_queue))?;
        writeln!(f, "Maximum number of trains in queue: {}", self.max_queue_length)?;
        match self.avg_queue_length {
            Some(q) => writeln!(f, "Average number of trains in queue: {:.4}", q)?,
            None => writeln!(f, "Average number of trains in queue: no data")?,
        }
        writeln!(f, "Histogram of hogout count per train:")?;
        let last = self.hog_out_histogram.len().saturating_sub(1);
        for (count, trains) in self.hog_out_histogram.iter().enumerate() {
            let plus = if count == last { "+" } else { "" };
            writeln!(f, "[{}{}]: {}", count, plus, trains)?;
        }
        Ok(())
    }
}

/// Mean of per-run average time-in-system across replications, with a
/// `mean ± t·sqrt(s²/n)` confidence interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicationSummary {
    pub replications: usize,
    /// Replications that served at least one train.
    pub with_data: usize,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
    pub interval: Option<(f64, f64)>,
}

impl ReplicationSummary {
    pub fn from_runs(averages: &[Option<f64>], t: f64) -> Self {
        let samples: Vec<f64> = averages.iter().flatten().copied().collect();
        let n = samples.len();
        let mean = (n > 0).then(|| samples.iter().sum::<f64>() / n as f64);
        let variance = match mean {
            Some(m) if n > 1 => Some(samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64),
            _ => None,
        };
        let interval = match (mean, variance) {
            (Some(m), Some(v)) => {
                let half = t * (v / n as f64).sqrt();
                Some((m - half, m + half))
            }
            _ => None,
        };
        Self {
            replications: averages.len(),
            with_data: n,
            mean,
            variance,
            interval,
        }
    }
}

impl fmt::Display for ReplicationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Replications: {} ({} with completed trains)", self.replications, self.with_data)?;
        writeln!(f, "Mean of average time-in-system: {}", Hours(self.mean))?;
        match self.variance {
            Some(v) => writeln!(f, "Sample variance: {:.6}", v)?,
            None => writeln!(f, "Sample variance: no data")?,
        }
        match self.interval {
            Some((lo, hi)) => writeln!(f, "Confidence interval: [{:.6}h, {:.6}h]", lo, hi),
            None => writeln!(f, "Confidence interval: no data"),
        }
    }
}
