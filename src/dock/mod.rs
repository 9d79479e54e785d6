//! The unloading dock model built on the scheduler.
//!
//! [`DockWorld`] is the run context: one per simulation run, owning the
//! train records, the input source and the event sink. Processes reach it
//! through the `world` argument of [`Process::resume`](crate::simulator::process::Process::resume).

pub mod arrivals;
pub mod crew;
pub mod events;
pub mod train;

use crate::config::SimConfig;
use crate::dock::arrivals::ArrivalProcess;
use crate::dock::events::{DockEvent, DockEventKind, EventSink, TrainId};
use crate::dock::train::Train;
use crate::simulator::event_queue::SimTime;
use crate::simulator::resource::ResourceId;
use crate::simulator::{Scheduler, SimError, Simulator};
use crate::source::TrainSource;
use std::collections::BTreeMap;

/// Fixed parameters of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockParams {
    /// Last time a train may arrive. `None` lets the source decide.
    pub horizon: Option<f64>,
    /// Hours between consecutive hog-outs of the same train.
    pub shift_length: f64,
}

impl DockParams {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            horizon: Some(config.simulation.horizon),
            shift_length: config.crew.shift_length,
        }
    }
}

impl Default for DockParams {
    fn default() -> Self {
        Self {
            horizon: None,
            shift_length: 12.0,
        }
    }
}

pub struct DockWorld<S> {
    params: DockParams,
    dock: ResourceId,
    trains: BTreeMap<TrainId, Train>,
    source: Box<dyn TrainSource>,
    sink: S,
    admitted: u64,
    departed: u64,
    last_event: SimTime,
}

impl<S: EventSink> DockWorld<S> {
    pub fn new(params: DockParams, dock: ResourceId, source: Box<dyn TrainSource>, sink: S) -> Self {
        Self {
            params,
            dock,
            trains: BTreeMap::new(),
            source,
            sink,
            admitted: 0,
            departed: 0,
            last_event: SimTime::ZERO,
        }
    }

    pub fn params(&self) -> &DockParams {
        &self.params
    }

    pub fn dock(&self) -> ResourceId {
        self.dock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Trains that have arrived and not yet departed.
    pub fn trains(&self) -> impl Iterator<Item = &Train> {
        self.trains.values()
    }

    pub fn find_train(&self, id: TrainId) -> Option<&Train> {
        self.trains.get(&id)
    }

    pub fn find_train_mut(&mut self, id: TrainId) -> Option<&mut Train> {
        self.trains.get_mut(&id)
    }

    pub fn train(&self, id: TrainId) -> Result<&Train, SimError> {
        self.trains
            .get(&id)
            .ok_or_else(|| SimError::Model(format!("train {id} is not in the yard")))
    }

    pub fn train_mut(&mut self, id: TrainId) -> Result<&mut Train, SimError> {
        self.trains
            .get_mut(&id)
            .ok_or_else(|| SimError::Model(format!("train {id} is not in the yard")))
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    pub fn departed(&self) -> u64 {
        self.departed
    }

    pub fn last_event(&self) -> SimTime {
        self.last_event
    }

    pub fn emit(&mut self, time: SimTime, train: TrainId, kind: DockEventKind) {
        let event = DockEvent { time, train, kind };
        self.last_event = time;
        self.sink.record(&event);
    }

    pub(crate) fn next_inter_arrival_gap(&mut self) -> Option<f64> {
        self.source.next_inter_arrival_gap()
    }

    pub(crate) fn next_replacement(&mut self) -> Result<f64, SimError> {
        self.source
            .next_replacement_duration()
            .ok_or(SimError::GeneratorExhausted("replacement crew"))
    }

    /// Draws a new train's unloading time and crew budget and registers it.
    pub(crate) fn admit_train(&mut self, now: SimTime) -> Result<&mut Train, SimError> {
        let unloading = self
            .source
            .next_unloading_duration()
            .ok_or(SimError::GeneratorExhausted("unloading duration"))?;
        let crew_budget = self
            .source
            .next_initial_crew_budget()
            .ok_or(SimError::GeneratorExhausted("initial crew"))?;
        let id = TrainId(self.admitted);
        self.admitted += 1;
        Ok(self
            .trains
            .entry(id)
            .or_insert_with(|| Train::new(id, now, unloading, crew_budget)))
    }

    pub(crate) fn remove_train(&mut self, id: TrainId) -> Result<Train, SimError> {
        let train = self
            .trains
            .remove(&id)
            .ok_or_else(|| SimError::Model(format!("train {id} departed twice")))?;
        self.departed += 1;
        Ok(train)
    }
}

/// Counters describing how a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub events: u64,
    pub trains_admitted: u64,
    pub trains_departed: u64,
    pub in_flight: usize,
    /// Time of the last train event.
    pub end_time: SimTime,
}

/// One simulation run of the dock: scheduler, run context and arrival process.
pub struct DockSimulation<S> {
    sim: Simulator<DockWorld<S>>,
}

impl<S: EventSink> DockSimulation<S> {
    pub fn new(params: DockParams, source: impl TrainSource + 'static, sink: S) -> Self {
        let mut scheduler = Scheduler::new();
        let dock = scheduler.add_resource("dock");
        let world = DockWorld::new(params, dock, Box::new(source), sink);
        let mut sim = Simulator::new(scheduler, world);
        sim.spawn(ArrivalProcess::new(params.horizon));
        Self { sim }
    }

    pub fn world(&self) -> &DockWorld<S> {
        self.sim.world()
    }

    pub fn scheduler(&self) -> &Scheduler<DockWorld<S>> {
        self.sim.scheduler()
    }

    /// Runs until arrivals stop and every train has departed.
    pub fn run(&mut self) -> Result<RunReport, SimError> {
        let events = self.sim.run_event_loop()?;
        Ok(self.report(events))
    }

    /// Runs until the next pending event lies beyond `until` hours.
    pub fn run_until(&mut self, until: f64) -> Result<RunReport, SimError> {
        let events = self.sim.run_until(SimTime::from_hours(until))?;
        Ok(self.report(events))
    }

    fn report(&self, events: u64) -> RunReport {
        let world = self.sim.world();
        let report = RunReport {
            events,
            trains_admitted: world.admitted(),
            trains_departed: world.departed(),
            in_flight: world.trains.len(),
            end_time: world.last_event(),
        };
        tracing::debug!(
            "Run finished: {} events, {} trains admitted, {} departed, last event at {}",
            report.events,
            report.trains_admitted,
            report.trains_departed,
            report.end_time
        );
        report
    }

    pub fn into_sink(self) -> S {
        self.sim.into_world().sink
    }
}
