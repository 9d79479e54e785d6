// src/dock/train.rs - Train lifecycle: queue, dock, hog-outs, departure
use crate::dock::DockWorld;
use crate::dock::events::{DockEventKind, EventSink, HogLocation, TrainId};
use crate::simulator::event_queue::SimTime;
use crate::simulator::process::{Process, ProcessId, Step, Wake};
use crate::simulator::{Scheduler, SimError};

/// Remaining unloading below this is treated as finished.
pub const EPSILON: f64 = 1e-9;

/// Shared record of a train, read by its hog-out timer as well as its own process.
#[derive(Debug, Clone, PartialEq)]
pub struct Train {
    pub id: TrainId,
    pub arrival: SimTime,
    pub unloading: f64,
    pub unloading_remaining: f64,
    pub crew_remaining: f64,
    pub hog_out_count: u32,
    /// Set while the dock is actively unloading this train.
    pub unloading_since: Option<SimTime>,
    pub crew_process: Option<ProcessId>,
}

impl Train {
    pub fn new(id: TrainId, arrival: SimTime, unloading: f64, crew_budget: f64) -> Self {
        Self {
            id,
            arrival,
            unloading,
            unloading_remaining: unloading,
            crew_remaining: crew_budget,
            hog_out_count: 0,
            unloading_since: None,
            crew_process: None,
        }
    }

    /// Unloading work left at `now`, counting progress since unloading last resumed.
    pub fn remaining_at(&self, now: SimTime) -> f64 {
        match self.unloading_since {
            Some(since) => (self.unloading_remaining - (now - since)).max(0.0),
            None => self.unloading_remaining,
        }
    }

    /// Whether a hog-out at `now` still matters. False once unloading is done.
    pub fn is_pending(&self, now: SimTime) -> bool {
        self.remaining_at(now) > EPSILON
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainPhase {
    Arrived,
    /// In the dock queue with a working crew.
    Queued,
    /// In the dock queue waiting for a replacement crew, racing the dock grant.
    QueuedHogged { replacement: f64 },
    /// Holds the dock but cannot move in until the replacement crew arrives.
    AwaitingCrew,
    Unloading,
    HoggedInDock,
    Departed,
}

/// Main process of one train.
#[derive(Debug)]
pub struct TrainProcess {
    id: TrainId,
    phase: TrainPhase,
}

impl TrainProcess {
    pub fn new(id: TrainId) -> Self {
        Self {
            id,
            phase: TrainPhase::Arrived,
        }
    }

    pub fn phase(&self) -> TrainPhase {
        self.phase
    }

    fn start_unloading<S: EventSink>(&mut self, now: SimTime, world: &mut DockWorld<S>) -> Result<Step, SimError> {
        let train = world.train_mut(self.id)?;
        train.unloading_since = Some(now);
        self.phase = TrainPhase::Unloading;
        Ok(Step::WaitFor(train.unloading_remaining))
    }

    fn enter_dock<S: EventSink>(&mut self, now: SimTime, world: &mut DockWorld<S>) -> Result<Step, SimError> {
        let train = world.train(self.id)?;
        let kind = DockEventKind::DockEntry {
            unloading: train.unloading_remaining,
            crew_remaining: train.crew_remaining,
        };
        world.emit(now, self.id, kind);
        self.start_unloading(now, world)
    }

    /// Calls in a replacement crew; the new crew's shift starts now.
    fn call_replacement<S: EventSink>(&mut self, world: &mut DockWorld<S>) -> Result<f64, SimError> {
        let replacement = world.next_replacement()?;
        let shift = world.params().shift_length;
        world.train_mut(self.id)?.crew_remaining = shift - replacement;
        Ok(replacement)
    }

    fn depart<S: EventSink>(
        &mut self,
        now: SimTime,
        sched: &mut Scheduler<DockWorld<S>>,
        world: &mut DockWorld<S>,
    ) -> Result<Step, SimError> {
        let train = world.remove_train(self.id)?;
        world.emit(
            now,
            self.id,
            DockEventKind::Departure {
                hog_out_count: train.hog_out_count,
            },
        );
        sched.release(world.dock())?;
        if let Some(crew) = train.crew_process {
            sched.kill(crew)?;
        }
        self.phase = TrainPhase::Departed;
        Ok(Step::Done)
    }
}

impl<S: EventSink> Process<DockWorld<S>> for TrainProcess {
    fn label(&self) -> &'static str {
        "train"
    }

    fn resume(
        &mut self,
        sched: &mut Scheduler<DockWorld<S>>,
        world: &mut DockWorld<S>,
        wake: Wake,
    ) -> Result<Step, SimError> {
        let now = sched.now();
        let dock = world.dock();
        match (self.phase, wake) {
            (TrainPhase::Arrived, Wake::Start) => {
                let train = world.train(self.id)?;
                let kind = DockEventKind::Arrival {
                    unloading: train.unloading,
                    crew_remaining: train.crew_remaining,
                };
                world.emit(now, self.id, kind);
                self.phase = TrainPhase::Queued;
                Ok(Step::Acquire(dock))
            }
            (TrainPhase::Queued, Wake::Granted { elapsed }) => {
                world.train_mut(self.id)?.crew_remaining -= elapsed;
                self.enter_dock(now, world)
            }
            (TrainPhase::Queued | TrainPhase::QueuedHogged { .. }, Wake::Interrupted { .. }) => {
                let replacement = self.call_replacement(world)?;
                world.emit(now, self.id, DockEventKind::HogQueued { replacement });
                self.phase = TrainPhase::QueuedHogged { replacement };
                Ok(Step::RaceAcquireOrTimeout(dock, replacement))
            }
            (TrainPhase::QueuedHogged { .. }, Wake::Timeout { .. }) => {
                // crew is back before the dock freed up; keep waiting in line
                world.emit(now, self.id, DockEventKind::Unhogged { location: HogLocation::Queue });
                self.phase = TrainPhase::Queued;
                Ok(Step::Acquire(dock))
            }
            (TrainPhase::QueuedHogged { replacement }, Wake::Granted { elapsed }) => {
                let crew_due_in = (replacement - elapsed).max(0.0);
                world.emit(now, self.id, DockEventKind::DockReserved { crew_due_in });
                self.phase = TrainPhase::AwaitingCrew;
                Ok(Step::WaitFor(crew_due_in))
            }
            (TrainPhase::AwaitingCrew, Wake::Timeout { .. }) => {
                world.emit(now, self.id, DockEventKind::Unhogged { location: HogLocation::Queue });
                self.enter_dock(now, world)
            }
            (TrainPhase::AwaitingCrew, Wake::Interrupted { .. }) => {
                let replacement = self.call_replacement(world)?;
                world.emit(now, self.id, DockEventKind::HogQueued { replacement });
                Ok(Step::WaitFor(replacement))
            }
            (TrainPhase::Unloading, Wake::Timeout { .. }) => {
                let train = world.train_mut(self.id)?;
                train.unloading_remaining = 0.0;
                train.unloading_since = None;
                self.depart(now, sched, world)
            }
            (TrainPhase::Unloading, Wake::Interrupted { elapsed }) => {
                let train = world.train_mut(self.id)?;
                train.unloading_remaining = (train.unloading_remaining - elapsed).max(0.0);
                train.unloading_since = None;
                if train.unloading_remaining <= EPSILON {
                    // hog-outs are only delivered while unloading is pending
                    return Err(SimError::Model(format!(
                        "train {} hogged out with no unloading left at {}",
                        self.id, now
                    )));
                }
                let unloading_remaining = train.unloading_remaining;
                let replacement = self.call_replacement(world)?;
                world.emit(
                    now,
                    self.id,
                    DockEventKind::HogService {
                        unloading_remaining,
                        replacement,
                    },
                );
                self.phase = TrainPhase::HoggedInDock;
                Ok(Step::WaitFor(replacement))
            }
            (TrainPhase::HoggedInDock, Wake::Timeout { .. }) => {
                world.emit(now, self.id, DockEventKind::Unhogged { location: HogLocation::Service });
                self.start_unloading(now, world)
            }
            (TrainPhase::HoggedInDock, Wake::Interrupted { .. }) => {
                let replacement = self.call_replacement(world)?;
                let unloading_remaining = world.train(self.id)?.unloading_remaining;
                world.emit(
                    now,
                    self.id,
                    DockEventKind::HogService {
                        unloading_remaining,
                        replacement,
                    },
                );
                Ok(Step::WaitFor(replacement))
            }
            (phase, wake) => {
                let pid = sched.current().ok_or(SimError::NoCurrentProcess)?;
                Err(SimError::UnexpectedWake(pid, format!("{wake:?} while {phase:?}")))
            }
        }
    }
}
