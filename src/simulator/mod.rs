//! Discrete-event scheduler: virtual clock, process table and resources.
//!
//! Execution is single threaded. Popping one event from the queue resumes
//! one process; anything that process makes ready (a resource handed over,
//! an interrupt delivered) is resumed within the same step, in order, before
//! the next event is popped.

pub mod event_queue;
pub mod process;
pub mod resource;

use crate::simulator::event_queue::{EventId, SimClock, SimEventQueue, SimTime};
use crate::simulator::process::{Process, ProcessEntry, ProcessId, ProcessState, Step, WaitState, Wake};
use crate::simulator::resource::{Request, Resource, ResourceId};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("process {0} has no active suspension point to interrupt")]
    NotSuspended(ProcessId),
    #[error("unknown process {0}")]
    UnknownProcess(ProcessId),
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
    #[error("process {0} does not hold resource {1}")]
    NotHolder(ProcessId, ResourceId),
    #[error("process {0} is already queued on resource {1}")]
    AlreadyQueued(ProcessId, ResourceId),
    #[error("process {process} finished while holding resource {resource}")]
    HeldOnExit { process: ProcessId, resource: ResourceId },
    #[error("invalid wait duration {0}")]
    InvalidDuration(f64),
    #[error("process {0} cannot handle {1}")]
    UnexpectedWake(ProcessId, String),
    #[error("timer for process {0} fired outside of a timed wait")]
    StaleTimer(ProcessId),
    #[error("no process is running")]
    NoCurrentProcess,
    #[error("{0} generator is exhausted")]
    GeneratorExhausted(&'static str),
    #[error("model invariant violated: {0}")]
    Model(String),
}

#[derive(Debug, Clone, Copy)]
enum SimAction {
    Start(ProcessId),
    Timer(ProcessId),
}

/// The simulation kernel handed to every process while it runs.
pub struct Scheduler<W> {
    clock: SimClock,
    queue: SimEventQueue<SimAction>,
    processes: BTreeMap<ProcessId, ProcessEntry<W>>,
    resources: Vec<Resource>,
    ready: VecDeque<(ProcessId, Wake)>,
    current: Option<ProcessId>,
    next_pid: u64,
    events_processed: u64,
}

impl<W> Default for Scheduler<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> Scheduler<W> {
    pub fn new() -> Self {
        Self {
            clock: SimClock::new(),
            queue: SimEventQueue::new(),
            processes: BTreeMap::new(),
            resources: Vec::new(),
            ready: VecDeque::new(),
            current: None,
            next_pid: 0,
            events_processed: 0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// The process being resumed right now, if any.
    pub fn current(&self) -> Option<ProcessId> {
        self.current
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn next_event_time(&self) -> Option<SimTime> {
        self.queue.peek_time()
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn add_resource(&mut self, name: impl Into<String>) -> ResourceId {
        let id = ResourceId(self.resources.len());
        self.resources.push(Resource::new(id, name));
        id
    }

    pub fn resource(&self, id: ResourceId) -> Result<&Resource, SimError> {
        self.resources.get(id.0).ok_or(SimError::UnknownResource(id))
    }

    fn resource_mut(&mut self, id: ResourceId) -> Result<&mut Resource, SimError> {
        self.resources.get_mut(id.0).ok_or(SimError::UnknownResource(id))
    }

    pub fn state(&self, pid: ProcessId) -> Option<ProcessState> {
        self.processes.get(&pid).map(|entry| entry.state)
    }

    pub fn is_suspended(&self, pid: ProcessId) -> bool {
        self.state(pid).is_some_and(|state| state.is_suspended())
    }

    pub fn is_alive(&self, pid: ProcessId) -> bool {
        self.processes.contains_key(&pid)
    }

    /// Registers a process and schedules its first activation at the current time.
    pub fn spawn<P>(&mut self, process: P) -> ProcessId
    where
        P: Process<W> + 'static,
    {
        let pid = ProcessId(self.next_pid);
        self.next_pid += 1;
        let entry = ProcessEntry::new(Box::new(process));
        tracing::trace!(process = %pid, label = entry.label, now = %self.now(), "spawn");
        self.processes.insert(pid, entry);
        self.queue.push(self.now(), SimAction::Start(pid));
        pid
    }

    /// Schedules an event `delay` hours from now.
    fn schedule_after(&mut self, delay: f64, action: SimAction) -> Result<EventId, SimError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::InvalidDuration(delay));
        }
        Ok(self.queue.push(self.now() + delay, action))
    }

    /// Aborts the active wait of `pid` and resumes it with [`Wake::Interrupted`].
    ///
    /// Interrupting a process that is not suspended is a scheduling bug and
    /// is reported as [`SimError::NotSuspended`].
    pub fn interrupt(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let entry = self.processes.get(&pid).ok_or(SimError::UnknownProcess(pid))?;
        let ProcessState::Waiting { wait, since } = entry.state else {
            return Err(SimError::NotSuspended(pid));
        };
        self.abort_wait(pid, wait)?;
        let elapsed = self.now() - since;
        if let Some(entry) = self.processes.get_mut(&pid) {
            entry.state = ProcessState::Interrupted;
        }
        tracing::debug!(process = %pid, now = %self.now(), elapsed, "interrupt");
        self.ready.push_back((pid, Wake::Interrupted { elapsed }));
        Ok(())
    }

    /// Terminates `pid` without resuming it. Unknown processes are ignored.
    pub fn kill(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let Some(entry) = self.processes.remove(&pid) else {
            return Ok(());
        };
        if let ProcessState::Waiting { wait, .. } = entry.state {
            self.abort_wait(pid, wait)?;
        }
        for resource in &mut self.resources {
            resource.forget(pid);
        }
        self.ready.retain(|&(p, _)| p != pid);
        tracing::trace!(process = %pid, label = entry.label, now = %self.now(), "kill");
        Ok(())
    }

    /// Releases `resource` held by the running process and hands it to the
    /// next waiter, which is resumed later in this step.
    pub fn release(&mut self, resource: ResourceId) -> Result<(), SimError> {
        let pid = self.current.ok_or(SimError::NoCurrentProcess)?;
        let next = self.resource_mut(resource)?.release(pid)?;
        if let Some(next) = next {
            self.grant(next, resource)?;
        }
        Ok(())
    }

    fn grant(&mut self, pid: ProcessId, resource: ResourceId) -> Result<(), SimError> {
        let entry = self.processes.get_mut(&pid).ok_or(SimError::UnknownProcess(pid))?;
        let ProcessState::Waiting { wait, since } = entry.state else {
            return Err(SimError::UnexpectedWake(pid, format!("grant of {resource} while not waiting")));
        };
        if wait.resource() != Some(resource) {
            return Err(SimError::UnexpectedWake(pid, format!("grant of {resource} during {wait:?}")));
        }
        entry.state = ProcessState::Runnable;
        if let Some(event) = wait.timer() {
            self.queue.cancel(event);
        }
        let elapsed = self.now() - since;
        tracing::debug!(process = %pid, %resource, now = %self.now(), elapsed, "granted");
        self.ready.push_back((pid, Wake::Granted { elapsed }));
        Ok(())
    }

    fn abort_wait(&mut self, pid: ProcessId, wait: WaitState) -> Result<(), SimError> {
        if let Some(event) = wait.timer() {
            self.queue.cancel(event);
        }
        if let Some(resource) = wait.resource() {
            self.resource_mut(resource)?.withdraw(pid);
        }
        Ok(())
    }

    fn suspend(&mut self, pid: ProcessId, step: Step) -> Result<(), SimError> {
        let now = self.now();
        let next_state = match step {
            Step::WaitFor(duration) => {
                let event = self.schedule_after(duration, SimAction::Timer(pid))?;
                ProcessState::Waiting {
                    wait: WaitState::Timeout { event },
                    since: now,
                }
            }
            Step::Acquire(resource) => match self.resource_mut(resource)?.request(pid)? {
                Request::Granted => {
                    self.ready.push_back((pid, Wake::Granted { elapsed: 0.0 }));
                    ProcessState::Runnable
                }
                Request::Queued => ProcessState::Waiting {
                    wait: WaitState::Resource { resource },
                    since: now,
                },
            },
            Step::RaceAcquireOrTimeout(resource, duration) => {
                if !duration.is_finite() || duration < 0.0 {
                    return Err(SimError::InvalidDuration(duration));
                }
                match self.resource_mut(resource)?.request(pid)? {
                    Request::Granted => {
                        self.ready.push_back((pid, Wake::Granted { elapsed: 0.0 }));
                        ProcessState::Runnable
                    }
                    Request::Queued => {
                        let event = self.schedule_after(duration, SimAction::Timer(pid))?;
                        ProcessState::Waiting {
                            wait: WaitState::Composite { resource, event },
                            since: now,
                        }
                    }
                }
            }
            Step::Done => {
                if let Some(held) = self.resources.iter().find(|r| r.held_by() == Some(pid)) {
                    return Err(SimError::HeldOnExit {
                        process: pid,
                        resource: held.id(),
                    });
                }
                for resource in &mut self.resources {
                    resource.forget(pid);
                }
                self.processes.remove(&pid);
                return Ok(());
            }
        };
        if let Some(entry) = self.processes.get_mut(&pid) {
            entry.state = next_state;
        }
        Ok(())
    }

    fn fire_timer(&mut self, pid: ProcessId, event: EventId) -> Result<Wake, SimError> {
        let entry = self.processes.get_mut(&pid).ok_or(SimError::UnknownProcess(pid))?;
        let ProcessState::Waiting { wait, since } = entry.state else {
            return Err(SimError::StaleTimer(pid));
        };
        if wait.timer() != Some(event) {
            return Err(SimError::StaleTimer(pid));
        }
        entry.state = ProcessState::Runnable;
        if let Some(resource) = wait.resource() {
            // race lost by the resource branch
            self.resource_mut(resource)?.withdraw(pid);
        }
        Ok(Wake::Timeout {
            elapsed: self.clock.now() - since,
        })
    }

    fn resume(&mut self, pid: ProcessId, wake: Wake, world: &mut W) -> Result<(), SimError> {
        let Some(entry) = self.processes.get_mut(&pid) else {
            // killed after it was made ready
            return Ok(());
        };
        let Some(mut behaviour) = entry.behaviour.take() else {
            return Err(SimError::UnexpectedWake(pid, format!("{wake:?} while already running")));
        };
        entry.state = ProcessState::Runnable;
        self.current = Some(pid);
        let step = behaviour.resume(self, world, wake);
        self.current = None;
        let step = step?;
        match self.processes.get_mut(&pid) {
            Some(entry) => entry.behaviour = Some(behaviour),
            None => return Ok(()),
        }
        self.suspend(pid, step)
    }

    fn drain_ready(&mut self, world: &mut W) -> Result<(), SimError> {
        while let Some((pid, wake)) = self.ready.pop_front() {
            self.resume(pid, wake, world)?;
        }
        Ok(())
    }

    /// Pops the earliest event, advances the clock and runs every process it
    /// wakes. Returns `false` when the queue is empty.
    pub fn advance(&mut self, world: &mut W) -> Result<bool, SimError> {
        self.drain_ready(world)?;
        let Some((event, action)) = self.queue.pop() else {
            return Ok(false);
        };
        self.clock.advance_to(event.time());
        self.events_processed += 1;
        match action {
            SimAction::Start(pid) => self.ready.push_back((pid, Wake::Start)),
            SimAction::Timer(pid) => {
                let wake = self.fire_timer(pid, event)?;
                self.ready.push_back((pid, wake));
            }
        }
        self.drain_ready(world)?;
        Ok(true)
    }
}

/// A scheduler together with the run context its processes operate on.
/// One instance per simulation run.
pub struct Simulator<W> {
    scheduler: Scheduler<W>,
    world: W,
}

impl<W> Simulator<W> {
    pub fn new(scheduler: Scheduler<W>, world: W) -> Self {
        tracing::debug!("Simulator initialized at time: {}", scheduler.now());
        Self { scheduler, world }
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn scheduler(&self) -> &Scheduler<W> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<W> {
        &mut self.scheduler
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn into_world(self) -> W {
        self.world
    }

    pub fn spawn<P>(&mut self, process: P) -> ProcessId
    where
        P: Process<W> + 'static,
    {
        self.scheduler.spawn(process)
    }

    pub fn advance(&mut self) -> Result<bool, SimError> {
        self.scheduler.advance(&mut self.world)
    }

    /// Runs until the event queue is empty.
    pub fn run_event_loop(&mut self) -> Result<u64, SimError> {
        let start = self.scheduler.events_processed();
        while self.advance()? {}
        let processed = self.scheduler.events_processed() - start;
        tracing::debug!(events = processed, now = %self.now(), "event queue drained");
        Ok(processed)
    }

    /// Runs until the queue is empty or the next event lies beyond `until`.
    pub fn run_until(&mut self, until: SimTime) -> Result<u64, SimError> {
        let start = self.scheduler.events_processed();
        while let Some(next) = self.scheduler.next_event_time() {
            if next > until {
                tracing::debug!(now = %self.now(), %until, "horizon reached");
                break;
            }
            self.advance()?;
        }
        Ok(self.scheduler.events_processed() - start)
    }
}
