//! Suspendable processes and the points at which they can be suspended.
//!
//! A process is an explicit state machine. The scheduler calls
//! [`Process::resume`] with the reason it was woken, the process runs until
//! its next suspension point and hands back a [`Step`] describing what it
//! waits on next. Interrupts arrive as [`Wake::Interrupted`], never as a
//! panic or unwinding.

use super::event_queue::{EventId, SimTime};
use super::resource::ResourceId;
use super::{Scheduler, SimError};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProcessId(pub(crate) u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Why a process is being resumed. `elapsed` is the virtual time spent in
/// the wait that just ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wake {
    /// First activation after spawn.
    Start,
    /// The timeout ran out (for a race: the timeout branch won).
    Timeout { elapsed: f64 },
    /// The requested resource is now held by this process.
    Granted { elapsed: f64 },
    /// Another process aborted the wait.
    Interrupted { elapsed: f64 },
}

impl Wake {
    pub fn elapsed(&self) -> f64 {
        match *self {
            Wake::Start => 0.0,
            Wake::Timeout { elapsed } | Wake::Granted { elapsed } | Wake::Interrupted { elapsed } => elapsed,
        }
    }
}

/// What a process suspends on when it hands control back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    WaitFor(f64),
    Acquire(ResourceId),
    /// Resolves on whichever comes first: the grant or the timeout.
    RaceAcquireOrTimeout(ResourceId, f64),
    Done,
}

/// The active suspension point of a waiting process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitState {
    Timeout { event: EventId },
    Resource { resource: ResourceId },
    Composite { resource: ResourceId, event: EventId },
}

impl WaitState {
    pub fn timer(&self) -> Option<EventId> {
        match *self {
            WaitState::Timeout { event } | WaitState::Composite { event, .. } => Some(event),
            WaitState::Resource { .. } => None,
        }
    }

    pub fn resource(&self) -> Option<ResourceId> {
        match *self {
            WaitState::Resource { resource } | WaitState::Composite { resource, .. } => Some(resource),
            WaitState::Timeout { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessState {
    /// Spawned or woken, about to run.
    Runnable,
    Waiting { wait: WaitState, since: SimTime },
    /// Wait aborted by an interrupt; resumes next with [`Wake::Interrupted`].
    Interrupted,
    Done,
}

impl ProcessState {
    pub fn is_suspended(&self) -> bool {
        matches!(self, ProcessState::Waiting { .. })
    }
}

/// A logical task driven by the scheduler. `W` is the run context the
/// process reads and mutates while it runs.
pub trait Process<W> {
    /// Short label used in scheduler logs.
    fn label(&self) -> &'static str {
        "process"
    }

    fn resume(&mut self, sched: &mut Scheduler<W>, world: &mut W, wake: Wake) -> Result<Step, SimError>;
}

pub(crate) struct ProcessEntry<W> {
    pub(crate) label: &'static str,
    pub(crate) state: ProcessState,
    pub(crate) behaviour: Option<Box<dyn Process<W>>>,
}

impl<W> ProcessEntry<W> {
    pub(crate) fn new(behaviour: Box<dyn Process<W>>) -> Self {
        Self {
            label: behaviour.label(),
            state: ProcessState::Runnable,
            behaviour: Some(behaviour),
        }
    }
}
