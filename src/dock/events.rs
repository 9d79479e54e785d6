// src/dock/events.rs - Train lifecycle events and the sinks that consume them
use crate::simulator::event_queue::SimTime;
use crate::trace::OutputError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TrainId(pub u64);

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a train was when its replacement crew showed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HogLocation {
    Queue,
    Service,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DockEventKind {
    Arrival { unloading: f64, crew_remaining: f64 },
    /// Crew hogged out before the train got into the dock.
    HogQueued { replacement: f64 },
    /// Train reached the dock but its crew has not arrived; the dock is held.
    DockReserved { crew_due_in: f64 },
    Unhogged { location: HogLocation },
    DockEntry { unloading: f64, crew_remaining: f64 },
    /// Crew hogged out while unloading.
    HogService { unloading_remaining: f64, replacement: f64 },
    Departure { hog_out_count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DockEvent {
    pub time: SimTime,
    pub train: TrainId,
    #[serde(flatten)]
    pub kind: DockEventKind,
}

/// Consumer of the chronological train event stream.
pub trait EventSink {
    fn record(&mut self, event: &DockEvent);

    /// Flushes anything buffered. Deferred write errors surface here.
    fn finish(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

impl EventSink for Vec<DockEvent> {
    fn record(&mut self, event: &DockEvent) {
        self.push(*event);
    }
}

impl<S: EventSink> EventSink for Option<S> {
    fn record(&mut self, event: &DockEvent) {
        if let Some(sink) = self {
            sink.record(event);
        }
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        match self {
            Some(sink) => sink.finish(),
            None => Ok(()),
        }
    }
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn record(&mut self, event: &DockEvent) {
        self.0.record(event);
        self.1.record(event);
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.0.finish()?;
        self.1.finish()
    }
}
