// src/trace.rs - Event sinks: tracing narrative, JSONL event log, per-train CSV
use crate::dock::events::{DockEvent, DockEventKind, EventSink, HogLocation, TrainId};
use crate::simulator::event_queue::SimTime;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Human-readable narrative of the run, one `info` line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&mut self, event: &DockEvent) {
        let (t, id) = (event.time, event.train);
        match event.kind {
            DockEventKind::Arrival { unloading, crew_remaining } => tracing::info!(
                "Time {}: train {} arrival for {:.2}h of unloading, crew {} with {:.2}h before hogout",
                t, id, unloading, id, crew_remaining
            ),
            DockEventKind::HogQueued { replacement } => tracing::info!(
                "Time {}: train {} crew {} hogged out in queue, replacement in {:.2}h",
                t, id, id, replacement
            ),
            DockEventKind::DockReserved { crew_due_in } => tracing::info!(
                "Time {}: train {} reached the dock, waiting {:.2}h for its crew",
                t, id, crew_due_in
            ),
            DockEventKind::Unhogged { location } => {
                let place = match location {
                    HogLocation::Queue => "queue",
                    HogLocation::Service => "dock",
                };
                tracing::info!("Time {}: train {} replacement crew arrived ({})", t, id, place)
            }
            DockEventKind::DockEntry { unloading, crew_remaining } => tracing::info!(
                "Time {}: train {} entering dock for {:.2}h of unloading, crew has {:.2}h before hogout",
                t, id, unloading, crew_remaining
            ),
            DockEventKind::HogService { unloading_remaining, replacement } => tracing::info!(
                "Time {}: train {} crew hogged out during service, {:.2}h of unloading left, replacement in {:.2}h",
                t, id, unloading_remaining, replacement
            ),
            DockEventKind::Departure { hog_out_count } => tracing::info!(
                "Time {}: train {} departing after {} hogout(s)",
                t, id, hog_out_count
            ),
        }
    }
}

/// Writes every event as one JSON object per line.
///
/// Write errors are kept and reported by [`EventSink::finish`]; recording
/// stops at the first failure.
pub struct JsonlSink<W: Write> {
    out: W,
    error: Option<OutputError>,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_event(&mut self, event: &DockEvent) -> Result<(), OutputError> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> EventSink for JsonlSink<W> {
    fn record(&mut self, event: &DockEvent) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write_event(event) {
            tracing::error!("Failed to write event log: {}", e);
            self.error = Some(e);
        }
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(())
    }
}

/// One row per departed train.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainRecord {
    pub train: TrainId,
    pub arrival: f64,
    pub dock_entry: f64,
    pub departure: f64,
    pub queue_wait: f64,
    pub time_in_system: f64,
    pub hog_outs: u32,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    arrival: SimTime,
    dock_entry: Option<SimTime>,
}

pub struct TrainCsvSink<W: Write> {
    writer: csv::Writer<W>,
    pending: HashMap<TrainId, Pending>,
    error: Option<OutputError>,
}

impl<W: Write> TrainCsvSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(out),
            pending: HashMap::new(),
            error: None,
        }
    }

    pub fn into_inner(self) -> Result<W, OutputError> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::Io(e.into_error()))
    }

    fn on_event(&mut self, event: &DockEvent) -> Result<(), OutputError> {
        match event.kind {
            DockEventKind::Arrival { .. } => {
                self.pending.insert(
                    event.train,
                    Pending {
                        arrival: event.time,
                        dock_entry: None,
                    },
                );
            }
            DockEventKind::DockEntry { .. } => {
                if let Some(p) = self.pending.get_mut(&event.train) {
                    p.dock_entry = Some(event.time);
                }
            }
            DockEventKind::Departure { hog_out_count } => {
                if let Some(p) = self.pending.remove(&event.train) {
                    let entry = p.dock_entry.unwrap_or(event.time);
                    self.writer.serialize(TrainRecord {
                        train: event.train,
                        arrival: p.arrival.as_hours(),
                        dock_entry: entry.as_hours(),
                        departure: event.time.as_hours(),
                        queue_wait: entry - p.arrival,
                        time_in_system: event.time - p.arrival,
                        hog_outs: hog_out_count,
                    })?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl<W: Write> EventSink for TrainCsvSink<W> {
    fn record(&mut self, event: &DockEvent) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.on_event(event) {
            tracing::error!("Failed to write train CSV: {}", e);
            self.error = Some(e);
        }
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(t: f64, kind: DockEventKind) -> DockEvent {
        DockEvent {
            time: SimTime::from_hours(t),
            train: TrainId(1),
            kind,
        }
    }

    fn lifecycle() -> Vec<DockEvent> {
        vec![
            ev(1.0, DockEventKind::Arrival { unloading: 2.0, crew_remaining: 3.0 }),
            ev(4.0, DockEventKind::HogQueued { replacement: 4.0 }),
            ev(5.0, DockEventKind::DockReserved { crew_due_in: 3.0 }),
            ev(8.0, DockEventKind::Unhogged { location: HogLocation::Queue }),
            ev(8.0, DockEventKind::DockEntry { unloading: 2.0, crew_remaining: 8.0 }),
            ev(10.0, DockEventKind::Departure { hog_out_count: 1 }),
        ]
    }

    #[test]
    fn test_jsonl_one_line_per_event() {
        let mut sink = JsonlSink::new(Vec::new());
        for e in lifecycle() {
            sink.record(&e);
        }
        sink.finish().unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        let reserved: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(reserved["kind"], "dock_reserved");
        assert_eq!(reserved["crew_due_in"], 3.0);
        let unhogged: serde_json::Value = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(unhogged["location"], "queue");
    }

    #[test]
    fn test_csv_row_per_departure() {
        let mut sink = TrainCsvSink::new(Vec::new());
        for e in lifecycle() {
            sink.record(&e);
        }
        sink.finish().unwrap();
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("train,arrival,dock_entry,departure,queue_wait,time_in_system,hog_outs")
        );
        assert_eq!(lines.next(), Some("1,1.0,8.0,10.0,7.0,9.0,1"));
        assert_eq!(lines.next(), None);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_error_surfaces_on_finish() {
        let mut sink = JsonlSink::new(FailingWriter);
        sink.record(&lifecycle()[0]);
        assert!(sink.finish().is_err());
        // nothing more is attempted after the first failure
        assert!(sink.finish().is_ok());
    }
}
