// dock_sim: single-dock train unloading simulation with crew hog-outs

pub mod config;
pub mod dock;
pub mod simulator;
pub mod source;
pub mod stats;
pub mod trace;

// Re-exports for the binary and benches
pub use crate::config::{ConfigError, PreEntryWait, SimConfig};
pub use crate::dock::events::{DockEvent, DockEventKind, EventSink, HogLocation, TrainId};
pub use crate::dock::{DockParams, DockSimulation, RunReport};
pub use crate::simulator::event_queue::SimTime;
pub use crate::simulator::SimError;
pub use crate::source::{RandomParams, RandomSource, ReplaySchedule, ReplaySource, TrainSource};
pub use crate::stats::{DockStats, ReplicationSummary, RunSummary};
pub use crate::trace::{JsonlSink, LogSink, OutputError, TrainCsvSink};
