//! Input generators feeding the dock simulation.
//!
//! The core only pulls values through [`TrainSource`]; whether they come from
//! pseudo-random distributions or a replay log is decided once at startup.

pub mod random;
pub mod replay;

pub use random::{RandomParams, RandomSource};
pub use replay::{ReplayError, ReplaySchedule, ReplaySource, ScheduleRecord};

/// Supplier of every random quantity the simulation consumes.
///
/// `None` means the source is exhausted. An exhausted arrival stream ends
/// arrivals; running out of any other quantity aborts the run.
pub trait TrainSource {
    fn next_inter_arrival_gap(&mut self) -> Option<f64>;
    fn next_unloading_duration(&mut self) -> Option<f64>;
    fn next_initial_crew_budget(&mut self) -> Option<f64>;
    fn next_replacement_duration(&mut self) -> Option<f64>;
}

impl<T: TrainSource + ?Sized> TrainSource for Box<T> {
    fn next_inter_arrival_gap(&mut self) -> Option<f64> {
        (**self).next_inter_arrival_gap()
    }
    fn next_unloading_duration(&mut self) -> Option<f64> {
        (**self).next_unloading_duration()
    }
    fn next_initial_crew_budget(&mut self) -> Option<f64> {
        (**self).next_initial_crew_budget()
    }
    fn next_replacement_duration(&mut self) -> Option<f64> {
        (**self).next_replacement_duration()
    }
}
