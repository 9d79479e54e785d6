// src/dock/crew.rs - Crew shift timer that hogs out a train
use crate::dock::DockWorld;
use crate::dock::events::{EventSink, TrainId};
use crate::simulator::process::{Process, ProcessId, Step, Wake};
use crate::simulator::{Scheduler, SimError};

/// Fires a hog-out into its train when the current crew's shift runs out,
/// then once per shift length until the train departs.
#[derive(Debug)]
pub struct HogOutTimer {
    train: TrainId,
    target: ProcessId,
    first_deadline: f64,
    period: f64,
}

impl HogOutTimer {
    pub fn new(train: TrainId, target: ProcessId, first_deadline: f64, period: f64) -> Self {
        Self {
            train,
            target,
            first_deadline,
            period,
        }
    }
}

impl<S: EventSink> Process<DockWorld<S>> for HogOutTimer {
    fn label(&self) -> &'static str {
        "crew"
    }

    fn resume(
        &mut self,
        sched: &mut Scheduler<DockWorld<S>>,
        world: &mut DockWorld<S>,
        wake: Wake,
    ) -> Result<Step, SimError> {
        match wake {
            Wake::Start => Ok(Step::WaitFor(self.first_deadline)),
            Wake::Timeout { .. } => {
                let now = sched.now();
                let Some(train) = world.find_train_mut(self.train) else {
                    return Ok(Step::Done);
                };
                if !train.is_pending(now) {
                    tracing::trace!(train = %self.train, %now, "hog-out after unloading finished, ignored");
                    return Ok(Step::Done);
                }
                train.hog_out_count += 1;
                tracing::debug!(train = %self.train, %now, count = train.hog_out_count, "crew hogged out");
                if sched.is_suspended(self.target) {
                    sched.interrupt(self.target)?;
                }
                Ok(Step::WaitFor(self.period))
            }
            other => {
                let pid = sched.current().ok_or(SimError::NoCurrentProcess)?;
                Err(SimError::UnexpectedWake(pid, format!("{other:?} in hog-out timer")))
            }
        }
    }
}
