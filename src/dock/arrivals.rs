// src/dock/arrivals.rs - Arrival generator process
use crate::dock::DockWorld;
use crate::dock::crew::HogOutTimer;
use crate::dock::events::{EventSink, TrainId};
use crate::dock::train::TrainProcess;
use crate::simulator::process::{Process, Step, Wake};
use crate::simulator::{Scheduler, SimError};

/// Spawns a train and its hog-out timer after every inter-arrival gap,
/// until the horizon passes or the source runs dry.
#[derive(Debug)]
pub struct ArrivalProcess {
    horizon: Option<f64>,
}

impl ArrivalProcess {
    pub fn new(horizon: Option<f64>) -> Self {
        Self { horizon }
    }
}

/// Registers a newly arrived train and starts its two processes.
pub fn admit_train<S: EventSink>(
    sched: &mut Scheduler<DockWorld<S>>,
    world: &mut DockWorld<S>,
) -> Result<TrainId, SimError> {
    let shift = world.params().shift_length;
    let train = world.admit_train(sched.now())?;
    let (id, crew_budget) = (train.id, train.crew_remaining);
    let train_pid = sched.spawn(TrainProcess::new(id));
    let crew_pid = sched.spawn(HogOutTimer::new(id, train_pid, crew_budget, shift));
    world.train_mut(id)?.crew_process = Some(crew_pid);
    Ok(id)
}

impl<S: EventSink> Process<DockWorld<S>> for ArrivalProcess {
    fn label(&self) -> &'static str {
        "arrivals"
    }

    fn resume(
        &mut self,
        sched: &mut Scheduler<DockWorld<S>>,
        world: &mut DockWorld<S>,
        wake: Wake,
    ) -> Result<Step, SimError> {
        let now = sched.now();
        match wake {
            Wake::Start => {}
            Wake::Timeout { .. } => {
                if self.horizon.is_some_and(|h| now.as_hours() > h) {
                    tracing::debug!("Arrivals closed at {} (horizon passed)", now);
                    return Ok(Step::Done);
                }
                admit_train(sched, world)?;
            }
            other => {
                let pid = sched.current().ok_or(SimError::NoCurrentProcess)?;
                return Err(SimError::UnexpectedWake(pid, format!("{other:?} in arrival generator")));
            }
        }
        match world.next_inter_arrival_gap() {
            Some(gap) => Ok(Step::WaitFor(gap)),
            None => {
                tracing::info!("Arrival source exhausted at {}", now);
                Ok(Step::Done)
            }
        }
    }
}
