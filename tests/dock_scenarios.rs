// Hand-checked replay scenarios for the dock model

use dock_sim::config::StatsConfig;
use dock_sim::source::ScheduleRecord;
use dock_sim::{
    DockEvent, DockEventKind, DockParams, DockSimulation, DockStats, HogLocation, PreEntryWait, ReplaySchedule,
    ReplaySource, RunSummary, SimError, TrainId,
};

fn schedule(trains: &[(f64, f64, f64)], crews: &[f64]) -> ReplaySource {
    ReplaySource::new(ReplaySchedule {
        trains: trains
            .iter()
            .map(|&(arrival, unloading, crew_budget)| ScheduleRecord {
                arrival,
                unloading,
                crew_budget,
            })
            .collect(),
        replacements: crews.to_vec(),
    })
}

fn run(source: ReplaySource, policy: PreEntryWait) -> (Vec<DockEvent>, RunSummary) {
    let stats = DockStats::new(&StatsConfig {
        pre_entry_wait: policy,
        ..StatsConfig::default()
    });
    let mut sim = DockSimulation::new(DockParams::default(), source, (Vec::new(), stats));
    let report = sim.run().unwrap();
    assert_eq!(report.in_flight, 0);
    let (events, stats) = sim.into_sink();
    (events, stats.summary())
}

fn timeline(events: &[DockEvent]) -> Vec<(f64, u64, &'static str)> {
    events
        .iter()
        .map(|e| {
            let name = match e.kind {
                DockEventKind::Arrival { .. } => "arrival",
                DockEventKind::HogQueued { .. } => "hog_queued",
                DockEventKind::DockReserved { .. } => "dock_reserved",
                DockEventKind::Unhogged { location: HogLocation::Queue } => "unhogged_queue",
                DockEventKind::Unhogged { location: HogLocation::Service } => "unhogged_service",
                DockEventKind::DockEntry { .. } => "dock_entry",
                DockEventKind::HogService { .. } => "hog_service",
                DockEventKind::Departure { .. } => "departure",
            };
            (e.time.as_hours(), e.train.0, name)
        })
        .collect()
}

fn departure_hogs(events: &[DockEvent], train: u64) -> Option<u32> {
    events.iter().find_map(|e| match e.kind {
        DockEventKind::Departure { hog_out_count } if e.train == TrainId(train) => Some(hog_out_count),
        _ => None,
    })
}

#[test]
fn test_no_hog_out_fcfs() {
    let (events, summary) = run(
        schedule(&[(0.0, 4.0, 10.0), (1.0, 2.0, 10.0)], &[]),
        PreEntryWait::Queue,
    );
    assert_eq!(
        timeline(&events),
        vec![
            (0.0, 0, "arrival"),
            (0.0, 0, "dock_entry"),
            (1.0, 1, "arrival"),
            (4.0, 0, "departure"),
            (4.0, 1, "dock_entry"),
            (6.0, 1, "departure"),
        ]
    );
    assert_eq!(departure_hogs(&events, 0), Some(0));
    assert_eq!(departure_hogs(&events, 1), Some(0));
    assert_eq!(summary.trains_served, 2);
    assert_eq!(summary.busy_time, 6.0);
    assert_eq!(summary.hogged_time, 0.0);
    assert_eq!(summary.max_time_in_queue, Some(3.0));
    assert_eq!(summary.avg_time_in_system, Some((4.0 + 5.0) / 2.0));
}

#[test]
fn test_hog_out_in_dock() {
    let (events, summary) = run(schedule(&[(0.0, 4.0, 2.0)], &[3.0]), PreEntryWait::Queue);
    assert_eq!(
        timeline(&events),
        vec![
            (0.0, 0, "arrival"),
            (0.0, 0, "dock_entry"),
            (2.0, 0, "hog_service"),
            (5.0, 0, "unhogged_service"),
            (7.0, 0, "departure"),
        ]
    );
    let hog = events
        .iter()
        .find_map(|e| match e.kind {
            DockEventKind::HogService {
                unloading_remaining,
                replacement,
            } => Some((unloading_remaining, replacement)),
            _ => None,
        })
        .unwrap();
    assert_eq!(hog, (2.0, 3.0));
    assert_eq!(departure_hogs(&events, 0), Some(1));
    assert_eq!(summary.busy_time, 4.0);
    assert_eq!(summary.hogged_time, 3.0);
    assert_eq!(summary.hog_out_histogram[1], 1);
}

#[test]
fn test_hog_out_in_queue_dock_frees_first() {
    let source = || schedule(&[(0.0, 5.0, 20.0), (1.0, 2.0, 3.0)], &[4.0]);
    let (events, summary) = run(source(), PreEntryWait::Queue);
    assert_eq!(
        timeline(&events),
        vec![
            (0.0, 0, "arrival"),
            (0.0, 0, "dock_entry"),
            (1.0, 1, "arrival"),
            (4.0, 1, "hog_queued"),
            (5.0, 0, "departure"),
            (5.0, 1, "dock_reserved"),
            (8.0, 1, "unhogged_queue"),
            (8.0, 1, "dock_entry"),
            (10.0, 1, "departure"),
        ]
    );
    let due = events.iter().find_map(|e| match e.kind {
        DockEventKind::DockReserved { crew_due_in } => Some(crew_due_in),
        _ => None,
    });
    assert_eq!(due, Some(3.0));
    assert_eq!(departure_hogs(&events, 1), Some(1));
    // reserved but crewless dock counts as hogged
    assert_eq!(summary.hogged_time, 3.0);
    assert_eq!(summary.busy_time, 7.0);
    assert_eq!(summary.idle_time, 0.0);
    assert_eq!(summary.max_time_in_queue, Some(7.0));

    let (_, by_dock) = run(source(), PreEntryWait::Dock);
    assert_eq!(by_dock.max_time_in_queue, Some(4.0));
    assert_eq!(by_dock.hogged_time, 3.0);
}

#[test]
fn test_hog_out_in_queue_crew_returns_first() {
    // dock busy until 12, crew back at 4 + 2 = 6: train keeps its place and waits on
    let (events, _) = run(
        schedule(&[(0.0, 12.0, 20.0), (1.0, 2.0, 3.0)], &[2.0]),
        PreEntryWait::Queue,
    );
    assert_eq!(
        timeline(&events),
        vec![
            (0.0, 0, "arrival"),
            (0.0, 0, "dock_entry"),
            (1.0, 1, "arrival"),
            (4.0, 1, "hog_queued"),
            (6.0, 1, "unhogged_queue"),
            (12.0, 0, "departure"),
            (12.0, 1, "dock_entry"),
            (14.0, 1, "departure"),
        ]
    );
}

#[test]
fn test_hogged_train_keeps_queue_position() {
    // train 1 hogs out while queued behind train 0; train 2 arrived later
    // and must still be served after it
    let (events, _) = run(
        schedule(&[(0.0, 6.0, 20.0), (1.0, 1.0, 2.0), (2.0, 1.0, 20.0)], &[3.5]),
        PreEntryWait::Queue,
    );
    let claims: Vec<u64> = events
        .iter()
        .filter(|e| matches!(e.kind, DockEventKind::DockReserved { .. }) || matches!(e.kind, DockEventKind::DockEntry { .. }))
        .map(|e| e.train.0)
        .fold(Vec::new(), |mut acc, id| {
            if acc.last() != Some(&id) {
                acc.push(id);
            }
            acc
        });
    assert_eq!(claims, vec![0, 1, 2]);
    let t = timeline(&events);
    assert!(t.contains(&(6.0, 1, "dock_reserved")));
    assert!(t.contains(&(6.5, 1, "dock_entry")));
    assert!(t.contains(&(7.5, 2, "dock_entry")));
}

#[test]
fn test_repeated_hog_out_during_service() {
    // 30 hours of unloading with a 12 hour shift hogs out three times
    let (events, summary) = run(schedule(&[(0.0, 30.0, 5.0)], &[3.0, 3.0, 3.0]), PreEntryWait::Queue);
    let hogs: Vec<f64> = events
        .iter()
        .filter(|e| matches!(e.kind, DockEventKind::HogService { .. }))
        .map(|e| e.time.as_hours())
        .collect();
    assert_eq!(hogs, vec![5.0, 17.0, 29.0]);
    assert_eq!(departure_hogs(&events, 0), Some(3));
    assert_eq!(summary.hogged_time, 9.0);
    assert_eq!(summary.busy_time, 30.0);
    assert_eq!(summary.run_length, 39.0);
}

#[test]
fn test_hog_out_at_completion_is_ignored() {
    let (events, _) = run(schedule(&[(0.0, 4.0, 4.0)], &[]), PreEntryWait::Queue);
    assert_eq!(
        timeline(&events),
        vec![(0.0, 0, "arrival"), (0.0, 0, "dock_entry"), (4.0, 0, "departure")]
    );
    assert_eq!(departure_hogs(&events, 0), Some(0));
}

#[test]
fn test_crew_deadline_at_completion_does_not_count() {
    // train 1's crew timer is queued at t=0, its unloading timer only at t=1;
    // both fall due at t=4 and the crew timer fires first
    let (events, _) = run(
        schedule(&[(0.0, 1.0, 20.0), (0.0, 3.0, 4.0)], &[]),
        PreEntryWait::Queue,
    );
    assert_eq!(
        timeline(&events),
        vec![
            (0.0, 0, "arrival"),
            (0.0, 0, "dock_entry"),
            (0.0, 1, "arrival"),
            (1.0, 0, "departure"),
            (1.0, 1, "dock_entry"),
            (4.0, 1, "departure"),
        ]
    );
    assert_eq!(departure_hogs(&events, 1), Some(0));
    assert!(!events.iter().any(|e| matches!(e.kind, DockEventKind::HogService { .. })));
}

#[test]
fn test_missing_replacement_crew_aborts_run() {
    let mut sim = DockSimulation::new(DockParams::default(), schedule(&[(0.0, 4.0, 2.0)], &[]), Vec::new());
    let result = sim.run();
    assert!(matches!(result, Err(SimError::GeneratorExhausted(_))));
}

#[test]
fn test_empty_schedule_serves_nothing() {
    let (events, summary) = run(schedule(&[], &[]), PreEntryWait::Queue);
    assert!(events.is_empty());
    assert_eq!(summary.trains_served, 0);
    assert_eq!(summary.avg_time_in_system, None);
    assert_eq!(summary.avg_time_in_queue, None);
}
