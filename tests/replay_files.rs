// Loading replay logs from disk

use dock_sim::source::ReplayError;
use dock_sim::{DockEventKind, DockParams, DockSimulation, ReplaySchedule, ReplaySource};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, contents: &str) {
    let mut file = File::create(path).unwrap();
    write!(file, "{}", contents).unwrap();
    file.flush().unwrap();
}

#[test]
fn test_replay_from_files() {
    let dir = tempdir().unwrap();
    let schedule = dir.path().join("schedule.txt");
    let crews = dir.path().join("crews.txt");
    write(&schedule, "0.0 4.0 2.0\n1.0 2.0 10.0\n");
    write(&crews, "3.0\n");

    let loaded = ReplaySchedule::load(&schedule, &crews).unwrap();
    assert_eq!(loaded.trains.len(), 2);
    assert_eq!(loaded.last_arrival(), 1.0);

    let mut sim = DockSimulation::new(DockParams::default(), ReplaySource::from(loaded), Vec::new());
    let report = sim.run().unwrap();
    assert_eq!(report.trains_departed, 2);
    let events = sim.into_sink();
    let departures: Vec<(u64, f64)> = events
        .iter()
        .filter(|e| matches!(e.kind, DockEventKind::Departure { .. }))
        .map(|e| (e.train.0, e.time.as_hours()))
        .collect();
    // train 0 hogs out at 2, back at 5, done at 7; train 1 follows
    assert_eq!(departures, vec![(0, 7.0), (1, 9.0)]);
}

#[test]
fn test_missing_file_names_the_path() {
    let dir = tempdir().unwrap();
    let schedule = dir.path().join("schedule.txt");
    write(&schedule, "0 4 7\n");
    let err = ReplaySchedule::load(&schedule, dir.path().join("nope.txt")).unwrap_err();
    match err {
        ReplayError::Io { path, .. } => assert!(path.ends_with("nope.txt")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_line_rejects_whole_file() {
    let dir = tempdir().unwrap();
    let schedule = dir.path().join("schedule.txt");
    let crews = dir.path().join("crews.txt");
    write(&schedule, "0 4 7\n2 4 seven\n5 4 7\n");
    write(&crews, "3\n");
    let err = ReplaySchedule::load(&schedule, &crews).unwrap_err();
    assert!(matches!(err, ReplayError::BadNumber { line: 2, .. }));
    assert_eq!(err.to_string(), "line 2: 'seven' is not a non-negative number");
}
