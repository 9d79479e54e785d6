// src/source/replay.rs - Deterministic replay of a recorded schedule
//
// Schedule file: one train per line, `arrival unloading crew_budget`,
// whitespace separated, arrivals non-decreasing.
// Crew file: one replacement-crew travel time per line.
use super::TrainSource;
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error reading {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount { line: usize, expected: usize, found: usize },
    #[error("line {line}: '{value}' is not a non-negative number")]
    BadNumber { line: usize, value: String },
    #[error("line {line}: arrival time goes backwards")]
    NonMonotonic { line: usize },
    #[error("schedule contains no trains")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleRecord {
    pub arrival: f64,
    pub unloading: f64,
    pub crew_budget: f64,
}

/// A validated replay log: the train schedule plus replacement crew times.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySchedule {
    pub trains: Vec<ScheduleRecord>,
    pub replacements: Vec<f64>,
}

fn parse_number(field: &str, line: usize) -> Result<f64, ReplayError> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ReplayError::BadNumber {
            line,
            value: field.to_string(),
        }),
    }
}

/// Splits non-blank lines into fields, checking the field count of every line.
fn records(contents: &str, expected: usize) -> impl Iterator<Item = Result<(usize, Vec<&str>), ReplayError>> {
    contents
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, fields)| !fields.is_empty())
        .map(move |(line, fields)| {
            if fields.len() == expected {
                Ok((line, fields))
            } else {
                Err(ReplayError::FieldCount {
                    line,
                    expected,
                    found: fields.len(),
                })
            }
        })
}

pub fn parse_schedule(contents: &str) -> Result<Vec<ScheduleRecord>, ReplayError> {
    let mut trains: Vec<ScheduleRecord> = Vec::new();
    for record in records(contents, 3) {
        let (line, fields) = record?;
        let parsed = ScheduleRecord {
            arrival: parse_number(fields[0], line)?,
            unloading: parse_number(fields[1], line)?,
            crew_budget: parse_number(fields[2], line)?,
        };
        if trains.last().is_some_and(|prev| parsed.arrival < prev.arrival) {
            return Err(ReplayError::NonMonotonic { line });
        }
        trains.push(parsed);
    }
    if trains.is_empty() {
        return Err(ReplayError::Empty);
    }
    Ok(trains)
}

pub fn parse_replacements(contents: &str) -> Result<Vec<f64>, ReplayError> {
    records(contents, 1)
        .map(|record| {
            let (line, fields) = record?;
            parse_number(fields[0], line)
        })
        .collect()
}

fn read(path: &Path) -> Result<String, ReplayError> {
    std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.display().to_string(),
        source,
    })
}

impl ReplaySchedule {
    /// Reads and validates both files. Any malformed line fails the whole load.
    pub fn load(schedule: impl AsRef<Path>, crews: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let trains = parse_schedule(&read(schedule.as_ref())?)?;
        let replacements = parse_replacements(&read(crews.as_ref())?)?;
        tracing::info!(
            "Loaded replay: {} trains, {} replacement crews",
            trains.len(),
            replacements.len()
        );
        Ok(Self { trains, replacements })
    }

    /// Time of the last scheduled arrival.
    pub fn last_arrival(&self) -> f64 {
        self.trains.last().map_or(0.0, |t| t.arrival)
    }
}

/// Replays a [`ReplaySchedule`] value by value.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    trains: VecDeque<ScheduleRecord>,
    replacements: VecDeque<f64>,
    current: Option<ScheduleRecord>,
    last_arrival: f64,
}

impl ReplaySource {
    pub fn new(schedule: ReplaySchedule) -> Self {
        Self {
            trains: schedule.trains.into(),
            replacements: schedule.replacements.into(),
            current: None,
            last_arrival: 0.0,
        }
    }
}

impl From<ReplaySchedule> for ReplaySource {
    fn from(schedule: ReplaySchedule) -> Self {
        Self::new(schedule)
    }
}

impl TrainSource for ReplaySource {
    /// Advances to the next scheduled train; its other values become current.
    fn next_inter_arrival_gap(&mut self) -> Option<f64> {
        let next = self.trains.pop_front()?;
        let gap = next.arrival - self.last_arrival;
        self.last_arrival = next.arrival;
        self.current = Some(next);
        Some(gap)
    }

    fn next_unloading_duration(&mut self) -> Option<f64> {
        self.current.map(|t| t.unloading)
    }

    fn next_initial_crew_budget(&mut self) -> Option<f64> {
        self.current.map(|t| t.crew_budget)
    }

    fn next_replacement_duration(&mut self) -> Option<f64> {
        self.replacements.pop_front()
    }
}
