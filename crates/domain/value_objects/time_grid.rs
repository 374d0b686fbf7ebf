use anyhow::{Result, bail};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

pub const DEFAULT_OPEN_HOUR: u32 = 9;
pub const DEFAULT_CLOSE_HOUR: u32 = 18;
pub const DEFAULT_STEP_MINUTES: u32 = 30;

/// Daily booking window. All times are in the single business timezone, carried as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
    pub step_minutes: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: DEFAULT_OPEN_HOUR,
            close_hour: DEFAULT_CLOSE_HOUR,
            step_minutes: DEFAULT_STEP_MINUTES,
        }
    }
}

impl BusinessHours {
    pub fn new(open_hour: u32, close_hour: u32, step_minutes: u32) -> Result<Self> {
        if close_hour > 24 {
            bail!("close hour must be <= 24, got {close_hour}");
        }
        if open_hour >= close_hour {
            bail!("open hour ({open_hour}) must be before close hour ({close_hour})");
        }
        if step_minutes == 0 {
            bail!("slot step must be at least one minute");
        }

        Ok(Self {
            open_hour,
            close_hour,
            step_minutes,
        })
    }

    pub fn opening(&self, date: NaiveDate) -> DateTime<Utc> {
        at_hour(date, self.open_hour)
    }

    pub fn closing(&self, date: NaiveDate) -> DateTime<Utc> {
        at_hour(date, self.close_hour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CandidateSlot {
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        overlaps(self.start, self.end, start, end)
    }
}

/// Half-open interval test: `[a_start, a_end)` and `[b_start, b_end)` share time.
/// Covers containment in either direction and partial overlap on either edge.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Candidate starts every `step_minutes` from opening; a slot is kept only if the whole
/// service fits before closing.
pub fn generate_grid(
    date: NaiveDate,
    service_duration_minutes: i64,
    hours: BusinessHours,
) -> Vec<CandidateSlot> {
    if service_duration_minutes < 1 {
        return Vec::new();
    }

    let opening = hours.opening(date);
    let closing = hours.closing(date);
    let duration = Duration::minutes(service_duration_minutes);
    let step = Duration::minutes(i64::from(hours.step_minutes));

    std::iter::successors(Some(opening), |start| Some(*start + step))
        .take_while(|start| *start < closing)
        .map(|start| CandidateSlot {
            start,
            end: start + duration,
        })
        .take_while(|slot| slot.end <= closing)
        .collect()
}

/// `[00:00, next day 00:00)` for the given date.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = at_hour(date, 0);
    (start, start + Duration::days(1))
}

fn at_hour(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(i64::from(hour))
}
