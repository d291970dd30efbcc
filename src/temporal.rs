//! Timestamp generation with business-calendar bias.
//!
//! Every function here draws from the caller's `SimRng` and is otherwise pure:
//! the reference "now" lives in [`Timeline`] rather than being read from the clock.
//!
//! - creation times cluster on weekdays and in the 08:00-18:00 window
//! - due dates follow a fixed horizon mix, avoid weekends, and for engineering
//!   work cluster on 14-day sprint boundaries
//! - completion times are always between creation and now

use anyhow::{Result, anyhow};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rand::prelude::*;
use rand::distributions::WeightedIndex;
use rand_distr::Triangular;

use crate::models::{DATE_FORMAT, ProjectType, TIMESTAMP_FORMAT};
use crate::rng::{SimRng, chance};

/// Sprint length used for due-date clustering on engineering projects.
pub const SPRINT_DAYS: i64 = 14;

const WORKDAY_START_HOUR: f64 = 8.0;
const WORKDAY_END_HOUR: f64 = 18.0;
const WORKDAY_PEAK_HOUR: f64 = 14.0;

/// Completion latency in days and its weight.
const COMPLETION_LATENCY: [(i64, f64); 9] = [
    (1, 0.05),
    (2, 0.15),
    (3, 0.20),
    (5, 0.20),
    (7, 0.15),
    (10, 0.10),
    (14, 0.08),
    (21, 0.05),
    (30, 0.02),
];

pub struct Timeline {
    now: NaiveDateTime,
    work_hours: Triangular<f64>,
    latency: WeightedIndex<f64>,
}

impl Timeline {
    pub fn new(now: NaiveDateTime) -> Result<Self> {
        let work_hours = Triangular::new(WORKDAY_START_HOUR, WORKDAY_END_HOUR, WORKDAY_PEAK_HOUR)
            .map_err(|e| anyhow!("Invalid work-hours distribution: {:?}", e))?;
        let latency = WeightedIndex::new(COMPLETION_LATENCY.iter().map(|(_, w)| *w))
            .map_err(|e| anyhow!("Invalid completion latency table: {}", e))?;
        Ok(Self {
            now,
            work_hours,
            latency,
        })
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// A creation time up to `max_days_ago` days before `anchor`.
    ///
    /// Weekend days move back to Friday 70% of the time; the remaining 30% is
    /// the deliberate weekend tail. Never later than `anchor`.
    pub fn creation_timestamp(
        &self,
        rng: &mut SimRng,
        anchor: NaiveDateTime,
        max_days_ago: i64,
    ) -> NaiveDateTime {
        let days_ago = rng.gen_range(0..=max_days_ago.max(0));
        let mut day = anchor.date() - Duration::days(days_ago);

        match day.weekday() {
            Weekday::Sat if chance(rng, 0.7) => day -= Duration::days(1),
            Weekday::Sun if chance(rng, 0.7) => day -= Duration::days(2),
            _ => {}
        }

        let hour = (self.work_hours.sample(rng) as u32).min(23);
        let minute = rng.gen_range(0..60);
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        day.and_time(time).min(anchor)
    }

    /// Due date for a task created at `created_at`, or `None` for no due date.
    ///
    /// One categorical roll picks the horizon: 10% none, then (only when
    /// `allow_overdue`) 10% overdue by 1-60 days, then 1-7, 8-30 or 31-120
    /// days ahead of now.
    pub fn due_date(
        &self,
        rng: &mut SimRng,
        created_at: NaiveDateTime,
        project_type: ProjectType,
        allow_overdue: bool,
    ) -> Option<NaiveDate> {
        let roll: f64 = rng.r#gen();
        if roll < 0.10 {
            return None;
        }

        let mut due = if allow_overdue && roll < 0.20 {
            self.now - Duration::days(rng.gen_range(1..=60))
        } else if roll < 0.45 {
            self.now + Duration::days(rng.gen_range(1..=7))
        } else if roll < 0.85 {
            self.now + Duration::days(rng.gen_range(8..=30))
        } else {
            self.now + Duration::days(rng.gen_range(31..=120))
        };

        if chance(rng, 0.85) {
            due = snap_datetime_to_weekday(due);
        }

        if project_type == ProjectType::Engineering && chance(rng, 0.3) {
            due = snap_datetime_to_weekday(next_sprint_boundary(created_at, due));
        }

        Some(due.date())
    }

    /// Completion time for work created at `created_at`.
    ///
    /// Latency is drawn from [`COMPLETION_LATENCY`] plus 1-23 hours of jitter.
    /// When that lands past now the latency is clamped to the window that is
    /// left and the jitter redrawn inside it. Never later than now; work
    /// created at or after now completes at now.
    pub fn completed_at(&self, rng: &mut SimRng, created_at: NaiveDateTime) -> NaiveDateTime {
        let latency = COMPLETION_LATENCY[self.latency.sample(rng)].0;
        let candidate =
            created_at + Duration::days(latency) + Duration::hours(rng.gen_range(1..=23));
        if candidate <= self.now {
            return candidate;
        }

        let available = self.now - created_at;
        if available <= Duration::zero() {
            return self.now;
        }

        let days = latency.min(available.num_days());
        let remaining = available - Duration::days(days);
        let max_hours = remaining.num_hours().clamp(0, 23);
        let hours = if max_hours >= 1 {
            rng.gen_range(1..=max_hours)
        } else {
            0
        };

        (created_at + Duration::days(days) + Duration::hours(hours))
            .min(self.now)
            .max(created_at)
    }
}

/// Move Saturday forward two days and Sunday forward one.
pub fn snap_to_weekday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date + Duration::days(2),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn snap_datetime_to_weekday(dt: NaiveDateTime) -> NaiveDateTime {
    snap_to_weekday(dt.date()).and_time(dt.time())
}

/// First whole multiple of [`SPRINT_DAYS`] after `created_at` that lies
/// strictly beyond the whole-day distance to `due`.
fn next_sprint_boundary(created_at: NaiveDateTime, due: NaiveDateTime) -> NaiveDateTime {
    let days_diff = (due - created_at).num_seconds().div_euclid(86_400);
    let boundary = (days_diff.div_euclid(SPRINT_DAYS) + 1) * SPRINT_DAYS;
    created_at + Duration::days(boundary)
}

pub fn format_timestamp(dt: NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| anyhow!("Invalid timestamp '{}': {}", s, e))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| anyhow!("Invalid date '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    fn timeline() -> Timeline {
        // A Wednesday afternoon.
        Timeline::new(parse_timestamp("2025-06-18T15:30:00").unwrap()).unwrap()
    }

    #[test]
    fn snap_to_weekday_moves_weekends_forward() {
        let sat = parse_date("2025-06-21").unwrap();
        let sun = parse_date("2025-06-22").unwrap();
        let mon = parse_date("2025-06-23").unwrap();
        assert_eq!(snap_to_weekday(sat), mon);
        assert_eq!(snap_to_weekday(sun), mon);
        assert_eq!(snap_to_weekday(mon), mon);
    }

    #[test]
    fn sprint_boundary_is_a_multiple_of_fourteen_days() {
        let created = parse_timestamp("2025-06-01T10:00:00").unwrap();
        let due = parse_timestamp("2025-06-20T10:00:00").unwrap();
        let snapped = next_sprint_boundary(created, due);
        assert_eq!((snapped - created).num_days(), 28);

        // Due before creation still lands on a boundary measured from creation.
        let early = parse_timestamp("2025-05-25T10:00:00").unwrap();
        assert_eq!((next_sprint_boundary(created, early) - created).num_days(), 0);
    }

    #[test]
    fn creation_timestamps_stay_in_window_and_business_hours() {
        let tl = timeline();
        let mut rng = seeded(11);
        for _ in 0..2_000 {
            let ts = tl.creation_timestamp(&mut rng, tl.now(), 365);
            assert!(ts <= tl.now());
            assert!(ts >= tl.now() - Duration::days(368));
            let hour = chrono::Timelike::hour(&ts);
            assert!((8..=18).contains(&hour), "hour {hour}");
        }
    }

    #[test]
    fn creation_timestamps_favour_weekdays() {
        let tl = timeline();
        let mut rng = seeded(12);
        let n = 10_000;
        let weekend = (0..n)
            .map(|_| tl.creation_timestamp(&mut rng, tl.now(), 365))
            .filter(|ts| matches!(ts.weekday(), Weekday::Sat | Weekday::Sun))
            .count();
        // Uniform would be ~28.6%; the 70% Friday relocation leaves ~8.6%.
        let share = weekend as f64 / n as f64;
        assert!(share > 0.04 && share < 0.14, "weekend share {share}");
    }

    #[test]
    fn due_dates_without_overdue_are_never_in_the_past() {
        let tl = timeline();
        let mut rng = seeded(13);
        let created = tl.now() - Duration::days(40);
        for _ in 0..2_000 {
            if let Some(due) = tl.due_date(&mut rng, created, ProjectType::Marketing, false) {
                assert!(due > tl.today());
            }
        }
    }

    #[test]
    fn due_dates_include_none_and_overdue_when_allowed() {
        let tl = timeline();
        let mut rng = seeded(14);
        let created = tl.now() - Duration::days(90);
        let draws: Vec<Option<NaiveDate>> = (0..5_000)
            .map(|_| tl.due_date(&mut rng, created, ProjectType::Ops, true))
            .collect();
        let none = draws.iter().filter(|d| d.is_none()).count();
        let overdue = draws
            .iter()
            .filter(|d| matches!(d, Some(due) if *due < tl.today()))
            .count();
        assert!((350..650).contains(&none), "none {none}");
        assert!((350..650).contains(&overdue), "overdue {overdue}");
    }

    #[test]
    fn due_dates_rarely_fall_on_weekends() {
        let tl = timeline();
        let mut rng = seeded(15);
        let created = tl.now() - Duration::days(10);
        let dues: Vec<NaiveDate> = (0..5_000)
            .filter_map(|_| tl.due_date(&mut rng, created, ProjectType::Engineering, false))
            .collect();
        let weekend = dues
            .iter()
            .filter(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count();
        assert!((weekend as f64) / (dues.len() as f64) < 0.10);
    }

    #[test]
    fn completed_at_is_bounded_by_creation_and_now() {
        let tl = timeline();
        let mut rng = seeded(16);
        for days_ago in [0, 1, 2, 5, 29, 200] {
            let created = tl.now() - Duration::days(days_ago) - Duration::minutes(7);
            for _ in 0..300 {
                let done = tl.completed_at(&mut rng, created);
                assert!(done >= created);
                assert!(done <= tl.now());
            }
        }
    }

    #[test]
    fn completed_at_never_passes_now() {
        let tl = timeline();
        let mut rng = seeded(17);
        assert_eq!(tl.completed_at(&mut rng, tl.now()), tl.now());
        let created = tl.now() + Duration::days(3);
        assert_eq!(tl.completed_at(&mut rng, created), tl.now());
    }

    #[test]
    fn timestamps_round_trip_through_text() {
        let ts = parse_timestamp("2024-02-29T08:05:00").unwrap();
        assert_eq!(format_timestamp(ts), "2024-02-29T08:05:00");
        let d = parse_date("2024-02-29").unwrap();
        assert_eq!(format_date(d), "2024-02-29");
    }
}
