//! Deadline arithmetic for the dashboard.
//!
//! Every computation here is pure: the `*_at` functions take "now" as an
//! argument, and [`Timeline`] only bundles the configured civil zone with an
//! injected [`Clock`]. Durations are computed on absolute instants in whole
//! minutes; the zone is used for interpreting local wire strings and for
//! rendering.

use chrono::{DateTime, Duration, Utc};
use jiff::{civil, tz::TimeZone, Timestamp};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// IANA zone the business operates in.
pub const DEFAULT_CIVIL_ZONE: &str = "America/Santiago";

/// Rendering pattern for absolute dates (`DD/MM/YYYY HH:mm`).
pub const ABSOLUTE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Returned by [`remaining_duration_at`] once the deadline has been reached.
pub const NO_TIME_LEFT: &str = "0h 0m";

/// Returned by [`elapsed_duration_at`] while the start lies in the future.
pub const NOT_STARTED: &str = "Aún no inicia";

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("Unknown time zone: {0}")]
    UnknownZone(String),
    #[error("Unparseable date: {0}")]
    Unparseable(String),
    #[error("Date out of range")]
    OutOfRange,
}

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A timestamp input: either an absolute instant or a wire string.
#[derive(Debug, Clone, Copy)]
pub enum Moment<'a> {
    Instant(DateTime<Utc>),
    Text(&'a str),
}

impl From<DateTime<Utc>> for Moment<'_> {
    fn from(value: DateTime<Utc>) -> Self {
        Moment::Instant(value)
    }
}

impl From<&DateTime<Utc>> for Moment<'_> {
    fn from(value: &DateTime<Utc>) -> Self {
        Moment::Instant(*value)
    }
}

impl<'a> From<&'a str> for Moment<'a> {
    fn from(value: &'a str) -> Self {
        Moment::Text(value)
    }
}

impl<'a> From<&'a String> for Moment<'a> {
    fn from(value: &'a String) -> Self {
        Moment::Text(value.as_str())
    }
}

/// Resolves an IANA zone identifier.
pub fn civil_zone(name: &str) -> Result<TimeZone, TimeError> {
    TimeZone::get(name).map_err(|_| TimeError::UnknownZone(name.to_string()))
}

/// Parses a wire timestamp.
///
/// Strings carrying an offset (`2024-01-01T03:00:00Z`) are absolute. Local
/// strings (`2024-01-01T00:00`, `2024-01-01T00:00:00`, `2024-01-01`) are civil
/// time in `zone`; a local time skipped by a DST gap moves forward and a
/// repeated one resolves to its earlier instant.
pub fn parse_instant(input: &str, zone: &TimeZone) -> Result<DateTime<Utc>, TimeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimeError::Unparseable(input.to_string()));
    }

    if let Ok(timestamp) = trimmed.parse::<Timestamp>() {
        return from_timestamp(timestamp);
    }

    let local = match trimmed.parse::<civil::DateTime>() {
        Ok(datetime) => datetime,
        Err(_) => trimmed
            .parse::<civil::Date>()
            .map(|date| date.to_datetime(civil::Time::midnight()))
            .map_err(|_| TimeError::Unparseable(input.to_string()))?,
    };

    let zoned = local
        .to_zoned(zone.clone())
        .map_err(|_| TimeError::OutOfRange)?;
    from_timestamp(zoned.timestamp())
}

fn from_timestamp(timestamp: Timestamp) -> Result<DateTime<Utc>, TimeError> {
    DateTime::<Utc>::from_timestamp_millis(timestamp.as_millisecond()).ok_or(TimeError::OutOfRange)
}

fn to_timestamp(instant: DateTime<Utc>) -> Result<Timestamp, TimeError> {
    Timestamp::from_millisecond(instant.timestamp_millis()).map_err(|_| TimeError::OutOfRange)
}

/// Renders `instant` in `zone` as `DD/MM/YYYY HH:mm`.
pub fn format_absolute(instant: DateTime<Utc>, zone: &TimeZone) -> Result<String, TimeError> {
    let zoned = to_timestamp(instant)?.to_zoned(zone.clone());
    Ok(zoned.strftime(ABSOLUTE_FORMAT).to_string())
}

/// Whole minutes from `from` to `to`, truncated toward zero.
fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes()
}

fn split_minutes(total: i64) -> (i64, i64, i64) {
    let days = total / MINUTES_PER_DAY;
    let hours = (total % MINUTES_PER_DAY) / MINUTES_PER_HOUR;
    let minutes = total % MINUTES_PER_HOUR;
    (days, hours, minutes)
}

/// Time left until `deadline`: `"{d}d {h}h"` when at least a day remains,
/// `"{h}h {m}m"` otherwise, [`NO_TIME_LEFT`] once the deadline is reached.
pub fn remaining_duration_at(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total = minutes_between(now, deadline);
    if total <= 0 {
        return NO_TIME_LEFT.to_string();
    }

    let (days, hours, minutes) = split_minutes(total);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

/// Time since `start`, reported in its largest non-zero unit only.
pub fn elapsed_duration_at(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if start > now {
        return NOT_STARTED.to_string();
    }

    let (days, hours, minutes) = split_minutes(minutes_between(start, now));
    if days > 0 {
        return pluralize(days, "día", "días");
    }
    if hours > 0 {
        return pluralize(hours, "hora", "horas");
    }
    pluralize(minutes, "minuto", "minutos")
}

fn pluralize(count: i64, singular: &str, plural: &str) -> String {
    let unit = if count == 1 { singular } else { plural };
    format!("{} {}", count, unit)
}

/// Share of the `start..deadline` span already elapsed, in `[0, 100]`.
pub fn progress_percent_at(start: DateTime<Utc>, deadline: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    if now <= start {
        return 0.0;
    }
    if now >= deadline {
        return 100.0;
    }

    let total = (deadline - start).num_milliseconds() as f64;
    let elapsed = (now - start).num_milliseconds() as f64;
    ((elapsed / total) * 100.0).clamp(0.0, 100.0)
}

pub fn is_overdue_at(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    deadline < now
}

/// Whole days left before `deadline`; 0 once it has passed.
pub fn days_remaining_at(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let total = minutes_between(now, deadline);
    if total <= 0 {
        return 0;
    }
    total / MINUTES_PER_DAY
}

/// The configured civil zone plus an injected clock.
#[derive(Clone)]
pub struct Timeline {
    zone: TimeZone,
    zone_name: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("zone", &self.zone_name)
            .finish_non_exhaustive()
    }
}

impl Timeline {
    pub fn new(zone_name: &str, clock: Arc<dyn Clock>) -> Result<Self, TimeError> {
        Ok(Self {
            zone: civil_zone(zone_name)?,
            zone_name: zone_name.to_string(),
            clock,
        })
    }

    /// Wall-clock timeline in `zone_name`.
    pub fn system(zone_name: &str) -> Result<Self, TimeError> {
        Self::new(zone_name, Arc::new(SystemClock))
    }

    pub fn zone(&self) -> &TimeZone {
        &self.zone
    }

    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn instant<'a>(&self, moment: impl Into<Moment<'a>>) -> Result<DateTime<Utc>, TimeError> {
        match moment.into() {
            Moment::Instant(instant) => Ok(instant),
            Moment::Text(text) => parse_instant(text, &self.zone),
        }
    }

    pub fn format_absolute<'a>(&self, moment: impl Into<Moment<'a>>) -> Result<String, TimeError> {
        format_absolute(self.instant(moment)?, &self.zone)
    }

    pub fn remaining_duration<'a>(
        &self,
        deadline: impl Into<Moment<'a>>,
    ) -> Result<String, TimeError> {
        Ok(remaining_duration_at(self.instant(deadline)?, self.now()))
    }

    pub fn elapsed_duration<'a>(&self, start: impl Into<Moment<'a>>) -> Result<String, TimeError> {
        Ok(elapsed_duration_at(self.instant(start)?, self.now()))
    }

    pub fn progress_percent<'a, 'b>(
        &self,
        start: impl Into<Moment<'a>>,
        deadline: impl Into<Moment<'b>>,
    ) -> Result<f64, TimeError> {
        Ok(progress_percent_at(
            self.instant(start)?,
            self.instant(deadline)?,
            self.now(),
        ))
    }

    pub fn is_overdue<'a>(&self, deadline: impl Into<Moment<'a>>) -> Result<bool, TimeError> {
        Ok(is_overdue_at(self.instant(deadline)?, self.now()))
    }

    pub fn days_remaining<'a>(&self, deadline: impl Into<Moment<'a>>) -> Result<i64, TimeError> {
        Ok(days_remaining_at(self.instant(deadline)?, self.now()))
    }
}
