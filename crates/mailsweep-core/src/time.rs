use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::{Error, Result};

pub type Instant = DateTime<FixedOffset>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parses `YYYY-MM-DD` or `YYYY-MM-DD HH:MM` as a UTC instant.
pub fn parse_timestamp(raw: &str) -> Result<Instant> {
    let trimmed = raw.trim();
    let naive = if trimmed.contains(' ') {
        NaiveDateTime::parse_from_str(trimmed, DATE_TIME_FORMAT)
    } else {
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map(|d| d.and_time(NaiveTime::MIN))
    }
    .map_err(|_| Error::BadTimestamp(raw.to_string()))?;
    Ok(Utc.from_utc_datetime(&naive).fixed_offset())
}

pub fn format_timestamp(instant: &Instant) -> String {
    instant.with_timezone(&Utc).format(DATE_TIME_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: Instant,
    end: Instant,
}

impl TimeWindow {
    pub fn new(start: Instant, end: Instant) -> Result<Self> {
        if start > end {
            return Err(Error::ReversedWindow {
                start: format_timestamp(&start),
                end: format_timestamp(&end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, instant: &Instant) -> bool {
        self.start <= *instant && *instant <= self.end
    }
}

pub trait Clock {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
