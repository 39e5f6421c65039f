use anyhow::Context;
use anyhow::Result;
use time::Date;
use time::Duration;
use time::Month;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Pick the calendar month to report on.
///
/// Whatever is not given falls back to the current year or month. `month` is 1-based.
pub fn resolve_target(year: Option<i32>, month: Option<u8>, today: Date) -> Result<(i32, Month)> {
    let year = year.unwrap_or(today.year());
    let month = match month {
        Some(month) => Month::try_from(month)
            .with_context(|| format!("Invalid month {month}, expected 1-12"))?,
        None => today.month(),
    };

    Ok((year, month))
}

/// A calendar month in local time, as the inclusive range of seconds the exchange is queried with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: Month,
    /// Local midnight of the first day of the month.
    pub start: OffsetDateTime,
    /// The last second of the month, i.e. one second before the next month starts.
    pub end: OffsetDateTime,
}

impl MonthWindow {
    /// `local_offset_at` gives the local UTC offset in force at a given wall-clock time, so that
    /// a daylight saving change within the month shifts the end but not the start.
    pub fn resolve(
        year: i32,
        month: Month,
        local_offset_at: impl Fn(PrimitiveDateTime) -> UtcOffset,
    ) -> Result<Self> {
        let first_day = Date::from_calendar_date(year, month, 1)
            .with_context(|| format!("Invalid month {month} {year}"))?
            .midnight();

        let (next_year, next_month) = match month {
            Month::December => (year + 1, Month::January),
            month => (year, month.next()),
        };
        let first_day_of_next_month = Date::from_calendar_date(next_year, next_month, 1)
            .with_context(|| format!("Invalid month {next_month} {next_year}"))?
            .midnight();

        let start = first_day.assume_offset(local_offset_at(first_day));
        let end = first_day_of_next_month.assume_offset(local_offset_at(first_day_of_next_month))
            - Duration::SECOND;

        Ok(Self {
            year,
            month,
            start,
            end,
        })
    }

    pub fn start_time(&self) -> i64 {
        self.start.unix_timestamp()
    }

    pub fn end_time(&self) -> i64 {
        self.end.unix_timestamp()
    }

    /// Upper-case three letter month name, e.g. `JAN`.
    pub fn label(&self) -> &'static str {
        MONTHS[u8::from(self.month) as usize - 1]
    }
}

/// The local UTC offset at `datetime`, falling back to UTC if it cannot be determined.
///
/// The local offset can only be looked up while the process is single-threaded, so this has to be
/// called before the async runtime is started.
pub fn local_offset_at(datetime: PrimitiveDateTime) -> UtcOffset {
    match UtcOffset::local_offset_at(datetime.assume_utc()) {
        Ok(offset) => offset,
        Err(e) => {
            tracing::warn!(%datetime, "Could not determine local offset, using UTC: {e}");
            UtcOffset::UTC
        }
    }
}

/// Today's date in local time. Same restrictions as [`local_offset_at`] apply.
pub fn today_local() -> Date {
    match OffsetDateTime::now_local() {
        Ok(now) => now.date(),
        Err(e) => {
            tracing::warn!("Could not determine local time, using UTC: {e}");
            OffsetDateTime::now_utc().date()
        }
    }
}
