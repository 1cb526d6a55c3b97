//! Injectable time source.
//!
//! Every "now" the engine reads comes from a [`Clock`], so tests can pin or
//! step time instead of sleeping. Calendar-day math (today, yesterday,
//! hour-of-day buckets) uses the UTC offset in effect on the day or at the
//! instant being converted, so past days keep their own DST offset.

use std::cell::Cell;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Offset in effect now.
    fn offset(&self) -> FixedOffset {
        self.offset_at(self.now())
    }

    /// Offset in effect at `instant`.
    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset;

    /// Offset in effect on the local calendar day `date`, read at local noon.
    fn offset_on(&self, date: NaiveDate) -> FixedOffset;

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset()).date_naive()
    }
}

fn local_noon(date: NaiveDate) -> chrono::NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN))
}

/// Wall clock in the machine's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        Local.offset_from_utc_datetime(&instant.naive_utc()).fix()
    }

    fn offset_on(&self, date: NaiveDate) -> FixedOffset {
        Local
            .offset_from_local_datetime(&local_noon(date))
            .earliest()
            .map(|offset| offset.fix())
            .unwrap_or_else(|| self.offset())
    }
}

/// Manually driven clock for tests and simulations.
///
/// Interior mutability lets a test advance time while the clock is owned by
/// a scheduler. One offset change can be scheduled to stand in for a DST
/// switch.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
    offset: FixedOffset,
    change: Option<(DateTime<Utc>, FixedOffset)>,
}

impl ManualClock {
    /// A clock frozen at `now`, with UTC calendar days.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_offset(now, Utc.fix())
    }

    pub fn with_offset(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Cell::new(now),
            offset,
            change: None,
        }
    }

    /// Switch to `offset` from the instant `at` onwards.
    pub fn with_offset_change(mut self, at: DateTime<Utc>, offset: FixedOffset) -> Self {
        self.change = Some((at, offset));
        self
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        match self.change {
            Some((at, offset)) if instant >= at => offset,
            _ => self.offset,
        }
    }

    fn offset_on(&self, date: NaiveDate) -> FixedOffset {
        let noon = local_noon(date) - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        self.offset_at(noon.and_utc())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn offset(&self) -> FixedOffset {
        (**self).offset()
    }

    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        (**self).offset_at(instant)
    }

    fn offset_on(&self, date: NaiveDate) -> FixedOffset {
        (**self).offset_on(date)
    }
}
