use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::aggregate::{self, DailyStats, EnergizeStat, HourlyProductivity, PeriodStats};
use crate::clock::Clock;
use crate::error::{Result, ValidationError};
use crate::storage::Storage;

/// Longest window, in days, that a day-count query looks back over.
/// Larger requests are clamped.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

fn lookback(days: u32) -> Duration {
    Duration::days(i64::from(days.min(MAX_LOOKBACK_DAYS)))
}

/// Storage-backed analytics.
///
/// Borrows the storage and clock; every call re-queries so results always
/// reflect what has been persisted.
pub struct Analytics<'a, S: Storage + ?Sized, C: Clock + ?Sized> {
    storage: &'a S,
    clock: &'a C,
}

impl<'a, S: Storage + ?Sized, C: Clock + ?Sized> Analytics<'a, S, C> {
    pub fn new(storage: &'a S, clock: &'a C) -> Self {
        Self { storage, clock }
    }

    fn sessions_on(&self, date: NaiveDate) -> Result<Vec<crate::session::Session>> {
        let (start, end) = aggregate::local_day_bounds(date, self.clock.offset_on(date));
        self.storage.find_sessions_between(start, end)
    }

    pub fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        let sessions = self.sessions_on(date)?;
        Ok(aggregate::daily_stats(&sessions, date, self.clock.offset_on(date)))
    }

    pub fn today(&self) -> Result<DailyStats> {
        self.daily_stats(self.clock.today())
    }

    /// Summary over sessions started in `[start, end)`.
    ///
    /// # Errors
    /// Returns `InvalidTimeRange` unless `end` is after `start`.
    pub fn period_stats(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<PeriodStats> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end }.into());
        }
        let sessions = self.storage.find_sessions_between(start, end)?;
        Ok(aggregate::period_stats(&sessions, start, end))
    }

    /// Summary over the last `days` local days, today included. At most
    /// [`MAX_LOOKBACK_DAYS`] days are covered.
    pub fn last_days(&self, days: u32) -> Result<PeriodStats> {
        let today = self.clock.today();
        let first = today - lookback(days.max(1) - 1);
        let (start, _) = aggregate::local_day_bounds(first, self.clock.offset_on(first));
        let (_, end) = aggregate::local_day_bounds(today, self.clock.offset_on(today));
        self.period_stats(start, end)
    }

    pub fn deep_work_duration(&self, date: NaiveDate) -> Result<Duration> {
        let sessions = self.sessions_on(date)?;
        Ok(aggregate::deep_work_duration(&sessions, date, self.clock.offset_on(date)))
    }

    /// Consecutive days, ending today, with at least `threshold` of deep work.
    pub fn deep_work_streak(&self, threshold: Duration) -> Result<u32> {
        aggregate::deep_work_streak(self.clock.today(), threshold, |date| {
            self.deep_work_duration(date)
        })
    }

    /// Completed work per hour of day over the last `days` days (at most
    /// [`MAX_LOOKBACK_DAYS`]).
    pub fn hourly_productivity(&self, days: u32) -> Result<HourlyProductivity> {
        let since = self.clock.now() - lookback(days);
        let sessions = self.storage.find_sessions_since(since)?;
        Ok(aggregate::hourly_productivity(&sessions, since, |at| {
            self.clock.offset_at(at)
        }))
    }

    /// Energize correlations over the last `days` days (at most
    /// [`MAX_LOOKBACK_DAYS`]).
    pub fn energize_last_days(&self, days: u32) -> Result<Vec<EnergizeStat>> {
        let end = self.clock.now();
        self.energize_stats(end - lookback(days.max(1)), end)
    }

    pub fn energize_stats(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<EnergizeStat>> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end }.into());
        }
        let sessions = self.storage.find_sessions_between(start, end)?;
        Ok(aggregate::energize_stats(&sessions, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CoreError;
    use crate::methodology::Methodology;
    use crate::session::{Session, SessionKind};
    use crate::storage::Database;
    use chrono::{FixedOffset, TimeZone};

    fn record(db: &Database, methodology: Methodology, start: DateTime<Utc>, minutes: i64) {
        let mut s = Session::new(SessionKind::Work, methodology, Duration::minutes(minutes), start);
        s.complete(start + Duration::minutes(minutes));
        db.save_session(&s).unwrap();
    }

    #[test]
    fn today_reads_from_storage() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 18, 0, 0).unwrap());
        record(&db, Methodology::Pomodoro, Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap(), 25);
        record(&db, Methodology::Pomodoro, Utc.with_ymd_and_hms(2024, 5, 5, 9, 0, 0).unwrap(), 25);

        let stats = Analytics::new(&db, &clock).today().unwrap();
        assert_eq!(stats.work_sessions, 1);
        assert_eq!(stats.total_work(), Duration::minutes(25));
    }

    #[test]
    fn streak_walks_stored_days() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap());
        for day in [5, 4, 3] {
            record(&db, Methodology::DeepWork, Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap(), 90);
        }
        record(&db, Methodology::DeepWork, Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(), 90);

        let analytics = Analytics::new(&db, &clock);
        assert_eq!(analytics.deep_work_streak(Duration::minutes(60)).unwrap(), 3);
        assert_eq!(analytics.deep_work_streak(Duration::minutes(120)).unwrap(), 0);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap());
        let now = clock.now();
        let err = Analytics::new(&db, &clock).period_stats(now, now).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn last_days_includes_today() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap());
        record(&db, Methodology::MakeTime, Utc.with_ymd_and_hms(2024, 5, 6, 7, 0, 0).unwrap(), 45);
        record(&db, Methodology::MakeTime, Utc.with_ymd_and_hms(2024, 4, 30, 7, 0, 0).unwrap(), 45);
        record(&db, Methodology::MakeTime, Utc.with_ymd_and_hms(2024, 4, 29, 7, 0, 0).unwrap(), 45);

        let week = Analytics::new(&db, &clock).last_days(7).unwrap();
        assert_eq!(week.total_sessions, 2);
    }
    #[test]
    fn huge_day_counts_are_clamped() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap());
        record(&db, Methodology::Pomodoro, Utc.with_ymd_and_hms(2024, 5, 6, 7, 0, 0).unwrap(), 25);
        record(&db, Methodology::Pomodoro, Utc.with_ymd_and_hms(2004, 5, 6, 7, 0, 0).unwrap(), 25);

        let analytics = Analytics::new(&db, &clock);
        assert_eq!(analytics.last_days(u32::MAX).unwrap().total_sessions, 1);
        assert_eq!(
            analytics.hourly_productivity(u32::MAX).unwrap().work_at(7),
            Duration::minutes(25)
        );
        assert!(analytics.energize_last_days(u32::MAX).unwrap().is_empty());
    }

    #[test]
    fn past_days_use_their_own_offset() {
        let winter = FixedOffset::east_opt(3600).unwrap();
        let summer = FixedOffset::east_opt(2 * 3600).unwrap();
        let clock = ManualClock::with_offset(Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap(), winter)
            .with_offset_change(Utc.with_ymd_and_hms(2024, 3, 31, 1, 0, 0).unwrap(), summer);
        let db = Database::open_memory().unwrap();
        // 08:30 local on both sides of the switch, and 23:30 local on the 30th.
        record(&db, Methodology::Pomodoro, Utc.with_ymd_and_hms(2024, 3, 30, 7, 30, 0).unwrap(), 25);
        record(&db, Methodology::Pomodoro, Utc.with_ymd_and_hms(2024, 4, 1, 6, 30, 0).unwrap(), 25);
        record(&db, Methodology::Pomodoro, Utc.with_ymd_and_hms(2024, 3, 30, 22, 30, 0).unwrap(), 25);

        let analytics = Analytics::new(&db, &clock);
        let hourly = analytics.hourly_productivity(7).unwrap();
        assert_eq!(hourly.work_at(8), Duration::minutes(50));
        assert_eq!(hourly.work_at(23), Duration::minutes(25));

        let march_30 = NaiveDate::from_ymd_opt(2024, 3, 30).unwrap();
        assert_eq!(analytics.daily_stats(march_30).unwrap().work_sessions, 2);
    }
}
