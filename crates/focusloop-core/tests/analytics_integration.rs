//! Integration tests for the analytics engine.
//!
//! Records sessions through the scheduler across several days and checks
//! the summaries read back from storage.

use chrono::{Duration, FixedOffset, TimeZone, Utc};
use focusloop_core::{Config, Database, ManualClock, Methodology, SessionScheduler, StartWork};

fn scheduler_at(clock: ManualClock) -> SessionScheduler<Database, ManualClock> {
    SessionScheduler::new(Database::open_memory().unwrap(), clock, Config::default())
}

fn work(s: &SessionScheduler<Database, ManualClock>, methodology: Methodology, minutes: i64) -> String {
    let session = s
        .start_work(StartWork::new(methodology).duration(Duration::minutes(minutes)))
        .unwrap();
    s.clock().advance(Duration::minutes(minutes));
    s.stop().unwrap();
    session.id
}

#[test]
fn test_deep_work_streak_across_days() {
    let s = scheduler_at(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()));

    // May 1: 90 min, May 2: nothing, May 3-5: 60+ min each.
    work(&s, Methodology::DeepWork, 90);
    for day in 3..=5 {
        s.clock().set(Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap());
        work(&s, Methodology::DeepWork, 50);
        work(&s, Methodology::DeepWork, 25);
    }

    // Morning of May 6, nothing done yet: today is skipped.
    s.clock().set(Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap());
    assert_eq!(s.deep_work_streak(Duration::minutes(60)).unwrap(), 3);

    // Pomodoro work does not count toward the deep work total.
    work(&s, Methodology::Pomodoro, 90);
    assert_eq!(s.deep_work_streak(Duration::minutes(60)).unwrap(), 3);

    work(&s, Methodology::DeepWork, 60);
    assert_eq!(s.deep_work_streak(Duration::minutes(60)).unwrap(), 4);
    assert_eq!(s.deep_work_streak(Duration::minutes(80)).unwrap(), 0);
}

#[test]
fn test_week_summary_by_methodology() {
    let s = scheduler_at(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()));
    let scored = work(&s, Methodology::MakeTime, 60);
    s.set_focus_score(&scored, 5).unwrap();
    s.set_energize_activity(&scored, "walk").unwrap();

    s.clock().advance(Duration::hours(1));
    let other = work(&s, Methodology::MakeTime, 30);
    s.set_focus_score(&other, 3).unwrap();
    s.set_energize_activity(&other, "coffee").unwrap();

    s.clock().advance(Duration::days(1));
    let deep = s.start_work(StartWork::new(Methodology::DeepWork)).unwrap();
    s.log_distraction(&deep.id, "phone", None).unwrap();
    s.clock().advance(Duration::minutes(90));
    s.stop().unwrap();

    let week = s.analytics().last_days(7).unwrap();
    assert_eq!(week.total_sessions, 3);
    assert_eq!(week.total_work_ms, 180 * 60_000);
    assert_eq!(week.by_methodology[&Methodology::MakeTime].sessions, 2);
    assert_eq!(week.by_methodology[&Methodology::DeepWork].sessions, 1);
    assert_eq!(week.average_focus_score, Some(4.0));
    assert_eq!(week.distractions, 1);

    let energize = s.analytics().energize_stats(week.start, week.end).unwrap();
    assert_eq!(energize.len(), 2);
    assert_eq!(energize[0].activity, "walk");
    assert_eq!(energize[0].average_focus_score, 5.0);
}

#[test]
fn test_hourly_productivity_uses_clock_offset() {
    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let clock = ManualClock::with_offset(Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap(), tokyo);
    let s = scheduler_at(clock);

    work(&s, Methodology::Pomodoro, 25);
    s.clock().advance(Duration::hours(5));
    work(&s, Methodology::Pomodoro, 25);

    let hourly = s.analytics().hourly_productivity(7).unwrap();
    assert_eq!(hourly.work_at(9), Duration::minutes(25));
    assert_eq!(hourly.work_at(14), Duration::minutes(25));
    assert_eq!(hourly.work_at(0), Duration::zero());
}

#[test]
fn test_daily_stats_follow_local_calendar_day() {
    let berlin = FixedOffset::east_opt(2 * 3600).unwrap();
    // 23:30 UTC on May 5 is 01:30 on May 6 in UTC+2.
    let clock = ManualClock::with_offset(Utc.with_ymd_and_hms(2024, 5, 5, 23, 30, 0).unwrap(), berlin);
    let s = scheduler_at(clock);
    work(&s, Methodology::Pomodoro, 25);

    let may6 = chrono::NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    let may5 = chrono::NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
    assert_eq!(s.analytics().daily_stats(may6).unwrap().work_sessions, 1);
    assert_eq!(s.analytics().daily_stats(may5).unwrap().work_sessions, 0);
}
