use chrono::{DateTime, Duration, LocalResult, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::params::ResetTime;

/// The work window in effect at some instant.
///
/// Bounds are absolute instants: a window that spans a DST change still
/// lasts exactly `work_hours`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Whole seconds until `end`, or 0 when `now` is outside `[start, end)`.
    pub energy_remaining: u64,
}

impl WorkWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    pub fn is_active(&self) -> bool {
        self.energy_remaining > 0
    }
}

/// Resolve the work window for `now`.
///
/// The window opens at `reset_time` on the current local date; when `now`
/// is earlier than that, the window that opened yesterday is the one in
/// effect. The reset time is read in `now`'s zone, everything after that
/// is measured in real elapsed time.
pub fn resolve<Tz: TimeZone>(now: &DateTime<Tz>, reset_time: ResetTime, work_hours: f64) -> WorkWindow {
    let zone = now.timezone();
    let now_utc = now.with_timezone(&Utc);
    let today = now.date_naive();

    let mut start = opening(&zone, today, reset_time);
    if now_utc < start {
        let yesterday = today.pred_opt().unwrap_or(today);
        start = opening(&zone, yesterday, reset_time);
    }
    let end = start + window_length(work_hours);

    let energy_remaining = if now_utc >= start && now_utc < end {
        ((end - now_utc).num_milliseconds() / 1000).max(0) as u64
    } else {
        0
    };

    WorkWindow {
        start,
        end,
        energy_remaining,
    }
}

/// The instant the reset time falls on `date` in `zone`.
///
/// On a fall-back day the earlier of the two readings wins. A reset time
/// skipped by a spring-forward jump is read with the offset in effect
/// before the jump, which lands just after it.
fn opening<Tz: TimeZone>(zone: &Tz, date: NaiveDate, reset_time: ResetTime) -> DateTime<Utc> {
    let local = date.and_time(reset_time.as_naive_time());
    match zone.from_local_datetime(&local) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        LocalResult::None => {
            let before = zone.offset_from_utc_datetime(&(local - Duration::days(1))).fix();
            let utc = local - Duration::seconds(before.local_minus_utc().into());
            Utc.from_utc_datetime(&utc)
        }
    }
}

/// Energy as a percentage of a full window, capped at 100.
pub fn energy_progress_pct(energy_remaining: u64, work_hours: f64) -> f64 {
    let full = work_hours * 3600.0;
    if full <= 0.0 {
        return 0.0;
    }
    (energy_remaining as f64 / full * 100.0).min(100.0)
}

fn window_length(work_hours: f64) -> Duration {
    if !work_hours.is_finite() || work_hours <= 0.0 {
        return Duration::zero();
    }
    // Floor to whole milliseconds so energy never exceeds work_hours * 3600.
    Duration::milliseconds((work_hours * 3_600_000.0).floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDateTime, NaiveTime};
    use proptest::prelude::*;

    fn at(day: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, h, m, s).unwrap()
    }

    fn nine() -> ResetTime {
        ResetTime::new(9, 0).unwrap()
    }

    /// US Eastern time for 2024 up to the autumn change: EST until clocks
    /// jump from 02:00 to 03:00 on 10 March, EDT after.
    #[derive(Debug, Clone, Copy)]
    struct Eastern2024;

    impl Eastern2024 {
        fn est() -> FixedOffset {
            FixedOffset::west_opt(5 * 3600).unwrap()
        }

        fn edt() -> FixedOffset {
            FixedOffset::west_opt(4 * 3600).unwrap()
        }

        fn local(h: u32, m: u32) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(h, m, 0).unwrap()
        }
    }

    impl TimeZone for Eastern2024 {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            Eastern2024
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if *local < Self::local(2, 0) {
                LocalResult::Single(Self::est())
            } else if *local >= Self::local(3, 0) {
                LocalResult::Single(Self::edt())
            } else {
                LocalResult::None
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::local(7, 0) {
                Self::est()
            } else {
                Self::edt()
            }
        }
    }

    #[test]
    fn before_reset_uses_yesterdays_window() {
        let w = resolve(&at(14, 8, 0, 0), nine(), 8.0);
        assert_eq!(w.start, at(13, 9, 0, 0));
        assert_eq!(w.end, at(13, 17, 0, 0));
        assert_eq!(w.energy_remaining, 0);
        assert!(!w.is_active());
    }

    #[test]
    fn inside_todays_window() {
        let w = resolve(&at(14, 10, 0, 0), nine(), 8.0);
        assert_eq!(w.start, at(14, 9, 0, 0));
        assert_eq!(w.end, at(14, 17, 0, 0));
        assert_eq!(w.energy_remaining, 7 * 3600);
    }

    #[test]
    fn window_opens_exactly_at_reset() {
        let w = resolve(&at(14, 9, 0, 0), nine(), 8.0);
        assert_eq!(w.start, at(14, 9, 0, 0));
        assert_eq!(w.energy_remaining, 8 * 3600);
    }

    #[test]
    fn window_end_is_exclusive() {
        let w = resolve(&at(14, 17, 0, 0), nine(), 8.0);
        assert_eq!(w.energy_remaining, 0);
        assert!(!w.contains(at(14, 17, 0, 0)));
    }

    #[test]
    fn energy_floors_partial_seconds() {
        let now = at(14, 16, 59, 58) + Duration::milliseconds(500);
        let w = resolve(&now, nine(), 8.0);
        assert_eq!(w.energy_remaining, 1);
    }

    #[test]
    fn overnight_window_spans_midnight() {
        let late = ResetTime::new(22, 0).unwrap();
        let w = resolve(&at(15, 1, 30, 0), late, 4.0);
        assert_eq!(w.start, at(14, 22, 0, 0));
        assert_eq!(w.end, at(15, 2, 0, 0));
        assert_eq!(w.energy_remaining, 30 * 60);
    }

    #[test]
    fn reset_time_is_read_in_the_callers_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = at(14, 1, 0, 0).with_timezone(&tokyo);
        let w = resolve(&now, nine(), 8.0);
        assert_eq!(w.start, at(14, 0, 0, 0));
        assert_eq!(w.energy_remaining, 7 * 3600);
    }

    #[test]
    fn spring_forward_counts_real_elapsed_time() {
        // Midnight EST is 05:00Z and 03:00 EDT is 07:00Z: two real hours
        // have passed although the wall clock moved three.
        let now = Eastern2024.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap();
        let w = resolve(&now, ResetTime::new(0, 0).unwrap(), 4.0);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap());
        assert_eq!(w.energy_remaining, 7200);
    }

    #[test]
    fn skipped_reset_time_opens_after_the_jump() {
        // 02:30 does not exist on the changeover day; read as EST it is 03:30 EDT.
        let now = Eastern2024.with_ymd_and_hms(2024, 3, 10, 3, 45, 0).unwrap();
        let w = resolve(&now, ResetTime::new(2, 30).unwrap(), 1.0);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());
        assert_eq!(w.energy_remaining, 45 * 60);
    }

    #[test]
    fn zero_work_hours_never_has_energy() {
        let w = resolve(&at(14, 9, 0, 0), nine(), 0.0);
        assert_eq!(w.start, w.end);
        assert_eq!(w.energy_remaining, 0);
    }

    #[test]
    fn fractional_hours() {
        let w = resolve(&at(14, 9, 0, 0), nine(), 7.5);
        assert_eq!(w.end, at(14, 16, 30, 0));
        assert_eq!(w.energy_remaining, 27_000);
    }

    #[test]
    fn progress_is_capped() {
        assert_eq!(energy_progress_pct(28_800, 8.0), 100.0);
        assert_eq!(energy_progress_pct(14_400, 8.0), 50.0);
        assert_eq!(energy_progress_pct(100, 0.0), 0.0);
        assert_eq!(energy_progress_pct(40_000, 8.0), 100.0);
    }

    proptest! {
        #[test]
        fn energy_stays_within_window_length(
            secs_of_day in 0u32..86_400,
            hour in 0u8..24,
            minute in 0u8..60,
            work_hours in 0.0f64..24.0,
        ) {
            let now = Utc
                .with_ymd_and_hms(2024, 5, 14, secs_of_day / 3600, (secs_of_day / 60) % 60, secs_of_day % 60)
                .unwrap();
            let reset = ResetTime::new(hour, minute).unwrap();
            let w = resolve(&now, reset, work_hours);
            prop_assert!(w.energy_remaining as f64 <= work_hours * 3600.0);
            prop_assert!(w.start <= now);
            prop_assert!(now - w.start < Duration::days(1));
        }
    }
}
