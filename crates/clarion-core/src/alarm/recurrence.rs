//! Recurrence evaluation.
//!
//! The evaluation loop polls faster than once a second and fires only in
//! the `second == 0` window of the trigger minute, so a matching minute is
//! observed exactly once per wall-clock minute.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike};

use super::model::{Alarm, Recurrence};

/// What the evaluation loop should do with an alarm at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Nothing to do at this instant.
    Skip,
    /// The snooze deadline passed; clear it and resume ringing.
    Unsnooze,
    /// The trigger minute matched; open a ringing session.
    Fire,
}

/// Whether the alarm's schedule covers the given calendar day.
///
/// This is a pure schedule question: `enabled`, snooze state and the
/// same-day dedup marker are the caller's concern, except for `Once`,
/// which is spent permanently after its first trigger.
pub fn is_due_on(alarm: &Alarm, date: NaiveDate) -> bool {
    let weekday = date.weekday().num_days_from_monday() as u8;
    match &alarm.recurrence {
        Recurrence::Once => alarm.last_triggered_day.is_none(),
        Recurrence::Daily => true,
        Recurrence::Weekdays => weekday < 5,
        Recurrence::Weekends => weekday >= 5,
        Recurrence::SpecificDays { days } => days.contains(&weekday),
        Recurrence::SpecificDate { date: target } => *target == date,
    }
}

/// Classify one alarm at one instant. Pure; the caller applies the result
/// (clearing snooze state, stamping the dedup marker) under the store lock.
pub fn classify(alarm: &Alarm, now: NaiveDateTime) -> Disposition {
    if !alarm.enabled {
        return Disposition::Skip;
    }
    if let Some(until) = alarm.snooze_until {
        return if now < until {
            Disposition::Skip
        } else {
            Disposition::Unsnooze
        };
    }
    if now.second() != 0
        || now.hour() != u32::from(alarm.hour)
        || now.minute() != u32::from(alarm.minute)
    {
        return Disposition::Skip;
    }
    if !is_due_on(alarm, now.date()) {
        return Disposition::Skip;
    }
    // Single-shot schedules ring at most once per day even if the marker
    // was cleared and re-stamped by a snooze cycle.
    if matches!(
        alarm.recurrence,
        Recurrence::Once | Recurrence::SpecificDate { .. }
    ) && alarm.last_triggered_day == Some(now.date())
    {
        return Disposition::Skip;
    }
    Disposition::Fire
}

/// The calendar days within `[from, from + days)` on which the alarm's
/// schedule matches. Used for "next ring" previews in list output.
pub fn upcoming_occurrences(alarm: &Alarm, from: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
        .filter_map(|offset| from.checked_add_days(Days::new(u64::from(offset))))
        .filter(|date| is_due_on(alarm, *date))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveTime;
    use proptest::prelude::*;

    use super::*;
    use crate::alarm::Alarm;

    fn alarm_at(hour: u8, minute: u8, recurrence: Recurrence) -> Alarm {
        Alarm::new(hour, minute, "test", "chime", recurrence).unwrap()
    }

    fn instant(date: NaiveDate, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(hour, minute, second).unwrap())
    }

    // 2025-06-02 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[test]
    fn weekday_classes_partition_the_week() {
        let weekdays = alarm_at(7, 0, Recurrence::Weekdays);
        let weekends = alarm_at(7, 0, Recurrence::Weekends);
        for offset in 0..7 {
            let date = monday() + Days::new(offset);
            assert_ne!(
                is_due_on(&weekdays, date),
                is_due_on(&weekends, date),
                "offset {offset}"
            );
            assert_eq!(is_due_on(&weekdays, date), offset < 5);
        }
    }

    #[test]
    fn empty_specific_days_never_matches() {
        let alarm = alarm_at(7, 0, Recurrence::SpecificDays { days: BTreeSet::new() });
        for offset in 0..7 {
            assert!(!is_due_on(&alarm, monday() + Days::new(offset)));
        }
    }

    #[test]
    fn specific_days_matches_listed_weekdays_only() {
        let days: BTreeSet<u8> = [0, 3].into_iter().collect();
        let alarm = alarm_at(7, 0, Recurrence::SpecificDays { days });
        let due: Vec<u64> = (0..7)
            .filter(|offset| is_due_on(&alarm, monday() + Days::new(*offset)))
            .collect();
        assert_eq!(due, vec![0, 3]);
    }

    #[test]
    fn specific_date_matches_exactly_one_day() {
        let target = NaiveDate::from_ymd_opt(2025, 12, 24).unwrap();
        let alarm = alarm_at(7, 0, Recurrence::SpecificDate { date: target });
        assert!(is_due_on(&alarm, target));
        assert!(!is_due_on(&alarm, target + Days::new(1)));
        assert!(!is_due_on(&alarm, target - Days::new(1)));
    }

    #[test]
    fn once_is_spent_after_its_first_trigger() {
        let mut alarm = alarm_at(7, 0, Recurrence::Once);
        assert!(is_due_on(&alarm, monday()));
        alarm.last_triggered_day = Some(monday());
        assert!(!is_due_on(&alarm, monday() + Days::new(1)));
    }

    #[test]
    fn fires_only_at_second_zero_of_the_trigger_minute() {
        let alarm = alarm_at(7, 30, Recurrence::Daily);
        assert_eq!(classify(&alarm, instant(monday(), 7, 30, 0)), Disposition::Fire);
        assert_eq!(classify(&alarm, instant(monday(), 7, 30, 1)), Disposition::Skip);
        assert_eq!(classify(&alarm, instant(monday(), 7, 29, 0)), Disposition::Skip);
        assert_eq!(classify(&alarm, instant(monday(), 8, 30, 0)), Disposition::Skip);
    }

    #[test]
    fn disabled_alarms_never_fire() {
        let mut alarm = alarm_at(7, 30, Recurrence::Daily);
        alarm.enabled = false;
        assert_eq!(classify(&alarm, instant(monday(), 7, 30, 0)), Disposition::Skip);
    }

    #[test]
    fn same_day_marker_suppresses_single_shot_refire() {
        let mut once = alarm_at(7, 30, Recurrence::Once);
        once.last_triggered_day = Some(monday());
        assert_eq!(classify(&once, instant(monday(), 7, 30, 0)), Disposition::Skip);

        // Repeating schedules ignore the marker; a daily alarm that already
        // rang today still fires if its minute comes around again after an
        // edit cleared nothing.
        let mut daily = alarm_at(7, 30, Recurrence::Daily);
        daily.last_triggered_day = Some(monday());
        assert_eq!(classify(&daily, instant(monday(), 7, 30, 0)), Disposition::Fire);
    }

    #[test]
    fn active_snooze_suppresses_everything() {
        let mut alarm = alarm_at(7, 30, Recurrence::Daily);
        alarm.snooze_until = Some(instant(monday(), 7, 39, 0));
        assert_eq!(classify(&alarm, instant(monday(), 7, 30, 0)), Disposition::Skip);
        assert_eq!(classify(&alarm, instant(monday(), 7, 38, 59)), Disposition::Skip);
    }

    #[test]
    fn expired_snooze_requests_unsnooze_regardless_of_minute() {
        let mut alarm = alarm_at(7, 30, Recurrence::Daily);
        alarm.snooze_until = Some(instant(monday(), 7, 39, 0));
        assert_eq!(
            classify(&alarm, instant(monday(), 7, 39, 0)),
            Disposition::Unsnooze
        );
        assert_eq!(
            classify(&alarm, instant(monday(), 7, 41, 17)),
            Disposition::Unsnooze
        );
    }

    #[test]
    fn upcoming_occurrences_for_weekdays() {
        let alarm = alarm_at(7, 0, Recurrence::Weekdays);
        let dates = upcoming_occurrences(&alarm, monday(), 7);
        assert_eq!(dates.len(), 5);
        assert_eq!(dates[0], monday());
        assert_eq!(dates[4], monday() + Days::new(4));
    }

    proptest! {
        #[test]
        fn daily_is_due_on_any_date(year in 2020i32..2035, month in 1u32..=12, day in 1u32..=28) {
            let alarm = alarm_at(7, 0, Recurrence::Daily);
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            prop_assert!(is_due_on(&alarm, date));
        }

        #[test]
        fn weekday_and_weekend_are_complements(year in 2020i32..2035, month in 1u32..=12, day in 1u32..=28) {
            let weekdays = alarm_at(7, 0, Recurrence::Weekdays);
            let weekends = alarm_at(7, 0, Recurrence::Weekends);
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            prop_assert_ne!(is_due_on(&weekdays, date), is_due_on(&weekends, date));
        }

        #[test]
        fn classify_never_fires_off_the_minute(second in 1u32..60) {
            let alarm = alarm_at(7, 30, Recurrence::Daily);
            let now = instant(monday(), 7, 30, second);
            prop_assert_eq!(classify(&alarm, now), Disposition::Skip);
        }
    }
}
