use chrono::{Days, NaiveDateTime, NaiveTime};

use crate::models::{Slot, Specialist};

/// First and last bookable hour of a working day.
const FIRST_HOUR: u32 = 9;
const LAST_HOUR: u32 = 15;

/// Maximum number of slots offered at once.
pub const MAX_SLOTS: usize = 10;

/// Default look-ahead window in days.
pub const DEFAULT_DAYS_AHEAD: u32 = 7;

const DISPLAY_FORMAT: &str = "%A, %B %d at %I:%M %p";

/// Human-readable slot time, e.g. `Monday, January 26 at 09:00 AM`.
pub fn display(datetime: &NaiveDateTime) -> String {
    datetime.format(DISPLAY_FORMAT).to_string()
}

/// Hourly slots on the specialist's working days, starting the day after
/// `now`, capped at [`MAX_SLOTS`]. No conflict checking is done.
pub fn available_slots(specialist: &Specialist, now: NaiveDateTime, days_ahead: u32) -> Vec<Slot> {
    let mut slots = Vec::new();

    for offset in 1..=u64::from(days_ahead) {
        let Some(date) = now.date().checked_add_days(Days::new(offset)) else {
            break;
        };
        if !specialist.works_on(&date.format("%A").to_string()) {
            continue;
        }
        for hour in FIRST_HOUR..=LAST_HOUR {
            let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) else {
                continue;
            };
            let datetime = date.and_time(time);
            slots.push(Slot {
                display: display(&datetime),
                datetime,
                available: true,
            });
            if slots.len() == MAX_SLOTS {
                return slots;
            }
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Timelike, Weekday};

    fn specialist(days: &[&str]) -> Specialist {
        Specialist {
            specialist_type: "Neurologist".into(),
            name: "Dr. Test".into(),
            specialty: "Neurology".into(),
            hospital: None,
            available_days: days.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn friday_evening() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 24)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap()
    }

    #[test]
    fn starts_tomorrow_and_skips_weekends_for_weekday_specialists() {
        let weekdays = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];
        let slots = available_slots(&specialist(&weekdays), friday_evening(), 7);
        assert_eq!(slots.len(), MAX_SLOTS);
        assert_eq!(slots[0].datetime.weekday(), Weekday::Mon);
        assert_eq!(slots[0].datetime.hour(), 9);
        assert!(slots.iter().all(|s| s.available));
        assert!(slots
            .iter()
            .all(|s| !matches!(s.datetime.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn seven_day_specialist_gets_weekend_slots() {
        let all_week = [
            "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
        ];
        let slots = available_slots(&specialist(&all_week), friday_evening(), 7);
        assert_eq!(slots[0].datetime.weekday(), Weekday::Sat);
    }

    #[test]
    fn hours_within_working_day() {
        let slots = available_slots(&specialist(&["Monday"]), friday_evening(), 7);
        let hours: Vec<u32> = slots.iter().map(|s| s.datetime.hour()).collect();
        assert_eq!(hours, vec![9, 10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn no_working_days_means_no_slots() {
        assert!(available_slots(&specialist(&[]), friday_evening(), 7).is_empty());
    }

    #[test]
    fn display_format() {
        let dt = NaiveDate::from_ymd_opt(2025, 1, 27)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(display(&dt), "Monday, January 27 at 09:00 AM");
    }
}
