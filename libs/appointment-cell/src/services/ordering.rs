// libs/appointment-cell/src/services/ordering.rs
use std::cmp::{Ordering, Reverse};

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{Appointment, AppointmentStatus, AppointmentSummary};
use crate::services::slots::SlotCalendar;

/// Anything that can be placed on the appointment list.
pub trait Schedulable {
    /// Resolved local instant, `None` when the stored date/time cannot be parsed.
    fn instant(&self) -> Option<NaiveDateTime>;

    fn status(&self) -> AppointmentStatus;

    /// Raw date used as the last tie-break for unresolved entries.
    fn date_key(&self) -> String;
}

impl Schedulable for Appointment {
    fn instant(&self) -> Option<NaiveDateTime> {
        Some(self.scheduled_at)
    }

    fn status(&self) -> AppointmentStatus {
        self.status
    }

    fn date_key(&self) -> String {
        self.scheduled_at.format("%Y-%m-%d").to_string()
    }
}

impl Schedulable for AppointmentSummary {
    fn instant(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()?;
        let time = SlotCalendar::parse_slot(&self.time)?;
        Some(date.and_time(time))
    }

    fn status(&self) -> AppointmentStatus {
        self.status
    }

    fn date_key(&self) -> String {
        self.date.clone()
    }
}

/// Sort key. Variant order is the group order: upcoming (soonest first),
/// then past (most recent first), then anything without a usable instant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum DisplayKey {
    Upcoming(NaiveDateTime),
    Past(Reverse<NaiveDateTime>),
    Unresolved(u8, String),
}

impl DisplayKey {
    fn of<T: Schedulable>(item: &T, now: NaiveDateTime) -> Self {
        match item.instant() {
            Some(at) if at > now => DisplayKey::Upcoming(at),
            Some(at) => DisplayKey::Past(Reverse(at)),
            None => DisplayKey::Unresolved(item.status().display_priority(), item.date_key()),
        }
    }
}

/// Display order for appointment lists. Stateless; recompute on every render.
pub struct AppointmentSortPresenter;

impl AppointmentSortPresenter {
    pub fn compare<T: Schedulable>(a: &T, b: &T, now: NaiveDateTime) -> Ordering {
        DisplayKey::of(a, now).cmp(&DisplayKey::of(b, now))
    }

    /// Stable in-place sort; equal keys keep their input order.
    pub fn sort<T: Schedulable>(items: &mut [T], now: NaiveDateTime) {
        items.sort_by_cached_key(|item| DisplayKey::of(item, now));
    }

    pub fn sorted<T: Schedulable>(mut items: Vec<T>, now: NaiveDateTime) -> Vec<T> {
        Self::sort(&mut items, now);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn summary(date: &str, time: &str, status: AppointmentStatus) -> AppointmentSummary {
        AppointmentSummary {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_name: "Dr. Reyes".to_string(),
            specialty: "Cardiology".to_string(),
            date: date.to_string(),
            time: time.to_string(),
            status,
        }
    }

    #[test]
    fn test_summary_instant_parses_date_and_time() {
        let s = summary("2025-03-10", "09:30", AppointmentStatus::Scheduled);
        let expected = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(s.instant(), Some(expected));
        assert_eq!(summary("10/03/2025", "09:30", AppointmentStatus::Scheduled).instant(), None);
    }

    #[test]
    fn test_now_counts_as_past() {
        let now = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(9, 30, 0).unwrap();
        let at_now = summary("2025-03-10", "09:30", AppointmentStatus::Scheduled);
        let later = summary("2025-03-10", "10:00", AppointmentStatus::Scheduled);
        assert_eq!(AppointmentSortPresenter::compare(&later, &at_now, now), Ordering::Less);
    }
}
