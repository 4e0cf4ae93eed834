use chrono::{Duration, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use appointment_cell::{Appointment, AppointmentSortPresenter, AppointmentStatus, AppointmentSummary};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn appointment(scheduled_at: NaiveDateTime, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        scheduled_at,
        status,
        created_at: now(),
        updated_at: now(),
    }
}

fn summary(date: &str, time: &str, status: AppointmentStatus) -> AppointmentSummary {
    AppointmentSummary {
        id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_name: "Dr. Iwu".to_string(),
        specialty: "Pediatrics".to_string(),
        date: date.to_string(),
        time: time.to_string(),
        status,
    }
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> Uuid) -> Vec<Uuid> {
    items.iter().map(id).collect()
}

#[test]
fn test_upcoming_first_then_most_recent_past() {
    let past = appointment(now() - Duration::hours(1), AppointmentStatus::Completed);
    let soon = appointment(now() + Duration::hours(1), AppointmentStatus::Scheduled);
    let later = appointment(now() + Duration::hours(3), AppointmentStatus::Scheduled);

    let sorted = AppointmentSortPresenter::sorted(vec![past.clone(), later.clone(), soon.clone()], now());

    assert_eq!(ids(&sorted, |a| a.id), vec![soon.id, later.id, past.id]);
}

#[test]
fn test_past_entries_descend() {
    let yesterday = appointment(now() - Duration::days(1), AppointmentStatus::Completed);
    let last_week = appointment(now() - Duration::days(7), AppointmentStatus::Canceled);
    let this_morning = appointment(now() - Duration::hours(3), AppointmentStatus::Scheduled);

    let sorted = AppointmentSortPresenter::sorted(
        vec![last_week.clone(), this_morning.clone(), yesterday.clone()],
        now(),
    );

    assert_eq!(ids(&sorted, |a| a.id), vec![this_morning.id, yesterday.id, last_week.id]);
}

#[test]
fn test_sorting_sorted_list_is_identity() {
    let mut items: Vec<Appointment> = (-5..6)
        .map(|h| appointment(now() + Duration::hours(h * 2), AppointmentStatus::Scheduled))
        .collect();
    // Equal instants must keep their relative order.
    items.push(appointment(now() + Duration::hours(2), AppointmentStatus::Scheduled));

    AppointmentSortPresenter::sort(&mut items, now());
    let once = ids(&items, |a| a.id);
    AppointmentSortPresenter::sort(&mut items, now());

    assert_eq!(ids(&items, |a| a.id), once);
}

#[test]
fn test_unparseable_summaries_sort_last_by_status_then_date() {
    let canceled = summary("someday", "??", AppointmentStatus::Canceled);
    let scheduled_b = summary("b-date", "??", AppointmentStatus::Scheduled);
    let scheduled_a = summary("a-date", "09:00", AppointmentStatus::Scheduled);
    let past = summary("2025-03-09", "09:00", AppointmentStatus::Completed);
    let upcoming = summary("2025-03-11", "09:00", AppointmentStatus::Scheduled);

    let sorted = AppointmentSortPresenter::sorted(
        vec![canceled.clone(), scheduled_b.clone(), past.clone(), scheduled_a.clone(), upcoming.clone()],
        now(),
    );

    assert_eq!(
        ids(&sorted, |s| s.id),
        vec![upcoming.id, past.id, scheduled_a.id, scheduled_b.id, canceled.id]
    );
}
