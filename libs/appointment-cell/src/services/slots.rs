// libs/appointment-cell/src/services/slots.rs
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::debug;

use shared_config::SchedulingConfig;

use crate::models::Appointment;

/// Daily slot grid and the "can this still be booked" filter.
///
/// Everything here is a pure function of the configuration and the `now`
/// handed in. Results are advisory; exclusivity is decided when the booking
/// is committed.
#[derive(Debug, Clone)]
pub struct SlotCalendar {
    config: SchedulingConfig,
}

impl SlotCalendar {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Full grid, e.g. 08:00, 08:30, ... 17:30. Same for every doctor and day.
    pub fn generate_daily_slots(&self) -> Vec<NaiveTime> {
        let step = self.config.slot_minutes.max(1);
        let close = self.config.closing_hour.min(24) * 60;
        let open = self.config.opening_hour.saturating_mul(60);

        (open..close)
            .step_by(step as usize)
            .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
            .collect()
    }

    /// Slots still offered on `date`.
    ///
    /// Any date other than today gets the whole grid back. Today drops every
    /// slot not strictly later than `now + booking buffer`. Existing bookings
    /// are not subtracted.
    pub fn filter_available(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
        existing_bookings: &[Appointment],
    ) -> Vec<NaiveTime> {
        let slots = self.generate_daily_slots();

        if date != now.date() {
            return slots;
        }

        // A cutoff beyond chrono's range leaves nothing today.
        let Some(cutoff) = Duration::try_minutes(self.config.booking_buffer_minutes)
            .and_then(|buffer| now.checked_add_signed(buffer))
        else {
            debug!("Booking buffer of {} min runs past the calendar", self.config.booking_buffer_minutes);
            return Vec::new();
        };
        let available: Vec<NaiveTime> = slots
            .into_iter()
            .filter(|slot| date.and_time(*slot) > cutoff)
            .collect();

        debug!(
            "{} slots left today after {} ({} existing bookings not subtracted)",
            available.len(),
            cutoff.format("%H:%M"),
            existing_bookings.len()
        );

        available
    }

    /// Past dates, and today once no slot is left, cannot be picked.
    pub fn is_date_disabled(&self, date: NaiveDate, now: NaiveDateTime) -> bool {
        date < now.date() || self.filter_available(date, now, &[]).is_empty()
    }

    pub fn is_on_grid(&self, time: NaiveTime) -> bool {
        time.second() == 0 && time.nanosecond() == 0 && self.generate_daily_slots().contains(&time)
    }

    pub fn is_bookable(&self, date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool {
        self.is_on_grid(time)
            && !self.is_date_disabled(date, now)
            && self.filter_available(date, now, &[]).contains(&time)
    }

    /// Instant committed for a (date, slot) pair, truncated to the minute.
    pub fn candidate_instant(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
        let minute = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
        date.and_time(minute)
    }

    pub fn format_slot(time: NaiveTime) -> String {
        time.format("%H:%M").to_string()
    }

    pub fn parse_slot(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
    }
}

impl Default for SlotCalendar {
    fn default() -> Self {
        Self::new(SchedulingConfig::default())
    }
}
