pub mod booking;
pub mod clock;
pub mod events;
pub mod lifecycle;
pub mod ordering;
pub mod query;
pub mod slots;
pub mod store;

pub use booking::{AppointmentBookingService, BookingConflictGuard};
pub use clock::{Clock, FixedClock, SystemClock};
pub use events::{spawn_listener, spawn_notification_logger, LifecycleEvent, LifecycleEventBus};
pub use lifecycle::{AppointmentLifecycle, AppointmentLifecycleService};
pub use ordering::{AppointmentSortPresenter, Schedulable};
pub use query::AppointmentQueryService;
pub use slots::SlotCalendar;
pub use store::{AppointmentStore, InMemoryAppointmentStore, StoreError, SupabaseAppointmentStore};
