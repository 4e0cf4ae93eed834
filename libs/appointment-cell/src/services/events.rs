use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Created(AppointmentCreated),
    Completed(AppointmentCompleted),
    Canceled(AppointmentCanceled),
}

impl LifecycleEvent {
    pub fn appointment_id(&self) -> Uuid {
        match self {
            LifecycleEvent::Created(e) => e.appointment_id,
            LifecycleEvent::Completed(e) => e.appointment_id,
            LifecycleEvent::Canceled(e) => e.appointment_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentCreated {
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentCompleted {
    pub appointment_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
    pub patient_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentCanceled {
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub canceled_by: Role,
}

/// In-process fan-out of lifecycle events.
///
/// Delivery is fire-and-forget and at most once: publishing never waits on
/// listeners, and a listener that falls behind loses the oldest events.
#[derive(Clone)]
pub struct LifecycleEventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: LifecycleEvent) {
        let appointment_id = event.appointment_id();
        match self.sender.send(event) {
            Ok(listeners) => debug!("Lifecycle event for {} delivered to {} listeners", appointment_id, listeners),
            Err(_) => debug!("Lifecycle event for {} dropped: no listeners", appointment_id),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for LifecycleEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Drive `handler` with every event received until the bus is dropped.
pub fn spawn_listener<F>(
    name: &'static str,
    mut receiver: broadcast::Receiver<LifecycleEvent>,
    mut handler: F,
) -> JoinHandle<()>
where
    F: FnMut(LifecycleEvent) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => handler(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("{} listener lagged, {} lifecycle events skipped", name, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("{} listener stopping: event bus closed", name);
                    break;
                }
            }
        }
    })
}

/// Default notification sink: records each event in the service log.
pub fn spawn_notification_logger(bus: &LifecycleEventBus) -> JoinHandle<()> {
    spawn_listener("notification", bus.subscribe(), |event| match event {
        LifecycleEvent::Created(e) => info!(
            appointment_id = %e.appointment_id,
            doctor_id = %e.doctor_id,
            patient_id = %e.patient_id,
            scheduled_at = %e.scheduled_at,
            "Notify doctor: new appointment booked"
        ),
        LifecycleEvent::Completed(e) => info!(
            appointment_id = %e.appointment_id,
            patient_id = %e.patient_id,
            doctor = %e.doctor_name,
            "Notify patient: appointment completed"
        ),
        LifecycleEvent::Canceled(e) => info!(
            appointment_id = %e.appointment_id,
            canceled_by = %e.canceled_by,
            "Notify participants: appointment canceled"
        ),
    })
}
