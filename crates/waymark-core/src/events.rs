//! Events and attendance.
//!
//! Events have no privacy tiering: every authenticated viewer sees all of
//! them, and any authenticated viewer may toggle their own attendance.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use waymark_shared::Viewer;
use waymark_store::Event;

use crate::error::{CoreError, Result};
use crate::SharedDatabase;

/// Fields for a new event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
}

/// Result of an attendance toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct AttendanceState {
    pub attendees: usize,
    pub attending: bool,
}

pub struct EventService {
    db: SharedDatabase,
}

impl EventService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub async fn create_event(&self, viewer: &Viewer, new: NewEvent) -> Result<Event> {
        let event = Event {
            id: Uuid::new_v4(),
            owner_id: viewer.id,
            username: viewer.username.clone(),
            title: new.title,
            description: new.description,
            event_date: new.event_date,
            latitude: new.latitude,
            longitude: new.longitude,
            location_name: new.location_name,
            attendees: Default::default(),
            created_at: Utc::now(),
        };

        let db = self.db.lock().await;
        db.insert_event(&event)?;
        Ok(event)
    }

    /// All events, soonest first.
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        let db = self.db.lock().await;
        Ok(db.list_events()?)
    }

    /// Toggle the viewer's membership in the attendee set. Same non-atomic
    /// read-then-write shape as the like toggle.
    pub async fn toggle_attendance(
        &self,
        viewer: &Viewer,
        event_id: Uuid,
    ) -> Result<AttendanceState> {
        let event = {
            let db = self.db.lock().await;
            db.get_event(event_id).map_err(CoreError::missing("event"))?
        };

        let mut attendees = event.attendees;
        let attending = if attendees.remove(&viewer.id) {
            false
        } else {
            attendees.insert(viewer.id);
            true
        };

        {
            let db = self.db.lock().await;
            db.update_event_attendees(event_id, &attendees)?;
        }
        Ok(AttendanceState {
            attendees: attendees.len(),
            attending,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::Duration;
    use tokio::sync::Mutex;

    use waymark_store::Database;

    use super::*;

    fn test_db() -> SharedDatabase {
        Arc::new(Mutex::new(Database::open_in_memory().unwrap()))
    }

    fn viewer(name: &str) -> Viewer {
        Viewer {
            id: Uuid::new_v4(),
            username: name.to_string(),
            friends: BTreeSet::new(),
            friend_requests: BTreeSet::new(),
            is_guest: false,
        }
    }

    fn new_event(title: &str, in_hours: i64) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: "a gathering".to_string(),
            event_date: Utc::now() + Duration::hours(in_hours),
            latitude: 37.0,
            longitude: -122.0,
            location_name: "the park".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_list_soonest_first() {
        let db = test_db();
        let service = EventService::new(db.clone());
        let owner = viewer("ada");

        service
            .create_event(&owner, new_event("later", 72))
            .await
            .unwrap();
        service
            .create_event(&owner, new_event("sooner", 2))
            .await
            .unwrap();

        let events = service.list_events().await.unwrap();
        assert_eq!(events[0].title, "sooner");
        assert_eq!(events[1].title, "later");
    }

    #[tokio::test]
    async fn attendance_toggles_on_and_off() {
        let db = test_db();
        let service = EventService::new(db.clone());
        let owner = viewer("ada");
        let attendee = viewer("bob");

        let event = service
            .create_event(&owner, new_event("picnic", 2))
            .await
            .unwrap();

        let on = service
            .toggle_attendance(&attendee, event.id)
            .await
            .unwrap();
        assert_eq!(
            on,
            AttendanceState {
                attendees: 1,
                attending: true
            }
        );

        let off = service
            .toggle_attendance(&attendee, event.id)
            .await
            .unwrap();
        assert_eq!(
            off,
            AttendanceState {
                attendees: 0,
                attending: false
            }
        );
    }

    #[tokio::test]
    async fn attendance_on_missing_event_is_not_found() {
        let db = test_db();
        let service = EventService::new(db.clone());
        let err = service
            .toggle_attendance(&viewer("ada"), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
