use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Id;
use super::event::Event;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    #[default]
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Id,
    pub user_id: Id,
    pub event_id: Id,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub status: RegistrationStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    pub user_id: Id,
    pub event_id: Id,
    pub registered_at: DateTime<Utc>,
    pub status: RegistrationStatus,
}

/// A registration joined with the event it points at.
#[derive(Debug, Clone)]
pub struct UserEvent {
    pub registration: Registration,
    pub event: Event,
}
