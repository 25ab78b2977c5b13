use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Id;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Active,
    Inactive,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
    pub category: String,
    pub capacity: u32,
    pub price: f64,
    #[serde(default)]
    pub registered_count: u32,
    #[serde(default)]
    pub status: EventStatus,
    pub organizer: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.registered_count >= self.capacity
    }

    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }

    pub fn available_spots(&self) -> u32 {
        self.capacity.saturating_sub(self.registered_count)
    }

    /// Case-insensitive substring match over title, description and location.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || [&self.title, &self.description, &self.location]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Body of `POST /events`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
    pub category: String,
    pub capacity: u32,
    pub price: f64,
    pub registered_count: u32,
    pub status: EventStatus,
    pub organizer: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `PATCH /events/:id`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
}

/// Raw admin form input for creating or editing an event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub category: String,
    pub capacity: String,
    pub price: String,
    pub status: Option<EventStatus>,
    pub organizer: String,
}

/// A validated [`EventForm`].
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
    pub category: String,
    pub capacity: u32,
    pub price: f64,
    pub status: EventStatus,
    pub organizer: String,
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(field, format!("{field} is required")));
    }
    Ok(value.to_string())
}

impl EventForm {
    pub fn validate(&self) -> Result<EventDraft, AppError> {
        let title = required("title", &self.title)?;
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::validation("date", "date must be formatted as YYYY-MM-DD"))?;
        let time = required("time", &self.time)?;
        let location = required("location", &self.location)?;
        let category = required("category", &self.category)?;

        let capacity: u32 = self
            .capacity
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| AppError::validation("capacity", "capacity must be a positive number"))?;

        let price: f64 = if self.price.trim().is_empty() {
            0.0
        } else {
            self.price
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|p| p.is_finite() && *p >= 0.0)
                .ok_or_else(|| AppError::validation("price", "price must be zero or more"))?
        };

        Ok(EventDraft {
            title,
            description: self.description.trim().to_string(),
            date,
            time,
            location,
            category,
            capacity,
            price,
            status: self.status.unwrap_or_default(),
            organizer: self.organizer.trim().to_string(),
        })
    }
}

impl EventDraft {
    pub fn into_new_event(self) -> NewEvent {
        NewEvent {
            title: self.title,
            description: self.description,
            date: self.date,
            time: self.time,
            location: self.location,
            category: self.category,
            capacity: self.capacity,
            price: self.price,
            registered_count: 0,
            status: self.status,
            organizer: self.organizer,
            created_at: Utc::now(),
        }
    }

    /// Leaves `registeredCount` untouched.
    pub fn into_update(self) -> EventUpdate {
        EventUpdate {
            title: Some(self.title),
            description: Some(self.description),
            date: Some(self.date),
            time: Some(self.time),
            location: Some(self.location),
            category: Some(self.category),
            capacity: Some(self.capacity),
            price: Some(self.price),
            registered_count: None,
            status: Some(self.status),
            organizer: Some(self.organizer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> EventForm {
        EventForm {
            title: "Rust meetup".into(),
            description: "Talks".into(),
            date: "2026-11-02".into(),
            time: "18:30".into(),
            location: "Helsinki".into(),
            category: "tech".into(),
            capacity: "40".into(),
            price: "".into(),
            status: None,
            organizer: "Rustaceans".into(),
        }
    }

    #[test]
    fn valid_form_defaults_price_and_status() {
        let draft = form().validate().unwrap();
        assert_eq!(draft.capacity, 40);
        assert_eq!(draft.price, 0.0);
        assert_eq!(draft.status, EventStatus::Active);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut f = form();
        f.capacity = "0".into();
        match f.validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "capacity"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bad_date_is_rejected() {
        let mut f = form();
        f.date = "02/11/2026".into();
        assert!(matches!(f.validate(), Err(AppError::Validation { .. })));
    }

    #[test]
    fn event_spots_and_text_match() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Jazz Night",
            "description": "Live quartet",
            "date": "2026-12-01",
            "time": "20:00",
            "location": "Tampere",
            "category": "music",
            "capacity": 2,
            "price": 15.0,
            "registeredCount": 2,
            "status": "active",
            "organizer": "Club",
            "createdAt": "2026-01-01T00:00:00.000Z"
        }))
        .unwrap();

        assert!(event.is_full());
        assert_eq!(event.available_spots(), 0);
        assert!(event.matches_text("QUARTET"));
        assert!(!event.matches_text("rock"));
    }
}
