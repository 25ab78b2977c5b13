use std::collections::HashMap;

use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::{
    Event, EventStatus, EventUpdate, Id, NewEvent, NewRegistration, NewUser, Registration,
    RegistrationStatus, User, UserEvent, UserUpdate,
};

/// Query-string filter, e.g. `[("userId", "3".into())]`.
pub type Filter<'a> = [(&'a str, String)];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_admins: usize,
    pub total_events: usize,
    pub active_events: usize,
    pub total_registrations: usize,
    pub total_capacity: u64,
}

/// Plain HTTP client for the collection store. No retries, no auth header.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

/// `/events/3` names a single record; `/events` names a collection.
fn is_item_endpoint(endpoint: &str) -> bool {
    endpoint.trim_matches('/').split('/').count() >= 2
}

fn rename_not_found(err: AppError, message: impl FnOnce() -> String) -> AppError {
    match err {
        AppError::NotFound(_) => AppError::NotFound(message()),
        other => other,
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &Filter<'_>,
        body: Option<serde_json::Value>,
    ) -> Result<T, AppError> {
        let url = format!("{}{endpoint}", self.base_url);
        let mut req = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| AppError::connectivity(&method, endpoint, e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND && is_item_endpoint(endpoint) {
            return Err(AppError::NotFound(format!("{endpoint} not found")));
        }
        if !status.is_success() {
            tracing::warn!(%method, endpoint, status = status.as_u16(), "request failed");
            return Err(AppError::connectivity(&method, endpoint, format!("HTTP {status}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| AppError::connectivity(&method, endpoint, format!("invalid body: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &Filter<'_>) -> Result<T, AppError> {
        self.request(Method::GET, endpoint, query, None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, endpoint: &str, body: &B) -> Result<T, AppError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, endpoint, &[], Some(body)).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize>(&self, endpoint: &str, body: &B) -> Result<T, AppError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, endpoint, &[], Some(body)).await
    }

    async fn delete(&self, endpoint: &str) -> Result<(), AppError> {
        self.request::<serde_json::Value>(Method::DELETE, endpoint, &[], None)
            .await
            .map(|_| ())
    }

    // --- Users ---

    pub async fn get_users(&self) -> Result<Vec<User>, AppError> {
        self.get("/users", &[]).await
    }

    pub async fn find_users(&self, filter: &Filter<'_>) -> Result<Vec<User>, AppError> {
        self.get("/users", filter).await
    }

    pub async fn get_user(&self, id: Id) -> Result<User, AppError> {
        self.get(&format!("/users/{id}"), &[])
            .await
            .map_err(|e| rename_not_found(e, || format!("User {id} not found")))
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User, AppError> {
        self.post("/users", user).await
    }

    pub async fn update_user(&self, id: Id, update: &UserUpdate) -> Result<User, AppError> {
        self.patch(&format!("/users/{id}"), update)
            .await
            .map_err(|e| rename_not_found(e, || format!("User {id} not found")))
    }

    /// Cancels the user's registrations one by one, then removes the user.
    /// Stops at the first failure; earlier cancellations are not undone.
    pub async fn delete_user(&self, id: Id) -> Result<(), AppError> {
        for registration in self.get_user_registrations(id).await? {
            self.cancel_registration(registration.id).await?;
        }
        self.delete(&format!("/users/{id}"))
            .await
            .map_err(|e| rename_not_found(e, || format!("User {id} not found")))
    }

    // --- Events ---

    pub async fn get_events(&self) -> Result<Vec<Event>, AppError> {
        self.get("/events", &[]).await
    }

    pub async fn find_events(&self, filter: &Filter<'_>) -> Result<Vec<Event>, AppError> {
        self.get("/events", filter).await
    }

    pub async fn get_active_events(&self) -> Result<Vec<Event>, AppError> {
        self.find_events(&[("status", EventStatus::Active.as_str().to_string())])
            .await
    }

    pub async fn get_event(&self, id: Id) -> Result<Event, AppError> {
        self.get(&format!("/events/{id}"), &[])
            .await
            .map_err(|e| rename_not_found(e, || format!("Event {id} not found")))
    }

    pub async fn create_event(&self, event: &NewEvent) -> Result<Event, AppError> {
        let created: Event = self.post("/events", event).await?;
        tracing::info!(event_id = created.id, title = %created.title, "event created");
        Ok(created)
    }

    pub async fn update_event(&self, id: Id, update: &EventUpdate) -> Result<Event, AppError> {
        self.patch(&format!("/events/{id}"), update)
            .await
            .map_err(|e| rename_not_found(e, || format!("Event {id} not found")))
    }

    /// Deletes the event's registrations, then the event itself.
    pub async fn delete_event(&self, id: Id) -> Result<(), AppError> {
        for registration in self.get_event_registrations(id).await? {
            self.delete(&format!("/registrations/{}", registration.id)).await?;
        }
        self.delete(&format!("/events/{id}"))
            .await
            .map_err(|e| rename_not_found(e, || format!("Event {id} not found")))?;
        tracing::info!(event_id = id, "event deleted");
        Ok(())
    }

    /// Active events whose text matches `query`, optionally restricted to a
    /// category, sorted by date.
    pub async fn search_events(
        &self,
        query: &str,
        category: Option<&str>,
    ) -> Result<Vec<Event>, AppError> {
        let mut events: Vec<Event> = self
            .get_active_events()
            .await?
            .into_iter()
            .filter(|e| e.matches_text(query))
            .filter(|e| category.is_none_or(|c| c.is_empty() || e.category.eq_ignore_ascii_case(c)))
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.time.cmp(&b.time)));
        Ok(events)
    }

    // --- Registrations ---

    pub async fn get_registrations(&self) -> Result<Vec<Registration>, AppError> {
        self.get("/registrations", &[]).await
    }

    pub async fn get_registration(&self, id: Id) -> Result<Registration, AppError> {
        self.get(&format!("/registrations/{id}"), &[])
            .await
            .map_err(|e| rename_not_found(e, || format!("Registration {id} not found")))
    }

    pub async fn get_user_registrations(&self, user_id: Id) -> Result<Vec<Registration>, AppError> {
        self.get("/registrations", &[("userId", user_id.to_string())])
            .await
    }

    pub async fn get_event_registrations(&self, event_id: Id) -> Result<Vec<Registration>, AppError> {
        self.get("/registrations", &[("eventId", event_id.to_string())])
            .await
    }

    pub async fn find_registration(
        &self,
        user_id: Id,
        event_id: Id,
    ) -> Result<Option<Registration>, AppError> {
        let matches: Vec<Registration> = self
            .get(
                "/registrations",
                &[
                    ("userId", user_id.to_string()),
                    ("eventId", event_id.to_string()),
                ],
            )
            .await?;
        Ok(matches.into_iter().next())
    }

    /// Check-then-act: capacity and duplicate checks are separate reads, the
    /// registration and the count bump are separate writes. Concurrent callers
    /// can both pass the checks, and a failed count update leaves the
    /// registration in place.
    pub async fn register_for_event(&self, user_id: Id, event_id: Id) -> Result<Registration, AppError> {
        let event = self.get_event(event_id).await?;

        if !event.is_active() {
            return Err(AppError::EventUnavailable);
        }
        if self.find_registration(user_id, event_id).await?.is_some() {
            return Err(AppError::AlreadyRegistered);
        }
        if event.is_full() {
            return Err(AppError::EventFull);
        }

        let registration: Registration = self
            .post(
                "/registrations",
                &NewRegistration {
                    user_id,
                    event_id,
                    registered_at: Utc::now(),
                    status: RegistrationStatus::Confirmed,
                },
            )
            .await?;

        self.update_event(
            event_id,
            &EventUpdate {
                registered_count: Some(event.registered_count + 1),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(user_id, event_id, registration_id = registration.id, "registered for event");
        Ok(registration)
    }

    /// Deletes the registration, then decrements the event's count. No
    /// compensation if the second step fails.
    pub async fn cancel_registration(&self, registration_id: Id) -> Result<(), AppError> {
        let registration = self.get_registration(registration_id).await?;
        self.delete(&format!("/registrations/{registration_id}")).await?;

        match self.get_event(registration.event_id).await {
            Ok(event) => {
                self.update_event(
                    event.id,
                    &EventUpdate {
                        registered_count: Some(event.registered_count.saturating_sub(1)),
                        ..Default::default()
                    },
                )
                .await?;
            }
            // The event is gone; there is no count left to maintain.
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        tracing::info!(
            registration_id,
            user_id = registration.user_id,
            event_id = registration.event_id,
            "registration cancelled"
        );
        Ok(())
    }

    /// The user's registrations joined with their events, sorted by event
    /// date. Registrations pointing at deleted events are skipped.
    pub async fn get_user_events(&self, user_id: Id) -> Result<Vec<UserEvent>, AppError> {
        let registrations = self.get_user_registrations(user_id).await?;
        if registrations.is_empty() {
            return Ok(Vec::new());
        }

        let events: HashMap<Id, Event> = self
            .get_events()
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        let mut joined: Vec<UserEvent> = registrations
            .into_iter()
            .filter_map(|registration| {
                let event = events.get(&registration.event_id)?.clone();
                Some(UserEvent { registration, event })
            })
            .collect();
        joined.sort_by(|a, b| a.event.date.cmp(&b.event.date));
        Ok(joined)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        let users = self.get_users().await?;
        let events = self.get_events().await?;
        let registrations = self.get_registrations().await?;

        Ok(DashboardStats {
            total_users: users.len(),
            total_admins: users.iter().filter(|u| u.is_admin()).count(),
            total_events: events.len(),
            active_events: events.iter().filter(|e| e.is_active()).count(),
            total_registrations: registrations.len(),
            total_capacity: events.iter().map(|e| u64::from(e.capacity)).sum(),
        })
    }
}
