use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::{EventForm, Id, ProfileForm, RegisterForm, UserRole};

/// Everything a page can ask the application to do. Rendered pages name these
/// through `data-action` attributes; [`Action::parse`] turns such an element
/// (its action name plus its `data-*` and form fields) back into a value.
#[derive(Debug, Clone)]
pub enum Action {
    Navigate(String),
    Back,
    Forward,
    Reload,
    Login { identifier: String, password: String },
    Register(RegisterForm),
    Logout,
    RegisterForEvent(Id),
    CancelRegistration(Id),
    UpdateProfile(ProfileForm),
    EditEvent(Id),
    CreateEvent(EventForm),
    UpdateEvent { id: Id, form: EventForm },
    DeleteEvent(Id),
    DeleteUser(Id),
    SetUserRole { id: Id, role: UserRole },
    Search { query: String, category: Option<String> },
}

fn form<T: DeserializeOwned>(fields: &HashMap<String, String>) -> Result<T, AppError> {
    let value = serde_json::to_value(fields)?;
    serde_json::from_value(value)
        .map_err(|e| AppError::validation("form", format!("Invalid form data: {e}")))
}

impl Action {
    pub fn parse(name: &str, fields: &HashMap<String, String>) -> Result<Self, AppError> {
        let field = |key: &str| fields.get(key).cloned().unwrap_or_default();
        let id = || {
            fields
                .get("id")
                .and_then(|raw| raw.trim().parse::<Id>().ok())
                .ok_or_else(|| AppError::validation("id", "Missing or invalid id"))
        };

        let action = match name {
            "navigate" => Self::Navigate(field("path")),
            "back" => Self::Back,
            "forward" => Self::Forward,
            "reload" => Self::Reload,
            "login" => Self::Login {
                identifier: field("identifier"),
                password: field("password"),
            },
            "register" => Self::Register(form(fields)?),
            "logout" => Self::Logout,
            "register-for-event" => Self::RegisterForEvent(id()?),
            "cancel-registration" => Self::CancelRegistration(id()?),
            "update-profile" => Self::UpdateProfile(form(fields)?),
            "edit-event" => Self::EditEvent(id()?),
            "create-event" => Self::CreateEvent(form(fields)?),
            "update-event" => Self::UpdateEvent {
                id: id()?,
                form: form(fields)?,
            },
            "delete-event" => Self::DeleteEvent(id()?),
            "delete-user" => Self::DeleteUser(id()?),
            "set-user-role" => Self::SetUserRole {
                id: id()?,
                role: field("role")
                    .parse::<UserRole>()
                    .map_err(|e| AppError::validation("role", e))?,
            },
            "search" => Self::Search {
                query: field("q"),
                category: fields.get("category").filter(|c| !c.is_empty()).cloned(),
            },
            other => return Err(AppError::Internal(format!("Unknown action: {other}"))),
        };
        Ok(action)
    }
}
