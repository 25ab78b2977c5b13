pub mod action;
mod routes;

use std::sync::Arc;

use chrono::Duration;

pub use action::Action;

use crate::api::ApiClient;
use crate::auth::{self, AuthGate};
use crate::config::Config;
use crate::error::{AppError, ErrorKind};
use crate::models::{SessionUser, UserUpdate};
use crate::pages;
use crate::router::{Resolution, Router, with_query};
use crate::session::{SessionStore, StorageBackend};
use crate::ui::Ui;

/// The application's component graph: API client, auth gate, router and UI
/// state, wired once and shared through `Arc`s.
pub struct App {
    api: ApiClient,
    auth: Arc<AuthGate>,
    router: Arc<Router>,
    ui: Arc<Ui>,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let storage = StorageBackend::from_path(config.session_file.as_deref());
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: &Config, storage: StorageBackend) -> Self {
        let api = ApiClient::new(&config.api_base_url);
        let auth = Arc::new(AuthGate::new(
            api.clone(),
            SessionStore::new(storage),
            Duration::hours(config.session_ttl_hours),
        ));
        let ui = Arc::new(Ui::new());
        let router = Arc::new(Router::with_login_path(
            auth.clone(),
            ui.clone(),
            &config.login_path,
        ));
        routes::install(&router, &api);

        Self {
            api,
            auth,
            router,
            ui,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    /// Restores the persisted session, then renders `initial_path`.
    pub async fn start(&self, initial_path: &str) -> Resolution {
        if let Err(e) = self.auth.init().await {
            tracing::warn!("session restore failed: {e}");
        }
        self.router.replace(initial_path).await
    }

    /// Performs `action` and reflects the result in the UI. Returns the
    /// resolution when the action navigated or re-rendered.
    pub async fn dispatch(&self, action: Action) -> Option<Resolution> {
        let _loading = self.ui.begin_loading();
        self.ui.clear_field_errors();

        match self.perform(action).await {
            Ok(resolution) => resolution,
            Err(e) => self.report(e).await,
        }
    }

    async fn report(&self, err: AppError) -> Option<Resolution> {
        match err.kind() {
            ErrorKind::Validation => {
                if let AppError::Validation { field, message } = &err {
                    self.ui.set_field_error(field.clone(), message.clone());
                }
                None
            }
            ErrorKind::Authorization if matches!(err, AppError::Unauthorized) => {
                let login = self.router.login_path().to_string();
                Some(self.router.navigate(&login).await)
            }
            ErrorKind::Unexpected => {
                tracing::error!("unexpected error: {err}");
                self.ui.error(err.to_string());
                Some(self.router.reload().await)
            }
            _ => {
                tracing::warn!("action failed: {err}");
                self.ui.error(err.to_string());
                None
            }
        }
    }

    /// Re-renders when already at `path`, otherwise navigates there.
    async fn show(&self, path: &str) -> Resolution {
        if self.router.current_location() == path {
            self.router.reload().await
        } else {
            self.router.navigate(path).await
        }
    }

    async fn perform(&self, action: Action) -> Result<Option<Resolution>, AppError> {
        let resolution = match action {
            Action::Navigate(path) => self.router.navigate(&path).await,
            Action::Back => return Ok(self.router.back().await),
            Action::Forward => return Ok(self.router.forward().await),
            Action::Reload => self.router.reload().await,

            Action::Login {
                identifier,
                password,
            } => {
                let user = self.auth.login(&identifier, &password).await?;
                self.ui.success(format!("Welcome back, {}!", user.first_name));
                self.router
                    .navigate(if user.is_admin() { "/admin" } else { "/" })
                    .await
            }
            Action::Register(form) => {
                let user = self.auth.register(&form).await?;
                self.ui.success(format!("Welcome, {}!", user.first_name));
                self.router.navigate("/").await
            }
            Action::Logout => {
                self.auth.logout()?;
                self.ui.success("You have been logged out");
                self.router.navigate("/").await
            }

            Action::RegisterForEvent(event_id) => {
                let user = self.auth.require_user()?;
                self.api.register_for_event(user.id, event_id).await?;
                self.ui.success("Registration confirmed");
                self.router.reload().await
            }
            Action::CancelRegistration(registration_id) => {
                let user = self.auth.require_user()?;
                let registration = self.api.get_registration(registration_id).await?;
                if registration.user_id != user.id && !user.is_admin() {
                    return Err(AppError::Forbidden);
                }
                self.api.cancel_registration(registration_id).await?;
                self.ui.success("Registration cancelled");
                self.router.reload().await
            }
            Action::UpdateProfile(form) => {
                let user = self.auth.require_user()?;
                let update = self.validate_profile(&user, form).await?;
                let updated = self.api.update_user(user.id, &update).await?;
                self.auth.refresh_user(&updated)?;
                self.ui.success("Profile updated");
                self.router.reload().await
            }

            Action::EditEvent(id) => {
                self.auth.require_admin()?;
                let event = self.api.get_event(id).await?;
                self.ui.open_modal(
                    format!("Edit {}", event.title),
                    pages::admin::edit_event_form(&event),
                );
                return Ok(None);
            }
            Action::CreateEvent(form) => {
                let admin = self.auth.require_admin()?;
                let mut event = form.validate()?.into_new_event();
                if event.organizer.is_empty() {
                    event.organizer = admin.full_name();
                }
                self.api.create_event(&event).await?;
                self.ui.success("Event created");
                self.show("/admin/events").await
            }
            Action::UpdateEvent { id, form } => {
                self.auth.require_admin()?;
                let update = form.validate()?.into_update();
                self.api.update_event(id, &update).await?;
                self.ui.close_modal();
                self.ui.success("Event updated");
                self.show("/admin/events").await
            }
            Action::DeleteEvent(id) => {
                self.auth.require_admin()?;
                self.api.delete_event(id).await?;
                self.ui.success("Event deleted");
                self.show("/admin/events").await
            }
            Action::DeleteUser(id) => {
                let admin = self.auth.require_admin()?;
                if id == admin.id {
                    return Err(AppError::Conflict("You cannot delete your own account".into()));
                }
                self.api.delete_user(id).await?;
                self.ui.success("User deleted");
                self.show("/admin/users").await
            }
            Action::SetUserRole { id, role } => {
                let admin = self.auth.require_admin()?;
                if id == admin.id {
                    return Err(AppError::Conflict("You cannot change your own role".into()));
                }
                self.api
                    .update_user(
                        id,
                        &UserUpdate {
                            role: Some(role),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.ui.success(format!("Role changed to {}", role.as_str()));
                self.show("/admin/users").await
            }

            Action::Search { query, category } => {
                let category = category.unwrap_or_default();
                let params = [("q", query.trim()), ("category", category.as_str())];
                let path = with_query("/", &params)?;
                self.router.navigate(&path).await
            }
        };
        Ok(Some(resolution))
    }

    async fn validate_profile(
        &self,
        user: &SessionUser,
        form: crate::models::ProfileForm,
    ) -> Result<UserUpdate, AppError> {
        let email = form.email.trim().to_lowercase();
        if !auth::is_valid_email(&email) {
            return Err(AppError::validation("email", "Please enter a valid email address"));
        }
        for (field, value) in [("firstName", &form.first_name), ("lastName", &form.last_name)] {
            if value.trim().is_empty() {
                return Err(AppError::validation(field, format!("{field} is required")));
            }
        }

        if !email.eq_ignore_ascii_case(&user.email) {
            let taken = self
                .api
                .get_users()
                .await?
                .iter()
                .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&email));
            if taken {
                return Err(AppError::validation("email", "Email already registered"));
            }
        }

        let password = match form.new_password.filter(|p| !p.is_empty()) {
            Some(p) if p.chars().count() < auth::MIN_PASSWORD_LEN => {
                return Err(AppError::validation(
                    "newPassword",
                    format!("Password must be at least {} characters", auth::MIN_PASSWORD_LEN),
                ));
            }
            Some(p) => Some(auth::password::hash_password(&p)?),
            None => None,
        };

        Ok(UserUpdate {
            email: Some(email),
            password,
            first_name: Some(form.first_name.trim().to_string()),
            last_name: Some(form.last_name.trim().to_string()),
            role: None,
        })
    }
}
