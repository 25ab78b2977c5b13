pub mod password;

use chrono::{Duration, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::api::ApiClient;
use crate::error::AppError;
use crate::models::{NewUser, RegisterForm, Session, SessionUser, User, UserRole};
use crate::router::Identity;
use crate::session::SessionStore;

pub const MIN_PASSWORD_LEN: usize = 6;

pub type Listener = Box<dyn Fn(Option<&SessionUser>) + Send + Sync>;

/// Credential checks, session lifecycle and current-user queries.
pub struct AuthGate {
    api: ApiClient,
    sessions: SessionStore,
    ttl: Duration,
    current: RwLock<Option<Session>>,
    listeners: RwLock<Vec<Listener>>,
    changes: watch::Sender<Option<SessionUser>>,
}

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn validate_registration(form: &RegisterForm) -> Result<(), AppError> {
    let required = [
        ("username", &form.username),
        ("email", &form.email),
        ("password", &form.password),
        ("firstName", &form.first_name),
        ("lastName", &form.last_name),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::validation(field, format!("{field} is required")));
        }
    }

    if !is_valid_email(form.email.trim()) {
        return Err(AppError::validation("email", "Please enter a valid email address"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if let Some(confirm) = &form.confirm_password {
        if confirm != &form.password {
            return Err(AppError::validation("confirmPassword", "Passwords do not match"));
        }
    }
    Ok(())
}

impl AuthGate {
    pub fn new(api: ApiClient, sessions: SessionStore, ttl: Duration) -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            api,
            sessions,
            ttl,
            current: RwLock::new(None),
            listeners: RwLock::new(Vec::new()),
            changes,
        }
    }

    /// Registers an observer. Observers run synchronously, in registration
    /// order, after every login, logout and init outcome.
    pub fn on_change(&self, listener: impl Fn(Option<&SessionUser>) + Send + Sync + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        let user = self.current_user();
        for listener in self.listeners.read().iter() {
            listener(user.as_ref());
        }
        self.changes.send_replace(user);
    }

    fn start_session(&self, user: &User) -> Result<SessionUser, AppError> {
        let session = Session::new(SessionUser::from(user), self.ttl);
        self.sessions.save(&session)?;
        let summary = session.user.clone();
        *self.current.write() = Some(session);
        self.notify();
        Ok(summary)
    }

    fn drop_session(&self) -> Result<(), AppError> {
        *self.current.write() = None;
        self.sessions.clear()
    }

    /// Restores the persisted session. Expired sessions and sessions whose
    /// user no longer exists are cleared. A connectivity failure keeps the
    /// session as-is.
    pub async fn init(&self) -> Result<Option<SessionUser>, AppError> {
        let stored = match self.sessions.load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("failed to read session: {e}");
                None
            }
        };

        let restored = match stored {
            None => None,
            Some(session) if session.is_expired() => {
                tracing::info!(user_id = session.user.id, "session expired");
                self.discard_session();
                None
            }
            Some(session) => match self.api.get_user(session.user.id).await {
                Ok(_) => Some(session),
                Err(AppError::NotFound(_)) => {
                    tracing::warn!(user_id = session.user.id, "session user no longer exists");
                    self.discard_session();
                    None
                }
                Err(e) => {
                    tracing::warn!(user_id = session.user.id, "could not validate session: {e}");
                    Some(session)
                }
            },
        };

        *self.current.write() = restored;
        self.notify();
        Ok(self.current_user())
    }

    fn discard_session(&self) {
        if let Err(e) = self.sessions.clear() {
            tracing::warn!("failed to clear stored session: {e}");
        }
    }

    /// `identifier` matches either username or email. The first user whose
    /// identifier and password both match wins.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<SessionUser, AppError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AppError::validation("identifier", "Username or email is required"));
        }
        if password.is_empty() {
            return Err(AppError::validation("password", "Password is required"));
        }

        let users = self.api.get_users().await?;

        let mut found = None;
        for user in &users {
            let same_identity = user.username == identifier || user.email.eq_ignore_ascii_case(identifier);
            if same_identity && password::verify_password(password, &user.password)? {
                found = Some(user);
                break;
            }
        }

        let Some(user) = found else {
            tracing::warn!(identifier, "login rejected");
            return Err(AppError::InvalidCredentials);
        };

        let summary = self.start_session(user)?;
        tracing::info!(user_id = summary.id, username = %summary.username, "logged in");
        Ok(summary)
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<SessionUser, AppError> {
        validate_registration(form)?;

        let username = form.username.trim().to_string();
        let email = form.email.trim().to_lowercase();

        let users = self.api.get_users().await?;
        if users.iter().any(|u| u.username.eq_ignore_ascii_case(&username)) {
            return Err(AppError::validation("username", "Username already taken"));
        }
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
            return Err(AppError::validation("email", "Email already registered"));
        }

        let created = self
            .api
            .create_user(&NewUser {
                username,
                email,
                password: password::hash_password(&form.password)?,
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                role: UserRole::User,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(user_id = created.id, username = %created.username, "user registered");
        self.start_session(&created)
    }

    pub fn logout(&self) -> Result<(), AppError> {
        let user_id = self.current.read().as_ref().map(|s| s.user.id);
        let result = self.drop_session();
        if let Some(user_id) = user_id {
            tracing::info!(user_id, "logged out");
        }
        self.notify();
        result
    }

    /// Replaces the session's user summary after a profile change, keeping
    /// the original expiry.
    pub fn refresh_user(&self, user: &User) -> Result<(), AppError> {
        let updated = {
            let mut current = self.current.write();
            match current.as_mut() {
                Some(session) if session.user.id == user.id => {
                    session.user = SessionUser::from(user);
                    Some(session.clone())
                }
                _ => None,
            }
        };

        if let Some(session) = updated {
            self.sessions.save(&session)?;
            self.notify();
        }
        Ok(())
    }

    pub fn session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// The logged-in user, or `None` once the in-memory session has expired.
    pub fn current_user(&self) -> Option<SessionUser> {
        self.current
            .read()
            .as_ref()
            .filter(|s| !s.is_expired())
            .map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.current_user().is_some_and(|u| u.role == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    pub fn require_user(&self) -> Result<SessionUser, AppError> {
        self.current_user().ok_or(AppError::Unauthorized)
    }

    pub fn require_admin(&self) -> Result<SessionUser, AppError> {
        let user = self.require_user()?;
        if !user.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(user)
    }
}

impl Identity for AuthGate {
    fn current_user(&self) -> Option<SessionUser> {
        AuthGate::current_user(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegisterForm {
        RegisterForm {
            username: "liisa".into(),
            email: "liisa@example.com".into(),
            password: "hunter22".into(),
            confirm_password: None,
            first_name: "Liisa".into(),
            last_name: "Virtanen".into(),
        }
    }

    fn rejected_field(form: &RegisterForm) -> String {
        match validate_registration(form) {
            Err(AppError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.fi"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.fi"));
        assert!(!is_valid_email("a b@c.fi"));
        assert!(!is_valid_email("a@@c.fi"));
        assert!(!is_valid_email("a@.fi"));
    }

    #[test]
    fn registration_validation_order() {
        assert!(validate_registration(&form()).is_ok());

        let mut f = form();
        f.last_name = "  ".into();
        assert_eq!(rejected_field(&f), "lastName");

        let mut f = form();
        f.email = "not-an-email".into();
        assert_eq!(rejected_field(&f), "email");

        let mut f = form();
        f.password = "12345".into();
        assert_eq!(rejected_field(&f), "password");

        let mut f = form();
        f.confirm_password = Some("different".into());
        assert_eq!(rejected_field(&f), "confirmPassword");
    }
}
