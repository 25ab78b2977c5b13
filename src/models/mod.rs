pub mod event;
pub mod registration;
pub mod session;
pub mod user;

/// Record ids assigned by the collection store.
pub type Id = u64;

pub use event::{Event, EventDraft, EventForm, EventStatus, EventUpdate, NewEvent};
pub use registration::{NewRegistration, Registration, RegistrationStatus, UserEvent};
pub use session::Session;
pub use user::{NewUser, ProfileForm, RegisterForm, SessionUser, User, UserRole, UserUpdate};
