use std::collections::HashMap;
use std::fmt::Write;

use crate::models::{Event, Id, SessionUser, UserEvent};
use crate::ui::{View, escape_html};

use super::events::event_card;

pub fn profile(user: &SessionUser, registrations: usize) -> View {
    let html = format!(
        r#"<section class="profile"><h1>{name}</h1>
<p>@{username} · {role} · member since {since}</p>
<p>{registrations} event registration(s)</p>
<form data-action="update-profile">
  <label>Email <input name="email" type="email" value="{email}"></label>
  <label>First name <input name="firstName" value="{first}"></label>
  <label>Last name <input name="lastName" value="{last}"></label>
  <label>New password <input name="newPassword" type="password"></label>
  <button>Save</button>
</form></section>"#,
        name = escape_html(&user.full_name()),
        username = escape_html(&user.username),
        role = user.role.as_str(),
        since = user.created_at.format("%Y-%m-%d"),
        email = escape_html(&user.email),
        first = escape_html(&user.first_name),
        last = escape_html(&user.last_name),
    );
    View::new("Profile", html)
}

pub fn my_events(entries: &[UserEvent]) -> View {
    let mut html = String::from(r#"<section class="my-events"><h1>My events</h1>"#);
    if entries.is_empty() {
        html.push_str(r##"<p class="empty">You have not registered for any events yet. <a href="#/enrollment">Browse events</a></p>"##);
    } else {
        html.push_str("<ul>");
        for entry in entries {
            let _ = write!(
                html,
                r##"<li><a href="#/events/{event_id}">{title}</a> {date} {time} · registered {registered}<button data-action="cancel-registration" data-id="{reg_id}">Cancel</button></li>"##,
                event_id = entry.event.id,
                title = escape_html(&entry.event.title),
                date = entry.event.date,
                time = escape_html(&entry.event.time),
                registered = entry.registration.registered_at.format("%Y-%m-%d"),
                reg_id = entry.registration.id,
            );
        }
        html.push_str("</ul>");
    }
    html.push_str("</section>");
    View::new("My events", html)
}

/// Active events with the enrollment state of the current user.
/// `registered` maps event id to the user's registration id.
pub fn enrollment(events: &[Event], registered: &HashMap<Id, Id>) -> View {
    let mut html = String::from(r#"<section class="enrollment"><h1>Enroll in events</h1>"#);
    if events.is_empty() {
        html.push_str(r#"<p class="empty">There are no open events right now.</p>"#);
    }
    for event in events {
        html.push_str(r#"<div class="enroll-row">"#);
        html.push_str(&event_card(event));
        let control = match registered.get(&event.id) {
            Some(reg_id) => format!(
                r#"<button data-action="cancel-registration" data-id="{reg_id}">Withdraw</button>"#
            ),
            None if event.is_full() => r#"<button disabled>Full</button>"#.to_string(),
            None => format!(
                r#"<button data-action="register-for-event" data-id="{}">Enroll</button>"#,
                event.id
            ),
        };
        html.push_str(&control);
        html.push_str("</div>");
    }
    html.push_str("</section>");
    View::new("Enrollment", html)
}
