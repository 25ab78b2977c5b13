use std::fmt::Write;

use crate::api::DashboardStats;
use crate::models::{Event, EventStatus, Id, User};
use crate::ui::{View, escape_html};

pub fn dashboard(stats: &DashboardStats, recent: &[Event]) -> View {
    let mut html = format!(
        r##"<section class="admin"><h1>Admin dashboard</h1>
<ul class="stats">
  <li data-stat="users">{users}</li>
  <li data-stat="admins">{admins}</li>
  <li data-stat="events">{events}</li>
  <li data-stat="active-events">{active}</li>
  <li data-stat="registrations">{registrations}</li>
  <li data-stat="capacity">{capacity}</li>
</ul>
<nav><a href="#/admin/events">Manage events</a> <a href="#/admin/users">Manage users</a></nav>"##,
        users = stats.total_users,
        admins = stats.total_admins,
        events = stats.total_events,
        active = stats.active_events,
        registrations = stats.total_registrations,
        capacity = stats.total_capacity,
    );

    html.push_str("<h2>Latest events</h2><ul>");
    for event in recent {
        let _ = write!(
            html,
            "<li>{} ({}/{})</li>",
            escape_html(&event.title),
            event.registered_count,
            event.capacity
        );
    }
    html.push_str("</ul></section>");

    View::new("Admin Dashboard", html)
}

pub fn events(events: &[Event]) -> View {
    let mut html = String::from(
        r#"<section class="admin-events"><h1>Manage events</h1>
<form data-action="create-event">
  <input name="title" placeholder="Title" required>
  <textarea name="description"></textarea>
  <input name="date" type="date" required>
  <input name="time" type="time" required>
  <input name="location" required>
  <input name="category" required>
  <input name="capacity" type="number" min="1" required>
  <input name="price" type="number" min="0" step="0.01">
  <input name="organizer">
  <button>Create event</button>
</form>
<table><thead><tr><th>Title</th><th>Date</th><th>Status</th><th>Registered</th><th></th></tr></thead><tbody>"#,
    );
    for event in events {
        let _ = write!(
            html,
            r#"<tr data-event-id="{id}"><td>{title}</td><td>{date}</td><td>{status}</td><td>{count}/{capacity}</td><td><button data-action="edit-event" data-id="{id}">Edit</button><button data-action="delete-event" data-id="{id}">Delete</button></td></tr>"#,
            id = event.id,
            title = escape_html(&event.title),
            date = event.date,
            status = event.status.as_str(),
            count = event.registered_count,
            capacity = event.capacity,
        );
    }
    html.push_str("</tbody></table></section>");
    View::new("Manage events", html)
}

/// `current_admin` gets no delete or role buttons for their own row.
pub fn users(users: &[User], current_admin: Id) -> View {
    let mut html = String::from(
        r#"<section class="admin-users"><h1>Manage users</h1><table><thead><tr><th>Username</th><th>Name</th><th>Email</th><th>Role</th><th></th></tr></thead><tbody>"#,
    );
    for user in users {
        let controls = if user.id == current_admin {
            String::new()
        } else {
            let next_role = if user.is_admin() { "user" } else { "admin" };
            format!(
                r#"<button data-action="set-user-role" data-id="{id}" data-role="{next_role}">Make {next_role}</button><button data-action="delete-user" data-id="{id}">Delete</button>"#,
                id = user.id,
            )
        };
        let _ = write!(
            html,
            r#"<tr data-user-id="{id}"><td>{username}</td><td>{name}</td><td>{email}</td><td>{role}</td><td>{controls}</td></tr>"#,
            id = user.id,
            username = escape_html(&user.username),
            name = escape_html(&user.full_name()),
            email = escape_html(&user.email),
            role = user.role.as_str(),
        );
    }
    html.push_str("</tbody></table></section>");
    View::new("Manage users", html)
}

/// Body of the edit-event modal.
pub fn edit_event_form(event: &Event) -> String {
    let mut options = String::new();
    for status in [EventStatus::Active, EventStatus::Inactive, EventStatus::Cancelled] {
        let selected = if status == event.status { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{s}"{selected}>{s}</option>"#,
            s = status.as_str()
        );
    }

    format!(
        r#"<form data-action="update-event" data-id="{id}">
  <input name="title" value="{title}" required>
  <textarea name="description">{description}</textarea>
  <input name="date" type="date" value="{date}" required>
  <input name="time" type="time" value="{time}" required>
  <input name="location" value="{location}" required>
  <input name="category" value="{category}" required>
  <input name="capacity" type="number" min="1" value="{capacity}" required>
  <input name="price" type="number" min="0" step="0.01" value="{price}">
  <input name="organizer" value="{organizer}">
  <select name="status">{options}</select>
  <button>Save</button>
</form>"#,
        id = event.id,
        title = escape_html(&event.title),
        description = escape_html(&event.description),
        date = event.date,
        time = escape_html(&event.time),
        location = escape_html(&event.location),
        category = escape_html(&event.category),
        capacity = event.capacity,
        price = event.price,
        organizer = escape_html(&event.organizer),
    )
}
