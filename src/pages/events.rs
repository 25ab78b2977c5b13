use std::collections::BTreeSet;
use std::fmt::Write;

use crate::models::{Event, Registration, SessionUser};
use crate::ui::{View, escape_html};

fn price_label(price: f64) -> String {
    if price <= 0.0 {
        "Free".to_string()
    } else {
        format!("€{price:.2}")
    }
}

fn spots_label(event: &Event) -> String {
    if event.is_full() {
        "Full".to_string()
    } else {
        format!("{} / {} spots left", event.available_spots(), event.capacity)
    }
}

pub fn event_card(event: &Event) -> String {
    format!(
        r##"<article class="event-card" data-event-id="{id}">
  <h3><a href="#/events/{id}">{title}</a></h3>
  <p class="meta">{date} {time} · {location}</p>
  <p class="category">{category}</p>
  <p class="spots">{spots}</p>
  <p class="price">{price}</p>
</article>"##,
        id = event.id,
        title = escape_html(&event.title),
        date = event.date,
        time = escape_html(&event.time),
        location = escape_html(&event.location),
        category = escape_html(&event.category),
        spots = spots_label(event),
        price = price_label(event.price),
    )
}

/// Distinct categories, sorted.
pub fn categories(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|e| e.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn home(events: &[Event], all_categories: &[String], query: &str, category: &str) -> View {
    let mut html = String::from(r#"<section class="home"><h1>Upcoming events</h1>"#);

    let _ = write!(
        html,
        r#"<form class="search" data-action="search"><input name="q" value="{}"><select name="category"><option value="">All categories</option>"#,
        escape_html(query)
    );
    for c in all_categories {
        let selected = if c.eq_ignore_ascii_case(category) { " selected" } else { "" };
        let _ = write!(
            html,
            r#"<option value="{c}"{selected}>{c}</option>"#,
            c = escape_html(c),
        );
    }
    html.push_str("</select><button>Search</button></form>");

    if events.is_empty() {
        html.push_str(r#"<p class="empty">No events match your search.</p>"#);
    } else {
        html.push_str(r#"<div class="event-grid">"#);
        for event in events {
            html.push_str(&event_card(event));
        }
        html.push_str("</div>");
    }
    html.push_str("</section>");

    View::new("Events", html)
}

pub fn event_detail(
    event: &Event,
    user: Option<&SessionUser>,
    registration: Option<&Registration>,
) -> View {
    let mut html = format!(
        r#"<section class="event-detail"><h1>{title}</h1><p class="meta">{date} {time} · {location}</p><p>{description}</p><dl><dt>Organizer</dt><dd>{organizer}</dd><dt>Category</dt><dd>{category}</dd><dt>Price</dt><dd>{price}</dd><dt>Availability</dt><dd>{spots}</dd></dl>"#,
        title = escape_html(&event.title),
        date = event.date,
        time = escape_html(&event.time),
        location = escape_html(&event.location),
        description = escape_html(&event.description),
        organizer = escape_html(&event.organizer),
        category = escape_html(&event.category),
        price = price_label(event.price),
        spots = spots_label(event),
    );

    let action = match (user, registration) {
        (None, _) => r##"<a class="button" href="#/login">Log in to register</a>"##.to_string(),
        (Some(_), Some(reg)) => format!(
            r#"<p class="registered">You are registered.</p><button data-action="cancel-registration" data-id="{}">Cancel registration</button>"#,
            reg.id
        ),
        (Some(_), None) if !event.is_active() => {
            r#"<p class="closed">Registration is closed.</p>"#.to_string()
        }
        (Some(_), None) if event.is_full() => r#"<p class="full">This event is full.</p>"#.to_string(),
        (Some(_), None) => format!(
            r#"<button data-action="register-for-event" data-id="{}">Register</button>"#,
            event.id
        ),
    };
    html.push_str(&action);
    html.push_str("</section>");

    View::new(event.title.clone(), html)
}
