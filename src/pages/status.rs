use crate::ui::{View, escape_html};

pub fn not_found(path: &str) -> View {
    View::new(
        "Page not found",
        format!(
            r##"<section class="status-page"><h1>404</h1><p>No page at <code>{}</code>.</p><a href="#/">Back to events</a></section>"##,
            escape_html(path)
        ),
    )
}

pub fn access_denied() -> View {
    View::new(
        "Access denied",
        r##"<section class="status-page"><h1>Access denied</h1><p>You do not have permission to view this page.</p><a href="#/">Back to events</a></section>"##,
    )
}

pub fn error(message: &str) -> View {
    View::new(
        "Error",
        format!(
            r##"<section class="status-page"><h1>Something went wrong</h1><p class="error">{}</p><button data-action="reload">Try again</button></section>"##,
            escape_html(message)
        ),
    )
}
