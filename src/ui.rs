use std::collections::HashMap;

use parking_lot::Mutex;

/// A rendered page: document title plus the HTML placed in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub title: String,
    pub html: String,
}

impl View {
    pub fn new(title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            html: html.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    pub title: String,
    pub body: String,
}

#[derive(Default)]
struct UiState {
    view: Option<View>,
    toasts: Vec<Toast>,
    modal: Option<Modal>,
    loading: usize,
    field_errors: HashMap<String, String>,
}

/// View-layer state: the render container, toast queue, modal, spinner and
/// inline form errors.
#[derive(Default)]
pub struct Ui {
    state: Mutex<UiState>,
}

/// Ends one unit of loading when dropped.
pub struct LoadingGuard<'a> {
    ui: &'a Ui,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.ui.state.lock();
        state.loading = state.loading.saturating_sub(1);
    }
}

impl Ui {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the container content. Field errors belong to the previous
    /// page and are cleared.
    pub fn render(&self, view: View) {
        let mut state = self.state.lock();
        state.view = Some(view);
        state.field_errors.clear();
    }

    pub fn view(&self) -> Option<View> {
        self.state.lock().view.clone()
    }

    pub fn title(&self) -> Option<String> {
        self.state.lock().view.as_ref().map(|v| v.title.clone())
    }

    pub fn html(&self) -> String {
        self.state
            .lock()
            .view
            .as_ref()
            .map(|v| v.html.clone())
            .unwrap_or_default()
    }

    pub fn toast(&self, kind: ToastKind, message: impl Into<String>) {
        self.state.lock().toasts.push(Toast {
            kind,
            message: message.into(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.toast(ToastKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.toast(ToastKind::Error, message);
    }

    /// Drains the toast queue.
    pub fn take_toasts(&self) -> Vec<Toast> {
        std::mem::take(&mut self.state.lock().toasts)
    }

    pub fn open_modal(&self, title: impl Into<String>, body: impl Into<String>) {
        self.state.lock().modal = Some(Modal {
            title: title.into(),
            body: body.into(),
        });
    }

    pub fn close_modal(&self) -> Option<Modal> {
        self.state.lock().modal.take()
    }

    pub fn modal(&self) -> Option<Modal> {
        self.state.lock().modal.clone()
    }

    pub fn begin_loading(&self) -> LoadingGuard<'_> {
        self.state.lock().loading += 1;
        LoadingGuard { ui: self }
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading > 0
    }

    pub fn set_field_error(&self, field: impl Into<String>, message: impl Into<String>) {
        self.state
            .lock()
            .field_errors
            .insert(field.into(), message.into());
    }

    pub fn field_error(&self, field: &str) -> Option<String> {
        self.state.lock().field_errors.get(field).cloned()
    }

    pub fn field_errors(&self) -> HashMap<String, String> {
        self.state.lock().field_errors.clone()
    }

    pub fn clear_field_errors(&self) {
        self.state.lock().field_errors.clear();
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
