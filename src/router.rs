use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};

use crate::error::AppError;
use crate::models::{Id, SessionUser, UserRole};
use crate::pages;
use crate::ui::{Ui, View};

/// The path that registers the not-found fallback.
pub const WILDCARD: &str = "*";

const MAX_REDIRECTS: usize = 4;

/// Source of the current user, queried synchronously at dispatch time.
pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<SessionUser>;
}

#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub user: Option<SessionUser>,
}

impl Request {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A numeric path parameter. Anything unparsable is reported as a
    /// missing resource.
    pub fn param_id(&self, name: &str) -> Result<Id, AppError> {
        let raw = self.param(name).unwrap_or_default();
        raw.parse()
            .map_err(|_| AppError::NotFound(format!("No resource with id {raw:?}")))
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn require_user(&self) -> Result<&SessionUser, AppError> {
        self.user.as_ref().ok_or(AppError::Unauthorized)
    }
}

pub type HandlerFuture = BoxFuture<'static, Result<View, AppError>>;
pub type Handler = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A compiled route path. `:name` captures one non-empty path segment, `*`
/// matches anything (including `/`), everything else matches literally.
/// Matches are anchored at both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    tokens: Vec<Token>,
    param_names: Vec<String>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Pattern {
    pub fn compile(path: &str) -> Self {
        let mut tokens = Vec::new();
        let mut param_names = Vec::new();
        let mut literal = String::new();
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                ':' if chars.peek().copied().is_some_and(is_ident_char) => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if !is_ident_char(next) {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    param_names.push(name.clone());
                    tokens.push(Token::Param(name));
                }
                '*' => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(Token::Wildcard);
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Self {
            tokens,
            param_names,
        }
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Positional captures, one per `:name` in the pattern.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let mut caps = Vec::with_capacity(self.param_names.len());
        match_tokens(&self.tokens, path, &mut caps).then_some(caps)
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }

    /// Zips the captures against the parameter names.
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        self.captures(path)
            .map(|caps| self.param_names.iter().cloned().zip(caps).collect())
            .unwrap_or_default()
    }
}

fn match_tokens(tokens: &[Token], input: &str, caps: &mut Vec<String>) -> bool {
    let Some((first, rest)) = tokens.split_first() else {
        return input.is_empty();
    };

    match first {
        Token::Literal(lit) => input
            .strip_prefix(lit.as_str())
            .is_some_and(|tail| match_tokens(rest, tail, caps)),
        Token::Param(_) => {
            let segment_end = input.find('/').unwrap_or(input.len());
            // Greedy, then backtrack.
            for end in (1..=segment_end).rev() {
                if !input.is_char_boundary(end) {
                    continue;
                }
                caps.push(input[..end].to_string());
                if match_tokens(rest, &input[end..], caps) {
                    return true;
                }
                caps.pop();
            }
            false
        }
        Token::Wildcard => (0..=input.len())
            .rev()
            .filter(|end| input.is_char_boundary(*end))
            .any(|end| match_tokens(rest, &input[end..], caps)),
    }
}

/// Splits `"/path?a=1&b=2"` into the path and its decoded query map.
pub fn split_location(location: &str) -> (String, HashMap<String, String>) {
    let (path, query) = location.split_once('?').unwrap_or((location, ""));
    let query = serde_urlencoded::from_str(query).unwrap_or_else(|e| {
        tracing::debug!(query, "ignoring malformed query string: {e}");
        HashMap::new()
    });
    (path.to_string(), query)
}

/// `path` followed by the non-empty `params` as an encoded query string.
pub fn with_query(path: &str, params: &[(&str, &str)]) -> Result<String, AppError> {
    let params: Vec<(&str, &str)> = params.iter().copied().filter(|(_, v)| !v.is_empty()).collect();
    if params.is_empty() {
        return Ok(path.to_string());
    }
    let query = serde_urlencoded::to_string(&params)
        .map_err(|e| AppError::Internal(format!("Failed to encode query: {e}")))?;
    Ok(format!("{path}?{query}"))
}

fn normalize(path: &str) -> String {
    let path = path.trim().trim_start_matches('#');
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Linear browser-style history of hash locations.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    index: usize,
}

impl History {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: vec![normalize(initial)],
            index: 0,
        }
    }

    pub fn current(&self) -> &str {
        &self.entries[self.index]
    }

    /// The current location as a hash fragment, e.g. `#/events/3`.
    pub fn fragment(&self) -> String {
        format!("#{}", self.current())
    }

    pub fn push(&mut self, path: &str) {
        self.entries.truncate(self.index + 1);
        self.entries.push(normalize(path));
        self.index = self.entries.len() - 1;
    }

    pub fn replace(&mut self, path: &str) {
        self.entries[self.index] = normalize(path);
    }

    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

struct Route {
    path: String,
    pattern: Pattern,
    handler: Handler,
    requires_auth: bool,
    required_role: Option<UserRole>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub path: String,
    pub requires_auth: bool,
    pub required_role: Option<UserRole>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rendered,
    /// A guard sent the user to the login page, which then rendered.
    Redirected { from: String },
    AccessDenied,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The location that was finally rendered.
    pub path: String,
    pub outcome: Outcome,
}

enum Step {
    Done(Outcome),
    Redirect(String),
}

/// Maps hash paths to handlers, enforcing authentication and role guards.
///
/// Routes are tried in registration order and the first match wins, so more
/// specific paths must be added before generic ones.
pub struct Router {
    identity: Arc<dyn Identity>,
    ui: Arc<Ui>,
    routes: RwLock<Vec<Arc<Route>>>,
    history: Mutex<History>,
    login_path: String,
}

impl Router {
    pub fn new(identity: Arc<dyn Identity>, ui: Arc<Ui>) -> Self {
        Self::with_login_path(identity, ui, "/login")
    }

    pub fn with_login_path(identity: Arc<dyn Identity>, ui: Arc<Ui>, login_path: &str) -> Self {
        Self {
            identity,
            ui,
            routes: RwLock::new(Vec::new()),
            history: Mutex::new(History::new("/")),
            login_path: normalize(login_path),
        }
    }

    /// Registers `path`. Re-registering an existing path replaces its
    /// handler and guards but keeps its original position.
    pub fn add_route<F, Fut>(
        &self,
        path: &str,
        handler: F,
        requires_auth: bool,
        required_role: Option<UserRole>,
    ) where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<View, AppError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req| handler(req).boxed());
        let route = Arc::new(Route {
            path: path.to_string(),
            pattern: Pattern::compile(path),
            handler,
            requires_auth,
            required_role,
        });

        let mut routes = self.routes.write();
        match routes.iter_mut().find(|r| r.path == path) {
            Some(existing) => *existing = route,
            None => routes.push(route),
        }
    }

    /// The registered routes and their guards, in matching order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.routes
            .read()
            .iter()
            .map(|r| RouteInfo {
                path: r.path.clone(),
                requires_auth: r.requires_auth,
                required_role: r.required_role,
            })
            .collect()
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn current_location(&self) -> String {
        self.history.lock().current().to_string()
    }

    pub fn history(&self) -> History {
        self.history.lock().clone()
    }

    pub async fn navigate(&self, path: &str) -> Resolution {
        self.history.lock().push(path);
        self.resolve().await
    }

    pub async fn replace(&self, path: &str) -> Resolution {
        self.history.lock().replace(path);
        self.resolve().await
    }

    /// Moves back one entry and resolves; `None` at the start of history.
    pub async fn back(&self) -> Option<Resolution> {
        let moved = self.history.lock().back();
        if moved { Some(self.resolve().await) } else { None }
    }

    pub async fn forward(&self) -> Option<Resolution> {
        let moved = self.history.lock().forward();
        if moved { Some(self.resolve().await) } else { None }
    }

    pub async fn reload(&self) -> Resolution {
        self.resolve().await
    }

    /// Resolves and renders the current history entry.
    pub async fn resolve(&self) -> Resolution {
        let mut redirected_from: Option<String> = None;

        for _ in 0..MAX_REDIRECTS {
            let location = self.current_location();
            match self.dispatch(&location).await {
                Step::Done(outcome) => {
                    let outcome = match (outcome, redirected_from) {
                        (Outcome::Rendered, Some(from)) => Outcome::Redirected { from },
                        (outcome, _) => outcome,
                    };
                    return Resolution {
                        path: location,
                        outcome,
                    };
                }
                Step::Redirect(to) => {
                    tracing::debug!(from = %location, to = %to, "authentication required");
                    redirected_from.get_or_insert(location);
                    self.history.lock().replace(&to);
                }
            }
        }

        let path = self.current_location();
        let message = format!("Too many redirects while resolving {path}");
        tracing::error!("{message}");
        self.ui.render(pages::status::error(&message));
        Resolution {
            path,
            outcome: Outcome::Failed(message),
        }
    }

    fn match_route(&self, path: &str) -> Option<(Arc<Route>, HashMap<String, String>)> {
        let routes = self.routes.read();
        routes
            .iter()
            .filter(|r| r.path != WILDCARD)
            .find(|r| r.pattern.is_match(path))
            .map(|r| (Arc::clone(r), r.pattern.extract_params(path)))
    }

    fn fallback(&self) -> Option<Arc<Route>> {
        self.routes
            .read()
            .iter()
            .find(|r| r.path == WILDCARD)
            .cloned()
    }

    async fn dispatch(&self, location: &str) -> Step {
        let (path, query) = split_location(location);
        let user = self.identity.current_user();

        let Some((route, params)) = self.match_route(&path) else {
            tracing::debug!(path, "no route matched");
            let outcome = match self.fallback() {
                Some(fallback) => {
                    let req = Request {
                        path,
                        params: HashMap::new(),
                        query,
                        user,
                    };
                    match self.run(&fallback.handler, req).await {
                        Outcome::Rendered => Outcome::NotFound,
                        other => other,
                    }
                }
                None => {
                    self.ui.render(pages::status::not_found(&path));
                    Outcome::NotFound
                }
            };
            return Step::Done(outcome);
        };

        if route.requires_auth && user.is_none() {
            return Step::Redirect(self.login_path.clone());
        }

        if let Some(role) = route.required_role {
            if !user.as_ref().is_some_and(|u| u.role == role) {
                tracing::debug!(path, role = role.as_str(), "access denied");
                self.ui.render(pages::status::access_denied());
                return Step::Done(Outcome::AccessDenied);
            }
        }

        let req = Request {
            path,
            params,
            query,
            user,
        };
        Step::Done(self.run(&route.handler, req).await)
    }

    async fn run(&self, handler: &Handler, req: Request) -> Outcome {
        let path = req.path.clone();
        let fut = handler(req);

        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(view)) => {
                self.ui.render(view);
                Outcome::Rendered
            }
            Ok(Err(e)) => {
                tracing::error!(path, "route handler failed: {e}");
                let message = e.to_string();
                self.ui.render(pages::status::error(&message));
                Outcome::Failed(message)
            }
            Err(_) => {
                tracing::error!(path, "route handler panicked");
                let message = "Unexpected error while rendering the page".to_string();
                self.ui.render(pages::status::error(&message));
                Outcome::Failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    struct FakeIdentity {
        user: Mutex<Option<SessionUser>>,
    }

    impl FakeIdentity {
        fn set_role(&self, role: Option<UserRole>) {
            *self.user.lock() = role.map(|role| SessionUser {
                id: 1,
                username: "tester".into(),
                email: "tester@example.com".into(),
                first_name: "Test".into(),
                last_name: "User".into(),
                role,
                created_at: Utc::now(),
            });
        }
    }

    impl Identity for FakeIdentity {
        fn current_user(&self) -> Option<SessionUser> {
            self.user.lock().clone()
        }
    }

    fn page(title: &'static str) -> impl Fn(Request) -> futures::future::Ready<Result<View, AppError>> + Send + Sync + 'static {
        move |_req| futures::future::ready(Ok(View::new(title, title)))
    }

    fn setup() -> (Arc<FakeIdentity>, Arc<Ui>, Router) {
        let identity = Arc::new(FakeIdentity::default());
        let ui = Arc::new(Ui::new());
        let router = Router::new(identity.clone(), ui.clone());
        router.add_route("/", page("home"), false, None);
        router.add_route("/login", page("login"), false, None);
        router.add_route("/profile", page("profile"), true, None);
        router.add_route("/admin", page("admin"), true, Some(UserRole::Admin));
        router.add_route("/events/:id", |req: Request| async move {
            Ok::<_, AppError>(View::new(
                "event",
                format!("event {}", req.param("id").unwrap_or_default()),
            ))
        }, false, None);
        router.add_route(WILDCARD, page("missing"), false, None);
        (identity, ui, router)
    }

    #[test]
    fn pattern_extracts_named_segments() {
        let pattern = Pattern::compile("/events/:id");
        assert_eq!(pattern.param_names(), ["id".to_string()]);

        let params = pattern.extract_params("/events/42");
        assert_eq!(params.get("id").map(String::as_str), Some("42"));

        assert!(!pattern.is_match("/events/"));
        assert!(!pattern.is_match("/events/42/edit"));
        assert!(!pattern.is_match("/xevents/42"));
    }

    #[test]
    fn pattern_wildcard_spans_segments() {
        let pattern = Pattern::compile("/files/*");
        assert!(pattern.is_match("/files/"));
        assert!(pattern.is_match("/files/a/b/c"));
        assert!(!pattern.is_match("/file"));

        let pattern = Pattern::compile("/users/:userId/events/:eventId");
        let params = pattern.extract_params("/users/3/events/9");
        assert_eq!(params["userId"], "3");
        assert_eq!(params["eventId"], "9");
    }

    #[test]
    fn patterns_backtrack_within_a_segment() {
        let pattern = Pattern::compile("/report-:year.csv");
        assert_eq!(pattern.captures("/report-2026.csv"), Some(vec!["2026".to_string()]));
        assert!(!pattern.is_match("/report-.csv"));
    }

    #[test]
    fn query_is_split_and_decoded() {
        let (path, query) = split_location("/?q=jazz+night&category=music%20%26%20arts&flag");
        assert_eq!(path, "/");
        assert_eq!(query["q"], "jazz night");
        assert_eq!(query["category"], "music & arts");
        assert_eq!(query["flag"], "");

        let location = with_query("/", &[("q", ""), ("c", "ääkköset/? & co")]).unwrap();
        assert!(!location.contains("q="));
        let (_, round) = split_location(&location);
        assert_eq!(round["c"], "ääkköset/? & co");
        assert_eq!(with_query("/", &[("q", "")]).unwrap(), "/");
    }

    #[test]
    fn history_push_truncates_forward_entries() {
        let mut history = History::new("/");
        history.push("a");
        history.push("#/b");
        assert_eq!(history.fragment(), "#/b");
        assert!(history.back());
        history.push("/c");
        assert_eq!(history.entries(), ["/", "/a", "/c"]);
        assert!(!history.forward());
    }

    #[tokio::test]
    async fn params_reach_the_handler() {
        let (_, ui, router) = setup();
        let res = router.navigate("/events/42").await;
        assert_eq!(res.outcome, Outcome::Rendered);
        assert_eq!(ui.html(), "event 42");
    }

    #[tokio::test]
    async fn query_string_does_not_affect_matching() {
        let (_, ui, router) = setup();
        let res = router.navigate("/events/7?ref=home").await;
        assert_eq!(res.outcome, Outcome::Rendered);
        assert_eq!(ui.html(), "event 7");
    }

    #[tokio::test]
    async fn unauthenticated_user_is_redirected_to_login() {
        let (_, ui, router) = setup();
        for path in ["/profile", "/admin"] {
            let res = router.navigate(path).await;
            assert_eq!(res.path, "/login");
            assert_eq!(res.outcome, Outcome::Redirected { from: path.to_string() });
            assert_eq!(ui.title().as_deref(), Some("login"));
        }
        assert_eq!(router.current_location(), "/login");
    }

    #[tokio::test]
    async fn wrong_role_is_denied_without_redirect() {
        let (identity, ui, router) = setup();
        identity.set_role(Some(UserRole::User));

        let res = router.navigate("/admin").await;
        assert_eq!(res.outcome, Outcome::AccessDenied);
        assert_eq!(res.path, "/admin");
        assert_eq!(router.current_location(), "/admin");
        assert_eq!(ui.title().as_deref(), Some("Access denied"));

        identity.set_role(Some(UserRole::Admin));
        assert_eq!(router.reload().await.outcome, Outcome::Rendered);
        assert_eq!(ui.title().as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn guards_are_read_at_dispatch_time() {
        let (identity, _, router) = setup();
        identity.set_role(Some(UserRole::User));
        assert_eq!(router.navigate("/profile").await.outcome, Outcome::Rendered);

        identity.set_role(None);
        let res = router.reload().await;
        assert_eq!(res.outcome, Outcome::Redirected { from: "/profile".into() });
    }

    #[tokio::test]
    async fn unmatched_path_uses_wildcard_handler() {
        let (_, ui, router) = setup();
        let res = router.navigate("/nowhere/at/all").await;
        assert_eq!(res.outcome, Outcome::NotFound);
        assert_eq!(ui.title().as_deref(), Some("missing"));
    }

    #[tokio::test]
    async fn builtin_not_found_without_wildcard() {
        let ui = Arc::new(Ui::new());
        let router = Router::new(Arc::new(FakeIdentity::default()), ui.clone());
        router.add_route("/", page("home"), false, None);

        assert_eq!(router.navigate("/missing").await.outcome, Outcome::NotFound);
        assert_eq!(ui.title().as_deref(), Some("Page not found"));
    }

    #[tokio::test]
    async fn first_registered_match_wins() {
        let ui = Arc::new(Ui::new());
        let router = Router::new(Arc::new(FakeIdentity::default()), ui.clone());
        router.add_route("/events/:id", page("generic"), false, None);
        router.add_route("/events/new", page("specific"), false, None);

        router.navigate("/events/new").await;
        assert_eq!(ui.title().as_deref(), Some("generic"));

        // Re-registering keeps the original position.
        router.add_route("/events/:id", page("generic v2"), false, None);
        let paths: Vec<_> = router.routes().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, ["/events/:id", "/events/new"]);
        router.reload().await;
        assert_eq!(ui.title().as_deref(), Some("generic v2"));
    }

    #[tokio::test]
    async fn handler_errors_render_the_error_view() {
        let (_, ui, router) = setup();
        router.add_route("/broken", |_req: Request| async {
            Err::<View, _>(AppError::connectivity("GET", "/events", "HTTP 500"))
        }, false, None);

        let res = router.navigate("/broken").await;
        assert_eq!(res.outcome, Outcome::Failed("GET /events failed: HTTP 500".into()));
        assert_eq!(ui.title().as_deref(), Some("Error"));
        assert!(ui.html().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn handler_panics_are_contained() {
        let (_, ui, router) = setup();
        router.add_route("/panics", |_req: Request| async {
            if true {
                panic!("boom");
            }
            Ok::<_, AppError>(View::new("never", ""))
        }, false, None);

        let res = router.navigate("/panics").await;
        assert!(matches!(res.outcome, Outcome::Failed(_)));
        assert_eq!(ui.title().as_deref(), Some("Error"));
    }

    #[tokio::test]
    async fn back_and_forward_re_resolve() {
        let (_, ui, router) = setup();
        router.navigate("/events/1").await;
        router.navigate("/events/2").await;

        let res = router.back().await.unwrap();
        assert_eq!(res.path, "/events/1");
        assert_eq!(ui.html(), "event 1");

        let res = router.forward().await.unwrap();
        assert_eq!(res.path, "/events/2");
        assert!(router.forward().await.is_none());
    }

    #[tokio::test]
    async fn login_behind_a_guard_does_not_loop() {
        let ui = Arc::new(Ui::new());
        let router = Router::new(Arc::new(FakeIdentity::default()), ui.clone());
        router.add_route("/login", page("login"), true, None);

        let res = router.navigate("/login").await;
        assert!(matches!(res.outcome, Outcome::Failed(_)));
    }
}
