use std::collections::HashMap;

use crate::api::ApiClient;
use crate::error::AppError;
use crate::models::UserRole;
use crate::pages;
use crate::router::{Request, Router, WILDCARD};
use crate::ui::View;

const RECENT_EVENTS: usize = 5;

/// Installs the application's route table. Specific paths come before
/// generic ones since the first match wins.
pub fn install(router: &Router, api: &ApiClient) {
    let admin = Some(UserRole::Admin);

    let a = api.clone();
    router.add_route("/", move |req| home(a.clone(), req), false, None);
    let a = api.clone();
    router.add_route("/events/:id", move |req| event_detail(a.clone(), req), false, None);
    router.add_route("/login", |_req| async { Ok::<_, AppError>(pages::auth::login()) }, false, None);
    router.add_route("/register", |_req| async { Ok::<_, AppError>(pages::auth::register()) }, false, None);

    let a = api.clone();
    router.add_route("/profile", move |req| profile(a.clone(), req), true, None);
    let a = api.clone();
    router.add_route("/my-events", move |req| my_events(a.clone(), req), true, None);
    let a = api.clone();
    router.add_route("/enrollment", move |req| enrollment(a.clone(), req), true, None);

    let a = api.clone();
    router.add_route("/admin/events", move |_req| admin_events(a.clone()), true, admin);
    let a = api.clone();
    router.add_route("/admin/users", move |req| admin_users(a.clone(), req), true, admin);
    let a = api.clone();
    router.add_route("/admin", move |_req| admin_dashboard(a.clone()), true, admin);

    router.add_route(WILDCARD, |req: Request| async move {
        Ok::<_, AppError>(pages::status::not_found(&req.path))
    }, false, None);
}

async fn home(api: ApiClient, req: Request) -> Result<View, AppError> {
    let query = req.query("q").unwrap_or_default().to_string();
    let category = req.query("category").unwrap_or_default().to_string();

    let mut active = api.get_active_events().await?;
    let categories = pages::events::categories(&active);

    let events = if query.is_empty() && category.is_empty() {
        active.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.time.cmp(&b.time)));
        active
    } else {
        api.search_events(&query, Some(&category)).await?
    };

    Ok(pages::events::home(&events, &categories, &query, &category))
}

async fn event_detail(api: ApiClient, req: Request) -> Result<View, AppError> {
    let id = req.param_id("id")?;
    let event = api.get_event(id).await?;
    let registration = match &req.user {
        Some(user) => api.find_registration(user.id, id).await?,
        None => None,
    };
    Ok(pages::events::event_detail(&event, req.user.as_ref(), registration.as_ref()))
}

async fn profile(api: ApiClient, req: Request) -> Result<View, AppError> {
    let user = req.require_user()?;
    let registrations = api.get_user_registrations(user.id).await?;
    Ok(pages::account::profile(user, registrations.len()))
}

async fn my_events(api: ApiClient, req: Request) -> Result<View, AppError> {
    let user = req.require_user()?;
    let entries = api.get_user_events(user.id).await?;
    Ok(pages::account::my_events(&entries))
}

async fn enrollment(api: ApiClient, req: Request) -> Result<View, AppError> {
    let user = req.require_user()?;
    let mut events = api.get_active_events().await?;
    events.sort_by(|a, b| a.date.cmp(&b.date));

    let registered: HashMap<_, _> = api
        .get_user_registrations(user.id)
        .await?
        .into_iter()
        .map(|r| (r.event_id, r.id))
        .collect();

    Ok(pages::account::enrollment(&events, &registered))
}

async fn admin_dashboard(api: ApiClient) -> Result<View, AppError> {
    let stats = api.dashboard_stats().await?;
    let mut recent = api.get_events().await?;
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(RECENT_EVENTS);
    Ok(pages::admin::dashboard(&stats, &recent))
}

async fn admin_events(api: ApiClient) -> Result<View, AppError> {
    let mut events = api.get_events().await?;
    events.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(pages::admin::events(&events))
}

async fn admin_users(api: ApiClient, req: Request) -> Result<View, AppError> {
    let admin = req.require_user()?;
    let users = api.get_users().await?;
    Ok(pages::admin::users(&users, admin.id))
}
