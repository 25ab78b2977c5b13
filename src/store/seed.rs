use std::collections::HashMap;

use chrono::Utc;
use serde_json::{Value, json};

use super::db::Db;
use super::error::StoreError;
use crate::auth::password;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

fn hash(plain: &str) -> Result<String, StoreError> {
    password::hash_password(plain).map_err(|e| StoreError::Internal(e.to_string()))
}

/// A user record ready for insertion; the store assigns the id.
pub fn user_record(
    username: &str,
    email: &str,
    plain_password: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> Result<Value, StoreError> {
    Ok(json!({
        "username": username,
        "email": email,
        "password": hash(plain_password)?,
        "firstName": first_name,
        "lastName": last_name,
        "role": role,
        "createdAt": Utc::now(),
    }))
}

/// Fails when a stored user already has `username` or `email`, compared
/// without regard to case.
pub async fn ensure_user_available(db: &Db, username: &str, email: &str) -> Result<(), StoreError> {
    let email = email.trim();
    for user in db.list("users", &HashMap::new()).await? {
        let field = |name: &str| user[name].as_str().unwrap_or_default().to_string();
        if field("username").eq_ignore_ascii_case(username) {
            return Err(StoreError::InvalidRecord(format!(
                "username {username} is already taken"
            )));
        }
        if field("email").eq_ignore_ascii_case(email) {
            return Err(StoreError::InvalidRecord(format!(
                "email {email} is already registered"
            )));
        }
    }
    Ok(())
}

/// Stores a new admin account with a lowercased email.
pub async fn insert_admin(
    db: &Db,
    username: &str,
    email: &str,
    plain_password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<Value, StoreError> {
    ensure_user_available(db, username, email).await?;
    let email = email.trim().to_lowercase();
    let record = user_record(username, &email, plain_password, first_name, last_name, "admin")?;
    db.insert("users", record).await
}

/// The initial document: one admin, one regular user and a few events.
pub fn document() -> Result<Value, StoreError> {
    let now = Utc::now();

    let mut admin = user_record(
        DEFAULT_ADMIN_USERNAME,
        "admin@eventhub.local",
        DEFAULT_ADMIN_PASSWORD,
        "Admin",
        "User",
        "admin",
    )?;
    admin["id"] = json!(1);

    let mut demo = user_record("demo", "demo@eventhub.local", "demo123", "Demo", "User", "user")?;
    demo["id"] = json!(2);

    Ok(json!({
        "users": [admin, demo],
        "events": [
            {
                "id": 1,
                "title": "Rust Helsinki Meetup",
                "description": "Lightning talks on async Rust and embedded work.",
                "date": "2027-02-11",
                "time": "18:00",
                "location": "Helsinki",
                "category": "technology",
                "capacity": 60,
                "price": 0.0,
                "registeredCount": 0,
                "status": "active",
                "organizer": "Rust Helsinki",
                "createdAt": now,
            },
            {
                "id": 2,
                "title": "Jazz by the Harbour",
                "description": "An evening of live jazz on the waterfront.",
                "date": "2027-06-19",
                "time": "20:30",
                "location": "Turku",
                "category": "music",
                "capacity": 120,
                "price": 25.0,
                "registeredCount": 0,
                "status": "active",
                "organizer": "Harbour Arts",
                "createdAt": now,
            },
            {
                "id": 3,
                "title": "Woodworking Workshop",
                "description": "Hands-on introduction to hand tools. Small group.",
                "date": "2027-03-06",
                "time": "10:00",
                "location": "Tampere",
                "category": "workshop",
                "capacity": 8,
                "price": 45.0,
                "registeredCount": 0,
                "status": "active",
                "organizer": "Makers Tampere",
                "createdAt": now,
            }
        ],
        "registrations": [],
    }))
}
