use std::env;

pub struct Config {
    pub api_base_url: String,
    pub host: String,
    pub port: u16,
    pub data_file: String,
    pub session_file: Option<String>,
    pub session_ttl_hours: i64,
    pub login_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            data_file: env::var("DATA_FILE").unwrap_or_else(|_| "./db.json".to_string()),
            session_file: env::var("SESSION_FILE").ok(),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .filter(|h| *h > 0)
                .unwrap_or(24),
            login_path: env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string()),
        }
    }

    /// Configuration pointing the client at an already running store.
    pub fn for_api(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            data_file: "./db.json".to_string(),
            session_file: None,
            session_ttl_hours: 24,
            login_path: "/login".to_string(),
        }
    }
}
