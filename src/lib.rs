pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod pages;
pub mod router;
pub mod session;
pub mod store;
pub mod ui;
