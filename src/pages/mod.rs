//! Per-page render functions. Each takes already-fetched data and returns a
//! [`View`](crate::ui::View); none of them perform I/O.

pub mod account;
pub mod admin;
pub mod auth;
pub mod events;
pub mod status;
