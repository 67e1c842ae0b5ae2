pub mod admin;
pub mod auth;
pub mod health;
pub mod invoices;

pub use health::{health_check, metrics};
