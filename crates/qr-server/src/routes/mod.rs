//! HTTP route handlers.

mod ask;
mod health;

pub use ask::{ask_handler, AskRequest};
pub use health::{health, HealthResponse};
