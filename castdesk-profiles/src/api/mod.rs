//! HTTP API handlers for castdesk-profiles

pub mod error;
pub mod health;
pub mod profiles;
pub mod questionnaire;

pub use error::ApiError;
pub use health::health_routes;
pub use profiles::{create_profile, get_profile, update_profile};
pub use questionnaire::{get_questionnaire, save_questionnaire};
