//! # Castdesk Common Library
//!
//! Shared code for Castdesk services including:
//! - Profile record models and the questionnaire document
//! - Database initialization and the profile store
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{FieldValue, FlatField, ProfileRecord, QuestionnaireDocument};
