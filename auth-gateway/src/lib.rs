//! Auth Gateway Library
//!
//! HTTP gateway that delegates signup/login/refresh to AWS Cognito,
//! persists a local user record, and hands provider tokens back to the
//! browser as HttpOnly cookies.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod security;
pub mod services;

pub use error::{AppError, Result};

use crate::config::Config;
use crate::db::UserStore;
use crate::services::identity::IdentityProvider;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Config,
}
