//! HTTP request handlers

pub mod admin;
pub mod auth;
pub mod health;
pub mod posts;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Plain confirmation body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
