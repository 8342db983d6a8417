use std::sync::Arc;

use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::auth::Session;
use crate::config::AppConfig;
use crate::subscribers::SubscriberRegistry;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Resolved application configuration
    pub config: AppConfig,
    /// Session store, keyed by session token
    pub sessions: Cache<String, Session>,
    /// Pending flash notices, keyed by session token
    pub notices: Cache<String, Vec<String>>,
    /// Event subscribers loaded at startup
    pub subscribers: Arc<SubscriberRegistry>,
}

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::profile::profile_update_form,
        crate::handlers::profile::update_profile,
        crate::handlers::profile::user_redirect,
        crate::handlers::profile::user_detail,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            crate::handlers::profile::UpdateProfileRequest,
            crate::handlers::profile::ProfileForm,
            crate::handlers::profile::ProfileResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "profile", description = "User profile endpoints"),
    ),
    info(
        title = "UserHub API",
        description = "User management service - profile viewing and self-service profile updates",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
