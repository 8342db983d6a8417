use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use model::entities::user;
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::{found, login_redirect, Caller};
use crate::flash;
use crate::schemas::{AppState, ErrorResponse};
use crate::subscribers::UserEvent;

/// Notice enqueued after a successful profile update.
pub const UPDATE_SUCCESS_NOTICE: &str = "Information successfully updated";

/// Canonical profile page path for a username. Both the update success
/// redirect and the post-login redirect resolve through here.
pub fn profile_path(username: &str) -> String {
    format!("/users/{username}/")
}

/// Request body for updating the caller's own profile
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    /// New username (must be unique)
    #[validate(
        length(min = 1, max = 150, message = "must be between 1 and 150 characters"),
        custom(function = validate_username_chars)
    )]
    pub username: String,
}

/// The profile submission form: current field values plus any
/// field-level validation errors from the last submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileForm {
    pub username: String,
    pub errors: HashMap<String, Vec<String>>,
}

/// Profile representation returned by the detail endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: i32,
    pub username: String,
    pub date_joined: chrono::NaiveDateTime,
    /// Pending notices for the caller, drained on render
    pub notices: Vec<String>,
}

fn validate_username_chars(username: &str) -> Result<(), ValidationError> {
    let ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username")
            .with_message("may only contain letters, digits and @/./+/-/_".into()))
    }
}

/// Flatten validator output into a field → messages map for form re-render.
fn form_errors(errors: &ValidationErrors) -> HashMap<String, Vec<String>> {
    errors
        .field_errors()
        .iter()
        .map(|(field, field_errors)| {
            let messages = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .clone()
                        .map(|m| m.into_owned())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn is_unique_violation(db_error: &DbErr) -> bool {
    let message = match db_error {
        DbErr::Exec(e) => e.to_string(),
        DbErr::Query(e) => e.to_string(),
        _ => return false,
    };
    let message = message.to_lowercase();
    message.contains("unique") || message.contains("constraint")
}

/// Render the profile-update form for the caller's own account
#[utoipa::path(
    get,
    path = "/users/~update/",
    tag = "profile",
    responses(
        (status = 200, description = "The caller's editable profile fields", body = ProfileForm),
        (status = 302, description = "Unauthenticated; redirected to the login prompt")
    )
)]
#[instrument]
pub async fn profile_update_form(caller: Caller) -> Json<ProfileForm> {
    // The edited object is always the caller's own record.
    Json(ProfileForm {
        username: caller.username,
        errors: HashMap::new(),
    })
}

/// Update the caller's own profile
#[utoipa::path(
    post,
    path = "/users/~update/",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 302, description = "Profile updated; redirected to the caller's profile page"),
        (status = 200, description = "Invalid submission; form re-rendered with errors", body = ProfileForm),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument]
pub async fn update_profile(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<UpdateProfileRequest>,
) -> Response {
    if let Err(errors) = request.validate() {
        debug!("invalid profile submission from user {}", caller.id);
        let form = ProfileForm {
            username: request.username,
            errors: form_errors(&errors),
        };
        return (StatusCode::OK, Json(form)).into_response();
    }

    // Operate only on the caller's own record, never a supplied target.
    let existing = match user::Entity::find_by_id(caller.id).one(&state.db).await {
        Ok(Some(user_model)) => user_model,
        Ok(None) => {
            warn!("caller {} no longer exists", caller.id);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(db_error) => {
            error!("failed to load user {}: {}", caller.id, db_error);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut user_active: user::ActiveModel = existing.into();
    user_active.username = Set(request.username.clone());

    match user_active.update(&state.db).await {
        Ok(updated) => {
            info!("user {} updated username to '{}'", updated.id, updated.username);
            flash::push(&state.notices, &caller.token, UPDATE_SUCCESS_NOTICE).await;
            state.subscribers.notify(&UserEvent::Updated {
                id: updated.id,
                username: updated.username.clone(),
            });
            found(&profile_path(&updated.username))
        }
        Err(db_error) if is_unique_violation(&db_error) => {
            debug!("username '{}' already taken", request.username);
            let mut errors = HashMap::new();
            errors.insert(
                "username".to_string(),
                vec![format!("Username '{}' already exists", request.username)],
            );
            let form = ProfileForm {
                username: request.username,
                errors,
            };
            (StatusCode::OK, Json(form)).into_response()
        }
        Err(db_error) => {
            error!("failed to update user {}: {}", caller.id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Redirect the caller to their own profile page
#[utoipa::path(
    get,
    path = "/users/~redirect/",
    tag = "profile",
    responses(
        (status = 302, description = "Redirected to the caller's profile page")
    )
)]
#[instrument]
pub async fn user_redirect(caller: Caller) -> Response {
    found(&profile_path(&caller.username))
}

/// View a user's profile by username
#[utoipa::path(
    get,
    path = "/users/{username}/",
    tag = "profile",
    params(
        ("username" = String, Path, description = "Unique username"),
    ),
    responses(
        (status = 200, description = "Profile found", body = ProfileResponse),
        (status = 302, description = "Unauthenticated; redirected to the login prompt"),
        (status = 404, description = "No user with that username", body = ErrorResponse),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument]
pub async fn user_detail(
    State(state): State<AppState>,
    uri: Uri,
    caller: Option<Caller>,
    Path(username): Path<String>,
) -> Response {
    // Unauthenticated callers never hit the lookup; they are sent to
    // the login prompt with the requested path preserved.
    let caller = match caller {
        Some(caller) => caller,
        None => return login_redirect(&state.config.login_url, uri.path()),
    };

    match user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await
    {
        Ok(Some(user_model)) => {
            let notices = flash::drain(&state.notices, &caller.token).await;
            Json(ProfileResponse {
                id: user_model.id,
                username: user_model.username,
                date_joined: user_model.date_joined,
                notices,
            })
            .into_response()
        }
        Ok(None) => {
            debug!("no user with username '{}'", username);
            let body = ErrorResponse {
                error: format!("No user with username '{}'", username),
                code: "USER_NOT_FOUND".to_string(),
                success: false,
            };
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Err(db_error) => {
            error!("failed to look up username '{}': {}", username, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
