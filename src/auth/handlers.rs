use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rusqlite::{params, ErrorCode, OptionalExtension};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::session;
use crate::db::models::User;
use crate::error::{AppError, AppResult, FieldError};
use crate::extractors::{CurrentUser, JsonBody};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// -- Request / response types --

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Name must not be empty."))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 5, message = "Password must be at least 5 characters."))]
    pub password: String,
}

impl SignupRequest {
    fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            name: self.name.trim().to_string(),
            password: self.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: &'static str,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
}

// -- Handlers --

/// PUT /auth/signup: create a user with a bcrypt password hash
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let req = req.normalized();
    req.validate()?;

    if find_by_email(&state, &req.email)?.is_some() {
        return Err(email_taken());
    }

    let cost = state.config.auth.bcrypt_cost;
    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Unhandled(e.to_string()))??;

    let user_id = uuid::Uuid::now_v7().to_string();
    {
        let conn = state.db.get()?;
        // A concurrent signup can win between the lookup and this insert
        conn.execute(
            "INSERT INTO users (id, email, name, password_hash) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, req.email, req.name, password_hash],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                email_taken()
            }
            other => other.into(),
        })?;
    }

    tracing::info!("Created user {}", user_id);
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created!",
            user_id,
        }),
    ))
}

/// POST /auth/login: exchange credentials for a bearer session token
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = req.email.trim().to_lowercase();
    let user = find_by_email(&state, &email)?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    let password = req.password;
    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Unhandled(e.to_string()))??;
    if !matches {
        tracing::debug!("Rejected login for {}", user.email);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;
    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
    }))
}

/// POST /auth/logout: drop the presented session
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> AppResult<StatusCode> {
    session::delete_session(&state.db, &user.token)?;
    Ok(StatusCode::NO_CONTENT)
}

fn email_taken() -> AppError {
    AppError::Validation(vec![FieldError::new(
        "email",
        "E-Mail address already exists!",
    )])
}

fn find_by_email(state: &AppState, email: &str) -> AppResult<Option<User>> {
    let conn = state.db.get()?;
    let user = conn
        .query_row(
            "SELECT id, email, name, password_hash FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    password_hash: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}
