use axum::extract::{FromRequest, FromRequestParts, Multipart, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::auth::session;
use crate::error::AppError;
use crate::intake::{self, UploadedImage, IMAGE_FIELD};
use crate::routes::feed::NewPostRequest;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub token: String,
}

/// Extractor that requires a valid bearer session.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        session::find_user(&state.db, token)?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".into()))
    }
}

/// Optional user extractor. `None` when no `Authorization` header is sent; a
/// header carrying a bad token is still rejected with 401.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(MaybeUser(None));
        }
        CurrentUser::from_request_parts(parts, state)
            .await
            .map(|user| MaybeUser(Some(user)))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// `Json` whose rejection renders through the error envelope.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Create-post input from either a multipart form or a JSON body.
///
/// Multipart uploads pass through the intake MIME filter here; rejected types
/// are dropped and the request continues without an image. Nothing is written
/// to disk until the handler has validated the text fields.
pub struct PostForm {
    pub input: NewPostRequest,
    pub image: Option<UploadedImage>,
}

impl FromRequest<AppState> for PostForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("multipart/form-data"));

        if !is_multipart {
            let JsonBody(input) = JsonBody::<NewPostRequest>::from_request(req, state).await?;
            return Ok(PostForm { input, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        let mut input = NewPostRequest::default();
        let mut image = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "title" => {
                    input.title = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                }
                "content" => {
                    input.content = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                }
                IMAGE_FIELD => {
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;

                    if !intake::accepts(&content_type) {
                        tracing::debug!("Dropping upload {:?} of type {:?}", file_name, content_type);
                        continue;
                    }
                    if image.is_some() {
                        return Err(AppError::BadRequest(
                            "Only one image may be attached to a post".into(),
                        ));
                    }
                    image = Some(UploadedImage {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                other => tracing::debug!("Ignoring multipart field {:?}", other),
            }
        }

        Ok(PostForm { input, image })
    }
}
