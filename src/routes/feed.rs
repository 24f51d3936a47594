use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{Creator, Post};
use crate::error::AppResult;
use crate::extractors::{MaybeUser, PostForm};
use crate::state::AppState;
use crate::store::NewPost;

/// Text fields of a new post. Missing fields deserialize as empty strings so
/// they are reported by validation rather than as a malformed body.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct NewPostRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title must not be empty."))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 5, message = "Content must be at least 5 characters."))]
    pub content: String,
}

impl NewPostRequest {
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostList {
    pub posts: Vec<Post>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPost {
    pub message: &'static str,
    pub post: Post,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/post", post(create_post))
}

/// GET /feed/posts
pub async fn list_posts(State(state): State<AppState>) -> AppResult<Json<PostList>> {
    let posts = state.posts.list_posts().await?;
    Ok(Json(PostList { posts }))
}

/// POST /feed/post
pub async fn create_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    form: PostForm,
) -> AppResult<(StatusCode, Json<CreatedPost>)> {
    let PostForm { input, image } = form;
    let input = input.trimmed();
    input.validate()?;

    let saved = match image {
        Some(image) => Some(state.intake.save(image).await?),
        None => None,
    };
    let image_url = match &saved {
        Some(saved) => Some(saved.url.clone()),
        None => state.config.feed.placeholder_image.clone(),
    };
    let creator = Creator {
        name: user
            .map(|u| u.name)
            .unwrap_or_else(|| state.config.feed.default_creator.clone()),
    };

    let created = state
        .posts
        .create_post(NewPost {
            title: input.title,
            content: input.content,
            image_url,
            creator,
        })
        .await;
    let post = match created {
        Ok(post) => post,
        Err(e) => {
            if let Some(saved) = &saved {
                state.intake.discard(saved).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!("Created post {}", post.id);
    Ok((
        StatusCode::CREATED,
        Json(CreatedPost {
            message: "Post created successfully",
            post,
        }),
    ))
}
