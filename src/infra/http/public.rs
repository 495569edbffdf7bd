use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::{
        blog::{BlogError, BlogService},
        error::HttpError,
    },
    infra::db::PostgresRepositories,
    presentation::views::{
        ContactsTemplate, IndexTemplate, PostTemplate, TagTemplate, render_not_found_response,
        render_template_response,
    },
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub blog: Arc<BlogService>,
    pub db: Arc<PostgresRepositories>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/posts/{slug}", get(post_detail))
        .route("/tags/{title}", get(tag_filter))
        .route("/contacts", get(contacts))
        .route("/_health/db", get(db_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>) -> Response {
    match state.blog.home_context().await {
        Ok(content) => render_template_response(IndexTemplate { view: content }, StatusCode::OK),
        Err(err) => blog_error_to_response(err),
    }
}

async fn post_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.blog.post_page(&slug).await {
        Ok(content) => render_template_response(PostTemplate { view: content }, StatusCode::OK),
        Err(err) => blog_error_to_response(err),
    }
}

async fn tag_filter(State(state): State<HttpState>, Path(title): Path<String>) -> Response {
    match state.blog.tag_page(&title).await {
        Ok(content) => render_template_response(TagTemplate { view: content }, StatusCode::OK),
        Err(err) => blog_error_to_response(err),
    }
}

async fn contacts() -> Response {
    render_template_response(ContactsTemplate, StatusCode::OK)
}

async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn fallback() -> Response {
    render_not_found_response()
}

fn blog_error_to_response(err: BlogError) -> Response {
    match err {
        BlogError::PostNotFound | BlogError::TagNotFound => render_not_found_response(),
        other => HttpError::from(other).into_response(),
    }
}
