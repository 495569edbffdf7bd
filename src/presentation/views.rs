use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::error::{ErrorReport, HttpError};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response() -> Response {
    let view = ErrorPageView::not_found();
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Display-ready tag: title plus its query-time post count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagProjection {
    pub title: String,
    pub posts_with_tag: i64,
}

/// Display-ready post for list pages: teaser instead of the full body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub title: String,
    pub teaser_text: String,
    pub author: String,
    pub comments_amount: i64,
    pub image_url: Option<String>,
    pub published_at: OffsetDateTime,
    pub published: String,
    pub slug: String,
    pub tags: Vec<TagProjection>,
    pub first_tag_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentProjection {
    pub text: String,
    pub published_at: OffsetDateTime,
    pub published: String,
    pub author: String,
}

/// Display-ready post for the detail page: full body and comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub title: String,
    pub text: String,
    pub author: String,
    pub comments: Vec<CommentProjection>,
    pub likes_amount: i64,
    pub image_url: Option<String>,
    pub published_at: OffsetDateTime,
    pub published: String,
    pub slug: String,
    pub tags: Vec<TagProjection>,
}

pub struct HomeContext {
    pub most_popular_posts: Vec<PostSummary>,
    pub page_posts: Vec<PostSummary>,
    pub popular_tags: Vec<TagProjection>,
}

#[derive(Debug)]
pub struct PostDetailContext {
    pub post: PostDetail,
    pub popular_tags: Vec<TagProjection>,
    pub most_popular_posts: Vec<PostSummary>,
}

#[derive(Debug)]
pub struct TagPageContext {
    pub tag: String,
    pub popular_tags: Vec<TagProjection>,
    pub posts: Vec<PostSummary>,
    pub most_popular_posts: Vec<PostSummary>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: HomeContext,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: PostDetailContext,
}

#[derive(Template)]
#[template(path = "tag.html")]
pub struct TagTemplate {
    pub view: TagPageContext,
}

#[derive(Template)]
#[template(path = "contacts.html")]
pub struct ContactsTemplate;

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try returning to the homepage."
                .to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: ErrorPageView,
}
