//! Query planning and projection for the public blog pages.
//!
//! Each page context is assembled with a bounded number of queries: one for
//! the page of posts (aggregates included), one for all their authors, one
//! for all their tags. The detail page adds one comments query and reuses
//! the same batched author lookup for comment authors. No operation issues
//! a query per row.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::application::repos::{
    AuthorsRepo, CommentsRepo, PostTag, PostsRepo, RepoError, TagsRepo,
};
use crate::domain::entities::{CommentRecord, PostRecord, TagRecord};
use crate::presentation::views::{
    CommentProjection, HomeContext, PostDetail, PostDetailContext, PostSummary, TagPageContext,
    TagProjection,
};

pub const POPULAR_POSTS_LIMIT: u32 = 5;
pub const FRESH_POSTS_LIMIT: u32 = 5;
pub const POPULAR_TAGS_LIMIT: u32 = 5;
pub const TAG_PAGE_POSTS_LIMIT: u32 = 20;

/// Teaser length in characters, not bytes.
pub const TEASER_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("no post matches the requested slug")]
    PostNotFound,
    #[error("no tag matches the requested title")]
    TagNotFound,
    #[error("failed to format a publication timestamp")]
    Format(#[from] time::error::Format),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostsRepo>,
    tags: Arc<dyn TagsRepo>,
    comments: Arc<dyn CommentsRepo>,
    authors: Arc<dyn AuthorsRepo>,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        tags: Arc<dyn TagsRepo>,
        comments: Arc<dyn CommentsRepo>,
        authors: Arc<dyn AuthorsRepo>,
    ) -> Self {
        Self {
            posts,
            tags,
            comments,
            authors,
        }
    }

    pub async fn home_context(&self) -> Result<HomeContext, BlogError> {
        let most_popular_posts = self
            .post_summaries(self.posts.list_popular(POPULAR_POSTS_LIMIT).await?)
            .await?;
        let page_posts = self
            .post_summaries(self.posts.list_fresh(FRESH_POSTS_LIMIT).await?)
            .await?;
        let popular_tags = self.popular_tags().await?;

        Ok(HomeContext {
            most_popular_posts,
            page_posts,
            popular_tags,
        })
    }

    pub async fn post_page(&self, slug: &str) -> Result<PostDetailContext, BlogError> {
        let Some(record) = self.posts.find_by_slug(slug).await? else {
            return Err(BlogError::PostNotFound);
        };

        let tags = self.tags.list_for_posts(&[record.id]).await?;
        let comments = self.comments.list_for_post(record.id).await?;

        let mut author_ids = vec![record.author_id];
        author_ids.extend(comments.iter().map(|comment| comment.author_id));
        let usernames = self.usernames_for(&author_ids).await?;

        let author = lookup_username(&usernames, record.author_id)?;
        let comments = comments
            .into_iter()
            .map(|comment| {
                let author = lookup_username(&usernames, comment.author_id)?;
                project_comment(comment, author)
            })
            .collect::<Result<Vec<_>, BlogError>>()?;

        let post = project_detail(
            record,
            author,
            tags.into_iter().map(|entry| project_tag(entry.tag)).collect(),
            comments,
        )?;

        let popular_tags = self.popular_tags().await?;
        let most_popular_posts = self
            .post_summaries(self.posts.list_popular(POPULAR_POSTS_LIMIT).await?)
            .await?;

        Ok(PostDetailContext {
            post,
            popular_tags,
            most_popular_posts,
        })
    }

    pub async fn tag_page(&self, title: &str) -> Result<TagPageContext, BlogError> {
        // The tag lookup runs first so an unknown title fails before any
        // post query executes.
        let Some(tag) = self.tags.find_by_title(title).await? else {
            return Err(BlogError::TagNotFound);
        };

        let posts = self
            .post_summaries(self.posts.list_for_tag(tag.id, TAG_PAGE_POSTS_LIMIT).await?)
            .await?;
        let popular_tags = self.popular_tags().await?;
        let most_popular_posts = self
            .post_summaries(self.posts.list_popular(POPULAR_POSTS_LIMIT).await?)
            .await?;

        Ok(TagPageContext {
            tag: tag.title,
            popular_tags,
            posts,
            most_popular_posts,
        })
    }

    async fn popular_tags(&self) -> Result<Vec<TagProjection>, BlogError> {
        let tags = self.tags.list_popular(POPULAR_TAGS_LIMIT).await?;
        Ok(tags.into_iter().map(project_tag).collect())
    }

    /// Projects a page of post records, resolving all authors with one
    /// query and all tags with another regardless of page size.
    async fn post_summaries(
        &self,
        records: Vec<PostRecord>,
    ) -> Result<Vec<PostSummary>, BlogError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = records.iter().map(|record| record.id).collect();
        let author_ids: Vec<Uuid> = records.iter().map(|record| record.author_id).collect();

        let usernames = self.usernames_for(&author_ids).await?;
        let mut tags_by_post = group_tags(self.tags.list_for_posts(&post_ids).await?);

        records
            .into_iter()
            .map(|record| {
                let author = lookup_username(&usernames, record.author_id)?;
                let tags = tags_by_post.remove(&record.id).unwrap_or_default();
                project_summary(record, author, tags)
            })
            .collect()
    }

    async fn usernames_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, BlogError> {
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let authors = self.authors.list_by_ids(&unique).await?;
        Ok(authors
            .into_iter()
            .map(|author| (author.id, author.username))
            .collect())
    }
}

fn lookup_username(usernames: &HashMap<Uuid, String>, id: Uuid) -> Result<String, BlogError> {
    usernames
        .get(&id)
        .cloned()
        .ok_or_else(|| BlogError::Repo(RepoError::integrity(format!("author `{id}` is missing"))))
}

fn group_tags(entries: Vec<PostTag>) -> HashMap<Uuid, Vec<TagProjection>> {
    let mut grouped: HashMap<Uuid, Vec<TagProjection>> = HashMap::new();
    for entry in entries {
        grouped
            .entry(entry.post_id)
            .or_default()
            .push(project_tag(entry.tag));
    }
    grouped
}

/// First 200 characters of the body; the whole body when it is shorter.
pub fn teaser(text: &str) -> &str {
    match text.char_indices().nth(TEASER_CHARS) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn first_tag_title(tags: &[TagProjection]) -> String {
    tags.first()
        .map(|tag| tag.title.clone())
        .unwrap_or_default()
}

fn format_published(at: OffsetDateTime) -> Result<String, BlogError> {
    Ok(at.format(&Rfc3339)?)
}

fn project_tag(record: TagRecord) -> TagProjection {
    TagProjection {
        title: record.title,
        posts_with_tag: record.posts_count,
    }
}

fn project_summary(
    record: PostRecord,
    author: String,
    tags: Vec<TagProjection>,
) -> Result<PostSummary, BlogError> {
    Ok(PostSummary {
        teaser_text: teaser(&record.body).to_string(),
        first_tag_title: first_tag_title(&tags),
        published: format_published(record.published_at)?,
        title: record.title,
        author,
        comments_amount: record.comments_count,
        image_url: record.image_url,
        published_at: record.published_at,
        slug: record.slug,
        tags,
    })
}

fn project_comment(record: CommentRecord, author: String) -> Result<CommentProjection, BlogError> {
    Ok(CommentProjection {
        published: format_published(record.published_at)?,
        text: record.text,
        published_at: record.published_at,
        author,
    })
}

fn project_detail(
    record: PostRecord,
    author: String,
    tags: Vec<TagProjection>,
    comments: Vec<CommentProjection>,
) -> Result<PostDetail, BlogError> {
    Ok(PostDetail {
        published: format_published(record.published_at)?,
        title: record.title,
        text: record.body,
        author,
        comments,
        likes_amount: record.likes_count,
        image_url: record.image_url,
        published_at: record.published_at,
        slug: record.slug,
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teaser_keeps_short_bodies_whole() {
        assert_eq!(teaser("short body"), "short body");

        let exact: String = "a".repeat(TEASER_CHARS);
        assert_eq!(teaser(&exact), exact);
    }

    #[test]
    fn teaser_cuts_long_bodies_at_two_hundred_characters() {
        let body: String = "b".repeat(250);
        let cut = teaser(&body);
        assert_eq!(cut.chars().count(), TEASER_CHARS);
        assert_eq!(cut, &body[..TEASER_CHARS]);
    }

    #[test]
    fn teaser_counts_characters_not_bytes() {
        let body: String = "é".repeat(201);
        let cut = teaser(&body);
        assert_eq!(cut.chars().count(), TEASER_CHARS);
        assert!(body.starts_with(cut));
    }

    #[test]
    fn format_published_renders_rfc3339() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(format_published(at).unwrap(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn format_failures_surface_as_blog_errors() {
        let err = BlogError::from(time::error::Format::InvalidComponent("offset_second"));
        assert!(matches!(err, BlogError::Format(_)));
    }

    #[test]
    fn first_tag_title_is_empty_without_tags() {
        assert_eq!(first_tag_title(&[]), "");
    }

    #[test]
    fn first_tag_title_takes_the_leading_tag() {
        let tags = vec![
            TagProjection {
                title: "rust".to_string(),
                posts_with_tag: 3,
            },
            TagProjection {
                title: "web".to_string(),
                posts_with_tag: 1,
            },
        ];
        assert_eq!(first_tag_title(&tags), "rust");
    }
}
