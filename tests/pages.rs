use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use brezza::application::blog::{BlogError, BlogService};
use brezza::application::repos::{
    AuthorsRepo, CommentsRepo, PostTag, PostsRepo, RepoError, TagsRepo,
};
use brezza::domain::entities::{AuthorRecord, CommentRecord, PostRecord, TagRecord};
use brezza::infra::db::PostgresRepositories;
use brezza::infra::http::{HttpState, build_router};

#[derive(Default)]
struct FakeStore {
    posts: Vec<PostRecord>,
    tags: Vec<TagRecord>,
    post_tags: Vec<(Uuid, Uuid)>,
    comments: Vec<CommentRecord>,
    authors: Vec<AuthorRecord>,
}

impl FakeStore {
    fn add_author(&mut self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.authors.push(AuthorRecord {
            id,
            username: username.to_string(),
        });
        id
    }

    fn add_post(&mut self, slug: &str, author_id: Uuid, likes: i64, minute: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.posts.push(PostRecord {
            id,
            slug: slug.to_string(),
            title: format!("Title of {slug}"),
            body: format!("Body of {slug}"),
            image_url: None,
            published_at: at_minute(minute),
            author_id,
            comments_count: 0,
            likes_count: likes,
        });
        id
    }

    fn add_tag(&mut self, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tags.push(TagRecord {
            id,
            title: title.to_string(),
            posts_count: 0,
        });
        id
    }

    fn attach_tag(&mut self, post_id: Uuid, tag_id: Uuid) {
        self.post_tags.push((post_id, tag_id));
    }

    fn add_comment(&mut self, post_id: Uuid, author_id: Uuid, text: &str, minute: i64) {
        self.comments.push(CommentRecord {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            text: text.to_string(),
            published_at: at_minute(minute),
        });
    }

    fn tag_posts_count(&self, tag_id: Uuid) -> i64 {
        self.post_tags
            .iter()
            .filter(|(_, tag)| *tag == tag_id)
            .count() as i64
    }

    fn annotated_tag(&self, tag: &TagRecord) -> TagRecord {
        TagRecord {
            id: tag.id,
            title: tag.title.clone(),
            posts_count: self.tag_posts_count(tag.id),
        }
    }
}

fn at_minute(minute: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000 + minute * 60).unwrap()
}

/// In-memory repository that reproduces the store-level ordering and limit
/// semantics, counting queries so tests can assert batching behaviour.
#[derive(Default)]
struct FakeRepos {
    store: FakeStore,
    post_queries: AtomicUsize,
    tags_for_posts_queries: AtomicUsize,
    author_batches: AtomicUsize,
}

impl FakeRepos {
    fn new(store: FakeStore) -> Self {
        Self {
            store,
            ..Default::default()
        }
    }

    fn post_queries(&self) -> usize {
        self.post_queries.load(Ordering::SeqCst)
    }

    fn tags_for_posts_queries(&self) -> usize {
        self.tags_for_posts_queries.load(Ordering::SeqCst)
    }

    fn author_batches(&self) -> usize {
        self.author_batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostsRepo for FakeRepos {
    async fn list_popular(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        self.post_queries.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.store.posts.clone();
        posts.sort_by(|a, b| {
            b.likes_count
                .cmp(&a.likes_count)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn list_fresh(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        self.post_queries.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.store.posts.clone();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn list_for_tag(
        &self,
        tag_id: Uuid,
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.post_queries.fetch_add(1, Ordering::SeqCst);
        let mut posts: Vec<PostRecord> = self
            .store
            .posts
            .iter()
            .filter(|post| self.store.post_tags.contains(&(post.id, tag_id)))
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        self.post_queries.fetch_add(1, Ordering::SeqCst);
        let mut matches: Vec<PostRecord> = self
            .store
            .posts
            .iter()
            .filter(|post| post.slug == slug)
            .cloned()
            .collect();
        if matches.len() > 1 {
            return Err(RepoError::integrity(format!("slug `{slug}` is not unique")));
        }
        Ok(matches.pop())
    }
}

#[async_trait]
impl TagsRepo for FakeRepos {
    async fn list_popular(&self, limit: u32) -> Result<Vec<TagRecord>, RepoError> {
        let mut tags: Vec<TagRecord> = self
            .store
            .tags
            .iter()
            .map(|tag| self.store.annotated_tag(tag))
            .collect();
        tags.sort_by(|a, b| {
            b.posts_count
                .cmp(&a.posts_count)
                .then_with(|| a.title.cmp(&b.title))
        });
        tags.truncate(limit as usize);
        Ok(tags)
    }

    async fn list_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostTag>, RepoError> {
        self.tags_for_posts_queries.fetch_add(1, Ordering::SeqCst);
        let mut entries: Vec<PostTag> = self
            .store
            .post_tags
            .iter()
            .filter(|(post_id, _)| post_ids.contains(post_id))
            .filter_map(|(post_id, tag_id)| {
                let tag = self.store.tags.iter().find(|tag| tag.id == *tag_id)?;
                Some(PostTag {
                    post_id: *post_id,
                    tag: self.store.annotated_tag(tag),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            a.post_id
                .cmp(&b.post_id)
                .then_with(|| a.tag.title.cmp(&b.tag.title))
        });
        Ok(entries)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<TagRecord>, RepoError> {
        let mut matches: Vec<TagRecord> = self
            .store
            .tags
            .iter()
            .filter(|tag| tag.title == title)
            .map(|tag| self.store.annotated_tag(tag))
            .collect();
        if matches.len() > 1 {
            return Err(RepoError::integrity(format!(
                "tag title `{title}` is not unique"
            )));
        }
        Ok(matches.pop())
    }
}

#[async_trait]
impl CommentsRepo for FakeRepos {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut comments: Vec<CommentRecord> = self
            .store
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| {
            a.published_at
                .cmp(&b.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(comments)
    }
}

#[async_trait]
impl AuthorsRepo for FakeRepos {
    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AuthorRecord>, RepoError> {
        self.author_batches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .store
            .authors
            .iter()
            .filter(|author| ids.contains(&author.id))
            .cloned()
            .collect())
    }
}

fn service_over(repos: Arc<FakeRepos>) -> BlogService {
    BlogService::new(repos.clone(), repos.clone(), repos.clone(), repos)
}

#[tokio::test]
async fn home_page_caps_both_post_lists_at_five() {
    let mut store = FakeStore::default();
    let author = store.add_author("ivan");
    for index in 0..7 {
        store.add_post(&format!("post-{index}"), author, index, index);
    }

    let service = service_over(Arc::new(FakeRepos::new(store)));
    let home = service.home_context().await.unwrap();

    assert_eq!(home.most_popular_posts.len(), 5);
    assert_eq!(home.page_posts.len(), 5);

    // Most liked first; the two least-liked posts fall off.
    assert_eq!(home.most_popular_posts[0].slug, "post-6");
    assert_eq!(home.most_popular_posts[4].slug, "post-2");

    // Freshest first.
    assert_eq!(home.page_posts[0].slug, "post-6");
    assert_eq!(home.page_posts[4].slug, "post-2");
}

#[tokio::test]
async fn equally_liked_posts_order_by_slug() {
    let mut store = FakeStore::default();
    let author = store.add_author("ivan");
    store.add_post("zebra", author, 10, 0);
    store.add_post("apple", author, 10, 1);

    let service = service_over(Arc::new(FakeRepos::new(store)));
    let home = service.home_context().await.unwrap();

    let slugs: Vec<&str> = home
        .most_popular_posts
        .iter()
        .map(|post| post.slug.as_str())
        .collect();
    assert_eq!(slugs, ["apple", "zebra"]);
}

#[tokio::test]
async fn summaries_teaser_the_body_at_two_hundred_characters() {
    let mut store = FakeStore::default();
    let author = store.add_author("ivan");
    let post_id = store.add_post("long-read", author, 0, 0);
    let post = store
        .posts
        .iter_mut()
        .find(|post| post.id == post_id)
        .unwrap();
    post.body = "x".repeat(250);

    let service = service_over(Arc::new(FakeRepos::new(store)));
    let home = service.home_context().await.unwrap();

    let summary = &home.page_posts[0];
    assert_eq!(summary.teaser_text.chars().count(), 200);
    assert_eq!(summary.image_url, None);
    assert_eq!(summary.author, "ivan");
}

#[tokio::test]
async fn first_tag_title_is_the_alphabetically_first_tag() {
    let mut store = FakeStore::default();
    let author = store.add_author("ivan");
    let tagged = store.add_post("tagged", author, 5, 0);
    let bare = store.add_post("bare", author, 1, 1);
    let web = store.add_tag("web");
    let art = store.add_tag("art");
    store.attach_tag(tagged, web);
    store.attach_tag(tagged, art);
    let _ = bare;

    let service = service_over(Arc::new(FakeRepos::new(store)));
    let home = service.home_context().await.unwrap();

    let tagged_summary = home
        .page_posts
        .iter()
        .find(|post| post.slug == "tagged")
        .unwrap();
    assert_eq!(tagged_summary.first_tag_title, "art");
    assert_eq!(tagged_summary.tags.len(), 2);

    let bare_summary = home
        .page_posts
        .iter()
        .find(|post| post.slug == "bare")
        .unwrap();
    assert_eq!(bare_summary.first_tag_title, "");
    assert!(bare_summary.tags.is_empty());
}

#[tokio::test]
async fn popular_tags_rank_by_post_count_then_title() {
    let mut store = FakeStore::default();
    let author = store.add_author("ivan");
    let first = store.add_post("first", author, 0, 0);
    let second = store.add_post("second", author, 0, 1);
    let busy = store.add_tag("busy");
    let beta = store.add_tag("beta");
    let alpha = store.add_tag("alpha");
    store.attach_tag(first, busy);
    store.attach_tag(second, busy);
    store.attach_tag(first, beta);
    store.attach_tag(first, alpha);

    let service = service_over(Arc::new(FakeRepos::new(store)));
    let home = service.home_context().await.unwrap();

    let titles: Vec<&str> = home
        .popular_tags
        .iter()
        .map(|tag| tag.title.as_str())
        .collect();
    assert_eq!(titles, ["busy", "alpha", "beta"]);
    assert_eq!(home.popular_tags[0].posts_with_tag, 2);
}

#[tokio::test]
async fn unknown_slug_fails_as_post_not_found() {
    let store = FakeStore::default();
    let service = service_over(Arc::new(FakeRepos::new(store)));

    let err = service.post_page("missing").await.unwrap_err();
    assert!(matches!(err, BlogError::PostNotFound));
}

#[tokio::test]
async fn post_page_lists_comments_in_publication_order() {
    let mut store = FakeStore::default();
    let writer = store.add_author("writer");
    let reader = store.add_author("reader");
    let post_id = store.add_post("discussed", writer, 3, 0);

    store.add_comment(post_id, reader, "third", 30);
    store.add_comment(post_id, writer, "first", 10);
    store.add_comment(post_id, reader, "second", 20);

    let service = service_over(Arc::new(FakeRepos::new(store)));
    let page = service.post_page("discussed").await.unwrap();

    assert_eq!(page.post.title, "Title of discussed");
    assert_eq!(page.post.author, "writer");
    assert_eq!(page.post.likes_amount, 3);

    let texts: Vec<&str> = page
        .post
        .comments
        .iter()
        .map(|comment| comment.text.as_str())
        .collect();
    assert_eq!(texts, ["first", "second", "third"]);
    assert_eq!(page.post.comments[0].author, "writer");
    assert_eq!(page.post.comments[2].author, "reader");
}

#[tokio::test]
async fn unknown_tag_fails_before_any_post_query() {
    let store = FakeStore::default();
    let repos = Arc::new(FakeRepos::new(store));
    let service = service_over(repos.clone());

    let err = service.tag_page("missing").await.unwrap_err();
    assert!(matches!(err, BlogError::TagNotFound));
    assert_eq!(repos.post_queries(), 0);
}

#[tokio::test]
async fn tag_page_filters_posts_by_the_requested_tag() {
    let mut store = FakeStore::default();
    let author = store.add_author("ivan");
    let tagged = store.add_post("matching", author, 0, 2);
    let other = store.add_post("unrelated", author, 0, 1);
    let tag = store.add_tag("travel");
    let empty = store.add_tag("drafts");
    store.attach_tag(tagged, tag);
    let _ = (other, empty);

    let service = service_over(Arc::new(FakeRepos::new(store)));
    let page = service.tag_page("travel").await.unwrap();

    assert_eq!(page.tag, "travel");
    assert_eq!(page.posts.len(), 1);
    assert_eq!(page.posts[0].slug, "matching");

    let empty_page = service.tag_page("drafts").await.unwrap();
    assert_eq!(empty_page.tag, "drafts");
    assert!(empty_page.posts.is_empty());
    let drafts = empty_page
        .popular_tags
        .iter()
        .find(|tag| tag.title == "drafts")
        .unwrap();
    assert_eq!(drafts.posts_with_tag, 0);
}

#[tokio::test]
async fn tag_page_caps_posts_at_twenty_and_side_tags_at_five() {
    let mut store = FakeStore::default();
    let author = store.add_author("ivan");
    let busy = store.add_tag("busy");
    for index in 0..25 {
        let post = store.add_post(&format!("busy-{index:02}"), author, 0, index);
        store.attach_tag(post, busy);
    }
    for index in 0..6 {
        let post = store.add_post(&format!("side-{index}"), author, 0, 100 + index);
        let tag = store.add_tag(&format!("side-{index}"));
        store.attach_tag(post, tag);
    }

    let service = service_over(Arc::new(FakeRepos::new(store)));
    let page = service.tag_page("busy").await.unwrap();

    assert_eq!(page.posts.len(), 20);
    // Freshest tagged post first; the five oldest fall off.
    assert_eq!(page.posts[0].slug, "busy-24");
    assert_eq!(page.posts[19].slug, "busy-05");

    assert_eq!(page.popular_tags.len(), 5);
    // "busy" carries 25 posts and outranks every one-post side tag.
    assert_eq!(page.popular_tags[0].title, "busy");
    assert_eq!(page.popular_tags[0].posts_with_tag, 25);
}

#[tokio::test]
async fn home_page_resolves_relations_with_one_query_each() {
    let mut store = FakeStore::default();
    let tag = store.add_tag("common");
    for index in 0..10 {
        let author = store.add_author(&format!("author-{index}"));
        let post = store.add_post(&format!("post-{index}"), author, index, index);
        store.attach_tag(post, tag);
    }

    let repos = Arc::new(FakeRepos::new(store));
    let service = service_over(repos.clone());
    service.home_context().await.unwrap();

    // Two post listings, each resolved with exactly one author batch and
    // one tags-for-posts query, independent of page size.
    assert_eq!(repos.post_queries(), 2);
    assert_eq!(repos.author_batches(), 2);
    assert_eq!(repos.tags_for_posts_queries(), 2);
}

fn router_over(store: FakeStore) -> axum::Router {
    let repos = Arc::new(FakeRepos::new(store));
    let pool = PostgresRepositories::connect_lazy("postgres://localhost/unused", 1).unwrap();
    let state = HttpState {
        blog: Arc::new(service_over(repos)),
        db: Arc::new(PostgresRepositories::new(pool)),
    };
    build_router(state)
}

fn seeded_store() -> FakeStore {
    let mut store = FakeStore::default();
    let author = store.add_author("ivan");
    let post = store.add_post("hello-world", author, 2, 0);
    let tag = store.add_tag("intro");
    store.attach_tag(post, tag);
    store
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn index_renders_the_seeded_post() {
    let router = router_over(seeded_store());
    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Title of hello-world"));
    assert!(body.contains("intro"));
}

#[tokio::test]
async fn post_route_serves_the_detail_page() {
    let router = router_over(seeded_store());
    let response = router
        .oneshot(
            Request::builder()
                .uri("/posts/hello-world")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Title of hello-world"));
    assert!(body.contains("ivan"));
}

#[tokio::test]
async fn unknown_post_slug_renders_not_found() {
    let router = router_over(seeded_store());
    let response = router
        .oneshot(
            Request::builder()
                .uri("/posts/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_tag_title_renders_not_found() {
    let router = router_over(seeded_store());
    let response = router
        .oneshot(
            Request::builder()
                .uri("/tags/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tag_route_serves_the_filter_page() {
    let router = router_over(seeded_store());
    let response = router
        .oneshot(
            Request::builder()
                .uri("/tags/intro")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("intro"));
    assert!(body.contains("Title of hello-world"));
}

#[tokio::test]
async fn contacts_page_is_static() {
    let router = router_over(FakeStore::default());
    let response = router
        .oneshot(
            Request::builder()
                .uri("/contacts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unmatched_routes_fall_back_to_not_found() {
    let router = router_over(FakeStore::default());
    let response = router
        .oneshot(
            Request::builder()
                .uri("/nowhere")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
