use crate::context::AppContext;
use crate::error::ClientResult;
use crate::service::Post;

use super::{Composer, PostList};

/// The caller's feed with the composer on top.
pub struct Feed {
    ctx: AppContext,
    posts: PostList,
    composer: Composer,
}

impl Feed {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            ctx: ctx.clone(),
            posts: PostList::new(ctx),
            composer: Composer::new(ctx),
        }
    }

    /// Fetch the feed. A failed fetch renders an empty feed.
    pub async fn load(&mut self) {
        let posts = match self.ctx.service.get_feed().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!("Error loading feed: {}", e);
                Vec::new()
            }
        };
        tracing::debug!(count = posts.len(), "Feed loaded");
        self.posts.load(posts).await;
    }

    pub async fn refresh(&mut self) {
        self.load().await;
    }

    pub fn posts(&self) -> &PostList {
        &self.posts
    }

    pub fn posts_mut(&mut self) -> &mut PostList {
        &mut self.posts
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// Submit the composer and show the new post first.
    pub async fn publish(&mut self) -> ClientResult<Post> {
        let post = self.composer.submit().await?;
        self.posts.prepend(post.clone());
        Ok(post)
    }

    pub fn teardown(&mut self) {
        self.composer.teardown();
        self.posts.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{CreatePostRequest, InMemoryBackend, RemoteCall};

    #[tokio::test]
    async fn feed_shows_followed_posts_newest_first() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let grace = AppContext::signed_up(&backend, "Grace").await;
        for content in ["first", "second"] {
            grace
                .service
                .create_post(CreatePostRequest {
                    content: content.into(),
                    media: None,
                    media_type: None,
                })
                .await
                .unwrap();
        }
        ada.service.follow_user(grace.viewer()).await.unwrap();

        let mut feed = Feed::new(&ada);
        feed.load().await;
        let contents: Vec<&str> = feed
            .posts()
            .cards()
            .iter()
            .map(|c| c.post.content.as_str())
            .collect();
        assert_eq!(contents, vec!["second", "first"]);
        assert_eq!(feed.posts().author_name(grace.viewer()), "Grace");
    }

    #[tokio::test]
    async fn publish_prepends_without_refetching() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let mut feed = Feed::new(&ada);
        feed.load().await;
        backend.clear_journal().await;

        feed.composer_mut().set_content("hello");
        let post = feed.publish().await.unwrap();

        assert_eq!(feed.posts().cards()[0].post.id, post.id);
        assert_eq!(feed.posts().author_name(ada.viewer()), "Ada");
        assert_eq!(backend.calls().await, vec![RemoteCall::CreatePost]);
    }

    #[tokio::test]
    async fn failed_fetch_renders_an_empty_feed() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        backend.inject_fault(RemoteCall::GetFeed, None).await;

        let mut feed = Feed::new(&ada);
        feed.load().await;
        assert!(feed.posts().is_empty());
        assert!(ada.notices.is_empty());
    }
}
