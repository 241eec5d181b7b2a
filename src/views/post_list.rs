// Post cards shared by the feed and profile views.
use crate::authors::AuthorDirectory;
use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::media::{MediaHandle, MediaLeases};
use crate::service::{Comment, Post, Principal, RemoteCall};

use super::{fetch_flags, rejected, write_failed, CommentThread};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    Like,
    Unlike,
    Comment,
    Share,
    Delete,
}

/// One rendered post: the last server value plus local patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub post: Post,
    /// Fetched once per mount; flipped only after a like/unlike settles.
    pub liked: bool,
    pub media: Option<MediaHandle>,
}

pub struct PostList {
    ctx: AppContext,
    cards: Vec<PostCard>,
    authors: AuthorDirectory,
    leases: MediaLeases,
    thread: Option<CommentThread>,
}

impl PostList {
    pub fn new(ctx: &AppContext) -> Self {
        let mut authors = AuthorDirectory::new();
        if let Some(user) = &ctx.current_user {
            authors.insert(user.clone());
        }
        Self {
            ctx: ctx.clone(),
            cards: Vec::new(),
            authors,
            leases: MediaLeases::new(ctx.media.clone()),
            thread: None,
        }
    }

    /// Replace the list with freshly fetched posts, then resolve authors
    /// and liked flags.
    pub async fn load(&mut self, posts: Vec<Post>) {
        self.leases.release_all();
        self.thread = None;
        let leases = &mut self.leases;
        self.cards = posts
            .into_iter()
            .map(|post| card_for(leases, post))
            .collect();

        let service = self.ctx.service.clone();
        self.authors
            .resolve(service.as_ref(), self.cards.iter().map(|c| &c.post.author))
            .await;

        let ids: Vec<String> = self.cards.iter().map(|c| c.post.id.clone()).collect();
        let liked = fetch_flags(ids, RemoteCall::IsPostLiked, |id| {
            let service = service.clone();
            async move { service.is_post_liked(&id).await }
        })
        .await;
        for card in &mut self.cards {
            card.liked = liked.get(&card.post.id).copied().unwrap_or(false);
        }
    }

    pub fn cards(&self) -> &[PostCard] {
        &self.cards
    }

    pub fn card(&self, post_id: &str) -> Option<&PostCard> {
        self.cards.iter().find(|c| c.post.id == post_id)
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn author_name(&self, author: &Principal) -> &str {
        self.authors.display_name(author)
    }

    pub fn is_own(&self, post: &Post) -> bool {
        self.ctx.is_viewer(&post.author)
    }

    /// What the viewer may do with a post. Delete is offered to the author only.
    pub fn actions(&self, post_id: &str) -> Vec<PostAction> {
        let Some(card) = self.card(post_id) else {
            return Vec::new();
        };
        let mut actions = vec![
            if card.liked {
                PostAction::Unlike
            } else {
                PostAction::Like
            },
            PostAction::Comment,
            PostAction::Share,
        ];
        if self.is_own(&card.post) {
            actions.push(PostAction::Delete);
        }
        actions
    }

    /// Like or unlike depending on the tracked flag. Returns the new flag.
    pub async fn toggle_like(&mut self, post_id: &str) -> ClientResult<bool> {
        let liked = self.find(post_id)?.liked;
        let service = self.ctx.service.clone();

        let (call, result) = if liked {
            (RemoteCall::UnlikePost, service.unlike_post(post_id).await)
        } else {
            (RemoteCall::LikePost, service.like_post(post_id).await)
        };
        if let Err(e) = result {
            return Err(write_failed(&self.ctx, call, e, "Failed to update like"));
        }

        let card = self.find_mut(post_id)?;
        card.liked = !liked;
        card.post.likes_count = if liked {
            card.post.likes_count.saturating_sub(1)
        } else {
            card.post.likes_count + 1
        };
        Ok(card.liked)
    }

    /// Share a post. Only the shares count of the original is patched; the
    /// new shared post shows up on the next fetch.
    pub async fn share(&mut self, post_id: &str) -> ClientResult<Post> {
        self.find(post_id)?;
        let shared = self
            .ctx
            .service
            .share_post(post_id)
            .await
            .map_err(|e| write_failed(&self.ctx, RemoteCall::SharePost, e, "Failed to share post"))?;

        let card = self.find_mut(post_id)?;
        card.post.shares_count += 1;
        self.ctx.notices.info("Post shared successfully!");
        Ok(shared)
    }

    pub async fn delete(&mut self, post_id: &str) -> ClientResult<()> {
        if !self.is_own(&self.find(post_id)?.post) {
            return Err(rejected(&self.ctx, ClientError::NotOwner));
        }

        let removed = self
            .ctx
            .service
            .delete_post(post_id)
            .await
            .map_err(|e| write_failed(&self.ctx, RemoteCall::DeletePost, e, "Failed to delete post"))?;
        if !removed {
            tracing::error!("delete_post {} was not applied", post_id);
            self.ctx.notices.error("Failed to delete post");
            return Err(ClientError::NotApplied {
                call: RemoteCall::DeletePost,
            });
        }

        self.remove(post_id);
        Ok(())
    }

    /// Put a post the viewer just created at the top.
    pub fn prepend(&mut self, post: Post) {
        let card = card_for(&mut self.leases, post);
        self.cards.insert(0, card);
    }

    /// Refetch one post and splice it over its card. A post that no longer
    /// exists is dropped; a failed read keeps the card as it was.
    pub async fn reload(&mut self, post_id: &str) -> ClientResult<()> {
        self.find(post_id)?;
        match self.ctx.service.get_post(post_id).await {
            Ok(Some(post)) => self.replace(post),
            Ok(None) => {
                tracing::info!("Post {} is gone, dropping its card", post_id);
                self.remove(post_id);
            }
            Err(e) => {
                tracing::warn!("Failed to reload post {}: {}", post_id, e);
            }
        }
        Ok(())
    }

    /// Splice an updated post over the card with the same id, keeping the
    /// liked flag. The media lease moves only when the bytes changed.
    pub fn replace(&mut self, post: Post) {
        let Some(pos) = self.cards.iter().position(|c| c.post.id == post.id) else {
            return;
        };
        if self.cards[pos].post.media == post.media {
            self.cards[pos].post = post;
            return;
        }

        if let Some(old) = self.cards[pos].media.take() {
            self.leases.release(&old.key);
        }
        let liked = self.cards[pos].liked;
        self.cards[pos] = PostCard {
            liked,
            ..card_for(&mut self.leases, post)
        };
    }

    pub fn remove(&mut self, post_id: &str) {
        let Some(pos) = self.cards.iter().position(|c| c.post.id == post_id) else {
            return;
        };
        let card = self.cards.remove(pos);
        if let Some(media) = card.media {
            self.leases.release(&media.key);
        }
        if self.thread.as_ref().is_some_and(|t| t.post_id() == post_id) {
            self.thread = None;
        }
    }

    pub async fn open_comments(&mut self, post_id: &str) -> ClientResult<&CommentThread> {
        self.find(post_id)?;
        let mut thread = CommentThread::new(&self.ctx, post_id);
        thread.load().await;
        Ok(self.thread.insert(thread))
    }

    pub fn close_comments(&mut self) {
        self.thread = None;
    }

    pub fn comments(&self) -> Option<&CommentThread> {
        self.thread.as_ref()
    }

    /// Comment on the post whose thread is open and bump its count.
    pub async fn add_comment(&mut self, text: &str) -> ClientResult<Option<Comment>> {
        let thread = self.thread.as_mut().ok_or_else(no_thread)?;
        let Some(comment) = thread.submit(text).await? else {
            return Ok(None);
        };
        if let Ok(card) = self.find_mut(&comment.post_id) {
            card.post.comments_count += 1;
        }
        Ok(Some(comment))
    }

    pub async fn delete_comment(&mut self, comment_id: &str) -> ClientResult<()> {
        let thread = self.thread.as_mut().ok_or_else(no_thread)?;
        thread.delete(comment_id).await?;
        let post_id = thread.post_id().to_string();
        if let Ok(card) = self.find_mut(&post_id) {
            card.post.comments_count = card.post.comments_count.saturating_sub(1);
        }
        Ok(())
    }

    /// Release every media handle this list acquired.
    pub fn teardown(&mut self) {
        self.thread = None;
        self.cards.clear();
        self.leases.release_all();
    }

    fn find(&self, post_id: &str) -> ClientResult<&PostCard> {
        self.card(post_id)
            .ok_or_else(|| ClientError::NotFound(post_id.to_string()))
    }

    fn find_mut(&mut self, post_id: &str) -> ClientResult<&mut PostCard> {
        self.cards
            .iter_mut()
            .find(|c| c.post.id == post_id)
            .ok_or_else(|| ClientError::NotFound(post_id.to_string()))
    }
}

fn card_for(leases: &mut MediaLeases, post: Post) -> PostCard {
    let media = post
        .media
        .as_deref()
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| leases.acquire(bytes, post.media_type.as_deref()));
    PostCard {
        post,
        liked: false,
        media,
    }
}

fn no_thread() -> ClientError {
    ClientError::NotFound("open comment thread".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{CreatePostRequest, InMemoryBackend};

    async fn publish(ctx: &AppContext, media: Option<Vec<u8>>) -> Post {
        ctx.service
            .create_post(CreatePostRequest {
                content: "hello".into(),
                media_type: media.as_ref().map(|_| "image/png".to_string()),
                media,
            })
            .await
            .unwrap()
    }

    async fn mounted(ctx: &AppContext, posts: Vec<Post>) -> PostList {
        let mut list = PostList::new(ctx);
        list.load(posts).await;
        list
    }

    #[tokio::test]
    async fn two_toggles_alternate_and_restore_the_count() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let post = publish(&ada, None).await;
        let mut list = mounted(&ada, vec![post.clone()]).await;

        assert!(list.toggle_like(&post.id).await.unwrap());
        assert_eq!(list.card(&post.id).unwrap().post.likes_count, 1);
        assert!(!list.toggle_like(&post.id).await.unwrap());
        assert_eq!(list.card(&post.id).unwrap().post.likes_count, 0);

        assert_eq!(backend.call_count(RemoteCall::LikePost).await, 1);
        assert_eq!(backend.call_count(RemoteCall::UnlikePost).await, 1);
    }

    #[tokio::test]
    async fn liked_flag_is_fetched_on_load() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let post = publish(&ada, None).await;
        ada.service.like_post(&post.id).await.unwrap();

        let list = mounted(&ada, vec![post.clone()]).await;
        assert!(list.card(&post.id).unwrap().liked);
        assert_eq!(list.actions(&post.id)[0], PostAction::Unlike);
    }

    #[tokio::test]
    async fn failed_like_leaves_the_card_untouched() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let post = publish(&ada, None).await;
        let mut list = mounted(&ada, vec![post.clone()]).await;
        backend.inject_fault(RemoteCall::LikePost, None).await;

        let err = list.toggle_like(&post.id).await.unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Write);
        let card = list.card(&post.id).unwrap();
        assert!(!card.liked);
        assert_eq!(card.post.likes_count, 0);
        assert!(!ada.notices.is_empty());
    }

    #[tokio::test]
    async fn delete_is_not_offered_to_other_users() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let grace = AppContext::signed_up(&backend, "Grace").await;
        let post = publish(&ada, None).await;

        let mine = mounted(&ada, vec![post.clone()]).await;
        assert!(mine.actions(&post.id).contains(&PostAction::Delete));

        let mut theirs = mounted(&grace, vec![post.clone()]).await;
        assert_eq!(
            theirs.actions(&post.id),
            vec![PostAction::Like, PostAction::Comment, PostAction::Share]
        );
        backend.clear_journal().await;
        assert!(matches!(
            theirs.delete(&post.id).await,
            Err(ClientError::NotOwner)
        ));
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_the_card_after_success() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let post = publish(&ada, None).await;
        let mut list = mounted(&ada, vec![post.clone()]).await;

        list.delete(&post.id).await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn share_bumps_the_original_and_notifies() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let grace = AppContext::signed_up(&backend, "Grace").await;
        let post = publish(&ada, None).await;
        let mut list = mounted(&grace, vec![post.clone()]).await;

        let shared = list.share(&post.id).await.unwrap();
        assert_eq!(shared.content, "Shared: hello");
        assert_eq!(list.card(&post.id).unwrap().post.shares_count, 1);
        assert_eq!(list.cards().len(), 1);
        assert_eq!(
            grace.notices.latest().map(|n| n.message),
            Some("Post shared successfully!".to_string())
        );
    }

    #[tokio::test]
    async fn comments_adjust_the_card_count() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let post = publish(&ada, None).await;
        let mut list = mounted(&ada, vec![post.clone()]).await;

        list.open_comments(&post.id).await.unwrap();
        let comment = list.add_comment("first!").await.unwrap().unwrap();
        assert_eq!(list.card(&post.id).unwrap().post.comments_count, 1);

        list.delete_comment(&comment.id).await.unwrap();
        assert_eq!(list.card(&post.id).unwrap().post.comments_count, 0);
    }

    #[tokio::test]
    async fn media_handles_are_released_on_teardown() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let first = publish(&ada, Some(vec![1, 2, 3])).await;
        let second = publish(&ada, Some(vec![1, 2, 3])).await;

        let mut list = mounted(&ada, vec![first.clone(), second]).await;
        let handle = list.card(&first.id).unwrap().media.clone().unwrap();
        assert_eq!(handle.mime_type.as_deref(), Some("image/png"));
        assert_eq!(ada.media.len(), 1);
        assert_eq!(ada.media.refs(&handle.key), 2);

        list.teardown();
        assert!(ada.media.is_empty());
    }

    #[tokio::test]
    async fn delete_releases_the_card_media_at_once() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let post = publish(&ada, Some(vec![7; 4])).await;
        let mut list = mounted(&ada, vec![post.clone()]).await;
        assert_eq!(ada.media.len(), 1);

        list.delete(&post.id).await.unwrap();
        assert!(list.is_empty());
        assert!(ada.media.is_empty());
    }

    #[tokio::test]
    async fn replace_moves_the_lease_only_when_media_changes() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let post = publish(&ada, Some(vec![1, 1])).await;
        let mut list = mounted(&ada, vec![post.clone()]).await;
        list.toggle_like(&post.id).await.unwrap();
        let old_key = list.card(&post.id).unwrap().media.clone().unwrap().key;

        let mut edited = post.clone();
        edited.content = "edited".into();
        list.replace(edited.clone());
        assert_eq!(ada.media.refs(&old_key), 1);

        edited.media = Some(vec![2, 2]);
        list.replace(edited);
        let card = list.card(&post.id).unwrap();
        assert!(card.liked);
        assert_eq!(card.post.content, "edited");
        assert_eq!(ada.media.refs(&old_key), 0);
        assert_eq!(ada.media.len(), 1);
        assert_eq!(card.media.as_ref().map(|m| m.data.to_vec()), Some(vec![2, 2]));
    }

    #[tokio::test]
    async fn reload_splices_server_counts_and_drops_vanished_posts() {
        let backend = InMemoryBackend::new();
        let ada = AppContext::signed_up(&backend, "Ada").await;
        let grace = AppContext::signed_up(&backend, "Grace").await;
        let post = publish(&ada, Some(vec![3; 3])).await;
        let mut list = mounted(&grace, vec![post.clone()]).await;

        ada.service.like_post(&post.id).await.unwrap();
        list.reload(&post.id).await.unwrap();
        assert_eq!(list.card(&post.id).unwrap().post.likes_count, 1);

        backend.inject_fault(RemoteCall::GetPost, None).await;
        list.reload(&post.id).await.unwrap();
        assert_eq!(list.cards().len(), 1);
        backend.clear_faults().await;

        ada.service.delete_post(&post.id).await.unwrap();
        list.reload(&post.id).await.unwrap();
        assert!(list.is_empty());
        assert!(grace.media.is_empty());
    }
}
